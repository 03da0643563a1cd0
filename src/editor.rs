/// 编辑器层模块
///
/// 该模块提供有状态的编辑接口，支持选择、撤销/重做和显式的保存状态。
/// 遵循"修改-保存分离"原则：对象图上的修改仅在内存中进行，
/// 需要显式 `apply` 写回缓冲区、显式 `save` 写入文件。
///
/// # 架构设计
///
/// - **session**: 编辑会话，管理缓冲区、对象图和选择集
/// - **history**: 快照历史，支持撤销/重做
pub mod history;
pub mod session;

// === 导出公共接口 ===
pub use history::EditHistory;
pub use session::VfxEditor;
