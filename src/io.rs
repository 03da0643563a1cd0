/// IO 抽象层模块
///
/// 核心只处理内存中的行序列，文件读写和二进制转换都通过这里的 trait 注入，
/// 便于在测试中替换为内存实现。
///
/// # 架构设计
///
/// - **traits**: `TextReader` / `TextWriter` / `BinConverter` 接口
/// - **text_io**: 文本转储的默认文件系统实现（保留换行风格和编码）
/// - **converter**: 以子进程方式调用外部二进制⇄文本转换器
///
/// # 使用示例
///
/// ```rust,ignore
/// use vfx_text_editor::io::{DefaultTextReader, TextReader};
///
/// let reader = DefaultTextReader::default();
/// let data = reader.read(Path::new("Aatrox.py"))?;
/// println!("{} 行", data.lines.len());
/// ```
pub mod converter;
pub mod text_io;
pub mod traits;

// === 导出 trait 定义 ===
pub use traits::{BinConverter, RawTextData, TextReader, TextWriter};

// === 导出默认实现 ===
pub use converter::ExternalConverter;
pub use text_io::{DefaultTextReader, DefaultTextWriter};
