use serde::{Deserialize, Serialize};
use crate::record::{EmitterKey, EmitterRecord, SystemRecord};
use crate::utils::VfxError;

pub mod parser;
pub mod stats;

pub use parser::{parse, parse_with_report, ParseReport};
pub use stats::DocumentStats;

/// 文档对象图：系统 → 发射器 → 属性
///
/// 对象图是文本缓冲区上按行号索引的派生视图，缓冲区才是唯一的持久状态。
/// 所有记录都是值语义，克隆后的快照不会被后续编辑影响。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentGraph {
    /// 按声明顺序排列的系统
    pub systems: Vec<SystemRecord>,
}

impl DocumentGraph {
    pub fn new(systems: Vec<SystemRecord>) -> Self {
        Self { systems }
    }

    pub fn systems(&self) -> &[SystemRecord] {
        &self.systems
    }

    /// 按完整名称查找系统（同名时返回第一个）
    pub fn system(&self, full_name: &str) -> Option<&SystemRecord> {
        self.systems.iter().find(|s| s.full_name == full_name)
    }

    /// 所有发射器，按系统和声明顺序
    pub fn emitters(&self) -> impl Iterator<Item = &EmitterRecord> {
        self.systems.iter().flat_map(|s| s.emitters.iter())
    }

    pub fn emitters_mut(&mut self) -> impl Iterator<Item = &mut EmitterRecord> {
        self.systems.iter_mut().flat_map(|s| s.emitters.iter_mut())
    }

    /// 按复合键查找发射器
    pub fn emitter(&self, key: &EmitterKey) -> Option<&EmitterRecord> {
        self.systems
            .iter()
            .filter(|s| s.full_name == key.system_name)
            .flat_map(|s| s.emitters.iter())
            .find(|e| e.anchor_line == key.anchor_line)
    }

    pub fn emitter_mut(&mut self, key: &EmitterKey) -> Option<&mut EmitterRecord> {
        self.systems
            .iter_mut()
            .filter(|s| s.full_name == key.system_name)
            .flat_map(|s| s.emitters.iter_mut())
            .find(|e| e.anchor_line == key.anchor_line)
    }

    /// 按复合键查找，找不到时返回错误
    pub fn require_emitter_mut(&mut self, key: &EmitterKey) -> Result<&mut EmitterRecord, VfxError> {
        self.emitter_mut(key)
            .ok_or_else(|| VfxError::EmitterNotFound(key.to_string()))
    }

    /// 按名称查找发射器
    ///
    /// 名称不唯一，返回全部匹配项；后续操作应使用各自的 `key()`。
    pub fn find_emitters_by_name(&self, name: &str) -> Vec<&EmitterRecord> {
        self.emitters().filter(|e| e.name == name).collect()
    }

    /// 所有发射器的复合键
    pub fn keys(&self) -> Vec<EmitterKey> {
        self.emitters().map(EmitterRecord::key).collect()
    }

    pub fn emitter_count(&self) -> usize {
        self.systems.iter().map(|s| s.emitters.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// 导出为 JSON
    pub fn to_json(&self) -> Result<String, VfxError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
