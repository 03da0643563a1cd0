/// 编辑器配置
///
/// 解析器和变更引擎使用的两个有界窗口都在这里定义为显式常量。
/// 超出窗口只会让受影响的单个操作静默失败（记录为异常），不会中止整个调用。
use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::utils::VfxError;

/// 属性子解析器向前扫描的最大行数
///
/// 要容纳逐行书写的长关键帧列表，与插入锚点窗口取相同的值。
pub const DEFAULT_PROPERTY_LOOKAHEAD: usize = 400;

/// 插入新属性时，在发射器声明行前后搜索 emitterName 行的范围
pub const DEFAULT_ANCHOR_SEARCH_WINDOW: usize = 400;

/// 撤销历史保留的快照数量
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// 单个属性块的向前扫描窗口
    pub property_lookahead: usize,
    /// 插入锚点的搜索窗口（± 行数）
    pub anchor_search_window: usize,
    /// 撤销历史上限
    pub history_limit: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            property_lookahead: DEFAULT_PROPERTY_LOOKAHEAD,
            anchor_search_window: DEFAULT_ANCHOR_SEARCH_WINDOW,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl EditorConfig {
    /// 从 JSON 字符串读取配置，缺失的字段使用默认值
    pub fn from_json(json: &str) -> Result<Self, VfxError> {
        Ok(serde_json::from_str(json)?)
    }

    /// 从 JSON 文件读取配置
    pub fn from_json_file(path: &Path) -> Result<Self, VfxError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EditorConfig::from_json(r#"{ "anchor_search_window": 50 }"#).unwrap();
        assert_eq!(config.anchor_search_window, 50);
        assert_eq!(config.property_lookahead, DEFAULT_PROPERTY_LOOKAHEAD);
        assert_eq!(config.history_limit, DEFAULT_HISTORY_LIMIT);
    }

    #[test]
    fn test_invalid_json() {
        assert!(EditorConfig::from_json("{ not json").is_err());
    }
}
