pub mod config;
pub mod datatypes;
pub mod diagnostics;
pub mod document;
pub mod editor;
pub mod io;
pub mod mutator;
pub mod patterns;
pub mod properties;
pub mod record;
pub mod utils;

// 重新导出主要结构
pub use config::EditorConfig;
pub use datatypes::{FloatKeyframe, Vec3};
pub use diagnostics::{EditAnomaly, ParseAnomaly};
pub use document::{parse, parse_with_report, DocumentGraph, DocumentStats, ParseReport};
pub use editor::{EditHistory, VfxEditor};
pub use mutator::{apply, AllEmitters, ApplyOptions, ApplyOutcome, ApplyReport, SelectionFilter};
pub use properties::EmitterProperty;
pub use record::{
    EmitterKey, EmitterProperties, EmitterRecord, PropertyKind, ScalarDynamicProperty,
    SystemRecord, VectorConstProperty, VectorProperty,
};
pub use utils::{create_backup, VfxError};

// 常量定义
pub const SUPPORTED_EXTENSIONS: &[&str] = &["py", "txt"];
