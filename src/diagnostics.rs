/// 非致命异常
///
/// 解析和变更都采用尽力而为策略：每个异常只影响最小的单元
/// （一个字段、一个属性或一个发射器），文档其余部分照常处理。
/// 这些异常被收集到报告中并通过 `tracing` 记录，从不作为 `Err` 返回。
use serde::Serialize;
use thiserror::Error;
use crate::record::{EmitterKey, PropertyKind};

/// 解析阶段的异常
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ParseAnomaly {
    /// 右括号多于左括号，块被提前视为关闭
    #[error("line {line}: unbalanced closing brace, block treated as closed")]
    BraceImbalance { line: usize },

    /// 文件结束时块仍未关闭
    #[error("line {line}: block still open at end of input")]
    UnclosedBlock { line: usize },

    /// 数值记号非法，该字段视为缺失
    #[error("line {line}: malformed value for {field}")]
    MalformedField { line: usize, field: &'static str },

    /// times 与 values 数量不一致，dynamics 视为缺失
    #[error("line {line}: {field} has {times} times but {values} values")]
    KeyframeMismatch {
        line: usize,
        field: &'static str,
        times: usize,
        values: usize,
    },

    /// 属性块超出向前扫描窗口仍未关闭
    #[error("line {line}: {field} block not closed within {window} lines")]
    UnterminatedProperty {
        line: usize,
        field: &'static str,
        window: usize,
    },
}

/// 变更阶段的异常
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum EditAnomaly {
    /// 搜索窗口内找不到插入锚点，跳过该属性
    #[error("{key}: no emitterName line within ±{window} lines, {kind} not inserted")]
    AnchorNotFound {
        key: EmitterKey,
        kind: PropertyKind,
        window: usize,
    },

    /// 锚点行不再符合字段语法，跳过该属性
    #[error("{key}: line {line} does not hold a {kind} value")]
    ValueSyntaxMismatch {
        key: EmitterKey,
        kind: PropertyKind,
        line: usize,
    },

    /// 属性块中没有 constantValue 行，常量的修改没有写回
    #[error("{key}: {kind} block at line {line} has no constantValue line, constant not written")]
    ConstantLineMissing {
        key: EmitterKey,
        kind: PropertyKind,
        line: usize,
    },

    /// 内存中的关键帧数量与缓冲区不一致，仅更新重叠部分
    #[error("{key}: {kind} has {memory} keyframes in memory but {buffer} in text")]
    KeyframeCountMismatch {
        key: EmitterKey,
        kind: PropertyKind,
        memory: usize,
        buffer: usize,
    },

    /// 发射器没有该属性
    #[error("{key}: emitter has no {kind}")]
    PropertyMissing { key: EmitterKey, kind: PropertyKind },
}
