/// 锚定变更引擎
///
/// 把内存中对象图上的修改写回文本缓冲区：
///
/// 1. **原位更新**：锚点已知的属性只替换值所在的片段（见 [`update`]）
/// 2. **插入**：锚点为空的属性在 emitterName 行之后插入新块（见 [`insert`]）
///
/// 只处理通过选择过滤器的发射器，其余发射器所在的行保持逐字节不变。
/// 调用方的缓冲区不会被修改，结果是一份新的行序列。
///
/// # 使用示例
///
/// ```rust,ignore
/// use std::collections::HashSet;
/// use vfx_text_editor::mutator::{apply, ApplyOptions};
///
/// let mut graph = parse(&lines);
/// let key = graph.keys()[0].clone();
/// BindWeight::add(graph.emitter_mut(&key).unwrap(), 1.0);
///
/// let selection: HashSet<_> = [key].into_iter().collect();
/// let outcome = apply(&lines, &mut graph, &selection, &ApplyOptions::default());
/// ```
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, warn};
use crate::config::{EditorConfig, DEFAULT_ANCHOR_SEARCH_WINDOW, DEFAULT_PROPERTY_LOOKAHEAD};
use crate::diagnostics::EditAnomaly;
use crate::document::DocumentGraph;
use crate::properties::generate_for;
use crate::record::{EmitterKey, PropertyKind};

pub mod insert;
pub mod shift;
pub mod update;

pub use insert::{resolve_insertion_point, InsertionPoint};
pub use shift::{rebase_graph, LineShift};

use update::Updater;

/// 插入顺序：每次都插在 emitterName 之后，最后插入的块离名称行最近
const INSERT_ORDER: [PropertyKind; 4] = [
    PropertyKind::TranslationOverride,
    PropertyKind::Scale,
    PropertyKind::BirthScale,
    PropertyKind::BindWeight,
];

/// 决定哪些发射器参与本次变更
pub trait SelectionFilter {
    fn is_selected(&self, key: &EmitterKey) -> bool;
}

impl SelectionFilter for HashSet<EmitterKey> {
    fn is_selected(&self, key: &EmitterKey) -> bool {
        self.contains(key)
    }
}

impl SelectionFilter for BTreeSet<EmitterKey> {
    fn is_selected(&self, key: &EmitterKey) -> bool {
        self.contains(key)
    }
}

impl SelectionFilter for [EmitterKey] {
    fn is_selected(&self, key: &EmitterKey) -> bool {
        self.contains(key)
    }
}

/// 选择全部发射器
#[derive(Debug, Clone, Copy, Default)]
pub struct AllEmitters;

impl SelectionFilter for AllEmitters {
    fn is_selected(&self, _key: &EmitterKey) -> bool {
        true
    }
}

/// 变更选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyOptions {
    /// 隔离模式：只处理这一种属性（bindWeight 的插入不受限制）
    pub isolated_property: Option<PropertyKind>,
    pub property_lookahead: usize,
    pub anchor_search_window: usize,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            isolated_property: None,
            property_lookahead: DEFAULT_PROPERTY_LOOKAHEAD,
            anchor_search_window: DEFAULT_ANCHOR_SEARCH_WINDOW,
        }
    }
}

impl ApplyOptions {
    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            isolated_property: None,
            property_lookahead: config.property_lookahead,
            anchor_search_window: config.anchor_search_window,
        }
    }

    /// 设置隔离模式
    pub fn isolated(mut self, kind: PropertyKind) -> Self {
        self.isolated_property = Some(kind);
        self
    }

    pub fn may_update(&self, kind: PropertyKind) -> bool {
        self.isolated_property.map_or(true, |isolated| isolated == kind)
    }

    /// 缺失的 bindWeight 块在隔离模式下也允许插入
    pub fn may_insert(&self, kind: PropertyKind) -> bool {
        kind == PropertyKind::BindWeight || self.may_update(kind)
    }
}

/// 一次插入
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Insertion {
    /// 发射器在结果缓冲区中的键
    pub key: EmitterKey,
    pub kind: PropertyKind,
    /// 新块第一行在结果缓冲区中的行号
    pub line: usize,
    pub line_count: usize,
}

/// 变更报告
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// 被原位改写的行（结果缓冲区中的行号）
    pub updated_lines: Vec<usize>,
    pub insertions: Vec<Insertion>,
    pub anomalies: Vec<EditAnomaly>,
    /// 本次插入的行号偏移记录
    pub shift: LineShift,
}

impl ApplyReport {
    /// 缓冲区是否没有任何变化
    pub fn is_noop(&self) -> bool {
        self.updated_lines.is_empty() && self.insertions.is_empty()
    }

    pub fn inserted_line_count(&self) -> usize {
        self.shift.total_inserted()
    }
}

/// 变更结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub lines: Vec<String>,
    pub report: ApplyReport,
}

/// 待回写的新锚点
struct PendingAnchor {
    system: usize,
    emitter: usize,
    kind: PropertyKind,
    step: usize,
    anchor: usize,
    start: usize,
    line_count: usize,
}

/// 把对象图中被选中发射器的修改写回缓冲区
///
/// 返回新的缓冲区；对象图中的锚点被换算到新缓冲区，新插入的属性获得锚点。
/// 单个属性的失败只记录到报告中，不会中止其余属性的处理。
pub fn apply<S, F>(
    lines: &[S],
    graph: &mut DocumentGraph,
    selection: &F,
    options: &ApplyOptions,
) -> ApplyOutcome
where
    S: AsRef<str>,
    F: SelectionFilter + ?Sized,
{
    let mut buffer: Vec<String> = lines.iter().map(|line| line.as_ref().to_string()).collect();

    // 插入开始之前记录目标下标
    let targets: Vec<(usize, usize)> = graph
        .systems
        .iter()
        .enumerate()
        .flat_map(|(si, system)| {
            system
                .emitters
                .iter()
                .enumerate()
                .filter(|(_, emitter)| selection.is_selected(&emitter.key()))
                .map(move |(ei, _)| (si, ei))
        })
        .collect();

    let mut report = ApplyReport::default();
    if targets.is_empty() {
        return ApplyOutcome { lines: buffer, report };
    }

    let changed = update_existing(&mut buffer, graph, &targets, options, &mut report.anomalies);
    let pending = insert_missing(&mut buffer, graph, &targets, options, &mut report);

    rebase_graph(graph, &report.shift);
    for anchor in pending {
        let emitter = &mut graph.systems[anchor.system].emitters[anchor.emitter];
        if let Some(slot) = emitter.properties.anchor_slot_mut(anchor.kind) {
            *slot = Some(report.shift.map_from(anchor.step + 1, anchor.anchor));
        }
        report.insertions.push(Insertion {
            key: emitter.key(),
            kind: anchor.kind,
            line: report.shift.map_from(anchor.step + 1, anchor.start),
            line_count: anchor.line_count,
        });
    }
    report.updated_lines = changed.into_iter().map(|line| report.shift.map(line)).collect();

    debug!(
        emitters = targets.len(),
        updated = report.updated_lines.len(),
        inserted = report.insertions.len(),
        anomalies = report.anomalies.len(),
        "Applied edits"
    );

    ApplyOutcome { lines: buffer, report }
}

/// 第一阶段：改写已有锚点的属性
fn update_existing(
    buffer: &mut [String],
    graph: &DocumentGraph,
    targets: &[(usize, usize)],
    options: &ApplyOptions,
    anomalies: &mut Vec<EditAnomaly>,
) -> BTreeSet<usize> {
    let mut updater = Updater::new(buffer, options.property_lookahead);

    for &(si, ei) in targets {
        let emitter = &graph.systems[si].emitters[ei];
        let key = emitter.key();
        let props = &emitter.properties;

        for kind in PropertyKind::ALL {
            if !options.may_update(kind) {
                continue;
            }
            match kind {
                PropertyKind::BirthScale => {
                    if let Some(record) = props.birth_scale.as_ref() {
                        updater.update_vector_embed(&key, kind, record);
                    }
                }
                PropertyKind::Scale => {
                    if let Some(record) = props.scale.as_ref() {
                        updater.update_vector_embed(&key, kind, record);
                    }
                }
                PropertyKind::BindWeight => {
                    if let Some(record) = props.bind_weight.as_ref() {
                        updater.update_bind_weight(&key, record);
                    }
                }
                PropertyKind::TranslationOverride => {
                    if let Some(record) = props.translation_override.as_ref() {
                        updater.update_translation(&key, record);
                    }
                }
            }
        }
    }

    anomalies.append(&mut updater.anomalies);
    updater.changed
}

/// 第二阶段：插入尚未写入缓冲区的属性
///
/// 每次插入都针对当前缓冲区重新定位锚点，发射器声明行通过 `LineShift` 换算。
fn insert_missing(
    buffer: &mut Vec<String>,
    graph: &DocumentGraph,
    targets: &[(usize, usize)],
    options: &ApplyOptions,
    report: &mut ApplyReport,
) -> Vec<PendingAnchor> {
    let mut pending = Vec::new();

    for &(si, ei) in targets {
        let emitter = &graph.systems[si].emitters[ei];

        for kind in INSERT_ORDER {
            if !options.may_insert(kind) || emitter.properties.anchor_of(kind) != Some(None) {
                continue;
            }
            let Some((block, offset)) = generate_for(kind, &emitter.properties, "") else {
                continue;
            };

            let center = report.shift.map(emitter.anchor_line);
            let Some(point) = resolve_insertion_point(
                buffer.as_slice(),
                center,
                &emitter.name,
                options.anchor_search_window,
            ) else {
                let anomaly = EditAnomaly::AnchorNotFound {
                    key: emitter.key(),
                    kind,
                    window: options.anchor_search_window,
                };
                warn!("{}", anomaly);
                report.anomalies.push(anomaly);
                continue;
            };
            if !point.exact {
                debug!(key = %emitter.key(), name = %emitter.name, "No exact emitterName match, using nearest");
            }

            let start = point.insert_at();
            let line_count = block.len();
            buffer.splice(
                start..start,
                block.into_iter().map(|line| format!("{}{}", point.indent, line)),
            );
            let step = report.shift.record(start, line_count);

            pending.push(PendingAnchor {
                system: si,
                emitter: ei,
                kind,
                step,
                anchor: start + offset,
                start,
                line_count,
            });
        }
    }

    pending
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::Vec3;
    use crate::document::parse;
    use crate::properties::{BindWeight, BirthScale, EmitterProperty, Scale, TranslationOverride};

    const SAMPLE: &str = r#"#PROP_text
type: string = "PROP"
entries: map[hash,embed] = {
    "Particles/SysA" = VfxSystemDefinitionData {
        complexEmitterDefinitionData: list[pointer] = {
            VfxEmitterDefinitionData {
                rate: embed = ValueFloat {
                    constantValue: f32 = 1
                }
                emitterName: string = "Glow"
                birthScale0: embed = ValueVector3 {
                    constantValue: vec3 = { 1.0, 2.0, 3.0 }
                }
            }
            VfxEmitterDefinitionData {
                emitterName: string = "Glow"
                bindWeight: embed = ValueFloat {
                    constantValue: f32 = 0.5
                }
            }
        }
        particleName: string = "SysA"
    }
    "Particles/SysB" = VfxSystemDefinitionData {
        complexEmitterDefinitionData: list[pointer] = {
            VfxEmitterDefinitionData {
                emitterName: string = "Glow"
                translationOverride: vec3 = { 0, 0, 0 }
            }
        }
    }
}"#;

    fn lines() -> Vec<String> {
        SAMPLE.lines().map(str::to_string).collect()
    }

    fn selection(keys: &[EmitterKey]) -> HashSet<EmitterKey> {
        keys.iter().cloned().collect()
    }

    /// 除 `except` 中的行号外，两个缓冲区逐行相同
    fn assert_same_except(before: &[String], after: &[String], except: &[usize]) {
        assert_eq!(before.len(), after.len());
        for (index, (a, b)) in before.iter().zip(after).enumerate() {
            if !except.contains(&index) {
                assert_eq!(a, b, "line {index} changed");
            }
        }
    }

    #[test]
    fn test_empty_selection_is_noop() {
        let text = lines();
        let mut graph = parse(&text);
        let original = graph.clone();

        for emitter in graph.emitters_mut() {
            Scale::add(emitter, Vec3::new(9.0, 9.0, 9.0));
            BirthScale::scale(emitter, 3.0);
        }
        let outcome = apply(&text, &mut graph, &HashSet::<EmitterKey>::new(), &ApplyOptions::default());

        assert_eq!(outcome.lines, text);
        assert!(outcome.report.is_noop());

        // 未改动时全选也是恒等变换
        let mut graph = original;
        let outcome = apply(&text, &mut graph, &AllEmitters, &ApplyOptions::default());
        assert_eq!(outcome.lines, text);
        assert!(outcome.report.is_noop());
    }

    #[test]
    fn test_update_changes_only_target_line() {
        let text = lines();
        let mut graph = parse(&text);
        let key = EmitterKey::new("Particles/SysA", 5);
        BirthScale::scale(graph.emitter_mut(&key).unwrap(), 2.0);

        let outcome = apply(&text, &mut graph, &selection(&[key]), &ApplyOptions::default());

        assert_eq!(outcome.lines[11], "                    constantValue: vec3 = { 2, 4, 6 }");
        assert_same_except(&text, &outcome.lines, &[11]);
        assert_eq!(outcome.report.updated_lines, vec![11]);
    }

    #[test]
    fn test_insert_bind_weight_after_emitter_name() {
        let text = lines();
        let mut graph = parse(&text);
        let key = EmitterKey::new("Particles/SysA", 5);
        assert!(BindWeight::add(graph.emitter_mut(&key).unwrap(), 1.0));

        let outcome = apply(&text, &mut graph, &selection(&[key.clone()]), &ApplyOptions::default());
        let out = &outcome.lines;

        assert_eq!(out.len(), text.len() + 3);
        assert_eq!(out[9], "                emitterName: string = \"Glow\"");
        assert_eq!(out[10], "                bindWeight: embed = ValueFloat {");
        assert_eq!(out[11], "                    constantValue: f32 = 1");
        assert_eq!(out[12], "                }");
        assert_eq!(&out[..10], &text[..10]);
        assert_eq!(&out[13..], &text[10..]);

        let report = &outcome.report;
        assert_eq!(report.insertions.len(), 1);
        assert_eq!(report.insertions[0].line, 10);
        assert_eq!(report.insertions[0].line_count, 3);

        // 插入后对象图仍是新缓冲区的有效视图
        let emitter = graph.emitter(&key).unwrap();
        assert_eq!(emitter.properties.bind_weight.as_ref().unwrap().anchor_line, Some(11));
        let second = &graph.systems[0].emitters[1];
        assert_eq!(second.anchor_line, 17);
        assert_eq!(second.properties.bind_weight.as_ref().unwrap().anchor_line, Some(20));
        assert_eq!(graph.systems[1].anchor_line, 26);

        let reparsed = parse(out);
        assert_eq!(reparsed, graph);
    }

    #[test]
    fn test_selection_gating() {
        let text = lines();
        let mut graph = parse(&text);
        let first = EmitterKey::new("Particles/SysA", 5);
        let second = EmitterKey::new("Particles/SysA", 14);

        BirthScale::scale(graph.emitter_mut(&first).unwrap(), 2.0);
        BindWeight::set_value(graph.emitter_mut(&second).unwrap(), 0.75);

        let outcome = apply(&text, &mut graph, &selection(&[second]), &ApplyOptions::default());

        assert_eq!(outcome.lines[17], "                    constantValue: f32 = 0.75");
        assert_same_except(&text, &outcome.lines, &[17]);
    }

    #[test]
    fn test_same_name_emitters_are_independent() {
        let text = lines();
        let mut graph = parse(&text);
        assert_eq!(graph.find_emitters_by_name("Glow").len(), 3);

        let target = EmitterKey::new("Particles/SysB", 25);
        for emitter in graph.emitters_mut() {
            TranslationOverride::add(emitter, Vec3::new(0.0, 50.0, 0.0));
            TranslationOverride::set_value(emitter, Vec3::new(0.0, 50.0, 0.0));
        }

        let outcome = apply(&text, &mut graph, &selection(&[target]), &ApplyOptions::default());

        assert_eq!(outcome.lines[27], "                translationOverride: vec3 = { 0, 50, 0 }");
        assert_same_except(&text, &outcome.lines, &[27]);

        // 未选中的同名发射器仍然没有锚点
        let first = graph.emitter(&EmitterKey::new("Particles/SysA", 5)).unwrap();
        assert_eq!(first.properties.translation_override.as_ref().unwrap().anchor_line, None);
    }

    #[test]
    fn test_isolated_mode() {
        let text = lines();
        let mut graph = parse(&text);
        let key = EmitterKey::new("Particles/SysA", 5);
        {
            let emitter = graph.emitter_mut(&key).unwrap();
            BirthScale::scale(emitter, 2.0);
            Scale::add(emitter, Vec3::new(1.0, 1.0, 1.0));
            BindWeight::add(emitter, 1.0);
        }

        let options = ApplyOptions::default().isolated(PropertyKind::TranslationOverride);
        let outcome = apply(&text, &mut graph, &selection(&[key.clone()]), &options);

        // birthScale0 的修改和 scale0 的插入都被跳过，bindWeight 照常插入
        assert_eq!(outcome.report.insertions.len(), 1);
        assert_eq!(outcome.report.insertions[0].kind, PropertyKind::BindWeight);
        assert!(outcome.report.updated_lines.is_empty());
        assert_eq!(outcome.lines[14], "                    constantValue: vec3 = { 1.0, 2.0, 3.0 }");

        let emitter = graph.emitter(&key).unwrap();
        assert_eq!(emitter.properties.scale.as_ref().unwrap().anchor_line, None);
    }

    #[test]
    fn test_multiple_insertions_keep_order() {
        let text = lines();
        let mut graph = parse(&text);
        let key = EmitterKey::new("Particles/SysA", 14);
        {
            let emitter = graph.emitter_mut(&key).unwrap();
            TranslationOverride::add(emitter, Vec3::new(1.0, 2.0, 3.0));
            Scale::add(emitter, Vec3::new(2.0, 2.0, 2.0));
        }

        let outcome = apply(&text, &mut graph, &selection(&[key.clone()]), &ApplyOptions::default());
        let out = &outcome.lines;

        assert_eq!(out[15], "                emitterName: string = \"Glow\"");
        assert_eq!(out[16], "                scale0: embed = ValueVector3 {");
        assert_eq!(out[17], "                    constantValue: vec3 = { 2, 2, 2 }");
        assert_eq!(out[18], "                }");
        assert_eq!(out[19], "                translationOverride: vec3 = { 1, 2, 3 }");
        assert_eq!(out[20], "                bindWeight: embed = ValueFloat {");

        let emitter = graph.emitter(&key).unwrap();
        assert_eq!(emitter.properties.scale.as_ref().unwrap().anchor_line, Some(16));
        assert_eq!(
            emitter.properties.translation_override.as_ref().unwrap().anchor_line,
            Some(19)
        );
        assert_eq!(emitter.properties.bind_weight.as_ref().unwrap().anchor_line, Some(21));
        assert_eq!(parse(out), graph);
    }

    #[test]
    fn test_anchor_outside_window_is_skipped() {
        let text = lines();
        let mut graph = parse(&text);
        let key = EmitterKey::new("Particles/SysB", 25);
        BindWeight::add(graph.emitter_mut(&key).unwrap(), 1.0);

        let options = ApplyOptions {
            anchor_search_window: 0,
            ..ApplyOptions::default()
        };
        let outcome = apply(&text, &mut graph, &selection(&[key.clone()]), &options);

        assert_eq!(outcome.lines, text);
        assert!(matches!(
            outcome.report.anomalies.as_slice(),
            [EditAnomaly::AnchorNotFound { kind: PropertyKind::BindWeight, .. }]
        ));
        let emitter = graph.emitter(&key).unwrap();
        assert_eq!(emitter.properties.bind_weight.as_ref().unwrap().anchor_line, None);
    }
}
