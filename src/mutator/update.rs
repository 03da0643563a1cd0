/// 原位更新
///
/// 锚点已知的属性只替换值所在的片段：字段名的大小写、缩进和行内其它文本保持原样。
/// 当前值与内存中的值相同时不改写该行，避免改动原有的数字写法。
use std::collections::BTreeSet;
use regex::Regex;
use tracing::warn;
use crate::datatypes::{float_eq, format_float, parse_float, parse_vec3, FloatKeyframe, Vec3};
use crate::diagnostics::EditAnomaly;
use crate::patterns::{
    brace_delta, find_block_end, BIND_WEIGHT_DECL, BIRTH_SCALE_DECL, CONST_F32, CONST_VEC3,
    DYNAMICS_DECL, NUMBER, SCALE_DECL, TIMES_DECL, TRANSLATION_OVERRIDE, VALUES_DECL,
};
use crate::record::{
    EmitterKey, PropertyKind, ScalarDynamicProperty, VectorConstProperty, VectorProperty,
};

/// 列表条目在缓冲区中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ListEntry {
    line: usize,
    start: usize,
    end: usize,
}

/// 待替换的片段
struct Replacement {
    line: usize,
    start: usize,
    end: usize,
    text: String,
}

pub(crate) struct Updater<'a> {
    lines: &'a mut [String],
    lookahead: usize,
    pub changed: BTreeSet<usize>,
    pub anomalies: Vec<EditAnomaly>,
}

impl<'a> Updater<'a> {
    pub fn new(lines: &'a mut [String], lookahead: usize) -> Self {
        Self {
            lines,
            lookahead,
            changed: BTreeSet::new(),
            anomalies: Vec::new(),
        }
    }

    fn record(&mut self, anomaly: EditAnomaly) {
        warn!("{}", anomaly);
        self.anomalies.push(anomaly);
    }

    fn mismatch(&mut self, key: &EmitterKey, kind: PropertyKind, line: usize) {
        self.record(EditAnomaly::ValueSyntaxMismatch {
            key: key.clone(),
            kind,
            line,
        });
    }

    fn constant_missing(&mut self, key: &EmitterKey, kind: PropertyKind, line: usize) {
        self.record(EditAnomaly::ConstantLineMissing {
            key: key.clone(),
            kind,
            line,
        });
    }

    fn line_exists(&mut self, key: &EmitterKey, kind: PropertyKind, line: usize) -> bool {
        if line < self.lines.len() {
            return true;
        }
        self.mismatch(key, kind, line);
        false
    }

    /// 从右到左应用替换，同一行上的多个替换互不影响
    fn apply_replacements(&mut self, mut replacements: Vec<Replacement>) {
        replacements.sort_by(|a, b| (b.line, b.start).cmp(&(a.line, a.start)));
        for r in replacements {
            let line = &mut self.lines[r.line];
            if line[r.start..r.end] != r.text {
                line.replace_range(r.start..r.end, &r.text);
                self.changed.insert(r.line);
            }
        }
    }

    /// 替换正则第 2 组（值部分）
    fn replace_value_group(&mut self, index: usize, pattern: &Regex, text: String) -> bool {
        let Some(range) = pattern
            .captures(&self.lines[index])
            .and_then(|caps| caps.get(2))
            .map(|m| m.range())
        else {
            return false;
        };
        self.apply_replacements(vec![Replacement {
            line: index,
            start: range.start,
            end: range.end,
            text,
        }]);
        true
    }

    /// `translationOverride: vec3 = { ... }`
    pub fn update_translation(&mut self, key: &EmitterKey, record: &VectorConstProperty) {
        let kind = PropertyKind::TranslationOverride;
        let (Some(anchor), Some(value)) = (record.anchor_line, record.constant_value) else {
            return;
        };
        if !self.line_exists(key, kind, anchor) {
            return;
        }

        let current = TRANSLATION_OVERRIDE
            .captures(&self.lines[anchor])
            .map(|caps| parse_vec3(&caps[2]));
        match current {
            None => self.mismatch(key, kind, anchor),
            Some(Some(existing)) if existing.approx_eq(&value) => {}
            Some(_) => {
                self.replace_value_group(anchor, &TRANSLATION_OVERRIDE, value.to_text());
            }
        }
    }

    /// `birthScale0` / `scale0`：锚点为声明行
    pub fn update_vector_embed(
        &mut self,
        key: &EmitterKey,
        kind: PropertyKind,
        record: &VectorProperty,
    ) {
        let Some(anchor) = record.anchor_line else {
            return;
        };
        if !self.line_exists(key, kind, anchor) {
            return;
        }

        let declaration: &Regex = match kind {
            PropertyKind::BirthScale => &*BIRTH_SCALE_DECL,
            _ => &*SCALE_DECL,
        };
        if !declaration.is_match(&self.lines[anchor]) {
            self.mismatch(key, kind, anchor);
            return;
        }

        let end = find_block_end(&*self.lines, anchor, 0, self.lookahead).end;

        if let Some(value) = record.constant_value {
            match find_child(&*self.lines, anchor, 0, end, &CONST_VEC3) {
                Some(index) => {
                    let existing = CONST_VEC3
                        .captures(&self.lines[index])
                        .and_then(|caps| parse_vec3(&caps[2]));
                    if !existing.is_some_and(|v| v.approx_eq(&value)) {
                        self.replace_value_group(index, &CONST_VEC3, value.to_text());
                    }
                }
                None => self.constant_missing(key, kind, anchor),
            }
        }

        if let Some(values) = record.dynamic_values.as_ref() {
            if let Some(dynamics) = find_child(&*self.lines, anchor, 0, end, &DYNAMICS_DECL) {
                self.update_vec3_values(key, kind, dynamics, end, values);
            }
        }
    }

    /// `bindWeight`：锚点为 constantValue 行（没有常量时为声明行）
    pub fn update_bind_weight(&mut self, key: &EmitterKey, record: &ScalarDynamicProperty) {
        let kind = PropertyKind::BindWeight;
        let Some(anchor) = record.anchor_line else {
            return;
        };
        if !self.line_exists(key, kind, anchor) {
            return;
        }

        let initial_depth = if CONST_F32.is_match(&self.lines[anchor]) {
            1
        } else if BIND_WEIGHT_DECL.is_match(&self.lines[anchor]) {
            0
        } else {
            self.mismatch(key, kind, anchor);
            return;
        };

        if initial_depth == 1 {
            if let Some(value) = record.constant_value {
                let existing = CONST_F32
                    .captures(&self.lines[anchor])
                    .and_then(|caps| parse_float(&caps[2]));
                if !existing.is_some_and(|v| float_eq(v, value)) {
                    self.replace_value_group(anchor, &CONST_F32, format_float(value));
                }
            }
        } else if record.constant_value.is_some() {
            // 只有 dynamics 的块
            self.constant_missing(key, kind, anchor);
        }

        let Some(keyframes) = record.dynamic_values.as_ref() else {
            return;
        };
        let end = find_block_end(&*self.lines, anchor, initial_depth, self.lookahead).end;
        if let Some(dynamics) = find_child(&*self.lines, anchor, initial_depth, end, &DYNAMICS_DECL) {
            self.update_keyframes(key, dynamics, end, keyframes);
        }
    }

    fn update_vec3_values(
        &mut self,
        key: &EmitterKey,
        kind: PropertyKind,
        dynamics: usize,
        limit_end: usize,
        values: &[Vec3],
    ) {
        let end = self.dynamics_end(dynamics, limit_end);
        let Some(header) = find_child(&*self.lines, dynamics, 0, end, &VALUES_DECL) else {
            return;
        };

        let entries = vec3_entries(&*self.lines, header, end);
        self.check_count(key, kind, values.len(), entries.len());

        let replacements = entries
            .iter()
            .zip(values)
            .filter(|(entry, value)| {
                parse_vec3(&self.lines[entry.line][entry.start..entry.end])
                    .map_or(true, |existing| !existing.approx_eq(value))
            })
            .map(|(entry, value)| Replacement {
                line: entry.line,
                start: entry.start,
                end: entry.end,
                text: value.to_text(),
            })
            .collect();
        self.apply_replacements(replacements);
    }

    fn update_keyframes(
        &mut self,
        key: &EmitterKey,
        dynamics: usize,
        limit_end: usize,
        keyframes: &[FloatKeyframe],
    ) {
        let end = self.dynamics_end(dynamics, limit_end);
        let times: Vec<f32> = keyframes.iter().map(|k| k.time).collect();
        let values: Vec<f32> = keyframes.iter().map(|k| k.value).collect();

        let mut replacements = Vec::new();
        // 每个属性最多报告一次，但两个列表都要检查
        let mut count_reported = false;
        for (pattern, new_values) in [(&*TIMES_DECL, &times), (&*VALUES_DECL, &values)] {
            let Some(header) = find_child(&*self.lines, dynamics, 0, end, pattern) else {
                continue;
            };
            let entries = number_entries(&*self.lines, header, end);
            if !count_reported && entries.len() != new_values.len() {
                self.check_count(key, PropertyKind::BindWeight, new_values.len(), entries.len());
                count_reported = true;
            }
            replacements.extend(
                entries
                    .iter()
                    .zip(new_values.iter())
                    .filter(|(entry, value)| {
                        parse_float(&self.lines[entry.line][entry.start..entry.end])
                            .map_or(true, |existing| !float_eq(existing, **value))
                    })
                    .map(|(entry, value)| Replacement {
                        line: entry.line,
                        start: entry.start,
                        end: entry.end,
                        text: format_float(*value),
                    }),
            );
        }
        self.apply_replacements(replacements);
    }

    fn dynamics_end(&self, dynamics: usize, limit_end: usize) -> usize {
        find_block_end(&*self.lines, dynamics, 0, limit_end + 1 - dynamics).end
    }

    fn check_count(&mut self, key: &EmitterKey, kind: PropertyKind, memory: usize, buffer: usize) {
        if memory != buffer {
            self.record(EditAnomaly::KeyframeCountMismatch {
                key: key.clone(),
                kind,
                memory,
                buffer,
            });
        }
    }
}

/// 在 `from..=end` 内寻找块的直接子字段
///
/// `initial_depth` 是 `from` 行之前的深度，匹配只在深度为 1 的行上进行。
fn find_child(
    lines: &[String],
    from: usize,
    initial_depth: i32,
    end: usize,
    pattern: &Regex,
) -> Option<usize> {
    let mut depth = initial_depth;
    for (index, line) in lines.iter().enumerate().take(end + 1).skip(from) {
        // 声明行本身也要检查：单行块的字段与声明写在同一行
        let on_declaration = index == from && initial_depth == 0;
        if (depth == 1 || on_declaration) && pattern.is_match(line) {
            return Some(index);
        }
        depth += brace_delta(line);
    }
    None
}

/// 列表声明行中 `= {` 之后的起始位置
fn list_start(line: &str) -> Option<usize> {
    let eq = line.find('=')?;
    let open = line[eq..].find('{')?;
    Some(eq + open + 1)
}

/// 按位置列出 `list[vec3]` 的每个 `{ x, y, z }` 条目
fn vec3_entries(lines: &[String], header: usize, end: usize) -> Vec<ListEntry> {
    let mut entries = Vec::new();
    let Some(mut offset) = list_start(&lines[header]) else {
        return entries;
    };

    let mut depth = 1;
    for (index, line) in lines.iter().enumerate().take(end + 1).skip(header) {
        let mut entry_start = None;
        for (pos, c) in line[offset..].char_indices() {
            let pos = pos + offset;
            match c {
                '{' => {
                    depth += 1;
                    if depth == 2 {
                        entry_start = Some(pos);
                    }
                }
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return entries;
                    }
                    if depth == 1 {
                        if let Some(start) = entry_start.take() {
                            entries.push(ListEntry { line: index, start, end: pos + 1 });
                        }
                    }
                }
                _ => {}
            }
        }
        offset = 0;
    }

    entries
}

/// 按位置列出 `list[f32]` 的每个数字条目
fn number_entries(lines: &[String], header: usize, end: usize) -> Vec<ListEntry> {
    let mut entries = Vec::new();
    let Some(mut offset) = list_start(&lines[header]) else {
        return entries;
    };

    for (index, line) in lines.iter().enumerate().take(end + 1).skip(header) {
        let segment = &line[offset..];
        let close = segment.find('}');
        let region = &segment[..close.unwrap_or(segment.len())];

        entries.extend(NUMBER.find_iter(region).map(|m| ListEntry {
            line: index,
            start: offset + m.start(),
            end: offset + m.end(),
        }));

        if close.is_some() {
            break;
        }
        offset = 0;
    }

    entries
}
