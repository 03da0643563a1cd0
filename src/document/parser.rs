/// 文档模型构建器
///
/// 单遍正向扫描，显式跟踪大括号深度。块嵌套浅且不规则，所以不使用递归下降。
/// 每个已知属性交给专门的子解析器，子解析器在有界窗口内扫描自己的块。
/// 未识别的行一律忽略。
use serde::Serialize;
use tracing::{debug, warn};
use super::DocumentGraph;
use crate::config::EditorConfig;
use crate::datatypes::{parse_float, parse_float_list, parse_vec3, parse_vec3_list, FloatKeyframe};
use crate::diagnostics::ParseAnomaly;
use crate::patterns::{
    brace_delta, find_block_end, BIND_WEIGHT_DECL, BIRTH_SCALE_DECL, CONST_F32, CONST_VEC3,
    DYNAMICS_DECL, EMITTER_DECL, EMITTER_NAME, SCALE_DECL, SYSTEM_DECL, TIMES_DECL,
    TRANSLATION_OVERRIDE, TRANSLATION_OVERRIDE_DECL, VALUES_DECL,
};
use crate::record::{
    EmitterRecord, ScalarDynamicProperty, SystemRecord, VectorConstProperty, VectorProperty,
};

/// 解析结果：对象图以及解析过程中记录的异常
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParseReport {
    pub graph: DocumentGraph,
    pub anomalies: Vec<ParseAnomaly>,
}

/// 解析文本缓冲区（默认配置）
///
/// 纯函数：不修改输入，相同输入总是得到相同的对象图。
pub fn parse<S: AsRef<str>>(lines: &[S]) -> DocumentGraph {
    parse_with_report(lines, &EditorConfig::default()).graph
}

/// 解析文本缓冲区并返回异常列表
pub fn parse_with_report<S: AsRef<str>>(lines: &[S], config: &EditorConfig) -> ParseReport {
    let mut parser = DocumentParser {
        lines,
        lookahead: config.property_lookahead,
        anomalies: Vec::new(),
    };
    let graph = parser.run();

    debug!(
        systems = graph.systems.len(),
        emitters = graph.emitter_count(),
        anomalies = parser.anomalies.len(),
        "Parsed document"
    );

    ParseReport {
        graph,
        anomalies: parser.anomalies,
    }
}

impl DocumentGraph {
    /// 从文本行构建对象图，等价于 [`parse`]
    pub fn parse<S: AsRef<str>>(lines: &[S]) -> Self {
        parse(lines)
    }
}

struct OpenBlock<T> {
    record: T,
    depth: i32,
}

struct DocumentParser<'a, S> {
    lines: &'a [S],
    lookahead: usize,
    anomalies: Vec<ParseAnomaly>,
}

impl<'a, S: AsRef<str>> DocumentParser<'a, S> {
    fn line(&self, index: usize) -> &'a str {
        let lines: &'a [S] = self.lines;
        lines[index].as_ref()
    }

    fn record(&mut self, anomaly: ParseAnomaly) {
        warn!("{}", anomaly);
        self.anomalies.push(anomaly);
    }

    fn run(&mut self) -> DocumentGraph {
        let mut systems = Vec::new();
        let mut system: Option<OpenBlock<SystemRecord>> = None;
        let mut emitter: Option<OpenBlock<EmitterRecord>> = None;

        for index in 0..self.lines.len() {
            let line = self.line(index);
            let delta = brace_delta(line);

            let Some(open_system) = system.as_mut() else {
                if let Some(caps) = SYSTEM_DECL.captures(line) {
                    let full_name = caps
                        .get(1)
                        .or_else(|| caps.get(2))
                        .map(|m| m.as_str())
                        .unwrap_or_default();
                    let record = SystemRecord::new(full_name, index);
                    if delta > 0 {
                        system = Some(OpenBlock { record, depth: delta });
                    } else {
                        systems.push(record);
                    }
                }
                continue;
            };

            if let Some(open_emitter) = emitter.as_mut() {
                // 只识别发射器的直接字段，嵌套对象里的同名字段不算
                if open_emitter.depth == 1 {
                    self.parse_emitter_field(&mut open_emitter.record, index);
                }
                open_emitter.depth += delta;
                if open_emitter.depth <= 0 {
                    if open_emitter.depth < 0 {
                        self.record(ParseAnomaly::BraceImbalance { line: index });
                    }
                    if let Some(done) = emitter.take() {
                        open_system.record.emitters.push(done.record);
                    }
                }
            } else if EMITTER_DECL.is_match(line) {
                let record = EmitterRecord::new(open_system.record.full_name.clone(), index);
                if delta > 0 {
                    emitter = Some(OpenBlock { record, depth: delta });
                } else {
                    open_system.record.emitters.push(record);
                }
            }

            open_system.depth += delta;
            if open_system.depth <= 0 {
                if open_system.depth < 0 {
                    self.record(ParseAnomaly::BraceImbalance { line: index });
                }
                if let Some(pending) = emitter.take() {
                    open_system.record.emitters.push(pending.record);
                }
                if let Some(done) = system.take() {
                    systems.push(done.record);
                }
            }
        }

        if let Some(mut open_system) = system.take() {
            if let Some(pending) = emitter.take() {
                self.record(ParseAnomaly::UnclosedBlock { line: pending.record.anchor_line });
                open_system.record.emitters.push(pending.record);
            }
            self.record(ParseAnomaly::UnclosedBlock { line: open_system.record.anchor_line });
            systems.push(open_system.record);
        }

        DocumentGraph::new(systems)
    }

    fn parse_emitter_field(&mut self, emitter: &mut EmitterRecord, index: usize) {
        let line = self.line(index);

        if let Some(caps) = EMITTER_NAME.captures(line) {
            emitter.name = caps[2].to_string();
        } else if BIRTH_SCALE_DECL.is_match(line) {
            emitter.properties.birth_scale = Some(self.parse_vector_embed(index, "birthScale0"));
        } else if SCALE_DECL.is_match(line) {
            emitter.properties.scale = Some(self.parse_vector_embed(index, "scale0"));
        } else if BIND_WEIGHT_DECL.is_match(line) {
            emitter.properties.bind_weight = Some(self.parse_float_embed(index));
        } else if TRANSLATION_OVERRIDE_DECL.is_match(line) {
            emitter.properties.translation_override = Some(self.parse_translation_override(index));
        }
    }

    /// `birthScale0` / `scale0`：`ValueVector3` 内嵌对象
    fn parse_vector_embed(&mut self, start: usize, field: &'static str) -> VectorProperty {
        let span = self.property_span(start, field);
        let mut property = VectorProperty {
            anchor_line: Some(start),
            ..Default::default()
        };

        let mut depth = 0;
        for index in start..=span {
            let line = self.line(index);
            if depth <= 1 {
                if let Some(caps) = CONST_VEC3.captures(line) {
                    property.constant_value = parse_vec3(&caps[2]);
                    if property.constant_value.is_none() {
                        self.record(ParseAnomaly::MalformedField { line: index, field });
                    }
                } else if DYNAMICS_DECL.is_match(line) {
                    property.dynamic_values = self
                        .read_dynamics(index, span, field, parse_vec3_list)
                        .map(|(_, values)| values);
                }
            }
            depth += brace_delta(line);
        }

        property
    }

    /// `bindWeight`：`ValueFloat` 内嵌对象，锚点为 constantValue 行
    fn parse_float_embed(&mut self, start: usize) -> ScalarDynamicProperty {
        const FIELD: &str = "bindWeight";
        let span = self.property_span(start, FIELD);
        let mut property = ScalarDynamicProperty::default();
        let mut constant_line = None;

        let mut depth = 0;
        for index in start..=span {
            let line = self.line(index);
            if depth <= 1 {
                if let Some(caps) = CONST_F32.captures(line) {
                    constant_line = Some(index);
                    property.constant_value = parse_float(&caps[2]);
                    if property.constant_value.is_none() {
                        self.record(ParseAnomaly::MalformedField { line: index, field: FIELD });
                    }
                } else if DYNAMICS_DECL.is_match(line) {
                    property.dynamic_values = self
                        .read_dynamics(index, span, FIELD, parse_float_list)
                        .map(|(times, values)| {
                            times
                                .into_iter()
                                .zip(values)
                                .map(|(time, value)| FloatKeyframe::new(time, value))
                                .collect()
                        });
                }
            }
            depth += brace_delta(line);
        }

        property.anchor_line = Some(constant_line.unwrap_or(start));
        property
    }

    fn parse_translation_override(&mut self, index: usize) -> VectorConstProperty {
        let constant_value = TRANSLATION_OVERRIDE
            .captures(self.line(index))
            .and_then(|caps| parse_vec3(&caps[2]));
        if constant_value.is_none() {
            self.record(ParseAnomaly::MalformedField {
                line: index,
                field: "translationOverride",
            });
        }

        VectorConstProperty {
            constant_value,
            anchor_line: Some(index),
        }
    }

    /// 属性块的最后一行（受向前扫描窗口限制）
    fn property_span(&mut self, start: usize, field: &'static str) -> usize {
        let span = find_block_end(self.lines, start, 0, self.lookahead);
        if !span.closed {
            self.record(ParseAnomaly::UnterminatedProperty {
                line: start,
                field,
                window: self.lookahead,
            });
        }
        span.end
    }

    /// 读取 dynamics 子块中的 times / values 列表
    ///
    /// 两个列表按位置配对；任一列表缺失、非法或长度不一致时整个 dynamics 视为缺失。
    fn read_dynamics<T>(
        &mut self,
        start: usize,
        limit_end: usize,
        field: &'static str,
        parse_values: fn(&str) -> Option<Vec<T>>,
    ) -> Option<(Vec<f32>, Vec<T>)> {
        let window = limit_end + 1 - start;
        let end = find_block_end(self.lines, start, 0, window).end;

        let mut times = ListField::Absent;
        let mut values = ListField::Absent;
        let mut depth = 0;
        for index in start..=end {
            let line = self.line(index);
            if depth == 1 {
                if TIMES_DECL.is_match(line) {
                    times = read_list(self.lines, index, end, parse_float_list);
                } else if VALUES_DECL.is_match(line) {
                    values = read_list(self.lines, index, end, parse_values);
                }
            }
            depth += brace_delta(line);
        }

        match (times, values) {
            (ListField::Parsed(times), ListField::Parsed(values)) => {
                if times.len() == values.len() {
                    Some((times, values))
                } else {
                    self.record(ParseAnomaly::KeyframeMismatch {
                        line: start,
                        field,
                        times: times.len(),
                        values: values.len(),
                    });
                    None
                }
            }
            (ListField::Malformed, _) | (_, ListField::Malformed) => {
                self.record(ParseAnomaly::MalformedField { line: start, field });
                None
            }
            // 被窗口截断的列表已经记录为 UnterminatedProperty
            _ => None,
        }
    }
}

/// dynamics 子块中一个列表的读取结果
enum ListField<T> {
    Absent,
    Truncated,
    Malformed,
    Parsed(Vec<T>),
}

fn read_list<S: AsRef<str>, T>(
    lines: &[S],
    header: usize,
    end: usize,
    parse: fn(&str) -> Option<Vec<T>>,
) -> ListField<T> {
    let opens = lines[header]
        .as_ref()
        .split_once('=')
        .is_some_and(|(_, rest)| rest.contains('{'));
    if !opens {
        return ListField::Malformed;
    }
    match list_body(lines, header, end) {
        None => ListField::Truncated,
        Some(body) => parse(&body).map_or(ListField::Malformed, ListField::Parsed),
    }
}

/// 取出 `name: list[..] = { ... }` 大括号之间的正文，可跨多行
fn list_body<S: AsRef<str>>(lines: &[S], header: usize, end: usize) -> Option<String> {
    let line = lines[header].as_ref();
    let rest = &line[line.find('=')? + 1..];
    let rest = &rest[rest.find('{')? + 1..];

    let mut body = String::new();
    let mut depth = 1;
    let tail = lines[header + 1..=end.max(header)].iter().map(|l| l.as_ref());

    for segment in std::iter::once(rest).chain(tail) {
        for c in segment.chars() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(body);
                    }
                }
                _ => {}
            }
            body.push(c);
        }
        body.push('\n');
    }

    None
}
