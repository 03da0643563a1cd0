/// 文本转储的关键字匹配
///
/// 所有关键字都按大小写不敏感匹配，上游转换器输出的大小写并不统一。
/// 正则在首次使用时编译，之后在解析器和变更引擎之间共享。
use once_cell::sync::Lazy;
use regex::Regex;

/// 数字记号（支持科学计数法）
pub const NUMBER_PATTERN: &str = r"-?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?";

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("内置正则必须合法")
}

/// `"<path/name>" = VfxSystemDefinitionData {`，名称也可能是未加引号的哈希
pub static SYSTEM_DECL: Lazy<Regex> = Lazy::new(|| {
    compile(r#"(?i)^\s*(?:"([^"]*)"|([^\s=]+))\s*=\s*VfxSystemDefinitionData\b"#)
});

/// `VfxEmitterDefinitionData {`
pub static EMITTER_DECL: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)^\s*VfxEmitterDefinitionData\b"));

/// `emitterName: string = "<name>"`
pub static EMITTER_NAME: Lazy<Regex> =
    Lazy::new(|| compile(r#"(?i)^(\s*)emitterName\s*:\s*string\s*=\s*"([^"]*)""#));

pub static BIRTH_SCALE_DECL: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)^\s*birthScale0\s*:\s*embed\s*=\s*ValueVector3\b"));

pub static SCALE_DECL: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)^\s*scale0\s*:\s*embed\s*=\s*ValueVector3\b"));

/// 单行 translationOverride 声明（只用于识别，取值见 `TRANSLATION_OVERRIDE`）
pub static TRANSLATION_OVERRIDE_DECL: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)^\s*translationOverride\s*:\s*vec3\b"));

pub static BIND_WEIGHT_DECL: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)^\s*bindWeight\s*:\s*embed\s*=\s*ValueFloat\b"));

/// 单行的 `translationOverride: vec3 = { x, y, z }`，第 2 组为值部分
pub static TRANSLATION_OVERRIDE: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)(translationOverride\s*:\s*vec3\s*=\s*)(\{[^}]*\})"));

/// `constantValue: vec3 = { x, y, z }`，第 2 组为值部分
pub static CONST_VEC3: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)(constantValue\s*:\s*vec3\s*=\s*)(\{[^}]*\})"));

/// `constantValue: f32 = <num>`，第 2 组为值记号（可能非法，由调用方校验）
pub static CONST_F32: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)(constantValue\s*:\s*f32\s*=\s*)([^\s}]+)"));

pub static DYNAMICS_DECL: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)^\s*dynamics\s*:\s*pointer\s*="));

pub static TIMES_DECL: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)^\s*times\s*:\s*list\[\s*f32\s*\]\s*="));

/// `values: list[vec3] = {` 或 `values: list[f32] = {`
pub static VALUES_DECL: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)^\s*values\s*:\s*list\[\s*(vec3|f32)\s*\]\s*="));

pub static NUMBER: Lazy<Regex> = Lazy::new(|| compile(NUMBER_PATTERN));

/// 单个 `{ ... }` 分组（不含嵌套）
pub static VEC3_GROUP: Lazy<Regex> = Lazy::new(|| compile(r"\{[^{}]*\}"));

/// 统计一行的大括号净增量，忽略字符串字面量里的括号
pub fn brace_delta(line: &str) -> i32 {
    let mut delta = 0;
    let mut in_string = false;
    let mut escaped = false;

    for c in line.chars() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => delta += 1,
            '}' => delta -= 1,
            _ => {}
        }
    }

    delta
}

/// 一个大括号块在缓冲区中的范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    pub start: usize,
    /// 块关闭所在行；未关闭时为扫描到的最后一行
    pub end: usize,
    pub closed: bool,
}

/// 从 `start` 行开始向前扫描，直到深度回到 0 或超出 `limit` 行
///
/// `initial_depth` 是 `start` 行之前的深度：从块声明行开始扫描时为 0，
/// 从块内部某一行开始时为 1。
pub fn find_block_end<S: AsRef<str>>(
    lines: &[S],
    start: usize,
    initial_depth: i32,
    limit: usize,
) -> BlockSpan {
    let stop = lines.len().min(start.saturating_add(limit.max(1)));
    let mut depth = initial_depth;
    let mut end = start;

    for (index, line) in lines.iter().enumerate().take(stop).skip(start) {
        depth += brace_delta(line.as_ref());
        end = index;
        if depth <= 0 {
            return BlockSpan { start, end, closed: true };
        }
    }

    BlockSpan { start, end, closed: false }
}
