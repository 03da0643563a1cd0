use serde::{Deserialize, Serialize};
use crate::patterns::VEC3_GROUP;

/// 比较浮点值时使用的容差
pub const FLOAT_EPSILON: f32 = 1e-6;

/// 三维向量（vec3 字段的值）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// 每个分量乘以同一个倍数
    pub fn scaled(&self, multiplier: f32) -> Self {
        Self::new(self.x * multiplier, self.y * multiplier, self.z * multiplier)
    }

    /// 在 `FLOAT_EPSILON` 容差内比较
    pub fn approx_eq(&self, other: &Vec3) -> bool {
        float_eq(self.x, other.x) && float_eq(self.y, other.y) && float_eq(self.z, other.z)
    }

    /// 格式化为文本转储使用的 `{ x, y, z }` 形式
    pub fn to_text(&self) -> String {
        format!(
            "{{ {}, {}, {} }}",
            format_float(self.x),
            format_float(self.y),
            format_float(self.z)
        )
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// 标量关键帧（bindWeight 的 dynamics 数据）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloatKeyframe {
    pub time: f32,
    pub value: f32,
}

impl FloatKeyframe {
    pub const fn new(time: f32, value: f32) -> Self {
        Self { time, value }
    }
}

/// 浮点数近似相等
pub fn float_eq(a: f32, b: f32) -> bool {
    (a - b).abs() <= FLOAT_EPSILON * a.abs().max(b.abs()).max(1.0)
}

/// 宽松解析单个浮点数
///
/// 接受 `1`、`-0.5`、`.5`、`1e-3` 等形式，前后空白会被忽略。
/// 非法或非有限值返回 `None`，由调用方决定该字段视为缺失。
pub fn parse_float(token: &str) -> Option<f32> {
    let token = token.trim();
    let token = token.strip_suffix('f').unwrap_or(token);
    if token.is_empty() {
        return None;
    }
    token.parse::<f32>().ok().filter(|v| v.is_finite())
}

/// 解析 `{ x, y, z }` 或 `x, y, z`
///
/// 分量数量必须正好为 3，任何一个分量非法都返回 `None`。
pub fn parse_vec3(text: &str) -> Option<Vec3> {
    let inner = text.trim();
    let inner = inner.strip_prefix('{').unwrap_or(inner);
    let inner = inner.strip_suffix('}').unwrap_or(inner);

    let parts: Vec<&str> = inner.split(',').collect();
    if parts.len() != 3 {
        return None;
    }

    let x = parse_float(parts[0])?;
    let y = parse_float(parts[1])?;
    let z = parse_float(parts[2])?;
    Some(Vec3::new(x, y, z))
}

/// 解析 `list[f32]` 的正文（大括号之间的全部内容）
///
/// 元素之间可以是换行、空格或逗号。任何一个元素非法都返回 `None`。
pub fn parse_float_list(body: &str) -> Option<Vec<f32>> {
    body.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(parse_float)
        .collect()
}

/// 解析 `list[vec3]` 的正文
///
/// 正文中除了 `{ x, y, z }` 分组以外不能有其它内容（空白和逗号除外）。
pub fn parse_vec3_list(body: &str) -> Option<Vec<Vec3>> {
    let mut values = Vec::new();
    let mut last_end = 0;

    for group in VEC3_GROUP.find_iter(body) {
        if !is_separator(&body[last_end..group.start()]) {
            return None;
        }
        values.push(parse_vec3(group.as_str())?);
        last_end = group.end();
    }

    if !is_separator(&body[last_end..]) {
        return None;
    }

    Some(values)
}

fn is_separator(text: &str) -> bool {
    text.chars().all(|c| c == ',' || c.is_whitespace())
}

/// 把浮点数格式化为转储文本中的写法
///
/// 整数值不带小数点（`2.0` 输出 `2`），其余使用最短的可往返表示。
pub fn format_float(value: f32) -> String {
    if value == 0.0 {
        // 包括 -0.0
        return "0".to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e9 {
        return format!("{}", value as i64);
    }
    format!("{}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_float_permissive() {
        assert_eq!(parse_float("1"), Some(1.0));
        assert_eq!(parse_float(" -0.5 "), Some(-0.5));
        assert_eq!(parse_float(".25"), Some(0.25));
        assert_eq!(parse_float("1e-3"), Some(0.001));
        assert_eq!(parse_float("2.5f"), Some(2.5));
        assert_eq!(parse_float("abc"), None);
        assert_eq!(parse_float(""), None);
        assert_eq!(parse_float("1.2.3"), None);
    }

    #[test]
    fn test_parse_vec3() {
        assert_eq!(parse_vec3("{ 1.0, 2.0, 3.0 }"), Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(parse_vec3("0, -50, 1e2"), Some(Vec3::new(0.0, -50.0, 100.0)));
        assert_eq!(parse_vec3("{ 1, 2 }"), None);
        assert_eq!(parse_vec3("{ 1, x, 3 }"), None);
    }

    #[test]
    fn test_parse_float_list() {
        assert_eq!(parse_float_list("\n 0\n 0.5\n 1\n"), Some(vec![0.0, 0.5, 1.0]));
        assert_eq!(parse_float_list(" 0, 0.5, 1 "), Some(vec![0.0, 0.5, 1.0]));
        assert_eq!(parse_float_list(""), Some(vec![]));
        assert_eq!(parse_float_list("0 oops 1"), None);
    }

    #[test]
    fn test_parse_vec3_list() {
        let body = "\n { 1, 1, 1 }\n { 2, 2, 2 }\n";
        assert_eq!(
            parse_vec3_list(body),
            Some(vec![Vec3::new(1.0, 1.0, 1.0), Vec3::new(2.0, 2.0, 2.0)])
        );
        assert_eq!(parse_vec3_list("{ 1, 1, 1 } junk"), None);
        assert_eq!(parse_vec3_list("{ 1, 1 }"), None);
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(2.0), "2");
        assert_eq!(format_float(-0.0), "0");
        assert_eq!(format_float(0.1), "0.1");
        assert_eq!(format_float(-12.5), "-12.5");
        assert_eq!(Vec3::new(2.0, 4.0, 6.0).to_text(), "{ 2, 4, 6 }");
    }

    #[test]
    fn test_vec3_scaled() {
        let v = Vec3::new(1.0, 2.0, 3.0).scaled(2.0);
        assert!(v.approx_eq(&Vec3::new(2.0, 4.0, 6.0)));
    }
}
