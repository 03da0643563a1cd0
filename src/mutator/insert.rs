/// 插入锚点定位
///
/// 新属性紧跟在发射器的 emitterName 行之后。搜索范围是发射器声明行前后
/// `window` 行，每次都针对当前（已插入过的）缓冲区重新扫描。
use crate::patterns::EMITTER_NAME;

/// 找到的插入锚点
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertionPoint {
    /// emitterName 所在行
    pub name_line: usize,
    /// emitterName 行的缩进，新块沿用
    pub indent: String,
    /// 是否按名称精确匹配
    pub exact: bool,
}

impl InsertionPoint {
    /// 新块的第一行
    pub fn insert_at(&self) -> usize {
        self.name_line + 1
    }
}

/// 在 `center` 前后 `window` 行内寻找插入锚点
///
/// 优先选择名称完全相同且距离最近的 emitterName 行；没有时退回距离最近的任意
/// emitterName 行。距离相同时取行号较小者。
pub fn resolve_insertion_point<S: AsRef<str>>(
    lines: &[S],
    center: usize,
    name: &str,
    window: usize,
) -> Option<InsertionPoint> {
    if lines.is_empty() {
        return None;
    }
    let low = center.saturating_sub(window);
    let high = center.saturating_add(window).min(lines.len() - 1);

    let mut exact: Option<(usize, usize, &str)> = None;
    let mut nearest: Option<(usize, usize, &str)> = None;

    for (index, line) in lines.iter().enumerate().take(high + 1).skip(low) {
        let line = line.as_ref();
        let Some(caps) = EMITTER_NAME.captures(line) else {
            continue;
        };
        let distance = index.abs_diff(center);
        let indent = caps.get(1).map_or("", |m| m.as_str());

        if nearest.map_or(true, |(_, best, _)| distance < best) {
            nearest = Some((index, distance, indent));
        }
        if &caps[2] == name && exact.map_or(true, |(_, best, _)| distance < best) {
            exact = Some((index, distance, indent));
        }
    }

    let is_exact = exact.is_some();
    exact.or(nearest).map(|(name_line, _, indent)| InsertionPoint {
        name_line,
        indent: indent.to_string(),
        exact: is_exact,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer() -> Vec<&'static str> {
        vec![
            "VfxEmitterDefinitionData {",        // 0
            "    emitterName: string = \"Glow\"", // 1
            "}",                                 // 2
            "VfxEmitterDefinitionData {",        // 3
            "  EmitterName: string = \"Spark\"",  // 4
            "}",                                 // 5
            "VfxEmitterDefinitionData {",        // 6
            "    emitterName: string = \"Glow\"", // 7
            "}",                                 // 8
        ]
    }

    #[test]
    fn test_prefers_exact_name_nearest_to_anchor() {
        let point = resolve_insertion_point(&buffer(), 6, "Glow", 400).unwrap();
        assert_eq!(point.name_line, 7);
        assert_eq!(point.insert_at(), 8);
        assert_eq!(point.indent, "    ");
        assert!(point.exact);
    }

    #[test]
    fn test_tie_goes_to_lower_line() {
        // 行 1 和行 7 到中心行 4 的距离相同
        let point = resolve_insertion_point(&buffer(), 4, "Glow", 400).unwrap();
        assert_eq!(point.name_line, 1);
    }

    #[test]
    fn test_falls_back_to_nearest_name_line() {
        let point = resolve_insertion_point(&buffer(), 3, "Missing", 400).unwrap();
        assert_eq!(point.name_line, 4);
        assert_eq!(point.indent, "  ");
        assert!(!point.exact);
    }

    #[test]
    fn test_window_bounds_search() {
        // 窗口内只有 Spark，退回到最近的行
        let point = resolve_insertion_point(&buffer(), 4, "Glow", 1).unwrap();
        assert_eq!(point.name_line, 4);

        let lines = vec!["a", "b", "c", "    emitterName: string = \"Glow\""];
        assert!(resolve_insertion_point(&lines, 0, "Glow", 2).is_none());
        assert!(resolve_insertion_point(&Vec::<String>::new(), 0, "Glow", 2).is_none());
    }
}
