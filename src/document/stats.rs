use serde::Serialize;
use std::collections::HashMap;
use super::DocumentGraph;
use crate::record::PropertyKind;

/// 文档统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentStats {
    pub system_count: usize,
    pub emitter_count: usize,
    pub birth_scale_count: usize,
    pub scale_count: usize,
    pub bind_weight_count: usize,
    pub translation_override_count: usize,
    /// 带 dynamics 关键帧的属性数量
    pub animated_property_count: usize,
    /// 在整个文档中名称重复的发射器数量
    pub duplicate_name_count: usize,
}

impl std::fmt::Display for DocumentStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== 文档统计信息 ===")?;
        writeln!(f, "系统数量: {}", self.system_count)?;
        writeln!(f, "发射器数量: {}", self.emitter_count)?;
        writeln!(f, "birthScale0: {}", self.birth_scale_count)?;
        writeln!(f, "scale0: {}", self.scale_count)?;
        writeln!(f, "bindWeight: {}", self.bind_weight_count)?;
        writeln!(f, "translationOverride: {}", self.translation_override_count)?;
        writeln!(f, "动画属性: {}", self.animated_property_count)?;
        writeln!(f, "重名发射器: {}", self.duplicate_name_count)?;
        Ok(())
    }
}

impl DocumentGraph {
    /// 获取统计信息
    pub fn stats(&self) -> DocumentStats {
        let mut stats = DocumentStats {
            system_count: self.systems.len(),
            emitter_count: self.emitter_count(),
            ..Default::default()
        };

        let mut names: HashMap<&str, usize> = HashMap::new();
        for emitter in self.emitters() {
            *names.entry(emitter.name.as_str()).or_default() += 1;

            let props = &emitter.properties;
            for kind in PropertyKind::ALL {
                if !props.contains(kind) {
                    continue;
                }
                match kind {
                    PropertyKind::BirthScale => stats.birth_scale_count += 1,
                    PropertyKind::Scale => stats.scale_count += 1,
                    PropertyKind::BindWeight => stats.bind_weight_count += 1,
                    PropertyKind::TranslationOverride => stats.translation_override_count += 1,
                }
            }

            stats.animated_property_count += [
                props.birth_scale.as_ref().is_some_and(|p| p.has_dynamics()),
                props.scale.as_ref().is_some_and(|p| p.has_dynamics()),
                props.bind_weight.as_ref().is_some_and(|p| p.has_dynamics()),
            ]
            .iter()
            .filter(|&&animated| animated)
            .count();
        }

        stats.duplicate_name_count = names
            .values()
            .filter(|&&count| count > 1)
            .sum();

        stats
    }
}
