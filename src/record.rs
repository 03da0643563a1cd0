use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::datatypes::{FloatKeyframe, Vec3};
use crate::mutator::LineShift;
use crate::utils::VfxError;

/// 可编辑的发射器属性种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PropertyKind {
    BirthScale,
    Scale,
    BindWeight,
    TranslationOverride,
}

impl PropertyKind {
    pub const ALL: [PropertyKind; 4] = [
        PropertyKind::BirthScale,
        PropertyKind::Scale,
        PropertyKind::BindWeight,
        PropertyKind::TranslationOverride,
    ];

    /// 文本转储中的字段名
    pub fn field_name(&self) -> &'static str {
        match self {
            PropertyKind::BirthScale => "birthScale0",
            PropertyKind::Scale => "scale0",
            PropertyKind::BindWeight => "bindWeight",
            PropertyKind::TranslationOverride => "translationOverride",
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

impl FromStr for PropertyKind {
    type Err = VfxError;

    /// 接受字段名（`birthScale0`）以及 `birth-scale` / `birth_scale` 写法，不区分大小写
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "birthscale" | "birthscale0" => Ok(PropertyKind::BirthScale),
            "scale" | "scale0" => Ok(PropertyKind::Scale),
            "bindweight" => Ok(PropertyKind::BindWeight),
            "translationoverride" => Ok(PropertyKind::TranslationOverride),
            _ => Err(VfxError::UnknownProperty(s.to_string())),
        }
    }
}

/// 发射器的复合标识：(所属系统, 声明行)
///
/// 发射器名称在系统内外都不保证唯一，所有选择和查找都必须使用该键。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EmitterKey {
    pub system_name: String,
    pub anchor_line: usize,
}

impl EmitterKey {
    pub fn new(system_name: impl Into<String>, anchor_line: usize) -> Self {
        Self {
            system_name: system_name.into(),
            anchor_line,
        }
    }

    /// 按插入记录换算到插入后缓冲区中的行号
    pub fn rebased(&self, shift: &LineShift) -> Self {
        Self {
            system_name: self.system_name.clone(),
            anchor_line: shift.map(self.anchor_line),
        }
    }
}

impl fmt::Display for EmitterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.system_name, self.anchor_line)
    }
}

/// 向量属性（birthScale0 / scale0）
///
/// `anchor_line` 指向属性声明行；`None` 表示该属性只存在于内存中，尚未写入缓冲区。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VectorProperty {
    pub constant_value: Option<Vec3>,
    pub dynamic_values: Option<Vec<Vec3>>,
    pub anchor_line: Option<usize>,
}

impl VectorProperty {
    /// 新建尚未写入缓冲区的属性
    pub fn unanchored(value: Vec3) -> Self {
        Self {
            constant_value: Some(value),
            dynamic_values: None,
            anchor_line: None,
        }
    }

    pub fn has_data(&self) -> bool {
        self.constant_value.is_some() || self.has_dynamics()
    }

    /// dynamics 存在且非空时，constantValue 不应被当作有效值
    pub fn has_dynamics(&self) -> bool {
        self.dynamic_values.as_ref().is_some_and(|v| !v.is_empty())
    }
}

/// 带关键帧的标量属性（bindWeight）
///
/// `anchor_line` 指向 constantValue 子字段所在行（没有 constantValue 时指向声明行）。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScalarDynamicProperty {
    pub constant_value: Option<f32>,
    pub dynamic_values: Option<Vec<FloatKeyframe>>,
    pub anchor_line: Option<usize>,
}

impl ScalarDynamicProperty {
    pub fn unanchored(value: f32) -> Self {
        Self {
            constant_value: Some(value),
            dynamic_values: None,
            anchor_line: None,
        }
    }

    pub fn has_data(&self) -> bool {
        self.constant_value.is_some() || self.has_dynamics()
    }

    pub fn has_dynamics(&self) -> bool {
        self.dynamic_values.as_ref().is_some_and(|v| !v.is_empty())
    }
}

/// 单行常量向量属性（translationOverride）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VectorConstProperty {
    pub constant_value: Option<Vec3>,
    pub anchor_line: Option<usize>,
}

impl VectorConstProperty {
    pub fn unanchored(value: Vec3) -> Self {
        Self {
            constant_value: Some(value),
            anchor_line: None,
        }
    }
}

/// 发射器上被跟踪的属性集合
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EmitterProperties {
    pub birth_scale: Option<VectorProperty>,
    pub scale: Option<VectorProperty>,
    pub bind_weight: Option<ScalarDynamicProperty>,
    pub translation_override: Option<VectorConstProperty>,
}

impl EmitterProperties {
    /// 某种属性的锚点行（属性不存在时为 `None`，未写入时为 `Some(None)`）
    pub fn anchor_of(&self, kind: PropertyKind) -> Option<Option<usize>> {
        match kind {
            PropertyKind::BirthScale => self.birth_scale.as_ref().map(|p| p.anchor_line),
            PropertyKind::Scale => self.scale.as_ref().map(|p| p.anchor_line),
            PropertyKind::BindWeight => self.bind_weight.as_ref().map(|p| p.anchor_line),
            PropertyKind::TranslationOverride => {
                self.translation_override.as_ref().map(|p| p.anchor_line)
            }
        }
    }

    /// 某种属性锚点的可变引用
    pub(crate) fn anchor_slot_mut(&mut self, kind: PropertyKind) -> Option<&mut Option<usize>> {
        match kind {
            PropertyKind::BirthScale => self.birth_scale.as_mut().map(|p| &mut p.anchor_line),
            PropertyKind::Scale => self.scale.as_mut().map(|p| &mut p.anchor_line),
            PropertyKind::BindWeight => self.bind_weight.as_mut().map(|p| &mut p.anchor_line),
            PropertyKind::TranslationOverride => {
                self.translation_override.as_mut().map(|p| &mut p.anchor_line)
            }
        }
    }

    pub fn contains(&self, kind: PropertyKind) -> bool {
        self.anchor_of(kind).is_some()
    }
}

/// 发射器记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmitterRecord {
    /// emitterName 字段的值（不唯一）
    pub name: String,
    /// 所属系统的完整名称（反向引用，不表示所有权）
    pub system_name: String,
    /// `VfxEmitterDefinitionData {` 所在行
    pub anchor_line: usize,
    pub properties: EmitterProperties,
}

impl EmitterRecord {
    pub fn new(system_name: impl Into<String>, anchor_line: usize) -> Self {
        Self {
            name: String::new(),
            system_name: system_name.into(),
            anchor_line,
            properties: EmitterProperties::default(),
        }
    }

    pub fn key(&self) -> EmitterKey {
        EmitterKey::new(self.system_name.clone(), self.anchor_line)
    }
}

/// 系统记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemRecord {
    /// 显示名称（路径最后一段，不唯一）
    pub name: String,
    /// 声明中的原始名称，作为系统的标识
    pub full_name: String,
    pub anchor_line: usize,
    pub emitters: Vec<EmitterRecord>,
}

impl SystemRecord {
    pub fn new(full_name: impl Into<String>, anchor_line: usize) -> Self {
        let full_name = full_name.into();
        Self {
            name: display_name(&full_name).to_string(),
            full_name,
            anchor_line,
            emitters: Vec::new(),
        }
    }
}

/// 取路径最后一个分隔符之后的部分
pub fn display_name(full_name: &str) -> &str {
    full_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(full_name)
}
