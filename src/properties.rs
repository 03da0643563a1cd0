/// 按属性种类划分的访问与修改接口
///
/// 每种属性一个零大小类型，统一实现 [`EmitterProperty`]：
/// `has / get_value / set_value / scale / add / generate_lines`。
/// 这些操作只修改内存中的对象图，写回缓冲区由 `mutator` 负责。
///
/// # 使用示例
///
/// ```rust,ignore
/// use vfx_text_editor::properties::{BindWeight, EmitterProperty, TranslationOverride};
///
/// if BindWeight::has(emitter) {
///     BindWeight::scale(emitter, 0.5);
/// } else {
///     BindWeight::add(emitter, 1.0);
/// }
/// TranslationOverride::set_value(emitter, Vec3::new(0.0, 50.0, 0.0));
/// ```
use crate::datatypes::{format_float, Vec3};
use crate::record::{
    EmitterProperties, EmitterRecord, PropertyKind, ScalarDynamicProperty, VectorConstProperty,
    VectorProperty,
};

/// 嵌套块的缩进单位
pub const INDENT_UNIT: &str = "    ";

/// 属性种类的统一接口
pub trait EmitterProperty {
    /// 常量值的类型
    type Value: Clone;
    /// 属性记录的类型
    type Record: Clone;

    const KIND: PropertyKind;

    fn record(properties: &EmitterProperties) -> Option<&Self::Record>;

    fn record_mut(properties: &mut EmitterProperties) -> Option<&mut Self::Record>;

    /// 用常量值新建一个尚未写入缓冲区的记录
    fn unanchored(value: Self::Value) -> Self::Record;

    fn slot(properties: &mut EmitterProperties) -> &mut Option<Self::Record>;

    fn constant(record: &Self::Record) -> Option<Self::Value>;

    fn set_constant(record: &mut Self::Record, value: Self::Value);

    fn scale_record(record: &mut Self::Record, multiplier: f32);

    /// 生成完整的属性块文本行（首行使用 `indent` 缩进）
    ///
    /// 记录中没有可写入的数据时返回空列表。
    fn generate_lines(record: &Self::Record, indent: &str) -> Vec<String>;

    /// 锚点相对于生成的首行的偏移
    fn anchor_offset(_record: &Self::Record) -> usize {
        0
    }

    fn has(emitter: &EmitterRecord) -> bool {
        Self::record(&emitter.properties).is_some()
    }

    fn get_value(emitter: &EmitterRecord) -> Option<Self::Value> {
        Self::record(&emitter.properties).and_then(Self::constant)
    }

    /// 设置常量值；发射器没有该属性时不做任何事并返回 `false`
    fn set_value(emitter: &mut EmitterRecord, value: Self::Value) -> bool {
        match Self::record_mut(&mut emitter.properties) {
            Some(record) => {
                Self::set_constant(record, value);
                true
            }
            None => false,
        }
    }

    /// 按倍数缩放常量值和全部关键帧；发射器没有该属性时返回 `false`
    fn scale(emitter: &mut EmitterRecord, multiplier: f32) -> bool {
        match Self::record_mut(&mut emitter.properties) {
            Some(record) => {
                Self::scale_record(record, multiplier);
                true
            }
            None => false,
        }
    }

    /// 为发射器添加属性（锚点为空，等待写入缓冲区）
    ///
    /// 属性已存在时不做任何事并返回 `false`。
    fn add(emitter: &mut EmitterRecord, value: Self::Value) -> bool {
        let slot = Self::slot(&mut emitter.properties);
        if slot.is_some() {
            return false;
        }
        *slot = Some(Self::unanchored(value));
        true
    }
}

pub struct BirthScale;
pub struct Scale;
pub struct BindWeight;
pub struct TranslationOverride;

fn vector_embed_lines(field: &str, record: &VectorProperty, indent: &str) -> Vec<String> {
    let Some(value) = record.constant_value else {
        return Vec::new();
    };
    vec![
        format!("{indent}{field}: embed = ValueVector3 {{"),
        format!("{indent}{INDENT_UNIT}constantValue: vec3 = {}", value.to_text()),
        format!("{indent}}}"),
    ]
}

fn scale_vector_record(record: &mut VectorProperty, multiplier: f32) {
    if let Some(value) = record.constant_value.as_mut() {
        *value = value.scaled(multiplier);
    }
    if let Some(values) = record.dynamic_values.as_mut() {
        for value in values.iter_mut() {
            *value = value.scaled(multiplier);
        }
    }
}

impl EmitterProperty for BirthScale {
    type Value = Vec3;
    type Record = VectorProperty;
    const KIND: PropertyKind = PropertyKind::BirthScale;

    fn record(properties: &EmitterProperties) -> Option<&VectorProperty> {
        properties.birth_scale.as_ref()
    }

    fn record_mut(properties: &mut EmitterProperties) -> Option<&mut VectorProperty> {
        properties.birth_scale.as_mut()
    }

    fn unanchored(value: Vec3) -> VectorProperty {
        VectorProperty::unanchored(value)
    }

    fn slot(properties: &mut EmitterProperties) -> &mut Option<VectorProperty> {
        &mut properties.birth_scale
    }

    fn constant(record: &VectorProperty) -> Option<Vec3> {
        record.constant_value
    }

    fn set_constant(record: &mut VectorProperty, value: Vec3) {
        record.constant_value = Some(value);
    }

    fn scale_record(record: &mut VectorProperty, multiplier: f32) {
        scale_vector_record(record, multiplier);
    }

    fn generate_lines(record: &VectorProperty, indent: &str) -> Vec<String> {
        vector_embed_lines(Self::KIND.field_name(), record, indent)
    }
}

impl EmitterProperty for Scale {
    type Value = Vec3;
    type Record = VectorProperty;
    const KIND: PropertyKind = PropertyKind::Scale;

    fn record(properties: &EmitterProperties) -> Option<&VectorProperty> {
        properties.scale.as_ref()
    }

    fn record_mut(properties: &mut EmitterProperties) -> Option<&mut VectorProperty> {
        properties.scale.as_mut()
    }

    fn unanchored(value: Vec3) -> VectorProperty {
        VectorProperty::unanchored(value)
    }

    fn slot(properties: &mut EmitterProperties) -> &mut Option<VectorProperty> {
        &mut properties.scale
    }

    fn constant(record: &VectorProperty) -> Option<Vec3> {
        record.constant_value
    }

    fn set_constant(record: &mut VectorProperty, value: Vec3) {
        record.constant_value = Some(value);
    }

    fn scale_record(record: &mut VectorProperty, multiplier: f32) {
        scale_vector_record(record, multiplier);
    }

    fn generate_lines(record: &VectorProperty, indent: &str) -> Vec<String> {
        vector_embed_lines(Self::KIND.field_name(), record, indent)
    }
}

impl EmitterProperty for BindWeight {
    type Value = f32;
    type Record = ScalarDynamicProperty;
    const KIND: PropertyKind = PropertyKind::BindWeight;

    fn record(properties: &EmitterProperties) -> Option<&ScalarDynamicProperty> {
        properties.bind_weight.as_ref()
    }

    fn record_mut(properties: &mut EmitterProperties) -> Option<&mut ScalarDynamicProperty> {
        properties.bind_weight.as_mut()
    }

    fn unanchored(value: f32) -> ScalarDynamicProperty {
        ScalarDynamicProperty::unanchored(value)
    }

    fn slot(properties: &mut EmitterProperties) -> &mut Option<ScalarDynamicProperty> {
        &mut properties.bind_weight
    }

    fn constant(record: &ScalarDynamicProperty) -> Option<f32> {
        record.constant_value
    }

    fn set_constant(record: &mut ScalarDynamicProperty, value: f32) {
        record.constant_value = Some(value);
    }

    fn scale_record(record: &mut ScalarDynamicProperty, multiplier: f32) {
        if let Some(value) = record.constant_value.as_mut() {
            *value *= multiplier;
        }
        // 只缩放值，时间轴保持不变
        if let Some(keyframes) = record.dynamic_values.as_mut() {
            for keyframe in keyframes.iter_mut() {
                keyframe.value *= multiplier;
            }
        }
    }

    fn generate_lines(record: &ScalarDynamicProperty, indent: &str) -> Vec<String> {
        if !record.has_data() {
            return Vec::new();
        }

        let inner = format!("{indent}{INDENT_UNIT}");
        let mut lines = vec![format!("{indent}bindWeight: embed = ValueFloat {{")];

        if let Some(value) = record.constant_value {
            lines.push(format!("{inner}constantValue: f32 = {}", format_float(value)));
        }

        if let Some(keyframes) = record.dynamic_values.as_ref().filter(|k| !k.is_empty()) {
            let list = format!("{inner}{INDENT_UNIT}");
            let item = format!("{list}{INDENT_UNIT}");
            lines.push(format!("{inner}dynamics: pointer = VfxAnimatedFloatVariableData {{"));
            lines.push(format!("{list}times: list[f32] = {{"));
            lines.extend(keyframes.iter().map(|k| format!("{item}{}", format_float(k.time))));
            lines.push(format!("{list}}}"));
            lines.push(format!("{list}values: list[f32] = {{"));
            lines.extend(keyframes.iter().map(|k| format!("{item}{}", format_float(k.value))));
            lines.push(format!("{list}}}"));
            lines.push(format!("{inner}}}"));
        }

        lines.push(format!("{indent}}}"));
        lines
    }

    fn anchor_offset(record: &ScalarDynamicProperty) -> usize {
        // 锚点是 constantValue 子字段；没有常量时退回声明行
        usize::from(record.constant_value.is_some())
    }
}

impl EmitterProperty for TranslationOverride {
    type Value = Vec3;
    type Record = VectorConstProperty;
    const KIND: PropertyKind = PropertyKind::TranslationOverride;

    fn record(properties: &EmitterProperties) -> Option<&VectorConstProperty> {
        properties.translation_override.as_ref()
    }

    fn record_mut(properties: &mut EmitterProperties) -> Option<&mut VectorConstProperty> {
        properties.translation_override.as_mut()
    }

    fn unanchored(value: Vec3) -> VectorConstProperty {
        VectorConstProperty::unanchored(value)
    }

    fn slot(properties: &mut EmitterProperties) -> &mut Option<VectorConstProperty> {
        &mut properties.translation_override
    }

    fn constant(record: &VectorConstProperty) -> Option<Vec3> {
        record.constant_value
    }

    fn set_constant(record: &mut VectorConstProperty, value: Vec3) {
        record.constant_value = Some(value);
    }

    fn scale_record(record: &mut VectorConstProperty, multiplier: f32) {
        if let Some(value) = record.constant_value.as_mut() {
            *value = value.scaled(multiplier);
        }
    }

    fn generate_lines(record: &VectorConstProperty, indent: &str) -> Vec<String> {
        match record.constant_value {
            Some(value) => vec![format!("{indent}translationOverride: vec3 = {}", value.to_text())],
            None => Vec::new(),
        }
    }
}

/// 按种类生成待插入的文本行以及锚点偏移
///
/// 属性不存在或没有可写入的数据时返回 `None`。
pub fn generate_for(
    kind: PropertyKind,
    properties: &EmitterProperties,
    indent: &str,
) -> Option<(Vec<String>, usize)> {
    fn build<P: EmitterProperty>(
        properties: &EmitterProperties,
        indent: &str,
    ) -> Option<(Vec<String>, usize)> {
        let record = P::record(properties)?;
        let lines = P::generate_lines(record, indent);
        if lines.is_empty() {
            return None;
        }
        Some((lines, P::anchor_offset(record)))
    }

    match kind {
        PropertyKind::BirthScale => build::<BirthScale>(properties, indent),
        PropertyKind::Scale => build::<Scale>(properties, indent),
        PropertyKind::BindWeight => build::<BindWeight>(properties, indent),
        PropertyKind::TranslationOverride => build::<TranslationOverride>(properties, indent),
    }
}

/// 按种类缩放发射器的属性，返回是否有属性被修改
pub fn scale_kind(emitter: &mut EmitterRecord, kind: PropertyKind, multiplier: f32) -> bool {
    match kind {
        PropertyKind::BirthScale => BirthScale::scale(emitter, multiplier),
        PropertyKind::Scale => Scale::scale(emitter, multiplier),
        PropertyKind::BindWeight => BindWeight::scale(emitter, multiplier),
        PropertyKind::TranslationOverride => TranslationOverride::scale(emitter, multiplier),
    }
}
