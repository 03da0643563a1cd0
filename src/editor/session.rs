/// 编辑会话
///
/// 提供有状态的编辑接口：对象图上的修改先只存在于内存中，
/// `apply` 把选中发射器的修改写回缓冲区，`save` 才真正写入文件。
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use super::history::EditHistory;
use crate::config::EditorConfig;
use crate::datatypes::Vec3;
use crate::diagnostics::{EditAnomaly, ParseAnomaly};
use crate::document::{parse_with_report, DocumentGraph};
use crate::io::{RawTextData, TextReader, TextWriter};
use crate::mutator::{apply, ApplyOptions, ApplyReport};
use crate::properties::{scale_kind, BindWeight, EmitterProperty, TranslationOverride};
use crate::record::{EmitterKey, EmitterRecord, PropertyKind};
use crate::utils::VfxError;

/// 历史快照：缓冲区、对象图和选择集的完整副本
#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    lines: Vec<String>,
    graph: DocumentGraph,
    selection: BTreeSet<EmitterKey>,
    dirty: bool,
}

/// VFX 文本编辑会话
///
/// # 核心特性
/// - **显式保存状态**: `is_dirty()` 反映自加载或上次保存以来是否有未保存的修改
/// - **可撤销**: 每次修改前保存完整快照
/// - **按键选择**: 选择集使用 `(系统, 声明行)` 复合键，名称相同的发射器互不影响
///
/// # 使用示例
///
/// ```rust,ignore
/// use vfx_text_editor::editor::VfxEditor;
/// use vfx_text_editor::io::{DefaultTextReader, DefaultTextWriter};
///
/// let mut editor = VfxEditor::open(&DefaultTextReader::default(), path, EditorConfig::default())?;
/// editor.select_by_name("Glow");
/// editor.scale_selected(PropertyKind::BirthScale, 2.0);
/// editor.apply();
/// editor.save(&DefaultTextWriter::default(), path)?;
/// ```
pub struct VfxEditor {
    path: Option<PathBuf>,
    data: RawTextData,
    /// 加载或上次保存时的缓冲区，`reset` 回到这里
    original: Vec<String>,
    graph: DocumentGraph,
    selection: BTreeSet<EmitterKey>,
    history: EditHistory<Snapshot>,
    config: EditorConfig,
    isolated: Option<PropertyKind>,
    dirty: bool,
    anomalies: Vec<ParseAnomaly>,
    /// 内存编辑时跳过的发射器，下一次 `apply` 合并进报告
    pending: Vec<EditAnomaly>,
}

impl VfxEditor {
    /// 从已读取的文本创建会话
    pub fn new(data: RawTextData, config: EditorConfig) -> Self {
        let report = parse_with_report(&data.lines, &config);
        Self {
            path: None,
            original: data.lines.clone(),
            data,
            graph: report.graph,
            selection: BTreeSet::new(),
            history: EditHistory::new(config.history_limit),
            config,
            isolated: None,
            dirty: false,
            anomalies: report.anomalies,
            pending: Vec::new(),
        }
    }

    /// 从行序列创建会话
    pub fn from_lines(lines: Vec<String>, config: EditorConfig) -> Self {
        Self::new(RawTextData { lines, ..RawTextData::default() }, config)
    }

    /// 读取文件并创建会话
    pub fn open(
        reader: &dyn TextReader,
        path: &Path,
        config: EditorConfig,
    ) -> Result<Self, VfxError> {
        let data = reader.read(path)?;
        let mut editor = Self::new(data, config);
        editor.path = Some(path.to_path_buf());
        info!(
            path = %path.display(),
            systems = editor.graph.systems.len(),
            emitters = editor.graph.emitter_count(),
            "Opened document"
        );
        Ok(editor)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn lines(&self) -> &[String] {
        &self.data.lines
    }

    pub fn text(&self) -> String {
        self.data.to_text()
    }

    pub fn graph(&self) -> &DocumentGraph {
        &self.graph
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// 最近一次解析记录的异常
    pub fn parse_anomalies(&self) -> &[ParseAnomaly] {
        &self.anomalies
    }

    /// 是否有未保存的修改
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// 内存编辑中尚未报告的异常
    pub fn pending_anomalies(&self) -> &[EditAnomaly] {
        &self.pending
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            lines: self.data.lines.clone(),
            graph: self.graph.clone(),
            selection: self.selection.clone(),
            dirty: self.dirty,
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.data.lines = snapshot.lines;
        self.graph = snapshot.graph;
        self.selection = snapshot.selection;
        self.dirty = snapshot.dirty;
    }

    // === 选择 ===

    pub fn selection(&self) -> &BTreeSet<EmitterKey> {
        &self.selection
    }

    /// 选中一个发射器，键不存在时返回错误
    pub fn select(&mut self, key: &EmitterKey) -> Result<bool, VfxError> {
        if self.graph.emitter(key).is_none() {
            return Err(VfxError::EmitterNotFound(key.to_string()));
        }
        Ok(self.selection.insert(key.clone()))
    }

    pub fn deselect(&mut self, key: &EmitterKey) -> bool {
        self.selection.remove(key)
    }

    pub fn select_all(&mut self) -> usize {
        self.selection = self.graph.keys().into_iter().collect();
        self.selection.len()
    }

    /// 选中所有同名发射器，返回新增的数量
    pub fn select_by_name(&mut self, name: &str) -> usize {
        let keys: Vec<EmitterKey> = self
            .graph
            .find_emitters_by_name(name)
            .into_iter()
            .map(EmitterRecord::key)
            .collect();
        keys.into_iter().filter(|key| self.selection.insert(key.clone())).count()
    }

    /// 选中某个系统下的全部发射器
    pub fn select_system(&mut self, full_name: &str) -> usize {
        let keys: Vec<EmitterKey> = self
            .graph
            .systems
            .iter()
            .filter(|s| s.full_name == full_name || s.name == full_name)
            .flat_map(|s| s.emitters.iter().map(EmitterRecord::key))
            .collect();
        keys.into_iter().filter(|key| self.selection.insert(key.clone())).count()
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// 设置隔离模式（`None` 关闭）
    pub fn set_isolated(&mut self, kind: Option<PropertyKind>) {
        self.isolated = kind;
    }

    pub fn isolated(&self) -> Option<PropertyKind> {
        self.isolated
    }

    // === 内存编辑 ===

    /// 修改单个发射器（仅修改内存状态）
    ///
    /// 发射器没有实际变化时不记录历史，也不改变保存状态。
    pub fn edit_emitter<R>(
        &mut self,
        key: &EmitterKey,
        edit: impl FnOnce(&mut EmitterRecord) -> R,
    ) -> Result<R, VfxError> {
        if self.graph.emitter(key).is_none() {
            return Err(VfxError::EmitterNotFound(key.to_string()));
        }
        let snapshot = self.snapshot();
        let emitter = self.graph.require_emitter_mut(key)?;
        let before = emitter.clone();
        let result = edit(emitter);
        if *emitter != before {
            self.history.push(snapshot);
            self.dirty = true;
        }
        Ok(result)
    }

    /// 对每个选中的发射器执行修改，返回修改生效的数量
    ///
    /// 修改失败且发射器没有 `kind` 属性时记录 `PropertyMissing`。
    fn edit_selected(
        &mut self,
        kind: PropertyKind,
        mut edit: impl FnMut(&mut EmitterRecord) -> bool,
    ) -> usize {
        if self.selection.is_empty() {
            return 0;
        }
        let snapshot = self.snapshot();
        let mut changed = 0;
        for key in &self.selection {
            let Some(emitter) = self.graph.emitter_mut(key) else {
                continue;
            };
            if edit(emitter) {
                changed += 1;
            } else if !emitter.properties.contains(kind) {
                let anomaly = EditAnomaly::PropertyMissing { key: key.clone(), kind };
                warn!("{}", anomaly);
                self.pending.push(anomaly);
            }
        }

        if changed > 0 {
            self.history.push(snapshot);
            self.dirty = true;
        }
        changed
    }

    /// 缩放选中发射器的某种属性，没有该属性的发射器被跳过
    pub fn scale_selected(&mut self, kind: PropertyKind, multiplier: f32) -> usize {
        self.edit_selected(kind, |emitter| scale_kind(emitter, kind, multiplier))
    }

    /// 设置 bindWeight 常量，缺失时添加
    pub fn set_bind_weight_selected(&mut self, value: f32) -> usize {
        self.edit_selected(PropertyKind::BindWeight, |emitter| {
            BindWeight::set_value(emitter, value) || BindWeight::add(emitter, value)
        })
    }

    /// 设置 translationOverride，缺失时添加
    pub fn set_translation_selected(&mut self, value: Vec3) -> usize {
        self.edit_selected(PropertyKind::TranslationOverride, |emitter| {
            TranslationOverride::set_value(emitter, value)
                || TranslationOverride::add(emitter, value)
        })
    }

    // === 写回 ===

    pub fn apply_options(&self) -> ApplyOptions {
        ApplyOptions {
            isolated_property: self.isolated,
            ..ApplyOptions::from_config(&self.config)
        }
    }

    /// 把选中发射器的修改写回缓冲区
    ///
    /// 选择集中的键随插入换算到新缓冲区，之后仍指向同一批发射器。
    /// 内存编辑阶段记录的异常排在报告最前面。
    pub fn apply(&mut self) -> ApplyReport {
        let snapshot = self.snapshot();
        let options = self.apply_options();
        let outcome = apply(&self.data.lines, &mut self.graph, &self.selection, &options);
        let mut report = outcome.report;
        let mut anomalies = std::mem::take(&mut self.pending);
        anomalies.append(&mut report.anomalies);
        report.anomalies = anomalies;

        if report.is_noop() {
            // 没有插入时锚点不变，无需快照
            debug!("Apply produced no buffer changes");
            return report;
        }

        self.data.lines = outcome.lines;
        self.selection = self
            .selection
            .iter()
            .map(|key| key.rebased(&report.shift))
            .collect();
        self.history.push(snapshot);
        self.dirty = true;

        info!(
            updated = report.updated_lines.len(),
            inserted = report.insertions.len(),
            anomalies = report.anomalies.len(),
            "Applied edits to buffer"
        );
        report
    }

    /// 从当前缓冲区重建对象图
    ///
    /// 尚未 `apply` 的内存修改会被丢弃；选择集中不再存在的键被移除。
    pub fn refresh(&mut self) -> &[ParseAnomaly] {
        let report = parse_with_report(&self.data.lines, &self.config);
        self.graph = report.graph;
        self.anomalies = report.anomalies;
        self.pending.clear();

        let graph = &self.graph;
        self.selection.retain(|key| graph.emitter(key).is_some());
        &self.anomalies
    }

    /// 回到加载或上次保存时的状态，清空历史和选择
    pub fn reset(&mut self) {
        self.data.lines = self.original.clone();
        self.selection.clear();
        self.history.clear();
        self.refresh();
        self.dirty = false;
    }

    pub fn undo(&mut self) -> Result<(), VfxError> {
        let previous = self.history.undo(self.snapshot())?;
        self.restore(previous);
        Ok(())
    }

    pub fn redo(&mut self) -> Result<(), VfxError> {
        let next = self.history.redo(self.snapshot())?;
        self.restore(next);
        Ok(())
    }

    /// 保存当前缓冲区（需要显式调用）
    ///
    /// 只写入缓冲区；内存中尚未 `apply` 的修改不会被写入。
    pub fn save(&mut self, writer: &dyn TextWriter, path: &Path) -> Result<(), VfxError> {
        writer.write(&self.data, path)?;
        self.original = self.data.lines.clone();
        self.path = Some(path.to_path_buf());
        self.dirty = false;
        info!(path = %path.display(), lines = self.data.lines.len(), "Saved document");
        Ok(())
    }

    /// 保存到原路径
    pub fn save_to_original(&mut self, writer: &dyn TextWriter) -> Result<(), VfxError> {
        let path = self.path.clone().ok_or_else(|| {
            VfxError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "会话没有关联的文件路径",
            ))
        })?;
        self.save(writer, &path)
    }

    /// 生成编辑摘要
    pub fn summary(&self) -> String {
        format!(
            "文件: {}, 发射器: {}, 已选择: {}, 修改状态: {}, {}",
            self.path
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<内存>".to_string()),
            self.graph.emitter_count(),
            self.selection.len(),
            if self.dirty { "已修改" } else { "未修改" },
            self.history.summary()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{DefaultTextReader, DefaultTextWriter};
    use crate::properties::BirthScale;
    use tempfile::TempDir;

    const SAMPLE: &str = r#""Particles/SysA" = VfxSystemDefinitionData {
    complexEmitterDefinitionData: list[pointer] = {
        VfxEmitterDefinitionData {
            emitterName: string = "Glow"
            birthScale0: embed = ValueVector3 {
                constantValue: vec3 = { 1, 1, 1 }
            }
        }
        VfxEmitterDefinitionData {
            emitterName: string = "Spark"
        }
    }
}
"#;

    fn editor() -> VfxEditor {
        VfxEditor::new(RawTextData::from_text(SAMPLE), EditorConfig::default())
    }

    #[test]
    fn test_new_session_is_clean() {
        let editor = editor();
        assert!(!editor.is_dirty());
        assert_eq!(editor.graph().emitter_count(), 2);
        assert!(editor.parse_anomalies().is_empty());
        assert!(editor.summary().contains("未修改"));
    }

    #[test]
    fn test_select_unknown_key() {
        let mut editor = editor();
        assert!(editor.select(&EmitterKey::new("Particles/SysA", 99)).is_err());
        assert!(editor.select(&EmitterKey::new("Particles/SysA", 2)).unwrap());
        assert_eq!(editor.selection().len(), 1);
    }

    #[test]
    fn test_edit_apply_undo() {
        let mut editor = editor();
        assert_eq!(editor.select_by_name("Glow"), 1);

        assert_eq!(editor.scale_selected(PropertyKind::BirthScale, 2.0), 1);
        assert!(editor.is_dirty());
        // 只修改了内存，缓冲区不变
        assert_eq!(editor.text(), SAMPLE);

        let report = editor.apply();
        assert_eq!(report.updated_lines, vec![5]);
        assert_eq!(editor.lines()[5], "                constantValue: vec3 = { 2, 2, 2 }");

        editor.undo().unwrap();
        assert_eq!(editor.text(), SAMPLE);
        editor.undo().unwrap();
        assert!(!editor.is_dirty());
        assert!(editor.undo().is_err());

        editor.redo().unwrap();
        editor.redo().unwrap();
        assert_eq!(editor.lines()[5], "                constantValue: vec3 = { 2, 2, 2 }");
    }

    #[test]
    fn test_insertion_rebases_selection() {
        let mut editor = editor();
        editor.select_all();
        assert_eq!(editor.set_bind_weight_selected(0.5), 2);

        let report = editor.apply();
        assert_eq!(report.insertions.len(), 2);

        // 第二个发射器因第一次插入下移了 3 行
        let keys: Vec<_> = editor.selection().iter().cloned().collect();
        assert_eq!(
            keys,
            vec![EmitterKey::new("Particles/SysA", 2), EmitterKey::new("Particles/SysA", 11)]
        );
        let spark = editor.graph().emitter(&keys[1]).unwrap();
        assert_eq!(spark.name, "Spark");
        assert_eq!(BindWeight::get_value(spark), Some(0.5));

        // 重新解析得到相同的对象图
        let before = editor.graph().clone();
        assert!(editor.refresh().is_empty());
        assert_eq!(editor.graph(), &before);
        assert_eq!(editor.selection().len(), 2);
    }

    #[test]
    fn test_edit_emitter_and_reset() {
        let mut editor = editor();
        let key = EmitterKey::new("Particles/SysA", 8);
        let added = editor
            .edit_emitter(&key, |emitter| BirthScale::add(emitter, Vec3::new(3.0, 3.0, 3.0)))
            .unwrap();
        assert!(added);

        editor.select(&key).unwrap();
        editor.apply();
        assert_ne!(editor.text(), SAMPLE);

        editor.reset();
        assert_eq!(editor.text(), SAMPLE);
        assert!(!editor.is_dirty());
        assert!(editor.selection().is_empty());
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_missing_property_is_reported_on_apply() {
        let mut editor = editor();
        let spark = EmitterKey::new("Particles/SysA", 8);
        editor.select(&spark).unwrap();

        assert_eq!(editor.scale_selected(PropertyKind::BirthScale, 2.0), 0);
        assert!(!editor.is_dirty());
        assert_eq!(editor.pending_anomalies().len(), 1);

        let report = editor.apply();
        assert!(report.is_noop());
        assert_eq!(
            report.anomalies,
            vec![EditAnomaly::PropertyMissing {
                key: spark,
                kind: PropertyKind::BirthScale,
            }]
        );
        assert!(editor.pending_anomalies().is_empty());
        assert_eq!(editor.text(), SAMPLE);
    }

    #[test]
    fn test_edit_without_change_keeps_history_clean() {
        let mut editor = editor();
        let glow = EmitterKey::new("Particles/SysA", 2);

        // Glow 已经有 birthScale0，add 不做任何修改
        let added = editor
            .edit_emitter(&glow, |emitter| BirthScale::add(emitter, Vec3::new(3.0, 3.0, 3.0)))
            .unwrap();
        assert!(!added);
        assert!(!editor.is_dirty());
        assert!(!editor.can_undo());

        editor
            .edit_emitter(&glow, |emitter| BirthScale::scale(emitter, 2.0))
            .unwrap();
        assert!(editor.is_dirty());
        assert!(editor.can_undo());
    }

    #[test]
    fn test_save_clears_dirty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("effect.py");
        std::fs::write(&path, SAMPLE).unwrap();

        let mut editor =
            VfxEditor::open(&DefaultTextReader::default(), &path, EditorConfig::default()).unwrap();
        editor.select_all();
        editor.set_translation_selected(Vec3::new(0.0, 10.0, 0.0));
        editor.apply();
        assert!(editor.is_dirty());

        editor.save_to_original(&DefaultTextWriter::default()).unwrap();
        assert!(!editor.is_dirty());

        let saved = std::fs::read_to_string(&path).unwrap();
        assert_eq!(saved.matches("translationOverride: vec3 = { 0, 10, 0 }").count(), 2);

        // 保存后 reset 回到已保存的内容
        editor.reset();
        assert_eq!(editor.text(), saved);
    }
}
