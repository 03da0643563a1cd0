/// 插入记录
///
/// 每次插入都会让其后的行号整体后移。`LineShift` 按发生顺序记录插入，
/// 用来把插入前记录的行号换算到当前缓冲区。
use serde::Serialize;
use crate::document::DocumentGraph;
use crate::record::PropertyKind;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LineShift {
    /// (插入位置, 行数)，插入位置是插入发生时缓冲区中的行号
    insertions: Vec<(usize, usize)>,
}

impl LineShift {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次插入，返回其步骤序号
    pub fn record(&mut self, at: usize, count: usize) -> usize {
        self.insertions.push((at, count));
        self.insertions.len() - 1
    }

    /// 把所有插入之前的行号换算到最终缓冲区
    pub fn map(&self, line: usize) -> usize {
        self.map_from(0, line)
    }

    /// 只应用第 `step` 步及之后的插入
    pub fn map_from(&self, step: usize, line: usize) -> usize {
        self.insertions
            .iter()
            .skip(step)
            .fold(line, |pos, &(at, count)| if pos >= at { pos + count } else { pos })
    }

    pub fn steps(&self) -> usize {
        self.insertions.len()
    }

    pub fn total_inserted(&self) -> usize {
        self.insertions.iter().map(|&(_, count)| count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.insertions.is_empty()
    }
}

/// 把对象图中所有已写入的锚点换算到插入后的缓冲区
pub fn rebase_graph(graph: &mut DocumentGraph, shift: &LineShift) {
    if shift.is_empty() {
        return;
    }

    for system in graph.systems.iter_mut() {
        system.anchor_line = shift.map(system.anchor_line);
        for emitter in system.emitters.iter_mut() {
            emitter.anchor_line = shift.map(emitter.anchor_line);
            for kind in PropertyKind::ALL {
                if let Some(Some(line)) = emitter.properties.anchor_slot_mut(kind) {
                    *line = shift.map(*line);
                }
            }
        }
    }
}
