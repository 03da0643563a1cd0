/// 撤销/重做历史
///
/// 保存完整快照而不是增量：快照是独立的值，之后的编辑不会影响已保存的快照。
use std::collections::VecDeque;
use crate::utils::VfxError;

/// 快照历史
///
/// # 实现细节
/// - 两个栈实现撤销/重做：undo_stack 和 redo_stack
/// - 撤销栈超过 `limit` 时丢弃最早的快照
/// - 新的快照会清空重做栈
#[derive(Debug, Clone)]
pub struct EditHistory<T> {
    undo_stack: VecDeque<T>,
    redo_stack: Vec<T>,
    limit: usize,
}

impl<T> EditHistory<T> {
    /// 创建新的历史，`limit` 为 0 时不保留任何快照
    pub fn new(limit: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            limit,
        }
    }

    /// 记录修改之前的状态
    pub fn push(&mut self, snapshot: T) {
        self.redo_stack.clear(); // 新操作清空重做栈
        self.push_undo(snapshot);
    }

    fn push_undo(&mut self, snapshot: T) {
        if self.limit == 0 {
            return;
        }
        while self.undo_stack.len() >= self.limit {
            self.undo_stack.pop_front();
        }
        self.undo_stack.push_back(snapshot);
    }

    /// 撤销：传入当前状态，返回需要恢复的状态
    pub fn undo(&mut self, current: T) -> Result<T, VfxError> {
        let previous = self
            .undo_stack
            .pop_back()
            .ok_or(VfxError::EmptyHistory("undo"))?;
        self.redo_stack.push(current);
        Ok(previous)
    }

    /// 重做：传入当前状态，返回需要恢复的状态
    pub fn redo(&mut self, current: T) -> Result<T, VfxError> {
        let next = self
            .redo_stack
            .pop()
            .ok_or(VfxError::EmptyHistory("redo"))?;
        self.push_undo(current);
        Ok(next)
    }

    pub fn len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// 生成历史摘要
    pub fn summary(&self) -> String {
        format!(
            "可撤销: {}, 可重做: {}, 上限: {}",
            self.undo_stack.len(),
            self.redo_stack.len(),
            self.limit
        )
    }
}

impl<T> Default for EditHistory<T> {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_HISTORY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undo_redo() {
        let mut history = EditHistory::new(10);
        let mut state = 0;

        for next in 1..=3 {
            history.push(state);
            state = next;
        }
        assert_eq!(history.len(), 3);

        state = history.undo(state).unwrap();
        assert_eq!(state, 2);
        state = history.undo(state).unwrap();
        assert_eq!(state, 1);

        state = history.redo(state).unwrap();
        assert_eq!(state, 2);
        assert!(history.can_redo());
    }

    #[test]
    fn test_new_push_clears_redo() {
        let mut history = EditHistory::new(10);
        history.push(1);
        let state = history.undo(2).unwrap();
        assert_eq!(state, 1);
        assert!(history.can_redo());

        history.push(state);
        assert!(!history.can_redo());
    }

    #[test]
    fn test_empty_history() {
        let mut history: EditHistory<u32> = EditHistory::new(10);
        assert!(matches!(history.undo(0), Err(VfxError::EmptyHistory("undo"))));
        assert!(matches!(history.redo(0), Err(VfxError::EmptyHistory("redo"))));
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut history = EditHistory::new(2);
        history.push("a");
        history.push("b");
        history.push("c");
        assert_eq!(history.len(), 2);

        assert_eq!(history.undo("d").unwrap(), "c");
        assert_eq!(history.undo("c").unwrap(), "b");
        assert!(!history.can_undo());

        let mut disabled = EditHistory::new(0);
        disabled.push(1);
        assert!(disabled.is_empty());
    }

    #[test]
    fn test_redo_respects_limit() {
        let mut history = EditHistory::new(3);
        let mut state = 0;
        for next in 1..=5 {
            history.push(state);
            state = next;
        }
        assert_eq!(history.len(), 3);

        for _ in 0..4 {
            while history.can_undo() {
                state = history.undo(state).unwrap();
            }
            while history.can_redo() {
                state = history.redo(state).unwrap();
                assert!(history.len() <= history.limit());
            }
        }
        assert_eq!(state, 5);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_summary() {
        let mut history = EditHistory::new(5);
        history.push(1);
        assert!(history.summary().contains("可撤销: 1"));
    }
}
