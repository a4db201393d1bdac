use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    None,
    #[default]
    Single,
    Multiple,
}

/// 表格行选择, 按选择顺序保存
#[derive(Debug, Clone, Default, Serialize)]
pub struct Selection {
    mode: SelectionMode,
    selected: IndexSet<i64>,
}

impl Selection {
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            mode,
            selected: IndexSet::new(),
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// 切换到更窄的模式时只保留允许的部分: `Single` 保留最近一行, `None` 清空
    pub fn set_mode(&mut self, mode: SelectionMode) {
        self.mode = mode;
        match mode {
            SelectionMode::None => self.selected.clear(),
            SelectionMode::Single => {
                if let Some(last) = self.selected.last().copied() {
                    self.selected.clear();
                    self.selected.insert(last);
                }
            }
            SelectionMode::Multiple => {}
        }
    }

    /// 返回操作后该行是否选中
    pub fn toggle(&mut self, id: i64) -> bool {
        match self.mode {
            SelectionMode::None => false,
            SelectionMode::Single => {
                if self.selected.contains(&id) {
                    self.selected.clear();
                    false
                } else {
                    self.selected.clear();
                    self.selected.insert(id);
                    true
                }
            }
            SelectionMode::Multiple => {
                if self.selected.shift_remove(&id) {
                    false
                } else {
                    self.selected.insert(id);
                    true
                }
            }
        }
    }

    pub fn select_all(&mut self, ids: impl IntoIterator<Item = i64>) {
        if self.mode == SelectionMode::Multiple {
            self.selected.extend(ids);
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, id: i64) -> bool {
        self.selected.contains(&id)
    }

    pub fn selected(&self) -> Vec<i64> {
        self.selected.iter().copied().collect()
    }

    /// 重新拉取后移除已不存在的 id
    pub fn retain_existing(&mut self, ids: &[i64]) {
        self.selected.retain(|id| ids.contains(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_mode_replaces_selection() {
        let mut selection = Selection::new(SelectionMode::Single);
        assert!(selection.toggle(1));
        assert!(selection.toggle(2));
        assert_eq!(selection.selected(), vec![2]);
        assert!(!selection.toggle(2));
        assert!(selection.selected().is_empty());
    }

    #[test]
    fn narrowing_mode_keeps_latest_row() {
        let mut selection = Selection::new(SelectionMode::Multiple);
        selection.toggle(4);
        selection.toggle(9);
        selection.toggle(7);
        selection.set_mode(SelectionMode::Single);
        assert_eq!(selection.selected(), vec![7]);
        selection.set_mode(SelectionMode::None);
        assert!(selection.selected().is_empty());
        assert!(!selection.toggle(3));
    }

    #[test]
    fn select_all_only_in_multiple_mode() {
        let mut selection = Selection::new(SelectionMode::Single);
        selection.select_all([1, 2, 3]);
        assert!(selection.selected().is_empty());
        selection.set_mode(SelectionMode::Multiple);
        selection.select_all([1, 2, 3]);
        selection.retain_existing(&[2, 3]);
        assert_eq!(selection.selected(), vec![2, 3]);
    }
}
