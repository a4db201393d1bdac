use dashmap::DashMap;

/// 记录向导最后访问的步骤, 仅用于过渡动画的连续性
pub trait VisitStore: Send + Sync {
    fn remember(&self, wizard: &str, index: usize);
    fn last_visited(&self, wizard: &str) -> Option<usize>;
}

#[derive(Debug, Default)]
pub struct MemoryVisitStore {
    visits: DashMap<String, usize>,
}

impl MemoryVisitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VisitStore for MemoryVisitStore {
    fn remember(&self, wizard: &str, index: usize) {
        self.visits.insert(wizard.to_string(), index);
    }

    fn last_visited(&self, wizard: &str) -> Option<usize> {
        self.visits.get(wizard).map(|v| *v)
    }
}
