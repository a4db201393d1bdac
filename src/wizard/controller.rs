use super::visits::VisitStore;
use serde::Serialize;
use std::sync::Arc;

/// 过渡动画方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Direction {
    Backward = -1,
    #[default]
    Still = 0,
    Forward = 1,
}

impl Direction {
    pub fn as_i8(self) -> i8 {
        self as i8
    }

    fn between(from: usize, to: usize) -> Self {
        match to.cmp(&from) {
            std::cmp::Ordering::Greater => Direction::Forward,
            std::cmp::Ordering::Less => Direction::Backward,
            std::cmp::Ordering::Equal => Direction::Still,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WizardStep {
    pub key: &'static str,
    pub title: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StepState {
    Complete,
    Active,
    Upcoming,
}

/// 进度条中的一个步骤
#[derive(Debug, Clone, Serialize)]
pub struct StepProgress {
    pub index: usize,
    pub key: &'static str,
    pub title: &'static str,
    pub state: StepState,
    pub jumpable: bool,
}

/// 多步表单的步骤控制器
///
/// 跳转分两步: [`request_jump`] 写入单槽, 渲染步骤的一方用
/// [`apply_pending_jump`] 取出并执行, 只执行一次。
/// 激活索引之前的步骤视为已完成。
///
/// [`request_jump`]: WizardController::request_jump
/// [`apply_pending_jump`]: WizardController::apply_pending_jump
pub struct WizardController {
    id: String,
    steps: Vec<WizardStep>,
    active: usize,
    direction: Direction,
    allow_arbitrary_jumps: bool,
    pending_jump: Option<usize>,
    visits: Option<Arc<dyn VisitStore>>,
}

impl WizardController {
    pub fn new(id: impl Into<String>, steps: Vec<WizardStep>) -> Self {
        Self {
            id: id.into(),
            steps,
            active: 0,
            direction: Direction::Still,
            allow_arbitrary_jumps: false,
            pending_jump: None,
            visits: None,
        }
    }

    pub fn with_arbitrary_jumps(mut self, allow: bool) -> Self {
        self.allow_arbitrary_jumps = allow;
        self
    }

    /// 上次会话最后访问的步骤决定初始过渡方向
    pub fn with_visit_store(mut self, store: Arc<dyn VisitStore>) -> Self {
        if let Some(last) = store.last_visited(&self.id) {
            self.direction = Direction::between(last, self.active);
        }
        self.visits = Some(store);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active_step(&self) -> Option<&WizardStep> {
        self.steps.get(self.active)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn is_first(&self) -> bool {
        self.active == 0
    }

    pub fn is_last(&self) -> bool {
        self.active + 1 >= self.steps.len()
    }

    pub fn is_complete(&self, index: usize) -> bool {
        index < self.active
    }

    pub fn pending_jump(&self) -> Option<usize> {
        self.pending_jump
    }

    /// 当前步骤校验通过才前进一步
    pub fn next<F>(&mut self, validate: F) -> bool
    where
        F: FnOnce(usize) -> bool,
    {
        if self.is_last() {
            return false;
        }
        if !validate(self.active) {
            tracing::debug!("Wizard {}: step {} did not validate", self.id, self.active);
            return false;
        }
        self.move_to(self.active + 1, Direction::Forward);
        true
    }

    pub fn previous(&mut self) -> bool {
        if self.is_first() {
            return false;
        }
        self.move_to(self.active - 1, Direction::Backward);
        true
    }

    /// 未开启任意跳转时只能跳回之前的步骤; 被拒绝的请求不改动槽位
    pub fn request_jump(&mut self, index: usize) -> bool {
        if index >= self.steps.len() || index == self.active {
            return false;
        }
        if !self.allow_arbitrary_jumps && !self.is_complete(index) {
            tracing::debug!("Wizard {}: forward jump to step {} refused", self.id, index);
            return false;
        }
        self.pending_jump = Some(index);
        true
    }

    /// 执行并清空待跳转
    pub fn apply_pending_jump(&mut self) -> Option<usize> {
        let target = self.pending_jump.take()?;
        self.move_to(target, Direction::between(self.active, target));
        Some(target)
    }

    pub fn progress(&self) -> Vec<StepProgress> {
        self.steps
            .iter()
            .enumerate()
            .map(|(index, step)| {
                let state = if index == self.active {
                    StepState::Active
                } else if self.is_complete(index) {
                    StepState::Complete
                } else {
                    StepState::Upcoming
                };
                StepProgress {
                    index,
                    key: step.key,
                    title: step.title,
                    state,
                    jumpable: index != self.active
                        && (self.allow_arbitrary_jumps || state == StepState::Complete),
                }
            })
            .collect()
    }

    // 方向必须在切换索引之前写入
    fn move_to(&mut self, index: usize, direction: Direction) {
        self.direction = direction;
        if let Some(store) = &self.visits {
            store.remember(&self.id, self.active);
        }
        self.active = index;
    }
}
