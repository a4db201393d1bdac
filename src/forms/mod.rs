pub mod access_request;
pub mod product;
pub mod provider;

pub use access_request::{AccessRequestDraft, AccessRequestFlow};
pub use product::{ProductDraft, ProductWizard};
pub use provider::{ProviderDraft, ProviderOnboarding};

use crate::models::ValidationErrors;
use crate::wizard::{VisitStore, WizardController, WizardStep};
use std::sync::Arc;

/// 多步表单背后的草稿状态
pub trait FormDraft {
    type Output;

    const WIZARD_ID: &'static str;

    fn steps() -> Vec<WizardStep>;

    /// 单个步骤的字段错误, 为空时可离开该步骤
    fn validate_step(&self, index: usize) -> ValidationErrors;

    fn build(&self) -> Self::Output;
}

/// 向导表单: 草稿 + 步骤控制器
pub struct FormWizard<D: FormDraft> {
    controller: WizardController,
    draft: D,
    errors: ValidationErrors,
}

impl<D: FormDraft> FormWizard<D> {
    pub fn new(draft: D) -> Self {
        Self {
            controller: WizardController::new(D::WIZARD_ID, D::steps()),
            draft,
            errors: ValidationErrors::new(),
        }
    }

    pub fn with_visit_store(mut self, store: Arc<dyn VisitStore>) -> Self {
        self.controller = self.controller.with_visit_store(store);
        self
    }

    pub fn controller(&self) -> &WizardController {
        &self.controller
    }

    pub fn draft(&self) -> &D {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut D {
        &mut self.draft
    }

    /// 最近一次步骤校验失败的错误, 用于行内提示
    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn next(&mut self) -> bool {
        let draft = &self.draft;
        let mut errors = ValidationErrors::new();
        let moved = self.controller.next(|index| {
            errors = draft.validate_step(index);
            errors.is_empty()
        });
        self.errors = errors;
        moved
    }

    pub fn previous(&mut self) -> bool {
        self.errors = ValidationErrors::new();
        self.controller.previous()
    }

    pub fn request_jump(&mut self, index: usize) -> bool {
        self.controller.request_jump(index)
    }

    pub fn apply_pending_jump(&mut self) -> Option<usize> {
        let target = self.controller.apply_pending_jump()?;
        self.errors = ValidationErrors::new();
        Some(target)
    }

    /// 校验全部步骤并生成最终结果
    pub fn finish(&mut self) -> Result<D::Output, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for index in 0..self.controller.step_count() {
            errors.merge(self.draft.validate_step(index));
        }
        if !errors.is_empty() {
            tracing::debug!("{} cannot finish: {}", D::WIZARD_ID, errors);
            self.errors = errors.clone();
            return Err(errors);
        }
        self.errors = ValidationErrors::new();
        Ok(self.draft.build())
    }
}
