use super::{FormDraft, FormWizard};
use crate::models::{AccessRequest, AccessRequestStatus, ValidationErrors};
use crate::wizard::WizardStep;

/// 顾客入会申请流程
pub type AccessRequestFlow = FormWizard<AccessRequestDraft>;

#[derive(Debug, Clone, Default)]
pub struct AccessRequestDraft {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub heard_from: String,
    pub referral_code: Option<String>,
    pub terms_accepted: bool,
}

impl FormDraft for AccessRequestDraft {
    type Output = AccessRequest;

    const WIZARD_ID: &'static str = "access-request";

    fn steps() -> Vec<WizardStep> {
        vec![
            WizardStep { key: "personal", title: "Personal" },
            WizardStep { key: "membership", title: "Membership" },
            WizardStep { key: "confirmation", title: "Confirmation" },
        ]
    }

    fn validate_step(&self, index: usize) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        match index {
            0 => {
                errors.required("full_name", &self.full_name);
                errors.email("email", &self.email);
                errors.required("phone", &self.phone);
            }
            1 => errors.required("heard_from", &self.heard_from),
            2 if !self.terms_accepted => errors.add("terms_accepted", "The terms must be accepted"),
            _ => {}
        }
        errors
    }

    fn build(&self) -> AccessRequest {
        AccessRequest {
            full_name: self.full_name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            phone: self.phone.trim().to_string(),
            heard_from: self.heard_from.trim().to_string(),
            referral_code: self
                .referral_code
                .as_ref()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            terms_accepted: self.terms_accepted,
            status: AccessRequestStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmation_requires_terms() {
        let mut flow = AccessRequestFlow::new(AccessRequestDraft {
            full_name: "Robin Park".to_string(),
            email: "robin@example.com".to_string(),
            phone: "555 0199".to_string(),
            heard_from: "A friend".to_string(),
            referral_code: Some("  ".to_string()),
            ..Default::default()
        });
        assert!(flow.next());
        assert!(flow.next());
        assert!(flow.controller().is_last());

        let errors = flow.finish().unwrap_err();
        assert!(errors.has("terms_accepted"));
        assert_eq!(errors.len(), 1);

        flow.draft_mut().terms_accepted = true;
        let request = flow.finish().unwrap();
        assert_eq!(request.status, AccessRequestStatus::Pending);
        assert_eq!(request.referral_code, None);
    }

    #[test]
    fn invalid_email_stays_on_personal_step() {
        let mut flow = AccessRequestFlow::new(AccessRequestDraft {
            full_name: "Robin Park".to_string(),
            email: "robin.example.com".to_string(),
            phone: "555 0199".to_string(),
            ..Default::default()
        });
        assert!(!flow.next());
        assert_eq!(flow.controller().active_index(), 0);
        assert!(flow.errors().has("email"));
        assert!(!flow.errors().has("phone"));
    }
}
