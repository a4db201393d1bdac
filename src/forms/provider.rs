use super::{FormDraft, FormWizard};
use crate::models::{Provider, ProviderStatus, ValidationErrors};
use crate::wizard::WizardStep;

/// 供应商入驻向导
pub type ProviderOnboarding = FormWizard<ProviderDraft>;

#[derive(Debug, Clone, Default)]
pub struct ProviderDraft {
    pub name: String,
    pub tax_id: String,
    pub address: Option<String>,
    pub contact_name: String,
    pub email: String,
    pub phone: String,
    pub documents: Vec<String>,
}

impl FormDraft for ProviderDraft {
    type Output = Provider;

    const WIZARD_ID: &'static str = "provider-onboarding";

    fn steps() -> Vec<WizardStep> {
        vec![
            WizardStep { key: "company", title: "Company" },
            WizardStep { key: "contact", title: "Contact" },
            WizardStep { key: "documents", title: "Documents" },
            WizardStep { key: "review", title: "Review" },
        ]
    }

    fn validate_step(&self, index: usize) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        match index {
            0 => {
                errors.required("name", &self.name);
                errors.required("tax_id", &self.tax_id);
            }
            1 => {
                errors.required("contact_name", &self.contact_name);
                errors.email("email", &self.email);
                errors.required("phone", &self.phone);
            }
            2 if self.documents.is_empty() => {
                errors.add("documents", "Upload at least one document");
            }
            _ => {}
        }
        errors
    }

    fn build(&self) -> Provider {
        Provider {
            name: self.name.trim().to_string(),
            tax_id: self.tax_id.trim().to_uppercase(),
            contact_name: self.contact_name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            phone: self.phone.trim().to_string(),
            address: self.address.clone().filter(|a| !a.trim().is_empty()),
            documents: self.documents.clone(),
            status: ProviderStatus::Pending,
        }
    }
}
