use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::fmt;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex");
    static ref SKU_RE: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]{1,39}$").expect("valid sku regex");
}

/// 字段级校验错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        self.0.extend(other.0);
    }

    pub fn required(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, "Required");
        }
    }

    pub fn email(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, "Required");
        } else if !is_email(value) {
            self.add(field, "Invalid e-mail address");
        }
    }

    pub fn non_negative(&mut self, field: &str, value: Option<f64>) {
        match value {
            None => self.add(field, "Required"),
            Some(v) if !v.is_finite() || v < 0.0 => self.add(field, "Must be zero or greater"),
            Some(_) => {}
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

pub fn is_email(value: &str) -> bool {
    EMAIL_RE.is_match(value.trim())
}

pub fn is_sku(value: &str) -> bool {
    SKU_RE.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_field_errors() {
        let mut errors = ValidationErrors::new();
        errors.required("name", "  ");
        errors.email("email", "nobody");
        errors.non_negative("price", Some(-1.0));
        assert_eq!(errors.len(), 3);
        assert!(errors.has("email"));
        assert_eq!(
            errors.to_string(),
            "name: Required, email: Invalid e-mail address, price: Must be zero or greater"
        );
    }

    #[test]
    fn accepts_valid_values() {
        let mut errors = ValidationErrors::new();
        errors.required("name", "Olive oil");
        errors.email("email", "buyer@example.com");
        errors.non_negative("price", Some(0.0));
        assert!(errors.into_result().is_ok());
        assert!(is_sku("OIL-500"));
        assert!(!is_sku("-bad"));
    }
}
