use serde::Serialize;

/// A single rejected field in a registration or configuration edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{field}: {message}")]
pub struct FieldViolation {
    pub field: &'static str,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    /// Every violation found in the submitted value, not just the first.
    #[error("Validation failed: {}", join_violations(.0))]
    Validation(Vec<FieldViolation>),
}

impl CoreError {
    /// The collected violations, or an empty slice for non-validation errors.
    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            CoreError::Validation(v) => v,
            _ => &[],
        }
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display_lists_every_violation() {
        let err = CoreError::Validation(vec![
            FieldViolation::new("name", "must not be empty"),
            FieldViolation::new("ip_address", "must not be empty"),
        ]);
        assert_eq!(
            err.to_string(),
            "Validation failed: name: must not be empty; ip_address: must not be empty"
        );
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn not_found_has_no_violations() {
        let err = CoreError::NotFound {
            entity: "device",
            id: "lpg-009".to_string(),
        };
        assert!(err.violations().is_empty());
        assert_eq!(err.to_string(), "Entity not found: device with id lpg-009");
    }
}
