//! JSON body decoding and validation
//!
//! Decoding and validation fail with distinct errors so handlers can answer
//! malformed JSON and rule violations differently.

use crate::error::BodyError;
use axum::body::Body;
use serde::de::DeserializeOwned;
use serde::Serialize;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Read at most `limit` bytes of `body` and parse them as JSON.
pub async fn decode_json<T: DeserializeOwned>(body: Body, limit: usize) -> Result<T, BodyError> {
    let bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(BodyError::Read)?;

    serde_json::from_slice(&bytes).map_err(BodyError::Decode)
}

/// Runs the `validator` rules declared on a destination type.
///
/// Built once at startup and shared by every request; it holds no per-call
/// state.
#[derive(Debug, Clone, Default)]
pub struct BodyValidator {
    _private: (),
}

impl BodyValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate<T: Validate>(&self, value: &T) -> Result<(), Violations> {
        value.validate().map_err(Violations::from)
    }
}

/// One failed rule on one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldViolation {
    /// Dotted path to the field, with `[i]` for list items
    pub field: String,
    /// Rule code, e.g. `length` or `email`
    pub rule: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Every rule violation found in a body, ordered by field path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Violations(Vec<FieldViolation>);

impl Violations {
    pub fn iter(&self) -> std::slice::Iter<'_, FieldViolation> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.0.iter().any(|v| v.field == field)
    }
}

impl From<ValidationErrors> for Violations {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = Vec::new();
        flatten("", &errors, &mut out);
        out.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.rule.cmp(&b.rule)));
        Violations(out)
    }
}

impl std::fmt::Display for Violations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", v.field, v.rule)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Violations {
    type Item = &'a FieldViolation;
    type IntoIter = std::slice::Iter<'a, FieldViolation>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn flatten(prefix: &str, errors: &ValidationErrors, out: &mut Vec<FieldViolation>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };

        match kind {
            ValidationErrorsKind::Field(errs) => {
                out.extend(errs.iter().map(|e| FieldViolation {
                    field: path.clone(),
                    rule: e.code.to_string(),
                    value: e.params.get("value").cloned(),
                    message: e.message.as_ref().map(|m| m.to_string()),
                }));
            }
            ValidationErrorsKind::Struct(inner) => flatten(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten(&format!("{path}[{index}]"), inner, out);
                }
            }
        }
    }
}
