//! Validation errors.

use thiserror::Error;

/// One failed rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Top-level property the rule applies to. Empty for the payload itself.
    pub field: String,
    /// The JSON Schema keyword that failed (`required`, `minimum`, ...).
    pub keyword: String,
    /// Human-readable message.
    pub message: String,
}

/// Errors from schema compilation and request validation.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The payload violated one or more rules. Carries every violation.
    #[error("Validation error: {}", join_messages(.violations))]
    Invalid {
        /// Schema name.
        schema: &'static str,
        /// Every violation, in report order.
        violations: Vec<Violation>,
    },

    /// A built-in schema document failed to compile.
    #[error("failed to compile schema {schema}: {reason}")]
    Compile {
        /// Schema name.
        schema: &'static str,
        /// Compiler message.
        reason: String,
    },
}

impl SchemaError {
    /// The individual violation messages, empty for compile errors.
    pub fn messages(&self) -> Vec<&str> {
        match self {
            Self::Invalid { violations, .. } => {
                violations.iter().map(|v| v.message.as_str()).collect()
            }
            Self::Compile { .. } => Vec::new(),
        }
    }
}

fn join_messages(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.message.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
