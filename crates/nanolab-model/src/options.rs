//! Configuration options for experiment parsing.

use serde::{Deserialize, Serialize};

/// Direction in which a file header is checked against its procedure schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ValidationMode {
    /// Every header key must be declared by the schema; schema keys may be
    /// absent from the header.
    #[default]
    KnownKeys,
    /// Every schema key must appear in the header; undeclared header keys
    /// are ignored.
    Exhaustive,
}

impl ValidationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationMode::KnownKeys => "known-keys",
            ValidationMode::Exhaustive => "exhaustive",
        }
    }
}

/// Options controlling how a single experiment file is parsed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ParseOptions {
    pub validation: ValidationMode,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_validation(mut self, validation: ValidationMode) -> Self {
        self.validation = validation;
        self
    }

    /// Requires every schema key to be present in the header.
    pub fn exhaustive() -> Self {
        Self::default().with_validation(ValidationMode::Exhaustive)
    }
}
