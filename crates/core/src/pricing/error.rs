use std::fmt;

/// A numeric input outside the domain the pricing engine defines answers for.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidInput {
    pub field: &'static str,
    pub detail: String,
}

impl InvalidInput {
    pub fn new(field: &'static str, detail: impl Into<String>) -> Self {
        Self {
            field,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for InvalidInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {}", self.field, self.detail)
    }
}

impl std::error::Error for InvalidInput {}
