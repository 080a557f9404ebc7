//! Filter operations for PostgrestClient

/// Operator for filter expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equal to
    Eq,
}

impl FilterOperator {
    /// Convert the operator to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
        }
    }

    /// Render `value` as a query parameter value, e.g. `eq.42`
    pub fn apply(&self, value: &str) -> String {
        format!("{}.{}", self.as_str(), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_postgrest_syntax() {
        assert_eq!(FilterOperator::Eq.apply("user-1"), "eq.user-1");
        assert_eq!(FilterOperator::Eq.apply("42"), "eq.42");
    }
}
