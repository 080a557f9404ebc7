//! Types for the PostgrestClient

/// Direction of an `order` clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
}

impl SortOrder {
    /// Convert the order to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
        }
    }
}

/// Options for returning data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnOption {
    /// Return representation (the data)
    Representation,

    /// Return minimal data
    Minimal,
}

impl ReturnOption {
    /// Convert the option to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnOption::Representation => "representation",
            ReturnOption::Minimal => "minimal",
        }
    }

    /// Value for the `Prefer` header
    pub fn prefer(&self) -> String {
        format!("return={}", self.as_str())
    }
}
