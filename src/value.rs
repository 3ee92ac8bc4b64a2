use std::fmt;

/// Payload a test or task returns on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Val {
    None,
    Int(i64),
    String(String),
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::None => write!(f, "-"),
            Val::Int(i) => write!(f, "{}", i),
            Val::String(s) => write!(f, "{}", s),
        }
    }
}
