//! Errors raised after type checking.

use std::fmt;

use minml_typeck::error::TypeError;

/// A fatal error raised by the K-normalizer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LowerError {
    /// A free name that is neither locally bound nor an external array.
    UnresolvedReference { name: String },
    /// A call to an unbound name that has no function type in the external
    /// table.
    UnknownExternalFunction { name: String },
}

impl fmt::Display for LowerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LowerError::UnresolvedReference { name } => {
                write!(f, "external variable `{}` does not have an array type", name)
            }
            LowerError::UnknownExternalFunction { name } => {
                write!(f, "external function `{}` does not have a function type", name)
            }
        }
    }
}

impl std::error::Error for LowerError {}

/// Any error that aborts a compilation.
#[derive(Clone, Debug, PartialEq)]
pub enum CompileError {
    Type(TypeError),
    Lower(LowerError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Type(e) => write!(f, "type error: {}", e),
            CompileError::Lower(e) => write!(f, "lowering error: {}", e),
        }
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompileError::Type(e) => Some(e),
            CompileError::Lower(e) => Some(e),
        }
    }
}

impl From<TypeError> for CompileError {
    fn from(e: TypeError) -> Self {
        CompileError::Type(e)
    }
}

impl From<LowerError> for CompileError {
    fn from(e: LowerError) -> Self {
        CompileError::Lower(e)
    }
}
