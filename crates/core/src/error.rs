//! Error types for Cambium.

use crate::types::DataType;
use alloc::string::String;
use core::fmt;

/// Result type alias for Cambium operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for Cambium operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Operation references a column missing from the schema, or the schema
    /// declaration itself is malformed.
    SchemaViolation {
        message: String,
    },
    /// Pagination planner assertion: primary key not covered by the ordering,
    /// or sort directions disagree.
    PaginationMisordered {
        message: String,
    },
    /// The SQL compiler reached an expression or statement kind it cannot render.
    CompileUnsupported {
        kind: String,
    },
    /// The expression interpreter reached a kind it cannot evaluate.
    InterpUnsupported {
        kind: String,
    },
    /// A late-bound parameter's field is absent from the bind context.
    MissingBinding {
        field: String,
    },
    /// Value does not match the declared column kind.
    TypeMismatch {
        expected: DataType,
        got: Option<DataType>,
    },
    /// Failure propagated unchanged from the storage backend.
    Backend {
        message: String,
    },
    /// Read or fork on a Dynamic after disconnect.
    DynamicDisconnected,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SchemaViolation { message } => {
                write!(f, "Schema violation: {}", message)
            }
            Error::PaginationMisordered { message } => {
                write!(f, "Pagination misordered: {}", message)
            }
            Error::CompileUnsupported { kind } => {
                write!(f, "Cannot compile expression kind: {}", kind)
            }
            Error::InterpUnsupported { kind } => {
                write!(f, "Cannot interpret expression kind: {}", kind)
            }
            Error::MissingBinding { field } => {
                write!(f, "Bind context has no value for: {}", field)
            }
            Error::TypeMismatch { expected, got } => match got {
                Some(got) => write!(f, "Type mismatch: expected {}, got {}", expected, got),
                None => write!(f, "Type mismatch: expected {}, got null", expected),
            },
            Error::Backend { message } => {
                write!(f, "Backend error: {}", message)
            }
            Error::DynamicDisconnected => {
                write!(f, "Dynamic has been disconnected")
            }
        }
    }
}

impl Error {
    /// Creates a schema violation error.
    pub fn schema_violation(message: impl Into<String>) -> Self {
        Error::SchemaViolation {
            message: message.into(),
        }
    }

    /// Creates a pagination assertion error.
    pub fn pagination_misordered(message: impl Into<String>) -> Self {
        Error::PaginationMisordered {
            message: message.into(),
        }
    }

    /// Creates a compile-unsupported error.
    pub fn compile_unsupported(kind: impl Into<String>) -> Self {
        Error::CompileUnsupported { kind: kind.into() }
    }

    /// Creates an interpret-unsupported error.
    pub fn interp_unsupported(kind: impl Into<String>) -> Self {
        Error::InterpUnsupported { kind: kind.into() }
    }

    /// Creates a missing-binding error.
    pub fn missing_binding(field: impl Into<String>) -> Self {
        Error::MissingBinding {
            field: field.into(),
        }
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(expected: DataType, got: Option<DataType>) -> Self {
        Error::TypeMismatch { expected, got }
    }

    /// Creates a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Error::Backend {
            message: message.into(),
        }
    }
}
