use std::error::Error;
use std::fmt;
use wasm_bindgen::JsValue;

/// Which clear control a clear operation was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affordance {
    /// The remove icon of the first (or only) selected value.
    ClearFirst,
    /// The indicator that removes every selected value at once.
    ClearAll,
}

impl fmt::Display for Affordance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Affordance::ClearFirst => write!(f, "clear-first"),
            Affordance::ClearAll => write!(f, "clear-all"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectError {
    /// The fixed-depth walk from the input ran out of ancestors.
    StructureMismatch { expected: usize, reached: usize },
    /// No single accessible element with the label showed up before the wait timed out.
    NotFound { label: String, message: Option<String> },
    /// A clear icon the operation needs is not rendered.
    MissingAffordance { affordance: Affordance, icons: usize },
    InvalidSelector { selector: String, error: String },
    /// Raised by the host while dispatching or querying. Passed through untouched.
    Environment { message: String },
}

impl fmt::Display for SelectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectError::StructureMismatch { expected, reached } => write!(
                f,
                "StructureMismatch: expected {} ancestors above the input, found {}. Pass an explicit container",
                expected, reached
            ),
            SelectError::NotFound { label, message } => {
                if let Some(msg) = message {
                    write!(f, "{}", msg)
                } else {
                    write!(f, "NotFound: Unable to find an accessible element with the text: {}", label)
                }
            }
            SelectError::MissingAffordance { affordance, icons } => write!(
                f,
                "MissingAffordance: no {} icon among {} hidden icon(s) in the container",
                affordance, icons
            ),
            SelectError::InvalidSelector { selector, error } => {
                write!(f, "InvalidSelector: Invalid selector '{}'. Details: {}", selector, error)
            }
            SelectError::Environment { message } => write!(f, "Environment: {}", message),
        }
    }
}

impl Error for SelectError {}

impl From<JsValue> for SelectError {
    fn from(value: JsValue) -> Self {
        SelectError::Environment {
            message: value.as_string().unwrap_or_else(|| format!("{:?}", value)),
        }
    }
}

impl From<SelectError> for JsValue {
    fn from(err: SelectError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SelectError>;
