//! XML and path-expression error types.

use thiserror::Error;

/// Errors that can occur while reading XML text.
#[derive(Debug, Error)]
pub enum XmlError {
    /// The source text is not well-formed XML.
    #[error("Malformed XML at byte {offset}: {message}")]
    Malformed {
        /// Error message.
        message: String,
        /// Byte offset where the error was detected.
        offset: u64,
    },

    /// The source text contains no root element.
    #[error("Document has no root element")]
    MissingRoot,

    /// The source bytes are not valid in their detected encoding.
    #[error("Content is not valid {0}")]
    Encoding(String),
}

impl XmlError {
    /// Creates a new malformed-content error.
    pub fn malformed(message: impl Into<String>, offset: u64) -> Self {
        Self::Malformed {
            message: message.into(),
            offset,
        }
    }
}

/// Errors that can occur while compiling or evaluating a path expression.
#[derive(Debug, Error, PartialEq)]
pub enum XPathError {
    /// The expression text could not be parsed.
    #[error("Invalid expression '{expression}' at {position}: {message}")]
    Syntax {
        /// The full expression text.
        expression: String,
        /// Character offset of the offending token.
        position: usize,
        /// Error message.
        message: String,
    },

    /// The expression calls a function that is not supported.
    #[error("Unknown function: {0}()")]
    UnknownFunction(String),

    /// A function was called with the wrong number of arguments.
    #[error("Function {function}() expects {expected} argument(s), found {found}")]
    Arity {
        /// Function name.
        function: String,
        /// Human readable description of the accepted argument count.
        expected: String,
        /// Number of arguments given.
        found: usize,
    },

    /// The expression references a variable with no binding.
    #[error("Undefined variable: ${0}")]
    UndefinedVariable(String),

    /// A node-set was required but the expression produced another type.
    #[error("Expression '{0}' does not select nodes")]
    NotANodeSet(String),
}

impl XPathError {
    /// Creates a new syntax error.
    pub fn syntax(expression: &str, position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            expression: expression.to_string(),
            position,
            message: message.into(),
        }
    }
}
