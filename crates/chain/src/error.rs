use wirelink_common::errors::{clean_message, user_message};
use wirelink_primitives::{KeyError, Name, NameError};

/// Errors raised while encoding or decoding ABI-typed data.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum AbiError {
    /// The type is neither built in nor declared by the ABI.
    #[error("unsupported ABI type `{0}`")]
    UnsupportedType(String),
    /// The ABI does not declare the action.
    #[error("action `{0}` is not declared by the ABI")]
    UnknownAction(Name),
    /// A struct value is missing a required field.
    #[error("missing field `{field}` of struct `{ty}`")]
    MissingField {
        /// Struct type.
        ty: String,
        /// Missing field.
        field: String,
    },
    /// A value does not have the shape its type requires.
    #[error("invalid `{ty}` value: {reason}")]
    InvalidValue {
        /// Expected type.
        ty: String,
        /// What is wrong with the value.
        reason: String,
    },
    /// The binary input ended early.
    #[error("unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEnd {
        /// Bytes needed by the current read.
        needed: usize,
        /// Bytes left in the input.
        remaining: usize,
    },
    /// Type aliases or struct bases form a cycle, or nest too deeply.
    #[error("type `{0}` nests too deeply")]
    TooDeep(String),
    /// A name could not be parsed.
    #[error(transparent)]
    Name(#[from] NameError),
    /// A signature could not be parsed.
    #[error(transparent)]
    Key(#[from] KeyError),
}

impl AbiError {
    pub(crate) fn invalid(ty: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue { ty: ty.to_string(), reason: reason.into() }
    }
}

/// Errors raised by chain RPC calls.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// The node rejected the request.
    #[error("{name} ({code}): {}", .details.first().map(String::as_str).unwrap_or("no details"))]
    Api {
        /// Node error code, or the HTTP status when the node sent none.
        code: i64,
        /// Node error name.
        name: String,
        /// Detail messages, most relevant first.
        details: Vec<String>,
    },
    /// The request could not be sent or the response could not be read.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    /// The response body is not what the call returns.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    /// Action data could not be encoded.
    #[error(transparent)]
    Abi(#[from] AbiError),
    /// Action data for a contract without ABI was not pre-packed.
    #[error("contract `{0}` has no ABI, action data must be packed")]
    MissingAbi(Name),
    /// The response is well-formed but unusable.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ChainError {
    /// Flattens the error to one display message: the first detail of a node error, otherwise
    /// the error itself, with `Error:` markers removed.
    pub fn message(&self) -> String {
        match self {
            Self::Api { name, details, .. } => {
                clean_message(details.first().map(String::as_str).unwrap_or(name))
            }
            other => user_message(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_is_first_detail() {
        let err = ChainError::Api {
            code: 3050003,
            name: "eosio_assert_message_exception".into(),
            details: vec![
                "Error: assertion failure with message: link already exists".into(),
                "pending console output: ".into(),
            ],
        };
        assert_eq!(err.message(), "assertion failure with message: link already exists");
        assert!(err.to_string().starts_with("eosio_assert_message_exception (3050003): "));
    }

    #[test]
    fn message_falls_back_to_name() {
        let err = ChainError::Api { code: 500, name: "Internal Server Error".into(), details: vec![] };
        assert_eq!(err.message(), "Internal Server Error");
        assert_eq!(
            ChainError::InvalidResponse("Error: empty".into()).message(),
            "invalid response: empty"
        );
    }
}
