//! Codec error types.

use thiserror::Error;

/// Result type for JSON micro-codec operations.
pub type JsonResult<T> = Result<T, JsonError>;

/// Errors produced by the JSON micro-codec.
///
/// The codec covers exactly the subset of JSON the adapter protocol emits;
/// anything outside that subset maps to one of these variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum JsonError {
    /// A string token was required at the current position.
    #[error("expected JSON string")]
    ExpectedString,

    /// A string token ended without a closing quote.
    #[error("unterminated JSON string")]
    UnterminatedString,

    /// A backslash escape was cut off by the end of the token.
    #[error("invalid JSON string escape")]
    TruncatedEscape,

    /// An escape sequence outside the supported set.
    #[error("unsupported JSON escape")]
    UnknownEscape,

    /// A `\u` escape without four following characters.
    #[error("invalid unicode escape")]
    InvalidUnicodeEscape,

    /// A decoder was handed a token that is not a quoted string.
    #[error("expected JSON string token")]
    ExpectedStringToken,

    /// An object was required at the current position.
    #[error("expected JSON object")]
    ExpectedObject,

    /// Missing `:` between an object key and its value.
    #[error("expected ':' in JSON object")]
    ExpectedColon,

    /// Malformed member list inside an object.
    #[error("invalid JSON object")]
    InvalidObject,

    /// An object ended without a closing brace.
    #[error("unterminated JSON object")]
    UnterminatedObject,

    /// An array was required at the current position.
    #[error("expected JSON array")]
    ExpectedArray,

    /// Malformed element list inside an array.
    #[error("invalid JSON array")]
    InvalidArray,

    /// An array ended without a closing bracket.
    #[error("unterminated JSON array")]
    UnterminatedArray,

    /// No valid value starts at the current position.
    #[error("invalid JSON value")]
    InvalidValue,

    /// Input ended where a value was required.
    #[error("unexpected end of JSON")]
    UnexpectedEnd,
}
