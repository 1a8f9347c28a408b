use thiserror::Error;

/// Errors produced while decoding a binary message against a schema.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("unexpected end of buffer")]
    UnexpectedEof,

    #[error("varint is longer than 10 bytes")]
    MalformedVarint,

    #[error("declared length {declared} exceeds the {remaining} remaining bytes")]
    TruncatedPayload { declared: usize, remaining: usize },

    #[error("field \"{field}\" expects wire type {expected} but the tag carries {actual}")]
    WireTypeMismatch {
        field:    String,
        expected: u8,
        actual:   u8,
    },

    #[error("wire type {0} (group encoding) is not supported")]
    UnsupportedWireType(u8),

    #[error("string field contains invalid UTF-8")]
    InvalidUtf8,

    #[error("no message named \"{0}\" in this schema")]
    UnknownMessage(String),
}

/// Errors produced while constructing or encoding a message instance.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("required field \"{field}\" of \"{message}\" has no value")]
    MissingRequiredField { message: String, field: String },

    #[error("no message named \"{0}\" in this schema")]
    UnknownMessage(String),

    #[error("no field named \"{field}\" in \"{message}\"")]
    UnknownField { message: String, field: String },

    #[error("value for field \"{field}\" does not match its declared type")]
    TypeMismatch { field: String },
}
