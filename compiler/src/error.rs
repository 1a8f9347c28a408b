use dynaproto_schema::{DecodeError, EncodeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Lexical error at line {line}, column {column}: {msg}")]
    Lexical {
        msg:    String,
        line:   usize,
        column: usize,
    },

    #[error("Syntax error at line {line}, column {column}: {msg}")]
    Syntax {
        msg:    String,
        line:   usize,
        column: usize,
    },

    #[error("Definition error at line {line}, column {column}: {msg}")]
    Definition {
        msg:    String,
        line:   usize,
        column: usize,
    },

    #[error("Resolution error: {0}")]
    Resolution(String),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}
