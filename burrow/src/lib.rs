//! The Burrow project commonly used functionalities.

pub mod chunk;
pub mod dialects;
pub mod encoding;
pub mod messages;
pub mod package;
pub mod settings;
pub mod transport;

pub type Result<T> = std::result::Result<T, BurrowError>;

#[derive(thiserror::Error, Debug)]
pub enum BurrowError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Conversion(#[from] serde_json::Error),

    #[error("controller unreachable after {attempts} lookup attempts")]
    Unreachable { attempts: u32 },

    #[error("malformed package: {0}")]
    MalformedPackage(&'static str),

    #[error("invalid text encoding: {0}")]
    InvalidEncoding(String),

    #[error("chunk {index} was not acknowledged")]
    ChunkNotAcknowledged { index: usize },

    #[error("invalid controller address: {0}")]
    Address(String),
}
