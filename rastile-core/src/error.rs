//! Error types for tile schemas

use thiserror::Error;

use crate::types::Level;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Level {level} is outside the schema range (0..{levels})")]
    LevelOutOfRange { level: Level, levels: usize },

    #[error("Invalid tile schema: {message}")]
    Invalid { message: String },
}

impl SchemaError {
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid { message: message.into() }
    }
}
