use crate::document::SourceId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("document '{id}' is indexed from source {indexed}, cannot merge it from source {incoming}")]
    SourceMismatch {
        id: String,
        indexed: SourceId,
        incoming: SourceId,
    },

    #[error("index snapshot is read-only")]
    ReadOnly,
}
