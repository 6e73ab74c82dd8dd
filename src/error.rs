// Errors of the delete flow that reach the user. Lookup failures and
// failed probes never show up here; see `resolve`.

use thiserror::Error;

use crate::resolve::ItemKind;

#[derive(Debug, Error)]
pub enum DeleteError {
    /// `delete <type>` without an id.
    #[error("ID required when type is specified ({kind}).")]
    MissingId { kind: ItemKind },

    /// The user named the type explicitly and that delete failed. The
    /// remote error is shown as is.
    #[error("{error:#}")]
    Declared {
        kind: ItemKind,
        id: String,
        error: anyhow::Error,
    },

    #[error("Could not find or delete item with ID {id}")]
    Exhausted { id: String },

    #[error("read confirmation: {0}")]
    Prompt(#[from] std::io::Error),
}

impl DeleteError {
    /// Usage errors exit with 2 like other argument errors; everything
    /// else is a plain failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            DeleteError::MissingId { .. } => 2,
            _ => 1,
        }
    }
}
