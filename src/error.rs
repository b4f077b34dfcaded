//! Error taxonomy for store construction, dispatch, and storage.

use thiserror::Error;

/// Failures surfaced by registries and stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An accessor ran with no scoped registry and no installed default.
    #[error("no registry is active; install one or resolve inside a scope")]
    NoActiveRegistry,

    /// A plugin refused the store during construction.
    #[error("plugin failed while constructing store `{id}`")]
    Plugin {
        id: String,
        #[source]
        source: PluginError,
    },

    /// `call` named an action the store does not define.
    #[error("store `{id}` has no action `{name}`")]
    UnknownAction { id: String, name: String },

    /// `reset` on a setup store, which has no declared initial shape.
    #[error("store `{id}` was built from a setup function and cannot reset")]
    ResetUnsupported { id: String },
}

/// Failures a plugin can raise; any of these aborts store construction.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Serialize(#[from] serde_json::Error),

    #[error("{0}")]
    Message(String),
}

/// A storage backend failure.
#[derive(Clone, Debug, Error)]
#[error("storage backend error: {0}")]
pub struct StorageError(pub String);
