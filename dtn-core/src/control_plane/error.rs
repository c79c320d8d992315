//! Registrar error taxonomy.

use crate::bundle::BundleId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrarError {
    #[error("registrar is disabled")]
    RegistrarDisabled,
    #[error("argument `{0}` is null or empty")]
    NullArgument(&'static str),
    #[error("cookie does not match the registration")]
    BadCookie,
    #[error("sink {0:?} is not registered")]
    SinkNotRegistered(String),
    #[error("sink {0:?} is already registered")]
    SinkAlreadyRegistered(String),
    #[error("bundle malformed: {0}")]
    BundleMalformed(String),
    #[error("bundle {0} is not available for this sink")]
    BundleNotFound(BundleId),
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}
