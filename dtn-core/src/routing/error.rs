//! Link-local table error taxonomy.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkLocalError {
    #[error("link-local table is disabled")]
    ComponentDisabled,
}
