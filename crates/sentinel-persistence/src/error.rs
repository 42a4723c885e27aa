//! Persistence error types.

/// Errors a store implementation can report back to its caller.
///
/// The in-memory reference store in [`crate::memory`] only ever produces
/// [`Error::Unavailable`], and only when deliberately configured to via
/// [`crate::memory::InMemoryStore::fail_next`] — real backing stores (a
/// database, a remote cache) would additionally surface connection and
/// serialization failures through the same variant.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("store temporarily unavailable: {0}")]
    Unavailable(String),

    #[error("store lock poisoned")]
    LockPoisoned,
}

pub type Result<T> = std::result::Result<T, Error>;
