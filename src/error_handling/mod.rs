//! Error handling for the comparison engine.
//!
//! This module provides:
//! - Error type definitions, from remote call failures to run-level errors
//! - Error text preparation for stored site results
//!
//! Errors are layered:
//! - **RemoteError**: a single remote catalog call failed
//! - **PairError**: a site pair could not be compared (recorded on the pair, never propagated)
//! - **EngineError**: the run itself could not start or persist its result

mod message;
mod types;

// Re-export public API
pub use message::stored_error_message;
pub use types::{
    EngineError, InitializationError, PairError, PairImportError, RemoteError, RemoteErrorKind,
    StoreError, ValidationError,
};
