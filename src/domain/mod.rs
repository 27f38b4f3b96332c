//! Domain layer: entities and hierarchy rules
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod clipboard;
pub mod entities;
pub mod envelope;
pub mod error;
pub mod history;

pub use clipboard::{ClipMode, Clipboard, ClipboardIntent};
pub use entities::*;
pub use envelope::CipherEnvelope;
pub use error::DomainError;
pub use history::{NodeHistory, DEFAULT_HISTORY_DEPTH};
