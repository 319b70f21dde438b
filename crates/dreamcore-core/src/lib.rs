//! DreamCore Core - data model, collaborator exchange types, and error handling

pub mod error;
pub mod protocol;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use protocol::*;
pub use types::*;
