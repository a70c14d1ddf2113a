//! Filesystem readers for the project updater.
//!
//! Every path handed to a [`FileSystem`] is relative to the backend root and
//! is validated (see [`validate_path`]) before it touches the disk.

pub mod backend;
pub mod error;
pub mod file;
mod path;

pub use crate::backend::FileSystem;
pub use crate::file::FileInfo;
pub use crate::path::{split as split_path, validate as validate_path};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn FileSystem + Send + Sync>;
