//! Local media store.
//!
//! Owns the on-disk layout for uploaded videos and their derived artifacts
//! (thumbnails, sampled frames) under a single configurable root.

pub mod error;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use store::{move_file, MediaStore, VIDEO_EXTENSIONS};
