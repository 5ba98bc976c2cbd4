//! File-backed metadata repository.
//!
//! Video records are JSON documents, one file per video, written atomically
//! via temp-file-and-rename. [`VideoRepository`] layers tenant scoping and
//! named partial updates over the raw [`DocumentStore`].

pub mod document_store;
pub mod error;
pub mod repos;

pub use document_store::DocumentStore;
pub use error::{RepoError, RepoResult};
pub use repos::{VideoQuery, VideoRepository};
