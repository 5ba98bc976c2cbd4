//! In-process event broadcaster.
//!
//! Fan-out hub for pipeline progress events, designed to be shared via
//! `Arc<EventBroadcaster>`. Subscribers join a per-video room and receive
//! that video's events in publish order; a separate global channel carries
//! tenant-wide notifications such as upload completion.

pub mod broadcaster;

pub use broadcaster::EventBroadcaster;
