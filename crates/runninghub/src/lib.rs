//! RunningHub client library.
//!
//! Provides the HTTP adapter for the RunningHub proxy endpoints,
//! normalization of their inconsistent response shapes, the
//! upload/submit pipeline, the polling engine, per-session job
//! tracking and result presentation.

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod messages;
pub mod poller;
pub mod presenter;
pub mod session;
pub mod submitter;
