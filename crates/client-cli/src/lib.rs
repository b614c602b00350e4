//! Client library for the taskdeck todo + AI-suggestion service.
//!
//! Everything here is a thin, typed layer over the remote HTTP API: a
//! transport with timeout and one-shot session-refresh retry (`http`),
//! shared session state with guards (`session`), a keyed query/mutation
//! cache (`cache`) with per-resource wrappers (`todos`, `providers`,
//! `admin`, `ai`), and the AI-suggestion dismissal overlay plus its
//! visibility-aware poller (`suggestions`, `poller`).

pub mod admin;
pub mod ai;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod notify;
pub mod poller;
pub mod providers;
pub mod session;
pub mod suggestions;
pub mod todos;

pub use client::ApiClient;
pub use error::ApiError;
