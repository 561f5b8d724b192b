//! Sprintdesk library
//!
//! Issue-board core shared by the `sd` binary and the test utilities:
//! creation with duplicate detection, the status lifecycle, filtered
//! listing, and the stores issues are kept in.

pub mod action_generator;
pub mod config;
pub mod duplicate;
pub mod error;
pub mod format;
pub mod lifecycle;
pub mod lock;
pub mod query;
pub mod service;
pub mod storage;
pub mod store;
pub mod types;
