//! Core types for parley
//!
//! This crate provides the session store, transcript persistence,
//! configuration loading and logging setup shared by the CLI and the
//! HTTP server.

pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod transcript;
pub mod utils;

pub use error::{Error, Result};
