//! Adaptive image compression for uploads.
//!
//! Resolves a named preset or partial override into a compression config,
//! scales the image to fit, then lowers encode quality step by step until the
//! output fits a byte budget or reaches the configured quality floor. Every
//! encoded output is a tracked resource that callers release explicitly.

pub mod app;
pub mod backend;
pub mod compression;
pub mod config;
pub mod error;
pub mod resource;

pub use error::{Error, Result};
