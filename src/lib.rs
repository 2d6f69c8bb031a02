//! Query resolution and audio candidate matching - shared modules for the binary.

pub mod catalog;
pub mod config;
pub mod error;
pub mod formatter;
pub mod manifest;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod providers;
pub mod query;
pub mod scoring;
