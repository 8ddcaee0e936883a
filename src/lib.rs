//! Synedrius - team management server
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod login;
pub mod mail;
pub mod server;
pub mod uploads;
