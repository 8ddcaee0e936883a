//! Synedrius-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across synedrius:
//!
//! - **Typed IDs**: Type-safe UUID wrappers for users, teams, sessions and codes
//! - **Path Utilities**: Media type checks and upload filename sanitization
//! - **Error Handling**: Common error type with HTTP status mapping
//!
//! # Examples
//!
//! ```
//! use synedrius_common::{Error, Result, TeamId};
//! use synedrius_common::paths::{is_image_media_type, sanitize_filename};
//!
//! let team_id = TeamId::new();
//! assert!(!team_id.to_string().is_empty());
//!
//! assert!(is_image_media_type("image/png"));
//! assert_eq!(sanitize_filename("my logo.png"), "my_logo.png");
//!
//! fn example() -> Result<()> {
//!     Err(Error::not_found("team", "abc"))
//! }
//! assert_eq!(example().unwrap_err().http_status(), 404);
//! ```

pub mod error;
pub mod ids;
pub mod paths;

pub use error::{Error, Result};
pub use ids::*;
