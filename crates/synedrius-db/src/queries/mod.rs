//! Database query modules.
//!
//! This module organizes all database operations into logical groups:
//! - users: account lookup by id and email
//! - login_codes: one-time login codes with expiry
//! - sessions: server-side browser sessions
//! - teams: team records, logos and membership
//! - stored_images: uploaded logo files and their uploaders

pub mod login_codes;
pub mod sessions;
pub mod stored_images;
pub mod teams;
pub mod users;
