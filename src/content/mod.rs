//! Content Module
//!
//! The data every other subsystem exchanges: content types, find kinds, the
//! `ContentUnit` answered by workers and saved by users, plus the document
//! store seam and the user-content endpoints built on it.
//!
//! ## Endpoints
//! - `GET /api/v1/{type}/get`, `GET /api/v1/get`: list the caller's saved units.
//! - `POST /api/v1/{type}/add`: save an answer the caller received earlier.
//! - `POST /api/v1/{type}/edit`: change stars and comment of a saved unit.
//! - `POST /api/v1/{type}/remove`: delete a saved unit.
//!
//! Every endpoint resolves the caller's session first.

pub mod handlers;
pub mod protocol;
pub mod store;
pub mod types;
