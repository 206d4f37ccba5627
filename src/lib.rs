//! # docvault
//!
//! Client-side session lifecycle for the docvault document manager: token
//! decoding, durable session storage, guarded navigation, an authenticated
//! API client that reacts to backend rejections, and a periodic expiry
//! check. The OCR backend gets its own credential-free client.

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod guard;
pub mod router;
pub mod routes;
pub mod session;
pub mod storage;
pub mod token;
pub mod validator;

#[cfg(test)]
pub(crate) mod test_helpers;
