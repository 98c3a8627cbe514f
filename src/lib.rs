//! Signed, tamper-evident feature-flag cookies.
//!
//! A small, versioned set of named boolean/enum flags is encoded into a single
//! signed cookie value and decoded back with safe defaulting: a missing cookie, bad
//! signature, malformed payload, unknown key, or mistyped value all degrade to the
//! schema default for the affected flags, never to an error.
//!
//! The crate has two entry points:
//!
//! - [`FlagSessionCodec`], a pure encode/decode pair over an immutable
//!   [`FlagSchema`], for callers that already have the raw `Cookie` header or a
//!   parsed cookie mapping in hand.
//! - [`FlagSessionManagerLayer`], a `tower` middleware that decodes the flag cookie
//!   into a [`FlagSession`] request extension and writes staged changes back out.
//!
//! The schema, signing key, and cookie config are constructed explicitly and passed
//! in; the crate reads no ambient environment. Rotating the signing key invalidates
//! all outstanding cookies, which then decode to defaults.
//!
//! # Security
//! The default format is a signed cookie (`signed` feature), HMAC'd over the
//! canonical payload and verified in constant time.
//!
//! The `dangerous-plaintext` feature enables a plaintext controller. This offers
//! **no tamper resistance** and should only be used for **testing and debugging**.
//! Never enable or use this in a real application: a client can trivially edit the
//! cookie to flip preview/admin flags.

mod config;
mod controller;
mod error;
pub mod format;
pub mod layer;
mod schema;
mod session;

pub use tower_cookies::cookie::SameSite;

#[cfg(feature = "signed")]
pub use tower_cookies::Key;

pub use crate::config::FlagCookieConfig;
pub use crate::controller::CookieController;
pub use crate::error::Error;
pub use crate::layer::FlagSessionManagerLayer;
pub use crate::schema::{FlagKind, FlagSchema, FlagSchemaBuilder, FlagValue, SessionConfigFlags};
pub use crate::session::{FlagSession, FlagSessionCodec};

#[cfg(feature = "signed")]
pub use crate::controller::SignedCookie;

#[cfg(feature = "dangerous-plaintext")]
pub use crate::controller::DangerousPlaintextCookie;
