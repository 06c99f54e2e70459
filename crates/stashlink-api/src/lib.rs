//! Stashlink API Library
//!
//! HTTP surface of the upload pipeline: session gate, upload tokens, chunk
//! and finish endpoints, the scratch sweep and the file manager.

mod api_doc;
pub mod constants;
mod handlers;
mod telemetry;

pub mod auth;
pub mod error;
pub mod services;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
