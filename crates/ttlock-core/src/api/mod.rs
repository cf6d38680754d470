//! REST API client module for the TTLock Open Platform.
//!
//! This module provides the `TtlockClient` for lock, passcode and eKey
//! operations, and the error taxonomy shared with the token endpoint.
//!
//! Every response carries an `errcode`; non-zero codes surface as
//! `ApiError::Api` with a named `ErrorCode`.

pub mod client;
pub mod error;
pub mod pagination;
pub(crate) mod response;

pub use client::TtlockClient;
pub use error::{is_error_code, ApiError, ErrorCode};
pub use pagination::{Page, DEFAULT_PAGE_SIZE};
