//! Pod client error types.

use thiserror::Error;

pub type LdpResult<T> = Result<T, LdpError>;

#[derive(Debug, Error)]
pub enum LdpError {
    #[error("remote write failed: {method} {url} returned HTTP {status}")]
    Write {
        method: &'static str,
        url: String,
        status: u16,
    },

    #[error("remote read failed: {method} {url} returned HTTP {status}")]
    Read {
        method: &'static str,
        url: String,
        status: u16,
    },

    #[error("invalid container listing at {url}: {reason}")]
    Listing { url: String, reason: String },

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),
}
