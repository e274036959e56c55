use thiserror::Error;

use crate::base_system::cooldown_retry::Transient;

#[derive(Debug, Error)]
pub enum ResolveError {
    /// 状态码异常、页面缺表单等，可重试
    #[error("transient failure: {reason}")]
    Transient { reason: String },
    #[error("max retries exceeded for {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: Box<ResolveError>,
    },
    #[error("no redirect target after the challenge chain for {url}")]
    ResolutionExhausted { url: String },
    #[error("challenge solver failed: {0}")]
    Challenge(String),
    #[error("invalid link {0}")]
    InvalidUrl(String),
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ResolveError {
    pub fn transient(reason: impl Into<String>) -> Self {
        ResolveError::Transient {
            reason: reason.into(),
        }
    }
}

impl Transient for ResolveError {
    fn is_transient(&self) -> bool {
        match self {
            ResolveError::Transient { .. } => true,
            // connection resets / timeouts behave like a bad status code
            ResolveError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}
