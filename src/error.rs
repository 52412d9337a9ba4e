use thiserror::Error;

/// Per-product extraction failures. Always local: the offending row is
/// skipped and the rest of the page continues.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("malformed price {raw:?}: {reason}")]
    MalformedPrice { raw: String, reason: String },

    #[error("product block missing required field `{field}`")]
    MissingField { field: &'static str },
}

/// A page fetch that gave up. Under the partial-success policy this fails
/// one page; it fails the whole category only when page 1 is unreachable.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("GET {url} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: String,
    },

    #[error("GET {url} cancelled")]
    Cancelled { url: String },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            Self::RetriesExhausted { url, .. } | Self::Cancelled { url } => url,
        }
    }
}
