//! Stream key identification and path parsing

use serde::Serialize;

/// Opaque credential identifying a logical stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct StreamKey(String);

impl StreamKey {
    /// Create a stream key from a raw token
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Extract the stream key from a publish/play path
    ///
    /// Only paths of the form `/live/<key>` are accepted. Anything after a
    /// `?` is treated as connection arguments and ignored. Non-matching
    /// paths yield `None` and no key is extracted.
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.split('?').next().unwrap_or(path);
        let key = path.strip_prefix("/live/")?;

        if key.is_empty() || key.contains('/') {
            return None;
        }

        Some(Self(key.to_string()))
    }

    /// Get the raw key token
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StreamKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
