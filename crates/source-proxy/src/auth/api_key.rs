use std::fmt;

use zeroize::Zeroize;

/// A caller-supplied API key.
///
/// The key is opaque to the proxy. Only [`last_four`](Self::last_four) is
/// meant for logs; `Debug` never prints more than that, and the memory is
/// zeroed on drop.
pub struct ApiKey(String);

impl ApiKey {
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the last four characters, or the whole key if it is shorter.
    #[must_use]
    pub fn last_four(&self) -> &str {
        let start = self.0.char_indices().rev().nth(3).map_or(0, |(i, _)| i);
        &self.0[start..]
    }
}

impl From<String> for ApiKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ApiKey {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl Drop for ApiKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey(..{})", self.last_four())
    }
}
