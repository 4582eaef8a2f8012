//! Resource addressing
//!
//! A [`ResourceId`] names the thing a permission rule talks about. It is
//! derived from the request's prefix and filename and nothing else.

use crate::error::ProxyResult;

use std::fmt;

/// Joins the prefix and the filename of a resource identifier.
pub const SEPARATOR: char = '/';

/// A canonical resource identifier: `prefix/filename`, or `prefix` alone
/// when the filename is empty.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(String);

impl ResourceId {
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Combines `prefix` and `filename` into a [`ResourceId`].
///
/// Neither part may contain [`SEPARATOR`], which keeps the mapping
/// injective: two different `(prefix, filename)` pairs never produce the
/// same identifier.
///
/// # Errors
/// Returns `InvalidAddress` if the prefix is empty or either part contains
/// the separator.
///
/// # Examples
/// ```
/// # use source_proxy::resource::address;
/// assert_eq!(address("tenant-a", "file.csv").unwrap().as_str(), "tenant-a/file.csv");
/// assert_eq!(address("tenant-a", "").unwrap().as_str(), "tenant-a");
/// assert!(address("", "file.csv").is_err());
/// ```
pub fn address(prefix: &str, filename: &str) -> ProxyResult<ResourceId> {
    if prefix.is_empty() {
        return Err(proxy_error!(InvalidAddress, "prefix is required"));
    }
    if prefix.contains(SEPARATOR) {
        return Err(proxy_error!(InvalidAddress, "prefix <{prefix}> contains {SEPARATOR:?}"));
    }
    if filename.contains(SEPARATOR) {
        return Err(proxy_error!(InvalidAddress, "filename <{filename}> contains {SEPARATOR:?}"));
    }

    if filename.is_empty() {
        return Ok(ResourceId(prefix.to_owned()));
    }

    let mut id = String::with_capacity(prefix.len() + 1 + filename.len());
    id.push_str(prefix);
    id.push(SEPARATOR);
    id.push_str(filename);
    Ok(ResourceId(id))
}
