//! Versioned resource paths
//!
//! Object storage proxies address resources as `/{version}/{account}/{container}/{object}`,
//! where the container and object parts are optional and the object part may itself
//! contain slashes.

/// A parsed resource path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath {
    account: String,
    container: Option<String>,
    object: Option<String>,
}

/// An error which can be returned when parsing a resource path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParsePathError {
    #[error("path does not start with a slash")]
    MissingLeadingSlash,
    #[error("path has fewer than two segments")]
    TooFewSegments,
    #[error("path has an empty version or account segment")]
    EmptySegment,
    #[error("path is not valid percent-encoded UTF-8")]
    InvalidEncoding,
}

impl ResourcePath {
    /// Parses a request path.
    ///
    /// At least a version and an account are required. Everything after the container
    /// segment belongs to the object. Empty container or object segments count as absent,
    /// so `/v1/a/c/` is a container path.
    ///
    /// # Errors
    /// Returns [`ParsePathError`] if the path has no leading slash, fewer than two segments,
    /// or an empty version or account.
    pub fn parse(path: &str) -> Result<Self, ParsePathError> {
        let rest = path.strip_prefix('/').ok_or(ParsePathError::MissingLeadingSlash)?;

        let mut iter = rest.splitn(4, '/');
        let (Some(version), Some(account)) = (iter.next(), iter.next()) else {
            return Err(ParsePathError::TooFewSegments);
        };
        if version.is_empty() || account.is_empty() {
            return Err(ParsePathError::EmptySegment);
        }

        // `/v1/a/c/` and `/v1/a//o` are not object paths: an empty segment is absent here,
        // matching how a proxy routes them, rather than an empty name that still gets checked.
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_owned());
        let container = iter.next().and_then(non_empty);
        let object = match container {
            Some(_) => iter.next().and_then(non_empty),
            None => None,
        };

        Ok(Self {
            account: account.to_owned(),
            container,
            object,
        })
    }

    /// Parses a request path as it appears in a URI, percent-decoding it first.
    ///
    /// An encoded `/` (`%2F`) separates segments just like a literal one, since the storage
    /// backend sees the decoded path.
    ///
    /// # Errors
    /// Returns [`ParsePathError::InvalidEncoding`] if the decoded path is not UTF-8, or any
    /// error of [`ResourcePath::parse`].
    pub fn parse_encoded(path: &str) -> Result<Self, ParsePathError> {
        let decoded = urlencoding::decode(path).map_err(|_| ParsePathError::InvalidEncoding)?;
        Self::parse(&decoded)
    }

    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }

    #[must_use]
    pub fn container(&self) -> Option<&str> {
        self.container.as_deref()
    }

    #[must_use]
    pub fn object(&self) -> Option<&str> {
        self.object.as_deref()
    }

    /// Returns `true` if the path names an object inside a container.
    #[must_use]
    pub fn is_object(&self) -> bool {
        self.container.is_some() && self.object.is_some()
    }
}

/// Returns `true` if the URI path `path` addresses an object.
///
/// Paths which fail to decode or parse are not object paths.
#[must_use]
pub fn is_object_request(path: &str) -> bool {
    ResourcePath::parse_encoded(path).is_ok_and(|p| p.is_object())
}
