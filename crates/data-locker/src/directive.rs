//! Lock directives and the methods they block
//!
//! A locker specification such as `"create, delete"` is parsed into a [`DirectiveSet`].
//! Each [`Directive`] maps to a fixed set of [`LockedMethod`]s:
//!
//! ```
//! use data_locker::directive::{parse_directives, LockedMethod};
//!
//! let blocked = parse_directives("Create, frobnicate").blocked_methods();
//! assert!(blocked.contains(LockedMethod::Put));
//! assert!(blocked.contains(LockedMethod::Post));
//! assert!(!blocked.contains(LockedMethod::Delete));
//! ```

use std::fmt;

use http::Method;

/// A lock directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    /// Blocks `POST` and `PUT`.
    Create,
    /// Blocks `DELETE`.
    Delete,
}

impl Directive {
    pub const ALL: [Self; 2] = [Self::Create, Self::Delete];

    /// Parses a single directive token.
    ///
    /// Surrounding whitespace is ignored and the comparison is case-insensitive.
    /// Returns `None` for anything outside the vocabulary.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        Self::ALL.into_iter().find(|d| token.eq_ignore_ascii_case(d.as_str()))
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Delete => "delete",
        }
    }

    /// Returns the methods blocked by this directive.
    #[must_use]
    pub const fn blocked_methods(self) -> MethodSet {
        match self {
            Self::Create => MethodSet::EMPTY.with(LockedMethod::Post).with(LockedMethod::Put),
            Self::Delete => MethodSet::EMPTY.with(LockedMethod::Delete),
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Self::Create => 1 << 0,
            Self::Delete => 1 << 1,
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a locker specification into the set of directives it names.
///
/// The specification is split on `,`. Unknown and empty tokens are skipped, so this never
/// fails: `""` and `"frobnicate"` both yield an empty set.
#[must_use]
pub fn parse_directives(spec: &str) -> DirectiveSet {
    spec.split(',').filter_map(Directive::from_token).collect()
}

/// A set of [`Directive`]s.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DirectiveSet(u8);

impl DirectiveSet {
    pub const EMPTY: Self = Self(0);

    #[must_use]
    pub const fn contains(self, directive: Directive) -> bool {
        self.0 & directive.bit() != 0
    }

    pub fn insert(&mut self, directive: Directive) {
        self.0 |= directive.bit();
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Directive> {
        Directive::ALL.into_iter().filter(move |&d| self.contains(d))
    }

    /// Returns the union of the methods blocked by every directive in the set.
    #[must_use]
    pub fn blocked_methods(self) -> MethodSet {
        self.iter().fold(MethodSet::EMPTY, |acc, d| acc.union(d.blocked_methods()))
    }
}

impl FromIterator<Directive> for DirectiveSet {
    fn from_iter<I: IntoIterator<Item = Directive>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for directive in iter {
            set.insert(directive);
        }
        set
    }
}

impl fmt::Debug for DirectiveSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// A method which a directive is able to block.
///
/// Every other method, `GET` and `HEAD` included, is never blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockedMethod {
    Delete,
    Post,
    Put,
}

impl LockedMethod {
    pub const ALL: [Self; 3] = [Self::Delete, Self::Post, Self::Put];

    /// Maps a request method onto the lockable methods, ignoring ASCII case.
    #[must_use]
    pub fn from_method(method: &Method) -> Option<Self> {
        let name = method.as_str();
        Self::ALL.into_iter().find(|m| name.eq_ignore_ascii_case(m.as_str()))
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Delete => "DELETE",
            Self::Post => "POST",
            Self::Put => "PUT",
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Self::Delete => 1 << 0,
            Self::Post => 1 << 1,
            Self::Put => 1 << 2,
        }
    }
}

impl fmt::Display for LockedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of methods blocked for a request.
///
/// It can only hold [`LockedMethod`]s, so it is always a subset of `{DELETE, POST, PUT}`.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MethodSet(u8);

impl MethodSet {
    pub const EMPTY: Self = Self(0);

    #[must_use]
    pub const fn with(self, method: LockedMethod) -> Self {
        Self(self.0 | method.bit())
    }

    pub fn insert(&mut self, method: LockedMethod) {
        self.0 |= method.bit();
    }

    #[must_use]
    pub const fn contains(self, method: LockedMethod) -> bool {
        self.0 & method.bit() != 0
    }

    /// Checks a request method against the set, ignoring ASCII case.
    #[must_use]
    pub fn contains_method(self, method: &Method) -> bool {
        LockedMethod::from_method(method).is_some_and(|m| self.contains(m))
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = LockedMethod> {
        LockedMethod::ALL.into_iter().filter(move |&m| self.contains(m))
    }
}

impl FromIterator<LockedMethod> for MethodSet {
    fn from_iter<I: IntoIterator<Item = LockedMethod>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for method in iter {
            set.insert(method);
        }
        set
    }
}

impl fmt::Debug for MethodSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
