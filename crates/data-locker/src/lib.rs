//! Data Locker
//!
//! `data-locker` is a [tower] middleware for object storage proxies which prevents data from
//! being changed by accident. It reads a `data-locker` metadata entry from the account and the
//! container a request targets, and answers `403 Forbidden` to any method that entry locks.
//!
//! The lock is not a security boundary. Anyone with the proper credentials can clear the
//! metadata entry and then modify or delete the data. It only protects against mistakes.
//!
//! # Directives
//!
//! The metadata value is a comma-separated list of directives:
//!
//! | directive | blocked methods |
//! |-----------|-----------------|
//! | `create`  | `POST`, `PUT`   |
//! | `delete`  | `DELETE`        |
//!
//! Directives set on the account and on the container are combined. An empty value, or no
//! entry at all, means unlocked. Unknown directives are ignored.
//!
//! # Architecture
//!
//! The gate sits after authentication and before the storage backend:
//!
//! 1. Methods that can never be locked (`GET`, `HEAD`, ...) pass through untouched.
//! 2. Requests which do not target an object pass through (see [`config::LockScope`]).
//! 3. Account and container metadata are fetched from a [`MetadataProvider`].
//! 4. The blocked method set is resolved and the request is either forwarded or forbidden.
//!
//! # Example
//!
//! ```
//! use data_locker::{DataLockerLayer, StaticMetadata};
//! use data_locker::info::CapabilityRegistry;
//!
//! let mut metadata = StaticMetadata::new();
//! metadata.set_container_meta("AUTH_test", "photos", "data-locker", "delete");
//!
//! let mut registry = CapabilityRegistry::new();
//! let layer = DataLockerLayer::new(metadata);
//! layer.register(&mut registry);
//!
//! assert!(registry.is_registered("data_locker"));
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(
    clippy::bool_assert_comparison,  // I don't like `assert!(!expression)`. It's very misleading.
    clippy::multiple_crate_versions, // Sometimes not fixable
    clippy::module_name_repetitions,
)]

mod error;

pub mod config;
pub mod directive;
pub mod info;
pub mod locker;
pub mod metadata;
pub mod path;
pub mod service;

pub use self::directive::{Directive, DirectiveSet, LockedMethod, MethodSet};
pub use self::error::*;
pub use self::locker::{LockerContext, META_DATA_LOCKER, MetadataProvider, resolve_blocked_methods};
pub use self::metadata::{ScopeInfo, StaticMetadata, meta_value};
pub use self::service::{DataLocker, DataLockerBuilder, DataLockerLayer, Verdict, filter_factory};

/// The feature name announced on the discovery endpoint.
pub const FEATURE_NAME: &str = "data_locker";
