//! Newtype wrappers for manifest identifiers.
//!
//! All newtypes serialize/deserialize as plain strings so they round-trip
//! through `zarf.yaml` unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

string_newtype!(
    /// Name of a component, unique within one manifest.
    ComponentName
);

string_newtype!(
    /// Container image reference as written in a manifest, e.g.
    /// `ghcr.io/org/app:1.2.3` or `nginx@sha256:...`.
    ImageRef
);

/// Docker Hub hosts that an image resolves to when no registry is given.
const DEFAULT_REGISTRY_HOSTS: &[&str] = &[
    "docker.io",
    "index.docker.io",
    "registry-1.docker.io",
    "registry.hub.docker.com",
];

const DIGEST_SEPARATOR: &str = "@sha256:";

impl ComponentName {
    /// Lowercase, no whitespace.
    pub fn follows_convention(&self) -> bool {
        !self.0.chars().any(char::is_whitespace) && self.0.to_lowercase() == self.0
    }
}

impl ImageRef {
    /// Template or package-variable placeholders are resolved at deploy time
    /// and cannot be judged here.
    pub fn is_template_placeholder(&self) -> bool {
        let s = self.0.trim();
        s.starts_with("{{") || s.starts_with("${") || s.contains("###ZARF_")
    }

    pub fn is_digest_pinned(&self) -> bool {
        self.0.contains(DIGEST_SEPARATOR)
    }

    /// A reference carrying a tag separator without a digest.
    pub fn is_unpinned(&self) -> bool {
        !self.0.is_empty()
            && self.0.contains(':')
            && !self.is_digest_pinned()
            && !self.is_template_placeholder()
    }

    /// Registry host of the reference, if one is written explicitly.
    ///
    /// The first path segment only counts as a host when it looks like one
    /// (contains `.` or `:`, or is `localhost`), matching how container
    /// runtimes disambiguate `org/app` from `registry.example.com/app`.
    pub fn registry_host(&self) -> Option<&str> {
        let (first, _) = self.0.split_once('/')?;
        if first == "localhost" || first.contains('.') || first.contains(':') {
            Some(first)
        } else {
            None
        }
    }

    /// True when the image would be pulled from the public default registry.
    pub fn uses_default_registry(&self) -> bool {
        match self.registry_host() {
            None => true,
            Some(host) => DEFAULT_REGISTRY_HOSTS.contains(&host),
        }
    }
}
