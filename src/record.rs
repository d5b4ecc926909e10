//! The versions table row.
//!
//! A [`VersionRecord`] holds what is known about one release: its tag, the
//! runtime that built it and the day it was cut. Every field is optional
//! because each source (release metadata, the binary's own banner, embedded
//! build info) only knows part of the picture. Records from different
//! sources are combined with [`VersionRecord::merge`].

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionRecord {
    /// Release tag, e.g. `v1.23.1`
    pub version: Option<String>,
    /// Build runtime, e.g. `go1.19.5`
    pub runtime: Option<String>,
    /// Release date as `YYYY-MM-DD`
    pub date: Option<String>,
}

impl VersionRecord {
    /// Empty strings become `None`.
    pub fn new(
        version: impl Into<String>,
        runtime: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self {
            version: non_empty(version.into()),
            runtime: non_empty(runtime.into()),
            date: non_empty(date.into()),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.version.is_some() && self.runtime.is_some() && self.date.is_some()
    }

    /// Combine two partial records field by field.
    ///
    /// A populated field in `self` is kept; an empty one is filled from
    /// `other`. Conflicting values are not detected: `self` wins.
    pub fn merge(self, other: VersionRecord) -> VersionRecord {
        VersionRecord {
            version: self.version.or(other.version),
            runtime: self.runtime.or(other.runtime),
            date: self.date.or(other.date),
        }
    }

    pub fn version_str(&self) -> &str {
        self.version.as_deref().unwrap_or("")
    }

    pub fn runtime_str(&self) -> &str {
        self.runtime.as_deref().unwrap_or("")
    }

    pub fn date_str(&self) -> &str {
        self.date.as_deref().unwrap_or("")
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}
