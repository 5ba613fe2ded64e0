//! Maps a requested language name onto a runtime from the catalog.

use crate::model::Runtime;

/// A catalog entry selected for a requested language.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedRuntime {
    requested: String,
    language: String,
    version: String,
}

impl ResolvedRuntime {
    /// Returns the requested name after normalization (lowercased).
    #[must_use]
    pub fn requested(&self) -> &str {
        &self.requested
    }

    /// Returns the canonical language of the matched catalog entry.
    #[must_use]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Returns the version of the matched catalog entry.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }
}

/// Finds the runtime to use for `requested`.
///
/// Only the request is lowercased; catalog values are compared as received.
/// Entries without a version are skipped. In a single pass over the catalog
/// the first exact `language` match wins; failing that, the first entry whose
/// aliases contain the request is used. Returns `None` when nothing matches.
#[must_use]
pub fn resolve(requested: &str, catalog: &[Runtime]) -> Option<ResolvedRuntime> {
    let requested = requested.to_lowercase();
    let mut by_alias: Option<(&Runtime, &str)> = None;

    for runtime in catalog {
        let Some(version) = runtime.version() else {
            continue;
        };

        if !runtime.language().is_empty() && runtime.language() == requested {
            return Some(ResolvedRuntime {
                language: runtime.language().to_owned(),
                version: version.to_owned(),
                requested,
            });
        }

        if by_alias.is_none() && runtime.aliases().iter().any(|alias| *alias == requested) {
            by_alias = Some((runtime, version));
        }
    }

    by_alias.map(|(runtime, version)| ResolvedRuntime {
        language: runtime.language().to_owned(),
        version: version.to_owned(),
        requested,
    })
}
