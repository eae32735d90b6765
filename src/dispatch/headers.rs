//! Header propagation rules.

use std::collections::HashSet;

use reqwest::header::{HeaderMap, HeaderName};

use crate::config::PassthroughConfig;

/// Decides which response headers travel to the next hop.
///
/// A header passes when its lowercased name is listed exactly or starts with
/// one of the listed prefixes.
#[derive(Debug, Clone)]
pub struct PassthroughPolicy {
    names: HashSet<String>,
    prefixes: Vec<String>,
}

impl PassthroughPolicy {
    pub fn new<N, P>(names: N, prefixes: P) -> Self
    where
        N: IntoIterator,
        N::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|n| n.as_ref().to_ascii_lowercase())
                .collect(),
            prefixes: prefixes
                .into_iter()
                .map(|p| p.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &PassthroughConfig) -> Self {
        Self::new(&config.headers, &config.prefixes)
    }

    pub fn allows(&self, name: &HeaderName) -> bool {
        // HeaderName is always lowercase.
        let name = name.as_str();
        self.names.contains(name) || self.prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }

    /// Copy the allowed headers, all values included.
    pub fn filter(&self, headers: &HeaderMap) -> HeaderMap {
        let mut out = HeaderMap::new();
        for (name, value) in headers {
            if self.allows(name) {
                out.append(name.clone(), value.clone());
            }
        }
        out
    }
}

impl Default for PassthroughPolicy {
    fn default() -> Self {
        Self::from_config(&PassthroughConfig::default())
    }
}

/// Apply `additional` on top of `headers`.
///
/// Every name present in `additional` replaces all values of that name.
pub fn apply_additional(headers: &mut HeaderMap, additional: &HeaderMap) {
    for name in additional.keys() {
        headers.remove(name);
        for value in additional.get_all(name) {
            headers.append(name.clone(), value.clone());
        }
    }
}
