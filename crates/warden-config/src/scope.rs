//! Route-scope inheritance.
//!
//! Scopes form a tree: the server at the root, locations below it. Each
//! scope may set a rule set or leave it unset. Resolution walks from the
//! root down, and every scope that leaves the value unset takes its
//! parent's resolved value. Nothing set anywhere resolves to the empty rule
//! set, which disables inspection.
//!
//! Request paths are normalized before they are matched against location
//! prefixes, the way the host does before it selects a location:
//! percent-escapes are decoded once, `.` segments and empty segments are
//! dropped, and `..` removes the previous segment.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use warden_core::RouteConfig;

use crate::error::{ConfigError, ConfigResult};
use crate::schema::RouteSettings;

/// The directive value of one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeConfig {
    /// Rule set, `None` when this scope does not set one.
    pub rules: Option<String>,
}

impl ScopeConfig {
    /// A scope that sets `rules`.
    pub fn set(rules: impl Into<String>) -> Self {
        Self {
            rules: Some(rules.into()),
        }
    }

    /// A scope that inherits.
    pub const fn unset() -> Self {
        Self { rules: None }
    }

    /// Resolves this scope against its parent's resolved value.
    pub fn merge(&self, parent: &RouteConfig) -> RouteConfig {
        match &self.rules {
            Some(rules) => RouteConfig::new(rules.as_str()),
            None => parent.clone(),
        }
    }
}

/// Index of a scope within its [`ScopeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

#[derive(Debug, Clone)]
struct ScopeNode {
    prefix: String,
    config: ScopeConfig,
    parent: Option<ScopeId>,
    resolved: RouteConfig,
}

/// A tree of scopes with resolved values.
///
/// Values are resolved when a scope is added, so lookups never walk the
/// tree.
#[derive(Debug, Clone)]
pub struct ScopeTree {
    nodes: Vec<ScopeNode>,
}

impl ScopeTree {
    /// The server scope.
    pub const ROOT: ScopeId = ScopeId(0);

    /// Creates a tree with only the server scope.
    pub fn new(root: ScopeConfig) -> Self {
        let resolved = root.merge(&RouteConfig::disabled());
        Self {
            nodes: vec![ScopeNode {
                prefix: String::new(),
                config: root,
                parent: None,
                resolved,
            }],
        }
    }

    /// Adds a location below `parent`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if `parent` is not in this tree.
    pub fn add(
        &mut self,
        parent: ScopeId,
        prefix: impl Into<String>,
        config: ScopeConfig,
    ) -> ConfigResult<ScopeId> {
        let Some(parent_node) = self.nodes.get(parent.0) else {
            return Err(ConfigError::invalid_value(
                "routes.locations",
                format!("unknown parent scope {}", parent.0),
            ));
        };
        let resolved = config.merge(&parent_node.resolved);
        self.nodes.push(ScopeNode {
            prefix: prefix.into(),
            config,
            parent: Some(parent),
            resolved,
        });
        Ok(ScopeId(self.nodes.len() - 1))
    }

    /// Builds the tree for a `[routes]` section.
    ///
    /// Each location's parent is the longest other location whose prefix is
    /// a prefix of its own.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a prefix that does not start
    /// with `/` or appears twice.
    pub fn from_settings(settings: &RouteSettings) -> ConfigResult<Self> {
        let mut tree = Self::new(ScopeConfig {
            rules: settings.rules.clone(),
        });

        let mut locations: Vec<_> = settings.locations.iter().collect();
        locations.sort_by_key(|l| l.prefix.len());

        for location in locations {
            if !location.prefix.starts_with('/') {
                return Err(ConfigError::invalid_value(
                    "routes.locations.prefix",
                    format!("'{}' must start with '/'", location.prefix),
                ));
            }
            if tree.find(&location.prefix).is_some() {
                return Err(ConfigError::invalid_value(
                    "routes.locations.prefix",
                    format!("'{}' is declared twice", location.prefix),
                ));
            }
            let parent = tree.longest_match(location.prefix.as_bytes());
            tree.add(
                parent,
                location.prefix.as_str(),
                ScopeConfig {
                    rules: location.rules.clone(),
                },
            )?;
        }
        Ok(tree)
    }

    /// Returns the resolved rule set of a scope.
    pub fn resolve(&self, id: ScopeId) -> Option<&RouteConfig> {
        self.nodes.get(id.0).map(|n| &n.resolved)
    }

    /// Returns the directive value of a scope as written.
    pub fn config(&self, id: ScopeId) -> Option<&ScopeConfig> {
        self.nodes.get(id.0).map(|n| &n.config)
    }

    /// Returns the parent of a scope.
    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    /// Finds the location declared with exactly `prefix`.
    pub fn find(&self, prefix: &str) -> Option<ScopeId> {
        self.nodes
            .iter()
            .skip(1)
            .position(|n| n.prefix == prefix)
            .map(|i| ScopeId(i + 1))
    }

    /// Returns the rule set for a request path: the location with the
    /// longest prefix matching the normalized path, or the server scope.
    ///
    /// Returns `None` when the path cannot be normalized; see
    /// [`normalize_path`].
    pub fn route_for(&self, path: &str) -> Option<&RouteConfig> {
        let path = normalize_path(path)?;
        self.resolve(self.longest_match(&path))
    }

    /// Number of scopes, the server scope included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the server scope exists.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn longest_match(&self, path: &[u8]) -> ScopeId {
        self.nodes
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, n)| path.starts_with(n.prefix.as_bytes()))
            .max_by_key(|(_, n)| n.prefix.len())
            .map_or(Self::ROOT, |(i, _)| ScopeId(i))
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new(ScopeConfig::unset())
    }
}

/// Normalizes a request path for location matching.
///
/// Returns `None` for a path that does not start with `/`, contains an
/// encoded NUL, or climbs above the root. A trailing slash, or a trailing
/// `.`/`..` segment, leaves the result ending in `/`.
///
/// ```
/// use warden_config::normalize_path;
///
/// assert_eq!(normalize_path("/static/../admin//users").as_deref(), Some(&b"/admin/users"[..]));
/// assert_eq!(normalize_path("/%2e%2e/etc"), None);
/// ```
pub fn normalize_path(path: &str) -> Option<Vec<u8>> {
    if !path.starts_with('/') {
        return None;
    }
    let decoded: Cow<'_, [u8]> = urlencoding::decode_binary(path.as_bytes());
    if decoded.contains(&0) {
        return None;
    }

    let mut segments: Vec<&[u8]> = Vec::new();
    let mut trailing = false;
    for segment in decoded.split(|&b| b == b'/') {
        trailing = matches!(segment, b"" | b"." | b"..");
        match segment {
            b"" | b"." => {}
            b".." => {
                segments.pop()?;
            }
            segment => segments.push(segment),
        }
    }

    let mut normalized = Vec::with_capacity(decoded.len());
    for segment in &segments {
        normalized.push(b'/');
        normalized.extend_from_slice(segment);
    }
    if segments.is_empty() || trailing {
        normalized.push(b'/');
    }
    Some(normalized)
}
