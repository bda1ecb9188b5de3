//! Route classification
//!
//! Decides whether a request path needs a verified credential. Public
//! routes are listed explicitly; everything else, including paths that are
//! malformed, is protected. A small set of private prefixes always wins over
//! the public list.

/// Public entries used when `PUBLIC_PATHS` is not configured.
pub const DEFAULT_PUBLIC_PATHS: &[&str] = &[
    "/",
    "/health",
    "/docs",
    "/api/public-notes",
    "/htmx/notes",
];

/// Prefixes that are protected even when a public entry would cover them.
pub const PRIVATE_PREFIXES: &[&str] = &["/htmx/private-notes"];

/// A validated public path entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicPath(String);

impl PublicPath {
    /// Validate a configured entry.
    ///
    /// Returns `None` for entries that are empty, lack a leading `/` or use
    /// wildcard characters. A trailing slash is removed except for the root.
    pub fn parse(raw: &str) -> Option<Self> {
        let entry = raw.trim();
        if !entry.starts_with('/') || entry.contains('*') {
            return None;
        }

        let entry = match entry.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        Some(Self(entry.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact match, or a sub-path of a non-root entry.
    pub fn matches(&self, path: &str) -> bool {
        if path == self.0 {
            return true;
        }
        if self.0 == "/" {
            return false;
        }
        path.strip_prefix(self.0.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

/// Maps request paths to a protection verdict.
#[derive(Debug, Clone)]
pub struct RouteClassifier {
    private_prefixes: Vec<String>,
    public: Vec<PublicPath>,
}

impl Default for RouteClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_PUBLIC_PATHS.iter().copied())
    }
}

impl RouteClassifier {
    /// Build a classifier from raw public entries, using the built-in
    /// private prefixes. Invalid entries are dropped with a warning.
    pub fn new<'a>(public_paths: impl IntoIterator<Item = &'a str>) -> Self {
        let public = public_paths
            .into_iter()
            .filter_map(|raw| {
                let parsed = PublicPath::parse(raw);
                if parsed.is_none() {
                    tracing::warn!(entry = %raw, "Ignoring invalid public path entry");
                }
                parsed
            })
            .collect();

        Self {
            private_prefixes: PRIVATE_PREFIXES.iter().map(|p| p.to_string()).collect(),
            public,
        }
    }

    pub fn public_paths(&self) -> &[PublicPath] {
        &self.public
    }

    /// `true` when the path requires authentication.
    pub fn is_protected(&self, path: &str) -> bool {
        if self
            .private_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
        {
            return true;
        }

        !self.public.iter().any(|entry| entry.matches(path))
    }
}

/// Classify a path against the default public entries.
pub fn is_protected(path: &str) -> bool {
    RouteClassifier::default().is_protected(path)
}
