//! CORS origin allowlist
//!
//! Every configuration source is split into raw tokens and each token is
//! normalized to `scheme://host[:port]`. Tokens that do not survive
//! normalization are skipped, so a typo shrinks the allowlist instead of
//! widening it or failing startup.

use std::collections::BTreeSet;

use url::Url;

/// Origins allowed regardless of configuration (local development servers).
pub const DEV_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:5173",
    "http://localhost:8000",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:5173",
    "http://127.0.0.1:8000",
];

pub const CORS_ORIGINS: &str = "CORS_ORIGINS";
pub const AUTHORIZED_PARTIES: &str = "CLERK_AUTHORIZED_PARTIES";
pub const APP_URL: &str = "APP_URL";
pub const VITE_APP_URL: &str = "VITE_APP_URL";
pub const VERCEL_URL: &str = "VERCEL_URL";

/// A normalized, deduplicated set of allowed origins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OriginAllowlist {
    origins: BTreeSet<String>,
}

impl OriginAllowlist {
    /// Build the allowlist from a configuration lookup.
    ///
    /// `lookup` maps a key such as `CORS_ORIGINS` to its value, if set.
    pub fn build<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut candidates: Vec<String> = DEV_ORIGINS.iter().map(|o| o.to_string()).collect();

        for key in [CORS_ORIGINS, AUTHORIZED_PARTIES] {
            if let Some(value) = lookup(key) {
                candidates.extend(value.split(',').map(str::to_string));
            }
        }

        for key in [APP_URL, VITE_APP_URL] {
            if let Some(value) = lookup(key) {
                candidates.push(value);
            }
        }

        if let Some(host) = lookup(VERCEL_URL) {
            let host = host.trim();
            if !host.is_empty() {
                candidates.push(format!("https://{}", strip_scheme(host)));
            }
        }

        let mut origins = BTreeSet::new();
        for candidate in &candidates {
            match normalize_origin(candidate) {
                Some(origin) => {
                    origins.insert(origin);
                }
                None if !candidate.trim().is_empty() => {
                    tracing::warn!(token = %candidate.trim(), "Dropping invalid CORS origin");
                }
                None => {}
            }
        }

        Self { origins }
    }

    /// Build the allowlist from the process environment.
    pub fn from_env() -> Self {
        Self::build(|key| std::env::var(key).ok())
    }

    /// Exact membership test against normalized origins.
    pub fn contains(&self, origin: &str) -> bool {
        self.origins.contains(origin)
    }

    /// Whether a browser-supplied `Origin` value is allowed.
    pub fn allows(&self, origin: &str) -> bool {
        normalize_origin(origin).is_some_and(|o| self.origins.contains(&o))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.origins.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }
}

/// Normalize a raw token to `scheme://host[:port]`.
///
/// Returns `None` for empty tokens, unparseable URLs and schemes other
/// than `http`/`https`. Schemeless tokens are treated as `https`.
pub fn normalize_origin(raw: &str) -> Option<String> {
    let token = raw.trim();
    if token.is_empty() {
        return None;
    }

    let candidate = if has_scheme(token) || token.starts_with("//") {
        token.to_string()
    } else {
        format!("https://{token}")
    };

    let url = Url::parse(&candidate).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    let host = url.host_str()?;
    match url.port() {
        Some(port) => Some(format!("{}://{}:{}", url.scheme(), host, port)),
        None => Some(format!("{}://{}", url.scheme(), host)),
    }
}

/// `<alpha>[alnum+.-]*://` prefix check.
fn has_scheme(token: &str) -> bool {
    let Some((scheme, _)) = token.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
}

fn strip_scheme(host: &str) -> &str {
    if has_scheme(host) {
        host.split_once("://").map_or(host, |(_, rest)| rest)
    } else {
        host
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn build(pairs: &[(&str, &str)]) -> OriginAllowlist {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        OriginAllowlist::build(|key| env.get(key).cloned())
    }

    #[test]
    fn test_empty_config_has_dev_origins() {
        let allowlist = build(&[]);

        assert_eq!(allowlist.len(), DEV_ORIGINS.len());
        for origin in DEV_ORIGINS {
            assert!(allowlist.contains(origin), "missing {origin}");
        }
    }

    #[test]
    fn test_app_url_trailing_slash_removed() {
        let allowlist = build(&[(APP_URL, "https://notes.example.com/")]);

        assert!(allowlist.contains("https://notes.example.com"));
        assert!(!allowlist.contains("https://notes.example.com/"));
    }

    #[test]
    fn test_duplicates_across_keys_collapse() {
        let allowlist = build(&[
            (CORS_ORIGINS, "https://notes.example.com, HTTPS://Notes.Example.com/app"),
            (AUTHORIZED_PARTIES, "notes.example.com"),
            (APP_URL, "https://notes.example.com/"),
            (VITE_APP_URL, "https://notes.example.com:443"),
        ]);

        let matching: Vec<&str> = allowlist
            .iter()
            .filter(|o| o.contains("notes.example.com"))
            .collect();
        assert_eq!(matching, vec!["https://notes.example.com"]);
        assert_eq!(allowlist.len(), DEV_ORIGINS.len() + 1);
    }

    #[test]
    fn test_unsupported_scheme_is_dropped() {
        let allowlist = build(&[(CORS_ORIGINS, "ftp://host,javascript:alert(1),ws://socket.example")]);

        assert_eq!(allowlist.len(), DEV_ORIGINS.len());
        assert!(!allowlist.contains("ftp://host"));
        assert!(!allowlist.contains("https://ftp"));
        assert!(!allowlist.contains("ws://socket.example"));
    }

    #[test]
    fn test_empty_and_malformed_tokens_skipped() {
        let allowlist = build(&[(CORS_ORIGINS, " , ,https://,http://[::1,https://ok.example ")]);

        assert!(allowlist.contains("https://ok.example"));
        assert_eq!(allowlist.len(), DEV_ORIGINS.len() + 1);
    }

    #[test]
    fn test_vercel_url_gets_https() {
        let allowlist = build(&[(VERCEL_URL, "notes-git-main.vercel.app")]);
        assert!(allowlist.contains("https://notes-git-main.vercel.app"));

        let allowlist = build(&[(VERCEL_URL, "http://preview.vercel.app/")]);
        assert!(allowlist.contains("https://preview.vercel.app"));
        assert!(!allowlist.contains("http://preview.vercel.app"));
    }

    #[test]
    fn test_normalize_keeps_explicit_port_and_http() {
        assert_eq!(
            normalize_origin("http://staging.example.com:8443/path?q=1#frag").as_deref(),
            Some("http://staging.example.com:8443")
        );
        assert_eq!(
            normalize_origin("localhost:5173").as_deref(),
            Some("https://localhost:5173")
        );
        assert_eq!(normalize_origin("//cdn.example.com"), None);
        assert_eq!(normalize_origin("   "), None);
    }

    #[test]
    fn test_allows_normalizes_header_value() {
        let allowlist = build(&[(APP_URL, "https://notes.example.com")]);

        assert!(allowlist.allows("https://notes.example.com"));
        assert!(allowlist.allows("HTTPS://NOTES.EXAMPLE.COM"));
        assert!(allowlist.allows("http://localhost:5173"));
        assert!(!allowlist.allows("https://evil.example.com"));
        assert!(!allowlist.allows("null"));
    }
}
