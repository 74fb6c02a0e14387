//! Turning whatever the user typed into something we can probe.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static SCHEME_AND_HOST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://([^/]+)").expect("the regex is valid")
});

/// A website address after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedTarget {
    /// The `https://` URL built by [`normalize()`].
    pub canonical_url: String,
    /// The lowercase hostname, used as the cache key.
    pub hostname: String,
}

impl NormalizedTarget {
    /// Normalize some raw user input.
    pub fn from_raw(raw_url: &str) -> Self {
        let canonical_url = normalize(raw_url);
        let hostname = extract_hostname(&canonical_url);

        NormalizedTarget {
            canonical_url,
            hostname,
        }
    }

    /// Create a [`NormalizedTarget`] from parts which are already normalized.
    pub fn new<U, H>(canonical_url: U, hostname: H) -> Self
    where
        U: Into<String>,
        H: Into<String>,
    {
        NormalizedTarget {
            canonical_url: canonical_url.into(),
            hostname: hostname.into(),
        }
    }

    /// Parse the [`NormalizedTarget::canonical_url`].
    pub fn url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.canonical_url)
    }
}

/// Canonicalize a raw address into an absolute `https://` URL.
///
/// Surrounding whitespace, case, a leading `http://` or `https://`, and a
/// single trailing slash are all discarded before `https://` is put back on.
///
/// # Examples
///
/// ```rust
/// use favicon_resolver::normalize;
///
/// assert_eq!(normalize("HTTP://Example.com/"), "https://example.com");
/// assert_eq!(normalize("  example.com "), "https://example.com");
/// ```
pub fn normalize(raw_url: &str) -> String {
    let lowered = raw_url.trim().to_lowercase();

    let without_scheme = lowered
        .strip_prefix("http://")
        .or_else(|| lowered.strip_prefix("https://"))
        .unwrap_or(&lowered);
    let without_slash =
        without_scheme.strip_suffix('/').unwrap_or(without_scheme);

    format!("https://{}", without_slash)
}

/// Get the hostname out of a URL produced by [`normalize()`].
///
/// This never fails. If the URL can't be parsed we fall back to grabbing
/// everything between the scheme and the next `/`, and if *that* doesn't work
/// the input is handed back untouched.
pub fn extract_hostname(canonical_url: &str) -> String {
    if let Some(host) = Url::parse(canonical_url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_lowercase))
    {
        return host;
    }

    log::debug!(
        "Unable to parse \"{}\" as a URL, falling back to a regex",
        canonical_url
    );

    match SCHEME_AND_HOST.captures(canonical_url) {
        Some(caps) => caps[1].to_lowercase(),
        None => canonical_url.to_string(),
    }
}

/// Would this input be accepted as a website address?
///
/// Inputs without an `http` prefix are checked as if they started with
/// `https://`.
pub fn is_valid_url(raw_url: &str) -> bool {
    let raw_url = raw_url.trim();

    if raw_url.is_empty() {
        return false;
    }

    if raw_url.starts_with("http") {
        Url::parse(raw_url).is_ok()
    } else {
        Url::parse(&format!("https://{}", raw_url)).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalizing_strips_scheme_case_and_trailing_slash() {
        let inputs = vec![
            ("HTTP://Example.com/", "https://example.com"),
            ("example.com", "https://example.com"),
            ("https://example.com", "https://example.com"),
            ("  https://GitHub.com/rust-lang/  ", "https://github.com/rust-lang"),
            ("http://localhost:8080", "https://localhost:8080"),
        ];

        for (input, should_be) in inputs {
            assert_eq!(normalize(input), should_be, "{:?}", input);
        }
    }

    #[test]
    fn only_one_trailing_slash_is_removed() {
        assert_eq!(normalize("example.com//"), "https://example.com/");
    }

    #[test]
    fn hostnames_come_from_the_url_parser() {
        assert_eq!(extract_hostname("https://example.com"), "example.com");
        assert_eq!(
            extract_hostname("https://docs.rs/reqwest/latest"),
            "docs.rs"
        );
        assert_eq!(extract_hostname("https://localhost:8080"), "localhost");
    }

    #[test]
    fn unparseable_urls_fall_back_to_the_regex() {
        // a space in the host is rejected by the URL parser
        assert_eq!(
            extract_hostname("https://exa mple.com/path"),
            "exa mple.com"
        );
    }

    #[test]
    fn hopeless_input_is_passed_through() {
        assert_eq!(extract_hostname("not a url"), "not a url");
        assert_eq!(extract_hostname(""), "");
    }

    #[test]
    fn targets_built_from_raw_input() {
        let got = NormalizedTarget::from_raw("HTTPS://www.Rust-Lang.org/");

        assert_eq!(
            got,
            NormalizedTarget::new("https://www.rust-lang.org", "www.rust-lang.org")
        );
    }

    #[test]
    fn detect_valid_urls() {
        assert!(is_valid_url("example.com"));
        assert!(is_valid_url("http://example.com/foo"));
        assert!(!is_valid_url("   "));
        assert!(!is_valid_url("http://"));
    }
}
