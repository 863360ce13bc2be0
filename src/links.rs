use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static URL_SHAPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(https?://)?(www\.)?([a-z0-9_-]+\.)+[a-z]{2,}(:\d+)?(/.*)?$").unwrap()
});

/// Check whether `link` looks like a URL the API will accept as a link target.
///
/// The scheme is optional; a bare host such as `example.com` is treated as
/// `http://example.com`.
pub fn is_valid_url(link: &str) -> bool {
    if !URL_SHAPE_RE.is_match(link) {
        return false;
    }

    let candidate: Cow<str> = if link.starts_with("http://") || link.starts_with("https://") {
        Cow::Borrowed(link)
    } else {
        Cow::Owned(format!("http://{link}"))
    };

    match Url::parse(&candidate) {
        Ok(parsed) => {
            !parsed.scheme().is_empty() && parsed.host_str().is_some_and(|host| !host.is_empty())
        }
        Err(_) => false,
    }
}

/// Percent-decode a link target for display, keeping the raw text when it
/// does not decode to UTF-8.
pub fn decode_target(target: &str) -> Cow<'_, str> {
    urlencoding::decode(target).unwrap_or(Cow::Borrowed(target))
}
