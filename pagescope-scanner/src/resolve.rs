use crate::error::{Result, ScanError};
use url::Url;

/// Resolve an `href` found on the page at `base` into an absolute URL.
///
/// Empty hrefs, a bare `#` and `javascript:` links are not navigable and are
/// reported as [`ScanError::NotNavigable`]. Callers treat every error from
/// this function as "skip the link".
pub fn resolve_href(base: &Url, href: &str) -> Result<Url> {
    let href = href.trim();

    if href.is_empty() || href == "#" || is_script_href(href) {
        return Err(ScanError::NotNavigable(href.to_string()));
    }

    match Url::parse(href) {
        Ok(absolute) => Ok(absolute),
        Err(url::ParseError::RelativeUrlWithoutBase) => base
            .join(href)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", href, e))),
        Err(e) => Err(ScanError::InvalidUrl(format!("{}: {}", href, e))),
    }
}

/// The text a link is recorded under: an absolute href exactly as written,
/// anything else as its resolved URL.
pub fn link_text(href: &str, resolved: &Url) -> String {
    let href = href.trim();
    if Url::parse(href).is_ok() {
        href.to_string()
    } else {
        resolved.to_string()
    }
}

fn is_script_href(href: &str) -> bool {
    href.get(..11)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("javascript:"))
}
