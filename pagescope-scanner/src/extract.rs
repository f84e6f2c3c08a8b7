// Markup feature extraction: doctype, title, headings, login heuristics, hrefs

use crate::result::{HeadingProfile, HtmlVersion};
use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;

static DOCTYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<!DOCTYPE\s+html[^>]*>").unwrap());

static LOGIN_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(login|sign in|signin)").unwrap());

/// Features pulled from one parsed page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageFeatures {
    pub title: String,
    pub html_version: HtmlVersion,
    pub headings: HeadingProfile,
    pub has_login_form: bool,
    /// `href` values of every anchor, document order, duplicates kept.
    pub hrefs: Vec<String>,
}

/// Parse `raw` once and run every extractor against the tree.
///
/// Steps run in a fixed order on the fully parsed document. The returned
/// value owns all of its data so the tree can be dropped before the caller
/// awaits anything.
pub fn extract_features(raw: &str) -> PageFeatures {
    let document = Html::parse_document(raw);

    let html_version = detect_html_version(raw);
    let title = extract_title(&document);
    let headings = count_headings(&document);
    let has_login_form = detect_login_form(raw, &document);
    let hrefs = collect_hrefs(&document);

    PageFeatures {
        title,
        html_version,
        headings,
        has_login_form,
        hrefs,
    }
}

/// Classify the first `<!DOCTYPE html ...>` declaration in the raw markup.
pub fn detect_html_version(raw: &str) -> HtmlVersion {
    let Some(found) = DOCTYPE_RE.find(raw) else {
        return HtmlVersion::Unknown;
    };
    let doctype = found.as_str();

    if doctype.contains("HTML 4.01") {
        HtmlVersion::Html401
    } else if doctype.contains("XHTML 1.0") {
        HtmlVersion::Xhtml10
    } else if doctype.contains("XHTML 1.1") {
        HtmlVersion::Xhtml11
    } else if !doctype.to_ascii_uppercase().contains("DTD") {
        HtmlVersion::Html5
    } else {
        HtmlVersion::Unknown
    }
}

/// Text of the first `<title>` element, or an empty string.
pub fn extract_title(document: &Html) -> String {
    document
        .root_element()
        .descendants()
        .filter_map(scraper::ElementRef::wrap)
        .find(|el| el.value().name() == "title")
        .and_then(|title| {
            title
                .children()
                .find_map(|child| child.value().as_text().map(|t| String::from(&**t)))
        })
        .unwrap_or_default()
}

pub fn count_headings(document: &Html) -> HeadingProfile {
    let mut profile = HeadingProfile::default();
    for node in document.root_element().descendants() {
        if let Some(element) = node.value().as_element() {
            profile.record(element.name());
        }
    }
    profile
}

/// Free-text signal: the raw markup mentions logging in anywhere.
pub fn mentions_login(raw: &str) -> bool {
    LOGIN_TEXT_RE.is_match(raw)
}

/// Structural signal: at least one `<input type="password">`.
pub fn has_password_input(document: &Html) -> bool {
    document.root_element().descendants().any(|node| {
        node.value()
            .as_element()
            .is_some_and(|el| el.name() == "input" && el.attr("type") == Some("password"))
    })
}

/// Heuristic only; nav links and footers mentioning "login" also count.
pub fn detect_login_form(raw: &str, document: &Html) -> bool {
    mentions_login(raw) || has_password_input(document)
}

pub fn collect_hrefs(document: &Html) -> Vec<String> {
    document
        .root_element()
        .descendants()
        .filter_map(|node| node.value().as_element())
        .filter(|el| el.name() == "a")
        .filter_map(|el| el.attr("href"))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html5_doctype() {
        assert_eq!(
            detect_html_version("<!DOCTYPE html><html></html>"),
            HtmlVersion::Html5
        );
        assert_eq!(
            detect_html_version("<!doctype html>\n<html></html>"),
            HtmlVersion::Html5
        );
    }

    #[test]
    fn test_html401_doctype() {
        let raw = r#"<!DOCTYPE HTML PUBLIC "-//W3C//DTD HTML 4.01//EN" "http://www.w3.org/TR/html4/strict.dtd">"#;
        assert_eq!(detect_html_version(raw), HtmlVersion::Html401);
    }

    #[test]
    fn test_xhtml_doctypes() {
        let xhtml10 = r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Strict//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd">"#;
        let xhtml11 = r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.1//EN" "http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd">"#;
        assert_eq!(detect_html_version(xhtml10), HtmlVersion::Xhtml10);
        assert_eq!(detect_html_version(xhtml11), HtmlVersion::Xhtml11);
    }

    #[test]
    fn test_unknown_doctype() {
        assert_eq!(
            detect_html_version("<html><body>no doctype</body></html>"),
            HtmlVersion::Unknown
        );
        let html32 = r#"<!DOCTYPE html PUBLIC "-//W3C//DTD HTML 3.2 Final//EN">"#;
        assert_eq!(detect_html_version(html32), HtmlVersion::Unknown);
    }

    #[test]
    fn test_only_first_doctype_counts() {
        let raw = r#"<!DOCTYPE html><p>docs</p><pre><!DOCTYPE html PUBLIC "-//W3C//DTD HTML 4.01//EN"></pre>"#;
        assert_eq!(detect_html_version(raw), HtmlVersion::Html5);
    }

    #[test]
    fn test_title_extraction() {
        let doc = Html::parse_document(
            "<html><head><title>First</title></head><body><svg><title>Second</title></svg></body></html>",
        );
        assert_eq!(extract_title(&doc), "First");
    }

    #[test]
    fn test_missing_title_is_empty() {
        let doc = Html::parse_document("<html><body><h1>Hi</h1></body></html>");
        assert_eq!(extract_title(&doc), "");
    }

    #[test]
    fn test_heading_counts() {
        let doc = Html::parse_document(
            "<h1>a</h1><h2>b</h2><h2>c</h2><div><h3>d</h3><section><h6>e</h6></section></div>",
        );
        let profile = count_headings(&doc);
        assert_eq!(profile.as_array(), [1, 2, 1, 0, 0, 1]);
        assert_eq!(profile.total(), 5);
    }

    #[test]
    fn test_password_input_without_login_text() {
        let raw = r#"<form><input type="text" name="user"><input type="password" name="pw"></form>"#;
        let doc = Html::parse_document(raw);
        assert!(!mentions_login(raw));
        assert!(has_password_input(&doc));
        assert!(detect_login_form(raw, &doc));
    }

    #[test]
    fn test_login_text_without_password_input() {
        let raw = r#"<nav><a href="/account">Sign In</a></nav>"#;
        let doc = Html::parse_document(raw);
        assert!(mentions_login(raw));
        assert!(!has_password_input(&doc));
        assert!(detect_login_form(raw, &doc));
    }

    #[test]
    fn test_no_login_signals() {
        let raw = r#"<form><input type="search" name="q"></form><p>Welcome</p>"#;
        let doc = Html::parse_document(raw);
        assert!(!detect_login_form(raw, &doc));
    }

    #[test]
    fn test_hrefs_keep_order_and_duplicates() {
        let doc = Html::parse_document(
            r#"<a href="/about">A</a><a>no href</a><a href="https://other.com">O</a><a href="/about">A</a>"#,
        );
        assert_eq!(
            collect_hrefs(&doc),
            vec!["/about", "https://other.com", "/about"]
        );
    }

    #[test]
    fn test_extract_features_combines_all_steps() {
        let raw = r#"<!DOCTYPE html>
            <html><head><title>Example</title></head>
            <body>
              <h1>Welcome</h1>
              <a href="/about">About</a>
              <a href="/about">About again</a>
              <a href="https://other.com">Other</a>
              <form><input type="password"></form>
            </body></html>"#;

        let features = extract_features(raw);
        assert_eq!(features.title, "Example");
        assert_eq!(features.html_version, HtmlVersion::Html5);
        assert_eq!(features.headings.h1, 1);
        assert!(features.has_login_form);
        assert_eq!(features.hrefs.len(), 3);
    }
}
