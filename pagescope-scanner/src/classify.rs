use crate::resolve::{link_text, resolve_href};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkKind {
    Internal,
    External,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLink {
    pub url: Url,
    /// How the link is reported, see [`link_text`].
    pub text: String,
    pub kind: LinkKind,
}

/// Resolved links of one page with their per-kind tallies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedLinks {
    pub links: Vec<ClassifiedLink>,
    pub internal: u32,
    pub external: u32,
}

impl ClassifiedLinks {
    pub fn total(&self) -> usize {
        self.links.len()
    }

    pub fn urls(&self) -> impl Iterator<Item = &Url> {
        self.links.iter().map(|link| &link.url)
    }
}

/// A link is internal when it has no host or shares the page's host and port.
pub fn link_kind(base: &Url, link: &Url) -> LinkKind {
    match link.host_str() {
        None | Some("") => LinkKind::Internal,
        Some(host)
            if base.host_str().is_some_and(|b| b.eq_ignore_ascii_case(host))
                && base.port_or_known_default() == link.port_or_known_default() =>
        {
            LinkKind::Internal
        }
        Some(_) => LinkKind::External,
    }
}

/// Resolve and classify every href. Unresolvable hrefs are dropped; repeated
/// hrefs are counted once per occurrence.
pub fn classify_links<S: AsRef<str>>(base: &Url, hrefs: &[S]) -> ClassifiedLinks {
    let mut classified = ClassifiedLinks::default();

    for href in hrefs {
        let href = href.as_ref();
        let url = match resolve_href(base, href) {
            Ok(url) => url,
            Err(e) => {
                debug!("Skipping link {:?}: {}", href, e);
                continue;
            }
        };

        let kind = link_kind(base, &url);
        match kind {
            LinkKind::Internal => classified.internal += 1,
            LinkKind::External => classified.external += 1,
        }
        classified.links.push(ClassifiedLink {
            text: link_text(href, &url),
            url,
            kind,
        });
    }

    classified
}
