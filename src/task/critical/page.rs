//! Page inspection and rewriting.

use rustc_hash::FxHashSet;

use crate::utils::html::{attribute, parse_attributes};

/// Marker attribute on the injected `<style>`; pages carrying it are skipped.
pub const MARKER: &str = "data-runnel-critical";

/// Tags, classes and ids that occur in a page.
#[derive(Debug, Default)]
pub struct UsedSelectors {
    tags: FxHashSet<String>,
    classes: FxHashSet<String>,
    ids: FxHashSet<String>,
}

impl UsedSelectors {
    pub fn from_html(html: &str) -> Self {
        let mut used = Self::default();
        // Implied by every document even when the markup omits them
        for tag in ["html", "head", "body"] {
            used.tags.insert(tag.to_string());
        }

        let Ok(dom) = tl::parse(html, tl::ParserOptions::default()) else {
            return used;
        };

        for node in dom.nodes() {
            let Some(tag) = node.as_tag() else {
                continue;
            };
            used.tags
                .insert(tag.name().as_utf8_str().to_ascii_lowercase());

            let attrs = tag.attributes();
            if let Some(Some(class)) = attrs.get("class") {
                used.classes.extend(
                    class
                        .as_utf8_str()
                        .split_ascii_whitespace()
                        .map(str::to_string),
                );
            }
            if let Some(Some(id)) = attrs.get("id") {
                used.ids.insert(id.as_utf8_str().trim().to_string());
            }
        }
        used
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.ids.contains(id)
    }
}

/// Inline `critical` before `</head>` and make links to `deferred`
/// stylesheets load without blocking render.
///
/// Returns `None` when the page has no `</head>`.
pub fn inject(html: &str, critical: &str, deferred: &[String]) -> Option<String> {
    let head_end = find_ci(html, "</head>")?;
    let head = rewrite_links(&html[..head_end], deferred);

    let mut out = String::with_capacity(html.len() + critical.len() + 64);
    out.push_str(&head);
    if !critical.is_empty() {
        out.push_str(&format!("<style {MARKER}>{critical}</style>"));
    }
    out.push_str(&html[head_end..]);
    Some(out)
}

/// Rewrite `<link rel="stylesheet">` tags pointing at `deferred` hrefs.
fn rewrite_links(head: &str, deferred: &[String]) -> String {
    let mut out = String::with_capacity(head.len());
    let mut rest = head;

    while let Some(start) = find_ci(rest, "<link") {
        let Some(len) = rest[start..].find('>') else {
            break;
        };
        let end = start + len + 1;
        let tag = &rest[start..end];
        out.push_str(&rest[..start]);

        let inner = tag[5..tag.len() - 1].trim_end_matches('/');
        let attrs = parse_attributes(inner);
        let is_stylesheet = attribute(&attrs, "rel")
            .is_some_and(|rel| rel.eq_ignore_ascii_case("stylesheet"));
        let href = attribute(&attrs, "href").unwrap_or_default();
        let is_deferred = attribute(&attrs, "media").is_none()
            && deferred.iter().any(|d| *d == normalize_href(href));

        if is_stylesheet && is_deferred {
            out.push_str(&format!(
                r#"<link rel="stylesheet" href="{href}" media="print" onload="this.media='all'"><noscript><link rel="stylesheet" href="{href}"></noscript>"#
            ));
        } else {
            out.push_str(tag);
        }
        rest = &rest[end..];
    }
    out.push_str(rest);
    out
}

/// `/css/index.css?v=2` and `./css/index.css` both become `css/index.css`.
pub fn normalize_href(href: &str) -> String {
    let href = href.split(['?', '#']).next().unwrap_or_default();
    href.trim_start_matches("./").trim_start_matches('/').to_string()
}

fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_lowercase().find(needle)
}
