use crate::config::{HtmlHandling, NotFoundHandling};

/// Stage C/D/E outcome (spec §4.8). `NoIntent` is the `not-found-handling:
/// none` sentinel — distinct from [`Intent::NotFound`] — used by the
/// router's `canFetch` to decide whether server code should take over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Asset { served_path: String, etag: String, status: u16 },
    Redirect { to: String, status: u16 },
    NoIntent,
    NotFound,
}

/// A manifest lookup: pathname -> content hash hex (the ETag), or `None` if
/// absent. Injected as a closure so the pure resolution logic below is
/// testable without a real blob store or binary manifest.
pub trait Lookup {
    fn lookup(&self, path: &str) -> Option<String>;
}

impl<F: Fn(&str) -> Option<String>> Lookup for F {
    fn lookup(&self, path: &str) -> Option<String> {
        self(path)
    }
}

/// Stage C + D + E combined: resolve `path` to an asset, a redirect, or a
/// not-found fallback.
pub fn resolve(lookup: &impl Lookup, html: HtmlHandling, not_found: NotFoundHandling, path: &str) -> Intent {
    if let Some(intent) = resolve_html_handling(lookup, html, path) {
        return intent;
    }
    resolve_not_found(lookup, not_found, path)
}

fn asset(served_path: impl Into<String>, etag: String) -> Intent {
    Intent::Asset { served_path: served_path.into(), etag, status: 200 }
}

/// Stage C, plus the stage-D safety check inline: a redirect candidate is
/// only emitted once we've confirmed the destination resolves to the exact
/// asset we matched at the source (same ETag), guarding against dangling
/// redirects if the variant-resolution logic and the manifest ever drift.
fn resolve_html_handling(lookup: &impl Lookup, html: HtmlHandling, path: &str) -> Option<Intent> {
    match html {
        HtmlHandling::None => lookup.lookup(path).map(|etag| asset(path, etag)),
        HtmlHandling::AutoTrailingSlash => {
            if let Some(etag) = lookup.lookup(path) {
                return Some(asset(path, etag));
            }
            if let Some(stripped) = path.strip_suffix('/') {
                let index = format!("{path}index.html");
                if let Some(etag) = lookup.lookup(&index) {
                    return Some(asset(index, etag));
                }
                let bare_html = format!("{stripped}.html");
                if lookup.lookup(&bare_html).is_some() {
                    return safe_redirect(lookup, html, stripped, &bare_html);
                }
                let bare_index = format!("{stripped}/index");
                if lookup.lookup(&bare_index).is_some() {
                    return safe_redirect(lookup, html, path, &bare_index);
                }
            } else {
                let html_variant = format!("{path}.html");
                if let Some(etag) = lookup.lookup(&html_variant) {
                    return Some(asset(html_variant, etag));
                }
                let dir_index = format!("{path}/index.html");
                if lookup.lookup(&dir_index).is_some() {
                    let target = format!("{path}/");
                    return safe_redirect(lookup, html, &target, &dir_index);
                }
                let bare_index = format!("{path}/index");
                if lookup.lookup(&bare_index).is_some() {
                    let target = format!("{path}/");
                    return safe_redirect(lookup, html, &target, &bare_index);
                }
            }
            None
        }
        HtmlHandling::ForceTrailingSlash => {
            if let Some(stripped) = path.strip_suffix('/') {
                let index = format!("{path}index.html");
                lookup.lookup(&index).map(|etag| asset(index, etag)).or_else(|| {
                    let _ = stripped;
                    None
                })
            } else {
                let index = format!("{path}/index.html");
                if lookup.lookup(&index).is_some() {
                    let target = format!("{path}/");
                    safe_redirect(lookup, html, &target, &index)
                } else {
                    None
                }
            }
        }
        HtmlHandling::DropTrailingSlash => {
            if let Some(stripped) = path.strip_suffix('/') {
                let html_variant = format!("{stripped}.html");
                if lookup.lookup(&html_variant).is_some() {
                    safe_redirect(lookup, html, stripped, &html_variant)
                } else {
                    None
                }
            } else {
                let html_variant = format!("{path}.html");
                lookup.lookup(&html_variant).map(|etag| asset(html_variant, etag))
            }
        }
    }
}

/// Re-resolve `target` (the candidate redirect destination) through the
/// same html-handling function and only emit the redirect if it lands on
/// `served_path`'s exact binary (same ETag) — the stage-D safety check.
fn safe_redirect(lookup: &impl Lookup, html: HtmlHandling, target: &str, served_path: &str) -> Option<Intent> {
    let expected_etag = lookup.lookup(served_path)?;
    match resolve_html_handling(lookup, html, target) {
        Some(Intent::Asset { etag, .. }) if etag == expected_etag => {
            Some(Intent::Redirect { to: target.to_string(), status: 307 })
        }
        _ => None,
    }
}

/// Stage E — not-found handling.
fn resolve_not_found(lookup: &impl Lookup, not_found: NotFoundHandling, path: &str) -> Intent {
    match not_found {
        NotFoundHandling::None => Intent::NoIntent,
        NotFoundHandling::SinglePageApplication => lookup
            .lookup("/index.html")
            .map(|etag| Intent::Asset { served_path: "/index.html".to_string(), etag, status: 200 })
            .unwrap_or(Intent::NotFound),
        NotFoundHandling::NotFoundPage => {
            for dir in parent_dirs(path) {
                let candidate = format!("{dir}404.html");
                if let Some(etag) = lookup.lookup(&candidate) {
                    return Intent::Asset { served_path: candidate, etag, status: 404 };
                }
            }
            Intent::NotFound
        }
    }
}

/// Yields `path`'s ancestor directories (trailing-slash form), innermost
/// first, down to `/`.
fn parent_dirs(path: &str) -> impl Iterator<Item = String> + '_ {
    let mut dirs = Vec::new();
    let trimmed = path.trim_end_matches('/');
    let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();
    for i in (0..=segments.len()).rev() {
        dirs.push(format!("/{}/", segments[..i].join("/")).replace("//", "/"));
    }
    dirs.into_iter()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(entries: &[(&str, &str)]) -> impl Lookup {
        let map: HashMap<String, String> =
            entries.iter().map(|(p, h)| ((*p).to_string(), (*h).to_string())).collect();
        move |path: &str| map.get(path).cloned()
    }

    #[test]
    fn none_mode_requires_exact_match() {
        let lookup = lookup_from(&[("/a.txt", "hash-a")]);
        assert_eq!(resolve(&lookup, HtmlHandling::None, NotFoundHandling::None, "/a.txt"), asset("/a.txt", "hash-a".into()));
        assert_eq!(resolve(&lookup, HtmlHandling::None, NotFoundHandling::None, "/missing"), Intent::NoIntent);
    }

    #[test]
    fn auto_trailing_slash_serves_index_at_directory() {
        let lookup = lookup_from(&[("/foo/index.html", "hash-foo")]);
        let intent = resolve(&lookup, HtmlHandling::AutoTrailingSlash, NotFoundHandling::None, "/foo/");
        assert_eq!(intent, asset("/foo/index.html", "hash-foo".into()));
    }

    #[test]
    fn auto_trailing_slash_redirects_bare_to_slash_when_safe() {
        let lookup = lookup_from(&[("/foo/index.html", "hash-foo")]);
        let intent = resolve(&lookup, HtmlHandling::AutoTrailingSlash, NotFoundHandling::None, "/foo");
        assert_eq!(intent, Intent::Redirect { to: "/foo/".to_string(), status: 307 });
    }

    #[test]
    fn single_page_application_fallback_serves_index() {
        let lookup = lookup_from(&[("/index.html", "hash-root")]);
        let intent = resolve(&lookup, HtmlHandling::None, NotFoundHandling::SinglePageApplication, "/nope");
        assert_eq!(intent, Intent::Asset { served_path: "/index.html".to_string(), etag: "hash-root".to_string(), status: 200 });
    }

    #[test]
    fn not_found_page_walks_parent_directories() {
        let lookup = lookup_from(&[("/404.html", "hash-404")]);
        let intent = resolve(&lookup, HtmlHandling::None, NotFoundHandling::NotFoundPage, "/a/b/c");
        assert_eq!(intent, Intent::Asset { served_path: "/404.html".to_string(), etag: "hash-404".to_string(), status: 404 });
    }

    #[test]
    fn not_found_page_with_nothing_available_is_not_found() {
        let lookup = lookup_from(&[]);
        let intent = resolve(&lookup, HtmlHandling::None, NotFoundHandling::NotFoundPage, "/a/b/c");
        assert_eq!(intent, Intent::NotFound);
    }
}
