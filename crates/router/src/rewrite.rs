use regex::{Captures, Regex};
use std::sync::OnceLock;

use dockpit_content::guess_content_type;

/// Matches `<tag ... attr="value" ...>` for the closed set of tag/attribute
/// pairs eligible for root-relative URL rewriting (spec §4.9 "Path
/// rewriting for path-based routing"). A regex-based pass over the raw
/// markup stands in for a true streaming HTML rewriter, the same
/// attribute-regex technique already used for redirect/header patterns.
#[allow(clippy::expect_used)] // pattern is a compile-time constant, never fails
fn attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?is)<(script|link|a|img|form|source|video|audio|iframe|object|embed|use|image)\b([^>]*?)\s(src|href|action|poster|data|xlink:href|srcset)\s*=\s*("([^"]*)"|'([^']*)')"#,
        )
        .expect("static regex is valid")
    })
}

#[allow(clippy::expect_used)] // pattern is a compile-time constant, never fails
fn script_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(["'])(/[^/"'][^"']*)\1"#).expect("static regex is valid"))
}

fn allowed_attr(tag: &str, attr: &str) -> bool {
    let tag = tag.to_ascii_lowercase();
    let attr = attr.to_ascii_lowercase();
    matches!(
        (tag.as_str(), attr.as_str()),
        ("script", "src")
            | ("link", "href")
            | ("a", "href")
            | ("img", "src")
            | ("img", "srcset")
            | ("form", "action")
            | ("source", "src")
            | ("source", "srcset")
            | ("video", "src")
            | ("video", "poster")
            | ("audio", "src")
            | ("iframe", "src")
            | ("object", "data")
            | ("embed", "src")
            | ("use", "href")
            | ("use", "xlink:href")
            | ("image", "href")
            | ("image", "xlink:href")
    )
}

/// Prefix a single root-relative URL (starts with `/`, not `//`, not
/// already prefixed) with `/__project/{id}`; anything else is returned
/// unchanged.
fn prefix_if_root_relative(project_id: &str, url: &str) -> String {
    let prefix = format!("/__project/{project_id}");
    if !url.starts_with('/') || url.starts_with("//") || url.starts_with(&format!("{prefix}/")) || url == prefix {
        return url.to_string();
    }
    format!("{prefix}{url}")
}

fn rewrite_srcset(project_id: &str, value: &str) -> String {
    value
        .split(',')
        .map(|candidate| {
            let trimmed = candidate.trim();
            let (url, descriptor) = match trimmed.split_once(char::is_whitespace) {
                Some((u, d)) => (u, Some(d)),
                None => (trimmed, None),
            };
            let rewritten = prefix_if_root_relative(project_id, url);
            match descriptor {
                Some(d) => format!("{rewritten} {d}"),
                None => rewritten,
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Rewrites the closed attribute list in HTML markup to route asset
/// requests back through `/__project/{id}` for path-based routing.
#[must_use]
pub fn rewrite_html_attributes(project_id: &str, html: &str) -> String {
    attr_regex()
        .replace_all(html, |caps: &Captures| {
            let tag = &caps[1];
            let prefix_and_attrs = &caps[2];
            let attr = &caps[3];
            let quote_double = caps.get(4).map(|m| m.as_str().starts_with('"')).unwrap_or(true);
            let value = caps.get(5).or_else(|| caps.get(6)).map(|m| m.as_str()).unwrap_or("");

            if !allowed_attr(tag, attr) {
                return caps[0].to_string();
            }

            let rewritten = if attr.eq_ignore_ascii_case("srcset") {
                rewrite_srcset(project_id, value)
            } else {
                prefix_if_root_relative(project_id, value)
            };

            let quote = if quote_double { '"' } else { '\'' };
            format!("<{tag}{prefix_and_attrs} {attr}={quote}{rewritten}{quote}")
        })
        .into_owned()
}

/// Regex-rewrites quoted absolute asset paths inside inline `<script>` text
/// nodes — only values ending in a recognized asset extension are touched,
/// to avoid corrupting arbitrary string literals.
#[must_use]
pub fn rewrite_script_text(project_id: &str, script_body: &str) -> String {
    script_url_regex()
        .replace_all(script_body, |caps: &Captures| {
            let quote = &caps[1];
            let url = &caps[2];
            if guess_content_type(url) == "application/octet-stream" {
                return caps[0].to_string();
            }
            let rewritten = prefix_if_root_relative(project_id, url);
            format!("{quote}{rewritten}{quote}")
        })
        .into_owned()
}

const BASE_PATH_SHIM_TEMPLATE: &str = r#"<script>
window.__BASE_PATH__ = "/__project/{id}";
(function () {
  const base = window.__BASE_PATH__;
  const origFetch = window.fetch;
  window.fetch = function (input, init) {
    if (typeof input === "string" && input.startsWith("/") && !input.startsWith("//") && !input.startsWith(base)) {
      input = base + input;
    }
    return origFetch.call(this, input, init);
  };
})();
</script>
"#;

/// The shim injected into `<head>` for path-based routing, setting
/// `window.__BASE_PATH__` and patching `fetch` to prefix root-relative URLs.
#[must_use]
pub fn base_path_shim(project_id: &str) -> String {
    BASE_PATH_SHIM_TEMPLATE.replace("{id}", project_id)
}

/// Prepends the base-path shim into the document's `<head>`, or at the very
/// start of the document if no `<head>` tag is present.
#[must_use]
pub fn inject_base_path_shim(project_id: &str, html: &str) -> String {
    let shim = base_path_shim(project_id);
    if let Some(idx) = html.to_ascii_lowercase().find("<head>") {
        let insert_at = idx + "<head>".len();
        let mut out = String::with_capacity(html.len() + shim.len());
        out.push_str(&html[..insert_at]);
        out.push_str(&shim);
        out.push_str(&html[insert_at..]);
        out
    } else {
        format!("{shim}{html}")
    }
}

/// The full path-based HTML transform: attribute rewriting plus the
/// base-path shim. `<script>` text-node rewriting is applied separately by
/// the caller once script bodies are isolated.
#[must_use]
pub fn rewrite_html_document(project_id: &str, html: &str) -> String {
    inject_base_path_shim(project_id, &rewrite_html_attributes(project_id, html))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_root_relative_script_src() {
        let html = r#"<script src="/app.js"></script>"#;
        let out = rewrite_html_attributes("proj1", html);
        assert_eq!(out, r#"<script src="/__project/proj1/app.js"></script>"#);
    }

    #[test]
    fn leaves_already_prefixed_and_protocol_relative_urls_alone() {
        let html = r#"<a href="/__project/proj1/x"></a><a href="//cdn.example.com/y"></a>"#;
        let out = rewrite_html_attributes("proj1", html);
        assert_eq!(out, html);
    }

    #[test]
    fn leaves_unrelated_attributes_alone() {
        let html = r#"<div data-foo="/bar"></div>"#;
        assert_eq!(rewrite_html_attributes("proj1", html), html);
    }

    #[test]
    fn srcset_rewrites_each_candidate_independently() {
        let html = r#"<img srcset="/a.png 1x, /b.png 2x">"#;
        let out = rewrite_html_attributes("proj1", html);
        assert_eq!(out, r#"<img srcset="/__project/proj1/a.png 1x, /__project/proj1/b.png 2x">"#);
    }

    #[test]
    fn script_text_rewrites_only_known_asset_extensions() {
        let body = r#"const a = "/logo.svg"; const b = "/not-an-asset";"#;
        let out = rewrite_script_text("proj1", body);
        assert_eq!(out, r#"const a = "/__project/proj1/logo.svg"; const b = "/not-an-asset";"#);
    }

    #[test]
    fn shim_is_injected_after_head_open_tag() {
        let html = "<html><head><title>x</title></head></html>";
        let out = inject_base_path_shim("proj1", html);
        assert!(out.contains("<head><script>"));
        assert!(out.contains("__BASE_PATH__ = \"/__project/proj1\""));
    }
}
