use crate::config::{DynamicRedirect, HeaderRule, StaticRedirect};
use crate::pattern::{interpolate, match_captures};

/// Outcome of stage A (spec §4.8 stage A).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectOutcome {
    /// A 200-class match: the pathname is rewritten and the pipeline
    /// continues past stage A using the new pathname.
    Proxy { pathname: String },
    /// A 3xx-class match: respond immediately with `Location: to`.
    External { to: String, status: u16 },
}

/// Static redirects match on exact host+path or exact path; ties (more than
/// one static rule matching the same request) are broken by lowest
/// `line_number`, mirroring source order in the original routing file.
pub fn match_static<'a>(rules: &'a [StaticRedirect], host: &str, pathname: &str) -> Option<&'a StaticRedirect> {
    rules
        .iter()
        .filter(|r| r.path == pathname && r.host.as_deref().is_none_or(|h| h == host))
        .min_by_key(|r| r.line_number)
}

/// Dynamic redirects match `:name`/`*`-splat patterns, first-match-wins in
/// declaration order.
pub fn match_dynamic<'a>(rules: &'a [DynamicRedirect], pathname: &str) -> Option<(&'a DynamicRedirect, String)> {
    for rule in rules {
        if let Some(captures) = match_captures(&rule.pattern, pathname, "/") {
            let to = interpolate(&rule.to, &captures);
            return Some((rule, to));
        }
    }
    None
}

/// Resolves a redirect target against the request's own host+pathname,
/// collapsing duplicate leading slashes so a relative target like
/// `//evil.com` can never be misread by a client as protocol-relative (an
/// open-redirect takeover). A `to` that is itself protocol-relative or
/// carries an explicit scheme is returned unchanged — it's a deliberate
/// cross-origin redirect, required to match verbatim.
#[must_use]
pub fn resolve_target(to: &str) -> String {
    if to.starts_with("http://") || to.starts_with("https://") {
        return to.to_string();
    }
    let collapsed: String = {
        let mut out = String::with_capacity(to.len());
        let mut last_was_slash = false;
        for c in to.chars() {
            if c == '/' {
                if last_was_slash {
                    continue;
                }
                last_was_slash = true;
            } else {
                last_was_slash = false;
            }
            out.push(c);
        }
        out
    };
    if collapsed.starts_with('/') {
        collapsed
    } else {
        format!("/{collapsed}")
    }
}

pub fn apply_static(rule: &StaticRedirect) -> RedirectOutcome {
    let to = resolve_target(&rule.to);
    if rule.status == 200 {
        RedirectOutcome::Proxy { pathname: to }
    } else {
        RedirectOutcome::External { to, status: rule.status }
    }
}

pub fn apply_dynamic(rule: &DynamicRedirect, to: String) -> RedirectOutcome {
    let to = resolve_target(&to);
    if rule.status == 200 {
        RedirectOutcome::Proxy { pathname: to }
    } else {
        RedirectOutcome::External { to, status: rule.status }
    }
}

/// Runs stage A end-to-end: static redirects take precedence over dynamic
/// ones (spec §4.8 stage A).
pub fn resolve(static_redirects: &[StaticRedirect], dynamic_redirects: &[DynamicRedirect], host: &str, pathname: &str) -> Option<RedirectOutcome> {
    if let Some(rule) = match_static(static_redirects, host, pathname) {
        return Some(apply_static(rule));
    }
    if let Some((rule, to)) = match_dynamic(dynamic_redirects, pathname) {
        return Some(apply_dynamic(rule, to));
    }
    None
}

/// Applies header-rule `set`/`unset` entries whose pattern matches
/// `pathname`, later rules overriding earlier ones (spec §4.8.h).
pub fn apply_header_rules(rules: &[HeaderRule], pathname: &str, headers: &mut http::HeaderMap) {
    for rule in rules {
        let Some(captures) = match_captures(&rule.pattern, pathname, "/") else {
            continue;
        };
        for name in &rule.unset {
            if let Ok(header_name) = http::HeaderName::from_bytes(name.as_bytes()) {
                headers.remove(header_name);
            }
        }
        for (name, value_template) in &rule.set {
            let value = interpolate(value_template, &captures);
            if let (Ok(header_name), Ok(header_value)) =
                (http::HeaderName::from_bytes(name.as_bytes()), http::HeaderValue::from_str(&value))
            {
                headers.insert(header_name, header_value);
            }
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn static_rule(path: &str, to: &str, status: u16, line_number: u32) -> StaticRedirect {
        StaticRedirect { host: None, path: path.to_string(), to: to.to_string(), status, line_number }
    }

    #[test]
    fn static_redirect_breaks_ties_by_line_number() {
        let rules =
            vec![static_rule("/old", "/new-b", 301, 5), static_rule("/old", "/new-a", 301, 2)];
        let matched = match_static(&rules, "example.com", "/old").unwrap();
        assert_eq!(matched.to, "/new-a");
    }

    #[test]
    fn status_200_static_redirect_is_a_proxy() {
        let rule = static_rule("/old", "/new", 200, 1);
        assert_eq!(apply_static(&rule), RedirectOutcome::Proxy { pathname: "/new".to_string() });
    }

    #[test]
    fn relative_target_collapses_leading_slashes_to_block_takeover() {
        assert_eq!(resolve_target("//evil.com"), "/evil.com");
    }

    #[test]
    fn absolute_target_is_returned_verbatim() {
        assert_eq!(resolve_target("https://example.com/x"), "https://example.com/x");
    }

    #[test]
    fn dynamic_redirect_interpolates_captures() {
        let rules = vec![DynamicRedirect { pattern: "/blog/:slug".to_string(), to: "/posts/:slug".to_string(), status: 301 }];
        let (rule, to) = match_dynamic(&rules, "/blog/hello").unwrap();
        assert_eq!(rule.status, 301);
        assert_eq!(to, "/posts/hello");
    }

    #[test]
    fn first_matching_dynamic_rule_wins() {
        let rules = vec![
            DynamicRedirect { pattern: "/a/*".to_string(), to: "/first".to_string(), status: 301 },
            DynamicRedirect { pattern: "/a/*".to_string(), to: "/second".to_string(), status: 301 },
        ];
        let (_, to) = match_dynamic(&rules, "/a/b").unwrap();
        assert_eq!(to, "/first");
    }
}
