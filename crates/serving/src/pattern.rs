use std::collections::HashMap;

use regex::Regex;

/// Compiles a redirect/header-rule pattern (`:name` placeholders, `*` splat)
/// into a regex with named capture groups (spec §4.8 stage A, §4.8.h).
/// `placeholder_excludes` is the set of characters a `:name` segment may not
/// contain — `/` for path patterns, `/.` for hostname patterns.
pub fn compile(pattern: &str, placeholder_excludes: &str) -> Option<Regex> {
    let mut out = String::from("^");
    let excl = regex::escape(placeholder_excludes);
    let mut chars = pattern.chars().peekable();
    let mut splat_idx = 0usize;

    while let Some(c) = chars.next() {
        match c {
            '*' => {
                let name = if splat_idx == 0 { "splat".to_string() } else { format!("splat{splat_idx}") };
                splat_idx += 1;
                out.push_str(&format!("(?P<{name}>.*)"));
            }
            ':' => {
                let mut name = String::new();
                while let Some(&next) = chars.peek() {
                    if next.is_alphanumeric() || next == '_' {
                        name.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if name.is_empty() {
                    out.push(':');
                } else {
                    out.push_str(&format!("(?P<{name}>[^{excl}]+)"));
                }
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    Regex::new(&out).ok()
}

/// Match `subject` against `pattern`, returning captured placeholder values
/// keyed by name (including `splat` for `*`).
pub fn match_captures(pattern: &str, subject: &str, placeholder_excludes: &str) -> Option<HashMap<String, String>> {
    let re = compile(pattern, placeholder_excludes)?;
    let caps = re.captures(subject)?;
    let mut out = HashMap::new();
    for name in re.capture_names().flatten() {
        if let Some(m) = caps.name(name) {
            out.insert(name.to_string(), m.as_str().to_string());
        }
    }
    Some(out)
}

/// Interpolate `:name`/`*splat` placeholders in a value template using
/// previously captured values (spec §4.8.h).
pub fn interpolate(template: &str, captures: &HashMap<String, String>) -> String {
    let mut out = String::new();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ':' {
            let mut name = String::new();
            while let Some(&next) = chars.peek() {
                if next.is_alphanumeric() || next == '_' {
                    name.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            if let Some(value) = captures.get(&name) {
                out.push_str(value);
            } else {
                out.push(':');
                out.push_str(&name);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_named_placeholder() {
        let caps = match_captures("/users/:id", "/users/42", "/").unwrap();
        assert_eq!(caps.get("id").map(String::as_str), Some("42"));
    }

    #[test]
    fn splat_matches_remainder() {
        let caps = match_captures("/assets/*", "/assets/js/app.js", "/").unwrap();
        assert_eq!(caps.get("splat").map(String::as_str), Some("js/app.js"));
    }

    #[test]
    fn placeholder_cannot_cross_separator() {
        assert!(match_captures("/users/:id", "/users/42/edit", "/").is_none());
    }

    #[test]
    fn interpolates_captured_values() {
        let mut caps = HashMap::new();
        caps.insert("id".to_string(), "42".to_string());
        assert_eq!(interpolate("/profile/:id", &caps), "/profile/42");
    }
}
