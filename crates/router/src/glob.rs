use regex::Regex;

/// Translate a minimatch-style glob (`*` within a segment, `**` across
/// segments) into an anchored regex.
fn glob_to_regex(pattern: &str) -> Option<Regex> {
    let mut out = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    out.push_str(".*");
                } else {
                    out.push_str("[^/]*");
                }
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    Regex::new(&out).ok()
}

/// `run_worker_first` glob list matching (spec §4.9 step 8, §9 Open
/// Question): a leading `!` marks an exclude-override pattern — if the
/// path matches it, the whole list is vetoed regardless of any positive
/// match, rather than being ANDed in as a plain negative minimatch pattern.
#[must_use]
pub fn matches_glob_patterns(patterns: &[String], path: &str) -> bool {
    let mut matched = false;
    for raw in patterns {
        let (negated, glob) = match raw.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, raw.as_str()),
        };
        let Some(re) = glob_to_regex(glob) else { continue };
        if re.is_match(path) {
            if negated {
                return false;
            }
            matched = true;
        }
    }
    matched
}
