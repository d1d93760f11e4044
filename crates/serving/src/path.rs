/// Stage B — split on `/`, `decodeURIComponent` each segment (keep the
/// original segment on decode failure), rejoin, then collapse repeated `/`
/// into one (spec §4.8 stage B).
#[must_use]
pub fn decode_and_normalize(pathname: &str) -> String {
    let decoded: Vec<String> = pathname
        .split('/')
        .map(|segment| urlencoding::decode(segment).map(|c| c.into_owned()).unwrap_or_else(|_| segment.to_string()))
        .collect();
    collapse_slashes(&decoded.join("/"))
}

#[must_use]
pub fn collapse_slashes(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut last_was_slash = false;
    for c in path.chars() {
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
}

/// Stage F — the canonical encoded form of a resolved pathname, used to
/// decide whether to 307-redirect to it.
#[must_use]
pub fn canonical_encoded(pathname: &str) -> String {
    pathname
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
