/// Result of stage 3 (spec §4.9 step 3): which project a request targets,
/// and whether it got there via `/__project/{id}` (path-based, requiring
/// response rewriting) or via the `Host` header's first label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRoute {
    pub project_id: String,
    pub is_path_based: bool,
}

const PROJECT_PATH_PREFIX: &str = "/__project/";

/// Extracts `(projectId, isPathBased)` from the request host + pathname, or
/// `None` if the request doesn't target any project (falls through to 404).
#[must_use]
pub fn extract(host: &str, pathname: &str) -> Option<ProjectRoute> {
    if let Some(rest) = pathname.strip_prefix(PROJECT_PATH_PREFIX) {
        let id = rest.split('/').next().unwrap_or("");
        if id.is_empty() {
            return None;
        }
        return Some(ProjectRoute { project_id: id.to_string(), is_path_based: true });
    }

    let host_without_port = host.split(':').next().unwrap_or(host);
    if host_without_port == "localhost" {
        return None;
    }
    let label = host_without_port.split('.').next().unwrap_or("");
    if label.is_empty() || label == "www" {
        return None;
    }
    Some(ProjectRoute { project_id: label.to_string(), is_path_based: false })
}

/// Strips the `/__project/{id}` prefix from a path-based request's
/// pathname, defaulting the remainder to `/` (spec §4.9 step 7).
#[must_use]
pub fn strip_project_prefix(project_id: &str, pathname: &str) -> String {
    let prefix = format!("{PROJECT_PATH_PREFIX}{project_id}");
    match pathname.strip_prefix(&prefix) {
        Some("") => "/".to_string(),
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        _ => "/".to_string(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_based_extraction() {
        let route = extract("example.com", "/__project/abc-123/foo").unwrap();
        assert_eq!(route, ProjectRoute { project_id: "abc-123".to_string(), is_path_based: true });
    }

    #[test]
    fn subdomain_based_extraction() {
        let route = extract("abc-123.dockpit.dev", "/foo").unwrap();
        assert_eq!(route, ProjectRoute { project_id: "abc-123".to_string(), is_path_based: false });
    }

    #[test]
    fn www_and_localhost_are_not_projects() {
        assert!(extract("www.dockpit.dev", "/foo").is_none());
        assert!(extract("localhost", "/foo").is_none());
        assert!(extract("localhost:8787", "/foo").is_none());
    }

    #[test]
    fn strip_prefix_defaults_to_root() {
        assert_eq!(strip_project_prefix("abc", "/__project/abc"), "/");
        assert_eq!(strip_project_prefix("abc", "/__project/abc/"), "/");
        assert_eq!(strip_project_prefix("abc", "/__project/abc/foo/bar"), "/foo/bar");
    }
}
