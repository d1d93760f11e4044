use serde::{Deserialize, Serialize};

/// HTML path-handling mode (spec §4.8 stage C).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HtmlHandling {
    None,
    AutoTrailingSlash,
    ForceTrailingSlash,
    DropTrailingSlash,
}

/// Not-found fallback mode (spec §4.8 stage E).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotFoundHandling {
    SinglePageApplication,
    NotFoundPage,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticRedirect {
    pub host: Option<String>,
    pub path: String,
    pub to: String,
    pub status: u16,
    pub line_number: u32,
}

/// A parameterized redirect pattern; `:name` matches one path segment
/// (`[^/]+`), `*` is a named splat matching the remainder (spec §4.8 stage A).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicRedirect {
    pub pattern: String,
    pub to: String,
    pub status: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderRule {
    pub pattern: String,
    #[serde(default)]
    pub set: std::collections::HashMap<String, String>,
    #[serde(default)]
    pub unset: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServingConfig {
    #[serde(default = "default_html_handling")]
    pub html_handling: HtmlHandling,
    #[serde(default = "default_not_found_handling")]
    pub not_found_handling: NotFoundHandling,
    #[serde(default)]
    pub static_redirects: Vec<StaticRedirect>,
    #[serde(default)]
    pub dynamic_redirects: Vec<DynamicRedirect>,
    #[serde(default)]
    pub header_rules: Vec<HeaderRule>,
    #[serde(default)]
    pub has_static_routing: bool,
}

fn default_html_handling() -> HtmlHandling {
    HtmlHandling::None
}

fn default_not_found_handling() -> NotFoundHandling {
    NotFoundHandling::None
}

impl Default for ServingConfig {
    fn default() -> Self {
        Self {
            html_handling: default_html_handling(),
            not_found_handling: default_not_found_handling(),
            static_redirects: Vec::new(),
            dynamic_redirects: Vec::new(),
            header_rules: Vec::new(),
            has_static_routing: false,
        }
    }
}
