/// Closed extension → content-type lookup (spec §4.2). Anything not listed
/// here is "unknown" — there's no fallback sniffing, by design.
const UNKNOWN: &str = "application/octet-stream";

#[must_use]
pub fn guess_content_type(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().filter(|e| *e != path).unwrap_or("");
    match ext.to_ascii_lowercase().as_str() {
        "html" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "eot" => "application/vnd.ms-fontobject",
        "otf" => "font/otf",
        _ => UNKNOWN,
    }
}
