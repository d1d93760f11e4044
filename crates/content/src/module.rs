use serde::{Deserialize, Serialize};

/// Server-code module type (spec §3, §9 — `data` and `wasm` are accepted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleType {
    Js,
    Cjs,
    Py,
    Text,
    Data,
    Json,
    Wasm,
}

/// Infer a module type from its path's extension (spec §4.2). Unknown
/// extensions default to `js`, matching the upstream behaviour preserved by
/// the spec's compatibility note.
#[must_use]
pub fn infer_module_type(path: &str) -> ModuleType {
    let ext = path.rsplit('.').next().filter(|e| *e != path).unwrap_or("");
    match ext.to_ascii_lowercase().as_str() {
        "js" | "mjs" => ModuleType::Js,
        "cjs" => ModuleType::Cjs,
        "py" => ModuleType::Py,
        "txt" | "html" => ModuleType::Text,
        "json" => ModuleType::Json,
        "bin" => ModuleType::Data,
        "wasm" => ModuleType::Wasm,
        _ => ModuleType::Js,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_known_types() {
        assert_eq!(infer_module_type("index.mjs"), ModuleType::Js);
        assert_eq!(infer_module_type("handler.cjs"), ModuleType::Cjs);
        assert_eq!(infer_module_type("script.py"), ModuleType::Py);
        assert_eq!(infer_module_type("notes.txt"), ModuleType::Text);
        assert_eq!(infer_module_type("data.json"), ModuleType::Json);
        assert_eq!(infer_module_type("blob.bin"), ModuleType::Data);
        assert_eq!(infer_module_type("mod.wasm"), ModuleType::Wasm);
    }

    #[test]
    fn defaults_to_js() {
        assert_eq!(infer_module_type("no_extension"), ModuleType::Js);
        assert_eq!(infer_module_type("weird.ext"), ModuleType::Js);
    }
}
