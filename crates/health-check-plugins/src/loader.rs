//! Plugin discovery (spec.md §4.2, C2): directory → `name → value` map.
//!
//! REDESIGN FLAGS §9 directs compile-time registration as the default,
//! required path for shipped hooks/templates (see `registry::StaticRegistry`
//! in `health-check-templates` and the hook tables built in
//! `health-check-api`/`health-check-backend`): built-ins register themselves
//! in a plain `Vec` at process start, satisfying "load once, immutable after"
//! without any filesystem I/O.
//!
//! Dynamic loading is optional, gated on a directory path being configured
//! (`RH_CHECK_HOOK_DIR_PATH`, `RH_CHECK_K8S_TEMPLATE_PATH`) and on the
//! `wasm-plugins` feature. Where the original imports each file as an
//! isolated Python module, this loads each `*.wasm` file into its own
//! `wasmtime::Store` — the module's linear memory gives the same isolation a
//! fresh Python module object gave the original. Import/instantiation
//! failures are logged and the file is skipped; discovery never aborts.

use std::collections::HashMap;
use std::path::Path;

/// Two aggregation modes, exactly as spec.md §4.2 describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// All files' members merged into one map; later files (in iteration
    /// order) override earlier ones on key collision.
    Flat,
    /// `file_stem → {name → value}`, preserved per file. Used by the hook
    /// registry so ordering-by-file-stem survives discovery.
    PerFile,
}

/// Scans `dir` (non-recursively) for `*.wasm` plugin modules and projects
/// each module's exports into a result map via `key`/`value`.
///
/// `value(export_name, module_bytes)` returns `None` to drop an export, or
/// `Some(v)` to include it (after an optional `key` rewrite of its name).
/// Per-file import errors are logged and that file is skipped; discovery
/// continues with the remaining files.
#[cfg(feature = "wasm-plugins")]
pub fn load_plugins<V: Clone>(
    dir: &Path,
    mode: LoadMode,
    key: impl Fn(&str) -> String,
    value: impl Fn(&str, &wasmtime::Module) -> Option<V>,
) -> HashMap<String, HashMap<String, V>> {
    use wasmtime::{Engine, Module};

    let mut per_file: HashMap<String, HashMap<String, V>> = HashMap::new();

    if !dir.is_dir() {
        tracing::error!(path = %dir.display(), "provided plugin path is not a directory");
        return per_file;
    }

    let engine = Engine::default();

    let Ok(entries) = std::fs::read_dir(dir) else {
        tracing::error!(path = %dir.display(), "failed to read plugin directory");
        return per_file;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("wasm") {
            continue;
        }
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        let module = match Module::from_file(&engine, &path) {
            Ok(module) => module,
            Err(err) => {
                tracing::error!(file = %path.display(), error = %err, "failed to load plugin module");
                continue;
            }
        };

        let mut members = HashMap::new();
        for export in module.exports() {
            if let Some(v) = value(export.name(), &module) {
                members.insert(key(export.name()), v);
            }
        }

        per_file.insert(stem, members);
    }

    match mode {
        LoadMode::PerFile => per_file,
        LoadMode::Flat => {
            // Merge all per-file maps in file-stem order, so "later files
            // override earlier ones on key collision" is well defined even
            // though `read_dir` order is unspecified.
            let mut stems: Vec<&String> = per_file.keys().collect();
            stems.sort();
            let mut merged = HashMap::new();
            for stem in stems {
                merged.extend(per_file[stem].clone());
            }
            let mut wrapped = HashMap::new();
            wrapped.insert(String::new(), merged);
            wrapped
        }
    }
}

#[cfg(not(feature = "wasm-plugins"))]
pub fn load_plugins<V>(
    dir: &Path,
    _mode: LoadMode,
    _key: impl Fn(&str) -> String,
    _value: impl Fn(&str, &()) -> Option<V>,
) -> HashMap<String, HashMap<String, V>> {
    tracing::warn!(
        path = %dir.display(),
        "dynamic plugin loading requested but the wasm-plugins feature is disabled; \
         only compile-time-registered hooks/templates are active"
    );
    HashMap::new()
}

#[cfg(all(test, feature = "wasm-plugins"))]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_logs_and_returns_empty() {
        let result = load_plugins(
            Path::new("/nonexistent/plugin/dir"),
            LoadMode::PerFile,
            |name| name.to_string(),
            |_name, _module| Some(()),
        );
        assert!(result.is_empty());
    }
}
