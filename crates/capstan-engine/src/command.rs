//! Subprocess argv and environment assembly.

use capstan_manifest::Guardrails;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|meta| meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    false
}

/// Choose the argv for an entrypoint by file type: `.py` runs under
/// `python3`, `.sh` under `bash`, anything with the executable bit runs
/// directly, and everything else falls back to `bash`.
#[must_use]
pub fn build_argv(entrypoint: &Path) -> Vec<String> {
    let path = entrypoint.display().to_string();
    match entrypoint.extension().and_then(|ext| ext.to_str()) {
        Some("py") => vec!["python3".to_string(), path],
        Some("sh") => vec!["bash".to_string(), path],
        _ if is_executable(entrypoint) => vec![path],
        _ => vec!["bash".to_string(), path],
    }
}

/// Fold an input key into an `INPUT_<NAME>` suffix: camelCase boundaries
/// become underscores, non-alphanumeric runs become single underscores, and
/// the result is uppercased.
#[must_use]
pub fn to_upper_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_lower = false;
    let mut prev_underscore = true; // suppress a leading underscore
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if ch.is_ascii_uppercase() && prev_lower && !prev_underscore {
                out.push('_');
            }
            out.push(ch.to_ascii_uppercase());
            prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
            prev_underscore = false;
        } else {
            if !prev_underscore {
                out.push('_');
            }
            prev_lower = false;
            prev_underscore = true;
        }
    }
    out.trim_end_matches('_').to_string()
}

/// Render one input value for flat environment access: strings bare,
/// everything else as JSON.
fn render_input(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Build the subprocess environment: allow-listed pass-through from the
/// runtime's own environment plus the fixed runtime-injected keys.
#[must_use]
pub(crate) fn build_env(
    guardrails: &Guardrails,
    workspace_root: &Path,
    capability_id: &str,
    module_id: &str,
    manifest_path: &Path,
    inputs: &Map<String, Value>,
) -> BTreeMap<String, String> {
    let mut env: BTreeMap<String, String> = guardrails
        .allowed_env
        .iter()
        .filter_map(|key| std::env::var(key).ok().map(|value| (key.clone(), value)))
        .collect();

    env.insert(
        "WORKSPACE_ROOT".to_string(),
        workspace_root.display().to_string(),
    );
    env.insert("CAPABILITY_ID".to_string(), capability_id.to_string());
    env.insert("CAPABILITY_MODULE".to_string(), module_id.to_string());
    env.insert(
        "CAPABILITY_MANIFEST".to_string(),
        manifest_path.display().to_string(),
    );
    env.insert(
        "CAPABILITY_INPUTS".to_string(),
        Value::Object(inputs.clone()).to_string(),
    );
    for (key, value) in inputs {
        env.insert(format!("INPUT_{}", to_upper_snake(key)), render_input(value));
    }
    env
}

fn needs_quoting(arg: &str) -> bool {
    arg.is_empty()
        || !arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:=@%+,".contains(c))
}

/// Render an argv for display, quoting arguments the way a shell would want
/// them. Display only; the argv is never run through a shell.
#[must_use]
pub fn display_command(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| {
            if needs_quoting(arg) {
                format!("'{}'", arg.replace('\'', r"'\''"))
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_argv_python() {
        let argv = build_argv(Path::new("/srv/tool.py"));
        assert_eq!(argv, ["python3", "/srv/tool.py"]);
    }

    #[test]
    fn test_argv_shell() {
        let argv = build_argv(Path::new("/srv/tool.sh"));
        assert_eq!(argv, ["bash", "/srv/tool.sh"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_argv_executable_bit() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tool");
        std::fs::write(&path, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(build_argv(&path), [path.display().to_string()]);
    }

    #[test]
    fn test_argv_fallback_bash() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tool.txt");
        std::fs::write(&path, "echo hi\n").unwrap();
        assert_eq!(build_argv(&path)[0], "bash");
    }

    #[test]
    fn test_upper_snake() {
        assert_eq!(to_upper_snake("targetHost"), "TARGET_HOST");
        assert_eq!(to_upper_snake("dry-run"), "DRY_RUN");
        assert_eq!(to_upper_snake("scope"), "SCOPE");
        assert_eq!(to_upper_snake("max.retries2"), "MAX_RETRIES2");
        assert_eq!(to_upper_snake("_weird__key_"), "WEIRD_KEY");
    }

    #[test]
    fn test_env_injected_keys() {
        let inputs = json!({"targetHost": "db1", "count": 3})
            .as_object()
            .cloned()
            .unwrap();
        let env = build_env(
            &Guardrails::default(),
            Path::new("/srv/ops"),
            "ops.ping",
            "ops",
            Path::new("/srv/ops/manifest.json"),
            &inputs,
        );

        assert_eq!(env["WORKSPACE_ROOT"], "/srv/ops");
        assert_eq!(env["CAPABILITY_ID"], "ops.ping");
        assert_eq!(env["CAPABILITY_MODULE"], "ops");
        assert_eq!(env["CAPABILITY_MANIFEST"], "/srv/ops/manifest.json");
        assert_eq!(env["INPUT_TARGET_HOST"], "db1");
        assert_eq!(env["INPUT_COUNT"], "3");

        let blob: Value = serde_json::from_str(&env["CAPABILITY_INPUTS"]).unwrap();
        assert_eq!(blob["targetHost"], "db1");
    }

    #[test]
    fn test_env_only_allow_listed_and_injected_keys() {
        let env = build_env(
            &Guardrails::default(),
            Path::new("/srv"),
            "c",
            "m",
            Path::new("/srv/m.json"),
            &Map::new(),
        );
        let guardrails = Guardrails::default();
        for key in env.keys() {
            let injected = key.starts_with("CAPABILITY_")
                || key.starts_with("INPUT_")
                || key == "WORKSPACE_ROOT";
            assert!(
                injected || guardrails.allowed_env.contains(key),
                "unexpected env key {key}"
            );
        }
    }

    #[test]
    fn test_display_command_quotes() {
        let argv = vec!["bash".to_string(), "/srv/my tool.sh".to_string()];
        assert_eq!(display_command(&argv), "bash '/srv/my tool.sh'");
    }
}
