//! Kernel runtime directory resolution.
//!
//! Kernels write their `kernel-<id>.json` connection files into the Jupyter
//! runtime directory. Resolution order:
//! 1. `JUPYTER_RUNTIME_DIR`
//! 2. `JUPYTER_DATA_DIR/runtime`
//! 3. Platform data directory + `runtime`
//!
//! Resolution is a pure function of an explicit environment map and
//! platform so it can be tested without touching process state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment snapshot consulted by the resolver.
pub type Env = HashMap<String, String>;

/// Platforms with distinct data directory conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
    Other,
}

impl Platform {
    /// Platform this binary was compiled for.
    pub const fn current() -> Self {
        if cfg!(target_os = "linux") {
            Self::Linux
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::Other
        }
    }
}

/// Snapshot of the current process environment.
pub fn process_env() -> Env {
    std::env::vars().collect()
}

fn var<'a>(env: &'a Env, name: &str) -> Option<&'a str> {
    env.get(name).map(String::as_str).filter(|v| !v.is_empty())
}

/// Jupyter data directory for `platform`.
pub fn resolve_data_dir(env: &Env, platform: Platform) -> Option<PathBuf> {
    if let Some(dir) = var(env, "JUPYTER_DATA_DIR") {
        return Some(PathBuf::from(dir));
    }
    match platform {
        Platform::Linux | Platform::Other => var(env, "XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| {
                var(env, "HOME").map(|h| PathBuf::from(h).join(".local").join("share"))
            })
            .map(|p| p.join("jupyter")),
        Platform::MacOs => {
            var(env, "HOME").map(|h| PathBuf::from(h).join("Library").join("Jupyter"))
        }
        Platform::Windows => var(env, "APPDATA")
            .map(PathBuf::from)
            .or_else(|| {
                var(env, "USERPROFILE").map(|h| PathBuf::from(h).join("AppData").join("Roaming"))
            })
            .map(|p| p.join("jupyter")),
    }
}

/// Directory holding kernel connection files for `platform`.
pub fn resolve_runtime_dir(env: &Env, platform: Platform) -> Option<PathBuf> {
    if let Some(dir) = var(env, "JUPYTER_RUNTIME_DIR") {
        return Some(PathBuf::from(dir));
    }
    resolve_data_dir(env, platform).map(|p| p.join("runtime"))
}

/// Turn the connection-file argument into a path.
///
/// Anything that looks like a path (has a directory component or exists) is
/// returned unchanged. A bare name is looked up in the runtime directory;
/// a bare kernel id `abc` expands to `kernel-abc.json`, and a bare stem
/// `kernel-abc` gets only the extension.
pub fn resolve_connection_file(arg: &Path, env: &Env, platform: Platform) -> PathBuf {
    let is_bare = arg.parent().is_none_or(|p| p.as_os_str().is_empty());
    if !is_bare || arg.exists() {
        return arg.to_path_buf();
    }
    let Some(runtime_dir) = resolve_runtime_dir(env, platform) else {
        return arg.to_path_buf();
    };

    let name = arg.to_string_lossy();
    let file_name = if name.ends_with(".json") {
        name.into_owned()
    } else if name.starts_with("kernel-") {
        format!("{name}.json")
    } else {
        format!("kernel-{name}.json")
    };
    runtime_dir.join(file_name)
}
