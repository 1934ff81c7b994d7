//! Socket-path resolution.

use std::env;
use std::path::PathBuf;

/// Environment variable naming the sidecar socket path.
pub const SOCKET_PATH_ENV: &str = "PHI_ADAPTER_SOCKET_PATH";

/// Default socket path when neither CLI argument nor environment names one.
pub fn default_socket_path() -> PathBuf {
    PathBuf::from("/tmp/phi-adapter-example.sock")
}

/// Resolves the socket path: explicit argument, then
/// `PHI_ADAPTER_SOCKET_PATH`, then the default.
pub fn resolve_socket_path(cli_path: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cli_path {
        return path;
    }
    if let Ok(path) = env::var(SOCKET_PATH_ENV)
        && !path.is_empty()
    {
        return PathBuf::from(path);
    }
    default_socket_path()
}
