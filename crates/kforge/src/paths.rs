//! Path helpers.

use std::path::{Path, PathBuf};

/// Expand a leading `~` to the home directory.
///
/// Anything that is not exactly `~` or `~/...` (for example `~backup/x`, which
/// is a valid relative path) and any failure to determine the home directory
/// leaves the path unchanged.
#[must_use]
pub fn expand_home(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };

    match dirs::home_dir() {
        Some(home) if rest.as_os_str().is_empty() => home,
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}
