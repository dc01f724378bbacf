//! `.env` discovery.
//!
//! Must run before [`Cli`](super::Cli) is parsed: clap reads its `env`
//! fallbacks at parse time. Variables already set in the process win.

use std::path::{Path, PathBuf};

/// Load the nearest `.env` found in the working directory or an ancestor.
///
/// Returns the loaded file, if any.
#[must_use]
pub fn load_dotenv() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    load_dotenv_from(&cwd)
}

/// Load the nearest `.env` found in `start` or one of its ancestors.
#[must_use]
pub fn load_dotenv_from(start: &Path) -> Option<PathBuf> {
    let path = start
        .ancestors()
        .map(|dir| dir.join(".env"))
        .find(|candidate| candidate.is_file())?;

    match dotenvy::from_path(&path) {
        Ok(()) => Some(path),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable .env");
            None
        }
    }
}
