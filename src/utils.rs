use std::{
    fs, io,
    path::{Path, PathBuf},
};

use once_cell::sync::Lazy;

const APP_DIR: &str = "eventsphere";

/// Overrides the platform data directory, mostly useful for demos and tests.
pub const HOME_ENV: &str = "EVENTSPHERE_HOME";

static DATA_ROOT: Lazy<PathBuf> = Lazy::new(|| {
    if let Some(home) = std::env::var_os(HOME_ENV) {
        return PathBuf::from(home);
    }
    dirs::data_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
});

pub fn data_root() -> PathBuf {
    DATA_ROOT.clone()
}

pub fn database_path() -> PathBuf {
    data_root().join("eventsphere.sqlite")
}

pub fn config_path() -> PathBuf {
    data_root().join("config.json")
}

/// Creates the directory holding `path`, if any.
pub fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Current wall-clock time in milliseconds since the UNIX epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Creation-time id, bumped past the largest existing id it would collide with.
pub fn next_id(existing: impl IntoIterator<Item = i64>) -> i64 {
    id_after(existing, now_millis())
}

fn id_after(existing: impl IntoIterator<Item = i64>, now: i64) -> i64 {
    match existing.into_iter().max() {
        Some(max) if max >= now => max + 1,
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_parent_creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a").join("b").join("store.sqlite");
        ensure_parent(&target).unwrap();
        assert!(dir.path().join("a").join("b").is_dir());
    }

    #[test]
    fn id_after_skips_past_existing_ids() {
        assert_eq!(id_after([500], 400), 501);
        assert_eq!(id_after([500, 12], 500), 501);
        assert_eq!(id_after([500], 900), 900);
        assert_eq!(id_after(Vec::new(), 42), 42);
    }

    #[test]
    fn next_id_never_repeats_an_existing_id() {
        let far_future = now_millis() + 60_000;
        assert_eq!(next_id([far_future]), far_future + 1);
    }

    #[test]
    fn ensure_parent_accepts_bare_file_names() {
        ensure_parent(Path::new("store.sqlite")).unwrap();
    }
}
