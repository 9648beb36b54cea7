use dirs::data_dir;
use once_cell::sync::Lazy;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// `EVENT_BOARD_HOME`, else `<data dir>/event-board`, else the working
/// directory.
static DATA_ROOT: Lazy<PathBuf> = Lazy::new(|| {
    let root = match std::env::var_os("EVENT_BOARD_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => data_dir()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
            .join("event-board"),
    };
    if let Err(err) = fs::create_dir_all(&root) {
        tracing::warn!(path = %root.display(), error = %err, "failed to create data root");
    }
    root
});

pub fn database_path() -> PathBuf {
    DATA_ROOT.join("event-board.sqlite")
}

pub fn config_path() -> PathBuf {
    DATA_ROOT.join("config.json")
}

pub fn ensure_parent(path: &Path) {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return;
    };
    if let Err(err) = fs::create_dir_all(parent) {
        tracing::warn!(path = %parent.display(), error = %err, "failed to create parent");
    }
}
