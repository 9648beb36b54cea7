use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::timestamps::CalendarZone;
use crate::utils;
use crate::view::{ViewSettings, ORGANIZER_PAGE_SIZE, PUBLIC_PAGE_SIZE};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub public_page_size: usize,
    pub organizer_page_size: usize,
    /// IANA zone for calendar days; unset means the system local zone.
    pub timezone: Option<String>,
    pub database_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            public_page_size: PUBLIC_PAGE_SIZE,
            organizer_page_size: ORGANIZER_PAGE_SIZE,
            timezone: None,
            database_path: None,
        }
    }
}

impl AppConfig {
    /// `EVENT_BOARD_TIMEZONE` and `EVENT_BOARD_DB` win over the file.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(zone) = std::env::var("EVENT_BOARD_TIMEZONE") {
            self.timezone = Some(zone);
        }
        if let Ok(path) = std::env::var("EVENT_BOARD_DB") {
            self.database_path = Some(PathBuf::from(path));
        }
        self
    }

    pub fn zone(&self) -> CalendarZone {
        CalendarZone::from_config(self.timezone.as_deref())
    }

    pub fn public_settings(&self) -> ViewSettings {
        ViewSettings {
            page_size: self.public_page_size.max(1),
            zone: self.zone(),
        }
    }

    pub fn organizer_settings(&self) -> ViewSettings {
        ViewSettings {
            page_size: self.organizer_page_size.max(1),
            zone: self.zone(),
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(utils::database_path)
    }
}

pub struct ConfigStore {
    path: PathBuf,
    data: Mutex<AppConfig>,
}

impl ConfigStore {
    pub fn load() -> Self {
        Self::load_from(utils::config_path())
    }

    /// A missing or unreadable file gives the defaults.
    pub fn load_from(path: PathBuf) -> Self {
        let data = read_config(&path).unwrap_or_else(|err| {
            tracing::warn!(path = %path.display(), error = %err, "using default config");
            AppConfig::default()
        });
        Self {
            path,
            data: Mutex::new(data),
        }
    }

    pub fn read(&self) -> AppConfig {
        self.data.lock().expect("config mutex poisoned").clone()
    }

    pub fn update<F>(&self, transform: F) -> Result<AppConfig, ConfigError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut guard = self.data.lock().map_err(|_| ConfigError::Poisoned)?;
        transform(&mut guard);
        write_config(&self.path, &guard)?;
        Ok(guard.clone())
    }
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn write_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(config)?;
    fs::write(path, contents)?;
    Ok(())
}
