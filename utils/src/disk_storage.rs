//! Utilities for storing a struct in a TOML file under `~/.lookback`.
//! The struct should implement Serialize and Deserialize from serde.

use std::{fmt::Debug, fs, path::PathBuf};

use directories::BaseDirs;
use serde::{de::DeserializeOwned, Serialize};

pub trait DiskStorageInterface
where
    Self: Sized + Debug + Default + Serialize + DeserializeOwned,
{
    const FILE_NAME: &'static str;

    /// Get the path to the file
    fn path() -> crate::Result<PathBuf> {
        let dirs = BaseDirs::new().ok_or(crate::Error::BaseDirsFailed)?;
        Ok(Self::path_in(dirs.home_dir().join(".lookback")))
    }

    fn path_in(dir: PathBuf) -> PathBuf {
        dir.join(Self::FILE_NAME).with_extension("toml")
    }

    /// Load the content from the file if it exists otherwise return the default value
    fn load() -> crate::Result<Self> {
        Self::load_from(Self::path()?)
    }

    fn load_from(path: PathBuf) -> crate::Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| crate::Error::FileReadFailed(path.clone(), e))?;

            toml::from_str(&content).map_err(|e| crate::Error::TomlParsingFailed(path, e))
        } else {
            Ok(Self::default())
        }
    }

    /// Save content to a file, creating the directories and file as necessary
    fn save(&self) -> crate::Result<()> {
        self.save_to(Self::path()?)
    }

    fn save_to(&self, path: PathBuf) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| crate::Error::CreateDirAllFailed(path.clone(), e))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::TomlFormattingFailed(format!("{self:?}"), e))?;

        fs::write(&path, content).map_err(|e| crate::Error::FileWriteFailed(path, e))?;

        Ok(())
    }
}
