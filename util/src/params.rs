//! Generic parameters functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::de::DeserializeOwned;
use std::fs::{self, read_to_string};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use toml;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Watches a parameter file and reloads it whenever its modification time
/// changes.
pub struct ParamWatcher {
    path: PathBuf,

    /// Modification time seen on the last poll, `None` if the file didn't
    /// exist.
    last_modified: Option<SystemTime>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error that occurs during loading of a parameter file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("The software root environment variable (AIM_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot load the parmeter file: {0}")]
    FileLoadError(std::io::Error),

    #[error("Cannot read the parameter file: {0}")]
    DeserialiseError(toml::de::Error)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LoadError {
    /// True if the error was caused by the parameter file not existing.
    pub fn is_not_found(&self) -> bool {
        match self {
            LoadError::FileLoadError(e) => e.kind() == std::io::ErrorKind::NotFound,
            _ => false
        }
    }
}

impl ParamWatcher {
    /// Create a watcher for the given parameter file, relative to the
    /// "params" directory.
    ///
    /// The current modification time is recorded, so the first poll only
    /// reports a change made after the watcher was created.
    pub fn new(param_file_path: &str) -> Result<Self, LoadError> {
        let path = get_path(param_file_path)?;
        let last_modified = modified_time(&path);

        Ok(Self {
            path,
            last_modified
        })
    }

    /// Check the file for changes.
    ///
    /// Returns `None` if the file has not changed since the last poll,
    /// otherwise the result of reloading it. A file which is deleted is not
    /// reported as a change.
    pub fn poll<P>(&mut self) -> Option<Result<P, LoadError>>
    where
        P: DeserializeOwned
    {
        let modified = modified_time(&self.path);

        if modified.is_none() || modified == self.last_modified {
            return None;
        }

        self.last_modified = modified;

        Some(load_path(&self.path))
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a parameter file
///
/// The file path is relative to the "$AIM_SW_ROOT/params" directory
pub fn load<P>(param_file_path: &str) -> Result<P, LoadError> 
where
    P: DeserializeOwned
{
    load_path(get_path(param_file_path)?)
}

/// Load a parameter file from an absolute or working-directory relative path.
pub fn load_path<P, Q>(path: Q) -> Result<P, LoadError>
where
    P: DeserializeOwned,
    Q: AsRef<Path>
{
    // Load the file into a string
    let params_str = match read_to_string(path) {
        Ok(s) => s,
        Err(e) => return Err(LoadError::FileLoadError(e))
    };

    // Parse the string into the parameter struct
    match toml::from_str(params_str.as_str()) {
        Ok(p) => Ok(p),
        Err(e) => Err(LoadError::DeserialiseError(e))
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the full path to a file in the params dir
fn get_path(param_file_path: &str) -> Result<PathBuf, LoadError> {
    let mut path = crate::host::get_aim_sw_root()
        .map_err(|_| LoadError::SwRootNotSet)?;
    path.push("params");
    path.push(param_file_path);

    Ok(path)
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct TestParams {
        gain: f64,

        #[serde(default)]
        offset: f64
    }

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("aim_util_params_{}_{}", std::process::id(), name));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_path() {
        let path = temp_file("load.toml", "gain = 2.5\n");

        let p: TestParams = load_path(&path).unwrap();
        assert_eq!(p, TestParams { gain: 2.5, offset: 0.0 });

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_errors() {
        let missing: Result<TestParams, _> = load_path("/nonexistent/aim/params.toml");
        assert!(missing.unwrap_err().is_not_found());

        let path = temp_file("bad.toml", "gain = \"not a number\"\n");
        let bad: Result<TestParams, _> = load_path(&path);
        match bad {
            Err(LoadError::DeserialiseError(_)) => (),
            r => panic!("Expected a deserialise error, got {:?}", r)
        }

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_watcher_reports_changes() {
        let path = temp_file("watch.toml", "gain = 1.0\n");

        let mut watcher = ParamWatcher {
            last_modified: modified_time(&path),
            path: path.clone()
        };

        // Nothing has changed yet
        assert!(watcher.poll::<TestParams>().is_none());

        // Force a different modification time rather than relying on the
        // filesystem's timestamp resolution
        watcher.last_modified = Some(SystemTime::UNIX_EPOCH);
        fs::write(&path, "gain = 3.0\n").unwrap();

        let p: TestParams = watcher.poll().unwrap().unwrap();
        assert_eq!(p.gain, 3.0);
        assert!(watcher.poll::<TestParams>().is_none());

        // Deleting the file is not a change
        fs::remove_file(&path).unwrap();
        assert!(watcher.poll::<TestParams>().is_none());
    }
}
