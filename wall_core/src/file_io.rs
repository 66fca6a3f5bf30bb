//! # File I/O
//!
//! Saving and loading session bundles:
//! - **Atomic saves**: write to `.tmp`, sync, rename over the target
//! - **File locking**: an OS lock plus a `.lock` file naming the holder
//! - **Version validation**: refuse bundles from an incompatible schema
//!
//! Bundles are saved as `.swb` files containing JSON; the lock for
//! `w01.swb` lives in `w01.swb.lock`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use wall_core::bundle::SessionBundle;
//! use wall_core::config::AnalysisConfig;
//! use wall_core::file_io::{save_bundle, load_bundle, FileLock};
//! use std::path::Path;
//!
//! let bundle = SessionBundle::new("W-01", Vec::new(), AnalysisConfig::default());
//! let path = Path::new("w01.swb");
//!
//! let lock = FileLock::acquire(path, "lab@example.com").unwrap();
//! save_bundle(&bundle, path).unwrap();
//! drop(lock);
//!
//! let loaded = load_bundle(path).unwrap();
//! assert_eq!(loaded.meta.specimen_name, "W-01");
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::bundle::{SessionBundle, SCHEMA_VERSION};
use crate::errors::{CalcError, CalcResult};

/// Extension used for bundle files
pub const BUNDLE_EXTENSION: &str = "swb";

/// Locks older than this are treated as abandoned
const STALE_LOCK_HOURS: i64 = 24;

/// Who holds a bundle open, as written to the `.lock` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockInfo {
    /// User identifier (email or username)
    pub user_id: String,
    pub machine: String,
    pub pid: u32,
    pub locked_at: DateTime<Utc>,
}

impl LockInfo {
    pub fn new(user_id: impl Into<String>) -> Self {
        LockInfo {
            user_id: user_id.into(),
            machine: hostname().unwrap_or_else(|| "unknown".to_string()),
            pid: std::process::id(),
            locked_at: Utc::now(),
        }
    }

    /// Abandoned: older than a day, or left by a dead process on this machine.
    fn is_stale(&self) -> bool {
        if Utc::now() - self.locked_at > Duration::hours(STALE_LOCK_HOURS) {
            return true;
        }
        hostname().as_deref() == Some(self.machine.as_str()) && !process_alive(self.pid)
    }
}

fn hostname() -> Option<String> {
    #[cfg(windows)]
    {
        std::env::var("COMPUTERNAME").ok()
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOSTNAME").ok().or_else(|| std::env::var("HOST").ok())
    }
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{}", pid)).exists()
}

// without a cheap liveness probe only the age rule applies
#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    true
}

/// Exclusive lock on a bundle file, released on drop.
///
/// Holds an OS-level lock (fs2) on the `.lock` file and writes a
/// [`LockInfo`] into it so other users can see who has the bundle open.
#[derive(Debug)]
pub struct FileLock {
    bundle_path: PathBuf,
    lock_path: PathBuf,
    _lock_file: File,
    pub info: LockInfo,
}

impl FileLock {
    /// Acquire the lock for `path`.
    ///
    /// # Errors
    ///
    /// [`CalcError::FileLocked`] when a live lock exists or another process
    /// holds the OS lock; [`CalcError::FileError`] when the lock file cannot
    /// be written.
    pub fn acquire(path: &Path, user_id: impl Into<String>) -> CalcResult<Self> {
        let lock_path = lock_path_for(path);
        if let Some(existing) = read_lock_info(&lock_path).filter(|info| !info.is_stale()) {
            return Err(CalcError::file_locked(
                path.display().to_string(),
                format!("{} ({})", existing.user_id, existing.machine),
                existing.locked_at.to_rfc3339(),
            ));
        }

        let mut lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| io_error("create lock", &lock_path, e))?;

        // the holder's info stays readable until the OS lock is ours
        lock_file.try_lock_exclusive().map_err(|_| {
            CalcError::file_locked(path.display().to_string(), "another process", "unknown")
        })?;

        let info = LockInfo::new(user_id);
        let json = to_json(&info)?;
        lock_file
            .set_len(0)
            .and_then(|_| lock_file.write_all(json.as_bytes()))
            .and_then(|_| lock_file.sync_all())
            .map_err(|e| io_error("write lock", &lock_path, e))?;

        tracing::debug!(path = %path.display(), user = %info.user_id, "bundle lock acquired");
        Ok(FileLock {
            bundle_path: path.to_path_buf(),
            lock_path,
            _lock_file: lock_file,
            info,
        })
    }

    /// Current live lock on `path`, if any, without acquiring it.
    pub fn check(path: &Path) -> Option<LockInfo> {
        read_lock_info(&lock_path_for(path)).filter(|info| !info.is_stale())
    }

    pub fn bundle_path(&self) -> &Path {
        &self.bundle_path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}

fn lock_path_for(bundle_path: &Path) -> PathBuf {
    append_extension(bundle_path, "lock")
}

/// `a/b.swb` + `tmp` -> `a/b.swb.tmp`
fn append_extension(path: &Path, suffix: &str) -> PathBuf {
    let mut out = path.to_path_buf();
    let extension = match path.extension() {
        Some(e) => format!("{}.{}", e.to_string_lossy(), suffix),
        None => suffix.to_string(),
    };
    out.set_extension(extension);
    out
}

fn read_lock_info(lock_path: &Path) -> Option<LockInfo> {
    let contents = fs::read_to_string(lock_path).ok()?;
    serde_json::from_str(&contents).ok()
}

fn io_error(operation: &str, path: &Path, err: std::io::Error) -> CalcError {
    CalcError::file_error(operation, path.display().to_string(), err.to_string())
}

fn to_json<T: Serialize>(value: &T) -> CalcResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| CalcError::SerializationError {
        reason: e.to_string(),
    })
}

/// Save a bundle atomically.
///
/// The JSON is written to `<path>.tmp`, synced, then renamed over `path`,
/// so an interrupted save never leaves a truncated bundle behind.
pub fn save_bundle(bundle: &SessionBundle, path: &Path) -> CalcResult<()> {
    let json = to_json(bundle)?;
    let tmp_path = append_extension(path, "tmp");

    let mut tmp_file = File::create(&tmp_path).map_err(|e| io_error("create temp file", &tmp_path, e))?;
    tmp_file
        .write_all(json.as_bytes())
        .and_then(|_| tmp_file.sync_all())
        .map_err(|e| io_error("write temp file", &tmp_path, e))?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        io_error("rename to final", path, e)
    })?;

    tracing::info!(path = %path.display(), specimen = %bundle.meta.specimen_name, "bundle saved");
    Ok(())
}

/// Load a bundle and check its schema version.
///
/// # Errors
///
/// * [`CalcError::FileError`] - the file cannot be read
/// * [`CalcError::SerializationError`] - invalid JSON
/// * [`CalcError::VersionMismatch`] - written by an incompatible schema
pub fn load_bundle(path: &Path) -> CalcResult<SessionBundle> {
    let contents = fs::read_to_string(path).map_err(|e| io_error("read", path, e))?;
    let bundle: SessionBundle = serde_json::from_str(&contents).map_err(|e| CalcError::SerializationError {
        reason: format!("Invalid JSON in {}: {}", path.display(), e),
    })?;
    validate_version(&bundle.meta.version)?;
    tracing::debug!(path = %path.display(), samples = bundle.raw_samples.len(), "bundle loaded");
    Ok(bundle)
}

/// Load a bundle together with any live lock held on it by someone else.
pub fn load_bundle_with_lock_check(path: &Path) -> CalcResult<(SessionBundle, Option<LockInfo>)> {
    let bundle = load_bundle(path)?;
    Ok((bundle, FileLock::check(path)))
}

/// Major versions must match; within 0.x a newer minor is refused.
fn validate_version(file_version: &str) -> CalcResult<()> {
    let mismatch = || CalcError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: SCHEMA_VERSION.to_string(),
    };
    let parse = |v: &str| -> Option<(u32, u32)> {
        let mut parts = v.split('.').map(|p| p.parse::<u32>().ok());
        Some((parts.next()??, parts.next().flatten().unwrap_or(0)))
    };

    let (file_major, file_minor) = parse(file_version).ok_or_else(mismatch)?;
    let (major, minor) = parse(SCHEMA_VERSION).ok_or_else(mismatch)?;

    if file_major != major || (major == 0 && file_minor > minor) {
        return Err(mismatch());
    }
    Ok(())
}
