//! File-based storage for Forgeboard data
//!
//! All persistent state lives in plain JSON files so that an instance's
//! workspace stays git-trackable and portable between machines.
//!
//! ## Storage Locations
//!
//! Instance-local storage (`.forgeboard/` in the workspace root):
//! - `prds.json` - PRD metadata collection
//! - `skills.json` - Skill collection
//! - `prds/` - PRD markdown bodies, keyed by record filename
//!
//! Global user storage (`~/.forgeboard/` by default, overridable):
//! - `instances.json` - Cross-workspace instance registry
//! - `config.yaml` - Server configuration

pub mod instances;
pub mod lock;
pub mod store;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use rand::Rng;

use crate::error::{StoreError, StoreResult};

/// Get the .forgeboard directory for an instance workspace
pub fn forgeboard_dir(instance_path: &Path) -> PathBuf {
    instance_path.join(".forgeboard")
}

/// Get the global .forgeboard directory in user home
pub fn global_forgeboard_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".forgeboard")
}

/// Path of the PRD collection file for an instance
#[inline]
pub fn prds_file(instance_path: &Path) -> PathBuf {
    forgeboard_dir(instance_path).join("prds.json")
}

/// Path of the Skill collection file for an instance
#[inline]
pub fn skills_file(instance_path: &Path) -> PathBuf {
    forgeboard_dir(instance_path).join("skills.json")
}

/// Directory holding PRD markdown bodies for an instance
#[inline]
pub fn prd_content_dir(instance_path: &Path) -> PathBuf {
    forgeboard_dir(instance_path).join("prds")
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> StoreResult<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Write bytes to a file atomically.
///
/// The bytes go to a uniquely-named temp file in the same directory, are
/// flushed to disk, and the temp file is renamed over the target. A reader
/// never observes a partial file, and any failure (including a crash before
/// the rename) leaves the previous target content intact. The temp name
/// embeds the pid plus a random suffix so concurrent writers cannot collide
/// on it.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let temp_path = temp_sibling(path);
    if let Err(e) = write_durable(&temp_path, bytes) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(StoreError::Io(e));
    }

    Ok(())
}

/// Create the file, write everything, and sync before returning
fn write_durable(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    Ok(())
}

/// Unique temp-file name next to the target, e.g. `.prds.json.1234-x7qk2p.tmp`
fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("store");
    let unique = format!(".{}.{}-{}.tmp", name, std::process::id(), rand_suffix(6));
    path.with_file_name(unique)
}

/// Random lowercase alphanumeric string for temp-file uniqueness
fn rand_suffix(len: usize) -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Read a JSON file and deserialize it; a missing file is `Ok(None)`
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::Io(e)),
    };
    Ok(Some(serde_json::from_str(&content)?))
}

/// Serialize data as pretty-printed JSON and write it atomically.
///
/// Serialization happens before any file is touched, so a failing
/// serialization leaves the target byte-identical.
pub fn write_json<T: serde::Serialize>(path: &Path, data: &T) -> StoreResult<()> {
    let content = serde_json::to_string_pretty(data)?;
    atomic_write(path, content.as_bytes())
}

/// Join a client-supplied filename under a root, refusing anything that
/// could escape it. The filename must be a single path component; the
/// joined result is checked to stay inside the root.
pub fn safe_join(root: &Path, filename: &str) -> StoreResult<PathBuf> {
    if filename.is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename == "."
        || filename == ".."
    {
        return Err(StoreError::validation(format!(
            "unsafe filename: {:?}",
            filename
        )));
    }
    let joined = root.join(filename);
    if !joined.starts_with(root) {
        return Err(StoreError::validation(format!(
            "filename escapes instance directory: {:?}",
            filename
        )));
    }
    Ok(joined)
}

/// Initialize the .forgeboard directory for an instance with .gitignore
pub fn init_instance_dir(instance_path: &Path) -> StoreResult<PathBuf> {
    let dir = forgeboard_dir(instance_path);
    ensure_dir(&dir)?;
    ensure_dir(&prd_content_dir(instance_path))?;

    // Keep lock and temp files out of version control
    let gitignore_path = dir.join(".gitignore");
    if !gitignore_path.exists() {
        let gitignore_content = r#"# Runtime files (not for sharing)
*.lock
*.tmp
"#;
        fs::write(&gitignore_path, gitignore_content)?;
    }

    Ok(dir)
}
