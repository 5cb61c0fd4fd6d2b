//! ConfigFS file operations for USB Gadget

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// USB device version
pub const USB_BCD_DEVICE: u16 = 0x0100;

/// USB spec version (USB 2.0)
pub const USB_BCD_USB: u16 = 0x0200;

/// A failed ConfigFS operation
#[derive(Error, Debug)]
#[error("Failed to {action} {}: {source}", .path.display())]
pub struct FsError {
    pub action: &'static str,
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl FsError {
    fn new(action: &'static str, path: &Path, source: io::Error) -> Self {
        Self {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Find the first USB Device Controller listed under `udc_class_path`
pub fn find_udc(udc_class_path: &Path) -> Option<String> {
    fs::read_dir(udc_class_path)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .next()
}

/// Write a sysfs attribute
///
/// The kernel parses the value on the first write() call, so the newline
/// is appended to the buffer and the whole value goes out in one write.
/// The file is truncated like a shell redirect, so a shorter value fully
/// replaces a longer one.
pub fn write_file(path: &Path, content: &str) -> Result<(), FsError> {
    let mut file = OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(path)
        .or_else(|e| {
            if path.exists() {
                Err(e)
            } else {
                File::create(path)
            }
        })
        .map_err(|e| FsError::new("open", path, e))?;

    let mut data = content.as_bytes().to_vec();
    if !content.ends_with('\n') {
        data.push(b'\n');
    }

    file.write_all(&data)
        .map_err(|e| FsError::new("write", path, e))?;
    file.flush().map_err(|e| FsError::new("flush", path, e))
}

/// Write binary content to a file
pub fn write_bytes(path: &Path, data: &[u8]) -> Result<(), FsError> {
    let mut file = File::create(path).map_err(|e| FsError::new("create", path, e))?;
    file.write_all(data)
        .map_err(|e| FsError::new("write", path, e))
}

/// Read a trimmed attribute value
pub fn read_file(path: &Path) -> Result<String, FsError> {
    fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|e| FsError::new("read", path, e))
}

pub fn create_dir(path: &Path) -> Result<(), FsError> {
    fs::create_dir_all(path).map_err(|e| FsError::new("create directory", path, e))
}

pub fn remove_dir(path: &Path) -> Result<(), FsError> {
    if path.exists() {
        fs::remove_dir(path).map_err(|e| FsError::new("remove directory", path, e))?;
    }
    Ok(())
}

pub fn remove_file(path: &Path) -> Result<(), FsError> {
    if path.symlink_metadata().is_ok() {
        fs::remove_file(path).map_err(|e| FsError::new("remove file", path, e))?;
    }
    Ok(())
}

/// Create symlink `dest` pointing at `src`
pub fn create_symlink(src: &Path, dest: &Path) -> Result<(), FsError> {
    std::os::unix::fs::symlink(src, dest).map_err(|e| FsError::new("create symlink", dest, e))
}
