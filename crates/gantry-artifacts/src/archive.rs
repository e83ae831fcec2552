//! Zip archive writer
//!
//! Entries are written with a fixed timestamp and in the order they are
//! added, so the same inputs always produce the same bytes.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use gantry_core::AssemblyError;

/// Incrementally writes one zip archive
pub struct ArchiveWriter {
    path: PathBuf,
    zip: ZipWriter<BufWriter<File>>,
    entries: Vec<String>,
    seen: HashSet<String>,
}

impl ArchiveWriter {
    /// Create (or truncate) the archive at `path`
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, AssemblyError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)?;
        Ok(Self {
            zip: ZipWriter::new(BufWriter::new(file)),
            path,
            entries: Vec::new(),
            seen: HashSet::new(),
        })
    }

    fn options() -> SimpleFileOptions {
        SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default())
    }

    fn archive_error(&self, reason: impl ToString) -> AssemblyError {
        AssemblyError::Archive {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    /// Add in-memory content. Returns false when the entry already exists.
    pub fn add_bytes(&mut self, name: &str, data: &[u8]) -> Result<bool, AssemblyError> {
        if !self.seen.insert(name.to_string()) {
            warn!(archive = %self.path.display(), entry = name, "duplicate archive entry skipped");
            return Ok(false);
        }

        self.zip
            .start_file(name, Self::options())
            .map_err(|e| self.archive_error(e))?;
        self.zip.write_all(data)?;
        self.entries.push(name.to_string());
        Ok(true)
    }

    /// Add a file from disk under `name`
    pub fn add_file(&mut self, name: &str, source: &Path) -> Result<bool, AssemblyError> {
        if self.seen.contains(name) {
            warn!(archive = %self.path.display(), entry = name, "duplicate archive entry skipped");
            return Ok(false);
        }
        self.seen.insert(name.to_string());

        self.zip
            .start_file(name, Self::options())
            .map_err(|e| self.archive_error(e))?;
        let mut file = File::open(source)?;
        std::io::copy(&mut file, &mut self.zip)?;
        self.entries.push(name.to_string());
        Ok(true)
    }

    /// Add every file below `dir`, named `<prefix><relative path>`.
    ///
    /// Returns the number of entries added.
    pub fn add_dir(&mut self, prefix: &str, dir: &Path) -> Result<usize, AssemblyError> {
        let mut added = 0;
        for (relative, path) in list_files(dir)? {
            let name = format!("{}{}", prefix, relative);
            if self.add_file(&name, &path)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Entries written so far
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Finish the archive, returning its entry names
    pub fn finish(mut self) -> Result<Vec<String>, AssemblyError> {
        let writer = self.zip.finish().map_err(|e| AssemblyError::Archive {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        writer
            .into_inner()
            .map_err(|e| AssemblyError::Io(e.into_error()))?
            .sync_all()?;

        debug!(archive = %self.path.display(), entries = self.entries.len(), "archive written");
        Ok(self.entries)
    }
}

/// Files below `dir` as (`/`-separated relative path, absolute path), sorted
pub fn list_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, AssemblyError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| AssemblyError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| AssemblyError::Archive {
                path: entry.path().to_path_buf(),
                reason: e.to_string(),
            })?
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        files.push((relative, entry.path().to_path_buf()));
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read_entries(path: &Path) -> Vec<String> {
        let archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        archive.file_names().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_add_dir_is_sorted() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("include");
        std::fs::create_dir_all(src.join("lsp")).unwrap();
        std::fs::write(src.join("zeta.h"), "z").unwrap();
        std::fs::write(src.join("lsp").join("alpha.h"), "a").unwrap();

        let out = temp.path().join("out.jar");
        let mut writer = ArchiveWriter::create(&out).unwrap();
        assert_eq!(writer.add_dir("include/", &src).unwrap(), 2);
        let entries = writer.finish().unwrap();

        assert_eq!(entries, vec!["include/lsp/alpha.h", "include/zeta.h"]);
        let mut on_disk = read_entries(&out);
        on_disk.sort();
        assert_eq!(on_disk, entries);
    }

    #[test]
    fn test_duplicate_entries_skipped() {
        let temp = TempDir::new().unwrap();
        let mut writer = ArchiveWriter::create(temp.path().join("a.zip")).unwrap();

        assert!(writer.add_bytes("a.txt", b"one").unwrap());
        assert!(!writer.add_bytes("a.txt", b"two").unwrap());
        assert_eq!(writer.finish().unwrap(), vec!["a.txt"]);
    }

    #[test]
    fn test_output_is_reproducible() {
        let temp = TempDir::new().unwrap();
        let write = |name: &str| {
            let path = temp.path().join(name);
            let mut writer = ArchiveWriter::create(&path).unwrap();
            writer.add_bytes("lib/x86/libnative.so", b"binary").unwrap();
            writer.finish().unwrap();
            std::fs::read(path).unwrap()
        };

        assert_eq!(write("first.zip"), write("second.zip"));
    }
}
