//! Virtual filesystem over named mount points (spec §4.8). A logical
//! path's prefix selects a mount; anything past the mount's prefix is
//! looked up on disk, falling through to treating a file as a bundle
//! when the direct lookup misses.
//!
//! Grounded on `original_source/include/daltools/filesys/filesys.hpp` +
//! `src/filesys/filesys.cpp` (mount registration order, walk
//! interleaving folder/bundle/file visits).

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::bundle::{self, BundleRecord};
use crate::error::{DalError, DalResult};

pub trait WalkVisitor {
    fn on_folder(&mut self, path: &str);
    fn on_bundle(&mut self, path: &str, record: &BundleRecord);
    fn on_file(&mut self, path: &str);
}

pub struct Vfs {
    mounts: Vec<(String, PathBuf)>,
    bundles: RefCell<HashMap<PathBuf, BundleRecord>>,
}

impl Default for Vfs {
    fn default() -> Self {
        Self::new()
    }
}

impl Vfs {
    pub fn new() -> Self {
        Self {
            mounts: Vec::new(),
            bundles: RefCell::new(HashMap::new()),
        }
    }

    /// Registers `prefix` (e.g. `:assets`) as mapping to `real_dir`.
    /// Subsystems are searched in registration order.
    pub fn mount(&mut self, prefix: &str, real_dir: impl Into<PathBuf>) {
        self.mounts.push((prefix.to_string(), real_dir.into()));
    }

    fn candidates(&self, logical: &str) -> Vec<PathBuf> {
        self.mounts
            .iter()
            .filter_map(|(prefix, dir)| {
                logical
                    .strip_prefix(prefix.as_str())
                    .map(|rest| dir.join(rest.trim_start_matches('/')))
            })
            .collect()
    }

    pub fn is_file(&self, logical: &str) -> bool {
        self.candidates(logical).iter().any(|p| p.is_file()) || self.read_file(logical).is_ok()
    }

    pub fn list_files(&self, logical: &str) -> Vec<String> {
        let mut out = Vec::new();
        for dir in self.candidates(logical) {
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                if entry.path().is_file() {
                    if let Some(name) = entry.file_name().to_str() {
                        out.push(name.to_string());
                    }
                }
            }
        }
        out
    }

    pub fn list_folders(&self, logical: &str) -> Vec<String> {
        let mut out = Vec::new();
        for dir in self.candidates(logical) {
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                if entry.path().is_dir() {
                    if let Some(name) = entry.file_name().to_str() {
                        out.push(name.to_string());
                    }
                }
            }
        }
        out
    }

    fn ensure_bundle_registered(&self, path: &Path) -> DalResult<()> {
        if self.bundles.borrow().contains_key(path) {
            return Ok(());
        }
        let bytes = std::fs::read(path)?;
        let record = bundle::parse_bundle(&bytes)?;
        self.bundles.borrow_mut().insert(path.to_path_buf(), record);
        Ok(())
    }

    /// Direct read first; falling through to treating the logical
    /// parent as a bundle file if the direct read misses (spec §4.8).
    pub fn read_file(&self, logical: &str) -> DalResult<Vec<u8>> {
        for path in self.candidates(logical) {
            if path.is_file() {
                return Ok(std::fs::read(&path)?);
            }
        }

        let (parent, basename) = logical
            .rsplit_once('/')
            .ok_or_else(|| DalError::NameNotFound(logical.to_string()))?;

        for parent_path in self.candidates(parent) {
            if parent_path.is_file() {
                self.ensure_bundle_registered(&parent_path)?;
                let bundles = self.bundles.borrow();
                let record = bundles.get(&parent_path).expect("just registered");
                if let Some(bytes) = record.lookup(basename)? {
                    return Ok(bytes);
                }
            }
        }

        Err(DalError::NameNotFound(logical.to_string()))
    }

    /// Depth-first walk: directories recurse, a file whose bytes begin
    /// with the DALBUNDLE magic is entered via its item list rather
    /// than descended as a directory, everything else is a plain file.
    pub fn walk(&self, root: &str, visitor: &mut dyn WalkVisitor) -> DalResult<()> {
        for real_root in self.candidates(root) {
            self.walk_real(root, &real_root, visitor)?;
        }
        Ok(())
    }

    fn walk_real(&self, logical: &str, real: &Path, visitor: &mut dyn WalkVisitor) -> DalResult<()> {
        if real.is_dir() {
            visitor.on_folder(logical);
            let mut entries: Vec<_> = std::fs::read_dir(real)?.flatten().collect();
            entries.sort_by_key(|e| e.file_name());
            for entry in entries {
                let name = entry.file_name().to_string_lossy().into_owned();
                let child_logical = format!("{}/{name}", logical.trim_end_matches('/'));
                let child_path = entry.path();

                if child_path.is_dir() {
                    self.walk_real(&child_logical, &child_path, visitor)?;
                } else {
                    let head = std::fs::read(&child_path)?;
                    if bundle::has_bundle_magic(&head) {
                        self.ensure_bundle_registered(&child_path)?;
                        let bundles = self.bundles.borrow();
                        let record = bundles.get(&child_path).expect("just registered");
                        visitor.on_bundle(&child_logical, record);
                    } else {
                        visitor.on_file(&child_logical);
                    }
                }
            }
        } else if real.is_file() {
            let bytes = std::fs::read(real)?;
            if bundle::has_bundle_magic(&bytes) {
                self.ensure_bundle_registered(real)?;
                let bundles = self.bundles.borrow();
                let record = bundles.get(real).expect("just registered");
                visitor.on_bundle(logical, record);
            } else {
                visitor.on_file(logical);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::build_bundle;

    #[derive(Default)]
    struct Collector {
        folders: Vec<String>,
        files: Vec<String>,
        bundles: Vec<String>,
    }

    impl WalkVisitor for Collector {
        fn on_folder(&mut self, path: &str) {
            self.folders.push(path.to_string());
        }
        fn on_bundle(&mut self, path: &str, _record: &BundleRecord) {
            self.bundles.push(path.to_string());
        }
        fn on_file(&mut self, path: &str) {
            self.files.push(path.to_string());
        }
    }

    #[test]
    fn reads_direct_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hello").unwrap();

        let mut vfs = Vfs::new();
        vfs.mount(":assets", dir.path());

        assert!(vfs.is_file(":assets/a.txt"));
        assert_eq!(vfs.read_file(":assets/a.txt").unwrap(), b"hello");
    }

    #[test]
    fn falls_through_to_bundle_contents() {
        let dir = tempfile::tempdir().unwrap();
        let bundle_bytes = build_bundle(&[("inner.bin".to_string(), vec![9u8, 9])]).unwrap();
        std::fs::write(dir.path().join("pack.bundle"), &bundle_bytes).unwrap();

        let mut vfs = Vfs::new();
        vfs.mount(":assets", dir.path());

        let bytes = vfs.read_file(":assets/pack.bundle/inner.bin").unwrap();
        assert_eq!(bytes, vec![9, 9]);
    }

    #[test]
    fn missing_path_is_name_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut vfs = Vfs::new();
        vfs.mount(":assets", dir.path());
        assert!(matches!(
            vfs.read_file(":assets/nope.txt"),
            Err(DalError::NameNotFound(_))
        ));
    }

    #[test]
    fn walk_enters_bundle_without_descending_as_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("plain.txt"), b"x").unwrap();
        let bundle_bytes = build_bundle(&[("inner.bin".to_string(), vec![1u8])]).unwrap();
        std::fs::write(dir.path().join("pack.bundle"), &bundle_bytes).unwrap();

        let mut vfs = Vfs::new();
        vfs.mount(":assets", dir.path());

        let mut collector = Collector::default();
        vfs.walk(":assets", &mut collector).unwrap();

        assert!(collector.files.iter().any(|f| f.ends_with("plain.txt")));
        assert!(collector.bundles.iter().any(|b| b.ends_with("pack.bundle")));
    }
}
