use crate::error::{Result, StoreError};
use crate::paths::{self, is_temp_artifact, ResolvedPath, STATE_DIR_NAME};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::{Builder, NamedTempFile};
use walkdir::WalkDir;

/// Sandboxed view over one workspace directory.
///
/// Policies:
/// - `create` is strict: it never overwrites an existing file.
/// - `update` is a full overwrite of an existing file.
/// - `delete` of an absent file fails with [`StoreError::NotFound`].
/// - `update`, `append` and `delete` refuse a path whose last component is a
///   symbolic link; reads follow links that stay inside the root.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (and create when missing) the workspace rooted at `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let display = root.display().to_string();
        fs::create_dir_all(root).map_err(|err| StoreError::io(&display, err))?;
        let root = root
            .canonicalize()
            .map_err(|err| StoreError::io(&display, err))?;
        log::info!("File store rooted at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory reserved for agent state under the root.
    pub fn state_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR_NAME)
    }

    /// Resolve a requested path, rejecting anything outside the sandbox.
    pub fn resolve(&self, path: &str) -> Result<ResolvedPath> {
        paths::resolve(&self.root, path)
    }

    pub fn exists(&self, path: &str) -> Result<bool> {
        let resolved = self.resolve(path)?;
        Ok(resolved.absolute.is_file())
    }

    /// Resolve `path` and check it names an existing regular file.
    pub fn require_file(&self, path: &str) -> Result<ResolvedPath> {
        let resolved = self.resolve(path)?;
        self.ensure_file(&resolved)?;
        Ok(resolved)
    }

    /// Create a new file. Parent directories are created as needed.
    pub fn create(&self, path: &str, content: &str) -> Result<ResolvedPath> {
        let resolved = self.resolve(path)?;
        if resolved.absolute.symlink_metadata().is_ok() {
            return Err(StoreError::AlreadyExists {
                path: resolved.relative,
            });
        }
        if let Some(parent) = resolved.absolute.parent() {
            fs::create_dir_all(parent).map_err(|err| StoreError::io(&resolved.relative, err))?;
        }

        let tmp = self.write_temp(&resolved, content)?;
        tmp.persist_noclobber(&resolved.absolute).map_err(|err| {
            if err.error.kind() == ErrorKind::AlreadyExists {
                StoreError::AlreadyExists {
                    path: resolved.relative.clone(),
                }
            } else {
                StoreError::io(&resolved.relative, err.error)
            }
        })?;

        log::debug!("Created '{}' ({} bytes)", resolved.relative, content.len());
        Ok(resolved)
    }

    pub fn read(&self, path: &str) -> Result<String> {
        let resolved = self.resolve(path)?;
        self.read_resolved(&resolved)
    }

    pub(crate) fn read_resolved(&self, resolved: &ResolvedPath) -> Result<String> {
        self.ensure_file(resolved)?;
        let bytes = fs::read(&resolved.absolute).map_err(|err| match err.kind() {
            ErrorKind::NotFound => StoreError::NotFound {
                path: resolved.relative.clone(),
            },
            _ => StoreError::io(&resolved.relative, err),
        })?;
        String::from_utf8(bytes).map_err(|_| StoreError::InvalidUtf8 {
            path: resolved.relative.clone(),
        })
    }

    /// Resolve a path about to be modified in place.
    fn resolve_mutable(&self, path: &str) -> Result<ResolvedPath> {
        let resolved = self.resolve(path)?;
        if paths::leaf_is_symlink(&self.root, path) {
            return Err(StoreError::invalid(
                path.trim(),
                "symbolic links cannot be modified",
            ));
        }
        Ok(resolved)
    }

    /// Replace the whole content of an existing file.
    pub fn update(&self, path: &str, content: &str) -> Result<ResolvedPath> {
        let resolved = self.resolve_mutable(path)?;
        self.ensure_file(&resolved)?;

        let tmp = self.write_temp(&resolved, content)?;
        tmp.persist(&resolved.absolute)
            .map_err(|err| StoreError::io(&resolved.relative, err.error))?;

        log::debug!("Updated '{}' ({} bytes)", resolved.relative, content.len());
        Ok(resolved)
    }

    /// Append to an existing file. The result is written atomically like `update`.
    pub fn append(&self, path: &str, content: &str) -> Result<ResolvedPath> {
        let resolved = self.resolve_mutable(path)?;
        let mut combined = self.read_resolved(&resolved)?;
        combined.push_str(content);

        let tmp = self.write_temp(&resolved, &combined)?;
        tmp.persist(&resolved.absolute)
            .map_err(|err| StoreError::io(&resolved.relative, err.error))?;

        log::debug!("Appended {} bytes to '{}'", content.len(), resolved.relative);
        Ok(resolved)
    }

    pub fn delete(&self, path: &str) -> Result<ResolvedPath> {
        let resolved = self.resolve_mutable(path)?;
        self.ensure_file(&resolved)?;
        fs::remove_file(&resolved.absolute).map_err(|err| match err.kind() {
            ErrorKind::NotFound => StoreError::NotFound {
                path: resolved.relative.clone(),
            },
            _ => StoreError::io(&resolved.relative, err),
        })?;
        log::debug!("Deleted '{}'", resolved.relative);
        Ok(resolved)
    }

    /// Sorted sandbox-relative paths of every regular file in the workspace.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !(entry.depth() == 1 && entry.file_name() == STATE_DIR_NAME));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log::warn!("Failed to read workspace entry: {err}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if entry
                .file_name()
                .to_str()
                .is_some_and(is_temp_artifact)
            {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let key = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            files.push(key);
        }

        files.sort();
        Ok(files)
    }

    fn ensure_file(&self, resolved: &ResolvedPath) -> Result<()> {
        match fs::metadata(&resolved.absolute) {
            Ok(meta) if meta.is_file() => Ok(()),
            Ok(_) => Err(StoreError::NotAFile {
                path: resolved.relative.clone(),
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(StoreError::NotFound {
                path: resolved.relative.clone(),
            }),
            Err(err) => Err(StoreError::io(&resolved.relative, err)),
        }
    }

    fn write_temp(&self, resolved: &ResolvedPath, content: &str) -> Result<NamedTempFile> {
        let dir = resolved
            .absolute
            .parent()
            .ok_or_else(|| StoreError::invalid(&resolved.relative, "path has no parent"))?;
        let file_name = resolved
            .absolute
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut tmp = Builder::new()
            .prefix(&paths::temp_prefix(&file_name))
            .tempfile_in(dir)
            .map_err(|err| StoreError::io(&resolved.relative, err))?;
        tmp.write_all(content.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|err| StoreError::io(&resolved.relative, err))?;
        Ok(tmp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn store() -> (TempDir, FileStore) {
        let temp = TempDir::new().unwrap();
        let store = FileStore::open(temp.path().join("workspace")).unwrap();
        (temp, store)
    }

    #[test]
    fn list_on_empty_workspace() {
        let (_temp, store) = store();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn create_then_read_round_trips() {
        let (_temp, store) = store();
        store.create("foo.txt", "hello").unwrap();
        assert_eq!(store.read("foo.txt").unwrap(), "hello");
    }

    #[test]
    fn create_is_strict() {
        let (_temp, store) = store();
        store.create("foo.txt", "first").unwrap();
        let err = store.create("foo.txt", "second").unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }), "{err:?}");
        assert_eq!(store.read("foo.txt").unwrap(), "first");
    }

    #[test]
    fn create_makes_parent_directories() {
        let (_temp, store) = store();
        store.create("a/b/c.txt", "deep").unwrap();
        assert_eq!(store.list().unwrap(), vec!["a/b/c.txt".to_string()]);
    }

    #[test]
    fn update_overwrites_existing_content() {
        let (_temp, store) = store();
        store.create("foo.txt", "hello").unwrap();
        store.update("foo.txt", "bye").unwrap();
        assert_eq!(store.read("foo.txt").unwrap(), "bye");
    }

    #[test]
    fn update_missing_file_fails() {
        let (_temp, store) = store();
        let err = store.update("missing.txt", "x").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }), "{err:?}");
        assert!(!store.exists("missing.txt").unwrap());
    }

    #[test]
    fn append_extends_existing_content() {
        let (_temp, store) = store();
        store.create("log.txt", "one\n").unwrap();
        store.append("log.txt", "two\n").unwrap();
        assert_eq!(store.read("log.txt").unwrap(), "one\ntwo\n");

        let err = store.append("nope.txt", "x").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }), "{err:?}");
    }

    #[test]
    fn delete_then_read_is_not_found() {
        let (_temp, store) = store();
        store.create("bar.txt", "data").unwrap();
        store.delete("bar.txt").unwrap();
        assert!(matches!(
            store.read("bar.txt").unwrap_err(),
            StoreError::NotFound { .. }
        ));
        assert!(!store.list().unwrap().contains(&"bar.txt".to_string()));
    }

    #[test]
    fn delete_of_absent_file_fails_every_time() {
        let (_temp, store) = store();
        for _ in 0..3 {
            let err = store.delete("ghost.txt").unwrap_err();
            assert!(matches!(err, StoreError::NotFound { .. }), "{err:?}");
        }
    }

    #[test]
    fn directories_are_not_files() {
        let (_temp, store) = store();
        store.create("dir/inner.txt", "x").unwrap();
        assert!(matches!(
            store.read("dir").unwrap_err(),
            StoreError::NotAFile { .. }
        ));
        assert!(matches!(
            store.delete("dir").unwrap_err(),
            StoreError::NotAFile { .. }
        ));
    }

    #[test]
    fn non_utf8_content_is_reported() {
        let (_temp, store) = store();
        fs::write(store.root().join("bin.dat"), [0xff, 0xfe, 0x00]).unwrap();
        assert!(matches!(
            store.read("bin.dat").unwrap_err(),
            StoreError::InvalidUtf8 { .. }
        ));
    }

    #[test]
    fn list_skips_state_dir_and_temp_files() {
        let (_temp, store) = store();
        store.create("b.txt", "b").unwrap();
        store.create("a.txt", "a").unwrap();
        fs::create_dir_all(store.state_dir()).unwrap();
        fs::write(store.state_dir().join("index.json"), "{}").unwrap();
        fs::write(store.root().join(".a.txt.tmp-123"), "partial").unwrap();

        assert_eq!(
            store.list().unwrap(),
            vec!["a.txt".to_string(), "b.txt".to_string()]
        );
    }

    #[test]
    fn writes_leave_no_temp_files_behind() {
        let (_temp, store) = store();
        store.create("x.txt", "1").unwrap();
        store.update("x.txt", "2").unwrap();
        let names: Vec<String> = fs::read_dir(store.root())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["x.txt".to_string()]);
    }
}
