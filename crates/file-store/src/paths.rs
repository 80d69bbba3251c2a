use crate::error::{Result, StoreError};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Directory under the workspace root that holds agent state (the vector index snapshot).
/// Never listed and never reachable through store operations.
pub const STATE_DIR_NAME: &str = ".file-agent";

const TMP_MARKER: &str = ".tmp-";

/// A path that has been proven to live inside the workspace root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedPath {
    /// Canonical absolute location (symbolic links in existing ancestors resolved).
    pub absolute: PathBuf,
    /// Sandbox-relative key with `/` separators and no `.`/`..` segments.
    pub relative: String,
}

/// Temporary files left by [`crate::FileStore`] writes: `.<name>.tmp-XXXX`.
pub fn is_temp_artifact(file_name: &str) -> bool {
    file_name.starts_with('.') && file_name.contains(TMP_MARKER)
}

pub(crate) fn temp_prefix(file_name: &str) -> String {
    format!(".{file_name}{TMP_MARKER}")
}

/// Requests often arrive quoted (`'notes.txt'`) or padded; strip that before resolving.
fn clean_input(raw: &str) -> &str {
    raw.trim()
        .trim_matches(|c: char| c == '\'' || c == '"')
        .trim()
}

/// Join `input` to `root` and fold `.`/`..` segments without touching the file system.
fn normalize_lexically(root: &Path, input: &Path) -> PathBuf {
    let joined = root.join(input);
    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                out.push(component.as_os_str());
            }
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
        }
    }
    out
}

/// Canonicalize the deepest existing ancestor of `path` and re-attach the missing tail.
fn canonicalize_existing_prefix(path: &Path, display: &str) -> Result<PathBuf> {
    let mut missing: Vec<OsString> = Vec::new();
    let mut cursor = path.to_path_buf();
    loop {
        match cursor.canonicalize() {
            Ok(canonical) => {
                let mut full = canonical;
                for name in missing.iter().rev() {
                    full.push(name);
                }
                return Ok(full);
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                if cursor
                    .symlink_metadata()
                    .map(|meta| meta.file_type().is_symlink())
                    .unwrap_or(false)
                {
                    return Err(StoreError::invalid(display, "dangling symbolic link"));
                }
                let Some(name) = cursor.file_name().map(|n| n.to_os_string()) else {
                    return Err(StoreError::PathEscape {
                        path: display.to_string(),
                    });
                };
                missing.push(name);
                if !cursor.pop() {
                    return Err(StoreError::PathEscape {
                        path: display.to_string(),
                    });
                }
            }
            Err(err) => return Err(StoreError::io(display, err)),
        }
    }
}

fn relative_key(root: &Path, absolute: &Path) -> Option<String> {
    let rel = absolute.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            _ => return None,
        }
    }
    Some(parts.join("/"))
}

/// True when the last component of `raw` is itself a symbolic link.
pub(crate) fn leaf_is_symlink(root: &Path, raw: &str) -> bool {
    normalize_lexically(root, Path::new(clean_input(raw)))
        .symlink_metadata()
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false)
}

/// Resolve `raw` against the canonical `root`.
pub(crate) fn resolve(root: &Path, raw: &str) -> Result<ResolvedPath> {
    let cleaned = clean_input(raw);
    if cleaned.is_empty() {
        return Err(StoreError::invalid(raw, "path is empty"));
    }
    if cleaned.contains('\0') {
        return Err(StoreError::invalid(raw, "path contains a NUL byte"));
    }

    let lexical = normalize_lexically(root, Path::new(cleaned));
    if !lexical.starts_with(root) {
        return Err(StoreError::PathEscape {
            path: cleaned.to_string(),
        });
    }

    let absolute = canonicalize_existing_prefix(&lexical, cleaned)?;
    if !absolute.starts_with(root) {
        log::warn!(
            "Rejected '{cleaned}': resolves to {} outside {}",
            absolute.display(),
            root.display()
        );
        return Err(StoreError::PathEscape {
            path: cleaned.to_string(),
        });
    }

    let relative = relative_key(root, &absolute).ok_or_else(|| StoreError::PathEscape {
        path: cleaned.to_string(),
    })?;
    if relative.is_empty() {
        return Err(StoreError::invalid(cleaned, "path names the workspace root"));
    }
    if relative.split('/').next() == Some(STATE_DIR_NAME) {
        return Err(StoreError::ReservedPath {
            path: cleaned.to_string(),
        });
    }

    Ok(ResolvedPath { absolute, relative })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn root() -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let canonical = temp.path().canonicalize().unwrap();
        (temp, canonical)
    }

    #[test]
    fn normalizes_dot_segments_into_a_stable_key() {
        let (_temp, root) = root();
        let resolved = resolve(&root, "./docs/../notes/./a.txt").unwrap();
        assert_eq!(resolved.relative, "notes/a.txt");
        assert_eq!(resolved.absolute, root.join("notes").join("a.txt"));
    }

    #[test]
    fn strips_quotes_and_whitespace() {
        let (_temp, root) = root();
        let resolved = resolve(&root, "  'recipe.txt' ").unwrap();
        assert_eq!(resolved.relative, "recipe.txt");
    }

    #[test]
    fn rejects_parent_traversal() {
        let (_temp, root) = root();
        let err = resolve(&root, "../outside.txt").unwrap_err();
        assert!(matches!(err, StoreError::PathEscape { .. }), "{err:?}");
        let err = resolve(&root, "a/../../outside.txt").unwrap_err();
        assert!(matches!(err, StoreError::PathEscape { .. }), "{err:?}");
    }

    #[test]
    fn traversal_that_lands_back_inside_is_allowed() {
        let (_temp, root) = root();
        let name = root.file_name().unwrap().to_string_lossy().into_owned();
        let resolved = resolve(&root, &format!("../{name}/inside.txt")).unwrap();
        assert_eq!(resolved.relative, "inside.txt");
    }

    #[test]
    fn rejects_absolute_paths_outside_root() {
        let (_temp, root) = root();
        let err = resolve(&root, "/etc/passwd").unwrap_err();
        assert!(matches!(err, StoreError::PathEscape { .. }), "{err:?}");
    }

    #[test]
    fn absolute_path_inside_root_is_accepted() {
        let (_temp, root) = root();
        let inside = root.join("x.txt");
        let resolved = resolve(&root, inside.to_str().unwrap()).unwrap();
        assert_eq!(resolved.relative, "x.txt");
    }

    #[test]
    fn rejects_root_and_empty_paths() {
        let (_temp, root) = root();
        assert!(matches!(
            resolve(&root, "   ").unwrap_err(),
            StoreError::InvalidPath { .. }
        ));
        assert!(matches!(
            resolve(&root, ".").unwrap_err(),
            StoreError::InvalidPath { .. }
        ));
        assert!(matches!(
            resolve(&root, "a/..").unwrap_err(),
            StoreError::InvalidPath { .. }
        ));
    }

    #[test]
    fn rejects_state_directory() {
        let (_temp, root) = root();
        let err = resolve(&root, ".file-agent/index.json").unwrap_err();
        assert!(matches!(err, StoreError::ReservedPath { .. }), "{err:?}");
    }

    #[test]
    fn temp_artifact_names() {
        assert!(is_temp_artifact(&format!("{}abc123", temp_prefix("a.txt"))));
        assert!(!is_temp_artifact("a.txt"));
        assert!(!is_temp_artifact(".hidden"));
    }
}
