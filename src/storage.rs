use std::path::{Component, Path, PathBuf};

/// Resolve a requested file name to a path directly inside `root`.
///
/// Only a single plain file name is accepted. Anything with a separator, a
/// `.`/`..` component, a drive prefix or a NUL byte returns `None`.
pub fn resolve_in_root(root: &Path, name: &str) -> Option<PathBuf> {
    if name.is_empty() || name.contains(['/', '\\', '\0']) {
        return None;
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == name => Some(root.join(part)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_resolve_inside_root() {
        let root = Path::new("/srv/files");
        assert_eq!(
            resolve_in_root(root, "File1.zip"),
            Some(PathBuf::from("/srv/files/File1.zip"))
        );
        assert_eq!(
            resolve_in_root(root, "..hidden"),
            Some(PathBuf::from("/srv/files/..hidden"))
        );
    }

    #[test]
    fn escapes_are_rejected() {
        let root = Path::new("/srv/files");
        for name in [
            "",
            ".",
            "..",
            "../secret",
            "../../etc/passwd",
            "/etc/passwd",
            "sub/File1.zip",
            "..\\windows",
            "C:\\boot.ini",
            "name\0.zip",
        ] {
            assert_eq!(resolve_in_root(root, name), None, "{name:?} should be rejected");
        }
    }
}
