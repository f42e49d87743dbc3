use super::uploads::decode_base64;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Content of one bundle entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "encoding", content = "content", rename_all = "lowercase")]
pub enum FileContent {
    Text(String),
    /// Binary payload carried as standard base64 text.
    Base64(String),
}

impl FileContent {
    /// The textual form shown to users and editors.
    pub fn as_str(&self) -> &str {
        match self {
            FileContent::Text(s) | FileContent::Base64(s) => s,
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, FileContent::Base64(_))
    }

    /// Raw bytes as they should land on disk; base64 payloads are decoded.
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        match self {
            FileContent::Text(s) => Ok(s.clone().into_bytes()),
            FileContent::Base64(s) => {
                decode_base64(s).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
            }
        }
    }
}

impl From<String> for FileContent {
    fn from(s: String) -> Self {
        FileContent::Text(s)
    }
}

impl From<&str> for FileContent {
    fn from(s: &str) -> Self {
        FileContent::Text(s.to_string())
    }
}

/// The complete set of generated files, keyed by path relative to the
/// simulation root. Iteration order is the lexicographic path order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputBundle {
    files: BTreeMap<String, FileContent>,
}

impl OutputBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an entry.
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<FileContent>) {
        self.files.insert(path.into(), content.into());
    }

    /// Inserts an entry only if the path is still free. Returns whether it was inserted.
    pub fn insert_if_absent(
        &mut self,
        path: impl Into<String>,
        content: impl Into<FileContent>,
    ) -> bool {
        let path = path.into();
        if self.files.contains_key(&path) {
            return false;
        }
        self.files.insert(path, content.into());
        true
    }

    pub fn get(&self, path: &str) -> Option<&FileContent> {
        self.files.get(path)
    }

    pub fn text(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(FileContent::as_str)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn remove(&mut self, path: &str) -> Option<FileContent> {
        self.files.remove(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FileContent)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Writes every entry beneath `root`, creating directories as needed.
    ///
    /// Entries whose path would escape `root` are rejected.
    pub fn write_to_dir(&self, root: &Path) -> io::Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.files.len());
        for (relative, content) in &self.files {
            let target = safe_join(root, relative)?;
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, content.to_bytes()?)?;
            written.push(target);
        }
        Ok(written)
    }
}

impl<'a> IntoIterator for &'a OutputBundle {
    type Item = (&'a String, &'a FileContent);
    type IntoIter = std::collections::btree_map::Iter<'a, String, FileContent>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

fn safe_join(root: &Path, relative: &str) -> io::Result<PathBuf> {
    let rel = Path::new(relative);
    let escapes = rel
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if relative.is_empty() || escapes {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("bundle path '{}' is not a plain relative path", relative),
        ));
    }
    Ok(root.join(rel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::uploads::encode_base64;
    use tempfile::tempdir;

    #[test]
    fn insert_if_absent_keeps_existing_entry() {
        let mut bundle = OutputBundle::new();
        assert!(bundle.insert_if_absent("cMD/p.pdb", "uploaded"));
        assert!(!bundle.insert_if_absent("cMD/p.pdb", "placeholder"));
        assert_eq!(bundle.text("cMD/p.pdb"), Some("uploaded"));
    }

    #[test]
    fn paths_iterate_in_lexicographic_order() {
        let mut bundle = OutputBundle::new();
        bundle.insert("west.cfg", "");
        bundle.insert("bstates/bstates.txt", "");
        bundle.insert("env.sh", "");
        let paths: Vec<_> = bundle.paths().collect();
        assert_eq!(paths, vec!["bstates/bstates.txt", "env.sh", "west.cfg"]);
    }

    #[test]
    fn write_to_dir_decodes_binary_entries() {
        let dir = tempdir().unwrap();
        let mut bundle = OutputBundle::new();
        bundle.insert("common_files/p.prmtop", FileContent::Base64(encode_base64(&[1, 2, 255])));
        bundle.insert("westpa_scripts/runseg.sh", "#!/bin/bash\n");

        let written = bundle.write_to_dir(dir.path()).unwrap();

        assert_eq!(written.len(), 2);
        assert_eq!(
            fs::read(dir.path().join("common_files/p.prmtop")).unwrap(),
            vec![1, 2, 255]
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("westpa_scripts/runseg.sh")).unwrap(),
            "#!/bin/bash\n"
        );
    }

    #[test]
    fn write_to_dir_rejects_escaping_paths() {
        let dir = tempdir().unwrap();
        let mut bundle = OutputBundle::new();
        bundle.insert("../outside.txt", "nope");
        let err = bundle.write_to_dir(dir.path()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn malformed_base64_entry_is_invalid_data() {
        let binary = FileContent::Base64("not base64!".into());
        assert!(binary.is_binary());
        assert_eq!(binary.as_str(), "not base64!");
        assert_eq!(
            binary.to_bytes().unwrap_err().kind(),
            io::ErrorKind::InvalidData
        );
    }
}
