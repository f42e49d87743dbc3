//! Auxiliary files that every bundle carries besides the rendered templates.
//!
//! These are helper scripts, AMBER input decks, basis-state files and
//! documentation that the generator does not render itself. Each one is looked
//! up through a [`FallbackSource`]; when no source has it, a minimal
//! placeholder is synthesized so the bundle layout is always complete.

use super::uploads::{UploadKind, Uploads};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Supplies existing content for auxiliary files by relative bundle path.
pub trait FallbackSource {
    /// Returns the file content if this source has it.
    fn read(&self, relative: &str) -> Option<String>;
}

/// A source that never has anything; every auxiliary file becomes a placeholder.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFallback;

impl FallbackSource for NoFallback {
    fn read(&self, _relative: &str) -> Option<String> {
        None
    }
}

/// Looks files up beneath an ordered list of root directories; the first root
/// containing the path wins.
#[derive(Debug, Clone, Default)]
pub struct SearchPaths {
    roots: Vec<PathBuf>,
}

impl SearchPaths {
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            roots: roots.into_iter().collect(),
        }
    }

    pub fn push(&mut self, root: impl Into<PathBuf>) {
        self.roots.push(root.into());
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

impl FallbackSource for SearchPaths {
    fn read(&self, relative: &str) -> Option<String> {
        self.roots.iter().find_map(|root| {
            let candidate = root.join(relative);
            match read_ignoring_invalid_utf8(&candidate) {
                Some(content) => {
                    debug!("Using existing auxiliary file {:?}", candidate);
                    Some(content)
                }
                None => {
                    trace!("Auxiliary file not found at {:?}", candidate);
                    None
                }
            }
        })
    }
}

impl<T: FallbackSource + ?Sized> FallbackSource for &T {
    fn read(&self, relative: &str) -> Option<String> {
        (**self).read(relative)
    }
}

fn read_ignoring_invalid_utf8(path: &Path) -> Option<String> {
    if !path.is_file() {
        return None;
    }
    let bytes = fs::read(path).ok()?;
    Some(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).replace('\u{FFFD}', ""),
    })
}

/// Which family of placeholder an auxiliary file falls back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// Executable helpers: a shell or Python stub that announces itself.
    Script,
    /// Simulation inputs: structure, topology, restart or a generic comment.
    Data,
    /// Documentation and notes: a comment, or a Python stub for `.py` files.
    Document,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuxiliaryFile {
    pub path: String,
    pub style: PlaceholderStyle,
}

impl AuxiliaryFile {
    fn new(path: impl Into<String>, style: PlaceholderStyle) -> Self {
        Self {
            path: path.into(),
            style,
        }
    }

    pub fn placeholder(&self) -> String {
        placeholder(&self.path, self.style)
    }
}

const TOP_LEVEL_SCRIPTS: [&str; 7] = [
    "run_data.sh",
    "run.sh",
    "reweight-2d.sh",
    "node.sh",
    "init.sh",
    "simtime.py",
    "data_extract.py",
];

const WESTPA_HELPERS: [&str; 4] = [
    "westpa_scripts/cat_trajectory.py",
    "westpa_scripts/gen_istate.sh",
    "westpa_scripts/post_iter.sh",
    "westpa_scripts/tar_segs.sh",
];

const DOCUMENTS: [&str; 7] = [
    "README.md",
    "CHANGELOG.md",
    "LICENSE",
    "PyReweighting-2D.py",
    "quick_start.py",
    "nodefilelist.txt",
    "tstate.file",
];

/// Lists every auxiliary path the bundle must contain, given what was uploaded.
///
/// Structure, topology and restart slots are omitted when an upload already
/// fills them. A structure placeholder is also skipped when only coordinates
/// (`inpcrd`) were uploaded, since the run scripts then reference those.
pub fn auxiliary_files(
    protein_name: &str,
    uploads: &Uploads,
    rst_as_bstate: bool,
) -> Vec<AuxiliaryFile> {
    use PlaceholderStyle::*;

    let needs_structure = !(uploads.contains(UploadKind::Pdb) || uploads.contains(UploadKind::Inpcrd));
    let needs_topology = !uploads.contains(UploadKind::Prmtop);
    let has_rst = uploads.contains(UploadKind::Rst);

    let mut files: Vec<AuxiliaryFile> = TOP_LEVEL_SCRIPTS
        .iter()
        .map(|p| AuxiliaryFile::new(*p, Script))
        .collect();

    for dir in ["common_files", "cMD"] {
        let decks: &[&str] = if dir == "common_files" {
            &["gamd-restart.dat", "md_init.in", "md.in"]
        } else {
            &["md.in", "md_cmd.in"]
        };
        files.extend(
            decks
                .iter()
                .map(|name| AuxiliaryFile::new(format!("{}/{}", dir, name), Data)),
        );
        if needs_structure {
            files.push(AuxiliaryFile::new(
                format!("{}/{}.pdb", dir, protein_name),
                Data,
            ));
        }
        if needs_topology {
            files.push(AuxiliaryFile::new(
                format!("{}/{}.prmtop", dir, protein_name),
                Data,
            ));
        }
    }
    if !has_rst {
        files.push(AuxiliaryFile::new(
            format!("cMD/{}.rst", protein_name),
            Data,
        ));
    }

    files.extend(
        ["bstates/bstate_cpptraj.rst", "bstates/bstates.txt", "bstates/md.rst"]
            .iter()
            .map(|p| AuxiliaryFile::new(*p, Data)),
    );
    if !(has_rst && rst_as_bstate) {
        files.push(AuxiliaryFile::new("bstates/bstate.rst", Data));
    }

    files.extend(WESTPA_HELPERS.iter().map(|p| AuxiliaryFile::new(*p, Script)));
    files.extend(DOCUMENTS.iter().map(|p| AuxiliaryFile::new(*p, Document)));
    files
}

/// Minimal stand-in content for an auxiliary file nobody supplied.
pub fn placeholder(path: &str, style: PlaceholderStyle) -> String {
    let is_python = path.ends_with(".py");
    match style {
        PlaceholderStyle::Script | PlaceholderStyle::Document if is_python => format!(
            "#!/usr/bin/env python3\n# {path}\nprint('Running {path}')\n",
            path = path
        ),
        PlaceholderStyle::Script => format!(
            "#!/bin/bash\n# {path}\necho 'Running {path}'\n",
            path = path
        ),
        PlaceholderStyle::Data if path.ends_with(".pdb") => {
            "# Placeholder PDB file\n# Upload your protein structure here\n".to_string()
        }
        PlaceholderStyle::Data if path.ends_with(".prmtop") => {
            "# Placeholder PRMTOP file\n# Upload your topology file here\n".to_string()
        }
        PlaceholderStyle::Data if path.ends_with(".rst") => {
            "# Placeholder restart file\n".to_string()
        }
        PlaceholderStyle::Data | PlaceholderStyle::Document => {
            format!("# Placeholder {}\n", path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn paths(files: &[AuxiliaryFile]) -> Vec<&str> {
        files.iter().map(|f| f.path.as_str()).collect()
    }

    #[test]
    fn without_uploads_every_slot_is_listed() {
        let files = auxiliary_files("chignolin", &Uploads::new(), false);
        let paths = paths(&files);
        for expected in [
            "run.sh",
            "simtime.py",
            "common_files/gamd-restart.dat",
            "common_files/chignolin.pdb",
            "common_files/chignolin.prmtop",
            "cMD/md_cmd.in",
            "cMD/chignolin.pdb",
            "cMD/chignolin.prmtop",
            "cMD/chignolin.rst",
            "bstates/bstate.rst",
            "bstates/bstates.txt",
            "westpa_scripts/tar_segs.sh",
            "PyReweighting-2D.py",
            "tstate.file",
        ] {
            assert!(paths.contains(&expected), "missing {}", expected);
        }
        assert_eq!(files.len(), 7 + 5 + 4 + 1 + 4 + 4 + 7);
    }

    #[test]
    fn uploaded_slots_are_not_listed() {
        let uploads = Uploads::new()
            .with(UploadKind::Inpcrd, vec![1])
            .with(UploadKind::Prmtop, vec![2])
            .with(UploadKind::Rst, vec![3]);
        let files = auxiliary_files("villin", &uploads, true);
        let paths = paths(&files);
        assert!(!paths.iter().any(|p| p.ends_with(".pdb")));
        assert!(!paths.iter().any(|p| p.ends_with(".prmtop")));
        assert!(!paths.contains(&"cMD/villin.rst"));
        assert!(!paths.contains(&"bstates/bstate.rst"));
        assert!(paths.contains(&"bstates/md.rst"));
    }

    #[test]
    fn rst_not_used_as_bstate_keeps_bstate_placeholder() {
        let uploads = Uploads::new().with(UploadKind::Rst, vec![3]);
        let files = auxiliary_files("villin", &uploads, false);
        let paths = paths(&files);
        assert!(paths.contains(&"bstates/bstate.rst"));
        assert!(!paths.contains(&"cMD/villin.rst"));
    }

    #[test]
    fn placeholders_follow_style_and_extension() {
        assert_eq!(
            placeholder("node.sh", PlaceholderStyle::Script),
            "#!/bin/bash\n# node.sh\necho 'Running node.sh'\n"
        );
        assert_eq!(
            placeholder("westpa_scripts/cat_trajectory.py", PlaceholderStyle::Script),
            "#!/usr/bin/env python3\n# westpa_scripts/cat_trajectory.py\nprint('Running westpa_scripts/cat_trajectory.py')\n"
        );
        assert!(placeholder("cMD/p.pdb", PlaceholderStyle::Data).contains("Placeholder PDB file"));
        assert!(
            placeholder("common_files/p.prmtop", PlaceholderStyle::Data)
                .contains("Placeholder PRMTOP file")
        );
        assert_eq!(
            placeholder("bstates/md.rst", PlaceholderStyle::Data),
            "# Placeholder restart file\n"
        );
        assert_eq!(
            placeholder("cMD/md.in", PlaceholderStyle::Data),
            "# Placeholder cMD/md.in\n"
        );
        assert_eq!(
            placeholder("LICENSE", PlaceholderStyle::Document),
            "# Placeholder LICENSE\n"
        );
        assert!(placeholder("quick_start.py", PlaceholderStyle::Document).starts_with("#!/usr/bin/env python3"));
    }

    #[test]
    fn search_paths_prefer_earlier_roots() {
        let first = tempdir().unwrap();
        let second = tempdir().unwrap();
        fs::create_dir_all(second.path().join("westpa_scripts")).unwrap();
        fs::write(second.path().join("westpa_scripts/post_iter.sh"), "second").unwrap();
        fs::write(second.path().join("run.sh"), "second").unwrap();
        fs::write(first.path().join("run.sh"), "first").unwrap();

        let source = SearchPaths::new([first.path().to_path_buf(), second.path().to_path_buf()]);

        assert_eq!(source.read("run.sh").as_deref(), Some("first"));
        assert_eq!(
            source.read("westpa_scripts/post_iter.sh").as_deref(),
            Some("second")
        );
        assert_eq!(source.read("README.md"), None);
        assert_eq!(NoFallback.read("run.sh"), None);
    }

    #[test]
    fn search_paths_drop_invalid_utf8_sequences() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("tstate.file"), b"bin \xff\xfe edge\n").unwrap();
        let source = SearchPaths::new([dir.path().to_path_buf()]);
        assert_eq!(source.read("tstate.file").as_deref(), Some("bin  edge\n"));
    }

    #[test]
    fn directories_are_not_mistaken_for_files() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("LICENSE")).unwrap();
        let source = SearchPaths::new([dir.path().to_path_buf()]);
        assert_eq!(source.read("LICENSE"), None);
    }
}
