//! Discovery of machine source files on disk.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Extension of Cyclone machine sources.
pub const SOURCE_EXTENSION: &str = "cyc";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub contents: String,
}

/// Load `root` itself when it is a file, or every `*.cyc` file below it
/// when it is a directory. Directory results are sorted by path.
pub fn load_sources(root: impl AsRef<Path>) -> Result<Vec<SourceFile>, std::io::Error> {
    let root = root.as_ref();
    if root.is_file() {
        let contents = fs::read_to_string(root)?;
        return Ok(vec![SourceFile {
            path: root.to_path_buf(),
            contents,
        }]);
    }
    if !root.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("no such file or directory: {}", root.display()),
        ));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == SOURCE_EXTENSION) {
            let contents = fs::read_to_string(path)?;
            files.push(SourceFile {
                path: path.to_path_buf(),
                contents,
            });
        }
    }
    Ok(files)
}
