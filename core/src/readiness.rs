//! Decides whether a result directory is waiting to be compiled, from a plain
//! listing of its entries so the rule can be checked without a filesystem.

use std::fs;
use std::io;
use std::path::Path;

use crate::prelude::{EngineConfig, RESULT_DIR_SUFFIX};

/// Names of the immediate entries of one directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryListing {
    pub files: Vec<String>,
    pub directories: Vec<String>,
}

impl DirectoryListing {
    pub fn new<F, D>(files: F, directories: D) -> Self
    where
        F: IntoIterator,
        F::Item: Into<String>,
        D: IntoIterator,
        D::Item: Into<String>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            directories: directories.into_iter().map(Into::into).collect(),
        }
    }

    /// List `path` non-recursively. Entries with non UTF-8 names are ignored.
    pub fn read(path: &Path) -> io::Result<Self> {
        let mut listing = Self::default();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if entry.file_type()?.is_dir() {
                listing.directories.push(name);
            } else {
                listing.files.push(name);
            }
        }
        listing.files.sort();
        listing.directories.sort();
        Ok(listing)
    }
}

/// True when the directory holds raw per-wavelength exports but no compiled table yet.
pub fn needs_compilation(listing: &DirectoryListing, config: &EngineConfig) -> bool {
    let has_output = listing
        .files
        .iter()
        .any(|name| name.ends_with(&config.output_suffix));
    let has_raw_data = listing
        .directories
        .iter()
        .any(|name| name.ends_with(&config.raw_dir_suffix));
    has_raw_data && !has_output
}

/// True for a per-run result directory name (`*.sirslt`).
pub fn is_result_directory(name: &str) -> bool {
    name.ends_with(RESULT_DIR_SUFFIX)
}
