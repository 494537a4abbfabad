//! This module provides the `DescriptionLoader` struct, responsible for loading machine
//! descriptions from files, directories and in-memory strings.

use crate::parser::{parse_with, Description};
use crate::types::{Glyphs, NdtmError};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// File extension of machine description files.
pub const DESCRIPTION_EXTENSION: &str = "ndtm";

/// `DescriptionLoader` is a utility struct for loading machine descriptions.
pub struct DescriptionLoader;

impl DescriptionLoader {
    /// Loads a single description from the specified file path.
    ///
    /// # Returns
    ///
    /// * `Ok(Description)` if the file is successfully read and parsed.
    /// * `Err(NdtmError::FileError)` if the file cannot be read.
    /// * `Err(NdtmError::ParseError)` or `Err(NdtmError::ValidationError)` if the content
    ///   is not a valid description.
    pub fn load_file(path: &Path, glyphs: Glyphs) -> Result<Description, NdtmError> {
        let content = fs::read_to_string(path).map_err(|e| {
            NdtmError::FileError(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        debug!("loaded {} bytes from {}", content.len(), path.display());
        parse_with(&content, glyphs)
    }

    /// Loads a description from string content, e.g. one piped through standard input.
    pub fn load_str(content: &str, glyphs: Glyphs) -> Result<Description, NdtmError> {
        parse_with(content, glyphs)
    }

    /// Loads every `.ndtm` file of a directory.
    ///
    /// Sub-directories and files with other extensions are skipped. Results come back
    /// sorted by path, one per candidate file.
    pub fn load_dir(
        directory: &Path,
        glyphs: Glyphs,
    ) -> Vec<Result<(PathBuf, Description), NdtmError>> {
        if !directory.exists() {
            return vec![Err(NdtmError::FileError(format!(
                "Directory {} does not exist",
                directory.display()
            )))];
        }

        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![Err(NdtmError::FileError(format!(
                    "Failed to read directory {}: {}",
                    directory.display(),
                    e
                )))]
            }
        };

        let mut paths = Vec::new();
        let mut results = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file()
                        && path
                            .extension()
                            .is_some_and(|ext| ext == DESCRIPTION_EXTENSION)
                    {
                        paths.push(path);
                    }
                }
                Err(e) => results.push(Err(NdtmError::FileError(format!(
                    "Failed to read directory entry: {}",
                    e
                )))),
            }
        }
        paths.sort();

        results.extend(paths.into_iter().map(|path| {
            match Self::load_file(&path, glyphs) {
                Ok(description) => Ok((path, description)),
                Err(e) => Err(NdtmError::FileError(format!(
                    "Failed to load description from {}: {}",
                    path.display(),
                    e
                ))),
            }
        }));
        results
    }
}
