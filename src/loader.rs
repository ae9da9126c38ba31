//! This module loads automata from files, picking the parser from the file extension
//! (`.dfa`, `.nfa`, `.regex`, `.cfg`, `.tm`).

use crate::automaton::{Automaton, Formalism};
use crate::config::EngineConfig;
use crate::parser::parse;
use crate::types::AutomatonError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loads a single automaton from the specified file path.
///
/// # Arguments
///
/// * `path` - The source file. Its extension selects the formalism.
/// * `config` - Limits and switches passed on to the parser.
///
/// # Returns
///
/// * `Ok(Automaton)` if the file is read and parsed successfully.
/// * `Err(AutomatonError::FileError)` if the extension is not recognized or the file cannot be read.
/// * `Err(AutomatonError::Parse)` if the content is not a valid source.
pub fn load_automaton(path: &Path, config: &EngineConfig) -> Result<Automaton, AutomatonError> {
    let formalism = Formalism::from_extension(path).ok_or_else(|| {
        AutomatonError::FileError(format!(
            "Cannot tell the formalism of {} from its extension",
            path.display()
        ))
    })?;

    load_automaton_as(path, formalism, config)
}

/// Loads an automaton from `path`, parsing it as `formalism` whatever the extension says.
pub fn load_automaton_as(
    path: &Path,
    formalism: Formalism,
    config: &EngineConfig,
) -> Result<Automaton, AutomatonError> {
    let content = fs::read_to_string(path).map_err(|e| {
        AutomatonError::FileError(format!("Failed to read file {}: {}", path.display(), e))
    })?;

    debug!(path = %path.display(), %formalism, "loading automaton");
    parse(formalism, &content, config)
}

/// Loads every file with a recognized extension from a directory.
///
/// Directories and files with other extensions are skipped. Each element of the result
/// is either the loaded automaton with its path or the error that stopped it. Entries are
/// sorted by path.
pub fn load_directory(
    directory: &Path,
    config: &EngineConfig,
) -> Vec<Result<(PathBuf, Automaton), AutomatonError>> {
    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) => {
            return vec![Err(AutomatonError::FileError(format!(
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
            Ok(entry) => paths.push(entry.path()),
            Err(e) => results.push(Err(AutomatonError::FileError(format!(
                "Failed to read directory entry: {}",
                e
            )))),
        }
    }
    paths.sort();

    results.extend(
        paths
            .into_iter()
            .filter(|path| !path.is_dir() && Formalism::from_extension(path).is_some())
            .map(|path| match load_automaton(&path, config) {
                Ok(automaton) => Ok((path, automaton)),
                Err(AutomatonError::FileError(message)) => Err(AutomatonError::FileError(message)),
                Err(e) => Err(AutomatonError::FileError(format!(
                    "Failed to load automaton from {}: {}",
                    path.display(),
                    e
                ))),
            }),
    );
    results
}
