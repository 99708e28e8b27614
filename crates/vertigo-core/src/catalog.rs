//! Experiment catalog loading.
//!
//! A catalog file is a YAML list of entries:
//!
//! ```yaml
//! - file: valid.psyexp
//!   name: Valid experiment
//!   resources: [stimuli/a.png, stimuli/b.png]
//!   parameters: [participant, session]
//! ```
//!
//! Paths are resolved relative to the catalog file's directory. Missing
//! files do not fail the load; they are reported on the descriptor as
//! [`ValidationIssue`]s so the console can show them.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};
use vertigo_types::{Catalog, Experiment, ValidationIssue};

use crate::config::ConfigError;

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    file: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    resources: Vec<String>,
    #[serde(default)]
    parameters: Vec<String>,
}

/// Load the catalog file at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read and
/// [`ConfigError::Yaml`] if it is not a list of catalog entries.
pub fn load(path: &Path) -> Result<Catalog, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let catalog = parse(&contents, base)?;
    debug!(path = %path.display(), experiments = catalog.len(), "Catalog loaded");
    Ok(catalog)
}

/// Parse catalog YAML, checking files against `base`.
///
/// # Errors
///
/// Returns [`ConfigError::Yaml`] if `yaml` is not a list of catalog
/// entries.
pub fn parse(yaml: &str, base: &Path) -> Result<Catalog, ConfigError> {
    let entries: Vec<CatalogEntry> = if yaml.trim().is_empty() {
        Vec::new()
    } else {
        serde_yml::from_str(yaml)?
    };
    Ok(entries
        .into_iter()
        .map(|entry| {
            let experiment = describe(entry, base);
            (experiment.key.clone(), experiment)
        })
        .collect())
}

fn describe(entry: CatalogEntry, base: &Path) -> Experiment {
    let mut errors = Vec::new();

    if !base.join(&entry.file).is_file() {
        warn!(file = entry.file, "Experiment file missing");
        errors.push(ValidationIssue {
            title: String::from("Experiment file not found"),
            detail: format!("'{}' does not exist", entry.file),
        });
    }

    let resources: BTreeMap<String, bool> = entry
        .resources
        .into_iter()
        .map(|resource| {
            let found = base.join(&resource).exists();
            (resource, found)
        })
        .collect();
    for (resource, _) in resources.iter().filter(|(_, found)| !**found) {
        errors.push(ValidationIssue {
            title: String::from("Missing resource"),
            detail: format!("'{resource}' required by '{}' was not found", entry.file),
        });
    }

    let name = entry.name.unwrap_or_else(|| file_stem(&entry.file));
    Experiment {
        key: entry.file,
        name,
        resources,
        parameters: entry.parameters,
        errors,
    }
}

fn file_stem(file: &str) -> String {
    Path::new(file)
        .file_stem()
        .map_or_else(|| file.to_owned(), |stem| stem.to_string_lossy().into_owned())
}
