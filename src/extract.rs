//! DOCUMENTATION extraction from Ansible module sources.
//!
//! Ansible modules carry their documentation as a YAML string assigned to a
//! module-level `DOCUMENTATION` variable:
//!
//! ```python
//! DOCUMENTATION = r'''
//! module: ping
//! short_description: Try to connect to host
//! options: {}
//! '''
//! ```
//!
//! Conversion into [`ModuleDoc`] is lenient: only `module` is mandatory, and an
//! option field with an unexpected shape is dropped instead of failing the
//! whole module. Ansible reads these blocks as YAML 1.1, so `required` and
//! `deprecated` accept its boolean spellings (`yes`, `no`, `on`, `off`).
//!
//! Documentation fragments are not resolved: options a module inherits through
//! `extends_documentation_fragment` do not appear in its snippet, only the
//! options written in the module file itself.

use crate::model::*;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

static RE_DOCUMENTATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?ms)^DOCUMENTATION\s*=\s*[rRuU]?(?:'''(.*?)'''|"""(.*?)""")"#).unwrap()
});

/// Per-file extraction failure. The collector logs these and moves on.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid DOCUMENTATION yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("DOCUMENTATION is not a mapping")]
    NotAMapping,
    #[error("DOCUMENTATION has no `{0}` field")]
    MissingField(&'static str),
}

/// Source of module documentation records.
pub trait Extractor {
    /// `Ok(None)` means the file carries no documentation.
    fn extract(&self, path: &Path) -> Result<Option<ModuleDoc>, ExtractError>;
}

/// Reads `DOCUMENTATION` blocks out of Python module files.
pub struct PythonDocExtractor;

impl Extractor for PythonDocExtractor {
    fn extract(&self, path: &Path) -> Result<Option<ModuleDoc>, ExtractError> {
        let bytes = fs::read(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        parse_source(&String::from_utf8_lossy(&bytes))
    }
}

/// Extract the documentation record from Python module source text.
pub fn parse_source(source: &str) -> Result<Option<ModuleDoc>, ExtractError> {
    let Some(caps) = RE_DOCUMENTATION.captures(source) else {
        return Ok(None);
    };
    let body = caps
        .get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str())
        .unwrap_or_default();
    if body.trim().is_empty() {
        return Ok(None);
    }
    let value: Value = serde_yaml::from_str(body)?;
    match value {
        Value::Null => Ok(None),
        Value::Mapping(map) => module_from_yaml(&map).map(Some),
        _ => Err(ExtractError::NotAMapping),
    }
}

fn module_from_yaml(map: &Mapping) -> Result<ModuleDoc, ExtractError> {
    let module = field::<String>(map, "module").ok_or(ExtractError::MissingField("module"))?;
    let short_description = field::<String>(map, "short_description").unwrap_or_default();
    let deprecated = match map.get("deprecated") {
        None | Some(Value::Null) => false,
        Some(_) => flag(map, "deprecated") != Some(false),
    };
    let options = map
        .get("options")
        .and_then(Value::as_mapping)
        .map(|opts| {
            opts.iter()
                .filter_map(|(key, value)| {
                    let name = key.as_str()?;
                    Some(option_from_yaml(name, value))
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(ModuleDoc {
        module,
        short_description,
        options,
        collection_name: String::new(),
        deprecated,
    })
}

/// `description:` is either a single string or a list of strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum Description {
    One(String),
    Many(Vec<String>),
}

fn option_from_yaml(name: &str, value: &Value) -> OptionSpec {
    let Some(map) = value.as_mapping() else {
        return OptionSpec {
            name: name.to_string(),
            ..Default::default()
        };
    };
    let description = match field::<Description>(map, "description") {
        Some(Description::One(line)) => vec![line],
        Some(Description::Many(lines)) => lines,
        None => Vec::new(),
    };
    // Some modules spell a missing default as the Python literal
    let default = field::<DefaultValue>(map, "default")
        .filter(|d| *d != DefaultValue::Scalar(Scalar::Str("None".to_string())));

    OptionSpec {
        name: name.to_string(),
        description,
        kind: field(map, "type"),
        default,
        choices: field::<Vec<Scalar>>(map, "choices").filter(|c| !c.is_empty()),
        required: flag(map, "required").unwrap_or(false),
    }
}

/// Look up a YAML 1.1 boolean (`true`, `yes`, `on`, ...).
fn flag(map: &Mapping, key: &str) -> Option<bool> {
    field::<Scalar>(map, key).and_then(|s| s.as_flag())
}

/// Look up `key` and deserialize it, treating a wrong shape as absent.
fn field<T: DeserializeOwned>(map: &Mapping, key: &str) -> Option<T> {
    map.get(key).and_then(|v| serde_yaml::from_value(v.clone()).ok())
}
