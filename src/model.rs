//! Data model for extracted module documentation — renderer-agnostic.

use serde::Deserialize;
use std::fmt;

/// Documentation of a single Ansible module.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleDoc {
    /// `module:` key, the unqualified module name
    pub module: String,
    pub short_description: String,
    /// Options in the order they appear in the DOCUMENTATION block
    pub options: Vec<OptionSpec>,
    /// `core` for built-in modules, `namespace.collection` otherwise
    pub collection_name: String,
    pub deprecated: bool,
}

impl ModuleDoc {
    /// Tag the record with the collection it was found in.
    pub fn in_collection(mut self, collection_name: impl Into<String>) -> Self {
        self.collection_name = collection_name.into();
        self
    }

    /// Compare everything except the collection tag.
    pub fn same_documentation(&self, other: &ModuleDoc) -> bool {
        self.module == other.module
            && self.short_description == other.short_description
            && self.options == other.options
            && self.deprecated == other.deprecated
    }

    /// Fully qualified collection name, e.g. `community.general.ufw`.
    pub fn fqcn(&self) -> String {
        if self.collection_name.is_empty() {
            return self.module.clone();
        }
        format!("{}.{}", self.collection_name, self.module)
    }
}

/// A documented module option.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionSpec {
    pub name: String,
    pub description: Vec<String>,
    /// `type:` key (`str`, `bool`, `list`, `path`, ...)
    pub kind: Option<String>,
    pub default: Option<DefaultValue>,
    /// Never `Some(vec![])`; an empty choice list is stored as `None`
    pub choices: Option<Vec<Scalar>>,
    pub required: bool,
}

impl OptionSpec {
    pub fn is_bool(&self) -> bool {
        self.kind.as_deref() == Some("bool")
    }
}

/// A scalar YAML value as it appears in `default:` or `choices:`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Scalar {
    /// Interpret the value as a YAML 1.1 boolean, the schema Ansible loads
    /// DOCUMENTATION with (`yes`, `On`, `FALSE`, ...).
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            Scalar::Str(s) => match s.as_str() {
                "true" | "True" | "TRUE" | "yes" | "Yes" | "YES" | "on" | "On" | "ON" => {
                    Some(true)
                }
                "false" | "False" | "FALSE" | "no" | "No" | "NO" | "off" | "Off" | "OFF" => {
                    Some(false)
                }
                _ => None,
            },
            _ => None,
        }
    }

    /// Equality that treats YAML 1.1 boolean spellings of the same value as equal.
    pub fn matches(&self, other: &Scalar) -> bool {
        if self == other {
            return true;
        }
        match (self.as_flag(), other.as_flag()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            // Debug keeps the trailing `.0` on whole floats
            Scalar::Float(x) => write!(f, "{:?}", x),
            Scalar::Str(s) => f.write_str(s),
        }
    }
}

/// `default:` of an option: a scalar or a list of scalars.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Scalar(Scalar),
    List(Vec<Scalar>),
}

impl DefaultValue {
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            DefaultValue::Scalar(s) => s.as_flag(),
            DefaultValue::List(_) => None,
        }
    }
}
