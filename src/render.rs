//! Output serializers
//!
//! Renders a materialized [`SecretTree`] to the text formats the generated
//! config file supports. The line-based formats are strictly flat: any
//! nested branch in the tree is a structural mismatch and fails the render
//! before a single byte reaches disk.

use crate::error::AppError;
use crate::tree::{SecretTree, SecretValue};
use std::fmt;
use std::str::FromStr;

/// Supported serialization formats for the generated file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// `KEY='value'` lines
    Env,
    /// `export KEY='value'` lines, sourceable from a shell
    Export,
    /// Nested TOML document
    Toml,
}

impl OutputFormat {
    /// Whether the format can represent nested branches
    pub fn supports_nesting(&self) -> bool {
        matches!(self, OutputFormat::Toml)
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "env" => Ok(OutputFormat::Env),
            "export" => Ok(OutputFormat::Export),
            "toml" => Ok(OutputFormat::Toml),
            other => Err(format!(
                "unknown output format '{}', expected one of: env, export, toml",
                other
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Env => write!(f, "env"),
            OutputFormat::Export => write!(f, "export"),
            OutputFormat::Toml => write!(f, "toml"),
        }
    }
}

/// Serialize `tree` in the requested format
///
/// An empty tree renders as an empty document in every format.
pub fn render(tree: &SecretTree, format: OutputFormat) -> Result<String, AppError> {
    match format {
        OutputFormat::Env => render_lines(tree, format, ""),
        OutputFormat::Export => render_lines(tree, format, "export "),
        OutputFormat::Toml => render_toml(tree),
    }
}

/// Render one `KEY='value'` line per scalar
///
/// Keys and values are whitespace-trimmed and values are single-quoted
/// without escaping, so a value containing a single quote produces a line a
/// shell would misread. Matching what consumers of these files expect beats
/// quoting correctness here.
fn render_lines(tree: &SecretTree, format: OutputFormat, prefix: &str) -> Result<String, AppError> {
    let mut out = String::new();
    for (key, value) in tree {
        match value {
            SecretValue::Scalar(scalar) => {
                out.push_str(prefix);
                out.push_str(key.trim());
                out.push_str("='");
                out.push_str(scalar.trim());
                out.push_str("'\n");
            }
            SecretValue::Branch(_) => {
                return Err(AppError::SerializationMismatch {
                    format: format.to_string(),
                    detail: format!("key '{}' holds a nested branch", key),
                });
            }
        }
    }
    Ok(out)
}

fn render_toml(tree: &SecretTree) -> Result<String, AppError> {
    toml::to_string(tree).map_err(|e| AppError::SerializationMismatch {
        format: OutputFormat::Toml.to_string(),
        detail: e.to_string(),
    })
}
