//! TOML project file format.
//!
//! ```toml
//! name = "demo"
//! default = "dist"
//!
//! [properties]
//! version = "1.2"
//!
//! [references]
//! classpath = "lib/core.jar"
//!
//! [[target]]
//! name = "compile"
//! echo = ["compiling ${version} against ${ref:classpath}"]
//!
//! [[target]]
//! name = "dist"
//! depends = ["compile"]
//! ```

use std::collections::BTreeMap;
use std::fs;

use camino::Utf8Path;
use serde::Deserialize;

use super::ProjectError;
use super::target::Target;

/// Parsed contents of a project file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ProjectFile {
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) default: Option<String>,
    #[serde(default)]
    pub(crate) properties: BTreeMap<String, String>,
    #[serde(default)]
    pub(crate) references: BTreeMap<String, String>,
    #[serde(default, rename = "target")]
    pub(crate) targets: Vec<Target>,
}

impl ProjectFile {
    pub(crate) fn read(path: &Utf8Path) -> Result<Self, ProjectError> {
        let text = fs::read_to_string(path).map_err(|source| ProjectError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(path, &text)
    }

    pub(crate) fn parse(path: &Utf8Path, text: &str) -> Result<Self, ProjectError> {
        toml::from_str(text).map_err(|source| ProjectError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Project name, falling back to the file stem.
    pub(crate) fn name_or(&self, path: &Utf8Path) -> String {
        self.name
            .clone()
            .or_else(|| path.file_stem().map(str::to_owned))
            .unwrap_or_else(|| String::from("project"))
    }
}
