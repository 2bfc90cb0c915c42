//! Target definitions and property expansion.

use serde::Deserialize;

/// A named unit of work in a project.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Target {
    /// Name used to request the target.
    pub name: String,
    /// Targets that run first, in order.
    #[serde(default)]
    pub depends: Vec<String>,
    /// Lines logged when the target runs. `${name}` expands to a property and
    /// `${ref:name}` to a reference.
    #[serde(default)]
    pub echo: Vec<String>,
    /// When set, the target fails with this message after logging.
    #[serde(default)]
    pub fail: Option<String>,
}

impl Target {
    /// Creates a target with no dependencies or output.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            depends: Vec::new(),
            echo: Vec::new(),
            fail: None,
        }
    }

    /// Adds a dependency.
    #[must_use]
    pub fn depends_on(mut self, target: impl Into<String>) -> Self {
        self.depends.push(target.into());
        self
    }

    /// Adds an output line.
    #[must_use]
    pub fn echo(mut self, line: impl Into<String>) -> Self {
        self.echo.push(line.into());
        self
    }

    /// Makes the target fail with `message`.
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.fail = Some(message.into());
        self
    }
}

/// Replaces each `${name}` with `lookup(name)`; unknown names stay verbatim.
pub(crate) fn expand<'a>(text: &str, lookup: impl Fn(&str) -> Option<&'a str>) -> String {
    let mut expanded = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        let (before, tail) = rest.split_at(start);
        expanded.push_str(before);
        let Some(end) = tail.find('}') else {
            expanded.push_str(tail);
            return expanded;
        };
        let (placeholder, after) = tail.split_at(end + 1);
        let name = placeholder
            .strip_prefix("${")
            .and_then(|inner| inner.strip_suffix('}'))
            .unwrap_or_default();
        match lookup(name) {
            Some(value) => expanded.push_str(value),
            None => expanded.push_str(placeholder),
        }
        rest = after;
    }
    expanded.push_str(rest);
    expanded
}
