//! Error types for table loading, name lookup and node evaluation.
//!
//! Load-time problems are fatal and collected into [`LoadErrors`] so a broken
//! table reports every offending name at once. Runtime problems never escape
//! an evaluation: they become a [`RuntimeFault`] attached to the failing node.

use std::fmt;

use super::node::Namespace;

/// A single problem found while loading or resolving the node tables.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadError {
    #[error("node in {namespace} has no NAME property")]
    MissingName { namespace: Namespace },

    #[error("duplicate node name '{name}' in {namespace}")]
    DuplicateName { namespace: Namespace, name: String },

    #[error("node '{name}' has unknown kind '{kind}'")]
    UnknownKind { name: String, kind: String },

    #[error("node '{name}' does not accept property '{property}'")]
    UnknownProperty { name: String, property: String },

    #[error("node '{name}' is missing required property '{property}'")]
    MissingProperty { name: String, property: String },

    #[error("node '{name}' has invalid property '{property}': {reason}")]
    InvalidProperty {
        name: String,
        property: String,
        reason: String,
    },

    #[error("node '{name}' has non-numeric child key '{key}'")]
    InvalidChildKey { name: String, key: String },

    #[error("'{from}' in {namespace} references unknown node '{target}'")]
    Unresolved {
        namespace: Namespace,
        from: String,
        target: String,
    },

    #[error("reference cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("actor template '{0}' is declared twice")]
    DuplicateTemplate(String),

    #[error("node '{name}' spawns unknown actor template '{template}'")]
    UnknownTemplate { name: String, template: String },

    #[error("key binding for '{key}' in template '{template}' is invalid: {reason}")]
    InvalidBinding {
        template: String,
        key: String,
        reason: String,
    },
}

/// Every load error found in one pass over the tables.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadErrors(pub Vec<LoadError>);

impl std::error::Error for LoadErrors {}

impl fmt::Display for LoadErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} load error(s)", self.0.len())?;
        for error in &self.0 {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

impl LoadErrors {
    /// Names mentioned by the errors, for quick assertions and reporting.
    pub fn offending_names(&self) -> Vec<String> {
        self.0
            .iter()
            .filter_map(|e| match e {
                LoadError::MissingName { .. } => None,
                LoadError::DuplicateName { name, .. }
                | LoadError::UnknownKind { name, .. }
                | LoadError::UnknownProperty { name, .. }
                | LoadError::MissingProperty { name, .. }
                | LoadError::InvalidProperty { name, .. }
                | LoadError::InvalidChildKey { name, .. } => Some(name.clone()),
                LoadError::Unresolved { target, .. } => Some(target.clone()),
                LoadError::Cycle(path) => path.first().cloned(),
                LoadError::DuplicateTemplate(name) => Some(name.clone()),
                LoadError::UnknownTemplate { template, .. } => Some(template.clone()),
                LoadError::InvalidBinding { key, .. } => Some(key.clone()),
            })
            .collect()
    }
}

/// Lookup of a node name that is not present in the requested namespace.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LookupError {
    #[error("no node named '{name}' in {namespace}")]
    NameNotFound { namespace: Namespace, name: String },

    #[error("no actor template named '{0}'")]
    TemplateNotFound(String),
}

/// Variable store failures. Callers turn these into node failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VariableError {
    #[error("variable '{0}' not found")]
    VariableNotFound(String),

    #[error("variable '{name}' holds {found}, expected {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("cannot combine {current} with {operand} in '{name}'")]
    InvalidOperation {
        name: String,
        current: &'static str,
        operand: &'static str,
    },
}

/// A fault raised while evaluating a node. Degrades the node to Failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeFault {
    #[error(transparent)]
    Variable(#[from] VariableError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("dynamic reference '*{variable}' does not name a node")]
    DynamicTarget { variable: String },

    #[error("evaluation exceeded the depth limit of {0}")]
    DepthExceeded(usize),

    #[error("comparison between {0} and {1} is not supported")]
    Incomparable(&'static str, &'static str),

    #[error("invalid {property}: {reason}")]
    InvalidParameter {
        property: &'static str,
        reason: String,
    },
}

/// A fault tied to the node that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeFault {
    pub node: String,
    pub fault: RuntimeFault,
}

impl fmt::Display for NodeFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node '{}': {}", self.node, self.fault)
    }
}

/// Failure to read a table document from disk.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("failed to read tables: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse tables: {0}")]
    Json(#[from] serde_json::Error),
}
