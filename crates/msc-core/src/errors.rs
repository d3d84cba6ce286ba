//! Failures raised while building time trees and running the coordinated
//! operators. Each carries a stable code to branch on and a context map
//! naming the offending nodes and heights.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Diagnostic payload: a stable code plus the tree values that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Kebab-case code such as `height-order` or `invalid-beta`.
    pub code: String,
    /// One-line description of the failure.
    pub message: String,
    /// Offending values keyed by name, e.g. `node`, `child_height`, `tree_index`.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Suggested remedy, when there is an obvious one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Starts a diagnostic with no context or hint.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Records an offending value; a repeated key overwrites the earlier one.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Attaches a suggested remedy.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Error returned by tree construction, parsing and the MCMC operators.
///
/// Serializes as `{"family": ..., "detail": ...}` so run reports can embed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum MscError {
    /// Malformed tree, such as a duplicate leaf label or a node sitting below
    /// its child.
    #[error("tree error: {0}")]
    Tree(ErrorInfo),
    /// Settings refused before a run starts, such as a non-positive `beta`.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Operator state or inputs it cannot move, such as an unseeded slack
    /// accumulator or a rate vector whose length changed.
    #[error("operator error: {0}")]
    Operator(ErrorInfo),
    /// Newick text that could not be read.
    #[error("parse error: {0}")]
    Parse(ErrorInfo),
    /// Invalid exponential rate or draw.
    #[error("rng error: {0}")]
    Rng(ErrorInfo),
    /// Config or tree files that failed to load or save.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl MscError {
    /// Adds a context entry without changing the family.
    pub fn with_context(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        match self {
            MscError::Tree(info) => MscError::Tree(info.with_context(key, value)),
            MscError::Config(info) => MscError::Config(info.with_context(key, value)),
            MscError::Operator(info) => MscError::Operator(info.with_context(key, value)),
            MscError::Parse(info) => MscError::Parse(info.with_context(key, value)),
            MscError::Rng(info) => MscError::Rng(info.with_context(key, value)),
            MscError::Serde(info) => MscError::Serde(info.with_context(key, value)),
        }
    }

    /// The diagnostic, whatever the family.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            MscError::Tree(info)
            | MscError::Config(info)
            | MscError::Operator(info)
            | MscError::Parse(info)
            | MscError::Rng(info)
            | MscError::Serde(info) => info,
        }
    }
}
