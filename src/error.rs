//! Typed errors for the grading engine
//!
//! Caller input problems never surface here; the prerequisite gate turns
//! them into ordinary findings. Errors of this type mean a catalog bug
//! (a rule's detect/validate failed) or a bad engine invocation, and they
//! propagate uncaught to the caller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GradeError {
    /// A rule's own code failed; the engine does not mask catalog bugs
    /// as grading findings.
    #[error("rule '{rule_id}' failed during {phase}: {source}")]
    Rule {
        rule_id: String,
        phase: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// The caller asked to score a rule id the catalog does not contain.
    #[error("unknown rule id '{0}'")]
    UnknownRule(String),
}
