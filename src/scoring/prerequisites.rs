//! Prerequisite gate
//!
//! Structural integrity checks plus the catalog's gating rules, run
//! before anything is scored. Failures accumulate so a caller sees the
//! complete list of blocking issues in one pass; a non-empty failure
//! list means the pipeline must stop and return a zero/F grade.
//!
//! Caller input errors (missing or malformed document root) surface here
//! as ordinary structural findings, never as errors: grading always
//! completes with a result object.

use crate::document::Document;
use crate::error::GradeError;
use crate::models::{Finding, Severity};
use crate::rules::Catalog;
use tracing::{debug, info};

/// Structural check ids, reported as finding rule ids
pub const STRUCT_VERSION_FIELD: &str = "STRUCT-VERSION-FIELD";
pub const STRUCT_TITLE: &str = "STRUCT-TITLE";
pub const STRUCT_INFO_VERSION: &str = "STRUCT-INFO-VERSION";
pub const STRUCT_PATHS: &str = "STRUCT-PATHS";
pub const STRUCT_OPERATIONS: &str = "STRUCT-OPERATIONS";

/// Outcome of the gate
#[derive(Debug, Clone, Default)]
pub struct PrerequisiteResult {
    pub passed: bool,
    pub failures: Vec<Finding>,
    /// One actionable fix per failure, deduplicated
    pub required_fixes: Vec<String>,
}

/// Runs structural checks and prerequisite rules
pub struct PrerequisiteGate<'a> {
    catalog: &'a Catalog,
}

impl<'a> PrerequisiteGate<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Check the document. Never stops at the first failure.
    pub fn check(&self, document: &Document) -> Result<PrerequisiteResult, GradeError> {
        let mut failures: Vec<Finding> = Vec::new();
        let mut required_fixes: Vec<String> = Vec::new();

        let mut structural = |rule_id: &str, location: &str, message: &str, fix: &str| {
            let mut finding = Finding::new(rule_id, Severity::Prerequisite, message, location);
            finding.fix_hint = Some(fix.to_string());
            failures.push(finding);
            required_fixes.push(fix.to_string());
        };

        if document.version().is_none() {
            structural(
                STRUCT_VERSION_FIELD,
                "openapi",
                "document declares no openapi version field",
                "add a top-level openapi version field",
            );
        }
        if document.title().is_none() {
            structural(
                STRUCT_TITLE,
                "info/title",
                "document has no title",
                "add info.title",
            );
        }
        if document.info_version().is_none() {
            structural(
                STRUCT_INFO_VERSION,
                "info/version",
                "document has no version",
                "add info.version",
            );
        }
        if document.paths().next().is_none() {
            structural(
                STRUCT_PATHS,
                "paths",
                "document defines no paths",
                "define at least one path",
            );
        } else if document.operations().is_empty() {
            structural(
                STRUCT_OPERATIONS,
                "paths",
                "document defines no operations",
                "define at least one operation under a path",
            );
        }

        // Gating rules: every target of every prerequisite rule, with no
        // short-circuit, so the failure list is complete.
        for rule in self.catalog.prerequisite_rules() {
            let targets = rule.detect(document).map_err(|source| GradeError::Rule {
                rule_id: rule.id().to_string(),
                phase: "detect",
                source,
            })?;
            debug!("Prerequisite {}: {} targets", rule.id(), targets.len());
            for target in &targets {
                let result =
                    rule.validate(target, document)
                        .map_err(|source| GradeError::Rule {
                            rule_id: rule.id().to_string(),
                            phase: "validate",
                            source,
                        })?;
                if result.passed {
                    continue;
                }
                let message = result
                    .message
                    .unwrap_or_else(|| format!("{} failed {}", target.identifier, rule.id()));
                let mut finding = Finding::new(
                    rule.id(),
                    Severity::Prerequisite,
                    message,
                    target.location.clone(),
                );
                finding.category = Some(rule.category());
                finding.fix_hint = result.fix_hint.clone();
                if let Some(fix) = &finding.fix_hint {
                    if !required_fixes.contains(fix) {
                        required_fixes.push(fix.clone());
                    }
                }
                failures.push(finding);
            }
        }

        let passed = failures.is_empty();
        if passed {
            info!("Prerequisite gate passed");
        } else {
            info!("Prerequisite gate failed with {} issue(s)", failures.len());
        }

        Ok(PrerequisiteResult {
            passed,
            failures,
            required_fixes,
        })
    }
}
