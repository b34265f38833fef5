//! Dependency-aware grading pipeline
//!
//! # Control flow
//!
//! ```text
//! document
//!    │
//!    ▼
//! ┌──────────────────┐  failed   ┌──────────────────────────┐
//! │ PrerequisiteGate │──────────▶│ blocked grade (0.0 / F)  │
//! └──────────────────┘           └──────────────────────────┘
//!    │ passed
//!    ▼
//! ┌────────────────────┐  per rule  ┌────────────────┐
//! │ DependencyResolver │───────────▶│ CoverageScorer │
//! └────────────────────┘            └────────────────┘
//!    │ map of dependency-aware scores
//!    ▼
//! ┌────────────────┐
//! │ GradeFinalizer │──▶ GradeResult
//! └────────────────┘
//! ```
//!
//! The pipeline is single-document, single-pass and synchronous; only
//! target validation inside one rule is parallel. Catalogs are read-only
//! and may be shared across concurrent grading requests.

pub mod coverage;
pub mod dependency;
pub mod finalize;
pub mod prerequisites;

pub use coverage::{CoverageScorer, NoTargetPolicy};
pub use dependency::{ChainAnalysis, DependencyGraph, DependencyResolver};
pub use finalize::{
    apply_profile, blocked_grade, calculate_final_grade, compare_grades, would_legacy_auto_fail,
    CategoryWeights, LEGACY_AUTO_FAIL_RULES,
};
pub use prerequisites::{PrerequisiteGate, PrerequisiteResult};

use crate::document::Document;
use crate::error::GradeError;
use crate::models::{DependencyAwareScore, GradeResult, DEFAULT_PASS_THRESHOLD};
use crate::rules::Catalog;
use std::collections::HashMap;
use tracing::info;

/// The full grading pipeline over one catalog
pub struct Grader<'a> {
    catalog: &'a Catalog,
    weights: CategoryWeights,
    pass_threshold: f64,
    scorer: CoverageScorer,
}

impl<'a> Grader<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            weights: CategoryWeights::default(),
            pass_threshold: DEFAULT_PASS_THRESHOLD,
            scorer: CoverageScorer::new(),
        }
    }

    pub fn with_weights(mut self, weights: CategoryWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_pass_threshold(mut self, threshold: f64) -> Self {
        self.pass_threshold = threshold;
        self
    }

    pub fn with_no_target_policy(mut self, policy: NoTargetPolicy) -> Self {
        self.scorer = CoverageScorer::new().with_no_target_policy(policy);
        self
    }

    /// Grade a document end to end.
    ///
    /// Prerequisite failure yields a complete blocked grade, never an
    /// error; `Err` means a catalog bug (see `GradeError`).
    pub fn grade(&self, document: &Document) -> Result<GradeResult, GradeError> {
        let gate = PrerequisiteGate::new(self.catalog).check(document)?;
        if !gate.passed {
            info!("Grading blocked by prerequisites");
            return Ok(blocked_grade(&gate, &self.weights));
        }

        let scores = self.score_rules(document, None)?;
        Ok(calculate_final_grade(
            &scores,
            &self.weights,
            self.pass_threshold,
        ))
    }

    /// Dependency-aware scores for the given rules (all non-prerequisite
    /// rules when `rule_ids` is None), without the gate or finalizer.
    pub fn score_rules(
        &self,
        document: &Document,
        rule_ids: Option<&[&str]>,
    ) -> Result<HashMap<String, DependencyAwareScore>, GradeError> {
        DependencyResolver::new(self.catalog)
            .with_scorer(self.scorer.clone())
            .score_with_dependencies(document, rule_ids)
    }

    /// The order rules would be evaluated in
    pub fn evaluation_order(&self) -> Result<Vec<String>, GradeError> {
        DependencyResolver::new(self.catalog).evaluation_order(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Severity, Target, ValidationResult};
    use crate::rules::test_rules::StubRule;
    use crate::rules::Rule;
    use anyhow::bail;
    use serde_json::json;
    use std::sync::Arc;

    /// Scored rule that errors if the resolver ever reaches it
    struct MustNotRun;

    impl Rule for MustNotRun {
        fn id(&self) -> &'static str {
            "MUST-NOT-RUN"
        }
        fn description(&self) -> &'static str {
            "fails the test if scored"
        }
        fn category(&self) -> Category {
            Category::Functionality
        }
        fn severity(&self) -> Severity {
            Severity::Major
        }
        fn max_points(&self) -> f64 {
            10.0
        }
        fn detect(&self, _document: &Document) -> anyhow::Result<Vec<Target>> {
            bail!("resolver must not run past a failed gate")
        }
        fn validate(
            &self,
            _target: &Target,
            _document: &Document,
        ) -> anyhow::Result<ValidationResult> {
            bail!("unreachable")
        }
    }

    /// Prerequisite that always fails
    struct FailingPrereq;

    impl Rule for FailingPrereq {
        fn id(&self) -> &'static str {
            "PREREQ-ALWAYS-FAILS"
        }
        fn description(&self) -> &'static str {
            "always fails"
        }
        fn category(&self) -> Category {
            Category::Security
        }
        fn severity(&self) -> Severity {
            Severity::Prerequisite
        }
        fn max_points(&self) -> f64 {
            0.0
        }
        fn detect(&self, _document: &Document) -> anyhow::Result<Vec<Target>> {
            Ok(vec![Target::new(
                crate::models::TargetKind::Security,
                "x",
                "x",
            )])
        }
        fn validate(
            &self,
            _target: &Target,
            _document: &Document,
        ) -> anyhow::Result<ValidationResult> {
            Ok(ValidationResult::fail("nope").with_fix_hint("fix it"))
        }
    }

    fn minimal_doc() -> Document {
        Document::new(json!({
            "openapi": "3.0.3",
            "info": {"title": "t", "version": "1"},
            "paths": {"/x": {"get": {}}}
        }))
    }

    #[test]
    fn test_failed_gate_blocks_scoring_entirely() {
        let mut catalog = Catalog::new();
        catalog.register(Arc::new(FailingPrereq));
        catalog.register(Arc::new(MustNotRun));

        // MustNotRun errors if detect is ever called, so an Ok result
        // proves the resolver never ran.
        let grade = Grader::new(&catalog).grade(&minimal_doc()).unwrap();
        assert!(grade.blocked_by_prerequisites);
        assert_eq!(grade.score, 0.0);
        assert_eq!(grade.letter_grade, "F");
        assert!(grade.blocked_reason.is_some());
        assert_eq!(grade.required_fixes, vec!["fix it".to_string()]);
    }

    #[test]
    fn test_clean_pipeline_produces_weighted_grade() {
        let mut catalog = Catalog::new();
        catalog.register(Arc::new(StubRule::passing("A", 2)));
        catalog.register(Arc::new(
            StubRule::failing("B", 2, vec![0]).with_category(Category::Security),
        ));

        let grade = Grader::new(&catalog).grade(&minimal_doc()).unwrap();
        assert!(!grade.blocked_by_prerequisites);
        // functionality full (30) + security half (12.5)
        assert!((grade.score - 42.5).abs() < 1e-9);
        assert_eq!(grade.breakdown.len(), 5);
        assert_eq!(grade.total_findings, 1);
    }

    #[test]
    fn test_custom_threshold_and_weights() {
        let mut catalog = Catalog::new();
        catalog.register(Arc::new(StubRule::passing("A", 1)));

        let weights = CategoryWeights {
            functionality: 1.0,
            security: 0.0,
            scalability: 0.0,
            maintainability: 0.0,
            excellence: 0.0,
        };
        let grade = Grader::new(&catalog)
            .with_weights(weights)
            .with_pass_threshold(99.0)
            .grade(&minimal_doc())
            .unwrap();
        assert!((grade.score - 100.0).abs() < 1e-9);
        assert!(grade.passed);
    }
}
