//! Coverage scorer
//!
//! Runs one rule's detect+validate cycle over a document and reduces it
//! to a `RuleScore`: fractional coverage, linear points, one finding per
//! failing target. All targets are evaluated even after early failures;
//! there is no short-circuit within a rule. Points are never rounded
//! here; rounding happens at presentation boundaries only.

use crate::document::Document;
use crate::error::GradeError;
use crate::models::{Finding, RuleScore};
use crate::rules::Rule;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How to score a rule that detected no targets.
///
/// The canonical contract credits full points: a rule that does not
/// apply imposes no penalty. Some consumers expect zero points instead;
/// both behaviors are supported here so the aggregation logic never has
/// to branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoTargetPolicy {
    /// coverage = 1.0, full max_points credited (default)
    #[default]
    FullCredit,
    /// coverage = 1.0 for reporting, zero points credited
    ZeroCredit,
}

/// Scores a single rule against a document
#[derive(Debug, Clone, Default)]
pub struct CoverageScorer {
    no_target_policy: NoTargetPolicy,
}

impl CoverageScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_no_target_policy(mut self, policy: NoTargetPolicy) -> Self {
        self.no_target_policy = policy;
        self
    }

    pub fn no_target_policy(&self) -> NoTargetPolicy {
        self.no_target_policy
    }

    /// Score one rule.
    ///
    /// Rule-author failures in `detect` or `validate` propagate as
    /// `GradeError::Rule`; the engine never converts them into findings.
    pub fn score(&self, rule: &dyn Rule, document: &Document) -> Result<RuleScore, GradeError> {
        let targets = rule.detect(document).map_err(|source| GradeError::Rule {
            rule_id: rule.id().to_string(),
            phase: "detect",
            source,
        })?;

        if targets.is_empty() {
            debug!("Rule {} detected no targets, not applicable", rule.id());
            let points = match self.no_target_policy {
                NoTargetPolicy::FullCredit => rule.max_points(),
                NoTargetPolicy::ZeroCredit => 0.0,
            };
            return Ok(RuleScore {
                rule_id: rule.id().to_string(),
                category: rule.category(),
                severity: rule.severity(),
                applicable: false,
                coverage: 1.0,
                points_earned: points,
                max_points: rule.max_points(),
                targets_checked: 0,
                targets_passed: 0,
                findings: Vec::new(),
            });
        }

        // Targets are independent, so validate in parallel; the indexed
        // collect keeps findings in detect order.
        let results: Result<Vec<_>, GradeError> = targets
            .par_iter()
            .map(|target| {
                rule.validate(target, document).map_err(|source| GradeError::Rule {
                    rule_id: rule.id().to_string(),
                    phase: "validate",
                    source,
                })
            })
            .collect();
        let results = results?;

        let mut findings = Vec::new();
        let mut passed = 0usize;
        for (target, result) in targets.iter().zip(&results) {
            if result.passed {
                passed += 1;
                continue;
            }
            let message = result
                .message
                .clone()
                .unwrap_or_else(|| format!("{} failed {}", target.identifier, rule.id()));
            let mut finding =
                Finding::new(rule.id(), rule.severity(), message, target.location.clone());
            finding.category = Some(rule.category());
            finding.fix_hint = result.fix_hint.clone();
            findings.push(finding);
        }

        let checked = targets.len();
        let coverage = passed as f64 / checked as f64;
        debug!(
            "Rule {}: {}/{} targets passed (coverage {:.3})",
            rule.id(),
            passed,
            checked,
            coverage
        );

        Ok(RuleScore {
            rule_id: rule.id().to_string(),
            category: rule.category(),
            severity: rule.severity(),
            applicable: true,
            coverage,
            points_earned: coverage * rule.max_points(),
            max_points: rule.max_points(),
            targets_checked: checked,
            targets_passed: passed,
            findings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Severity, Target, TargetKind, ValidationResult};
    use crate::rules::test_rules::StubRule;
    use anyhow::anyhow;
    use serde_json::json;

    fn doc() -> Document {
        Document::new(json!({}))
    }

    #[test]
    fn test_full_pass() {
        let rule = StubRule::passing("A", 4);
        let score = CoverageScorer::new().score(&rule, &doc()).unwrap();
        assert!(score.applicable);
        assert_eq!(score.coverage, 1.0);
        assert_eq!(score.points_earned, 10.0);
        assert_eq!(score.targets_checked, 4);
        assert_eq!(score.targets_passed, 4);
        assert!(score.findings.is_empty());
    }

    #[test]
    fn test_partial_coverage_is_linear() {
        let rule = StubRule::failing("A", 4, vec![1, 3]);
        let score = CoverageScorer::new().score(&rule, &doc()).unwrap();
        assert_eq!(score.coverage, 0.5);
        assert_eq!(score.points_earned, 5.0);
        assert_eq!(score.findings.len(), 2);
        assert!(score.targets_passed <= score.targets_checked);
        // findings keep detect order and carry the rule's identity
        assert_eq!(score.findings[0].location, "stub/A/1");
        assert_eq!(score.findings[1].location, "stub/A/3");
        assert_eq!(score.findings[0].rule_id, "A");
        assert_eq!(score.findings[0].severity, Severity::Major);
        assert_eq!(score.findings[0].category, Some(Category::Functionality));
    }

    #[test]
    fn test_no_targets_full_credit_default() {
        let rule = StubRule::passing("A", 0);
        let score = CoverageScorer::new().score(&rule, &doc()).unwrap();
        assert!(!score.applicable);
        assert_eq!(score.coverage, 1.0);
        assert_eq!(score.points_earned, 10.0);
        assert_eq!(score.targets_checked, 0);
    }

    #[test]
    fn test_no_targets_zero_credit_policy() {
        let rule = StubRule::passing("A", 0);
        let score = CoverageScorer::new()
            .with_no_target_policy(NoTargetPolicy::ZeroCredit)
            .score(&rule, &doc())
            .unwrap();
        assert!(!score.applicable);
        assert_eq!(score.coverage, 1.0);
        assert_eq!(score.points_earned, 0.0);
    }

    struct PanickyRule;

    impl crate::rules::Rule for PanickyRule {
        fn id(&self) -> &'static str {
            "BROKEN"
        }
        fn description(&self) -> &'static str {
            "always errors"
        }
        fn category(&self) -> Category {
            Category::Security
        }
        fn severity(&self) -> Severity {
            Severity::Critical
        }
        fn max_points(&self) -> f64 {
            10.0
        }
        fn detect(&self, _document: &Document) -> anyhow::Result<Vec<Target>> {
            Ok(vec![Target::new(TargetKind::Path, "x", "x")])
        }
        fn validate(
            &self,
            _target: &Target,
            _document: &Document,
        ) -> anyhow::Result<ValidationResult> {
            Err(anyhow!("rule author bug"))
        }
    }

    #[test]
    fn test_rule_errors_propagate() {
        let err = CoverageScorer::new().score(&PanickyRule, &doc()).unwrap_err();
        match err {
            GradeError::Rule { rule_id, phase, .. } => {
                assert_eq!(rule_id, "BROKEN");
                assert_eq!(phase, "validate");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
