//! Grade finalizer
//!
//! Reduces a complete map of dependency-aware rule scores to a single
//! `GradeResult`: category totals under fixed weights, a letter grade,
//! aggregated findings sorted by severity, the excellence flag, and the
//! pass verdict. Also hosts grade-to-grade comparison, profile-adjusted
//! pass thresholds, and the legacy auto-fail lookup kept for migration
//! reporting.

use crate::models::{
    letter_grade, Category, CategoryBreakdown, DependencyAwareScore, Finding, FindingsSummary,
    GradeComparison, GradeResult, Profile, DEFAULT_PASS_THRESHOLD, EXCELLENCE_THRESHOLD,
};
use crate::scoring::prerequisites::PrerequisiteResult;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

/// Rule ids the retired checkpoint scorer treated as automatic failures.
/// Kept only so migration reports can flag grades the old scorer would
/// have zeroed.
pub const LEGACY_AUTO_FAIL_RULES: [&str; 3] =
    ["PREREQ-TENANT-HEADER", "SEC-AUTH-OPS", "SEC-HTTPS-ONLY"];

/// Per-category weights; the defaults sum to exactly 1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryWeights {
    pub functionality: f64,
    pub security: f64,
    pub scalability: f64,
    pub maintainability: f64,
    pub excellence: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            functionality: Category::Functionality.default_weight(),
            security: Category::Security.default_weight(),
            scalability: Category::Scalability.default_weight(),
            maintainability: Category::Maintainability.default_weight(),
            excellence: Category::Excellence.default_weight(),
        }
    }
}

impl CategoryWeights {
    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Functionality => self.functionality,
            Category::Security => self.security,
            Category::Scalability => self.scalability,
            Category::Maintainability => self.maintainability,
            Category::Excellence => self.excellence,
        }
    }

    pub fn sum(&self) -> f64 {
        Category::ALL.iter().map(|c| self.get(*c)).sum()
    }
}

/// Aggregate rule scores into the final grade.
///
/// Idempotent: the same score map always yields the same score, grade
/// and verdict. The overall score is clamped to 0-100; category
/// percentages are 0 when a category has no points at stake, never NaN.
pub fn calculate_final_grade(
    scores: &HashMap<String, DependencyAwareScore>,
    weights: &CategoryWeights,
    pass_threshold: f64,
) -> GradeResult {
    let weight_sum = weights.sum();
    if (weight_sum - 1.0).abs() > 1e-9 {
        warn!(
            "Category weights sum to {:.4}, not 1.0; scores will not span 0-100",
            weight_sum
        );
    }

    let mut breakdown = Vec::with_capacity(Category::ALL.len());
    let mut total = 0.0;
    for category in Category::ALL {
        let mut earned = 0.0;
        let mut max = 0.0;
        for entry in scores.values() {
            if entry.score.category == category {
                earned += entry.score.points_earned;
                max += entry.score.max_points;
            }
        }
        let percentage = if max > 0.0 { earned / max } else { 0.0 };
        let weight = weights.get(category);
        let weighted_contribution = percentage * weight * 100.0;
        total += weighted_contribution;
        breakdown.push(CategoryBreakdown {
            category,
            weight,
            max_points: max,
            earned_points: earned,
            percentage,
            weighted_contribution,
        });
    }

    let score = total.clamp(0.0, 100.0);

    let mut findings: Vec<Finding> = scores
        .values()
        .flat_map(|entry| entry.score.findings.iter().cloned())
        .collect();
    findings.sort_by(|a, b| b.severity.cmp(&a.severity));
    let summary = FindingsSummary::from_findings(&findings);

    let grade = letter_grade(score);
    info!(
        "Final grade: {:.1} ({}) with {} findings",
        score, grade, summary.total
    );

    GradeResult {
        score,
        letter_grade: grade.to_string(),
        passed: score >= pass_threshold,
        excellence: score >= EXCELLENCE_THRESHOLD,
        blocked_by_prerequisites: false,
        blocked_reason: None,
        required_fixes: Vec::new(),
        breakdown,
        total_findings: summary.total,
        critical_findings: summary.critical,
        major_findings: summary.major,
        minor_findings: summary.minor,
        findings,
        graded_at: Utc::now(),
    }
}

/// Shorthand with default weights and the default pass threshold
pub fn calculate_final_grade_default(
    scores: &HashMap<String, DependencyAwareScore>,
) -> GradeResult {
    calculate_final_grade(scores, &CategoryWeights::default(), DEFAULT_PASS_THRESHOLD)
}

/// Maximal-failure grade for a document the prerequisite gate refused.
///
/// Never a bare error: the caller gets a complete `GradeResult` with the
/// full list of blocking findings and required fixes.
pub fn blocked_grade(gate: &PrerequisiteResult, weights: &CategoryWeights) -> GradeResult {
    let mut findings = gate.failures.clone();
    findings.sort_by(|a, b| b.severity.cmp(&a.severity));
    let summary = FindingsSummary::from_findings(&findings);

    let breakdown = Category::ALL
        .iter()
        .map(|&category| CategoryBreakdown {
            category,
            weight: weights.get(category),
            max_points: 0.0,
            earned_points: 0.0,
            percentage: 0.0,
            weighted_contribution: 0.0,
        })
        .collect();

    GradeResult {
        score: 0.0,
        letter_grade: "F".to_string(),
        passed: false,
        excellence: false,
        blocked_by_prerequisites: true,
        blocked_reason: Some(format!(
            "{} prerequisite failure(s) block scoring",
            findings.len()
        )),
        required_fixes: gate.required_fixes.clone(),
        breakdown,
        total_findings: summary.total,
        critical_findings: summary.critical,
        major_findings: summary.major,
        minor_findings: summary.minor,
        findings,
        graded_at: Utc::now(),
    }
}

/// Re-judge `passed` against a profile threshold. Score and letter grade
/// are never touched.
pub fn apply_profile(grade: &GradeResult, profile: Profile) -> GradeResult {
    let mut adjusted = grade.clone();
    if let Some(threshold) = profile.pass_threshold() {
        adjusted.passed = !grade.blocked_by_prerequisites && grade.score >= threshold;
    }
    adjusted
}

/// Diff two grades of the same contract.
///
/// Findings are matched by (rule id, location) identity: present in
/// baseline but absent from candidate means fixed, the reverse means new.
pub fn compare_grades(baseline: &GradeResult, candidate: &GradeResult) -> GradeComparison {
    let key = |f: &Finding| (f.rule_id.clone(), f.location.clone());
    let baseline_keys: std::collections::HashSet<_> = baseline.findings.iter().map(key).collect();
    let candidate_keys: std::collections::HashSet<_> = candidate.findings.iter().map(key).collect();

    let fixed_findings: Vec<Finding> = baseline
        .findings
        .iter()
        .filter(|f| !candidate_keys.contains(&key(f)))
        .cloned()
        .collect();
    let new_findings: Vec<Finding> = candidate
        .findings
        .iter()
        .filter(|f| !baseline_keys.contains(&key(f)))
        .cloned()
        .collect();

    let score_delta = candidate.score - baseline.score;
    let improved = score_delta > 0.0;
    let message = format!(
        "score {:+.1} ({} -> {}), {} fixed, {} new",
        score_delta,
        baseline.letter_grade,
        candidate.letter_grade,
        fixed_findings.len(),
        new_findings.len()
    );

    GradeComparison {
        score_delta,
        grade_delta: format!("{} -> {}", baseline.letter_grade, candidate.letter_grade),
        fixed_findings,
        new_findings,
        improved,
        message,
    }
}

/// Would the retired checkpoint scorer have auto-failed this grade?
pub fn would_legacy_auto_fail(grade: &GradeResult) -> bool {
    grade
        .findings
        .iter()
        .any(|f| LEGACY_AUTO_FAIL_RULES.contains(&f.rule_id.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RuleScore, Severity};

    fn entry(
        id: &str,
        category: Category,
        earned: f64,
        max: f64,
        findings: Vec<Finding>,
    ) -> (String, DependencyAwareScore) {
        let checked = 10;
        let coverage = if max > 0.0 { earned / max } else { 1.0 };
        (
            id.to_string(),
            DependencyAwareScore::scored(RuleScore {
                rule_id: id.to_string(),
                category,
                severity: Severity::Major,
                applicable: true,
                coverage,
                points_earned: earned,
                max_points: max,
                targets_checked: checked,
                targets_passed: (coverage * checked as f64) as usize,
                findings,
            }),
        )
    }

    #[test]
    fn test_empty_score_map_yields_five_zero_categories() {
        let scores = HashMap::new();
        let grade = calculate_final_grade_default(&scores);
        assert_eq!(grade.breakdown.len(), 5);
        assert_eq!(grade.score, 0.0);
        assert_eq!(grade.letter_grade, "F");
        assert!(!grade.passed);
        assert!(!grade.excellence);
        for slice in &grade.breakdown {
            assert_eq!(slice.percentage, 0.0);
            assert_eq!(slice.weighted_contribution, 0.0);
        }
    }

    #[test]
    fn test_perfect_scores_reach_100() {
        let scores: HashMap<_, _> = [
            entry("f", Category::Functionality, 30.0, 30.0, vec![]),
            entry("s", Category::Security, 20.0, 20.0, vec![]),
            entry("sc", Category::Scalability, 10.0, 10.0, vec![]),
            entry("m", Category::Maintainability, 10.0, 10.0, vec![]),
            entry("e", Category::Excellence, 10.0, 10.0, vec![]),
        ]
        .into_iter()
        .collect();
        let grade = calculate_final_grade_default(&scores);
        assert!((grade.score - 100.0).abs() < 1e-9);
        assert_eq!(grade.letter_grade, "A+");
        assert!(grade.passed);
        assert!(grade.excellence);
    }

    #[test]
    fn test_single_category_bounds_score_by_weight() {
        // Only security earns points; maximum achievable is 25.
        let scores: HashMap<_, _> = [entry("s", Category::Security, 20.0, 20.0, vec![])]
            .into_iter()
            .collect();
        let grade = calculate_final_grade_default(&scores);
        assert!((grade.score - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_idempotent() {
        let scores: HashMap<_, _> = [
            entry("f", Category::Functionality, 15.0, 30.0, vec![]),
            entry("s", Category::Security, 5.0, 20.0, vec![]),
        ]
        .into_iter()
        .collect();
        let first = calculate_final_grade_default(&scores);
        let second = calculate_final_grade_default(&scores);
        assert_eq!(first.score, second.score);
        assert_eq!(first.letter_grade, second.letter_grade);
        assert_eq!(first.passed, second.passed);
    }

    #[test]
    fn test_findings_sorted_and_counted() {
        let scores: HashMap<_, _> = [
            entry(
                "a",
                Category::Functionality,
                0.0,
                10.0,
                vec![
                    Finding::new("a", Severity::Minor, "m1", "l1"),
                    Finding::new("a", Severity::Critical, "m2", "l2"),
                ],
            ),
            entry(
                "b",
                Category::Security,
                0.0,
                10.0,
                vec![Finding::new("b", Severity::Major, "m3", "l3")],
            ),
        ]
        .into_iter()
        .collect();
        let grade = calculate_final_grade_default(&scores);
        assert_eq!(grade.total_findings, 3);
        assert_eq!(grade.critical_findings, 1);
        assert_eq!(grade.major_findings, 1);
        assert_eq!(grade.minor_findings, 1);
        assert_eq!(grade.findings[0].severity, Severity::Critical);
        assert_eq!(grade.findings[2].severity, Severity::Minor);
    }

    #[test]
    fn test_excellence_tracks_threshold() {
        for (earned, expect) in [(30.0, true), (20.0, false)] {
            // functionality alone can reach 30; scale others to hit 90+
            let scores: HashMap<_, _> = [
                entry("f", Category::Functionality, earned, 30.0, vec![]),
                entry("s", Category::Security, 20.0, 20.0, vec![]),
                entry("sc", Category::Scalability, 10.0, 10.0, vec![]),
                entry("m", Category::Maintainability, 10.0, 10.0, vec![]),
                entry("e", Category::Excellence, 10.0, 10.0, vec![]),
            ]
            .into_iter()
            .collect();
            let grade = calculate_final_grade_default(&scores);
            assert_eq!(grade.excellence, expect, "earned={earned}");
            assert_eq!(grade.excellence, grade.score >= 90.0);
        }
    }

    #[test]
    fn test_apply_profile_changes_only_passed() {
        let scores: HashMap<_, _> = [
            entry("f", Category::Functionality, 21.0, 30.0, vec![]),
            entry("s", Category::Security, 14.0, 20.0, vec![]),
            entry("sc", Category::Scalability, 7.0, 10.0, vec![]),
            entry("m", Category::Maintainability, 7.0, 10.0, vec![]),
            entry("e", Category::Excellence, 7.0, 10.0, vec![]),
        ]
        .into_iter()
        .collect();
        // 70% everywhere -> score 70
        let grade = calculate_final_grade_default(&scores);
        assert!(grade.passed);

        let public = apply_profile(&grade, Profile::Public);
        assert!(!public.passed);
        assert_eq!(public.score, grade.score);
        assert_eq!(public.letter_grade, grade.letter_grade);

        let prototype = apply_profile(&grade, Profile::Prototype);
        assert!(prototype.passed);

        let standard = apply_profile(&grade, Profile::Standard);
        assert_eq!(standard.passed, grade.passed);
    }

    #[test]
    fn test_compare_grades_matches_by_rule_and_location() {
        let scores_a: HashMap<_, _> = [entry(
            "a",
            Category::Functionality,
            0.0,
            10.0,
            vec![
                Finding::new("a", Severity::Major, "m", "l1"),
                Finding::new("a", Severity::Major, "m", "l2"),
            ],
        )]
        .into_iter()
        .collect();
        let scores_b: HashMap<_, _> = [entry(
            "a",
            Category::Functionality,
            5.0,
            10.0,
            vec![
                // message changed at l2: still the same finding identity
                Finding::new("a", Severity::Major, "different text", "l2"),
                Finding::new("a", Severity::Major, "m", "l3"),
            ],
        )]
        .into_iter()
        .collect();

        let baseline = calculate_final_grade_default(&scores_a);
        let candidate = calculate_final_grade_default(&scores_b);
        let diff = compare_grades(&baseline, &candidate);

        assert_eq!(diff.fixed_findings.len(), 1);
        assert_eq!(diff.fixed_findings[0].location, "l1");
        assert_eq!(diff.new_findings.len(), 1);
        assert_eq!(diff.new_findings[0].location, "l3");
        assert!(diff.improved);
        assert!(diff.score_delta > 0.0);
    }

    #[test]
    fn test_legacy_auto_fail_lookup() {
        let mut grade = calculate_final_grade_default(&HashMap::new());
        assert!(!would_legacy_auto_fail(&grade));
        grade
            .findings
            .push(Finding::new("SEC-AUTH-OPS", Severity::Critical, "m", "l"));
        assert!(would_legacy_auto_fail(&grade));
    }

    #[test]
    fn test_blocked_grade_shape() {
        let gate = PrerequisiteResult {
            passed: false,
            failures: vec![Finding::new(
                "PREREQ-VERSION",
                Severity::Prerequisite,
                "wrong version",
                "openapi",
            )],
            required_fixes: vec!["set the openapi field".to_string()],
        };
        let grade = blocked_grade(&gate, &CategoryWeights::default());
        assert_eq!(grade.score, 0.0);
        assert_eq!(grade.letter_grade, "F");
        assert!(grade.blocked_by_prerequisites);
        assert!(grade.blocked_reason.as_deref().unwrap().contains("1"));
        assert_eq!(grade.breakdown.len(), 5);
        assert_eq!(grade.total_findings, 1);
        assert_eq!(grade.critical_findings, 1);
        assert_eq!(grade.required_fixes.len(), 1);
        assert!(!grade.passed);
    }
}
