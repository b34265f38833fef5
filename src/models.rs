//! Core data models for specgrade
//!
//! These models are shared by every stage of the grading pipeline:
//! targets and validation results at the rule boundary, rule scores in
//! the middle, and the final grade with its category breakdown at the top.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Generate a deterministic finding ID based on content hash.
///
/// Stable IDs across runs enable grade-to-grade comparison (fixed vs new
/// findings) and suppression by ID. DefaultHasher is intentionally not
/// stable across Rust versions, so we hash with SHA-256 and keep the
/// first 16 hex chars.
pub fn deterministic_finding_id(rule_id: &str, location: &str, message: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(rule_id.as_bytes());
    hasher.update(b"\n");
    hasher.update(location.as_bytes());
    hasher.update(b"\n");
    hasher.update(message.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex[..16].to_string()
}

/// Severity levels for rules and findings
///
/// `Prerequisite` marks a gating rule: it is never scored, but a failure
/// blocks the entire pipeline. Ordering is ascending so findings can be
/// sorted highest-first with `b.cmp(&a)`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Minor,
    Major,
    Critical,
    Prerequisite,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Minor => write!(f, "minor"),
            Severity::Major => write!(f, "major"),
            Severity::Critical => write!(f, "critical"),
            Severity::Prerequisite => write!(f, "prerequisite"),
        }
    }
}

/// Rule categories with fixed grade weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Security,
    Functionality,
    Scalability,
    Maintainability,
    Excellence,
}

impl Category {
    /// All five categories, in display order
    pub const ALL: [Category; 5] = [
        Category::Functionality,
        Category::Security,
        Category::Scalability,
        Category::Maintainability,
        Category::Excellence,
    ];

    /// Fixed contribution of this category to the 0-100 score.
    ///
    /// Invariant: the five weights sum to exactly 1.0.
    pub fn default_weight(self) -> f64 {
        match self {
            Category::Functionality => 0.30,
            Category::Security => 0.25,
            Category::Scalability => 0.20,
            Category::Maintainability => 0.15,
            Category::Excellence => 0.10,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Security => "security",
            Category::Functionality => "functionality",
            Category::Scalability => "scalability",
            Category::Maintainability => "maintainability",
            Category::Excellence => "excellence",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of document location a target points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Path,
    Operation,
    Schema,
    Parameter,
    Response,
    Security,
}

/// One concrete document location a rule must check
///
/// Targets are produced fresh by `Rule::detect` on every evaluation and
/// are never persisted. `location` is an opaque resolver key into the
/// document-access layer; the engine never parses it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub kind: TargetKind,
    /// Opaque reference into the document (e.g. "paths/~1users/get")
    pub location: String,
    /// Human-readable name for reports (e.g. "GET /users")
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Target {
    pub fn new(
        kind: TargetKind,
        location: impl Into<String>,
        identifier: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            location: location.into(),
            identifier: identifier.into(),
            method: None,
            path: None,
        }
    }

    pub fn operation(
        location: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        let method = method.into();
        let path = path.into();
        Self {
            kind: TargetKind::Operation,
            location: location.into(),
            identifier: format!("{} {}", method.to_uppercase(), path),
            method: Some(method),
            path: Some(path),
        }
    }
}

/// Outcome of validating a single target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_hint: Option<String>,
    /// Confidence in the judgement, 0.0-1.0
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_confidence() -> f64 {
    1.0
}

impl ValidationResult {
    pub fn pass() -> Self {
        Self {
            passed: true,
            message: None,
            fix_hint: None,
            confidence: 1.0,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: Some(message.into()),
            fix_hint: None,
            confidence: 1.0,
        }
    }

    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }
}

/// A conformance issue at one document location
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Finding {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub rule_id: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub fix_hint: Option<String>,
}

impl Finding {
    pub fn new(
        rule_id: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        let rule_id = rule_id.into();
        let message = message.into();
        let location = location.into();
        let id = deterministic_finding_id(&rule_id, &location, &message);
        Self {
            id,
            rule_id,
            severity,
            category: None,
            message,
            location,
            fix_hint: None,
        }
    }
}

/// Summary of findings by severity tier
///
/// Minor and info share one bucket; prerequisite failures count as
/// critical since they block the grade outright.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FindingsSummary {
    pub critical: usize,
    pub major: usize,
    pub minor: usize,
    pub total: usize,
}

impl FindingsSummary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut summary = Self::default();
        for f in findings {
            match f.severity {
                Severity::Critical | Severity::Prerequisite => summary.critical += 1,
                Severity::Major => summary.major += 1,
                Severity::Minor | Severity::Info => summary.minor += 1,
            }
            summary.total += 1;
        }
        summary
    }
}

/// Per-rule reduction of a detect+validate cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleScore {
    pub rule_id: String,
    pub category: Category,
    pub severity: Severity,
    /// False when the rule detected no targets in this document
    pub applicable: bool,
    /// Fraction of targets that passed, 0.0-1.0
    pub coverage: f64,
    pub points_earned: f64,
    pub max_points: f64,
    pub targets_checked: usize,
    pub targets_passed: usize,
    pub findings: Vec<Finding>,
}

/// Rule score enriched with cascade information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyAwareScore {
    #[serde(flatten)]
    pub score: RuleScore,
    /// True when the rule was never evaluated because a dependency failed
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_dependencies: Option<Vec<String>>,
}

impl DependencyAwareScore {
    pub fn scored(score: RuleScore) -> Self {
        Self {
            score,
            skipped: false,
            skip_reason: None,
            failed_dependencies: None,
        }
    }

    /// Whether this rule blocks its dependents.
    ///
    /// Any applicable shortfall counts, not only total failure; skipped
    /// rules cascade. A non-applicable rule never blocks.
    pub fn is_failing(&self) -> bool {
        self.skipped || (self.score.applicable && self.score.coverage < 1.0)
    }
}

/// Per-category slice of the final grade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub category: Category,
    pub weight: f64,
    pub max_points: f64,
    pub earned_points: f64,
    /// earned/max as a fraction; 0.0 when max is 0, never NaN
    pub percentage: f64,
    /// percentage x weight x 100
    pub weighted_contribution: f64,
}

/// Map a 0-100 score to a letter grade
///
/// Boundaries are exact: 97 is A+, 96.9 is A, 59.9 is F.
pub fn letter_grade(score: f64) -> &'static str {
    match score {
        s if s >= 97.0 => "A+",
        s if s >= 93.0 => "A",
        s if s >= 90.0 => "A-",
        s if s >= 87.0 => "B+",
        s if s >= 83.0 => "B",
        s if s >= 80.0 => "B-",
        s if s >= 77.0 => "C+",
        s if s >= 73.0 => "C",
        s if s >= 70.0 => "C-",
        s if s >= 67.0 => "D+",
        s if s >= 63.0 => "D",
        s if s >= 60.0 => "D-",
        _ => "F",
    }
}

/// Score at or above which a grade is flagged as excellent
pub const EXCELLENCE_THRESHOLD: f64 = 90.0;

/// Default pass threshold before any profile adjustment
pub const DEFAULT_PASS_THRESHOLD: f64 = 60.0;

/// Complete grade for one document
///
/// Computed once per grading request and never mutated afterward;
/// comparisons produce separate diff objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeResult {
    /// Weighted overall score, clamped to 0-100
    pub score: f64,
    pub letter_grade: String,
    pub passed: bool,
    /// True when score >= 90
    pub excellence: bool,
    /// True when the prerequisite gate refused to score the document
    #[serde(default)]
    pub blocked_by_prerequisites: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_fixes: Vec<String>,
    /// Always five entries, one per category, zero-filled if absent
    pub breakdown: Vec<CategoryBreakdown>,
    /// Sorted critical first, then major, then minor/info
    pub findings: Vec<Finding>,
    pub total_findings: usize,
    pub critical_findings: usize,
    pub major_findings: usize,
    pub minor_findings: usize,
    pub graded_at: DateTime<Utc>,
}

/// Diff between two grades of the same contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeComparison {
    pub score_delta: f64,
    /// e.g. "C+ -> B-"
    pub grade_delta: String,
    /// Findings present in baseline but gone from candidate
    pub fixed_findings: Vec<Finding>,
    /// Findings absent from baseline but present in candidate
    pub new_findings: Vec<Finding>,
    pub improved: bool,
    pub message: String,
}

/// Grading profile adjusting the pass threshold only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Standard,
    Public,
    Internal,
    Prototype,
}

impl Profile {
    /// Profile-specific pass threshold; None leaves the grade untouched
    pub fn pass_threshold(self) -> Option<f64> {
        match self {
            Profile::Standard => None,
            Profile::Public => Some(80.0),
            Profile::Internal => Some(65.0),
            Profile::Prototype => Some(50.0),
        }
    }
}

impl std::str::FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(Profile::Standard),
            "public" => Ok(Profile::Public),
            "internal" => Ok(Profile::Internal),
            "prototype" => Ok(Profile::Prototype),
            other => Err(format!("unknown profile '{}'", other)),
        }
    }
}
