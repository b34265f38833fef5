//! Text (terminal) reporter with colors and formatting

use crate::models::{GradeResult, Severity};
use anyhow::Result;

/// Grade colors (ANSI escape codes)
fn grade_color(grade: &str) -> &'static str {
    match grade.chars().next() {
        Some('A') => "\x1b[32m", // Green
        Some('B') => "\x1b[92m", // Light green
        Some('C') => "\x1b[33m", // Yellow
        Some('D') => "\x1b[91m", // Light red
        Some('F') => "\x1b[31m", // Red
        _ => "\x1b[0m",
    }
}

/// Severity colors
fn severity_color(severity: &Severity) -> &'static str {
    match severity {
        Severity::Prerequisite => "\x1b[35m", // Magenta
        Severity::Critical => "\x1b[31m",     // Red
        Severity::Major => "\x1b[91m",        // Light red
        Severity::Minor => "\x1b[33m",        // Yellow
        Severity::Info => "\x1b[90m",         // Gray
    }
}

/// Reset ANSI color
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// Severity tag
fn severity_tag(severity: &Severity) -> &'static str {
    match severity {
        Severity::Prerequisite => "[P]",
        Severity::Critical => "[C]",
        Severity::Major => "[M]",
        Severity::Minor => "[m]",
        Severity::Info => "[I]",
    }
}

/// Render a grade as formatted terminal output
pub fn render(grade: &GradeResult) -> Result<String> {
    let mut out = String::new();

    let grade_c = grade_color(&grade.letter_grade);
    out.push_str(&format!("\n{BOLD}Specgrade Report{RESET}\n"));
    out.push_str(&format!(
        "{DIM}──────────────────────────────────────{RESET}\n"
    ));
    out.push_str(&format!(
        "Score: {BOLD}{:.1}/100{RESET}  Grade: {grade_c}{BOLD}{}{RESET}  {}\n\n",
        grade.score,
        grade.letter_grade,
        if grade.passed {
            "\x1b[32mPASS\x1b[0m"
        } else {
            "\x1b[31mFAIL\x1b[0m"
        }
    ));

    if grade.blocked_by_prerequisites {
        out.push_str(&format!(
            "{BOLD}\x1b[31mBLOCKED BY PREREQUISITES{RESET}\n"
        ));
        if let Some(reason) = &grade.blocked_reason {
            out.push_str(&format!("  {reason}\n"));
        }
        if !grade.required_fixes.is_empty() {
            out.push_str(&format!("\n{BOLD}REQUIRED FIXES{RESET}\n"));
            for fix in &grade.required_fixes {
                out.push_str(&format!("  - {fix}\n"));
            }
        }
        out.push('\n');
    } else {
        out.push_str(&format!("{BOLD}CATEGORIES{RESET}\n"));
        for slice in &grade.breakdown {
            out.push_str(&format!(
                "  {:<16} {:>6.1}/{:<6.1} ({:>5.1}%)  {DIM}weight {:.2}{RESET}\n",
                slice.category.to_string(),
                slice.earned_points,
                slice.max_points,
                slice.percentage * 100.0,
                slice.weight
            ));
        }
        if grade.excellence {
            out.push_str(&format!("  \x1b[32mExcellence: reference quality{RESET}\n"));
        }
        out.push('\n');
    }

    out.push_str(&format!(
        "{BOLD}FINDINGS{RESET} ({} total)\n",
        grade.total_findings
    ));
    let mut summary_parts = Vec::new();
    if grade.critical_findings > 0 {
        summary_parts.push(format!("\x1b[31m{} critical{RESET}", grade.critical_findings));
    }
    if grade.major_findings > 0 {
        summary_parts.push(format!("\x1b[91m{} major{RESET}", grade.major_findings));
    }
    if grade.minor_findings > 0 {
        summary_parts.push(format!("\x1b[33m{} minor{RESET}", grade.minor_findings));
    }
    if !summary_parts.is_empty() {
        out.push_str(&format!("  {}\n\n", summary_parts.join(" | ")));
    }

    if !grade.findings.is_empty() {
        out.push_str(&format!(
            "{DIM}  #   SEV   RULE                     LOCATION{RESET}\n"
        ));
        out.push_str(&format!(
            "{DIM}  ─────────────────────────────────────────────────────────────────{RESET}\n"
        ));
        for (i, finding) in grade.findings.iter().take(20).enumerate() {
            let sev_c = severity_color(&finding.severity);
            out.push_str(&format!(
                "  {DIM}{:>3}{RESET}  {sev_c}{}{RESET}  {:<23}  {DIM}{}{RESET}\n",
                i + 1,
                severity_tag(&finding.severity),
                finding.rule_id,
                truncate(&finding.location, 40)
            ));
            out.push_str(&format!("       {}\n", truncate(&finding.message, 70)));
        }
        let remaining = grade.findings.len().saturating_sub(20);
        if remaining > 0 {
            out.push_str(&format!(
                "\n  {DIM}...and {} more (use --format json for all){RESET}\n",
                remaining
            ));
        }
        out.push('\n');
    }

    Ok(out)
}

/// Truncate on char boundaries to avoid UTF-8 panics
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
