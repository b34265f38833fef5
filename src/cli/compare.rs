//! `compare` command: diff two saved grade reports

use crate::models::GradeResult;
use crate::scoring::compare_grades;
use anyhow::{Context, Result};
use std::path::Path;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";

fn load_grade(path: &Path) -> Result<GradeResult> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| {
        format!(
            "{} is not a grade report (expected `grade --format json` output)",
            path.display()
        )
    })
}

pub fn run(baseline: &Path, candidate: &Path, format: &str) -> Result<()> {
    let baseline = load_grade(baseline)?;
    let candidate = load_grade(candidate)?;
    let diff = compare_grades(&baseline, &candidate);

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&diff)?);
        return Ok(());
    }

    let trend = if diff.improved {
        format!("{GREEN}improved{RESET}")
    } else if diff.score_delta < 0.0 {
        format!("{RED}regressed{RESET}")
    } else {
        "unchanged".to_string()
    };
    println!("\n{BOLD}Grade Comparison{RESET} ({})", trend);
    println!("  {}", diff.message);

    if !diff.fixed_findings.is_empty() {
        println!("\n{BOLD}{GREEN}FIXED{RESET} ({})", diff.fixed_findings.len());
        for f in &diff.fixed_findings {
            println!("  - {} at {}", f.rule_id, f.location);
        }
    }
    if !diff.new_findings.is_empty() {
        println!("\n{BOLD}{RED}NEW{RESET} ({})", diff.new_findings.len());
        for f in &diff.new_findings {
            println!("  + {} at {}: {}", f.rule_id, f.location, f.message);
        }
    }
    println!();
    Ok(())
}
