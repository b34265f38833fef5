//! Dependency diagnostics reporter
//!
//! Turns a finished score map into a textual view of root causes and the
//! rules they dragged down, plus what fixing each root cause would
//! unblock.

use crate::models::DependencyAwareScore;
use crate::scoring::{ChainAnalysis, DependencyResolver};
use anyhow::Result;
use std::collections::HashMap;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";

/// Render root causes, cascades, and the evaluation order
pub fn render(
    scores: &HashMap<String, DependencyAwareScore>,
    evaluation_order: &[String],
) -> Result<String> {
    let analysis = DependencyResolver::analyze_dependency_chains(scores);
    let mut out = String::new();

    out.push_str(&format!("\n{BOLD}Dependency Report{RESET}\n"));
    out.push_str(&format!(
        "{DIM}──────────────────────────────────────{RESET}\n"
    ));

    if analysis.root_causes.is_empty() && analysis.affected_rules == 0 {
        out.push_str(&format!("{GREEN}No failing dependency chains.{RESET}\n\n"));
    } else {
        render_chains(&mut out, &analysis, scores);
    }

    if !evaluation_order.is_empty() {
        out.push_str(&format!("{BOLD}EVALUATION ORDER{RESET}\n"));
        for (i, id) in evaluation_order.iter().enumerate() {
            let marker = match scores.get(id) {
                Some(entry) if entry.skipped => format!("{YELLOW}skipped{RESET}"),
                Some(entry) if entry.is_failing() => format!("{RED}failed{RESET}"),
                Some(_) => format!("{GREEN}passed{RESET}"),
                None => format!("{DIM}not scored{RESET}"),
            };
            out.push_str(&format!("  {DIM}{:>3}.{RESET} {:<28} {}\n", i + 1, id, marker));
        }
        out.push('\n');
    }

    Ok(out)
}

fn render_chains(
    out: &mut String,
    analysis: &ChainAnalysis,
    scores: &HashMap<String, DependencyAwareScore>,
) {
    out.push_str(&format!(
        "{BOLD}ROOT CAUSES{RESET} ({} rules skipped downstream)\n",
        analysis.affected_rules
    ));
    for cause in &analysis.root_causes {
        let coverage = scores
            .get(cause)
            .map(|entry| entry.score.coverage * 100.0)
            .unwrap_or(0.0);
        out.push_str(&format!(
            "  {RED}{}{RESET}  {DIM}coverage {:.0}%{RESET}\n",
            cause, coverage
        ));
        let unblocked = DependencyResolver::unblocked_rules(cause, scores);
        if !unblocked.is_empty() {
            out.push_str(&format!(
                "    fixing this unblocks: {}\n",
                unblocked.join(", ")
            ));
        }
    }
    out.push('\n');

    if !analysis.cascading_failures.is_empty() {
        out.push_str(&format!("{BOLD}CASCADES{RESET}\n"));
        for (cause, affected) in &analysis.cascading_failures {
            out.push_str(&format!(
                "  {} {DIM}->{RESET} {}\n",
                cause,
                affected.join(", ")
            ));
        }
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_rules::StubRule;
    use crate::rules::Catalog;
    use crate::scoring::DependencyResolver;
    use serde_json::json;
    use std::sync::Arc;

    fn scored_chain() -> HashMap<String, DependencyAwareScore> {
        let mut catalog = Catalog::new();
        catalog.register(Arc::new(StubRule::failing("A", 2, vec![0])));
        catalog.register(Arc::new(StubRule::passing("B", 2).with_deps(vec!["A"])));
        catalog.register(Arc::new(StubRule::passing("C", 1)));
        let document = crate::document::Document::new(json!({}));
        DependencyResolver::new(&catalog)
            .score_with_dependencies(&document, None)
            .unwrap()
    }

    #[test]
    fn test_render_chain_report() {
        let scores = scored_chain();
        let order = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let out = render(&scores, &order).unwrap();
        assert!(out.contains("ROOT CAUSES"));
        assert!(out.contains("CASCADES"));
        assert!(out.contains("fixing this unblocks: B"));
        assert!(out.contains("EVALUATION ORDER"));
    }

    #[test]
    fn test_render_clean_report() {
        let out = render(&HashMap::new(), &[]).unwrap();
        assert!(out.contains("No failing dependency chains"));
        assert!(!out.contains("EVALUATION ORDER"));
    }
}
