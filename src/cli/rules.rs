//! `rules` command: list the built-in catalog

use crate::config::load_project_config;
use crate::models::Severity;
use crate::rules::builtin_catalog;
use anyhow::Result;
use serde::Serialize;
use std::path::Path;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

#[derive(Serialize)]
struct RuleInfo {
    id: &'static str,
    description: &'static str,
    category: String,
    severity: String,
    max_points: f64,
    depends_on: Vec<&'static str>,
}

pub fn run(json: bool) -> Result<()> {
    let config = load_project_config(Path::new("."));
    let catalog = builtin_catalog(&config.prerequisites.catalog_config());

    if json {
        let infos: Vec<RuleInfo> = catalog
            .iter()
            .map(|rule| RuleInfo {
                id: rule.id(),
                description: rule.description(),
                category: rule.category().to_string(),
                severity: rule.severity().to_string(),
                max_points: rule.max_points(),
                depends_on: rule.depends_on(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&infos)?);
        return Ok(());
    }

    println!("\n{BOLD}Rule Catalog{RESET} ({} rules)\n", catalog.len());

    println!("{BOLD}PREREQUISITES{RESET} (gate the whole run, never scored)");
    for rule in catalog.prerequisite_rules() {
        println!("  {:<24} {}", rule.id(), rule.description());
    }

    println!("\n{BOLD}SCORED RULES{RESET}");
    for rule in catalog.iter() {
        if rule.severity() == Severity::Prerequisite {
            continue;
        }
        let deps = rule.depends_on();
        let deps = if deps.is_empty() {
            String::new()
        } else {
            format!("  {DIM}after {}{RESET}", deps.join(", "))
        };
        println!(
            "  {:<24} {:<16} {:<9} {:>4.0} pts  {}{}",
            rule.id(),
            rule.category().to_string(),
            rule.severity().to_string(),
            rule.max_points(),
            rule.description(),
            deps
        );
    }

    let diagnostics = catalog.validate();
    if !diagnostics.is_clean() {
        println!("\n{BOLD}CATALOG DIAGNOSTICS{RESET}");
        for (rule, dep) in &diagnostics.dangling_dependencies {
            println!("  {} depends on unknown rule '{}'", rule, dep);
        }
        for cycle in &diagnostics.cycles {
            println!("  dependency cycle: {}", cycle.join(" -> "));
        }
    }
    println!();
    Ok(())
}
