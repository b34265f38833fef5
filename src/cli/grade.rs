//! `grade` command: load a contract, grade it, render the report

use crate::config::load_project_config;
use crate::document::Document;
use crate::models::Profile;
use crate::reporters;
use crate::rules::builtin_catalog;
use crate::scoring::{apply_profile, would_legacy_auto_fail, Grader};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

pub fn run(
    contract: &Path,
    format: &str,
    output: Option<&Path>,
    profile: &str,
    deps_report: bool,
    fail: bool,
) -> Result<()> {
    let content = std::fs::read_to_string(contract)
        .with_context(|| format!("Failed to read {}", contract.display()))?;
    let root: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", contract.display()))?;
    let document = Document::new(root);

    let config_dir = contract.parent().unwrap_or_else(|| Path::new("."));
    let config = load_project_config(config_dir);
    let catalog = builtin_catalog(&config.prerequisites.catalog_config());

    let profile: Profile = profile
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    info!(
        "Grading {} with {} rules",
        contract.display(),
        catalog.len()
    );
    let grader = Grader::new(&catalog)
        .with_weights(config.scoring.weights)
        .with_pass_threshold(config.scoring.pass_threshold)
        .with_no_target_policy(config.scoring.no_target_policy);
    let grade = grader.grade(&document)?;
    let grade = apply_profile(&grade, profile);

    let mut rendered = match format {
        "json" => reporters::json::render(&grade)?,
        _ => reporters::text::render(&grade)?,
    };

    if deps_report && format != "json" && !grade.blocked_by_prerequisites {
        let scores = grader.score_rules(&document, None)?;
        let order = grader.evaluation_order()?;
        rendered.push_str(&reporters::deps::render(&scores, &order)?);
    }

    if format != "json" && would_legacy_auto_fail(&grade) {
        rendered.push_str(
            "\x1b[2mNote: the retired auto-fail scorer would have zeroed this grade.\x1b[0m\n",
        );
    }

    match output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Report written to {}", path.display());
        }
        None => print!("{}", rendered),
    }

    if fail && !grade.passed {
        std::process::exit(1);
    }
    Ok(())
}
