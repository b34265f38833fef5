//! CLI command definitions and handlers

mod compare;
mod grade;
mod rules;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Specgrade - Dependency-aware API contract grading
///
/// Grades an OpenAPI contract against a rule catalog and produces a
/// 0-100 score with a letter grade.
#[derive(Parser, Debug)]
#[command(name = "specgrade")]
#[command(
    version,
    about = "Grade API contracts against a dependency-aware rule catalog",
    long_about = "Specgrade evaluates an OpenAPI contract against a catalog of design rules. \
Rules declare dependencies on each other; a failed rule cascades, skipping its \
dependents instead of double-penalizing them. Prerequisite rules gate the whole \
run: a contract that fails one is blocked outright with a 0.0 / F grade and a \
list of required fixes.\n\n\
Scores are weighted across five categories (functionality, security, \
scalability, maintainability, excellence) and mapped to letter grades A+ to F.",
    after_help = "\
Examples:
  specgrade grade api.json                       Grade a contract
  specgrade grade api.json --format json         JSON output for scripting
  specgrade grade api.json --profile public      Stricter pass threshold (80)
  specgrade grade api.json --deps-report         Show root causes and cascades
  specgrade compare old.json new.json            Diff two saved grade reports
  specgrade rules                                List the rule catalog

Per-project settings are read from specgrade.toml next to the contract."
)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Grade an OpenAPI contract (JSON)
    #[command(after_help = "\
Examples:
  specgrade grade api.json                       Grade with defaults
  specgrade grade api.json --format json         Machine-readable report
  specgrade grade api.json -o report.json --format json   Save for later compare
  specgrade grade api.json --profile prototype   Lenient pass threshold (50)
  specgrade grade api.json --deps-report         Dependency diagnostics
  specgrade grade api.json --fail                Exit 1 when the grade fails (CI mode)")]
    Grade {
        /// Path to the contract file
        contract: PathBuf,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,

        /// Output file path (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Grading profile: standard, public, internal, prototype
        #[arg(long, default_value = "standard", value_parser = ["standard", "public", "internal", "prototype"])]
        profile: String,

        /// Append a dependency report (root causes, cascades, order)
        #[arg(long)]
        deps_report: bool,

        /// Exit with code 1 when the grade does not pass
        #[arg(long)]
        fail: bool,
    },

    /// Compare two saved grade reports (shows fixed, new, score delta)
    #[command(after_help = "\
Workflow:
  specgrade grade api.json --format json -o baseline.json
  # ... edit the contract ...
  specgrade grade api.json --format json -o current.json
  specgrade compare baseline.json current.json

Examples:
  specgrade compare baseline.json current.json            Text diff
  specgrade compare baseline.json current.json --format json   JSON for CI")]
    Compare {
        /// Baseline grade report (JSON, from `grade --format json`)
        baseline: PathBuf,

        /// Candidate grade report (JSON)
        candidate: PathBuf,

        /// Output format: text, json
        #[arg(long, short = 'f', default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// List the rule catalog (ids, categories, points, dependencies)
    Rules {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Grade {
            contract,
            format,
            output,
            profile,
            deps_report,
            fail,
        } => grade::run(
            &contract,
            &format,
            output.as_deref(),
            &profile,
            deps_report,
            fail,
        ),

        Commands::Compare {
            baseline,
            candidate,
            format,
        } => compare::run(&baseline, &candidate, &format),

        Commands::Rules { json } => rules::run(json),
    }
}
