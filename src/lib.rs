//! Specgrade - Dependency-aware conformance grading for API contracts
//!
//! Evaluates an OpenAPI contract against a catalog of design rules and
//! produces a weighted 0-100 score with a letter grade. Rules declare
//! dependencies on each other; a failed rule cascades, skipping its
//! dependents instead of double-penalizing them. Prerequisite rules gate
//! the whole run.
//!
//! # Quick start
//!
//! ```no_run
//! use specgrade::document::Document;
//! use specgrade::rules::{builtin_catalog, BuiltinCatalogConfig};
//! use specgrade::scoring::Grader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let root: serde_json::Value = serde_json::from_str(r#"{"openapi": "3.0.3"}"#)?;
//! let catalog = builtin_catalog(&BuiltinCatalogConfig::default());
//! let grade = Grader::new(&catalog).grade(&Document::new(root))?;
//! println!("{} ({})", grade.score, grade.letter_grade);
//! # Ok(())
//! # }
//! ```
//!
//! Hosts with their own rule sets implement [`rules::Rule`] and build a
//! [`rules::Catalog`] directly instead of using the built-in one.

pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod models;
pub mod reporters;
pub mod rules;
pub mod scoring;

pub use error::GradeError;
pub use models::{Finding, GradeResult, Profile, Severity};
pub use rules::{Catalog, Rule};
pub use scoring::Grader;
