//! Rule framework
//!
//! This module defines the polymorphic unit of evaluation:
//! - `Rule` trait that every catalog entry implements
//! - `Catalog`, the explicit read-only registry rules are looked up in
//! - `CatalogDiagnostics` for dangling dependencies and cycles
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                       Catalog                           │
//! │  - Constructed once, immutable afterwards               │
//! │  - Shared read-only across grading requests             │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                      Rule Trait                         │
//! │  - id() / category() / severity() / max_points()        │
//! │  - depends_on(): ids that must hold before this rule    │
//! │  - detect(doc): enumerate targets this rule governs     │
//! │  - validate(target, doc): judge one target              │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! `detect` must be pure with respect to the document (same document,
//! same target list) and `validate` must not mutate the document or the
//! target. Rules returning `Err` propagate to the caller uncaught.

mod catalog;

pub use catalog::{builtin_catalog, BuiltinCatalogConfig};

use crate::document::Document;
use crate::models::{Category, Severity, Target, ValidationResult};
use anyhow::Result;
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A single design rule
pub trait Rule: Send + Sync {
    /// Unique identifier, e.g. "SEC-AUTH-OPS"
    fn id(&self) -> &'static str;

    /// Human-readable description of what this rule checks
    fn description(&self) -> &'static str;

    fn category(&self) -> Category;

    /// `Severity::Prerequisite` marks a gating rule; it is never scored.
    fn severity(&self) -> Severity;

    /// Points at full coverage; 0 for prerequisites
    fn max_points(&self) -> f64;

    /// Ids of rules that must fully pass before this one is scored
    fn depends_on(&self) -> Vec<&'static str> {
        vec![]
    }

    /// Enumerate the concrete locations this rule governs in `document`
    fn detect(&self, document: &Document) -> Result<Vec<Target>>;

    /// Judge one target independently
    fn validate(&self, target: &Target, document: &Document) -> Result<ValidationResult>;
}

/// Catalog validation output: anomalies in the rule set itself.
///
/// These are catalog bugs surfaced separately from document grading;
/// neither aborts scoring. Cycles are broken deterministically by the
/// dependency resolver, dangling ids are ignored when scoring.
#[derive(Debug, Clone, Default)]
pub struct CatalogDiagnostics {
    /// (rule id, missing dependency id)
    pub dangling_dependencies: Vec<(String, String)>,
    /// Each strongly connected component of size > 1
    pub cycles: Vec<Vec<String>>,
}

impl CatalogDiagnostics {
    pub fn is_clean(&self) -> bool {
        self.dangling_dependencies.is_empty() && self.cycles.is_empty()
    }
}

/// Explicit, constructed rule registry.
///
/// There is no process-wide mutable registry: every engine call receives
/// a `Catalog` value. Catalogs are immutable after construction and may
/// be shared across concurrent grading requests.
#[derive(Default, Clone)]
pub struct Catalog {
    rules: Vec<Arc<dyn Rule>>,
    by_id: HashMap<&'static str, usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule. Later registrations with a duplicate id replace
    /// the earlier entry.
    pub fn register(&mut self, rule: Arc<dyn Rule>) {
        debug!("Registering rule: {}", rule.id());
        if let Some(&idx) = self.by_id.get(rule.id()) {
            self.rules[idx] = rule;
        } else {
            self.by_id.insert(rule.id(), self.rules.len());
            self.rules.push(rule);
        }
    }

    pub fn register_all(&mut self, rules: impl IntoIterator<Item = Arc<dyn Rule>>) {
        for rule in rules {
            self.register(rule);
        }
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Rule>> {
        self.by_id.get(id).map(|&idx| &self.rules[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Rule>> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Ids of all non-prerequisite rules, in registration order
    pub fn scored_rule_ids(&self) -> Vec<&'static str> {
        self.rules
            .iter()
            .filter(|r| r.severity() != Severity::Prerequisite)
            .map(|r| r.id())
            .collect()
    }

    /// Gating rules, in registration order
    pub fn prerequisite_rules(&self) -> Vec<&Arc<dyn Rule>> {
        self.rules
            .iter()
            .filter(|r| r.severity() == Severity::Prerequisite)
            .collect()
    }

    /// Check the catalog for dangling dependency ids and cycles.
    ///
    /// Cycle detection uses Tarjan's SCC algorithm: every component with
    /// more than one node is a dependency cycle.
    pub fn validate(&self) -> CatalogDiagnostics {
        let mut diagnostics = CatalogDiagnostics::default();

        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for rule in &self.rules {
            graph.add_node(rule.id());
        }
        for rule in &self.rules {
            for dep in rule.depends_on() {
                if self.by_id.contains_key(dep) {
                    graph.add_edge(rule.id(), dep, ());
                } else {
                    diagnostics
                        .dangling_dependencies
                        .push((rule.id().to_string(), dep.to_string()));
                }
            }
        }

        for component in tarjan_scc(&graph) {
            if component.len() > 1 {
                diagnostics
                    .cycles
                    .push(component.iter().map(|id| id.to_string()).collect());
            }
        }

        diagnostics
    }
}


#[cfg(test)]
mod tests {
    use super::test_rules::StubRule;
    use super::*;

    #[test]
    fn test_catalog_lookup_and_iteration() {
        let mut catalog = Catalog::new();
        catalog.register(Arc::new(StubRule::passing("A", 1)));
        catalog.register(Arc::new(StubRule::passing("B", 1)));

        assert_eq!(catalog.len(), 2);
        assert!(catalog.get("A").is_some());
        assert!(catalog.get("missing").is_none());
        assert_eq!(catalog.scored_rule_ids(), vec!["A", "B"]);
    }

    #[test]
    fn test_duplicate_registration_replaces() {
        let mut catalog = Catalog::new();
        catalog.register(Arc::new(StubRule::passing("A", 1)));
        catalog.register(Arc::new(StubRule::failing("A", 2, vec![0])));

        assert_eq!(catalog.len(), 1);
        let doc = Document::new(serde_json::json!({}));
        assert_eq!(catalog.get("A").unwrap().detect(&doc).unwrap().len(), 2);
    }

    #[test]
    fn test_validate_reports_dangling_dependencies() {
        let mut catalog = Catalog::new();
        catalog.register(Arc::new(
            StubRule::passing("A", 1).with_deps(vec!["NOPE"]),
        ));

        let diagnostics = catalog.validate();
        assert_eq!(
            diagnostics.dangling_dependencies,
            vec![("A".to_string(), "NOPE".to_string())]
        );
        assert!(diagnostics.cycles.is_empty());
    }

    #[test]
    fn test_validate_reports_cycles() {
        let mut catalog = Catalog::new();
        catalog.register(Arc::new(StubRule::passing("A", 1).with_deps(vec!["B"])));
        catalog.register(Arc::new(StubRule::passing("B", 1).with_deps(vec!["A"])));
        catalog.register(Arc::new(StubRule::passing("C", 1)));

        let diagnostics = catalog.validate();
        assert_eq!(diagnostics.cycles.len(), 1);
        let mut cycle = diagnostics.cycles[0].clone();
        cycle.sort();
        assert_eq!(cycle, vec!["A".to_string(), "B".to_string()]);
    }
}
