//! Dependency-aware rule scoring
//!
//! Builds a directed graph of rule -> dependency edges, computes an
//! evaluation order tolerant of cycles, and scores rules in that order,
//! skipping (not scoring) any rule whose dependency chain has already
//! failed.
//!
//! # Cycle tolerance
//!
//! Ordering is a depth-first postorder with an explicit on-stack set.
//! Revisiting a node that is still on the DFS stack means a cycle; the
//! edge is logged and treated as already satisfied, and the traversal
//! continues. Every node is still emitted exactly once, so a malformed
//! catalog can degrade the ordering but never deadlock the pipeline.

use crate::document::Document;
use crate::error::GradeError;
use crate::models::{DependencyAwareScore, RuleScore, Severity};
use crate::rules::{Catalog, Rule};
use crate::scoring::coverage::CoverageScorer;
use petgraph::graphmap::DiGraphMap;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Skip reason recorded on every cascade-skipped rule
pub const SKIP_REASON_FAILED_DEPS: &str = "Failed dependencies";

/// Rule dependency graph for one evaluation run.
///
/// Edges point from a rule to each of its dependencies. Only edges whose
/// target is inside the evaluated rule set are kept; dangling ids are a
/// catalog diagnostic (`Catalog::validate`), not a scoring concern.
pub struct DependencyGraph<'a> {
    nodes: Vec<&'a Arc<dyn Rule>>,
    edges: DiGraphMap<&'a str, ()>,
}

impl<'a> DependencyGraph<'a> {
    /// One node per rule, one edge per in-set dependency
    pub fn build(rules: &[&'a Arc<dyn Rule>]) -> Self {
        let ids: HashSet<&str> = rules.iter().map(|r| r.id()).collect();
        let mut edges: DiGraphMap<&str, ()> = DiGraphMap::new();
        for rule in rules {
            edges.add_node(rule.id());
        }
        for rule in rules {
            for dep in rule.depends_on() {
                if ids.contains(dep) {
                    edges.add_edge(rule.id(), dep, ());
                } else {
                    debug!(
                        "Rule {} depends on '{}' which is not in the evaluation set; ignoring",
                        rule.id(),
                        dep
                    );
                }
            }
        }
        Self {
            nodes: rules.to_vec(),
            edges,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Cycle-tolerant DFS postorder: every dependency precedes its
    /// dependents unless a cycle forces an edge to be dropped.
    pub fn topological_order(&self) -> Vec<&'a str> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        let mut marks: HashMap<&str, Mark> = HashMap::new();
        let mut order: Vec<&'a str> = Vec::with_capacity(self.nodes.len());

        // Iterative DFS; (node, deps already pushed) frames
        for root in self.nodes.iter().map(|r| r.id()) {
            if marks.contains_key(root) {
                continue;
            }
            let mut stack: Vec<(&'a str, bool)> = vec![(root, false)];
            while let Some((node, expanded)) = stack.pop() {
                if expanded {
                    marks.insert(node, Mark::Done);
                    order.push(node);
                    continue;
                }
                match marks.get(node) {
                    Some(Mark::Done) => continue,
                    Some(Mark::Visiting) => {
                        // Re-pushed frame of a node already being
                        // expanded; handled by its (node, true) frame.
                        continue;
                    }
                    None => {}
                }
                marks.insert(node, Mark::Visiting);
                stack.push((node, true));
                for dep in self.edges.neighbors(node) {
                    match marks.get(dep) {
                        Some(Mark::Visiting) => {
                            warn!(
                                "Dependency cycle detected at edge {} -> {}; treating as satisfied",
                                node, dep
                            );
                        }
                        Some(Mark::Done) => {}
                        None => stack.push((dep, false)),
                    }
                }
            }
        }
        order
    }
}

/// Root-cause view over a finished score map
#[derive(Debug, Clone, Default)]
pub struct ChainAnalysis {
    /// Applicable, non-skipped rules with coverage < 1.0, sorted by id
    pub root_causes: Vec<String>,
    /// Skipped rules grouped under each failed dependency
    pub cascading_failures: BTreeMap<String, Vec<String>>,
    /// Number of skipped rules
    pub affected_rules: usize,
}

/// Scores rules in dependency order with cascading-failure semantics
pub struct DependencyResolver<'a> {
    catalog: &'a Catalog,
    scorer: CoverageScorer,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            scorer: CoverageScorer::new(),
        }
    }

    pub fn with_scorer(mut self, scorer: CoverageScorer) -> Self {
        self.scorer = scorer;
        self
    }

    fn select_rules(
        &self,
        rule_ids: Option<&[&str]>,
    ) -> Result<Vec<&'a Arc<dyn Rule>>, GradeError> {
        match rule_ids {
            Some(ids) => ids
                .iter()
                .map(|id| {
                    self.catalog
                        .get(id)
                        .ok_or_else(|| GradeError::UnknownRule(id.to_string()))
                })
                .collect(),
            None => Ok(self
                .catalog
                .iter()
                .filter(|r| r.severity() != Severity::Prerequisite)
                .collect()),
        }
    }

    /// Evaluation order for the given rules (all non-prerequisite rules
    /// when `rule_ids` is None)
    pub fn evaluation_order(&self, rule_ids: Option<&[&str]>) -> Result<Vec<String>, GradeError> {
        let rules = self.select_rules(rule_ids)?;
        let graph = DependencyGraph::build(&rules);
        Ok(graph
            .topological_order()
            .into_iter()
            .map(String::from)
            .collect())
    }

    /// Score rules in dependency order.
    ///
    /// A rule whose dependency already failed is skipped, scored zero,
    /// and itself marked failed so the cascade propagates. A scored rule
    /// joins the failed set on any applicable shortfall (coverage below
    /// 1.0), not only on total failure.
    pub fn score_with_dependencies(
        &self,
        document: &Document,
        rule_ids: Option<&[&str]>,
    ) -> Result<HashMap<String, DependencyAwareScore>, GradeError> {
        let rules = self.select_rules(rule_ids)?;
        let graph = DependencyGraph::build(&rules);
        let order = graph.topological_order();
        debug!("Evaluation order: {:?}", order);

        let mut failed: HashSet<&str> = HashSet::new();
        let mut scores: HashMap<String, DependencyAwareScore> = HashMap::with_capacity(order.len());

        for id in order {
            let rule = self
                .catalog
                .get(id)
                .expect("ordered id must exist in catalog");

            let failed_deps: Vec<String> = rule
                .depends_on()
                .iter()
                .filter(|dep| failed.contains(**dep))
                .map(|dep| dep.to_string())
                .collect();

            if !failed_deps.is_empty() {
                debug!("Skipping {} (failed dependencies: {:?})", id, failed_deps);
                scores.insert(
                    id.to_string(),
                    DependencyAwareScore {
                        score: RuleScore {
                            rule_id: id.to_string(),
                            category: rule.category(),
                            severity: rule.severity(),
                            applicable: false,
                            coverage: 0.0,
                            points_earned: 0.0,
                            max_points: rule.max_points(),
                            targets_checked: 0,
                            targets_passed: 0,
                            findings: Vec::new(),
                        },
                        skipped: true,
                        skip_reason: Some(SKIP_REASON_FAILED_DEPS.to_string()),
                        failed_dependencies: Some(failed_deps),
                    },
                );
                failed.insert(id);
                continue;
            }

            let score = self.scorer.score(rule.as_ref(), document)?;
            if score.applicable && score.coverage < 1.0 {
                failed.insert(id);
            }
            scores.insert(id.to_string(), DependencyAwareScore::scored(score));
        }

        info!(
            "Scored {} rules, {} in the failed set",
            scores.len(),
            failed.len()
        );
        Ok(scores)
    }

    /// Root causes and cascades over a finished score map
    pub fn analyze_dependency_chains(
        scores: &HashMap<String, DependencyAwareScore>,
    ) -> ChainAnalysis {
        let mut analysis = ChainAnalysis::default();

        for (id, entry) in scores {
            if entry.skipped {
                analysis.affected_rules += 1;
                for cause in entry.failed_dependencies.iter().flatten() {
                    analysis
                        .cascading_failures
                        .entry(cause.clone())
                        .or_default()
                        .push(id.clone());
                }
            } else if entry.score.applicable && entry.score.coverage < 1.0 {
                analysis.root_causes.push(id.clone());
            }
        }

        analysis.root_causes.sort();
        for affected in analysis.cascading_failures.values_mut() {
            affected.sort();
        }
        analysis
    }

    /// Which skipped dependents of `rule_id` would become unblocked if it
    /// passed, judged against the current score snapshot.
    ///
    /// This is a point-in-time projection, not a re-evaluation: a
    /// dependent qualifies only when all its *other* failed dependencies
    /// are no longer failing in the snapshot.
    pub fn unblocked_rules(
        rule_id: &str,
        scores: &HashMap<String, DependencyAwareScore>,
    ) -> Vec<String> {
        let mut unblocked: Vec<String> = scores
            .iter()
            .filter(|(_, entry)| entry.skipped)
            .filter(|(_, entry)| {
                let Some(deps) = entry.failed_dependencies.as_ref() else {
                    return false;
                };
                if !deps.iter().any(|d| d == rule_id) {
                    return false;
                }
                deps.iter().filter(|d| *d != rule_id).all(|other| {
                    scores
                        .get(other)
                        .is_some_and(|dep_entry| !dep_entry.is_failing())
                })
            })
            .map(|(id, _)| id.clone())
            .collect();
        unblocked.sort();
        unblocked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_rules::StubRule;
    use serde_json::json;

    fn doc() -> Document {
        Document::new(json!({}))
    }

    fn catalog(rules: Vec<StubRule>) -> Catalog {
        let mut catalog = Catalog::new();
        for rule in rules {
            catalog.register(Arc::new(rule));
        }
        catalog
    }

    #[test]
    fn test_topological_order_respects_edges() {
        let catalog = catalog(vec![
            StubRule::passing("C", 1).with_deps(vec!["B"]),
            StubRule::passing("B", 1).with_deps(vec!["A"]),
            StubRule::passing("A", 1),
        ]);
        let resolver = DependencyResolver::new(&catalog);
        let order = resolver.evaluation_order(None).unwrap();

        let index = |id: &str| order.iter().position(|o| o == id).unwrap();
        assert!(index("A") < index("B"));
        assert!(index("B") < index("C"));
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn test_cycle_does_not_deadlock() {
        let catalog = catalog(vec![
            StubRule::passing("A", 1).with_deps(vec!["B"]),
            StubRule::passing("B", 1).with_deps(vec!["A"]),
            StubRule::passing("C", 1),
        ]);
        let resolver = DependencyResolver::new(&catalog);
        let order = resolver.evaluation_order(None).unwrap();
        // every node emitted exactly once despite the cycle
        assert_eq!(order.len(), 3);
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(sorted, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_cascade_skip_chain() {
        let catalog = catalog(vec![
            StubRule::failing("A", 2, vec![0]),
            StubRule::passing("B", 2).with_deps(vec!["A"]),
            StubRule::passing("C", 2).with_deps(vec!["B"]),
        ]);
        let resolver = DependencyResolver::new(&catalog);
        let scores = resolver.score_with_dependencies(&doc(), None).unwrap();

        let a = &scores["A"];
        assert!(!a.skipped);
        assert!(a.score.coverage < 1.0);

        let b = &scores["B"];
        assert!(b.skipped);
        assert_eq!(b.skip_reason.as_deref(), Some(SKIP_REASON_FAILED_DEPS));
        assert_eq!(b.failed_dependencies, Some(vec!["A".to_string()]));
        assert_eq!(b.score.points_earned, 0.0);
        assert!(!b.score.applicable);

        let c = &scores["C"];
        assert!(c.skipped);
        assert_eq!(c.failed_dependencies, Some(vec!["B".to_string()]));

        let analysis = DependencyResolver::analyze_dependency_chains(&scores);
        assert_eq!(analysis.root_causes, vec!["A".to_string()]);
        assert_eq!(analysis.affected_rules, 2);
        assert_eq!(
            analysis.cascading_failures["A"],
            vec!["B".to_string()]
        );
        assert_eq!(
            analysis.cascading_failures["B"],
            vec!["C".to_string()]
        );
    }

    #[test]
    fn test_partial_shortfall_blocks_dependents() {
        // 3 of 4 targets pass; any shortfall cascades
        let catalog = catalog(vec![
            StubRule::failing("A", 4, vec![2]),
            StubRule::passing("B", 1).with_deps(vec!["A"]),
        ]);
        let resolver = DependencyResolver::new(&catalog);
        let scores = resolver.score_with_dependencies(&doc(), None).unwrap();
        assert!(scores["B"].skipped);
    }

    #[test]
    fn test_full_coverage_does_not_block() {
        let catalog = catalog(vec![
            StubRule::passing("A", 3),
            StubRule::passing("B", 1).with_deps(vec!["A"]),
        ]);
        let resolver = DependencyResolver::new(&catalog);
        let scores = resolver.score_with_dependencies(&doc(), None).unwrap();
        assert!(!scores["B"].skipped);
        assert_eq!(scores["B"].score.coverage, 1.0);
    }

    #[test]
    fn test_non_applicable_rule_does_not_block() {
        let catalog = catalog(vec![
            StubRule::passing("A", 0),
            StubRule::passing("B", 1).with_deps(vec!["A"]),
        ]);
        let resolver = DependencyResolver::new(&catalog);
        let scores = resolver.score_with_dependencies(&doc(), None).unwrap();
        assert!(!scores["A"].score.applicable);
        assert!(!scores["B"].skipped);
    }

    #[test]
    fn test_restricted_rule_set_and_unknown_id() {
        let catalog = catalog(vec![StubRule::passing("A", 1), StubRule::passing("B", 1)]);
        let resolver = DependencyResolver::new(&catalog);

        let scores = resolver
            .score_with_dependencies(&doc(), Some(&["A"]))
            .unwrap();
        assert_eq!(scores.len(), 1);
        assert!(scores.contains_key("A"));

        let err = resolver
            .score_with_dependencies(&doc(), Some(&["NOPE"]))
            .unwrap_err();
        assert!(matches!(err, GradeError::UnknownRule(_)));
    }

    #[test]
    fn test_unblocked_rules_projection() {
        // D depends on both A and B; A fails, B fails.
        let catalog = catalog(vec![
            StubRule::failing("A", 1, vec![0]),
            StubRule::failing("B", 1, vec![0]),
            StubRule::passing("D", 1).with_deps(vec!["A", "B"]),
        ]);
        let resolver = DependencyResolver::new(&catalog);
        let mut scores = resolver.score_with_dependencies(&doc(), None).unwrap();

        // While B still fails, fixing A alone unblocks nothing.
        assert!(DependencyResolver::unblocked_rules("A", &scores).is_empty());

        // Pretend B now passes in the snapshot.
        let b = scores.get_mut("B").unwrap();
        b.score.coverage = 1.0;
        b.score.targets_passed = b.score.targets_checked;
        b.score.findings.clear();

        assert_eq!(
            DependencyResolver::unblocked_rules("A", &scores),
            vec!["D".to_string()]
        );
    }
}
