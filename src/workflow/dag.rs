//! Workflow DAG Analysis
//!
//! Builds the step dependency graph of a workflow from the input links of
//! its steps and orders the steps topologically.
//!
//! Edges follow data flow: producer → consumer. Two views are kept:
//! - `forward`: step → steps that consume its outputs
//! - `reverse`: step → steps whose outputs it consumes
//!
//! The two views are built together, so every id found among the values of
//! one map is a key of the other.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use log::debug;

use crate::error::{Error, Result};

/// Anything that can be placed in a workflow graph.
pub trait DagNode {
    /// Identifier of this step.
    fn node_id(&self) -> String;

    /// Identifiers of the steps feeding this step's inputs.
    fn upstream_ids(&self) -> Vec<String>;
}

/// Adjacency maps of a workflow's steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowDag {
    forward: BTreeMap<String, BTreeSet<String>>,
    reverse: BTreeMap<String, BTreeSet<String>>,
}

impl WorkflowDag {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph by inverting each step's upstream links.
    ///
    /// Steps with no links in either direction do not appear in the maps.
    pub fn build<'a, N, I>(steps: I) -> Self
    where
        N: DagNode + 'a,
        I: IntoIterator<Item = &'a N>,
    {
        let mut dag = Self::new();
        for step in steps {
            let tail = step.node_id();
            for head in step.upstream_ids() {
                dag.add_edge(head, tail.clone());
            }
        }
        debug!("Built workflow DAG with {} edges", dag.edge_count());
        dag
    }

    /// Records that `head` feeds `tail`.
    pub fn add_edge(&mut self, head: impl Into<String>, tail: impl Into<String>) {
        let head = head.into();
        let tail = tail.into();
        self.forward
            .entry(head.clone())
            .or_default()
            .insert(tail.clone());
        self.reverse.entry(tail).or_default().insert(head);
    }

    /// Producer → consumers.
    pub fn forward(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.forward
    }

    /// Consumer → producers.
    pub fn reverse(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.reverse
    }

    /// Steps whose outputs feed `id`.
    pub fn upstream_of(&self, id: &str) -> impl Iterator<Item = &String> {
        self.reverse.get(id).into_iter().flatten()
    }

    /// Steps consuming the outputs of `id`.
    pub fn downstream_of(&self, id: &str) -> impl Iterator<Item = &String> {
        self.forward.get(id).into_iter().flatten()
    }

    /// Every id appearing in either map.
    pub fn node_ids(&self) -> BTreeSet<String> {
        self.forward
            .keys()
            .chain(self.reverse.keys())
            .cloned()
            .collect()
    }

    pub fn edge_count(&self) -> usize {
        self.forward.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Orders all ids so that every producer comes before its consumers.
    ///
    /// Uses Kahn's algorithm. When several steps are ready at once the
    /// smallest id goes first (numerically for integer ids); this keeps the
    /// output stable between runs, but callers should rely only on the
    /// dependency order.
    ///
    /// Returns [`Error::CycleDetected`] naming the steps left unsorted if
    /// the graph has a cycle.
    pub fn sorted_step_ids(&self) -> Result<Vec<String>> {
        let nodes = self.node_ids();

        let mut in_degree: HashMap<&str, usize> = nodes
            .iter()
            .map(|id| (id.as_str(), self.reverse.get(id).map_or(0, BTreeSet::len)))
            .collect();

        let mut ready: BTreeSet<StepKey> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| StepKey(id.to_string()))
            .collect();

        let mut sorted_order: Vec<String> = Vec::with_capacity(nodes.len());

        while let Some(StepKey(current)) = ready.pop_first() {
            for successor in self.downstream_of(&current) {
                if let Some(degree) = in_degree.get_mut(successor.as_str()) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(StepKey(successor.clone()));
                    }
                }
            }
            sorted_order.push(current);
        }

        if sorted_order.len() != nodes.len() {
            let mut stuck: Vec<String> = in_degree
                .into_iter()
                .filter(|(_, degree)| *degree > 0)
                .map(|(id, _)| id.to_string())
                .collect();
            sort_step_ids(&mut stuck);
            return Err(Error::CycleDetected(stuck));
        }

        debug!("Topological order: {:?}", sorted_order);
        Ok(sorted_order)
    }
}

/// Compares step ids numerically when both are integers, lexically
/// otherwise. Integer ids sort before the rest.
pub fn compare_step_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Sorts ids with [`compare_step_ids`].
pub fn sort_step_ids(ids: &mut [String]) {
    ids.sort_by(|a, b| compare_step_ids(a, b));
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StepKey(String);

impl Ord for StepKey {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_step_ids(&self.0, &other.0)
    }
}

impl PartialOrd for StepKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestStep {
        id: &'static str,
        inputs: Vec<&'static str>,
    }

    impl DagNode for TestStep {
        fn node_id(&self) -> String {
            self.id.to_string()
        }

        fn upstream_ids(&self) -> Vec<String> {
            self.inputs.iter().map(|s| s.to_string()).collect()
        }
    }

    fn step(id: &'static str, inputs: &[&'static str]) -> TestStep {
        TestStep {
            id,
            inputs: inputs.to_vec(),
        }
    }

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn position(order: &[String], id: &str) -> usize {
        order.iter().position(|s| s == id).unwrap()
    }

    /// Every id of one map's values is a key of the other, and back.
    fn assert_symmetric(dag: &WorkflowDag) {
        let heads: BTreeSet<String> = dag.forward().keys().cloned().collect();
        let tails: BTreeSet<String> = dag.reverse().keys().cloned().collect();
        let fwd_values: BTreeSet<String> = dag.forward().values().flatten().cloned().collect();
        let rev_values: BTreeSet<String> = dag.reverse().values().flatten().cloned().collect();
        assert_eq!(heads, rev_values);
        assert_eq!(tails, fwd_values);
    }

    fn assert_respects_edges(dag: &WorkflowDag, order: &[String]) {
        for (head, tails) in dag.forward() {
            for tail in tails {
                assert!(
                    position(order, head) < position(order, tail),
                    "{} should come before {} in {:?}",
                    head,
                    tail,
                    order
                );
            }
        }
    }

    #[test]
    fn test_two_inputs_one_tool() {
        let steps = vec![step("1", &[]), step("2", &[]), step("3", &["1", "2"])];
        let dag = WorkflowDag::build(&steps);

        let mut forward = BTreeMap::new();
        forward.insert("1".to_string(), set(&["3"]));
        forward.insert("2".to_string(), set(&["3"]));
        assert_eq!(dag.forward(), &forward);

        let mut reverse = BTreeMap::new();
        reverse.insert("3".to_string(), set(&["1", "2"]));
        assert_eq!(dag.reverse(), &reverse);

        let order = dag.sorted_step_ids().unwrap();
        assert_eq!(order.len(), 3);
        assert!(position(&order, "3") > position(&order, "1"));
        assert!(position(&order, "3") > position(&order, "2"));
    }

    #[test]
    fn test_maps_are_symmetric() {
        let steps = vec![
            step("a", &[]),
            step("b", &["a"]),
            step("c", &["a"]),
            step("d", &["b", "c"]),
            step("e", &["d", "a"]),
        ];
        let dag = WorkflowDag::build(&steps);
        assert_symmetric(&dag);
        assert_eq!(dag.edge_count(), 6);
    }

    #[test]
    fn test_sorted_ids_cover_both_maps() {
        let steps = vec![
            step("a", &[]),
            step("b", &["a"]),
            step("c", &["a"]),
            step("d", &["b", "c"]),
        ];
        let dag = WorkflowDag::build(&steps);
        let order = dag.sorted_step_ids().unwrap();

        let ids: BTreeSet<String> = order.iter().cloned().collect();
        assert_eq!(ids, dag.node_ids());
        assert_respects_edges(&dag, &order);
    }

    #[test]
    fn test_linear_chain_given_out_of_order() {
        let steps = vec![step("s3", &["s2"]), step("s1", &[]), step("s2", &["s1"])];
        let dag = WorkflowDag::build(&steps);
        assert_eq!(dag.sorted_step_ids().unwrap(), ["s1", "s2", "s3"]);
    }

    #[test]
    fn test_ties_break_numerically() {
        let steps = vec![step("10", &[]), step("2", &[]), step("11", &["10", "2"])];
        let dag = WorkflowDag::build(&steps);
        assert_eq!(dag.sorted_step_ids().unwrap(), ["2", "10", "11"]);
    }

    #[test]
    fn test_isolated_steps_are_not_nodes() {
        let steps = vec![step("1", &[]), step("2", &["1"]), step("3", &[])];
        let dag = WorkflowDag::build(&steps);
        assert_eq!(dag.node_ids(), set(&["1", "2"]));
    }

    #[test]
    fn test_repeated_link_is_single_edge() {
        let steps = vec![step("1", &[]), step("2", &["1", "1"])];
        let dag = WorkflowDag::build(&steps);
        assert_eq!(dag.edge_count(), 1);
        assert_eq!(dag.upstream_of("2").collect::<Vec<_>>(), ["1"]);
        assert_eq!(dag.downstream_of("1").collect::<Vec<_>>(), ["2"]);
        assert_eq!(dag.downstream_of("2").count(), 0);
    }

    #[test]
    fn test_empty_graph() {
        let steps: Vec<TestStep> = Vec::new();
        let dag = WorkflowDag::build(&steps);
        assert!(dag.is_empty());
        assert!(dag.sorted_step_ids().unwrap().is_empty());
    }

    #[test]
    fn test_cycle_detected() {
        let steps = vec![step("0", &[]), step("1", &["0", "2"]), step("2", &["1"])];
        let dag = WorkflowDag::build(&steps);
        match dag.sorted_step_ids() {
            Err(Error::CycleDetected(stuck)) => assert_eq!(stuck, ["1", "2"]),
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_loop_is_cycle() {
        let steps = vec![step("x", &["x"])];
        let dag = WorkflowDag::build(&steps);
        assert!(matches!(dag.sorted_step_ids(), Err(Error::CycleDetected(_))));
    }

    #[test]
    fn test_compare_step_ids() {
        let mut ids: Vec<String> = ["100", "b", "99", "a", "7"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        sort_step_ids(&mut ids);
        assert_eq!(ids, ["7", "99", "100", "a", "b"]);
    }
}
