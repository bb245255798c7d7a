//! Boykov-Kolmogorov max-flow / min-cut
//!
//! Two search trees, rooted at the source and at the sink, grow over the
//! residual network. When they touch, the S->T path through the touching arc
//! is augmented by its bottleneck. Nodes cut off by a saturated parent arc
//! become orphans and are either adopted by another node of their own tree or
//! freed. The search stops when neither tree can grow.
//!
//! Search state persists across calls: a cancelled solve can be resumed and
//! a finished solve is not repeated.

mod adopt;
mod grow;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Instant;

use optnet_common::{Error, Result};
use serde::Serialize;

use crate::capacity::Capacity;
use crate::network::{ArcId, FlowNetwork, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Parent {
    /// Free node (in neither tree)
    None,
    /// Child of its tree's terminal
    Terminal,
    /// Parent arc saturated, awaiting adoption
    Orphan,
    /// Arc from this node to its parent
    Arc(ArcId),
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct NodeState {
    pub parent: Parent,
    pub sink: bool,
    pub active: bool,
    /// Time stamp of the last distance update
    pub ts: u32,
    /// Distance to the tree's terminal (terminal children have 1)
    pub dist: u32,
}

impl Default for NodeState {
    fn default() -> Self {
        Self {
            parent: Parent::None,
            sink: false,
            active: false,
            ts: 0,
            dist: 0,
        }
    }
}

/// Shared flag polled once per iteration of the augmentation loop
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::Relaxed);
    }

    pub fn reset(&self) {
        self.0.store(false, AtomicOrdering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::Relaxed)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MaxflowStats {
    pub n_nodes: usize,
    pub n_arcs: usize,
    pub augmentations: u64,
    pub orphans: u64,
    pub nodes_processed: u64,
    pub solve_time_ms: u64,
}

/// Max-flow engine owning its network and search trees
#[derive(Debug)]
pub struct BkMaxflow<C> {
    pub(crate) net: FlowNetwork<C>,
    pub(crate) nodes: Vec<NodeState>,
    pub(crate) active: VecDeque<NodeId>,
    pub(crate) orphans: VecDeque<NodeId>,
    /// Node kept between iterations after an augmentation through it
    current: Option<NodeId>,
    pub(crate) time: u32,
    pub(crate) flow: C,
    initialized: bool,
    done: bool,
    pub(crate) stats: MaxflowStats,
}

impl<C: Capacity> BkMaxflow<C> {
    /// Take ownership of a network (finalized here if needed)
    pub fn new(mut net: FlowNetwork<C>) -> Result<Self> {
        net.finalize()?;
        let n = net.n_nodes();

        let mut nodes = Vec::new();
        nodes.try_reserve_exact(n)?;
        nodes.resize(n, NodeState::default());

        let mut active = VecDeque::new();
        active.try_reserve(n)?;
        let mut orphans = VecDeque::new();
        orphans.try_reserve(n)?;

        let stats = MaxflowStats {
            n_nodes: n,
            n_arcs: net.n_arcs(),
            ..Default::default()
        };
        let flow = net.base_flow;

        Ok(Self {
            net,
            nodes,
            active,
            orphans,
            current: None,
            time: 0,
            flow,
            initialized: false,
            done: false,
            stats,
        })
    }

    pub fn network(&self) -> &FlowNetwork<C> {
        &self.net
    }

    pub fn stats(&self) -> &MaxflowStats {
        &self.stats
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Flow routed so far (the max flow once `is_done`)
    pub fn flow(&self) -> C {
        self.flow
    }

    /// Run to completion and return the max-flow value
    pub fn solve(&mut self, cancel: Option<&CancelFlag>) -> Result<C> {
        if self.done {
            return Ok(self.flow);
        }
        let start = Instant::now();

        if !self.initialized {
            self.init_trees();
            self.initialized = true;
        }

        loop {
            if cancel.is_some_and(|c| c.is_cancelled()) {
                tracing::warn!(
                    augmentations = self.stats.augmentations,
                    "max-flow cancelled"
                );
                self.stats.solve_time_ms += start.elapsed().as_millis() as u64;
                return Err(Error::Cancelled);
            }

            let i = match self
                .current
                .take()
                .filter(|&i| self.nodes[i as usize].parent != Parent::None)
            {
                Some(i) => i,
                None => match self.next_active() {
                    Some(i) => i,
                    None => break,
                },
            };
            self.stats.nodes_processed += 1;

            if let Some(arc) = self.grow(i) {
                self.time = self.time.wrapping_add(1);
                self.augment(arc);
                self.adopt_orphans();
                self.current = Some(i);
            }
        }

        self.done = true;
        self.stats.solve_time_ms += start.elapsed().as_millis() as u64;
        tracing::debug!(
            n_nodes = self.stats.n_nodes,
            n_arcs = self.stats.n_arcs,
            augmentations = self.stats.augmentations,
            orphans = self.stats.orphans,
            time_ms = self.stats.solve_time_ms,
            "max-flow finished"
        );
        Ok(self.flow)
    }

    /// Source side of the minimum cut: nodes still in the source tree
    ///
    /// Free nodes belong to the sink side, so the source side is exactly the
    /// set of nodes reachable from S in the final residual network.
    pub fn is_source_side(&self, u: NodeId) -> bool {
        let s = &self.nodes[u as usize];
        s.parent != Parent::None && !s.sink
    }

    fn init_trees(&mut self) {
        for u in 0..self.nodes.len() {
            let tr = self.net.tr_cap[u];
            let state = &mut self.nodes[u];
            if tr.is_positive() {
                state.sink = false;
            } else if tr < C::ZERO {
                state.sink = true;
            } else {
                continue;
            }
            state.parent = Parent::Terminal;
            state.ts = 0;
            state.dist = 1;
            self.set_active(u as NodeId);
        }
    }

    #[inline(always)]
    pub(crate) fn set_active(&mut self, u: NodeId) {
        let s = &mut self.nodes[u as usize];
        if !s.active {
            s.active = true;
            self.active.push_back(u);
        }
    }

    fn next_active(&mut self) -> Option<NodeId> {
        while let Some(u) = self.active.pop_front() {
            let s = &mut self.nodes[u as usize];
            s.active = false;
            if s.parent != Parent::None {
                return Some(u);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solve(net: FlowNetwork<i64>) -> (i64, BkMaxflow<i64>) {
        let mut mf = BkMaxflow::new(net).unwrap();
        let flow = mf.solve(None).unwrap();
        (flow, mf)
    }

    #[test]
    fn test_single_edge() {
        let mut net = FlowNetwork::with_capacity(2, 1).unwrap();
        net.add_tweights(0, 10, 0);
        net.add_tweights(1, 0, 10);
        net.add_edge(0, 1, 4, 0).unwrap();
        let (flow, mf) = solve(net);
        assert_eq!(flow, 4);
        assert!(mf.is_source_side(0));
        assert!(!mf.is_source_side(1));
    }

    #[test]
    fn test_queues_reserved_for_every_node() {
        let mut net = FlowNetwork::with_capacity(70_000, 0).unwrap();
        net.add_tweights(0, 1, 0);
        net.add_tweights(69_999, 0, 1);
        let mf = BkMaxflow::new(net).unwrap();
        assert!(mf.orphans.capacity() >= 70_000);
        assert!(mf.active.capacity() >= 70_000);
    }

    #[test]
    fn test_classic_network() {
        // S->0 (16), S->1 (13), 0->1 (10), 1->0 (4), 0->2 (12), 2->1 (9),
        // 1->3 (14), 3->2 (7), 2->T (20), 3->T (4). Max flow 23.
        let mut net = FlowNetwork::with_capacity(4, 6).unwrap();
        net.add_tweights(0, 16, 0);
        net.add_tweights(1, 13, 0);
        net.add_tweights(2, 0, 20);
        net.add_tweights(3, 0, 4);
        net.add_edge(0, 1, 10, 4).unwrap();
        net.add_edge(0, 2, 12, 0).unwrap();
        net.add_edge(2, 1, 9, 0).unwrap();
        net.add_edge(1, 3, 14, 0).unwrap();
        net.add_edge(3, 2, 7, 0).unwrap();
        let (flow, mf) = solve(net);
        assert_eq!(flow, 23);

        // Cut capacity of the reported partition equals the flow
        let net = mf.network();
        let mut cut = 0i64;
        let caps = [(0u32, 16i64, 0i64), (1, 13, 0), (2, 0, 20), (3, 0, 4)];
        for &(u, cs, ct) in &caps {
            if mf.is_source_side(u) {
                cut += ct;
            } else {
                cut += cs;
            }
        }
        let edges = [(0u32, 1u32, 10i64), (1, 0, 4), (0, 2, 12), (2, 1, 9), (1, 3, 14), (3, 2, 7)];
        for &(u, v, c) in &edges {
            if mf.is_source_side(u) && !mf.is_source_side(v) {
                cut += c;
            }
        }
        assert_eq!(cut, 23);
        assert_eq!(net.n_nodes(), 4);
    }

    #[test]
    fn test_repeated_solve_is_stable() {
        let mut net = FlowNetwork::<f64>::with_capacity(3, 2).unwrap();
        net.add_tweights(0, 2.5, 0.0);
        net.add_tweights(2, 0.0, 1.5);
        net.add_edge(0, 1, 3.0, 0.0).unwrap();
        net.add_edge(1, 2, 3.0, 0.0).unwrap();
        let mut mf = BkMaxflow::new(net).unwrap();
        assert_eq!(mf.solve(None).unwrap(), 1.5);
        assert_eq!(mf.solve(None).unwrap(), 1.5);
        assert!(mf.is_done());
    }

    #[test]
    fn test_cancel_then_resume() {
        let mut net = FlowNetwork::<i32>::with_capacity(2, 1).unwrap();
        net.add_tweights(0, 5, 0);
        net.add_tweights(1, 0, 5);
        net.add_edge(0, 1, 3, 0).unwrap();
        let mut mf = BkMaxflow::new(net).unwrap();

        let flag = CancelFlag::new();
        flag.cancel();
        assert!(matches!(mf.solve(Some(&flag)), Err(Error::Cancelled)));
        assert!(!mf.is_done());

        flag.reset();
        assert_eq!(mf.solve(Some(&flag)).unwrap(), 3);
    }

    #[test]
    fn test_disconnected_terminals() {
        let mut net = FlowNetwork::<i64>::with_capacity(3, 0).unwrap();
        net.add_tweights(0, 9, 0);
        net.add_tweights(2, 0, 9);
        let (flow, mf) = solve(net);
        assert_eq!(flow, 0);
        assert!(mf.is_source_side(0));
        assert!(!mf.is_source_side(1));
        assert!(!mf.is_source_side(2));
    }
}
