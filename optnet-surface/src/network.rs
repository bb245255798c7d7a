//! Flow network arena
//!
//! Nodes and arcs live in flat arrays addressed by `u32` indices. Arcs are
//! created in pairs: arc `2k` and arc `2k + 1` are each other's reverse, so the
//! sister of `a` is `a ^ 1`. Outgoing arcs are grouped per tail node in CSR
//! form once the network is finalized.
//!
//! Terminal arcs are folded into one signed residual per node: a positive
//! value is residual capacity from the source, a negative value residual
//! capacity to the sink.

use optnet_common::{Error, Result};

use crate::capacity::Capacity;

pub type NodeId = u32;
pub type ArcId = u32;

#[inline(always)]
pub fn sister(a: ArcId) -> ArcId {
    a ^ 1
}

#[derive(Debug, Clone)]
pub struct FlowNetwork<C> {
    n_nodes: usize,

    // Per arc
    pub(crate) heads: Vec<NodeId>,
    pub(crate) residual: Vec<C>,

    // Outgoing arcs, CSR over tail nodes (filled by finalize)
    pub(crate) out_offsets: Vec<u32>,
    pub(crate) out_arcs: Vec<ArcId>,

    // Tail of each arc pair's forward arc until finalize
    pending_tails: Vec<NodeId>,

    // Signed terminal residual per node
    pub(crate) tr_cap: Vec<C>,

    // Flow already routed directly S -> node -> T by add_tweights
    pub(crate) base_flow: C,

    finalized: bool,
}

impl<C: Capacity> FlowNetwork<C> {
    /// Allocate an empty network; reservation failures are resource errors
    pub fn with_capacity(n_nodes: usize, n_edges: usize) -> Result<Self> {
        let n_arcs = n_edges
            .checked_mul(2)
            .filter(|&n| n < u32::MAX as usize && n_nodes < u32::MAX as usize)
            .ok_or_else(|| {
                Error::Resource(format!(
                    "network of {} nodes / {} edges exceeds 32-bit indexing",
                    n_nodes, n_edges
                ))
            })?;

        let mut heads = Vec::new();
        heads.try_reserve_exact(n_arcs)?;
        let mut residual = Vec::new();
        residual.try_reserve_exact(n_arcs)?;
        let mut pending_tails = Vec::new();
        pending_tails.try_reserve_exact(n_edges)?;
        let mut tr_cap = Vec::new();
        tr_cap.try_reserve_exact(n_nodes)?;
        tr_cap.resize(n_nodes, C::ZERO);

        Ok(Self {
            n_nodes,
            heads,
            residual,
            out_offsets: Vec::new(),
            out_arcs: Vec::new(),
            pending_tails,
            tr_cap,
            base_flow: C::ZERO,
            finalized: false,
        })
    }

    pub fn n_nodes(&self) -> usize {
        self.n_nodes
    }

    pub fn n_arcs(&self) -> usize {
        self.heads.len()
    }

    /// Add arc `u -> v` with capacity `cap` and reverse arc `v -> u` with `rev_cap`
    pub fn add_edge(&mut self, u: NodeId, v: NodeId, cap: C, rev_cap: C) -> Result<()> {
        debug_assert!(!self.finalized, "add_edge after finalize");
        debug_assert!((u as usize) < self.n_nodes && (v as usize) < self.n_nodes);
        debug_assert!(u != v, "self loop on node {}", u);

        if self.heads.len() + 2 > u32::MAX as usize {
            return Err(Error::Resource("arc count exceeds 32-bit indexing".to_string()));
        }
        self.heads.try_reserve(2)?;
        self.residual.try_reserve(2)?;
        self.pending_tails.try_reserve(1)?;

        self.heads.push(v);
        self.residual.push(cap);
        self.heads.push(u);
        self.residual.push(rev_cap);
        self.pending_tails.push(u);
        Ok(())
    }

    /// Add terminal capacities `S -> u` and `u -> T`
    pub fn add_tweights(&mut self, u: NodeId, cap_source: C, cap_sink: C) {
        let (mut cs, mut ct) = (cap_source, cap_sink);
        let delta = self.tr_cap[u as usize];
        if delta.is_positive() {
            cs += delta;
        } else {
            ct -= delta;
        }
        self.base_flow += cs.min_of(ct);
        self.tr_cap[u as usize] = cs - ct;
    }

    /// Group arcs by tail node (counting sort); no edges may be added afterwards
    pub fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Ok(());
        }

        let mut counts: Vec<u32> = Vec::new();
        counts.try_reserve_exact(self.n_nodes + 1)?;
        counts.resize(self.n_nodes + 1, 0);

        for (k, &u) in self.pending_tails.iter().enumerate() {
            counts[u as usize + 1] += 1;
            let v = self.heads[2 * k];
            counts[v as usize + 1] += 1;
        }
        for u in 0..self.n_nodes {
            counts[u + 1] += counts[u];
        }

        let mut out_arcs: Vec<ArcId> = Vec::new();
        out_arcs.try_reserve_exact(self.heads.len())?;
        out_arcs.resize(self.heads.len(), 0);

        let mut cursor = counts.clone();
        for (k, &u) in self.pending_tails.iter().enumerate() {
            let fwd = (2 * k) as ArcId;
            let v = self.heads[2 * k];
            out_arcs[cursor[u as usize] as usize] = fwd;
            cursor[u as usize] += 1;
            out_arcs[cursor[v as usize] as usize] = sister(fwd);
            cursor[v as usize] += 1;
        }

        self.out_offsets = counts;
        self.out_arcs = out_arcs;
        self.pending_tails = Vec::new();
        self.finalized = true;
        Ok(())
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    #[inline(always)]
    pub fn out_range(&self, u: NodeId) -> std::ops::Range<usize> {
        self.out_offsets[u as usize] as usize..self.out_offsets[u as usize + 1] as usize
    }

    /// Outgoing arcs of `u` (finalized networks only)
    #[inline(always)]
    pub fn out_arcs(&self, u: NodeId) -> &[ArcId] {
        &self.out_arcs[self.out_range(u)]
    }

    #[inline(always)]
    pub fn head(&self, a: ArcId) -> NodeId {
        self.heads[a as usize]
    }

    #[inline(always)]
    pub fn tail(&self, a: ArcId) -> NodeId {
        self.heads[sister(a) as usize]
    }

    #[inline(always)]
    pub fn residual(&self, a: ArcId) -> C {
        self.residual[a as usize]
    }

    #[inline(always)]
    pub fn terminal_residual(&self, u: NodeId) -> C {
        self.tr_cap[u as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arc_pairs_and_csr() {
        let mut net = FlowNetwork::<i32>::with_capacity(3, 2).unwrap();
        net.add_edge(0, 1, 5, 0).unwrap();
        net.add_edge(1, 2, 3, 1).unwrap();
        net.finalize().unwrap();

        assert_eq!(net.n_arcs(), 4);
        assert_eq!(net.head(0), 1);
        assert_eq!(net.tail(0), 0);
        assert_eq!(net.head(sister(0)), 0);
        assert_eq!(net.residual(3), 1);

        assert_eq!(net.out_arcs(0), &[0]);
        let mut mid: Vec<ArcId> = net.out_arcs(1).to_vec();
        mid.sort_unstable();
        assert_eq!(mid, vec![1, 2]);
        assert_eq!(net.out_arcs(2), &[3]);
        for u in 0..3 {
            for &a in net.out_arcs(u) {
                assert_eq!(net.tail(a), u);
            }
        }
    }

    #[test]
    fn test_tweights_fold_into_signed_residual() {
        let mut net = FlowNetwork::<i64>::with_capacity(2, 0).unwrap();
        net.add_tweights(0, 7, 0);
        net.add_tweights(1, 0, 4);
        assert_eq!(net.terminal_residual(0), 7);
        assert_eq!(net.terminal_residual(1), -4);
        assert_eq!(net.base_flow, 0);

        // Both directions on one node: the common part is routed immediately
        net.add_tweights(0, 0, 3);
        assert_eq!(net.terminal_residual(0), 4);
        assert_eq!(net.base_flow, 3);
    }

    #[test]
    fn test_index_overflow_is_resource_error() {
        let err = FlowNetwork::<i32>::with_capacity(4, usize::MAX / 2).unwrap_err();
        assert!(err.is_resource());
    }
}
