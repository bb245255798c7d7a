//! Multicolumn graph construction
//!
//! Node `k` of column `c` is network node `c * npc + k`. With `d_k = cost[k+1]
//! - cost[k]`, node `k < npc - 1` carries `d_k` as a terminal arc (to T when
//! positive, from S when negative) and the top node is tied to T. Downward
//! arcs `k+1 -> k` inside a column and `k -> k - sc` into each adjacent column
//! carry a capacity above any finite cut, so every finite cut puts a
//! contiguous prefix `0..i` of each column on the source side and keeps
//! adjacent crossing indices within `sc` of each other.
//!
//! Cutting column `c` at `i` (first sink-side node) severs `cost[i] - cost[0] +
//! N_c`, where `N_c` is the column's total negative difference. The per-build
//! constant `sum(cost[0] - N_c)` is recorded as the offset that turns the
//! max-flow value into the surface cost.

use std::time::Instant;

use optnet_common::{Error, Result};

use crate::capacity::Capacity;
use crate::config::SurfaceParams;
use crate::maxflow::BkMaxflow;
use crate::network::{FlowNetwork, NodeId};
use crate::sampling::sample_column;
use crate::topology::ColumnTopology;
use crate::volume::{CostVolume, Point3};

/// Sampled node costs of every column, column-major
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnCosts<C> {
    npc: usize,
    costs: Vec<C>,
}

impl<C: Capacity> ColumnCosts<C> {
    /// Build directly from per-column cost rows (all of length `npc`)
    pub fn from_columns(npc: usize, columns: &[Vec<C>]) -> Result<Self> {
        let mut costs = Vec::with_capacity(npc * columns.len());
        for (c, col) in columns.iter().enumerate() {
            if col.len() != npc {
                return Err(Error::Configuration(format!(
                    "column {} has {} costs, expected {}",
                    c,
                    col.len(),
                    npc
                )));
            }
            costs.extend_from_slice(col);
        }
        Ok(Self { npc, costs })
    }

    pub fn npc(&self) -> usize {
        self.npc
    }

    pub fn n_columns(&self) -> usize {
        if self.npc == 0 {
            0
        } else {
            self.costs.len() / self.npc
        }
    }

    #[inline(always)]
    pub fn column(&self, c: usize) -> &[C] {
        &self.costs[c * self.npc..(c + 1) * self.npc]
    }
}

/// Network plus the bookkeeping needed to interpret its cut
#[derive(Debug)]
pub struct SurfaceGraph<C> {
    pub(crate) maxflow: BkMaxflow<C>,
    pub(crate) costs: ColumnCosts<C>,
    pub(crate) offset: C,
    pub(crate) params: SurfaceParams,
    pub(crate) lateral_dims: (usize, usize),
    pub(crate) adjacency: Vec<Vec<usize>>,
}

impl<C: Capacity> SurfaceGraph<C> {
    #[inline(always)]
    pub fn node(&self, column: usize, index: usize) -> NodeId {
        (column * self.params.npc + index) as NodeId
    }

    pub fn n_columns(&self) -> usize {
        self.costs.n_columns()
    }

    pub fn costs(&self) -> &ColumnCosts<C> {
        &self.costs
    }

    pub fn params(&self) -> &SurfaceParams {
        &self.params
    }

    /// Constant added to the max-flow value to obtain the surface cost
    pub fn offset(&self) -> C {
        self.offset
    }
}

/// Check parameters and topology against the volume before allocating anything
pub fn check_inputs<V, T>(cost: &V, topology: &T, params: &SurfaceParams) -> Result<()>
where
    V: CostVolume,
    T: ColumnTopology + ?Sized,
{
    params.validate()?;

    let dims = cost.dims();
    if dims.iter().any(|&d| d == 0) {
        return Err(Error::Configuration(format!("cost volume is empty: {:?}", dims)));
    }

    let expected = topology.lateral_dims();
    let actual = topology.scan_axis().lateral_dims(dims);
    if expected != actual {
        return Err(Error::DimensionMismatch { expected, actual });
    }
    if topology.column_count() != expected.0 * expected.1 {
        return Err(Error::Configuration(format!(
            "topology reports {} columns for a {}x{} grid",
            topology.column_count(),
            expected.0,
            expected.1
        )));
    }

    let n_nodes = expected.0 as u128 * expected.1 as u128 * params.npc as u128;
    if n_nodes >= u32::MAX as u128 {
        return Err(Error::Resource(format!(
            "{} nodes exceed 32-bit node indexing",
            n_nodes
        )));
    }
    Ok(())
}

/// Sample every column of the topology
pub fn sample_costs<V, T>(
    cost: &V,
    origin: Point3,
    topology: &T,
    params: &SurfaceParams,
) -> Result<ColumnCosts<V::Cost>>
where
    V: CostVolume,
    T: ColumnTopology + ?Sized,
{
    let n_columns = topology.column_count();
    let npc = params.npc;
    let spacing = params.spacing();
    let axis = topology.scan_axis();

    let mut costs = Vec::new();
    costs.try_reserve_exact(n_columns * npc)?;

    let mut column = Vec::with_capacity(npc);
    for c in 0..n_columns {
        let lateral = topology.column_position(c);
        sample_column(cost, origin, axis, lateral, &spacing, params.sampling, &mut column);
        costs.extend_from_slice(&column);
    }

    Ok(ColumnCosts { npc, costs })
}

/// Build the flow network for already sampled column costs
pub fn build_from_costs<C, T>(
    costs: ColumnCosts<C>,
    topology: &T,
    params: &SurfaceParams,
) -> Result<SurfaceGraph<C>>
where
    C: Capacity,
    T: ColumnTopology + ?Sized,
{
    let start = Instant::now();
    params.validate()?;

    let npc = params.npc;
    let sc = params.sc;
    let n_columns = costs.n_columns();
    if costs.npc() != npc {
        return Err(Error::Configuration(format!(
            "column costs sampled with npc {}, parameters say {}",
            costs.npc(),
            npc
        )));
    }
    let (width, height) = topology.lateral_dims();
    if topology.column_count() != width * height {
        return Err(Error::Configuration(format!(
            "topology reports {} columns for a {}x{} grid",
            topology.column_count(),
            width,
            height
        )));
    }
    if n_columns != topology.column_count() {
        return Err(Error::Configuration(format!(
            "{} sampled columns for a topology of {} columns",
            n_columns,
            topology.column_count()
        )));
    }

    // Differences, offset and the "uncuttable" capacity
    let mut offset = C::ZERO;
    let mut total_abs = C::ZERO;
    for c in 0..n_columns {
        let col = costs.column(c);
        offset = offset.checked_add(col[0]).ok_or(Error::CapacityOverflow)?;
        for k in 0..npc - 1 {
            let d = col[k + 1].checked_sub(col[k]).ok_or(Error::CapacityOverflow)?;
            let mag = if d < C::ZERO {
                let mag = C::ZERO.checked_sub(d).ok_or(Error::CapacityOverflow)?;
                offset = offset.checked_sub(mag).ok_or(Error::CapacityOverflow)?;
                mag
            } else {
                d
            };
            total_abs = total_abs.checked_add(mag).ok_or(Error::CapacityOverflow)?;
        }
    }
    let big = total_abs
        .checked_add(C::from_f64(1.0))
        .ok_or(Error::CapacityOverflow)?;

    // Adjacency snapshot and edge count
    let mut adjacency: Vec<Vec<usize>> = Vec::new();
    adjacency.try_reserve_exact(n_columns)?;
    let mut scratch = Vec::with_capacity(4);
    let mut n_neighbor_pairs = 0usize;
    for c in 0..n_columns {
        topology.neighbors(c, &mut scratch);
        if let Some(&bad) = scratch.iter().find(|&&q| q >= n_columns || q == c) {
            return Err(Error::Configuration(format!(
                "column {} lists invalid neighbour {}",
                c, bad
            )));
        }
        n_neighbor_pairs += scratch.len();
        adjacency.push(scratch.clone());
    }

    let per_pair = npc.saturating_sub(sc);
    let n_intra = n_columns * (npc - 1);
    let n_inter = n_neighbor_pairs * per_pair;
    let n_nodes = n_columns * npc;

    let mut net = FlowNetwork::with_capacity(n_nodes, n_intra + n_inter)?;
    let node = |c: usize, k: usize| (c * npc + k) as NodeId;

    for c in 0..n_columns {
        let col = costs.column(c);
        for k in 0..npc - 1 {
            let d = col[k + 1] - col[k];
            if d.is_positive() {
                net.add_tweights(node(c, k), C::ZERO, d);
            } else if d < C::ZERO {
                net.add_tweights(node(c, k), -d, C::ZERO);
            }
            net.add_edge(node(c, k + 1), node(c, k), big, C::ZERO)?;
        }
        net.add_tweights(node(c, npc - 1), C::ZERO, big);

        for &q in &adjacency[c] {
            for k in sc..npc {
                net.add_edge(node(c, k), node(q, k - sc), big, C::ZERO)?;
            }
        }
    }

    let n_arcs = net.n_arcs();
    let maxflow = BkMaxflow::new(net)?;

    tracing::debug!(
        n_columns,
        npc,
        sc,
        n_nodes,
        n_arcs,
        intra_edges = n_intra,
        inter_edges = n_inter,
        time_ms = start.elapsed().as_millis() as u64,
        "built multicolumn graph"
    );

    Ok(SurfaceGraph {
        maxflow,
        costs,
        offset,
        params: *params,
        lateral_dims: topology.lateral_dims(),
        adjacency,
    })
}

/// Sample a cost volume and build its multicolumn network
pub fn build<V, T>(
    cost: &V,
    origin: Point3,
    topology: &T,
    params: &SurfaceParams,
) -> Result<SurfaceGraph<V::Cost>>
where
    V: CostVolume,
    T: ColumnTopology + ?Sized,
{
    check_inputs(cost, topology, params)?;
    let costs = sample_costs(cost, origin, topology, params)?;
    build_from_costs(costs, topology, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{GridTopology, ScanAxis};
    use crate::volume::Volume;

    #[test]
    fn test_rejects_mismatched_topology() {
        let vol = Volume::from_fn([3, 2, 5], |_, _, _| 1i32);
        let topo = GridTopology::new(ScanAxis::Z, 2, 2);
        let params = SurfaceParams::new(0.0, 4.0, 5, 1);
        let err = build(&vol, Point3::ORIGIN, &topo, &params).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: (2, 2),
                actual: (3, 2)
            }
        ));
    }

    #[test]
    fn test_rejects_bad_params_before_sampling() {
        let vol = Volume::from_fn([1, 1, 4], |_, _, _| 1i32);
        let topo = GridTopology::for_volume(ScanAxis::Z, [1, 1, 4]);
        let err = build(&vol, Point3::ORIGIN, &topo, &SurfaceParams::new(0.0, 3.0, 0, 0)).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_edge_counts() {
        // 3x1 line, npc 4, sc 1: intra 3*3, inter (2 + 2) pairs * 3
        let vol = Volume::from_fn([3, 1, 4], |x, _, z| (x * z) as i64);
        let topo = GridTopology::for_volume(ScanAxis::Z, [3, 1, 4]);
        let g = build(&vol, Point3::ORIGIN, &topo, &SurfaceParams::new(0.0, 3.0, 4, 1)).unwrap();
        assert_eq!(g.maxflow.network().n_nodes(), 12);
        assert_eq!(g.maxflow.network().n_arcs(), 2 * (9 + 12));
        assert_eq!(g.node(2, 3), 11);
    }

    #[test]
    fn test_offset_matches_column_formula() {
        // Column costs [5, 2, 7]: cost[0] = 5, negative differences sum to 3
        let costs = ColumnCosts::from_columns(3, &[vec![5i64, 2, 7]]).unwrap();
        let topo = GridTopology::new(ScanAxis::Z, 1, 1);
        let g = build_from_costs(costs, &topo, &SurfaceParams::new(0.0, 2.0, 3, 0)).unwrap();
        assert_eq!(g.offset(), 2);
    }

    #[test]
    fn test_overflowing_costs_are_rejected() {
        let costs = ColumnCosts::from_columns(2, &[vec![i32::MIN, i32::MAX]]).unwrap();
        let topo = GridTopology::new(ScanAxis::Z, 1, 1);
        let err = build_from_costs(costs, &topo, &SurfaceParams::new(0.0, 1.0, 2, 0)).unwrap_err();
        assert!(err.is_resource());
    }

    /// Reports fewer columns than its lateral grid holds
    struct ShortTopology;

    impl ColumnTopology for ShortTopology {
        fn scan_axis(&self) -> ScanAxis {
            ScanAxis::Z
        }

        fn lateral_dims(&self) -> (usize, usize) {
            (2, 2)
        }

        fn column_count(&self) -> usize {
            2
        }

        fn neighbors(&self, col: usize, out: &mut Vec<usize>) {
            out.clear();
            out.push(1 - col);
        }
    }

    #[test]
    fn test_inconsistent_column_count_is_rejected() {
        let costs = ColumnCosts::from_columns(2, &[vec![1i64, 2], vec![3, 4]]).unwrap();
        let err = build_from_costs(costs, &ShortTopology, &SurfaceParams::new(0.0, 1.0, 2, 1)).unwrap_err();
        assert!(err.is_configuration());

        let vol = Volume::from_fn([2, 2, 2], |_, _, z| z as i64);
        let err = build(&vol, Point3::ORIGIN, &ShortTopology, &SurfaceParams::new(0.0, 1.0, 2, 1)).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_column_costs_shape_checked() {
        let err = ColumnCosts::from_columns(3, &[vec![1i32, 2]]).unwrap_err();
        assert!(err.is_configuration());
    }
}
