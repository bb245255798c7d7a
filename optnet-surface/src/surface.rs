//! Surface extraction from a solved partition

use optnet_common::{Error, Result};
use serde::Serialize;

use crate::builder::SurfaceGraph;
use crate::capacity::Capacity;

/// One crossing per column: node index and physical height along the scan axis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeightMap {
    pub width: usize,
    pub height: usize,
    pub indices: Vec<usize>,
    pub heights: Vec<f64>,
}

impl HeightMap {
    pub fn n_columns(&self) -> usize {
        self.indices.len()
    }

    fn offset(&self, u: usize, v: usize) -> Option<usize> {
        (u < self.width && v < self.height).then(|| v * self.width + u)
    }

    pub fn index_at(&self, u: usize, v: usize) -> Option<usize> {
        self.offset(u, v).and_then(|i| self.indices.get(i).copied())
    }

    pub fn height_at(&self, u: usize, v: usize) -> Option<f64> {
        self.offset(u, v).and_then(|i| self.heights.get(i).copied())
    }

    /// Largest index difference between adjacent columns
    pub fn max_step(&self, adjacency: &[Vec<usize>]) -> usize {
        adjacency
            .iter()
            .enumerate()
            .flat_map(|(p, nbrs)| nbrs.iter().map(move |&q| (p, q)))
            .map(|(p, q)| self.indices[p].abs_diff(self.indices[q]))
            .max()
            .unwrap_or(0)
    }
}

/// Smoothness check over explicit adjacency lists
pub fn check_smoothness(indices: &[usize], adjacency: &[Vec<usize>], sc: usize) -> Result<()> {
    for (p, nbrs) in adjacency.iter().enumerate() {
        for &q in nbrs {
            let step = indices[p].abs_diff(indices[q]);
            if step > sc {
                return Err(Error::AlgorithmInvariant(format!(
                    "columns {} and {} cross at {} and {} (sc = {})",
                    p, q, indices[p], indices[q], sc
                )));
            }
        }
    }
    Ok(())
}

fn fail_loudly(err: Error) -> Error {
    tracing::error!(error = %err, "solved partition violates surface invariants");
    if cfg!(debug_assertions) {
        panic!("{}", err);
    }
    err
}

/// First sink-side index of every column, checked for contiguity and smoothness
pub fn extract<C: Capacity>(graph: &SurfaceGraph<C>) -> Result<HeightMap> {
    if !graph.maxflow.is_done() {
        return Err(Error::NotSolved);
    }

    let params = graph.params();
    let npc = params.npc;
    let spacing = params.spacing();
    let n_columns = graph.n_columns();

    let mut indices = Vec::new();
    indices.try_reserve_exact(n_columns)?;
    let mut heights = Vec::new();
    heights.try_reserve_exact(n_columns)?;

    for c in 0..n_columns {
        let on_source = |k: usize| graph.maxflow.is_source_side(graph.node(c, k));

        let first_sink = (0..npc).find(|&k| !on_source(k)).ok_or_else(|| {
            fail_loudly(Error::AlgorithmInvariant(format!(
                "column {} has no sink-side node",
                c
            )))
        })?;
        if let Some(k) = (first_sink + 1..npc).find(|&k| on_source(k)) {
            return Err(fail_loudly(Error::AlgorithmInvariant(format!(
                "column {} is not contiguous: node {} on source side above crossing {}",
                c, k, first_sink
            ))));
        }

        indices.push(first_sink);
        heights.push(spacing.offset(first_sink));
    }

    check_smoothness(&indices, &graph.adjacency, params.sc).map_err(fail_loudly)?;

    let (width, height) = graph.lateral_dims;
    Ok(HeightMap {
        width,
        height,
        indices,
        heights,
    })
}

#[cfg(test)]
mod tests {
    use std::panic::{catch_unwind, AssertUnwindSafe};

    use super::*;
    use crate::builder::{build_from_costs, ColumnCosts};
    use crate::config::SurfaceParams;
    use crate::maxflow::Parent;
    use crate::topology::{GridTopology, ScanAxis};

    /// Solved 2-column graph with flat costs: every node ends on the sink side
    fn solved_flat_graph() -> SurfaceGraph<i64> {
        let costs = ColumnCosts::from_columns(4, &[vec![0i64; 4], vec![0; 4]]).unwrap();
        let topo = GridTopology::new(ScanAxis::Z, 2, 1);
        let mut graph = build_from_costs(costs, &topo, &SurfaceParams::new(0.0, 3.0, 4, 1)).unwrap();
        graph.maxflow.solve(None).unwrap();
        graph
    }

    fn move_to_source_side(graph: &mut SurfaceGraph<i64>, column: usize, index: usize) {
        let u = graph.node(column, index) as usize;
        let state = &mut graph.maxflow.nodes[u];
        state.parent = Parent::Terminal;
        state.sink = false;
    }

    /// Debug builds panic, release builds return the invariant error
    fn assert_fails_loudly(graph: &SurfaceGraph<i64>) {
        match catch_unwind(AssertUnwindSafe(|| extract(graph))) {
            Err(_) => assert!(cfg!(debug_assertions)),
            Ok(res) => {
                assert!(!cfg!(debug_assertions));
                assert!(res.unwrap_err().is_invariant());
            }
        }
    }

    #[test]
    fn test_flat_graph_extracts_bottom() {
        let graph = solved_flat_graph();
        assert_eq!(extract(&graph).unwrap().indices, vec![0, 0]);
    }

    #[test]
    fn test_non_contiguous_column_fails_loudly() {
        let mut graph = solved_flat_graph();
        // Crossing at 0 but node 2 above it on the source side
        move_to_source_side(&mut graph, 0, 2);
        assert_fails_loudly(&graph);
    }

    #[test]
    fn test_smoothness_violation_fails_loudly() {
        let mut graph = solved_flat_graph();
        // Column 0 crosses at 3, column 1 at 0, with sc = 1
        for k in 0..3 {
            move_to_source_side(&mut graph, 0, k);
        }
        assert_fails_loudly(&graph);
    }

    #[test]
    fn test_extract_before_solve() {
        let costs = ColumnCosts::from_columns(2, &[vec![0i64, 1]]).unwrap();
        let topo = GridTopology::new(ScanAxis::Z, 1, 1);
        let graph = build_from_costs(costs, &topo, &SurfaceParams::new(0.0, 1.0, 2, 0)).unwrap();
        assert!(matches!(extract(&graph), Err(Error::NotSolved)));
    }

    fn line_adjacency(n: usize) -> Vec<Vec<usize>> {
        (0..n)
            .map(|c| {
                let mut v = Vec::new();
                if c > 0 {
                    v.push(c - 1);
                }
                if c + 1 < n {
                    v.push(c + 1);
                }
                v
            })
            .collect()
    }

    #[test]
    fn test_check_smoothness() {
        let adj = line_adjacency(3);
        assert!(check_smoothness(&[0, 1, 2], &adj, 1).is_ok());
        let err = check_smoothness(&[0, 2, 2], &adj, 1).unwrap_err();
        assert!(err.is_invariant());
        assert!(check_smoothness(&[0, 2, 2], &adj, 2).is_ok());
    }

    #[test]
    fn test_height_map_accessors() {
        let map = HeightMap {
            width: 2,
            height: 2,
            indices: vec![0, 1, 3, 2],
            heights: vec![0.0, 0.5, 1.5, 1.0],
        };
        assert_eq!(map.index_at(0, 1), Some(3));
        assert_eq!(map.height_at(1, 1), Some(1.0));
        assert_eq!(map.index_at(2, 0), None);

        let adj = vec![vec![1, 2], vec![0, 3], vec![0, 3], vec![1, 2]];
        assert_eq!(map.max_step(&adj), 3);
    }

    #[test]
    fn test_accessors_on_short_map_return_none() {
        let map = HeightMap {
            width: 2,
            height: 2,
            indices: vec![1, 0],
            heights: vec![1.0, 0.0],
        };
        assert_eq!(map.index_at(1, 0), Some(0));
        assert_eq!(map.index_at(1, 1), None);
        assert_eq!(map.height_at(0, 1), None);
    }
}
