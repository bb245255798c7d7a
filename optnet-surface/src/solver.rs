//! Build / solve / extract lifecycle of one optimal surface

use optnet_common::{Error, Result};
use serde::Serialize;

use crate::builder::{self, ColumnCosts, SurfaceGraph};
use crate::capacity::Capacity;
use crate::config::SurfaceParams;
use crate::maxflow::{CancelFlag, MaxflowStats};
use crate::surface::{self, HeightMap};
use crate::topology::ColumnTopology;
use crate::volume::{CostVolume, Point3};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveResult<C> {
    /// Total cost of the optimal surface
    pub cost: C,
    /// Max-flow / min-cut value of the network
    pub flow: C,
    pub stats: MaxflowStats,
}

/// Single-surface optimal net
///
/// Each `build` replaces the previous network and partition. `solve` runs the
/// max-flow once per build; later calls return the cached result.
#[derive(Debug, Default)]
pub struct OptimalSurface<C> {
    graph: Option<SurfaceGraph<C>>,
    result: Option<SolveResult<C>>,
    cancel: Option<CancelFlag>,
}

impl<C: Capacity> OptimalSurface<C> {
    pub fn new() -> Self {
        Self {
            graph: None,
            result: None,
            cancel: None,
        }
    }

    /// Solves poll `flag` and stop with `Error::Cancelled` once it is set
    pub fn with_cancel_flag(flag: CancelFlag) -> Self {
        Self {
            cancel: Some(flag),
            ..Self::new()
        }
    }

    /// Sample `cost` along the topology's columns and build the network
    pub fn build<V, T>(
        &mut self,
        cost: &V,
        origin: Point3,
        topology: &T,
        params: &SurfaceParams,
    ) -> Result<()>
    where
        V: CostVolume<Cost = C>,
        T: ColumnTopology + ?Sized,
    {
        self.graph = None;
        self.result = None;
        self.graph = Some(builder::build(cost, origin, topology, params)?);
        Ok(())
    }

    /// Build from column costs sampled elsewhere
    pub fn build_from_costs<T>(
        &mut self,
        costs: ColumnCosts<C>,
        topology: &T,
        params: &SurfaceParams,
    ) -> Result<()>
    where
        T: ColumnTopology + ?Sized,
    {
        self.graph = None;
        self.result = None;
        self.graph = Some(builder::build_from_costs(costs, topology, params)?);
        Ok(())
    }

    pub fn solve(&mut self) -> Result<SolveResult<C>> {
        if let Some(result) = &self.result {
            return Ok(result.clone());
        }
        let graph = self.graph.as_mut().ok_or(Error::NotBuilt)?;

        let flow = graph.maxflow.solve(self.cancel.as_ref())?;
        let cost = flow.checked_add(graph.offset).ok_or(Error::CapacityOverflow)?;
        let result = SolveResult {
            cost,
            flow,
            stats: graph.maxflow.stats().clone(),
        };

        tracing::debug!(
            cost = ?cost,
            flow = ?flow,
            augmentations = result.stats.augmentations,
            "optimal surface solved"
        );
        self.result = Some(result.clone());
        Ok(result)
    }

    pub fn extract(&self) -> Result<HeightMap> {
        let graph = self.graph.as_ref().ok_or(Error::NotBuilt)?;
        if self.result.is_none() {
            return Err(Error::NotSolved);
        }
        surface::extract(graph)
    }

    pub fn is_built(&self) -> bool {
        self.graph.is_some()
    }

    pub fn is_solved(&self) -> bool {
        self.result.is_some()
    }

    pub fn total_cost(&self) -> Option<C> {
        self.result.as_ref().map(|r| r.cost)
    }

    /// Sampled node costs of the current build
    pub fn column_costs(&self) -> Option<&ColumnCosts<C>> {
        self.graph.as_ref().map(|g| g.costs())
    }

    /// Adjacency lists captured from the topology at build time
    pub fn adjacency(&self) -> Option<&[Vec<usize>]> {
        self.graph.as_ref().map(|g| g.adjacency.as_slice())
    }

    /// Whether node `index` of `column` lies on the source side of the cut
    pub fn is_source_side(&self, column: usize, index: usize) -> Result<bool> {
        let graph = self.graph.as_ref().ok_or(Error::NotBuilt)?;
        if self.result.is_none() {
            return Err(Error::NotSolved);
        }
        if column >= graph.n_columns() || index >= graph.params().npc {
            return Err(Error::Configuration(format!(
                "node ({}, {}) outside {} columns x {} nodes",
                column,
                index,
                graph.n_columns(),
                graph.params().npc
            )));
        }
        Ok(graph.maxflow.is_source_side(graph.node(column, index)))
    }
}

/// Build, solve and extract in one call
pub fn solve_volume<V, T>(
    cost: &V,
    origin: Point3,
    topology: &T,
    params: &SurfaceParams,
) -> Result<(SolveResult<V::Cost>, HeightMap)>
where
    V: CostVolume,
    T: ColumnTopology + ?Sized,
{
    let mut net = OptimalSurface::new();
    net.build(cost, origin, topology, params)?;
    let result = net.solve()?;
    let surface = net.extract()?;
    Ok((result, surface))
}
