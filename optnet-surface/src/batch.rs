//! Parallel solving of independent volumes
//!
//! Every job gets its own network and solver; nothing is shared between jobs
//! beyond the read-only inputs.

use std::time::Instant;

use optnet_common::Result;
use rayon::prelude::*;
use serde::Serialize;

use crate::config::SurfaceParams;
use crate::solver::{solve_volume, SolveResult};
use crate::surface::HeightMap;
use crate::topology::ColumnTopology;
use crate::volume::{CostVolume, Point3};

/// One build + solve + extract request
#[derive(Debug)]
pub struct SurfaceJob<'a, V, T> {
    pub cost: &'a V,
    pub origin: Point3,
    pub topology: &'a T,
    pub params: SurfaceParams,
}

impl<'a, V, T> SurfaceJob<'a, V, T> {
    pub fn new(cost: &'a V, origin: Point3, topology: &'a T, params: SurfaceParams) -> Self {
        Self {
            cost,
            origin,
            topology,
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SurfaceSolution<C> {
    pub result: SolveResult<C>,
    pub surface: HeightMap,
}

/// Solve every job on the rayon pool, results in job order
pub fn solve_batch<V, T>(jobs: &[SurfaceJob<'_, V, T>]) -> Vec<Result<SurfaceSolution<V::Cost>>>
where
    V: CostVolume,
    T: ColumnTopology + Sync,
{
    let start = Instant::now();

    let results: Vec<_> = jobs
        .par_iter()
        .map(|job| {
            solve_volume(job.cost, job.origin, job.topology, &job.params)
                .map(|(result, surface)| SurfaceSolution { result, surface })
        })
        .collect();

    let failed = results.iter().filter(|r| r.is_err()).count();
    tracing::debug!(
        jobs = jobs.len(),
        failed,
        time_ms = start.elapsed().as_millis() as u64,
        "batch solved"
    );
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{GridTopology, ScanAxis};
    use crate::volume::Volume;

    #[test]
    fn test_batch_matches_sequential() {
        let dims = [4, 3, 6];
        let topo = GridTopology::for_volume(ScanAxis::Z, dims);
        let params = SurfaceParams::new(0.0, 5.0, 6, 1);
        let volumes: Vec<Volume<i64>> = (0..6)
            .map(|seed| {
                Volume::from_fn(dims, |x, y, z| {
                    let target = (x + y + seed) % 6;
                    (z as i64 - target as i64).abs() * 7 + (x * y) as i64
                })
            })
            .collect();

        let jobs: Vec<_> = volumes
            .iter()
            .map(|v| SurfaceJob::new(v, Point3::ORIGIN, &topo, params))
            .collect();
        let batch = solve_batch(&jobs);
        assert_eq!(batch.len(), volumes.len());

        for (vol, res) in volumes.iter().zip(&batch) {
            let (expected, surface) = solve_volume(vol, Point3::ORIGIN, &topo, &params).unwrap();
            let got = res.as_ref().unwrap();
            assert_eq!(got.result.cost, expected.cost);
            assert_eq!(got.surface, surface);
        }
    }

    #[test]
    fn test_failing_job_does_not_poison_the_batch() {
        let good = Volume::from_fn([2, 2, 3], |_, _, z| z as i32);
        let bad = Volume::from_fn([3, 2, 3], |_, _, z| z as i32);
        let topo = GridTopology::new(ScanAxis::Z, 2, 2);
        let params = SurfaceParams::new(0.0, 2.0, 3, 1);
        let jobs = [
            SurfaceJob::new(&good, Point3::ORIGIN, &topo, params),
            SurfaceJob::new(&bad, Point3::ORIGIN, &topo, params),
        ];

        let results = solve_batch(&jobs);
        assert!(results[0].is_ok());
        assert!(results[1].as_ref().unwrap_err().is_configuration());
    }
}
