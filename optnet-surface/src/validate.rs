//! Validation of optimal surfaces
//!
//! Compares solver results against exhaustive enumeration of every
//! smoothness-valid crossing assignment on small instances.

use crate::builder::ColumnCosts;
use crate::capacity::Capacity;
use crate::config::SurfaceParams;
use crate::solver::OptimalSurface;
use crate::surface::check_smoothness;
use crate::topology::{GridTopology, ScanAxis};

/// Sum of node costs along a crossing assignment
pub fn surface_cost<C: Capacity>(costs: &ColumnCosts<C>, indices: &[usize]) -> C {
    indices
        .iter()
        .enumerate()
        .fold(C::ZERO, |acc, (c, &i)| acc + costs.column(c)[i])
}

/// Enumerate every assignment (ground truth, exponential in the column count)
///
/// Returns the first minimum in lexicographic order of the index vector.
pub fn brute_force_optimum<C: Capacity>(
    costs: &ColumnCosts<C>,
    adjacency: &[Vec<usize>],
    sc: usize,
) -> (Vec<usize>, C) {
    let n = costs.n_columns();
    let npc = costs.npc();
    let mut indices = vec![0usize; n];
    let mut best: Option<(Vec<usize>, C)> = None;

    loop {
        if check_smoothness(&indices, adjacency, sc).is_ok() {
            let cost = surface_cost(costs, &indices);
            if best.as_ref().map_or(true, |(_, b)| cost < *b) {
                best = Some((indices.clone(), cost));
            }
        }

        // Mixed-radix increment, last column fastest
        let mut c = n;
        loop {
            if c == 0 {
                // All-equal assignments are always smooth, so `best` is set
                return best.unwrap_or((indices, C::ZERO));
            }
            c -= 1;
            indices[c] += 1;
            if indices[c] < npc {
                break;
            }
            indices[c] = 0;
        }
    }
}

/// Validate random small grids against the brute-force optimum
pub fn validate_random(n_tests: usize, seed: u64) -> ValidationResult {
    use rand::prelude::*;
    use rand::SeedableRng;

    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);

    let mut correct = 0;
    let mut incorrect = 0;
    let mut failed = 0;
    let mut errors: Vec<ValidationError> = Vec::new();

    tracing::info!(n_tests, seed, "validating random instances");

    for i in 0..n_tests {
        let width = rng.random_range(1..=3usize);
        let height = rng.random_range(1..=2usize);
        let npc = rng.random_range(1..=4usize);
        let sc = rng.random_range(0..=3usize);
        let n_columns = width * height;

        let columns: Vec<Vec<i64>> = (0..n_columns)
            .map(|_| (0..npc).map(|_| rng.random_range(-20..=20i64)).collect())
            .collect();

        let topo = GridTopology::new(ScanAxis::Z, width, height);
        let params = SurfaceParams::new(0.0, npc as f64, npc, sc);

        let outcome = ColumnCosts::from_columns(npc, &columns).and_then(|costs| {
            let mut net = OptimalSurface::new();
            net.build_from_costs(costs, &topo, &params)?;
            let result = net.solve()?;
            let surface = net.extract()?;
            Ok((net, result, surface))
        });

        let (net, result, surface) = match outcome {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(test = i, error = %e, "instance failed to solve");
                failed += 1;
                continue;
            }
        };
        let (Some(costs), Some(adjacency)) = (net.column_costs(), net.adjacency()) else {
            failed += 1;
            continue;
        };

        let (_, oracle_cost) = brute_force_optimum(costs, adjacency, sc);
        let surface_total = surface_cost(costs, &surface.indices);

        if result.cost == oracle_cost && surface_total == oracle_cost {
            correct += 1;
        } else {
            incorrect += 1;
            if errors.len() < 10 {
                errors.push(ValidationError {
                    test: i,
                    width,
                    height,
                    npc,
                    sc,
                    solver_cost: result.cost,
                    surface_cost: surface_total,
                    oracle_cost,
                });
            }
        }

        if (i + 1) % 100 == 0 {
            tracing::info!(done = i + 1, correct, incorrect, "validation progress");
        }
    }

    ValidationResult {
        n_tests,
        correct,
        incorrect,
        failed,
        errors,
    }
}

#[derive(Debug)]
pub struct ValidationResult {
    pub n_tests: usize,
    pub correct: usize,
    pub incorrect: usize,
    /// Instances that returned an error instead of a surface
    pub failed: usize,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn print(&self) {
        let pct = |n: usize| n as f64 * 100.0 / self.n_tests.max(1) as f64;
        println!("\n=== VALIDATION RESULTS ===");
        println!("  Total tests:     {}", self.n_tests);
        println!("  Correct:         {} ({:.2}%)", self.correct, pct(self.correct));
        println!("  Incorrect:       {} ({:.2}%)", self.incorrect, pct(self.incorrect));
        println!("  Failed:          {}", self.failed);

        if !self.errors.is_empty() {
            println!("\n  Sample errors:");
            for err in &self.errors {
                println!(
                    "    #{} {}x{} npc={} sc={}: solver={}, surface={}, oracle={}",
                    err.test,
                    err.width,
                    err.height,
                    err.npc,
                    err.sc,
                    err.solver_cost,
                    err.surface_cost,
                    err.oracle_cost
                );
            }
        }

        if self.is_valid() {
            println!("\n  ALL TESTS PASSED");
        } else {
            println!("\n  VALIDATION FAILED");
        }
    }

    pub fn is_valid(&self) -> bool {
        self.incorrect == 0 && self.failed == 0
    }
}

#[derive(Debug)]
pub struct ValidationError {
    pub test: usize,
    pub width: usize,
    pub height: usize,
    pub npc: usize,
    pub sc: usize,
    pub solver_cost: i64,
    pub surface_cost: i64,
    pub oracle_cost: i64,
}
