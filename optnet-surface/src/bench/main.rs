//! Benchmark harness for optimal surface detection
//!
//! Supports:
//! - Repeated build + solve on synthetic volumes
//! - Batches of independent volumes solved in parallel
//! - Randomized validation against exhaustive enumeration
//!
//! Outputs: p50/p95/p99 times + solver counters

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use hdrhistogram::Histogram;
use rand::prelude::*;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use optnet_surface::validate::validate_random;
use optnet_surface::{
    solve_batch, GridTopology, OptimalSurface, Point3, SamplingPolicy, ScanAxis, SurfaceJob,
    SurfaceParams, Volume,
};

#[derive(Parser)]
#[command(name = "optnet-bench")]
#[command(about = "Benchmark harness for optimal surface detection")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Repeated build + solve + extract on one synthetic volume
    Solve {
        /// Volume width (x)
        #[arg(long, default_value = "64")]
        width: usize,

        /// Volume height (y)
        #[arg(long, default_value = "64")]
        height: usize,

        /// Volume depth (z, scan axis)
        #[arg(long, default_value = "48")]
        depth: usize,

        /// Smoothness bound
        #[arg(long, default_value = "2")]
        sc: usize,

        /// Parameter file (TOML); overrides depth-derived defaults
        #[arg(long)]
        params: Option<PathBuf>,

        /// Number of runs
        #[arg(long, default_value = "20")]
        n_runs: usize,

        /// Use trilinear sampling
        #[arg(long)]
        linear: bool,

        /// Print the last result as JSON
        #[arg(long)]
        json: bool,

        /// Random seed for reproducibility
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Solve independent volumes in parallel
    Batch {
        /// Volume width (x)
        #[arg(long, default_value = "48")]
        width: usize,

        /// Volume height (y)
        #[arg(long, default_value = "48")]
        height: usize,

        /// Volume depth (z, scan axis)
        #[arg(long, default_value = "32")]
        depth: usize,

        /// Smoothness bound
        #[arg(long, default_value = "2")]
        sc: usize,

        /// Number of volumes
        #[arg(long, default_value = "32")]
        n_volumes: usize,

        /// Worker threads (0 = rayon default)
        #[arg(long, default_value = "0")]
        threads: usize,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Check random small instances against exhaustive enumeration
    Validate {
        /// Number of instances
        #[arg(long, default_value = "1000")]
        n_tests: usize,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

fn init_tracing(verbose: u8, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match verbose {
            0 => "warn",
            1 => "optnet_surface=debug",
            _ => "optnet_surface=trace",
        };
        EnvFilter::new(level)
    });

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr).compact())
            .init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    match cli.command {
        Commands::Solve {
            width,
            height,
            depth,
            sc,
            params,
            n_runs,
            linear,
            json,
            seed,
        } => {
            let mut p = match params {
                Some(path) => SurfaceParams::from_path(&path)?,
                None => SurfaceParams::new(0.0, depth.saturating_sub(1) as f64, depth, sc),
            };
            if linear {
                p = p.with_sampling(SamplingPolicy::Linear);
            }
            run_solve_bench([width, height, depth], &p, n_runs, json, seed)
        }

        Commands::Batch {
            width,
            height,
            depth,
            sc,
            n_volumes,
            threads,
            seed,
        } => run_batch_bench([width, height, depth], sc, n_volumes, threads, seed),

        Commands::Validate { n_tests, seed } => {
            let result = validate_random(n_tests, seed);
            result.print();
            if !result.is_valid() {
                anyhow::bail!(
                    "{} of {} instances disagree with the oracle",
                    result.incorrect + result.failed,
                    n_tests
                );
            }
            Ok(())
        }
    }
}

/// Noisy cost volume with a smooth low-cost sheet
fn synthetic_volume(dims: [usize; 3], rng: &mut StdRng) -> Volume<i64> {
    let [w, h, d] = dims;
    let phase_x = rng.random_range(0.0..std::f64::consts::TAU);
    let phase_y = rng.random_range(0.0..std::f64::consts::TAU);
    let mid = (d as f64 - 1.0) / 2.0;
    let amp = mid * 0.6;

    Volume::from_fn(dims, |x, y, z| {
        let fx = x as f64 / w.max(1) as f64 * std::f64::consts::TAU + phase_x;
        let fy = y as f64 / h.max(1) as f64 * std::f64::consts::TAU + phase_y;
        let target = mid + amp * (fx.sin() + fy.cos()) / 2.0;
        let dist = (z as f64 - target).abs();
        (dist * 10.0) as i64 + rng.random_range(0..8i64)
    })
}

fn run_solve_bench(
    dims: [usize; 3],
    params: &SurfaceParams,
    n_runs: usize,
    json: bool,
    seed: u64,
) -> anyhow::Result<()> {
    println!("═══════════════════════════════════════════════════════════════");
    println!("  OPTIMAL SURFACE BENCHMARK");
    println!("═══════════════════════════════════════════════════════════════");
    println!("  Volume: {}x{}x{}", dims[0], dims[1], dims[2]);
    println!("  npc: {}  sc: {}  sampling: {:?}", params.npc, params.sc, params.sampling);
    println!("  Runs: {}", n_runs);
    println!("  Seed: {}", seed);
    println!();

    let mut rng = StdRng::seed_from_u64(seed);
    let vol = synthetic_volume(dims, &mut rng);
    let topo = GridTopology::for_volume(ScanAxis::Z, dims);

    let mut hist_build = Histogram::<u64>::new(3)?;
    let mut hist_solve = Histogram::<u64>::new(3)?;
    let mut hist_extract = Histogram::<u64>::new(3)?;
    let mut augmentations = 0u64;
    let mut orphans = 0u64;
    let mut last = None;

    let mut net = OptimalSurface::new();
    for i in 0..n_runs {
        let t = Instant::now();
        net.build(&vol, Point3::ORIGIN, &topo, params)?;
        hist_build.record(t.elapsed().as_micros() as u64)?;

        let t = Instant::now();
        let result = net.solve()?;
        hist_solve.record(t.elapsed().as_micros() as u64)?;

        let t = Instant::now();
        let surface = net.extract()?;
        hist_extract.record(t.elapsed().as_micros() as u64)?;

        augmentations += result.stats.augmentations;
        orphans += result.stats.orphans;
        last = Some((result, surface));

        if (i + 1) % 5 == 0 || i + 1 == n_runs {
            print!("\r  Progress: {}/{}", i + 1, n_runs);
            std::io::Write::flush(&mut std::io::stdout())?;
        }
    }
    println!();
    println!();

    print_histogram_stats("Build", &hist_build);
    print_histogram_stats("Solve", &hist_solve);
    print_histogram_stats("Extract", &hist_extract);

    let n = n_runs.max(1) as u64;
    println!();
    println!("───────────────────────────────────────────────────────────────");
    println!("  COUNTERS (averages)");
    println!("───────────────────────────────────────────────────────────────");
    println!("  Augmentations:        {:>12}", format_number(augmentations / n));
    println!("  Orphans processed:    {:>12}", format_number(orphans / n));

    if let Some((result, surface)) = last {
        println!("  Surface cost:         {:>12}", result.cost);
        let max_step = net.adjacency().map_or(0, |adj| surface.max_step(adj));
        println!("  Max adjacent step:    {:>12}", max_step);
        if json {
            let out = serde_json::json!({ "result": result, "surface": surface });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    println!();

    Ok(())
}

fn run_batch_bench(
    dims: [usize; 3],
    sc: usize,
    n_volumes: usize,
    threads: usize,
    seed: u64,
) -> anyhow::Result<()> {
    println!("═══════════════════════════════════════════════════════════════");
    println!("  BATCH SURFACE BENCHMARK");
    println!("═══════════════════════════════════════════════════════════════");
    println!("  Volume: {}x{}x{}", dims[0], dims[1], dims[2]);
    println!("  Volumes: {}", n_volumes);
    println!("  Threads: {}", if threads == 0 { "default".to_string() } else { threads.to_string() });
    println!();

    let mut rng = StdRng::seed_from_u64(seed);
    let volumes: Vec<Volume<i64>> = (0..n_volumes).map(|_| synthetic_volume(dims, &mut rng)).collect();
    let topo = GridTopology::for_volume(ScanAxis::Z, dims);
    let params = SurfaceParams::new(0.0, dims[2].saturating_sub(1) as f64, dims[2], sc);

    let jobs: Vec<_> = volumes
        .iter()
        .map(|v| SurfaceJob::new(v, Point3::ORIGIN, &topo, params))
        .collect();

    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;

    let t = Instant::now();
    let results = pool.install(|| solve_batch(&jobs));
    let elapsed = t.elapsed();

    let mut hist_solve = Histogram::<u64>::new(3)?;
    let mut failed = 0usize;
    for r in &results {
        match r {
            Ok(sol) => hist_solve.record(sol.result.stats.solve_time_ms.max(1))?,
            Err(e) => {
                tracing::warn!(error = %e, "job failed");
                failed += 1;
            }
        }
    }

    println!("───────────────────────────────────────────────────────────────");
    println!("  Per-volume solve (ms)");
    println!("───────────────────────────────────────────────────────────────");
    println!("    p50:    {:>10}", hist_solve.value_at_quantile(0.50));
    println!("    p95:    {:>10}", hist_solve.value_at_quantile(0.95));
    println!("    p99:    {:>10}", hist_solve.value_at_quantile(0.99));
    println!();
    println!("  Wall time:  {:.1} ms", elapsed.as_secs_f64() * 1000.0);
    println!("  Throughput: {:.1} volumes/sec", n_volumes as f64 / elapsed.as_secs_f64().max(1e-9));
    println!("  Failed:     {}", failed);
    println!();

    Ok(())
}

fn print_histogram_stats(name: &str, hist: &Histogram<u64>) {
    println!("───────────────────────────────────────────────────────────────");
    println!("  {} timing (μs)", name);
    println!("───────────────────────────────────────────────────────────────");
    println!("    min:    {:>10.0}", hist.min() as f64);
    println!("    p50:    {:>10.0}", hist.value_at_quantile(0.50) as f64);
    println!("    p95:    {:>10.0}", hist.value_at_quantile(0.95) as f64);
    println!("    p99:    {:>10.0}", hist.value_at_quantile(0.99) as f64);
    println!("    max:    {:>10.0}", hist.max() as f64);
    println!("    mean:   {:>10.1}", hist.mean());
}

fn format_number(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.2}K", n as f64 / 1_000.0)
    } else {
        format!("{}", n)
    }
}
