//! Optimal single-surface detection on a multicolumn graph
//!
//! A cost volume is sampled along columns parallel to a scan axis. The
//! columns become a flow network whose minimum cut is the minimum-cost
//! surface crossing every column exactly once, with adjacent crossings at
//! most `sc` nodes apart. The cut is found with Boykov-Kolmogorov max-flow.
//!
//! ```no_run
//! use optnet_surface::{GridTopology, OptimalSurface, Point3, ScanAxis, SurfaceParams, Volume};
//!
//! let dims = [64, 64, 32];
//! let vol = Volume::from_fn(dims, |x, y, z| ((z as i64) - ((x + y) / 8) as i64).abs());
//! let topo = GridTopology::for_volume(ScanAxis::Z, dims);
//! let params = SurfaceParams::new(0.0, 31.0, 32, 2);
//!
//! let mut net = OptimalSurface::new();
//! net.build(&vol, Point3::ORIGIN, &topo, &params)?;
//! let result = net.solve()?;
//! let surface = net.extract()?;
//! println!("cost {} at {:?}", result.cost, &surface.heights[..4]);
//! # Ok::<(), optnet_surface::Error>(())
//! ```

pub mod batch;
pub mod builder;
pub mod capacity;
pub mod config;
pub mod maxflow;
pub mod network;
pub mod sampling;
pub mod solver;
pub mod surface;
pub mod topology;
pub mod validate;
pub mod volume;

pub use batch::{solve_batch, SurfaceJob, SurfaceSolution};
pub use builder::ColumnCosts;
pub use capacity::Capacity;
pub use config::SurfaceParams;
pub use maxflow::{CancelFlag, MaxflowStats};
pub use optnet_common::{Error, Result};
pub use sampling::SamplingPolicy;
pub use solver::{solve_volume, OptimalSurface, SolveResult};
pub use surface::HeightMap;
pub use topology::{ColumnTopology, GridTopology, ScanAxis};
pub use volume::{CostVolume, Point3, Volume};
