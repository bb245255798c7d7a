//! Column sampling strategies
//!
//! Every column of a build is sampled with the same policy. Positions outside
//! the volume clamp to the nearest border voxel.

use serde::{Deserialize, Serialize};

use crate::capacity::Capacity;
use crate::topology::ScanAxis;
use crate::volume::{CostVolume, Point3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingPolicy {
    /// Cost of the voxel nearest to the sample position
    #[default]
    Nearest,
    /// Trilinear interpolation of the eight surrounding voxels
    Linear,
}

/// Evenly spaced axial offsets of a column: `npc` steps over `[rmin, rmax]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnSpacing {
    pub rmin: f64,
    pub step: f64,
    pub npc: usize,
}

impl ColumnSpacing {
    pub fn new(rmin: f64, rmax: f64, npc: usize) -> Self {
        let step = if npc > 1 {
            (rmax - rmin) / (npc - 1) as f64
        } else {
            0.0
        };
        Self { rmin, step, npc }
    }

    #[inline(always)]
    pub fn offset(&self, index: usize) -> f64 {
        self.rmin + self.step * index as f64
    }
}

#[inline(always)]
fn clamp_index(i: isize, len: usize) -> usize {
    if i < 0 {
        0
    } else {
        (i as usize).min(len - 1)
    }
}

fn sample_nearest<V: CostVolume>(vol: &V, p: Point3) -> V::Cost {
    let dims = vol.dims();
    let x = clamp_index(p.x.round() as isize, dims[0]);
    let y = clamp_index(p.y.round() as isize, dims[1]);
    let z = clamp_index(p.z.round() as isize, dims[2]);
    vol.cost(x, y, z)
}

fn sample_linear<V: CostVolume>(vol: &V, p: Point3) -> V::Cost {
    let dims = vol.dims();
    // Beyond one voxel outside the volume every corner clamps to the border
    let bound = |c: f64, len: usize| c.clamp(-1.0, len as f64);
    let p = Point3::new(bound(p.x, dims[0]), bound(p.y, dims[1]), bound(p.z, dims[2]));
    let (x0, y0, z0) = (p.x.floor(), p.y.floor(), p.z.floor());
    let (dx, dy, dz) = (p.x - x0, p.y - y0, p.z - z0);
    let (x0, y0, z0) = (x0 as isize, y0 as isize, z0 as isize);

    let at = |x: isize, y: isize, z: isize| -> f64 {
        vol.cost(
            clamp_index(x, dims[0]),
            clamp_index(y, dims[1]),
            clamp_index(z, dims[2]),
        )
        .to_f64()
    };

    let lerp = |a: f64, b: f64, t: f64| a * (1.0 - t) + b * t;

    let c00 = lerp(at(x0, y0, z0), at(x0 + 1, y0, z0), dx);
    let c10 = lerp(at(x0, y0 + 1, z0), at(x0 + 1, y0 + 1, z0), dx);
    let c01 = lerp(at(x0, y0, z0 + 1), at(x0 + 1, y0, z0 + 1), dx);
    let c11 = lerp(at(x0, y0 + 1, z0 + 1), at(x0 + 1, y0 + 1, z0 + 1), dx);

    let c0 = lerp(c00, c10, dy);
    let c1 = lerp(c01, c11, dy);
    V::Cost::from_f64(lerp(c0, c1, dz))
}

/// Sample one column's node costs into `out` (cleared first)
///
/// The volume must be non-empty in every dimension.
pub fn sample_column<V: CostVolume>(
    vol: &V,
    origin: Point3,
    axis: ScanAxis,
    lateral: (usize, usize),
    spacing: &ColumnSpacing,
    policy: SamplingPolicy,
    out: &mut Vec<V::Cost>,
) {
    out.clear();
    let (u, v) = (lateral.0 as f64, lateral.1 as f64);
    for k in 0..spacing.npc {
        let (dx, dy, dz) = axis.compose(u, v, spacing.offset(k));
        let p = origin.offset(dx, dy, dz);
        let c = match policy {
            SamplingPolicy::Nearest => sample_nearest(vol, p),
            SamplingPolicy::Linear => sample_linear(vol, p),
        };
        out.push(c);
    }
}
