//! Column topology: scan axis, lateral grid and adjacency
//!
//! Columns lie on the lateral grid spanned by the two axes other than the
//! scan axis. Column `c` sits at lateral position `(c % width, c / width)`.

use serde::{Deserialize, Serialize};

/// Axis along which every column is sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanAxis {
    X,
    Y,
    #[default]
    Z,
}

impl ScanAxis {
    pub fn name(&self) -> &'static str {
        match self {
            ScanAxis::X => "x",
            ScanAxis::Y => "y",
            ScanAxis::Z => "z",
        }
    }

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(ScanAxis::X),
            1 => Some(ScanAxis::Y),
            2 => Some(ScanAxis::Z),
            _ => None,
        }
    }

    /// Lateral grid extents `(width, height)` of a volume with `dims`
    pub fn lateral_dims(&self, dims: [usize; 3]) -> (usize, usize) {
        match self {
            ScanAxis::X => (dims[1], dims[2]),
            ScanAxis::Y => (dims[0], dims[2]),
            ScanAxis::Z => (dims[0], dims[1]),
        }
    }

    /// Extent of the volume along this axis
    pub fn axial_len(&self, dims: [usize; 3]) -> usize {
        match self {
            ScanAxis::X => dims[0],
            ScanAxis::Y => dims[1],
            ScanAxis::Z => dims[2],
        }
    }

    /// Map lateral `(u, v)` plus axial offset `r` to `(x, y, z)` offsets
    #[inline(always)]
    pub fn compose(&self, u: f64, v: f64, r: f64) -> (f64, f64, f64) {
        match self {
            ScanAxis::X => (r, u, v),
            ScanAxis::Y => (u, r, v),
            ScanAxis::Z => (u, v, r),
        }
    }
}

/// Column layout and adjacency supplied to the graph builder
pub trait ColumnTopology {
    fn scan_axis(&self) -> ScanAxis;

    /// `(width, height)` of the lateral column grid
    fn lateral_dims(&self) -> (usize, usize);

    fn column_count(&self) -> usize {
        let (w, h) = self.lateral_dims();
        w * h
    }

    fn column_position(&self, col: usize) -> (usize, usize) {
        let (w, _) = self.lateral_dims();
        (col % w, col / w)
    }

    /// Clear `out` and fill it with the columns adjacent to `col`
    fn neighbors(&self, col: usize, out: &mut Vec<usize>);
}

/// Regular lateral grid with 4-neighbourhood adjacency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridTopology {
    axis: ScanAxis,
    width: usize,
    height: usize,
}

impl GridTopology {
    pub fn new(axis: ScanAxis, width: usize, height: usize) -> Self {
        Self {
            axis,
            width,
            height,
        }
    }

    /// Grid covering every lateral position of a volume
    pub fn for_volume(axis: ScanAxis, dims: [usize; 3]) -> Self {
        let (width, height) = axis.lateral_dims(dims);
        Self::new(axis, width, height)
    }
}

impl ColumnTopology for GridTopology {
    fn scan_axis(&self) -> ScanAxis {
        self.axis
    }

    fn lateral_dims(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn neighbors(&self, col: usize, out: &mut Vec<usize>) {
        out.clear();
        let (u, v) = (col % self.width, col / self.width);
        if u > 0 {
            out.push(col - 1);
        }
        if u + 1 < self.width {
            out.push(col + 1);
        }
        if v > 0 {
            out.push(col - self.width);
        }
        if v + 1 < self.height {
            out.push(col + self.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_names() {
        assert_eq!(ScanAxis::X.name(), "x");
        assert_eq!(ScanAxis::Z.name(), "z");
        assert_eq!(ScanAxis::from_u8(1), Some(ScanAxis::Y));
        assert_eq!(ScanAxis::from_u8(3), None);
    }

    #[test]
    fn test_lateral_dims_per_axis() {
        let dims = [4, 5, 6];
        assert_eq!(ScanAxis::X.lateral_dims(dims), (5, 6));
        assert_eq!(ScanAxis::Y.lateral_dims(dims), (4, 6));
        assert_eq!(ScanAxis::Z.lateral_dims(dims), (4, 5));
        assert_eq!(ScanAxis::Y.axial_len(dims), 5);
        assert_eq!(ScanAxis::X.compose(1.0, 2.0, 3.0), (3.0, 1.0, 2.0));
    }

    #[test]
    fn test_grid_four_neighbourhood() {
        let topo = GridTopology::new(ScanAxis::Z, 3, 3);
        let mut out = Vec::new();

        topo.neighbors(4, &mut out);
        out.sort_unstable();
        assert_eq!(out, vec![1, 3, 5, 7]);

        topo.neighbors(0, &mut out);
        out.sort_unstable();
        assert_eq!(out, vec![1, 3]);

        topo.neighbors(8, &mut out);
        out.sort_unstable();
        assert_eq!(out, vec![5, 7]);

        assert_eq!(topo.column_count(), 9);
        assert_eq!(topo.column_position(5), (2, 1));
    }

    #[test]
    fn test_single_row_is_a_line() {
        let topo = GridTopology::new(ScanAxis::Z, 3, 1);
        let mut out = Vec::new();
        topo.neighbors(1, &mut out);
        assert_eq!(out, vec![0, 2]);
    }
}
