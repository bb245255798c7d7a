//! Build parameters and parameter files

use std::path::Path;

use optnet_common::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::sampling::{ColumnSpacing, SamplingPolicy};

/// Parameters of one graph build
///
/// ```toml
/// rmin = 0.0
/// rmax = 63.0
/// npc = 64
/// sc = 2
/// sampling = "linear"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceParams {
    /// Lower physical bound of every column (voxel units along the scan axis)
    pub rmin: f64,
    /// Upper physical bound of every column
    pub rmax: f64,
    /// Nodes per column
    pub npc: usize,
    /// Smoothness bound: max index difference between adjacent columns
    pub sc: usize,
    #[serde(default)]
    pub sampling: SamplingPolicy,
}

impl SurfaceParams {
    pub fn new(rmin: f64, rmax: f64, npc: usize, sc: usize) -> Self {
        Self {
            rmin,
            rmax,
            npc,
            sc,
            sampling: SamplingPolicy::default(),
        }
    }

    pub fn with_sampling(mut self, sampling: SamplingPolicy) -> Self {
        self.sampling = sampling;
        self
    }

    /// Build-time parameter checks
    pub fn validate(&self) -> Result<()> {
        if self.npc == 0 {
            return Err(Error::Configuration("npc must be >= 1".to_string()));
        }
        if !self.rmin.is_finite() || !self.rmax.is_finite() {
            return Err(Error::Configuration(format!(
                "column bounds must be finite (rmin={}, rmax={})",
                self.rmin, self.rmax
            )));
        }
        if self.rmin >= self.rmax {
            return Err(Error::Configuration(format!(
                "rmin ({}) must be < rmax ({})",
                self.rmin, self.rmax
            )));
        }
        if self.npc > u32::MAX as usize {
            return Err(Error::Configuration(format!(
                "npc ({}) exceeds the node index range",
                self.npc
            )));
        }
        Ok(())
    }

    pub fn spacing(&self) -> ColumnSpacing {
        ColumnSpacing::new(self.rmin, self.rmax, self.npc)
    }

    /// Physical coordinate of node `index` along the scan axis
    pub fn height_of(&self, index: usize) -> f64 {
        self.spacing().offset(index)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let params: SurfaceParams = toml::from_str(s).map_err(|e| Error::ParamFile(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_validate_rejects_bad_params() {
        assert!(SurfaceParams::new(0.0, 4.0, 0, 1).validate().unwrap_err().is_configuration());
        assert!(SurfaceParams::new(4.0, 4.0, 5, 1).validate().is_err());
        assert!(SurfaceParams::new(5.0, 4.0, 5, 1).validate().is_err());
        assert!(SurfaceParams::new(f64::NAN, 4.0, 5, 1).validate().is_err());
        assert!(SurfaceParams::new(0.0, 4.0, 1, 0).validate().is_ok());
    }

    #[test]
    fn test_height_of() {
        let params = SurfaceParams::new(2.0, 8.0, 4, 1);
        assert_eq!(params.height_of(0), 2.0);
        assert_eq!(params.height_of(3), 8.0);
        assert_eq!(params.height_of(1), 4.0);
    }

    #[test]
    fn test_toml_roundtrip_defaults_sampling() {
        let params = SurfaceParams::from_toml_str("rmin = 0.0\nrmax = 15.0\nnpc = 16\nsc = 2\n").unwrap();
        assert_eq!(params.npc, 16);
        assert_eq!(params.sampling, SamplingPolicy::Nearest);

        let linear =
            SurfaceParams::from_toml_str("rmin = 0.0\nrmax = 1.0\nnpc = 2\nsc = 0\nsampling = \"linear\"\n")
                .unwrap();
        assert_eq!(linear.sampling, SamplingPolicy::Linear);
    }

    #[test]
    fn test_toml_invalid_values_rejected() {
        let err = SurfaceParams::from_toml_str("rmin = 3.0\nrmax = 1.0\nnpc = 2\nsc = 0\n").unwrap_err();
        assert!(err.is_configuration());

        let err = SurfaceParams::from_toml_str("rmin = \"low\"").unwrap_err();
        assert!(matches!(err, Error::ParamFile(_)));
    }

    #[test]
    fn test_from_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "rmin = 0.0\nrmax = 31.0\nnpc = 32\nsc = 3\nsampling = \"nearest\"").unwrap();
        let params = SurfaceParams::from_path(file.path()).unwrap();
        assert_eq!(params.sc, 3);
        assert_eq!(params.rmax, 31.0);

        let missing = SurfaceParams::from_path("/nonexistent/optnet.toml").unwrap_err();
        assert!(matches!(missing, Error::Io(_)));
    }
}
