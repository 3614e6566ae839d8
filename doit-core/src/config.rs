//! Solver options

use crate::cloudbox::AtmosphereDim;
use crate::errors::{DoitError, DoitResult};
use crate::interpolate::InterpMethod;
use crate::FloatValue;
use serde::{Deserialize, Serialize};

/// Field update scheme used for 1D atmospheres
///
/// 3D atmospheres always use the sequential 3D update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateScheme {
    /// Gauss-Seidel sweep, updated values are used as soon as they are written
    #[default]
    Sequential,
    /// Jacobi sweep, all incoming values are read from the field at the start of the sweep
    NonSequential,
    /// Plane-parallel geometry with analytic path lengths
    PlaneParallel,
}

/// Options of the DOIT solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoitConfig {
    /// Number of Stokes components (1 to 4)
    /// default: 1
    pub stokes_dim: usize,
    /// Interpolation in zenith angle
    /// default: linear
    pub za_interp: InterpMethod,
    /// default: sequential
    pub update_scheme: UpdateScheme,
    /// Iterations before giving up on convergence
    /// default: 100
    pub max_iterations: usize,
    /// Accepted fractional overshoot of a path end beyond the upper cloudbox limits
    /// default: 1e-6
    pub boundary_tolerance: FloatValue,
    /// Path length (m) used for exactly horizontal rays by the plane-parallel update
    /// default: 1e7
    pub horizontal_path_length: FloatValue,
}

impl Default for DoitConfig {
    fn default() -> Self {
        Self {
            stokes_dim: 1,
            za_interp: InterpMethod::Linear,
            update_scheme: UpdateScheme::Sequential,
            max_iterations: 100,
            boundary_tolerance: 1e-6,
            horizontal_path_length: 1e7,
        }
    }
}

impl DoitConfig {
    /// Parse and validate a configuration from TOML
    ///
    /// Missing keys take their default value.
    pub fn from_toml_str(text: &str) -> DoitResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate(None)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> DoitResult<String> {
        Ok(toml::to_string(self)?)
    }

    /// Check the option values, and their compatibility with `dim` when it is known
    pub fn validate(&self, dim: Option<AtmosphereDim>) -> DoitResult<()> {
        if !(1..=4).contains(&self.stokes_dim) {
            return Err(DoitError::InvalidConfig(format!(
                "stokes_dim must be between 1 and 4, got {}",
                self.stokes_dim
            )));
        }
        if self.max_iterations == 0 {
            return Err(DoitError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !(self.boundary_tolerance > 0.0) {
            return Err(DoitError::InvalidConfig(format!(
                "boundary_tolerance must be positive, got {}",
                self.boundary_tolerance
            )));
        }
        if !(self.horizontal_path_length > 0.0) {
            return Err(DoitError::InvalidConfig(format!(
                "horizontal_path_length must be positive, got {}",
                self.horizontal_path_length
            )));
        }
        if dim == Some(AtmosphereDim::ThreeD) && self.za_interp == InterpMethod::Polynomial {
            return Err(DoitError::PolynomialInterpolationUnsupported);
        }
        Ok(())
    }
}
