//! Explicit context shared by the components of one monochromatic solve

use crate::agenda::Agendas;
use crate::atmosphere::AtmosphericState;
use crate::cloudbox::{AtmosphereDim, CloudboxLimits};
use crate::config::DoitConfig;
use crate::field::FieldShape;
use crate::FloatValue;
use ndarray::ArrayView1;

/// Everything a sweep reads besides the fields it updates
#[derive(Debug, Clone, Copy)]
pub struct SweepContext<'a> {
    pub atmosphere: &'a AtmosphericState,
    pub limits: &'a CloudboxLimits,
    /// Zenith angle grid of the radiation field (degrees, ascending)
    pub za_grid: ArrayView1<'a, FloatValue>,
    /// Azimuth angle grid of the radiation field (degrees, ascending)
    pub aa_grid: ArrayView1<'a, FloatValue>,
    /// Index into the frequency grid of the atmosphere
    pub f_index: usize,
    pub agendas: &'a Agendas,
    pub config: &'a DoitConfig,
}

impl<'a> SweepContext<'a> {
    pub fn dim(&self) -> AtmosphereDim {
        self.limits.dim()
    }

    pub fn frequency(&self) -> FloatValue {
        self.atmosphere.f_grid[self.f_index]
    }

    pub fn stokes_dim(&self) -> usize {
        self.config.stokes_dim
    }

    /// Shape every radiation and scattering source field must have
    pub fn field_shape(&self) -> FieldShape {
        FieldShape::for_cloudbox(
            self.limits,
            self.za_grid.len(),
            self.aa_grid.len(),
            self.stokes_dim(),
        )
    }
}
