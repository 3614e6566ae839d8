//! Field update sweeps
//!
//! A sweep recomputes the radiation field at every cloudbox position and direction once,
//! using the current scattering source. The schemes differ in the traversal order and in
//! whether updated values are visible to the rest of the sweep:
//!
//! - [`SequentialUpdate1D`]: Gauss-Seidel, a single buffer updated in place.
//! - [`NonSequentialUpdate1D`]: Jacobi, incoming radiation read from a snapshot.
//! - [`PlaneParallelUpdate1D`]: plane-parallel geometry with analytic path lengths.
//! - [`SequentialUpdate3D`]: Gauss-Seidel over a 3D cloudbox.
//!
//! Traversal orders are fixed so that results are reproducible bit for bit.

mod plane_parallel;
mod sequential;
mod three_d;

pub use plane_parallel::PlaneParallelUpdate1D;
pub use sequential::{limb_angle, NonSequentialUpdate1D, SequentialUpdate1D};
pub use three_d::SequentialUpdate3D;

use crate::cloudbox::AtmosphereDim;
use crate::config::{DoitConfig, UpdateScheme};
use crate::context::SweepContext;
use crate::errors::DoitResult;
use crate::field::{OpticalPropertyField, RadiationField, ScatteringSourceField};
use crate::stepper::SegmentScratch;
use std::fmt::Debug;

/// One full sweep over the cloudbox
pub trait FieldUpdater: Debug {
    fn name(&self) -> &'static str;

    fn sweep(
        &self,
        ctx: &SweepContext,
        field: &mut RadiationField,
        source: &ScatteringSourceField,
    ) -> DoitResult<()>;
}

/// The update scheme matching a configuration and atmosphere
pub fn updater_for(config: &DoitConfig, dim: AtmosphereDim) -> Box<dyn FieldUpdater> {
    match (dim, config.update_scheme) {
        (AtmosphereDim::ThreeD, _) => Box::new(SequentialUpdate3D),
        (AtmosphereDim::OneD, UpdateScheme::Sequential) => Box::new(SequentialUpdate1D),
        (AtmosphereDim::OneD, UpdateScheme::NonSequential) => Box::new(NonSequentialUpdate1D),
        (AtmosphereDim::OneD, UpdateScheme::PlaneParallel) => Box::new(PlaneParallelUpdate1D),
    }
}

/// Buffers allocated once per sweep
#[derive(Debug, Clone)]
pub struct SweepBuffers {
    pub optical: OpticalPropertyField,
    pub segment: SegmentScratch,
}

impl SweepBuffers {
    pub fn new(ctx: &SweepContext) -> Self {
        Self {
            optical: OpticalPropertyField::zeros(ctx.limits, ctx.stokes_dim()),
            segment: SegmentScratch::new(ctx.stokes_dim(), ctx.atmosphere.n_species()),
        }
    }
}

/// Check that the fields of a sweep match the context
pub(crate) fn check_sweep_inputs(
    ctx: &SweepContext,
    field: &RadiationField,
    source: &ScatteringSourceField,
) -> DoitResult<()> {
    let shape = ctx.field_shape();
    field.check_shape("radiation field", &shape)?;
    source.check_shape("scattering source field", &shape)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_updater_selection() {
        let mut config = DoitConfig::default();
        assert_eq!(updater_for(&config, AtmosphereDim::OneD).name(), "sequential_1d");

        config.update_scheme = UpdateScheme::NonSequential;
        assert_eq!(updater_for(&config, AtmosphereDim::OneD).name(), "non_sequential_1d");

        config.update_scheme = UpdateScheme::PlaneParallel;
        assert_eq!(updater_for(&config, AtmosphereDim::OneD).name(), "plane_parallel_1d");
        assert_eq!(updater_for(&config, AtmosphereDim::ThreeD).name(), "sequential_3d");
    }
}
