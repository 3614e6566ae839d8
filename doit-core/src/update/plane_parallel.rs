use super::{check_sweep_inputs, FieldUpdater, SweepBuffers};
use crate::cloudbox::CloudboxIndex;
use crate::coefficients::PathProfile;
use crate::context::SweepContext;
use crate::errors::{DoitError, DoitResult};
use crate::field::{FieldIndex, RadiationField, ScatteringSourceField};
use crate::optical::compute_optical_properties;
use crate::stepper::CloudboxFieldStepper;
use crate::DEG2RAD;
use tracing::debug;

/// Sequential sweep over a 1D cloudbox in plane-parallel geometry
///
/// Each level is connected directly to the level above (zenith angles up to 90 degrees) or
/// below, with path length `|dz / cos(za)|`. Exactly horizontal rays use the configured
/// `horizontal_path_length`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaneParallelUpdate1D;

impl PlaneParallelUpdate1D {
    /// Recompute the field at pressure level `p_index` for zenith index `za_index`
    ///
    /// Fails for the lowest atmospheric level looking down, as surface reflection is not
    /// handled in plane-parallel geometry.
    pub fn update_level(
        &self,
        ctx: &SweepContext,
        field: &mut RadiationField,
        source: &ScatteringSourceField,
        buffers: &mut SweepBuffers,
        p_index: usize,
        za_index: usize,
    ) -> DoitResult<()> {
        let za = ctx.za_grid[za_index];
        if p_index == 0 && za > 90.0 {
            return Err(DoitError::SurfaceReflectionUnsupported { p_index, za });
        }

        let (p_lower, p_upper) = ctx.limits.p_range();
        let neighbour = if za <= 90.0 { p_index + 1 } else { p_index - 1 };
        if p_index < p_lower || p_index > p_upper || neighbour < p_lower || neighbour > p_upper {
            return Ok(());
        }

        let atmosphere = ctx.atmosphere;
        let l_step = if za == 90.0 {
            ctx.config.horizontal_path_length
        } else {
            let dz = atmosphere.z_field[[neighbour, 0, 0]] - atmosphere.z_field[[p_index, 0, 0]];
            (dz / (za * DEG2RAD).cos()).abs()
        };

        let stokes_dim = ctx.stokes_dim();
        let mut profile = PathProfile::zeros(2, stokes_dim, atmosphere.n_species());
        for (k, level) in [p_index, neighbour].into_iter().enumerate() {
            let local = level - p_lower;
            let index = FieldIndex::new(CloudboxIndex::new(local, 0, 0), za_index, 0);
            for i in 0..stokes_dim {
                profile.abs_vec[[k, i]] = buffers.optical.abs_vec[[local, 0, 0, i]];
                profile.sca_vec[[k, i]] = source.get(index, i);
                profile.field[[k, i]] = field.get(index, i);
                for j in 0..stokes_dim {
                    profile.ext_mat[[k, i, j]] = buffers.optical.ext_mat[[local, 0, 0, i, j]];
                }
            }
            profile.temperature[k] = atmosphere.t_field[[level, 0, 0]];
            profile.pressure[k] = atmosphere.p_grid[level];
            for species in 0..atmosphere.n_species() {
                profile.vmr[[k, species]] = atmosphere.vmr_field[[species, level, 0, 0]];
            }
        }

        let index = FieldIndex::new(CloudboxIndex::new(p_index - p_lower, 0, 0), za_index, 0);
        let stokes = CloudboxFieldStepper::new(*ctx).propagate(
            &profile,
            &[l_step],
            index,
            &mut buffers.segment,
        )?;
        field.set_stokes(index, &stokes);
        Ok(())
    }
}

impl FieldUpdater for PlaneParallelUpdate1D {
    fn name(&self) -> &'static str {
        "plane_parallel_1d"
    }

    fn sweep(
        &self,
        ctx: &SweepContext,
        field: &mut RadiationField,
        source: &ScatteringSourceField,
    ) -> DoitResult<()> {
        check_sweep_inputs(ctx, field, source)?;
        let mut buffers = SweepBuffers::new(ctx);
        let (p_lower, p_upper) = ctx.limits.p_range();
        debug!("Starting plane-parallel 1D sweep");

        for (za_index, &za) in ctx.za_grid.iter().enumerate() {
            compute_optical_properties(ctx, za_index, 0, &mut buffers.optical)?;
            debug!(za_index, za, "Updating zenith direction");
            // the lowest level is visited for downward rays so that a cloudbox resting on
            // the surface is rejected rather than left at its initial value
            let levels: Vec<usize> = if za <= 90.0 {
                (p_lower..p_upper).rev().collect()
            } else {
                (p_lower..=p_upper).collect()
            };
            for p_index in levels {
                self.update_level(ctx, field, source, &mut buffers, p_index, za_index)?;
            }
        }
        Ok(())
    }
}
