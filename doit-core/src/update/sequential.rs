use super::{check_sweep_inputs, FieldUpdater, SweepBuffers};
use crate::cloudbox::CloudboxIndex;
use crate::coefficients::interp_cloud_coeff_1d;
use crate::context::SweepContext;
use crate::errors::DoitResult;
use crate::field::{FieldIndex, RadiationField, ScatteringSourceField};
use crate::optical::compute_optical_properties;
use crate::ppath::{Background, PpathStep};
use crate::stepper::CloudboxFieldStepper;
use crate::{FloatValue, RAD2DEG};
use tracing::{debug, trace};

/// Smallest zenith angle (degrees) at which a ray leaving the top of the cloudbox reaches
/// its bottom
///
/// Directions between 90 degrees and this angle are limb directions.
pub fn limb_angle(ctx: &SweepContext) -> FloatValue {
    let (p_lower, p_upper) = ctx.limits.p_range();
    let r_lower = ctx.atmosphere.radius(p_lower, 0, 0);
    let r_upper = ctx.atmosphere.radius(p_upper, 0, 0);
    180.0 - (r_lower / r_upper).asin() * RAD2DEG
}

/// Pressure levels of a sequential sweep for one zenith angle, in update order
pub(crate) fn sequential_levels(
    p_lower: usize,
    p_upper: usize,
    za: FloatValue,
    theta_lim: FloatValue,
) -> Vec<usize> {
    if za <= 90.0 {
        (p_lower..p_upper).rev().collect()
    } else if za >= theta_lim {
        (p_lower + 1..=p_upper).collect()
    } else {
        (p_lower..=p_upper).filter(|&p| p != 0).collect()
    }
}

/// Recompute the field at pressure level `p_index` for zenith index `za_index`
///
/// Incoming radiation is read from `snapshot` when given, else from `field` itself.
/// Steps leaving the cloudbox leave the field untouched.
fn update_level_1d(
    ctx: &SweepContext,
    field: &mut RadiationField,
    snapshot: Option<&RadiationField>,
    source: &ScatteringSourceField,
    buffers: &mut SweepBuffers,
    p_index: usize,
    za_index: usize,
) -> DoitResult<()> {
    let (p_lower, _) = ctx.limits.p_range();
    let za = ctx.za_grid[za_index];
    let start = PpathStep::start_1d(ctx.atmosphere, p_index, za);
    let ppath = ctx.agendas.ppath_step.execute(ctx.atmosphere, start)?;

    if !ctx
        .limits
        .is_inside_1d(&ppath.last().gp_p, ctx.config.boundary_tolerance)
    {
        trace!(p_index, za, "Path step leaves the cloudbox");
        return Ok(());
    }

    let stepper = CloudboxFieldStepper::new(*ctx);
    let index = FieldIndex::new(CloudboxIndex::new(p_index - p_lower, 0, 0), za_index, 0);
    let read = snapshot.unwrap_or(&*field);
    let mut updates = Vec::with_capacity(2);

    if ppath.np() > 1 {
        let profile = interp_cloud_coeff_1d(ctx, &ppath, &buffers.optical, source, read)?;
        let stokes = stepper.rt_no_background(&ppath, &profile, index, &mut buffers.segment)?;
        updates.push((index, stokes));
    }
    if ppath.background == Background::Surface {
        let surface_index = FieldIndex { p: 0, ..index };
        updates.push((surface_index, stepper.rt_surface(&ppath, read, index)?));
    }

    for (index, stokes) in updates {
        field.set_stokes(index, &stokes);
    }
    Ok(())
}

/// Gauss-Seidel sweep over a 1D cloudbox
///
/// Zenith angles are processed in ascending order. Downward looking levels are updated
/// from the bottom up and upward looking levels from the top down, so every step reads
/// incoming radiation that has already been updated in the same sweep.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialUpdate1D;

impl FieldUpdater for SequentialUpdate1D {
    fn name(&self) -> &'static str {
        "sequential_1d"
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
        let theta_lim = limb_angle(ctx);
        debug!(theta_lim, "Starting sequential 1D sweep");

        for (za_index, &za) in ctx.za_grid.iter().enumerate() {
            compute_optical_properties(ctx, za_index, 0, &mut buffers.optical)?;
            debug!(za_index, za, "Updating zenith direction");
            for p_index in sequential_levels(p_lower, p_upper, za, theta_lim) {
                update_level_1d(ctx, field, None, source, &mut buffers, p_index, za_index)?;
            }
        }
        Ok(())
    }
}

/// Jacobi sweep over a 1D cloudbox
///
/// All incoming radiation is taken from a copy of the field made at the start of the sweep.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonSequentialUpdate1D;

impl FieldUpdater for NonSequentialUpdate1D {
    fn name(&self) -> &'static str {
        "non_sequential_1d"
    }

    fn sweep(
        &self,
        ctx: &SweepContext,
        field: &mut RadiationField,
        source: &ScatteringSourceField,
    ) -> DoitResult<()> {
        check_sweep_inputs(ctx, field, source)?;
        let mut buffers = SweepBuffers::new(ctx);
        let snapshot = field.clone();
        let (p_lower, p_upper) = ctx.limits.p_range();
        debug!("Starting non-sequential 1D sweep");

        for (za_index, &za) in ctx.za_grid.iter().enumerate() {
            compute_optical_properties(ctx, za_index, 0, &mut buffers.optical)?;
            debug!(za_index, za, "Updating zenith direction");
            for p_index in p_lower..=p_upper {
                // ground level looking down
                if p_index == 0 && za > 90.0 {
                    continue;
                }
                update_level_1d(
                    ctx,
                    field,
                    Some(&snapshot),
                    source,
                    &mut buffers,
                    p_index,
                    za_index,
                )?;
            }
        }
        Ok(())
    }
}
