use super::{check_sweep_inputs, FieldUpdater, SweepBuffers};
use crate::cloudbox::CloudboxIndex;
use crate::coefficients::interp_cloud_coeff_3d;
use crate::context::SweepContext;
use crate::errors::DoitResult;
use crate::field::{FieldIndex, RadiationField, ScatteringSourceField};
use crate::optical::compute_optical_properties;
use crate::ppath::{Background, PpathStep};
use crate::stepper::CloudboxFieldStepper;
use tracing::{debug, trace, warn};

/// Gauss-Seidel sweep over a 3D cloudbox
///
/// Directions are processed zenith first, then azimuth. For each direction pressure levels
/// are visited against the propagation direction, then latitudes and longitudes in
/// ascending order. When the azimuth grid covers exactly 360 degrees its first point is not
/// computed but copied from the last one.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialUpdate3D;

impl SequentialUpdate3D {
    /// Update one field slot, returning whether its path step ended on the surface
    ///
    /// Surface reflection is not modelled in 3D: a step ending on the ground is propagated
    /// like any other step inside the cloudbox.
    fn update_point(
        &self,
        ctx: &SweepContext,
        field: &mut RadiationField,
        source: &ScatteringSourceField,
        buffers: &mut SweepBuffers,
        position: (usize, usize, usize),
        za_index: usize,
        aa_index: usize,
    ) -> DoitResult<bool> {
        let (p, lat, lon) = position;
        let za = ctx.za_grid[za_index];
        let aa = ctx.aa_grid[aa_index];
        let start = PpathStep::start_3d(ctx.atmosphere, p, lat, lon, [za, aa - 180.0]);
        let ppath = ctx.agendas.ppath_step.execute(ctx.atmosphere, start)?;

        let last = ppath.last();
        let inside = ctx.limits.is_inside(
            &last.gp_p,
            &last.gp_lat_or_origin(),
            &last.gp_lon_or_origin(),
            ctx.config.boundary_tolerance,
        );
        if !inside || ppath.np() < 2 {
            trace!(p, lat, lon, za, aa, "Path step leaves the cloudbox");
            return Ok(false);
        }
        let on_surface = ppath.background == Background::Surface;
        if on_surface {
            debug!(p, lat, lon, za, aa, "Path step ends on the surface");
        }

        let (p_lower, _) = ctx.limits.p_range();
        let (lat_lower, _) = ctx.limits.lat_range();
        let (lon_lower, _) = ctx.limits.lon_range();
        let index = FieldIndex::new(
            CloudboxIndex::new(p - p_lower, lat - lat_lower, lon - lon_lower),
            za_index,
            aa_index,
        );

        let profile = interp_cloud_coeff_3d(ctx, &ppath, &buffers.optical, source, field)?;
        let stokes = CloudboxFieldStepper::new(*ctx).rt_no_background(
            &ppath,
            &profile,
            index,
            &mut buffers.segment,
        )?;
        field.set_stokes(index, &stokes);
        Ok(on_surface)
    }
}

/// Whether an azimuth grid covers a full circle, making its end points the same direction
pub fn is_periodic_azimuth(aa_grid: &[f64]) -> bool {
    match (aa_grid.first(), aa_grid.last()) {
        (Some(first), Some(last)) if aa_grid.len() > 1 => ((last - first) - 360.0).abs() < 1e-9,
        _ => false,
    }
}

impl FieldUpdater for SequentialUpdate3D {
    fn name(&self) -> &'static str {
        "sequential_3d"
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
        let (lat_lower, lat_upper) = ctx.limits.lat_range();
        let (lon_lower, lon_upper) = ctx.limits.lon_range();

        let aa_grid = ctx.aa_grid.to_vec();
        let periodic = is_periodic_azimuth(&aa_grid);
        let first_aa = usize::from(periodic);
        let n_aa = aa_grid.len();
        debug!(periodic, "Starting sequential 3D sweep");
        let mut surface_hits = 0usize;

        for (za_index, &za) in ctx.za_grid.iter().enumerate() {
            for aa_index in first_aa..n_aa {
                compute_optical_properties(ctx, za_index, aa_index, &mut buffers.optical)?;
                debug!(za_index, aa_index, za, aa = aa_grid[aa_index], "Updating direction");

                let levels: Vec<usize> = if za <= 90.0 {
                    (p_lower..p_upper).rev().collect()
                } else {
                    (p_lower + 1..=p_upper).collect()
                };
                for p in levels {
                    for lat in lat_lower..=lat_upper {
                        for lon in lon_lower..=lon_upper {
                            let on_surface = self.update_point(
                                ctx,
                                field,
                                source,
                                &mut buffers,
                                (p, lat, lon),
                                za_index,
                                aa_index,
                            )?;
                            surface_hits += usize::from(on_surface);
                        }
                    }
                }
            }
            if periodic {
                field.copy_azimuth(za_index, n_aa - 1, 0);
            }
        }
        if surface_hits > 0 {
            warn!(
                surface_hits,
                "3D path steps reached the surface, which is treated as non-reflecting"
            );
        }
        Ok(())
    }
}
