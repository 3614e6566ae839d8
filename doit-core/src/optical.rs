//! Particle optical properties over the cloudbox
//!
//! For one propagation direction the particle agendas are run at every cloudbox position and
//! the bulk extinction matrix and absorption vector are stored in an
//! [`OpticalPropertyField`].

use crate::agenda::check_optical_properties;
use crate::atmosphere::check_shape;
use crate::context::SweepContext;
use crate::errors::DoitResult;
use crate::field::OpticalPropertyField;
use tracing::debug;

/// Fill `out` with the particle optical properties for direction `(za_index, aa_index)`
pub fn compute_optical_properties(
    ctx: &SweepContext,
    za_index: usize,
    aa_index: usize,
    out: &mut OpticalPropertyField,
) -> DoitResult<()> {
    let stokes_dim = ctx.stokes_dim();
    out.check_shape(&ctx.field_shape())?;
    debug!(za_index, aa_index, "Computing particle optical properties");

    for position in ctx.limits.positions() {
        let (p, lat, lon) = ctx.limits.to_global(position);
        let temperature = ctx.atmosphere.t_field[[p, lat, lon]];

        let properties = ctx.agendas.particle_properties.execute(
            position,
            temperature,
            ctx.f_index,
            za_index,
            aa_index,
            stokes_dim,
        )?;
        let n_types = properties.n_types();
        check_shape(
            "single scattering extinction",
            properties.ext_mat.shape(),
            &[n_types, stokes_dim, stokes_dim],
        )?;
        check_shape(
            "single scattering absorption",
            properties.abs_vec.shape(),
            &[n_types, stokes_dim],
        )?;

        let (ext, abs) = ctx.agendas.particle_sum.execute(&properties, position)?;
        check_optical_properties("particle_sum", &ext, &abs, stokes_dim)?;
        out.set(position, &ext, &abs);
    }
    Ok(())
}
