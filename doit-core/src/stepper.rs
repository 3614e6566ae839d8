//! Radiative transfer along a single path step
//!
//! [`CloudboxFieldStepper`] integrates the incoming radiation at the far end of a path step
//! back to its start, one segment at a time, and handles steps ending on the surface.

use crate::agenda::check_optical_properties;
use crate::coefficients::PathProfile;
use crate::context::SweepContext;
use crate::errors::{DoitError, DoitResult};
use crate::field::{FieldIndex, RadiationField};
use crate::interpolate::{gridpos, interp_linear, interp_poly, InterpMethod};
use crate::ppath::PpathStep;
use crate::rte::{is_singular, planck, rte_step, ExtinctionMatrix, StokesVector};
use crate::FloatValue;
use ndarray::s;
use tracing::trace;

/// Buffers reused between path steps
#[derive(Debug, Clone)]
pub struct SegmentScratch {
    vmr: Vec<FloatValue>,
    sca_vec: StokesVector,
}

impl SegmentScratch {
    pub fn new(stokes_dim: usize, n_species: usize) -> Self {
        Self {
            vmr: vec![0.0; n_species],
            sca_vec: StokesVector::zeros(stokes_dim),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CloudboxFieldStepper<'a> {
    ctx: SweepContext<'a>,
}

impl<'a> CloudboxFieldStepper<'a> {
    pub fn new(ctx: SweepContext<'a>) -> Self {
        Self { ctx }
    }

    /// Stokes vector at the start of `ppath` from the radiation entering at its far end
    ///
    /// `profile` holds the quantities interpolated onto the path points.
    pub fn rt_no_background(
        &self,
        ppath: &PpathStep,
        profile: &PathProfile,
        index: FieldIndex,
        scratch: &mut SegmentScratch,
    ) -> DoitResult<StokesVector> {
        self.propagate(profile, &ppath.l_step, index, scratch)
    }

    /// Integrate the last point's field of `profile` back to its first point
    ///
    /// `l_step[k]` is the length of the segment between points `k` and `k + 1`. Segments are
    /// processed from the far end towards the start. `index` only identifies the result in
    /// error messages.
    pub fn propagate(
        &self,
        profile: &PathProfile,
        l_step: &[FloatValue],
        index: FieldIndex,
        scratch: &mut SegmentScratch,
    ) -> DoitResult<StokesVector> {
        profile.check_consistent()?;
        if l_step.len() + 1 != profile.np() {
            return Err(DoitError::ShapeMismatch {
                name: "l_step".to_string(),
                expected: vec![profile.np() - 1],
                actual: vec![l_step.len()],
            });
        }
        let stokes_dim = self.ctx.stokes_dim();
        if profile.stokes_dim() != stokes_dim {
            return Err(DoitError::ShapeMismatch {
                name: "path profile stokes components".to_string(),
                expected: vec![stokes_dim],
                actual: vec![profile.stokes_dim()],
            });
        }
        if scratch.vmr.len() != profile.n_species() || scratch.sca_vec.len() != stokes_dim {
            *scratch = SegmentScratch::new(stokes_dim, profile.n_species());
        }

        let agendas = self.ctx.agendas;
        let f_index = self.ctx.f_index;
        let frequency = self.ctx.frequency();
        let mut stokes = profile.incoming();
        trace!(?index, incoming = ?stokes.as_slice(), "Integrating path step");

        for k in (0..l_step.len()).rev() {
            let temperature = 0.5 * (profile.temperature[k] + profile.temperature[k + 1]);
            let pressure = 0.5 * (profile.pressure[k] + profile.pressure[k + 1]);
            for (species, vmr) in scratch.vmr.iter_mut().enumerate() {
                *vmr = 0.5 * (profile.vmr[[k, species]] + profile.vmr[[k + 1, species]]);
            }

            let absorption =
                agendas
                    .gas_absorption
                    .execute(f_index, pressure, temperature, &scratch.vmr)?;
            let (mut ext, mut abs) = agendas.gas_optical_properties.execute(
                f_index,
                absorption.view(),
                stokes_dim,
            )?;
            check_optical_properties("gas_optical_properties", &ext, &abs, stokes_dim)?;

            for i in 0..stokes_dim {
                abs[i] += 0.5 * (profile.abs_vec[[k, i]] + profile.abs_vec[[k + 1, i]]);
                scratch.sca_vec[i] = 0.5 * (profile.sca_vec[[k, i]] + profile.sca_vec[[k + 1, i]]);
                for j in 0..stokes_dim {
                    ext[(i, j)] += 0.5 * (profile.ext_mat[[k, i, j]] + profile.ext_mat[[k + 1, i, j]]);
                }
            }

            let planck_value = planck(frequency, temperature);
            if is_singular(&ext) {
                return Err(DoitError::SingularExtinctionMatrix {
                    index,
                    matrix: format!("{}", ext),
                });
            }
            trace!(
                segment = k,
                l_step = l_step[k],
                planck = planck_value,
                temperature,
                pressure,
                ext = ?ext.as_slice(),
                abs = ?abs.as_slice(),
                sca = ?scratch.sca_vec.as_slice(),
                "Radiative transfer step"
            );

            rte_step(
                &mut stokes,
                &ext,
                &abs,
                &scratch.sca_vec,
                l_step[k],
                planck_value,
            );
        }
        Ok(stokes)
    }

    /// Radiation leaving the surface where `ppath` ends
    ///
    /// The surface agenda gives the emission and the directions and matrices of the
    /// reflected radiation. The reflected radiation is taken from `field` at the lowest
    /// cloudbox level, interpolated to each reflected zenith angle, at the lat/lon/azimuth of
    /// `index`. The result belongs at the lowest cloudbox level.
    pub fn rt_surface(
        &self,
        ppath: &PpathStep,
        field: &RadiationField,
        index: FieldIndex,
    ) -> DoitResult<StokesVector> {
        let agenda = self
            .ctx
            .agendas
            .surface
            .as_ref()
            .ok_or_else(|| DoitError::MissingAgenda("surface".to_string()))?;
        let stokes_dim = self.ctx.stokes_dim();
        let f_index = self.ctx.f_index;

        let properties = agenda.execute(self.ctx.atmosphere, ppath.last(), stokes_dim)?;
        properties.check_shape(self.ctx.atmosphere.f_grid.len(), stokes_dim)?;

        let mut stokes = StokesVector::from_fn(stokes_dim, |i, _| properties.emission[[f_index, i]]);
        for (ilos, los) in properties.los.iter().enumerate() {
            let rmatrix = ExtinctionMatrix::from_fn(stokes_dim, stokes_dim, |i, j| {
                properties.rmatrix[[ilos, f_index, i, j]]
            });
            let incoming = self.surface_level_field(field, index, los[0])?;
            stokes += rmatrix * incoming;
        }
        trace!(?index, surface = ?stokes.as_slice(), "Surface leaving radiation");
        Ok(stokes)
    }

    fn surface_level_field(
        &self,
        field: &RadiationField,
        index: FieldIndex,
        za: FloatValue,
    ) -> DoitResult<StokesVector> {
        let gp_za = gridpos(self.ctx.za_grid, za)?;
        let data = field.data();
        let values = data.slice(s![0, index.lat, index.lon, .., index.aa, ..]);
        let mut stokes = StokesVector::zeros(self.ctx.stokes_dim());
        for (i, column) in values.columns().into_iter().enumerate() {
            stokes[i] = match self.ctx.config.za_interp {
                InterpMethod::Polynomial => interp_poly(self.ctx.za_grid, column, za, &gp_za)?,
                InterpMethod::Linear => interp_linear(&gp_za, column),
            };
        }
        Ok(stokes)
    }
}
