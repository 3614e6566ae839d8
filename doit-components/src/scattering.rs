//! Scattering source agendas
//!
//! # What This Agenda Does
//!
//! [`IsotropicScattering`] redistributes the scattered part of the extinction evenly over
//! all directions:
//!
//! $$S(\theta, \phi) = \frac{k_{ext} - k_{abs}}{4\pi} \int I \, d\Omega$$
//!
//! The angular integral uses the trapezoid rule on the zenith and azimuth grids of the field.
//! In a 1D atmosphere the field does not depend on azimuth and the azimuth integral is
//! `2 pi`. Only the first Stokes component is scattered.

use doit_core::agenda::ScatteringSourceAgenda;
use doit_core::cloudbox::AtmosphereDim;
use doit_core::context::SweepContext;
use doit_core::errors::{DoitError, DoitResult};
use doit_core::field::{OpticalPropertyField, RadiationField, ScatteringSourceField};
use doit_core::optical::compute_optical_properties;
use doit_core::{FloatValue, DEG2RAD};
use ndarray::{s, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

/// Trapezoid integral over the full sphere of a field that does not depend on azimuth
pub fn integrate_zenith(values: ArrayView1<FloatValue>, za_grid: ArrayView1<FloatValue>) -> FloatValue {
    (0..za_grid.len().saturating_sub(1))
        .map(|i| {
            PI * DEG2RAD
                * (values[i] * (za_grid[i] * DEG2RAD).sin()
                    + values[i + 1] * (za_grid[i + 1] * DEG2RAD).sin())
                * (za_grid[i + 1] - za_grid[i])
        })
        .sum()
}

/// Trapezoid integral over the sphere of `values` `(za, aa)`
pub fn integrate_sphere(
    values: ArrayView2<FloatValue>,
    za_grid: ArrayView1<FloatValue>,
    aa_grid: ArrayView1<FloatValue>,
) -> FloatValue {
    let per_za: Vec<FloatValue> = za_grid
        .iter()
        .enumerate()
        .map(|(i, &za)| {
            (0..aa_grid.len().saturating_sub(1))
                .map(|j| {
                    0.5 * DEG2RAD
                        * (values[[i, j]] + values[[i, j + 1]])
                        * (aa_grid[j + 1] - aa_grid[j])
                        * (za * DEG2RAD).sin()
                })
                .sum()
        })
        .collect();
    (0..per_za.len().saturating_sub(1))
        .map(|i| 0.5 * DEG2RAD * (per_za[i] + per_za[i + 1]) * (za_grid[i + 1] - za_grid[i]))
        .sum()
}

/// Isotropic scattering by the particles of the cloudbox
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IsotropicScattering {
    /// `[za_index, aa_index]` at which the particle optical properties are evaluated
    #[serde(default)]
    pub reference_direction: [usize; 2],
}

#[typetag::serde]
impl ScatteringSourceAgenda for IsotropicScattering {
    fn execute(
        &self,
        ctx: &SweepContext,
        field: &RadiationField,
    ) -> DoitResult<ScatteringSourceField> {
        let shape = ctx.field_shape();
        field.check_shape("radiation field", &shape)?;
        let [za_index, aa_index] = self.reference_direction;
        if za_index >= shape.n_za || aa_index >= shape.n_aa {
            return Err(DoitError::InvalidConfig(format!(
                "scattering reference direction {:?} is outside the angular grids",
                self.reference_direction
            )));
        }

        let mut optical = OpticalPropertyField::zeros(ctx.limits, shape.stokes_dim);
        compute_optical_properties(ctx, za_index, aa_index, &mut optical)?;

        let mut source = ScatteringSourceField::zeros(shape);
        let data = field.data();
        for position in ctx.limits.positions() {
            let (p, lat, lon) = (position.p, position.lat, position.lon);
            let intensity = data.slice(s![p, lat, lon, .., .., 0]);
            let integral = match ctx.dim() {
                AtmosphereDim::OneD => integrate_zenith(intensity.column(0), ctx.za_grid),
                AtmosphereDim::ThreeD => integrate_sphere(intensity, ctx.za_grid, ctx.aa_grid),
            };
            let scattering =
                optical.ext_mat[[p, lat, lon, 0, 0]] - optical.abs_vec[[p, lat, lon, 0]];
            source
                .data_mut()
                .slice_mut(s![p, lat, lon, .., .., 0])
                .fill(scattering * integral / (4.0 * PI));
        }
        debug!(
            max_source = source.data().iter().fold(0.0, |a: FloatValue, &b| a.max(b)),
            "Isotropic scattering source"
        );
        Ok(source)
    }
}
