//! Radiation leaving the cloudbox towards an observer
//!
//! After the solve the radiation field is known on the cloudbox grid for every frequency.
//! A [`CloudboxFieldInterpolator`] evaluates it at a grid position on the cloudbox boundary
//! (or, for 1D, inside the cloudbox) and a line of sight, returning one Stokes vector per
//! frequency.

use crate::cloudbox::{AtmosphereDim, CloudboxFace, CloudboxLimits, CloudboxLocation};
use crate::coefficients::field_azimuth;
use crate::errors::{DoitError, DoitResult};
use crate::field::{FieldShape, RadiationField};
use crate::interpolate::{gridpos, interp_linear, interp_poly, GridPos, InterpMethod, InterpWeights};
use crate::FloatValue;
use ndarray::{s, Array1, Array2, ArrayView1};
use tracing::trace;

#[derive(Debug, Clone, Copy)]
pub struct CloudboxFieldInterpolator<'a> {
    limits: &'a CloudboxLimits,
    za_grid: ArrayView1<'a, FloatValue>,
    aa_grid: ArrayView1<'a, FloatValue>,
    method: InterpMethod,
}

impl<'a> CloudboxFieldInterpolator<'a> {
    pub fn new(
        limits: &'a CloudboxLimits,
        za_grid: ArrayView1<'a, FloatValue>,
        aa_grid: ArrayView1<'a, FloatValue>,
        method: InterpMethod,
    ) -> DoitResult<Self> {
        if limits.dim() == AtmosphereDim::ThreeD && method == InterpMethod::Polynomial {
            return Err(DoitError::PolynomialInterpolationUnsupported);
        }
        Ok(Self {
            limits,
            za_grid,
            aa_grid,
            method,
        })
    }

    /// Stokes vectors `(frequency, stokes)` at a grid position for line of sight `los`
    ///
    /// `spectrum` holds the solved field of every frequency. Grid positions refer to the full
    /// atmospheric grids; `gp_lat` and `gp_lon` are ignored for 1D cloudboxes.
    pub fn interpolate(
        &self,
        spectrum: &[RadiationField],
        gp_p: &GridPos,
        gp_lat: Option<&GridPos>,
        gp_lon: Option<&GridPos>,
        los: [FloatValue; 2],
    ) -> DoitResult<Array2<FloatValue>> {
        let stokes_dim = self.check_spectrum(spectrum)?;
        let location = self.limits.classify(gp_p, gp_lat, gp_lon)?;
        trace!(?location, za = los[0], aa = los[1], "Interpolating cloudbox field");

        let mut out = Array2::zeros((spectrum.len(), stokes_dim));
        match (self.limits.dim(), location) {
            (AtmosphereDim::OneD, CloudboxLocation::Face(face)) => {
                let p = if face.is_upper() { self.limits.n_p() - 1 } else { 0 };
                let gp_za = gridpos(self.za_grid, los[0])?;
                for (f, field) in spectrum.iter().enumerate() {
                    let data = field.data();
                    for i in 0..stokes_dim {
                        out[[f, i]] =
                            self.interp_za(data.slice(s![p, 0, 0, .., 0, i]), los[0], &gp_za)?;
                    }
                }
            }
            (AtmosphereDim::OneD, CloudboxLocation::Interior) => {
                let (p_lower, p_upper) = self.limits.p_range();
                let cloud_gp = gp_p.relative_to(p_lower, p_upper - p_lower);
                let gp_za = gridpos(self.za_grid, los[0])?;
                for (f, field) in spectrum.iter().enumerate() {
                    let data = field.data();
                    for i in 0..stokes_dim {
                        let per_za: Array1<FloatValue> = data
                            .slice(s![.., 0, 0, .., 0, i])
                            .columns()
                            .into_iter()
                            .map(|column| interp_linear(&cloud_gp, column))
                            .collect();
                        out[[f, i]] = self.interp_za(per_za.view(), los[0], &gp_za)?;
                    }
                }
            }
            (AtmosphereDim::ThreeD, CloudboxLocation::Face(face)) => {
                let positions = [
                    *gp_p,
                    gp_lat.copied().unwrap_or(GridPos::at_index(0)),
                    gp_lon.copied().unwrap_or(GridPos::at_index(0)),
                ];
                self.interpolate_face_3d(spectrum, face, &positions, los, &mut out)?;
            }
            (AtmosphereDim::ThreeD, CloudboxLocation::Interior) => {
                return Err(DoitError::InteriorInterpolation3DUnsupported);
            }
        }
        Ok(out)
    }

    fn check_spectrum(&self, spectrum: &[RadiationField]) -> DoitResult<usize> {
        let first = spectrum.first().ok_or_else(|| {
            DoitError::Error("no radiation fields to interpolate".to_string())
        })?;
        let stokes_dim = first.stokes_dim();
        let expected = FieldShape::for_cloudbox(
            self.limits,
            self.za_grid.len(),
            self.aa_grid.len(),
            stokes_dim,
        );
        for field in spectrum {
            field.check_shape("radiation field spectrum", &expected)?;
        }
        Ok(stokes_dim)
    }

    fn interp_za(
        &self,
        values: ArrayView1<FloatValue>,
        za: FloatValue,
        gp_za: &GridPos,
    ) -> DoitResult<FloatValue> {
        match self.method {
            InterpMethod::Linear => Ok(interp_linear(gp_za, values)),
            InterpMethod::Polynomial => interp_poly(self.za_grid, values, za, gp_za),
        }
    }

    /// Linear interpolation over the two tangential dimensions of a face and both angles
    fn interpolate_face_3d(
        &self,
        spectrum: &[RadiationField],
        face: CloudboxFace,
        positions: &[GridPos; 3],
        los: [FloatValue; 2],
        out: &mut Array2<FloatValue>,
    ) -> DoitResult<()> {
        let fixed = face.dimension();
        let (lower, upper) = self.limits.range(fixed);
        let face_index = if face.is_upper() { upper - lower } else { 0 };

        let tangential: Vec<GridPos> = (0..3)
            .filter(|&dimension| dimension != fixed)
            .map(|dimension| {
                let (lo, hi) = self.limits.range(dimension);
                positions[dimension].relative_to(lo, hi - lo)
            })
            .collect();
        let gp_za = gridpos(self.za_grid, los[0])?;
        let gp_aa = gridpos(self.aa_grid, field_azimuth(self.aa_grid, los[1]))?;
        let weights = InterpWeights::new(&[tangential[0], tangential[1], gp_za, gp_aa]);

        for (f, field) in spectrum.iter().enumerate() {
            let data = field.data();
            let slice = match fixed {
                0 => data.slice_move(s![face_index, .., .., .., .., ..]),
                1 => data.slice_move(s![.., face_index, .., .., .., ..]),
                _ => data.slice_move(s![.., .., face_index, .., .., ..]),
            };
            for i in 0..out.ncols() {
                out[[f, i]] = weights.interp(&slice.slice(s![.., .., .., .., i]).into_dyn());
            }
        }
        Ok(())
    }
}
