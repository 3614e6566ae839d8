//! Quantities along a path step
//!
//! Before a path step is integrated, the optical properties, scattering source, radiation
//! field and atmospheric state are interpolated onto each of its points. Interpolation
//! weights are computed once per point and shared by all Stokes components and species.

use crate::context::SweepContext;
use crate::errors::{DoitError, DoitResult};
use crate::field::{OpticalPropertyField, RadiationField, ScatteringSourceField};
use crate::interpolate::{
    gridpos, interp_log_pressure, interp_poly, GridPos, InterpMethod, InterpWeights,
};
use crate::ppath::{PpathPoint, PpathStep};
use crate::rte::StokesVector;
use crate::FloatValue;
use ndarray::{s, Array1, Array2, Array3, ArrayView1, ArrayView2};

/// Quantities at each point of a path step
#[derive(Debug, Clone, PartialEq)]
pub struct PathProfile {
    /// Particle extinction matrices `(point, stokes, stokes)`
    pub ext_mat: Array3<FloatValue>,
    /// Particle absorption vectors `(point, stokes)`
    pub abs_vec: Array2<FloatValue>,
    /// Scattering source `(point, stokes)`
    pub sca_vec: Array2<FloatValue>,
    /// Radiation field `(point, stokes)`
    pub field: Array2<FloatValue>,
    pub temperature: Array1<FloatValue>,
    pub pressure: Array1<FloatValue>,
    /// `(point, species)`
    pub vmr: Array2<FloatValue>,
}

impl PathProfile {
    pub fn zeros(np: usize, stokes_dim: usize, n_species: usize) -> Self {
        Self {
            ext_mat: Array3::zeros((np, stokes_dim, stokes_dim)),
            abs_vec: Array2::zeros((np, stokes_dim)),
            sca_vec: Array2::zeros((np, stokes_dim)),
            field: Array2::zeros((np, stokes_dim)),
            temperature: Array1::zeros(np),
            pressure: Array1::zeros(np),
            vmr: Array2::zeros((np, n_species)),
        }
    }

    pub fn np(&self) -> usize {
        self.temperature.len()
    }

    pub fn stokes_dim(&self) -> usize {
        self.abs_vec.ncols()
    }

    pub fn n_species(&self) -> usize {
        self.vmr.ncols()
    }

    /// Field at the far end of the path, the radiation entering the step
    pub fn incoming(&self) -> StokesVector {
        let last = self.np() - 1;
        StokesVector::from_fn(self.stokes_dim(), |i, _| self.field[[last, i]])
    }

    /// Check that every quantity has one entry per point
    pub fn check_consistent(&self) -> DoitResult<()> {
        let np = self.np();
        let lengths = [
            ("ext_mat", self.ext_mat.shape()[0]),
            ("abs_vec", self.abs_vec.nrows()),
            ("sca_vec", self.sca_vec.nrows()),
            ("field", self.field.nrows()),
            ("pressure", self.pressure.len()),
            ("vmr", self.vmr.nrows()),
        ];
        for (name, n) in lengths {
            if n != np {
                return Err(DoitError::ShapeMismatch {
                    name: format!("path {}", name),
                    expected: vec![np],
                    actual: vec![n],
                });
            }
        }
        if np == 0 {
            return Err(DoitError::Error("path profile has no points".to_string()));
        }
        Ok(())
    }

    /// Atmospheric state at one point from weights over the full `(p, lat, lon)` grids
    fn set_atmosphere(&mut self, k: usize, ctx: &SweepContext, full: &FullGridPosition) {
        let atmosphere = ctx.atmosphere;
        self.temperature[k] = full.weights.interp(&atmosphere.t_field.view().into_dyn());
        self.pressure[k] = interp_log_pressure(atmosphere.p_grid.view(), &full.gp_p);
        for species in 0..atmosphere.n_species() {
            let vmr = atmosphere.vmr_field.slice(s![species, .., .., ..]);
            self.vmr[[k, species]] = full.weights.interp(&vmr.into_dyn());
        }
    }
}

/// Position of a path point in the full atmospheric grids
struct FullGridPosition {
    gp_p: GridPos,
    weights: InterpWeights,
}

impl FullGridPosition {
    fn new(ctx: &SweepContext, point: &PpathPoint) -> Self {
        let atmosphere = ctx.atmosphere;
        let mut gp_p = point.gp_p;
        gp_p.upper_end_check(atmosphere.n_p() - 1);
        let mut gp_lat = point.gp_lat_or_origin();
        gp_lat.upper_end_check(atmosphere.n_lat() - 1);
        let mut gp_lon = point.gp_lon_or_origin();
        gp_lon.upper_end_check(atmosphere.n_lon() - 1);
        Self {
            gp_p,
            weights: InterpWeights::new(&[gp_p, gp_lat, gp_lon]),
        }
    }
}

/// Map a path azimuth angle onto the azimuth grid of the field
///
/// The field azimuth is the path azimuth plus 180 degrees, wrapped into the grid range.
pub fn field_azimuth(aa_grid: ArrayView1<FloatValue>, path_aa: FloatValue) -> FloatValue {
    let mut aa = path_aa + 180.0;
    let last = aa_grid[aa_grid.len() - 1];
    let first = aa_grid[0];
    if aa > last && aa - 360.0 >= first {
        aa -= 360.0;
    } else if aa < first && aa + 360.0 <= last {
        aa += 360.0;
    }
    aa
}

/// Interpolate `values` `(p, za)` at a cloudbox pressure position and zenith angle
fn interp_p_za(
    method: InterpMethod,
    za_grid: ArrayView1<FloatValue>,
    p_weights: &InterpWeights,
    p_za_weights: &InterpWeights,
    gp_za: &GridPos,
    za: FloatValue,
    values: ArrayView2<FloatValue>,
) -> DoitResult<FloatValue> {
    match method {
        InterpMethod::Linear => Ok(p_za_weights.interp(&values.into_dyn())),
        InterpMethod::Polynomial => {
            let per_za: Array1<FloatValue> = values
                .columns()
                .into_iter()
                .map(|column| p_weights.interp(&column.into_dyn()))
                .collect();
            interp_poly(za_grid, per_za.view(), za, gp_za)
        }
    }
}

/// Interpolate cloudbox quantities onto the points of a 1D path step
pub fn interp_cloud_coeff_1d(
    ctx: &SweepContext,
    ppath: &PpathStep,
    optical: &OpticalPropertyField,
    source: &ScatteringSourceField,
    field: &RadiationField,
) -> DoitResult<PathProfile> {
    let stokes_dim = ctx.stokes_dim();
    let (p_lower, p_upper) = ctx.limits.p_range();
    let method = ctx.config.za_interp;
    let mut profile = PathProfile::zeros(ppath.np(), stokes_dim, ctx.atmosphere.n_species());

    let ext_mat = optical.ext_mat.slice(s![.., 0, 0, .., ..]);
    let abs_vec = optical.abs_vec.slice(s![.., 0, 0, ..]);
    let source = source.data();
    let field = field.data();

    for (k, point) in ppath.points.iter().enumerate() {
        let cloud_gp = point.gp_p.relative_to(p_lower, p_upper - p_lower);
        let za = point.za();
        let gp_za = gridpos(ctx.za_grid, za)?;
        let p_weights = InterpWeights::new(&[cloud_gp]);
        let p_za_weights = InterpWeights::new(&[cloud_gp, gp_za]);

        for i in 0..stokes_dim {
            profile.abs_vec[[k, i]] = p_weights.interp(&abs_vec.slice(s![.., i]).into_dyn());
            for j in 0..stokes_dim {
                profile.ext_mat[[k, i, j]] =
                    p_weights.interp(&ext_mat.slice(s![.., i, j]).into_dyn());
            }
            profile.sca_vec[[k, i]] = interp_p_za(
                method,
                ctx.za_grid,
                &p_weights,
                &p_za_weights,
                &gp_za,
                za,
                source.slice(s![.., 0, 0, .., 0, i]),
            )?;
            profile.field[[k, i]] = interp_p_za(
                method,
                ctx.za_grid,
                &p_weights,
                &p_za_weights,
                &gp_za,
                za,
                field.slice(s![.., 0, 0, .., 0, i]),
            )?;
        }

        profile.set_atmosphere(k, ctx, &FullGridPosition::new(ctx, point));
    }
    Ok(profile)
}

/// Interpolate cloudbox quantities onto the points of a 3D path step
///
/// Interpolation is linear in all dimensions.
pub fn interp_cloud_coeff_3d(
    ctx: &SweepContext,
    ppath: &PpathStep,
    optical: &OpticalPropertyField,
    source: &ScatteringSourceField,
    field: &RadiationField,
) -> DoitResult<PathProfile> {
    let stokes_dim = ctx.stokes_dim();
    let limits = ctx.limits;
    let mut profile = PathProfile::zeros(ppath.np(), stokes_dim, ctx.atmosphere.n_species());
    let source = source.data();
    let field = field.data();

    for (k, point) in ppath.points.iter().enumerate() {
        let mut cloud_gps = [
            point.gp_p,
            point.gp_lat_or_origin(),
            point.gp_lon_or_origin(),
        ];
        for (dimension, gp) in cloud_gps.iter_mut().enumerate() {
            let (lower, upper) = limits.range(dimension);
            *gp = gp.relative_to(lower, upper - lower);
        }
        let gp_za = gridpos(ctx.za_grid, point.za())?;
        let gp_aa = gridpos(ctx.aa_grid, field_azimuth(ctx.aa_grid, point.aa()))?;

        let spatial = InterpWeights::new(&cloud_gps);
        let angular = InterpWeights::new(&[
            cloud_gps[0],
            cloud_gps[1],
            cloud_gps[2],
            gp_za,
            gp_aa,
        ]);

        for i in 0..stokes_dim {
            profile.abs_vec[[k, i]] =
                spatial.interp(&optical.abs_vec.slice(s![.., .., .., i]).into_dyn());
            for j in 0..stokes_dim {
                profile.ext_mat[[k, i, j]] =
                    spatial.interp(&optical.ext_mat.slice(s![.., .., .., i, j]).into_dyn());
            }
            profile.sca_vec[[k, i]] =
                angular.interp(&source.slice(s![.., .., .., .., .., i]).into_dyn());
            profile.field[[k, i]] =
                angular.interp(&field.slice(s![.., .., .., .., .., i]).into_dyn());
        }

        profile.set_atmosphere(k, ctx, &FullGridPosition::new(ctx, point));
    }
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_field_azimuth_wraps_into_grid() {
        let aa_grid = array![0.0, 90.0, 180.0, 270.0, 360.0];
        assert_eq!(field_azimuth(aa_grid.view(), -180.0), 0.0);
        assert_eq!(field_azimuth(aa_grid.view(), 0.0), 180.0);
        assert_eq!(field_azimuth(aa_grid.view(), 180.0), 360.0);

        let half = array![0.0, 90.0, 180.0];
        assert_eq!(field_azimuth(half.view(), 90.0), 270.0);
        assert_eq!(field_azimuth(half.view(), -170.0), 10.0);
    }

    #[test]
    fn test_profile_consistency() {
        let mut profile = PathProfile::zeros(3, 2, 1);
        assert!(profile.check_consistent().is_ok());
        assert_eq!(profile.incoming().len(), 2);

        profile.pressure = Array1::zeros(2);
        assert!(matches!(
            profile.check_consistent(),
            Err(DoitError::ShapeMismatch { .. })
        ));
    }
}
