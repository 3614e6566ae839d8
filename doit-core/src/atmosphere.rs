//! Atmospheric state seen by the solver
//!
//! Holds the grids and fields that the cloudbox calculation reads: pressure, latitude and
//! longitude grids, altitude, temperature and VMR fields, the geoid radius and surface
//! altitude, and the frequency grid.

use crate::cloudbox::AtmosphereDim;
use crate::errors::{DoitError, DoitResult};
use crate::FloatValue;
use ndarray::{Array1, Array2, Array3, Array4, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Grids and fields of the atmosphere
///
/// Spatial fields are indexed `(p, lat, lon)`; the VMR field is `(species, p, lat, lon)`.
/// In a 1D atmosphere the latitude and longitude grids hold a single point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtmosphericState {
    pub dim: AtmosphereDim,
    /// Pressure grid (Pa), strictly decreasing
    pub p_grid: Array1<FloatValue>,
    /// Latitude grid (degrees), strictly increasing
    pub lat_grid: Array1<FloatValue>,
    /// Longitude grid (degrees), strictly increasing
    pub lon_grid: Array1<FloatValue>,
    /// Geometric altitudes (m)
    pub z_field: Array3<FloatValue>,
    /// Temperatures (K)
    pub t_field: Array3<FloatValue>,
    /// Volume mixing ratios
    pub vmr_field: Array4<FloatValue>,
    /// Geoid radius (m) per (lat, lon)
    pub r_geoid: Array2<FloatValue>,
    /// Surface altitude (m) per (lat, lon)
    pub z_surface: Array2<FloatValue>,
    /// Frequency grid (Hz)
    pub f_grid: Array1<FloatValue>,
}

impl AtmosphericState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dim: AtmosphereDim,
        p_grid: Array1<FloatValue>,
        lat_grid: Array1<FloatValue>,
        lon_grid: Array1<FloatValue>,
        z_field: Array3<FloatValue>,
        t_field: Array3<FloatValue>,
        vmr_field: Array4<FloatValue>,
        r_geoid: Array2<FloatValue>,
        z_surface: Array2<FloatValue>,
        f_grid: Array1<FloatValue>,
    ) -> DoitResult<Self> {
        let state = Self {
            dim,
            p_grid,
            lat_grid,
            lon_grid,
            z_field,
            t_field,
            vmr_field,
            r_geoid,
            z_surface,
            f_grid,
        };
        state.validate()?;
        Ok(state)
    }

    /// Build a 1D atmosphere from profiles
    ///
    /// `vmr` is indexed `(species, p)`.
    pub fn one_d(
        p_grid: Array1<FloatValue>,
        z: Array1<FloatValue>,
        t: Array1<FloatValue>,
        vmr: Array2<FloatValue>,
        r_geoid: FloatValue,
        z_surface: FloatValue,
        f_grid: Array1<FloatValue>,
    ) -> DoitResult<Self> {
        let to_field = |profile: Array1<FloatValue>| {
            let n = profile.len();
            profile.into_shape((n, 1, 1))
        };
        let n_species = vmr.nrows();
        let n_vmr_p = vmr.ncols();
        let z_field = to_field(z).map_err(|e| DoitError::Error(e.to_string()))?;
        let t_field = to_field(t).map_err(|e| DoitError::Error(e.to_string()))?;
        let vmr_field = vmr
            .into_shape((n_species, n_vmr_p, 1, 1))
            .map_err(|e| DoitError::Error(e.to_string()))?;

        Self::new(
            AtmosphereDim::OneD,
            p_grid,
            Array1::zeros(1),
            Array1::zeros(1),
            z_field,
            t_field,
            vmr_field,
            Array2::from_elem((1, 1), r_geoid),
            Array2::from_elem((1, 1), z_surface),
            f_grid,
        )
    }

    pub fn n_p(&self) -> usize {
        self.p_grid.len()
    }

    pub fn n_lat(&self) -> usize {
        self.lat_grid.len()
    }

    pub fn n_lon(&self) -> usize {
        self.lon_grid.len()
    }

    pub fn n_species(&self) -> usize {
        self.vmr_field.len_of(Axis(0))
    }

    /// Altitude profile at a (lat, lon) column
    pub fn z_column(&self, lat: usize, lon: usize) -> ArrayView1<FloatValue> {
        self.z_field.slice(ndarray::s![.., lat, lon])
    }

    /// Distance from the planet centre of grid point `(p, lat, lon)`
    pub fn radius(&self, p: usize, lat: usize, lon: usize) -> FloatValue {
        self.r_geoid[[lat, lon]] + self.z_field[[p, lat, lon]]
    }

    /// Check grid ordering and field shapes
    pub fn validate(&self) -> DoitResult<()> {
        let (n_p, n_lat, n_lon) = (self.n_p(), self.n_lat(), self.n_lon());

        if n_p < 2 {
            return Err(invalid_grid("p_grid", "at least two pressure levels are required"));
        }
        if self.p_grid.windows(2).into_iter().any(|w| w[1] >= w[0]) {
            return Err(invalid_grid("p_grid", "must be strictly decreasing"));
        }
        for (name, grid) in [("lat_grid", &self.lat_grid), ("lon_grid", &self.lon_grid)] {
            if grid.is_empty() {
                return Err(invalid_grid(name, "must not be empty"));
            }
            if grid.windows(2).into_iter().any(|w| w[1] <= w[0]) {
                return Err(invalid_grid(name, "must be strictly increasing"));
            }
        }
        if self.dim == AtmosphereDim::OneD && (n_lat != 1 || n_lon != 1) {
            return Err(invalid_grid(
                "lat_grid",
                "1D atmospheres use single point latitude and longitude grids",
            ));
        }
        if self.dim == AtmosphereDim::ThreeD && (n_lat < 2 || n_lon < 2) {
            return Err(invalid_grid(
                "lat_grid",
                "3D atmospheres need at least two latitudes and longitudes",
            ));
        }
        if self.f_grid.is_empty() {
            return Err(invalid_grid("f_grid", "must not be empty"));
        }

        check_shape("z_field", self.z_field.shape(), &[n_p, n_lat, n_lon])?;
        check_shape("t_field", self.t_field.shape(), &[n_p, n_lat, n_lon])?;
        check_shape(
            "vmr_field",
            &self.vmr_field.shape()[1..],
            &[n_p, n_lat, n_lon],
        )?;
        check_shape("r_geoid", self.r_geoid.shape(), &[n_lat, n_lon])?;
        check_shape("z_surface", self.z_surface.shape(), &[n_lat, n_lon])?;

        for lat in 0..n_lat {
            for lon in 0..n_lon {
                let column = self.z_column(lat, lon);
                if column.windows(2).into_iter().any(|w| w[1] <= w[0]) {
                    return Err(invalid_grid(
                        "z_field",
                        "altitudes must increase with decreasing pressure",
                    ));
                }
            }
        }
        if self.t_field.iter().any(|&t| t <= 0.0) {
            return Err(invalid_grid("t_field", "temperatures must be positive"));
        }
        Ok(())
    }
}

fn invalid_grid(name: &str, reason: &str) -> DoitError {
    DoitError::InvalidGrid {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

/// Compare an array shape with the expected one
pub fn check_shape(name: &str, actual: &[usize], expected: &[usize]) -> DoitResult<()> {
    if actual != expected {
        return Err(DoitError::ShapeMismatch {
            name: name.to_string(),
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        });
    }
    Ok(())
}
