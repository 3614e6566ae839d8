//! Radiation, scattering source and optical property fields of the cloudbox

use crate::atmosphere::check_shape;
use crate::cloudbox::{CloudboxIndex, CloudboxLimits};
use crate::errors::DoitResult;
use crate::rte::{ExtinctionMatrix, StokesVector};
use crate::FloatValue;
use ndarray::{Array4, Array5, Array6, ArrayView6, ArrayViewMut6};
use serde::{Deserialize, Serialize};

/// Extents of a Stokes field: `(p, lat, lon, za, aa, stokes)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldShape {
    pub n_p: usize,
    pub n_lat: usize,
    pub n_lon: usize,
    pub n_za: usize,
    pub n_aa: usize,
    pub stokes_dim: usize,
}

impl FieldShape {
    /// Shape of a field covering every cloudbox position
    pub fn for_cloudbox(
        limits: &CloudboxLimits,
        n_za: usize,
        n_aa: usize,
        stokes_dim: usize,
    ) -> Self {
        Self {
            n_p: limits.n_p(),
            n_lat: limits.n_lat(),
            n_lon: limits.n_lon(),
            n_za,
            n_aa,
            stokes_dim,
        }
    }

    pub fn as_array(&self) -> [usize; 6] {
        [
            self.n_p,
            self.n_lat,
            self.n_lon,
            self.n_za,
            self.n_aa,
            self.stokes_dim,
        ]
    }
}

/// Index of one Stokes vector within a field (cloudbox-local spatial indices)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldIndex {
    pub p: usize,
    pub lat: usize,
    pub lon: usize,
    pub za: usize,
    pub aa: usize,
}

impl FieldIndex {
    pub fn new(position: CloudboxIndex, za: usize, aa: usize) -> Self {
        Self {
            p: position.p,
            lat: position.lat,
            lon: position.lon,
            za,
            aa,
        }
    }

    pub fn position(&self) -> CloudboxIndex {
        CloudboxIndex::new(self.p, self.lat, self.lon)
    }
}

/// Stokes vectors for every cloudbox position and direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StokesField {
    data: Array6<FloatValue>,
}

/// The radiation field solved for by the iteration
pub type RadiationField = StokesField;
/// Scattering source term, same layout as [`RadiationField`]
pub type ScatteringSourceField = StokesField;

impl StokesField {
    pub fn zeros(shape: FieldShape) -> Self {
        Self {
            data: Array6::zeros(shape.as_array()),
        }
    }

    pub fn from_elem(shape: FieldShape, value: FloatValue) -> Self {
        Self {
            data: Array6::from_elem(shape.as_array(), value),
        }
    }

    pub fn from_array(data: Array6<FloatValue>) -> Self {
        Self { data }
    }

    pub fn shape(&self) -> FieldShape {
        let s = self.data.shape();
        FieldShape {
            n_p: s[0],
            n_lat: s[1],
            n_lon: s[2],
            n_za: s[3],
            n_aa: s[4],
            stokes_dim: s[5],
        }
    }

    pub fn stokes_dim(&self) -> usize {
        self.shape().stokes_dim
    }

    pub fn data(&self) -> ArrayView6<FloatValue> {
        self.data.view()
    }

    pub fn data_mut(&mut self) -> ArrayViewMut6<FloatValue> {
        self.data.view_mut()
    }

    pub fn into_inner(self) -> Array6<FloatValue> {
        self.data
    }

    pub fn get(&self, index: FieldIndex, stokes: usize) -> FloatValue {
        self.data[[index.p, index.lat, index.lon, index.za, index.aa, stokes]]
    }

    pub fn stokes(&self, index: FieldIndex) -> StokesVector {
        StokesVector::from_fn(self.stokes_dim(), |i, _| self.get(index, i))
    }

    pub fn set_stokes(&mut self, index: FieldIndex, value: &StokesVector) {
        for (i, v) in value.iter().enumerate() {
            self.data[[index.p, index.lat, index.lon, index.za, index.aa, i]] = *v;
        }
    }

    /// Copy every Stokes vector of azimuth index `from` onto azimuth index `to` for one zenith
    /// angle
    pub fn copy_azimuth(&mut self, za: usize, from: usize, to: usize) {
        let source = self
            .data
            .slice(ndarray::s![.., .., .., za, from, ..])
            .to_owned();
        self.data
            .slice_mut(ndarray::s![.., .., .., za, to, ..])
            .assign(&source);
    }

    pub fn check_shape(&self, name: &str, expected: &FieldShape) -> DoitResult<()> {
        check_shape(name, self.data.shape(), &expected.as_array())
    }
}

/// Particle extinction matrices and absorption vectors at every cloudbox position for a
/// single propagation direction
#[derive(Debug, Clone, PartialEq)]
pub struct OpticalPropertyField {
    /// `(p, lat, lon, stokes, stokes)`
    pub ext_mat: Array5<FloatValue>,
    /// `(p, lat, lon, stokes)`
    pub abs_vec: Array4<FloatValue>,
}

impl OpticalPropertyField {
    pub fn zeros(limits: &CloudboxLimits, stokes_dim: usize) -> Self {
        let (n_p, n_lat, n_lon) = (limits.n_p(), limits.n_lat(), limits.n_lon());
        Self {
            ext_mat: Array5::zeros((n_p, n_lat, n_lon, stokes_dim, stokes_dim)),
            abs_vec: Array4::zeros((n_p, n_lat, n_lon, stokes_dim)),
        }
    }

    pub fn set(&mut self, position: CloudboxIndex, ext: &ExtinctionMatrix, abs: &StokesVector) {
        let CloudboxIndex { p, lat, lon } = position;
        for i in 0..abs.len() {
            self.abs_vec[[p, lat, lon, i]] = abs[i];
            for j in 0..abs.len() {
                self.ext_mat[[p, lat, lon, i, j]] = ext[(i, j)];
            }
        }
    }

    /// Check the spatial and Stokes extents against a radiation field shape
    pub fn check_shape(&self, expected: &FieldShape) -> DoitResult<()> {
        let s = expected.stokes_dim;
        check_shape(
            "ext_mat_field",
            self.ext_mat.shape(),
            &[expected.n_p, expected.n_lat, expected.n_lon, s, s],
        )?;
        check_shape(
            "abs_vec_field",
            self.abs_vec.shape(),
            &[expected.n_p, expected.n_lat, expected.n_lon, s],
        )
    }
}
