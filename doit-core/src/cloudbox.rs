//! Cloudbox geometry
//!
//! The cloudbox is the box of the atmospheric grid, given by inclusive index limits per
//! spatial dimension, inside which the radiation field is solved with scattering.
//! Positions inside the cloudbox use local indices relative to the lower limits.

use crate::errors::{DoitError, DoitResult};
use crate::interpolate::GridPos;
use crate::FloatValue;
use serde::{Deserialize, Serialize};

/// Dimensionality of the atmosphere
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtmosphereDim {
    /// Spherically symmetric atmosphere, described along pressure only
    OneD,
    /// Pressure, latitude and longitude
    ThreeD,
}

impl AtmosphereDim {
    pub fn n_dims(&self) -> usize {
        match self {
            AtmosphereDim::OneD => 1,
            AtmosphereDim::ThreeD => 3,
        }
    }
}

/// Position inside the cloudbox in local indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CloudboxIndex {
    pub p: usize,
    pub lat: usize,
    pub lon: usize,
}

impl CloudboxIndex {
    pub fn new(p: usize, lat: usize, lon: usize) -> Self {
        Self { p, lat, lon }
    }
}

/// One of the `2 * dim` faces of the cloudbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudboxFace {
    PressureLower,
    PressureUpper,
    LatitudeLower,
    LatitudeUpper,
    LongitudeLower,
    LongitudeUpper,
}

impl CloudboxFace {
    /// Faces in the order they are tested by [`CloudboxLimits::classify`]
    pub const ALL: [CloudboxFace; 6] = [
        CloudboxFace::PressureLower,
        CloudboxFace::PressureUpper,
        CloudboxFace::LatitudeLower,
        CloudboxFace::LatitudeUpper,
        CloudboxFace::LongitudeLower,
        CloudboxFace::LongitudeUpper,
    ];

    /// Border code (0 to 5)
    pub fn index(&self) -> usize {
        match self {
            CloudboxFace::PressureLower => 0,
            CloudboxFace::PressureUpper => 1,
            CloudboxFace::LatitudeLower => 2,
            CloudboxFace::LatitudeUpper => 3,
            CloudboxFace::LongitudeLower => 4,
            CloudboxFace::LongitudeUpper => 5,
        }
    }

    /// Spatial dimension normal to the face (0 = pressure, 1 = latitude, 2 = longitude)
    pub fn dimension(&self) -> usize {
        self.index() / 2
    }

    pub fn is_upper(&self) -> bool {
        self.index() % 2 == 1
    }
}

/// Where a grid position lies relative to the cloudbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudboxLocation {
    Face(CloudboxFace),
    Interior,
}

/// Inclusive index limits of the cloudbox
///
/// Stored as `[p_lower, p_upper]` for 1D atmospheres and
/// `[p_lower, p_upper, lat_lower, lat_upper, lon_lower, lon_upper]` for 3D.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct CloudboxLimits {
    limits: Vec<usize>,
}

impl CloudboxLimits {
    pub fn new(limits: Vec<usize>) -> DoitResult<Self> {
        if limits.len() != 2 && limits.len() != 6 {
            return Err(DoitError::InvalidCloudboxLimits {
                limits,
                reason: "expected 2 (1D) or 6 (3D) limits".to_string(),
            });
        }
        if limits.chunks(2).any(|pair| pair[0] > pair[1]) {
            return Err(DoitError::InvalidCloudboxLimits {
                limits,
                reason: "lower limits must not exceed upper limits".to_string(),
            });
        }
        Ok(Self { limits })
    }

    pub fn one_d(p_lower: usize, p_upper: usize) -> DoitResult<Self> {
        Self::new(vec![p_lower, p_upper])
    }

    pub fn three_d(
        p: (usize, usize),
        lat: (usize, usize),
        lon: (usize, usize),
    ) -> DoitResult<Self> {
        Self::new(vec![p.0, p.1, lat.0, lat.1, lon.0, lon.1])
    }

    pub fn dim(&self) -> AtmosphereDim {
        if self.limits.len() == 2 {
            AtmosphereDim::OneD
        } else {
            AtmosphereDim::ThreeD
        }
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.limits
    }

    /// Inclusive limits along spatial dimension `dimension`
    ///
    /// Latitude and longitude limits of a 1D cloudbox are `(0, 0)`.
    pub fn range(&self, dimension: usize) -> (usize, usize) {
        match self.limits.get(2 * dimension..2 * dimension + 2) {
            Some(pair) => (pair[0], pair[1]),
            None => (0, 0),
        }
    }

    pub fn p_range(&self) -> (usize, usize) {
        self.range(0)
    }

    pub fn lat_range(&self) -> (usize, usize) {
        self.range(1)
    }

    pub fn lon_range(&self) -> (usize, usize) {
        self.range(2)
    }

    pub fn n_p(&self) -> usize {
        let (lo, hi) = self.p_range();
        hi - lo + 1
    }

    pub fn n_lat(&self) -> usize {
        let (lo, hi) = self.lat_range();
        hi - lo + 1
    }

    pub fn n_lon(&self) -> usize {
        let (lo, hi) = self.lon_range();
        hi - lo + 1
    }

    /// Check that the limits fit inside grids of the given lengths
    pub fn check_within(&self, n_p: usize, n_lat: usize, n_lon: usize) -> DoitResult<()> {
        let sizes = [n_p, n_lat, n_lon];
        for dimension in 0..self.dim().n_dims() {
            let (_, hi) = self.range(dimension);
            if hi >= sizes[dimension] {
                return Err(DoitError::InvalidCloudboxLimits {
                    limits: self.limits.clone(),
                    reason: format!(
                        "upper limit {} of dimension {} is outside a grid of {} points",
                        hi, dimension, sizes[dimension]
                    ),
                });
            }
        }
        Ok(())
    }

    /// Convert a local cloudbox index to indices of the full atmospheric grids
    pub fn to_global(&self, index: CloudboxIndex) -> (usize, usize, usize) {
        (
            index.p + self.p_range().0,
            index.lat + self.lat_range().0,
            index.lon + self.lon_range().0,
        )
    }

    /// Every cloudbox position, pressure outermost
    pub fn positions(&self) -> impl Iterator<Item = CloudboxIndex> {
        let (n_p, n_lat, n_lon) = (self.n_p(), self.n_lat(), self.n_lon());
        (0..n_p).flat_map(move |p| {
            (0..n_lat).flat_map(move |lat| (0..n_lon).map(move |lon| CloudboxIndex::new(p, lat, lon)))
        })
    }

    /// Whether the end of a 1D path step lies in the cloudbox
    ///
    /// A position counts as inside when `lower <= idx < upper`, or when it sits on the
    /// upper limit with a fractional offset below `tolerance`.
    pub fn is_inside_1d(&self, gp_p: &GridPos, tolerance: FloatValue) -> bool {
        let (lo, hi) = self.p_range();
        (lo <= gp_p.idx && hi > gp_p.idx) || (hi == gp_p.idx && gp_p.fd[0].abs() < tolerance)
    }

    /// Whether a 3D position lies in the cloudbox, boundaries included
    ///
    /// Fractional positions may exceed the upper limits by `tolerance`.
    pub fn is_inside(
        &self,
        gp_p: &GridPos,
        gp_lat: &GridPos,
        gp_lon: &GridPos,
        tolerance: FloatValue,
    ) -> bool {
        [gp_p, gp_lat, gp_lon]
            .iter()
            .enumerate()
            .take(self.dim().n_dims())
            .all(|(dimension, gp)| {
                let (lo, hi) = self.range(dimension);
                let f = gp.fractional();
                f >= lo as FloatValue && f <= hi as FloatValue + tolerance
            })
    }

    /// Classify a grid position as lying on a cloudbox face, in its interior or outside
    ///
    /// Faces are tested in the order of [`CloudboxFace::ALL`]. A position is on a face when it
    /// is exactly on the limiting index of that face and within the limits along the other
    /// dimensions. Positions neither on a face nor inside are an error.
    pub fn classify(
        &self,
        gp_p: &GridPos,
        gp_lat: Option<&GridPos>,
        gp_lon: Option<&GridPos>,
    ) -> DoitResult<CloudboxLocation> {
        let origin = GridPos::at_index(0);
        let positions = [
            *gp_p,
            gp_lat.copied().unwrap_or(origin),
            gp_lon.copied().unwrap_or(origin),
        ];
        let n_dims = self.dim().n_dims();
        let within = |dimension: usize| {
            let (lo, hi) = self.range(dimension);
            let f = positions[dimension].fractional();
            f >= lo as FloatValue && f <= hi as FloatValue
        };

        for face in CloudboxFace::ALL.iter().take(2 * n_dims) {
            let dimension = face.dimension();
            let (lo, hi) = self.range(dimension);
            let limit = if face.is_upper() { hi } else { lo };
            let others_within = (0..n_dims).filter(|&d| d != dimension).all(within);
            if positions[dimension].is_at_index(limit) && others_within {
                return Ok(CloudboxLocation::Face(*face));
            }
        }

        if (0..n_dims).all(within) {
            Ok(CloudboxLocation::Interior)
        } else {
            Err(DoitError::OutsideCloudbox {
                gp_p: positions[0].fractional(),
                gp_lat: positions[1].fractional(),
                gp_lon: positions[2].fractional(),
            })
        }
    }
}

impl TryFrom<Vec<usize>> for CloudboxLimits {
    type Error = DoitError;

    fn try_from(limits: Vec<usize>) -> Result<Self, Self::Error> {
        Self::new(limits)
    }
}

impl From<CloudboxLimits> for Vec<usize> {
    fn from(value: CloudboxLimits) -> Self {
        value.limits
    }
}
