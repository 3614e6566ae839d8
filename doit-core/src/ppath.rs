//! Propagation path steps
//!
//! A [`PpathStep`] is the part of a propagation path between a cloudbox grid point and the
//! first crossing of a grid cell boundary (or the surface). Steps are created with a single
//! start point by [`PpathStep::start_1d`] / [`PpathStep::start_3d`] and completed by a
//! [`PpathStepAgenda`](crate::agenda::PpathStepAgenda).

use crate::atmosphere::AtmosphericState;
use crate::cloudbox::AtmosphereDim;
use crate::interpolate::GridPos;
use crate::FloatValue;
use serde::{Deserialize, Serialize};

/// What lies behind the end of a path step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Background {
    /// The step ends on an atmospheric grid cell boundary
    Atmosphere,
    /// The step ends on the surface
    Surface,
}

/// A point along a propagation path
#[derive(Debug, Clone, PartialEq)]
pub struct PpathPoint {
    /// Radius (m), latitude and longitude (degrees)
    pub pos: [FloatValue; 3],
    /// Geometric altitude (m)
    pub z: FloatValue,
    /// Line of sight: zenith and azimuth angle (degrees)
    pub los: [FloatValue; 2],
    pub gp_p: GridPos,
    pub gp_lat: Option<GridPos>,
    pub gp_lon: Option<GridPos>,
}

impl PpathPoint {
    pub fn za(&self) -> FloatValue {
        self.los[0]
    }

    pub fn aa(&self) -> FloatValue {
        self.los[1]
    }

    pub fn gp_lat_or_origin(&self) -> GridPos {
        self.gp_lat.unwrap_or(GridPos::at_index(0))
    }

    pub fn gp_lon_or_origin(&self) -> GridPos {
        self.gp_lon.unwrap_or(GridPos::at_index(0))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PpathStep {
    pub dim: AtmosphereDim,
    pub points: Vec<PpathPoint>,
    /// `l_step[i]` is the length (m) of the segment between points `i` and `i + 1`
    pub l_step: Vec<FloatValue>,
    pub background: Background,
}

impl PpathStep {
    /// One-point path at pressure level `p_index` of a 1D atmosphere
    pub fn start_1d(atmosphere: &AtmosphericState, p_index: usize, za: FloatValue) -> Self {
        let z = atmosphere.z_field[[p_index, 0, 0]];
        let point = PpathPoint {
            pos: [atmosphere.r_geoid[[0, 0]] + z, 0.0, 0.0],
            z,
            los: [za, 0.0],
            gp_p: GridPos::at_index(p_index),
            gp_lat: None,
            gp_lon: None,
        };
        Self {
            dim: AtmosphereDim::OneD,
            points: vec![point],
            l_step: vec![],
            background: Background::Atmosphere,
        }
    }

    /// One-point path at grid point `(p, lat, lon)` of a 3D atmosphere
    pub fn start_3d(
        atmosphere: &AtmosphericState,
        p: usize,
        lat: usize,
        lon: usize,
        los: [FloatValue; 2],
    ) -> Self {
        let z = atmosphere.z_field[[p, lat, lon]];
        let point = PpathPoint {
            pos: [
                atmosphere.r_geoid[[lat, lon]] + z,
                atmosphere.lat_grid[lat],
                atmosphere.lon_grid[lon],
            ],
            z,
            los,
            gp_p: GridPos::at_index(p),
            gp_lat: Some(GridPos::at_index(lat)),
            gp_lon: Some(GridPos::at_index(lon)),
        };
        Self {
            dim: AtmosphereDim::ThreeD,
            points: vec![point],
            l_step: vec![],
            background: Background::Atmosphere,
        }
    }

    /// Number of points
    pub fn np(&self) -> usize {
        self.points.len()
    }

    pub fn first(&self) -> &PpathPoint {
        &self.points[0]
    }

    /// The far end of the step
    pub fn last(&self) -> &PpathPoint {
        &self.points[self.points.len() - 1]
    }

    /// Append a point at distance `l` from the current last point
    pub fn push(&mut self, point: PpathPoint, l: FloatValue) {
        self.points.push(point);
        self.l_step.push(l);
    }

    pub fn length(&self) -> FloatValue {
        self.l_step.iter().sum()
    }
}
