use doit_core::agenda::PpathStepAgenda;
use doit_core::atmosphere::AtmosphericState;
use doit_core::errors::{DoitError, DoitResult};
use doit_core::interpolate::{gridpos, GridPos, InterpWeights};
use doit_core::ppath::{Background, PpathPoint, PpathStep};
use doit_core::{FloatValue, DEG2RAD, RAD2DEG};
use nalgebra::Vector3;
use ndarray::{s, Array1};
use serde::{Deserialize, Serialize};
use tracing::trace;

const BISECTION_ITERATIONS: usize = 60;
/// Fractional grid distance below which an end position is snapped onto the grid point
const SNAP_TOLERANCE: FloatValue = 1e-6;

fn default_march_step() -> FloatValue {
    100.0
}

fn default_max_length() -> FloatValue {
    1e7
}

/// Straight line path steps through a 3D atmosphere
///
/// The ray is followed in Cartesian coordinates in steps of `march_step` until it leaves the
/// grid cell it entered. The crossing is then located by bisection and the end position
/// snapped onto the crossed grid surface. `march_step` must be smaller than the thinnest
/// grid cell along the ray. Rays that would travel further than `max_length`
/// without leaving their cell, or that leave the atmosphere immediately, produce no step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometricPpath3D {
    /// Marching distance (m) used to detect a cell crossing
    #[serde(default = "default_march_step")]
    pub march_step: FloatValue,
    #[serde(default = "default_max_length")]
    pub max_length: FloatValue,
}

impl Default for GeometricPpath3D {
    fn default() -> Self {
        Self {
            march_step: default_march_step(),
            max_length: default_max_length(),
        }
    }
}

/// Position of a point relative to the atmospheric grids
#[derive(Debug, Clone, Copy)]
struct Located {
    /// Fractional indices into the pressure, latitude and longitude grids
    fractional: [FloatValue; 3],
    r: FloatValue,
    lat: FloatValue,
    lon: FloatValue,
    z: FloatValue,
    z_surface: FloatValue,
}

fn to_cartesian(r: FloatValue, lat: FloatValue, lon: FloatValue) -> Vector3<FloatValue> {
    let (lat, lon) = (lat * DEG2RAD, lon * DEG2RAD);
    Vector3::new(
        r * lat.cos() * lon.cos(),
        r * lat.cos() * lon.sin(),
        r * lat.sin(),
    )
}

/// Local east, north and up unit vectors
fn local_frame(lat: FloatValue, lon: FloatValue) -> [Vector3<FloatValue>; 3] {
    let (lat, lon) = (lat * DEG2RAD, lon * DEG2RAD);
    [
        Vector3::new(-lon.sin(), lon.cos(), 0.0),
        Vector3::new(-lat.sin() * lon.cos(), -lat.sin() * lon.sin(), lat.cos()),
        Vector3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()),
    ]
}

/// Unit direction of line of sight `[za, aa]` at `(lat, lon)`; azimuth counts from north
/// towards east
fn los_to_direction(lat: FloatValue, lon: FloatValue, los: [FloatValue; 2]) -> Vector3<FloatValue> {
    let [east, north, up] = local_frame(lat, lon);
    let (za, aa) = (los[0] * DEG2RAD, los[1] * DEG2RAD);
    east * (za.sin() * aa.sin()) + north * (za.sin() * aa.cos()) + up * za.cos()
}

fn direction_to_los(lat: FloatValue, lon: FloatValue, direction: &Vector3<FloatValue>) -> [FloatValue; 2] {
    let [east, north, up] = local_frame(lat, lon);
    let za = direction.dot(&up).clamp(-1.0, 1.0).acos() * RAD2DEG;
    let aa = direction.dot(&east).atan2(direction.dot(&north)) * RAD2DEG;
    [za, aa]
}

fn locate(atmosphere: &AtmosphericState, point: &Vector3<FloatValue>) -> Option<Located> {
    let r = point.norm();
    let lat = (point.z / r).clamp(-1.0, 1.0).asin() * RAD2DEG;
    let lon = point.y.atan2(point.x) * RAD2DEG;

    let gp_lat = gridpos(atmosphere.lat_grid.view(), lat).ok()?;
    let gp_lon = gridpos(atmosphere.lon_grid.view(), lon).ok()?;
    let horizontal = InterpWeights::new(&[gp_lat, gp_lon]);

    let r_geoid = horizontal.interp(&atmosphere.r_geoid.view().into_dyn());
    let z_surface = horizontal.interp(&atmosphere.z_surface.view().into_dyn());
    let z_column: Array1<FloatValue> = (0..atmosphere.n_p())
        .map(|p| horizontal.interp(&atmosphere.z_field.slice(s![p, .., ..]).into_dyn()))
        .collect();
    let z = r - r_geoid;
    let gp_p = gridpos(z_column.view(), z).ok()?;

    Some(Located {
        fractional: [gp_p.fractional(), gp_lat.fractional(), gp_lon.fractional()],
        r,
        lat,
        lon,
        z,
        z_surface,
    })
}

/// Grid cell `[p, lat, lon]` (lower corner indices) a point belongs to
fn cell_of(located: &Located, sizes: [usize; 3]) -> [usize; 3] {
    let mut cell = [0; 3];
    for dimension in 0..3 {
        let max = sizes[dimension].saturating_sub(2);
        cell[dimension] = (located.fractional[dimension].floor().max(0.0) as usize).min(max);
    }
    cell
}

/// Rays running along a grid surface must not leave their cell through round-off
const CELL_TOLERANCE: FloatValue = 1e-9;

fn in_cell(located: &Located, cell: [usize; 3], sizes: [usize; 3]) -> bool {
    (0..3).all(|dimension| {
        let f = located.fractional[dimension];
        let lower = cell[dimension] as FloatValue;
        sizes[dimension] < 2
            || (f >= lower - CELL_TOLERANCE && f <= lower + 1.0 + CELL_TOLERANCE)
    }) && located.z >= located.z_surface
}

fn snapped(fractional: FloatValue, n: usize) -> GridPos {
    let nearest = fractional.round();
    if (fractional - nearest).abs() < SNAP_TOLERANCE {
        let mut gp = GridPos::at_index(nearest.max(0.0) as usize);
        gp.upper_end_check(n.saturating_sub(1));
        gp
    } else {
        GridPos::from_fractional(fractional, n)
    }
}

#[typetag::serde]
impl PpathStepAgenda for GeometricPpath3D {
    fn execute(&self, atmosphere: &AtmosphericState, start: PpathStep) -> DoitResult<PpathStep> {
        if !(self.march_step > 0.0) {
            return Err(DoitError::InvalidConfig(format!(
                "march_step must be positive, got {}",
                self.march_step
            )));
        }
        let mut ppath = start;
        let first = ppath.first().clone();
        let [r0, lat0, lon0] = first.pos;
        let origin = to_cartesian(r0, lat0, lon0);
        let direction = los_to_direction(lat0, lon0, first.los);
        let sizes = [atmosphere.n_p(), atmosphere.n_lat(), atmosphere.n_lon()];
        let at = |l: FloatValue| locate(atmosphere, &(origin + direction * l));

        // far enough along the ray that round-off cannot put it in the wrong cell
        let probe = 0.1 * self.march_step;
        let cell = match at(probe) {
            Some(entered) if entered.z >= entered.z_surface => cell_of(&entered, sizes),
            Some(_) => {
                ppath.background = Background::Surface;
                return Ok(ppath);
            }
            None => return Ok(ppath),
        };
        let inside = |l: FloatValue| at(l).map_or(false, |loc| in_cell(&loc, cell, sizes));

        let mut l_inside = probe;
        let mut l_outside = None;
        while l_inside < self.max_length {
            let next = l_inside + self.march_step;
            if inside(next) {
                l_inside = next;
            } else {
                l_outside = Some(next);
                break;
            }
        }
        let mut l_outside = match l_outside {
            Some(l) => l,
            None => return Ok(ppath),
        };
        for _ in 0..BISECTION_ITERATIONS {
            let middle = 0.5 * (l_inside + l_outside);
            if inside(middle) {
                l_inside = middle;
            } else {
                l_outside = middle;
            }
        }

        let end = at(l_inside).ok_or_else(|| {
            DoitError::Error("path step end point left the atmosphere".to_string())
        })?;
        let background = if end.z - end.z_surface < SNAP_TOLERANCE * self.march_step {
            Background::Surface
        } else {
            Background::Atmosphere
        };
        let point = PpathPoint {
            pos: [end.r, end.lat, end.lon],
            z: end.z,
            los: direction_to_los(end.lat, end.lon, &direction),
            gp_p: snapped(end.fractional[0], sizes[0]),
            gp_lat: Some(snapped(end.fractional[1], sizes[1])),
            gp_lon: Some(snapped(end.fractional[2], sizes[2])),
        };
        ppath.push(point, l_inside);
        ppath.background = background;
        trace!(
            length = l_inside,
            end = ?end.fractional,
            background = ?background,
            "3D geometric path step"
        );
        Ok(ppath)
    }
}
