use doit_core::agenda::PpathStepAgenda;
use doit_core::atmosphere::AtmosphericState;
use doit_core::errors::DoitResult;
use doit_core::interpolate::{gridpos, GridPos};
use doit_core::ppath::{Background, PpathPoint, PpathStep};
use doit_core::{FloatValue, DEG2RAD, RAD2DEG};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Straight geometric path steps in a spherically symmetric atmosphere
///
/// A step starting at a pressure level ends on the level above (zenith angles up to 90
/// degrees), the level below, or back on the start level after passing a tangent point
/// inside the layer below. A step reaching the surface altitude ends there with a
/// [`Background::Surface`] background.
///
/// Positions along the ray are parametrised by the signed distance `s` from the tangent
/// point, which gives `r = sqrt(s^2 + c^2)` and `cos(za) = s / r` with the path constant
/// `c = r sin(za)`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeometricPpath1D {
    /// Longest allowed distance (m) between two path points
    #[serde(default)]
    pub lmax: Option<FloatValue>,
}

/// Where a 1D step ends
struct StepEnd {
    s: FloatValue,
    gp_p: GridPos,
    background: Background,
    tangent: bool,
}

impl GeometricPpath1D {
    fn find_end(
        atmosphere: &AtmosphericState,
        p: usize,
        s0: FloatValue,
        c: FloatValue,
    ) -> Option<StepEnd> {
        let r_geoid = atmosphere.r_geoid[[0, 0]];
        let z = atmosphere.z_column(0, 0);

        if s0 >= 0.0 {
            if p + 1 >= atmosphere.n_p() {
                return None;
            }
            let r = r_geoid + z[p + 1];
            return Some(StepEnd {
                s: (r * r - c * c).max(0.0).sqrt(),
                gp_p: GridPos::at_index(p + 1),
                background: Background::Atmosphere,
                tangent: false,
            });
        }

        let z_surface = atmosphere.z_surface[[0, 0]];
        if p == 0 || z[p] <= z_surface {
            return None;
        }
        let (floor, gp_p, background) = if z[p - 1] <= z_surface {
            let fd0 = (z_surface - z[p - 1]) / (z[p] - z[p - 1]);
            (z_surface, GridPos::new(p - 1, fd0), Background::Surface)
        } else {
            (z[p - 1], GridPos::at_index(p - 1), Background::Atmosphere)
        };
        let r_floor = r_geoid + floor;
        if c < r_floor {
            Some(StepEnd {
                s: -(r_floor * r_floor - c * c).sqrt(),
                gp_p,
                background,
                tangent: false,
            })
        } else {
            Some(StepEnd {
                s: -s0,
                gp_p: GridPos::at_index(p),
                background: Background::Atmosphere,
                tangent: true,
            })
        }
    }

    /// Distances along the ray of every point after the start
    fn path_points(&self, s0: FloatValue, end: &StepEnd) -> Vec<FloatValue> {
        let legs: Vec<(FloatValue, FloatValue)> = if end.tangent {
            vec![(s0, 0.0), (0.0, end.s)]
        } else {
            vec![(s0, end.s)]
        };
        let mut points = Vec::new();
        for (from, to) in legs {
            let n = match self.lmax {
                Some(lmax) if lmax > 0.0 => ((to - from).abs() / lmax).ceil().max(1.0) as usize,
                _ => 1,
            };
            for k in 1..=n {
                points.push(from + (to - from) * k as FloatValue / n as FloatValue);
            }
        }
        points
    }
}

#[typetag::serde]
impl PpathStepAgenda for GeometricPpath1D {
    fn execute(&self, atmosphere: &AtmosphericState, start: PpathStep) -> DoitResult<PpathStep> {
        let mut ppath = start;
        let first = ppath.first().clone();
        let p = first.gp_p.idx;
        let r_geoid = atmosphere.r_geoid[[0, 0]];
        let r0 = first.pos[0];
        let za0 = first.za() * DEG2RAD;
        let c = r0 * za0.sin();
        let s0 = r0 * za0.cos();

        let end = match Self::find_end(atmosphere, p, s0, c) {
            Some(end) => end,
            None => {
                if s0 < 0.0 {
                    ppath.background = Background::Surface;
                }
                return Ok(ppath);
            }
        };

        let angle0 = s0.atan2(c);
        let points = self.path_points(s0, &end);
        let n_points = points.len();
        let mut previous = s0;
        for (k, s) in points.into_iter().enumerate() {
            let r = (s * s + c * c).sqrt();
            let z = r - r_geoid;
            let is_end = k + 1 == n_points;
            let gp_p = if is_end {
                end.gp_p
            } else {
                gridpos(atmosphere.z_column(0, 0), z)?
            };
            let za = if r > 0.0 {
                (s / r).clamp(-1.0, 1.0).acos() * RAD2DEG
            } else {
                first.za()
            };
            let point = PpathPoint {
                pos: [r, first.pos[1] + (s.atan2(c) - angle0) * RAD2DEG, first.pos[2]],
                z,
                los: [za, first.aa()],
                gp_p,
                gp_lat: None,
                gp_lon: None,
            };
            ppath.push(point, (s - previous).abs());
            previous = s;
        }
        ppath.background = end.background;
        trace!(
            p,
            za = first.za(),
            np = ppath.np(),
            length = ppath.length(),
            background = ?ppath.background,
            "1D geometric path step"
        );
        Ok(ppath)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array1, Array2};

    fn atmosphere() -> AtmosphericState {
        AtmosphericState::one_d(
            Array1::from_shape_fn(6, |i| 1e5 * 0.8_f64.powi(i as i32)),
            Array1::from_shape_fn(6, |i| 1000.0 * i as FloatValue),
            Array1::from_elem(6, 260.0),
            Array2::zeros((0, 6)),
            6.4e6,
            0.0,
            array![1e11],
        )
        .unwrap()
    }

    #[test]
    fn test_vertical_steps() {
        let atmosphere = atmosphere();
        let agenda = GeometricPpath1D::default();

        let up = agenda
            .execute(&atmosphere, PpathStep::start_1d(&atmosphere, 2, 0.0))
            .unwrap();
        assert_eq!(up.np(), 2);
        assert_relative_eq!(up.length(), 1000.0, max_relative = 1e-9);
        assert_eq!(up.last().gp_p, GridPos::at_index(3));
        assert_eq!(up.background, Background::Atmosphere);

        let down = agenda
            .execute(&atmosphere, PpathStep::start_1d(&atmosphere, 1, 180.0))
            .unwrap();
        assert_relative_eq!(down.length(), 1000.0, max_relative = 1e-9);
        assert_eq!(down.last().gp_p, GridPos::at_index(0));
        assert_eq!(down.background, Background::Surface);
        assert_relative_eq!(down.last().za(), 180.0, max_relative = 1e-12);
    }

    #[test]
    fn test_slant_step_length_and_angle() {
        let atmosphere = atmosphere();
        let ppath = GeometricPpath1D::default()
            .execute(&atmosphere, PpathStep::start_1d(&atmosphere, 2, 60.0))
            .unwrap();
        let (r0, r1) = (6.4e6 + 2000.0, 6.4e6 + 3000.0);
        let c = r0 * (60.0 * DEG2RAD).sin();
        let expected = (r1 * r1 - c * c).sqrt() - (r0 * r0 - c * c).sqrt();
        assert_relative_eq!(ppath.length(), expected, max_relative = 1e-9);
        // the zenith angle decreases along an upward path
        let za_end = ppath.last().za();
        assert!(za_end < 60.0);
        assert_relative_eq!(r1 * (za_end * DEG2RAD).sin(), c, max_relative = 1e-9);
    }

    #[test]
    fn test_tangent_point_inside_layer() {
        let atmosphere = atmosphere();
        let ppath = GeometricPpath1D::default()
            .execute(&atmosphere, PpathStep::start_1d(&atmosphere, 3, 91.0))
            .unwrap();
        assert_eq!(ppath.np(), 3);
        assert_eq!(ppath.last().gp_p, GridPos::at_index(3));
        assert_relative_eq!(ppath.points[1].za(), 90.0, epsilon = 1e-9);
        assert_relative_eq!(ppath.last().za(), 89.0, max_relative = 1e-9);
        assert_relative_eq!(ppath.l_step[0], ppath.l_step[1], max_relative = 1e-9);
    }

    #[test]
    fn test_lmax_splits_step() {
        let atmosphere = atmosphere();
        let agenda = GeometricPpath1D { lmax: Some(300.0) };
        let ppath = agenda
            .execute(&atmosphere, PpathStep::start_1d(&atmosphere, 1, 0.0))
            .unwrap();
        assert_eq!(ppath.np(), 5);
        assert!(ppath.l_step.iter().all(|&l| l <= 300.0));
        assert_relative_eq!(ppath.points[2].gp_p.fractional(), 1.5, max_relative = 1e-6);
    }

    #[test]
    fn test_top_and_surface_starts_do_not_move() {
        let atmosphere = atmosphere();
        let agenda = GeometricPpath1D::default();
        let top = agenda
            .execute(&atmosphere, PpathStep::start_1d(&atmosphere, 5, 10.0))
            .unwrap();
        assert_eq!(top.np(), 1);
        assert_eq!(top.background, Background::Atmosphere);

        let ground = agenda
            .execute(&atmosphere, PpathStep::start_1d(&atmosphere, 0, 120.0))
            .unwrap();
        assert_eq!(ground.np(), 1);
        assert_eq!(ground.background, Background::Surface);
    }
}
