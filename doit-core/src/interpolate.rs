//! Grid positions and interpolation weights
//!
//! A [`GridPos`] locates a value inside a monotonic grid as the index of the grid point at or
//! below it plus the fractional distances to that point and the next one.
//! Multi-dimensional linear interpolation is expressed as a set of corner weights
//! ([`InterpWeights`]) that can be reused for every field sharing the same positions.
//!
//! Corners with a weight of exactly zero are dropped. A position sitting on a grid point
//! therefore never reads the neighbouring point, which makes single point grids
//! (the latitude and longitude grids of a 1D atmosphere) safe to interpolate over.

use crate::errors::{DoitError, DoitResult};
use crate::FloatValue;
use ndarray::{ArrayView1, ArrayViewD};
use serde::{Deserialize, Serialize};

/// Method used for interpolating quantities along the zenith angle dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpMethod {
    /// Linear interpolation between the two neighbouring grid points
    #[default]
    Linear,
    /// Cubic Lagrange polynomial over the four grid points surrounding the target
    Polynomial,
}

/// Position within a grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPos {
    /// Index of the grid point at or below the position
    pub idx: usize,
    /// Fractional distances to `idx` (`fd[0]`) and to `idx + 1` (`fd[1]`)
    pub fd: [FloatValue; 2],
}

impl GridPos {
    pub fn new(idx: usize, fd0: FloatValue) -> Self {
        Self {
            idx,
            fd: [fd0, 1.0 - fd0],
        }
    }

    /// Position exactly on grid point `idx`
    pub fn at_index(idx: usize) -> Self {
        Self::new(idx, 0.0)
    }

    /// Build a position from a fractional index into a grid of `n` points
    ///
    /// Values outside `[0, n - 1]` are clamped onto the grid.
    pub fn from_fractional(position: FloatValue, n: usize) -> Self {
        let last = n.saturating_sub(1);
        let position = num::clamp(position, 0.0, last as FloatValue);
        let idx = (position.floor() as usize).min(n.saturating_sub(2));
        Self::new(idx, position - idx as FloatValue)
    }

    /// Fractional index of the position (`idx + fd[0]`)
    pub fn fractional(&self) -> FloatValue {
        self.idx as FloatValue + self.fd[0]
    }

    /// Whether the position is exactly on grid point `i`
    pub fn is_at_index(&self, i: usize) -> bool {
        (self.idx == i && self.fd[0] == 0.0) || (i > 0 && self.idx == i - 1 && self.fd[1] == 0.0)
    }

    /// Move a position sitting on the last grid point `last` to the equivalent
    /// `(last - 1, fd = [1, 0])` form so that `idx + 1` stays a valid index
    pub fn upper_end_check(&mut self, last: usize) {
        if self.idx == last && last > 0 {
            self.idx = last - 1;
            self.fd = [1.0, 0.0];
        }
    }

    /// Express the position relative to a sub-grid starting at `offset` and ending at the
    /// (relative) index `last`
    ///
    /// Positions falling outside the sub-grid are clamped onto its nearest end.
    pub fn relative_to(&self, offset: usize, last: usize) -> Self {
        if self.idx < offset {
            return Self::at_index(0);
        }
        let idx = self.idx - offset;
        if idx >= last {
            let mut gp = Self::at_index(last);
            gp.upper_end_check(last);
            return gp;
        }
        Self { idx, fd: self.fd }
    }
}

/// Locate `x` inside a strictly monotonic (ascending or descending) grid
///
/// Points exactly on a grid node get `fd[0] == 0`, except for the last node which is
/// expressed as `(n - 2, fd = [1, 0])`.
/// Values outside the grid are an error, apart from round-off sized overshoots which are
/// moved onto the nearest end point.
pub fn gridpos(grid: ArrayView1<FloatValue>, x: FloatValue) -> DoitResult<GridPos> {
    let n = grid.len();
    if n == 0 {
        return Err(DoitError::InvalidGrid {
            name: "interpolation grid".to_string(),
            reason: "grid is empty".to_string(),
        });
    }

    let (lo, hi) = if grid[n - 1] >= grid[0] {
        (grid[0], grid[n - 1])
    } else {
        (grid[n - 1], grid[0])
    };
    let tolerance = ((hi - lo) * 1e-9).max(lo.abs().max(hi.abs()) * 1e-12);
    if x < lo - tolerance || x > hi + tolerance {
        return Err(DoitError::ExtrapolationNotAllowed(x, lo, hi));
    }
    if n == 1 {
        return Ok(GridPos::at_index(0));
    }

    let x = num::clamp(x, lo, hi);
    let ascending = grid[n - 1] >= grid[0];
    let mut i = 0;
    while i < n - 2 {
        let next = grid[i + 1];
        let beyond = if ascending { x >= next } else { x <= next };
        if !beyond {
            break;
        }
        i += 1;
    }

    let width = grid[i + 1] - grid[i];
    let fd0 = if width == 0.0 {
        0.0
    } else {
        num::clamp((x - grid[i]) / width, 0.0, 1.0)
    };
    Ok(GridPos::new(i, fd0))
}

/// Linear interpolation weights for a point in an n-dimensional grid
#[derive(Debug, Clone, PartialEq)]
pub struct InterpWeights {
    corners: Vec<(Vec<usize>, FloatValue)>,
}

impl InterpWeights {
    /// Weights for the point described by one grid position per dimension
    pub fn new(positions: &[GridPos]) -> Self {
        let mut corners = vec![(Vec::with_capacity(positions.len()), 1.0)];
        for gp in positions {
            let mut next = Vec::with_capacity(corners.len() * 2);
            for (index, weight) in corners {
                for (offset, fd) in [(0, gp.fd[1]), (1, gp.fd[0])] {
                    let w = weight * fd;
                    if w != 0.0 {
                        let mut corner = index.clone();
                        corner.push(gp.idx + offset);
                        next.push((corner, w));
                    }
                }
            }
            corners = next;
        }
        Self { corners }
    }

    /// Number of corners with a non-zero weight
    pub fn n_corners(&self) -> usize {
        self.corners.len()
    }

    pub fn total_weight(&self) -> FloatValue {
        self.corners.iter().map(|(_, w)| w).sum()
    }

    /// Interpolate `values`, which must have one dimension per grid position
    pub fn interp(&self, values: &ArrayViewD<FloatValue>) -> FloatValue {
        self.corners
            .iter()
            .map(|(index, w)| w * values[index.as_slice()])
            .sum()
    }
}

/// Linear interpolation of a 1D array
pub fn interp_linear(gp: &GridPos, values: ArrayView1<FloatValue>) -> FloatValue {
    let mut result = values[gp.idx] * gp.fd[1];
    if gp.fd[0] != 0.0 {
        result += values[gp.idx + 1] * gp.fd[0];
    }
    result
}

/// Pressure at a position in a pressure grid, interpolated linearly in `ln(p)`
pub fn interp_log_pressure(p_grid: ArrayView1<FloatValue>, gp: &GridPos) -> FloatValue {
    let mut log_p = p_grid[gp.idx].ln() * gp.fd[1];
    if gp.fd[0] != 0.0 {
        log_p += p_grid[gp.idx + 1].ln() * gp.fd[0];
    }
    log_p.exp()
}

/// Polynomial interpolation of `values` (defined on `grid`) at `x`
///
/// A cubic Lagrange polynomial is fitted through the four grid points around `gp`,
/// shifted inwards at the grid ends. Three point grids fall back to a quadratic.
pub fn interp_poly(
    grid: ArrayView1<FloatValue>,
    values: ArrayView1<FloatValue>,
    x: FloatValue,
    gp: &GridPos,
) -> DoitResult<FloatValue> {
    let n = grid.len();
    if n < 3 {
        return Err(DoitError::InvalidGrid {
            name: "polynomial interpolation grid".to_string(),
            reason: format!("at least 3 points are required, got {}", n),
        });
    }
    if values.len() != n {
        return Err(DoitError::ShapeMismatch {
            name: "polynomial interpolation values".to_string(),
            expected: vec![n],
            actual: vec![values.len()],
        });
    }

    let n_points = n.min(4);
    let start = gp.idx.saturating_sub(1).min(n - n_points);
    let window = start..start + n_points;

    let mut result = 0.0;
    for j in window.clone() {
        let basis: FloatValue = window
            .clone()
            .filter(|&m| m != j)
            .map(|m| (x - grid[m]) / (grid[j] - grid[m]))
            .product();
        result += basis * values[j];
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};

    #[test]
    fn test_gridpos_between_points() {
        let grid = array![0.0, 10.0, 20.0, 30.0];
        let gp = gridpos(grid.view(), 12.5).unwrap();
        assert_eq!(gp.idx, 1);
        assert_relative_eq!(gp.fd[0], 0.25);
        assert_relative_eq!(gp.fd[1], 0.75);
    }

    #[test]
    fn test_gridpos_on_nodes() {
        let grid = array![0.0, 10.0, 20.0, 30.0];

        let gp = gridpos(grid.view(), 10.0).unwrap();
        assert_eq!(gp, GridPos::at_index(1));

        let last = gridpos(grid.view(), 30.0).unwrap();
        assert_eq!(last.idx, 2);
        assert_eq!(last.fd, [1.0, 0.0]);
        assert!(last.is_at_index(3));
    }

    #[test]
    fn test_gridpos_descending_grid() {
        let p_grid = array![1000.0, 800.0, 600.0];
        let gp = gridpos(p_grid.view(), 700.0).unwrap();
        assert_eq!(gp.idx, 1);
        assert_relative_eq!(gp.fd[0], 0.5);
    }

    #[test]
    fn test_gridpos_rejects_extrapolation() {
        let grid = array![0.0, 1.0];
        let result = gridpos(grid.view(), 1.5);
        assert!(matches!(
            result,
            Err(DoitError::ExtrapolationNotAllowed(..))
        ));
    }

    #[test]
    fn test_gridpos_single_point_grid() {
        let grid = array![5.0];
        assert_eq!(gridpos(grid.view(), 5.0).unwrap(), GridPos::at_index(0));
        assert!(gridpos(grid.view(), 6.0).is_err());
    }

    #[test]
    fn test_is_at_index() {
        assert!(GridPos::at_index(3).is_at_index(3));
        assert!(GridPos::new(2, 1.0).is_at_index(3));
        assert!(!GridPos::new(2, 0.5).is_at_index(3));
        assert!(!GridPos::new(2, 0.5).is_at_index(2));
    }

    #[test]
    fn test_upper_end_check() {
        let mut gp = GridPos::at_index(7);
        gp.upper_end_check(7);
        assert_eq!(gp.idx, 6);
        assert_eq!(gp.fd, [1.0, 0.0]);

        let mut inside = GridPos::new(3, 0.2);
        inside.upper_end_check(7);
        assert_eq!(inside, GridPos::new(3, 0.2));
    }

    #[test]
    fn test_relative_to_cloudbox() {
        let gp = GridPos::new(5, 0.25);
        assert_eq!(gp.relative_to(3, 7), GridPos::new(2, 0.25));

        let top = GridPos::at_index(10).relative_to(3, 7);
        assert_eq!(top.idx, 6);
        assert_eq!(top.fd, [1.0, 0.0]);

        let below = GridPos::new(2, 1.0).relative_to(3, 7);
        assert_eq!(below, GridPos::at_index(0));
    }

    #[test]
    fn test_from_fractional() {
        let gp = GridPos::from_fractional(2.75, 5);
        assert_eq!(gp.idx, 2);
        assert_relative_eq!(gp.fd[0], 0.75);

        let end = GridPos::from_fractional(4.0, 5);
        assert_eq!(end.idx, 3);
        assert_relative_eq!(end.fd[0], 1.0);

        let single = GridPos::from_fractional(0.0, 1);
        assert_eq!(single, GridPos::at_index(0));
    }

    #[test]
    fn test_weights_drop_zero_corners() {
        let weights = InterpWeights::new(&[GridPos::at_index(2), GridPos::new(0, 0.5)]);
        assert_eq!(weights.n_corners(), 2);
        assert_relative_eq!(weights.total_weight(), 1.0);
    }

    #[test]
    fn test_bilinear_interpolation() {
        let values = Array2::from_shape_fn((3, 3), |(i, j)| (10 * i + j) as FloatValue);
        let weights = InterpWeights::new(&[GridPos::new(1, 0.5), GridPos::new(0, 0.25)]);
        let result = weights.interp(&values.view().into_dyn());
        assert_relative_eq!(result, 15.0 + 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_single_point_dimension_is_not_read_beyond() {
        let values = Array2::from_shape_fn((4, 1), |(i, _)| i as FloatValue);
        let weights = InterpWeights::new(&[GridPos::new(1, 0.5), GridPos::at_index(0)]);
        assert_relative_eq!(weights.interp(&values.view().into_dyn()), 1.5);
    }

    #[test]
    fn test_interp_log_pressure() {
        let p_grid = array![1000.0, 100.0];
        let p = interp_log_pressure(p_grid.view(), &GridPos::new(0, 0.5));
        assert_relative_eq!(p, (1000.0_f64 * 100.0).sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn test_interp_poly_reproduces_cubic() {
        let grid = array![0.0, 30.0, 60.0, 90.0, 120.0, 150.0, 180.0];
        let cubic = |x: FloatValue| 1.0 + 0.5 * x - 0.01 * x * x + 2e-5 * x * x * x;
        let values = grid.mapv(cubic);

        for x in [5.0, 44.0, 91.0, 170.0] {
            let gp = gridpos(grid.view(), x).unwrap();
            let result = interp_poly(grid.view(), values.view(), x, &gp).unwrap();
            assert_relative_eq!(result, cubic(x), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_interp_poly_quadratic_for_three_points() {
        let grid = array![0.0, 1.0, 2.0];
        let values = grid.mapv(|x| x * x);
        let gp = gridpos(grid.view(), 1.5).unwrap();
        let result = interp_poly(grid.view(), values.view(), 1.5, &gp).unwrap();
        assert_relative_eq!(result, 2.25, epsilon = 1e-12);
    }

    #[test]
    fn test_interp_poly_needs_three_points() {
        let grid = array![0.0, 1.0];
        let gp = GridPos::new(0, 0.5);
        assert!(interp_poly(grid.view(), grid.view(), 0.5, &gp).is_err());
    }
}
