//! Reduction of a fine zenith angle grid
//!
//! Starting from the two end points, the fine grid point with the largest interpolation
//! error is added until the field interpolated from the selected angles reproduces the field
//! on the fine grid to the requested relative accuracy.

use crate::errors::{DoitError, DoitResult};
use crate::field::RadiationField;
use crate::interpolate::{gridpos, interp_linear, interp_poly, InterpMethod};
use crate::FloatValue;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizedZenithGrid {
    /// Selected angles, ascending, always including both ends of the fine grid
    pub za_grid: Array1<FloatValue>,
    /// Field values at the selected angles, `(position, za)`
    pub field: Array2<FloatValue>,
}

/// Select a subset of `za_fine` that reproduces `field` within `accuracy` percent
///
/// `field` holds one row of values per spatial position on the fine grid. Interpolation
/// uses `method` once at least three angles are selected and is linear before that.
pub fn optimize_za_grid(
    za_fine: ArrayView1<FloatValue>,
    field: ArrayView2<FloatValue>,
    accuracy: FloatValue,
    method: InterpMethod,
) -> DoitResult<OptimizedZenithGrid> {
    let n_za = za_fine.len();
    if n_za < 2 || za_fine.windows(2).into_iter().any(|w| w[1] <= w[0]) {
        return Err(DoitError::InvalidGrid {
            name: "za_grid".to_string(),
            reason: "needs at least two strictly increasing angles".to_string(),
        });
    }
    if field.ncols() != n_za {
        return Err(DoitError::ShapeMismatch {
            name: "zenith angle field".to_string(),
            expected: vec![field.nrows(), n_za],
            actual: field.shape().to_vec(),
        });
    }
    if !(accuracy > 0.0) {
        return Err(DoitError::Error(format!(
            "accuracy must be a positive percentage, got {}",
            accuracy
        )));
    }

    let mut selected = vec![0, n_za - 1];
    while selected.len() < n_za {
        let za_selected: Array1<FloatValue> = selected.iter().map(|&i| za_fine[i]).collect();
        let use_poly = method == InterpMethod::Polynomial && selected.len() >= 3;

        let mut worst = (0.0, 0, 0.0);
        for row in field.rows() {
            let values: Array1<FloatValue> = selected.iter().map(|&i| row[i]).collect();
            for (k, &za) in za_fine.iter().enumerate() {
                let gp = gridpos(za_selected.view(), za)?;
                let interpolated = if use_poly {
                    interp_poly(za_selected.view(), values.view(), za, &gp)?
                } else {
                    interp_linear(&gp, values.view())
                };
                let deviation = (interpolated - row[k]).abs();
                if deviation > worst.0 {
                    worst = (deviation, k, row[k]);
                }
            }
        }

        let (deviation, index, true_value) = worst;
        if deviation == 0.0 {
            break;
        }
        let relative = deviation / true_value.abs() * 100.0;
        debug!(
            n_selected = selected.len(),
            za = za_fine[index],
            relative_deviation = relative,
            "Zenith grid optimization step"
        );
        if relative <= accuracy {
            break;
        }
        match selected.binary_search(&index) {
            Err(position) => selected.insert(position, index),
            Ok(_) => break,
        }
    }

    let za_grid = selected.iter().map(|&i| za_fine[i]).collect();
    let mut reduced = Array2::zeros((field.nrows(), selected.len()));
    for (column, &i) in selected.iter().enumerate() {
        reduced.column_mut(column).assign(&field.column(i));
    }
    Ok(OptimizedZenithGrid {
        za_grid,
        field: reduced,
    })
}

/// Optimise the zenith grid for the first Stokes component of a radiation field
///
/// Uses every pressure level at the first latitude, longitude and azimuth.
pub fn optimize_za_grid_from_field(
    za_fine: ArrayView1<FloatValue>,
    field: &RadiationField,
    accuracy: FloatValue,
    method: InterpMethod,
) -> DoitResult<OptimizedZenithGrid> {
    let shape = field.shape();
    if shape.n_za != za_fine.len() {
        return Err(DoitError::ShapeMismatch {
            name: "radiation field zenith angles".to_string(),
            expected: vec![za_fine.len()],
            actual: vec![shape.n_za],
        });
    }
    let data = field.data();
    optimize_za_grid(za_fine, data.slice(s![.., 0, 0, .., 0, 0]), accuracy, method)
}
