//! Radiative transfer step and blackbody radiation
//!
//! The extinction matrix `K`, absorption vector `a` and scattering source `S` are assumed
//! constant over a step of length `l`. The solution of
//! $$ \frac{dI}{ds} = -K I + a B + S $$
//! over the step is
//! $$ I \leftarrow T I + (1 - T) K^{-1} (a B + S), \quad T = e^{-K l} $$
//! which reduces to a per-component expression for scalar and diagonal extinction.

use crate::FloatValue;
use nalgebra::{DMatrix, DVector};

pub type StokesVector = DVector<FloatValue>;
pub type ExtinctionMatrix = DMatrix<FloatValue>;

/// Planck constant (J s)
pub const PLANCK_CONSTANT: FloatValue = 6.62606896e-34;
/// Speed of light in vacuum (m / s)
pub const SPEED_OF_LIGHT: FloatValue = 2.99792458e8;
/// Boltzmann constant (J / K)
pub const BOLTZMANN_CONSTANT: FloatValue = 1.3806504e-23;

/// Blackbody radiance (W / (m^2 Hz sr)) at frequency `f` (Hz) and temperature `t` (K)
///
/// $$ B = \frac{2 h f^3}{c^2} \frac{1}{e^{h f / k T} - 1} $$
pub fn planck(f: FloatValue, t: FloatValue) -> FloatValue {
    let a = 2.0 * PLANCK_CONSTANT * f.powi(3) / SPEED_OF_LIGHT.powi(2);
    let b = PLANCK_CONSTANT * f / (BOLTZMANN_CONSTANT * t);
    a / b.exp_m1()
}

/// Whether all elements of the matrix are exactly zero
pub fn is_zero_matrix(ext: &ExtinctionMatrix) -> bool {
    ext.iter().all(|&v| v == 0.0)
}

/// Whether the matrix has no off-diagonal elements
pub fn is_diagonal(ext: &ExtinctionMatrix) -> bool {
    ext.iter()
        .enumerate()
        .all(|(k, &v)| v == 0.0 || k % ext.nrows() == k / ext.nrows())
}

/// Whether an extinction matrix cannot be used in [`rte_step`]
///
/// The all-zero matrix is accepted as the transparent limit.
pub fn is_singular(ext: &ExtinctionMatrix) -> bool {
    if is_zero_matrix(ext) {
        return false;
    }
    if is_diagonal(ext) {
        return ext.diagonal().iter().any(|&v| v == 0.0);
    }
    !ext.clone().lu().is_invertible()
}

/// Propagate `stokes` over a homogeneous step of length `l_step`
///
/// `abs_vec` multiplies the blackbody radiance `planck_value`; `sca_vec` is the scattering
/// source. Only the first absorption component emits in the scalar and diagonal branches.
/// Components with zero extinction take the transparent limit `I + (a B + S) l`.
/// The matrix must not be singular (see [`is_singular`]).
pub fn rte_step(
    stokes: &mut StokesVector,
    ext: &ExtinctionMatrix,
    abs_vec: &StokesVector,
    sca_vec: &StokesVector,
    l_step: FloatValue,
    planck_value: FloatValue,
) {
    let stokes_dim = stokes.len();

    if is_diagonal(ext) {
        for i in 0..stokes_dim {
            let emission = if i == 0 { abs_vec[0] * planck_value } else { 0.0 };
            let source = emission + sca_vec[i];
            let k = ext[(i, i)];
            if k == 0.0 {
                stokes[i] += source * l_step;
            } else {
                let transmission = (-k * l_step).exp();
                stokes[i] = stokes[i] * transmission + source / k * (1.0 - transmission);
            }
        }
        return;
    }

    let source = abs_vec * planck_value + sca_vec;
    let transmission = (ext * -l_step).exp();
    let equilibrium = ext.clone().lu().solve(&source);
    let identity = ExtinctionMatrix::identity(stokes_dim, stokes_dim);
    match equilibrium {
        Some(equilibrium) => {
            *stokes = &transmission * &*stokes + (identity - &transmission) * equilibrium;
        }
        None => {
            // singular matrices are rejected by the caller
            *stokes = &transmission * &*stokes;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_planck_rayleigh_jeans_limit() {
        let (f, t) = (1e9, 300.0);
        let rayleigh_jeans = 2.0 * f * f * BOLTZMANN_CONSTANT * t / SPEED_OF_LIGHT.powi(2);
        assert_relative_eq!(planck(f, t), rayleigh_jeans, max_relative = 1e-3);
    }

    #[test]
    fn test_planck_increases_with_temperature() {
        assert!(planck(1e11, 260.0) > planck(1e11, 250.0));
    }

    #[test]
    fn test_scalar_step_closed_form() {
        let (k, a, l, b) = (0.01, 0.005, 250.0, planck(1e11, 250.0));
        let incoming = 3e-16;
        let mut stokes = StokesVector::from_element(1, incoming);
        rte_step(
            &mut stokes,
            &ExtinctionMatrix::from_element(1, 1, k),
            &StokesVector::from_element(1, a),
            &StokesVector::zeros(1),
            l,
            b,
        );
        let expected = incoming * (-k * l).exp() + a * b / k * (1.0 - (-k * l).exp());
        assert_relative_eq!(stokes[0], expected, max_relative = 1e-12);
    }

    #[test]
    fn test_zero_extinction_is_identity_without_sources() {
        let mut stokes = StokesVector::from_vec(vec![1.0, 0.2, -0.1, 0.05]);
        let before = stokes.clone();
        rte_step(
            &mut stokes,
            &ExtinctionMatrix::zeros(4, 4),
            &StokesVector::zeros(4),
            &StokesVector::zeros(4),
            1e4,
            planck(1e11, 250.0),
        );
        assert_eq!(stokes, before);
    }

    #[test]
    fn test_zero_extinction_accumulates_source() {
        let mut stokes = StokesVector::from_element(1, 1.0);
        rte_step(
            &mut stokes,
            &ExtinctionMatrix::zeros(1, 1),
            &StokesVector::zeros(1),
            &StokesVector::from_element(1, 0.5),
            4.0,
            0.0,
        );
        assert_relative_eq!(stokes[0], 3.0);
    }

    #[test]
    fn test_general_matrix_matches_diagonal_branch() {
        let diagonal = ExtinctionMatrix::from_diagonal(&StokesVector::from_vec(vec![0.02, 0.01]));
        let abs_vec = StokesVector::from_vec(vec![0.01, 0.0]);
        let sca_vec = StokesVector::from_vec(vec![1e-18, 2e-19]);
        let b = planck(1e11, 260.0);

        let mut expected = StokesVector::from_vec(vec![5e-16, 1e-17]);
        rte_step(&mut expected, &diagonal, &abs_vec, &sca_vec, 80.0, b);

        // a vanishing off-diagonal element forces the matrix exponential branch
        let mut general = diagonal.clone();
        general[(0, 1)] = 1e-300;
        assert!(!is_diagonal(&general));
        let mut stokes = StokesVector::from_vec(vec![5e-16, 1e-17]);
        rte_step(&mut stokes, &general, &abs_vec, &sca_vec, 80.0, b);

        assert_relative_eq!(stokes[0], expected[0], max_relative = 1e-9);
        assert_relative_eq!(stokes[1], expected[1], max_relative = 1e-9);
    }

    #[test]
    fn test_general_matrix_reaches_equilibrium() {
        let mut ext = ExtinctionMatrix::from_diagonal_element(2, 2, 0.1);
        ext[(0, 1)] = 0.02;
        ext[(1, 0)] = 0.02;
        let abs_vec = StokesVector::from_vec(vec![0.1, 0.02]);
        let mut stokes = StokesVector::zeros(2);
        rte_step(&mut stokes, &ext, &abs_vec, &StokesVector::zeros(2), 1e4, 2.0);

        let equilibrium = ext.lu().solve(&(abs_vec * 2.0)).unwrap();
        assert_relative_eq!(stokes[0], equilibrium[0], max_relative = 1e-9);
        assert_relative_eq!(stokes[1], equilibrium[1], max_relative = 1e-9);
    }

    #[test]
    fn test_singularity_detection() {
        assert!(!is_singular(&ExtinctionMatrix::zeros(2, 2)));
        assert!(!is_singular(&ExtinctionMatrix::identity(2, 2)));
        assert!(is_singular(&ExtinctionMatrix::from_diagonal(
            &StokesVector::from_vec(vec![0.1, 0.0])
        )));
        assert!(is_singular(&ExtinctionMatrix::from_element(2, 2, 0.5)));
    }
}
