//! Gas absorption agendas
//!
//! Absorption is modelled per species as a coefficient per unit volume mixing ratio that
//! scales linearly with pressure. This is enough to exercise the clear-sky part of the
//! radiative transfer step without line-by-line spectroscopy.

use doit_core::agenda::{GasAbsorptionAgenda, GasOpticalPropertiesAgenda};
use doit_core::errors::{DoitError, DoitResult};
use doit_core::rte::{ExtinctionMatrix, StokesVector};
use doit_core::FloatValue;
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

/// Pressure broadened absorption per species
///
/// `absorption_i = coefficients[i][f] * vmr_i * pressure / reference_pressure`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesAbsorption {
    /// Absorption coefficient (1/m) per species and frequency at the reference pressure
    /// and a VMR of one
    pub coefficients: Vec<Vec<FloatValue>>,
    /// Pressure (Pa) at which `coefficients` apply
    pub reference_pressure: FloatValue,
}

#[typetag::serde]
impl GasAbsorptionAgenda for SpeciesAbsorption {
    fn execute(
        &self,
        f_index: usize,
        pressure: FloatValue,
        _temperature: FloatValue,
        vmr: &[FloatValue],
    ) -> DoitResult<Array1<FloatValue>> {
        if vmr.len() != self.coefficients.len() {
            return Err(DoitError::ShapeMismatch {
                name: "species absorption vmr".to_string(),
                expected: vec![self.coefficients.len()],
                actual: vec![vmr.len()],
            });
        }
        let scale = pressure / self.reference_pressure;
        self.coefficients
            .iter()
            .zip(vmr)
            .map(|(per_frequency, vmr)| {
                per_frequency
                    .get(f_index)
                    .map(|coefficient| coefficient * vmr * scale)
                    .ok_or_else(|| {
                        DoitError::Error(format!(
                            "no absorption coefficient for frequency index {}",
                            f_index
                        ))
                    })
            })
            .collect()
    }
}

/// Unpolarised gas optical properties
///
/// The extinction matrix is the total absorption times the identity and only the first
/// absorption vector component is non-zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScalarGasOpticalProperties {
    /// Absorption (1/m) added on top of the species absorption
    #[serde(default)]
    pub continuum: FloatValue,
}

#[typetag::serde]
impl GasOpticalPropertiesAgenda for ScalarGasOpticalProperties {
    fn execute(
        &self,
        _f_index: usize,
        absorption: ArrayView1<FloatValue>,
        stokes_dim: usize,
    ) -> DoitResult<(ExtinctionMatrix, StokesVector)> {
        let total = absorption.sum() + self.continuum;
        let mut abs = StokesVector::zeros(stokes_dim);
        abs[0] = total;
        Ok((
            ExtinctionMatrix::from_diagonal_element(stokes_dim, stokes_dim, total),
            abs,
        ))
    }
}
