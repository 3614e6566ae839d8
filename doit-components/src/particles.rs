//! Particle optical property agendas

use doit_core::agenda::{ParticlePropertiesAgenda, ParticleSumAgenda, SingleScatteringProperties};
use doit_core::cloudbox::CloudboxIndex;
use doit_core::errors::{DoitError, DoitResult};
use doit_core::rte::{ExtinctionMatrix, StokesVector};
use doit_core::FloatValue;
use ndarray::{s, Array4};
use serde::{Deserialize, Serialize};

/// Direction and temperature independent properties per particle type
///
/// Extinction is diagonal and absorption only affects the first Stokes component, as for
/// randomly oriented spherical particles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniformParticles {
    /// Extinction cross section per type and frequency
    pub extinction: Vec<Vec<FloatValue>>,
    /// Absorption cross section per type and frequency
    pub absorption: Vec<Vec<FloatValue>>,
}

impl UniformParticles {
    fn value(table: &[Vec<FloatValue>], kind: &str, t: usize, f_index: usize) -> DoitResult<FloatValue> {
        table
            .get(t)
            .and_then(|per_frequency| per_frequency.get(f_index))
            .copied()
            .ok_or_else(|| {
                DoitError::Error(format!(
                    "no particle {} for type {} at frequency index {}",
                    kind, t, f_index
                ))
            })
    }
}

#[typetag::serde]
impl ParticlePropertiesAgenda for UniformParticles {
    fn execute(
        &self,
        _position: CloudboxIndex,
        _temperature: FloatValue,
        f_index: usize,
        _za_index: usize,
        _aa_index: usize,
        stokes_dim: usize,
    ) -> DoitResult<SingleScatteringProperties> {
        if self.extinction.len() != self.absorption.len() {
            return Err(DoitError::ShapeMismatch {
                name: "particle absorption types".to_string(),
                expected: vec![self.extinction.len()],
                actual: vec![self.absorption.len()],
            });
        }
        let n_types = self.extinction.len();
        let mut properties = SingleScatteringProperties::zeros(n_types, stokes_dim);
        for t in 0..n_types {
            let ext = Self::value(&self.extinction, "extinction", t, f_index)?;
            for i in 0..stokes_dim {
                properties.ext_mat[[t, i, i]] = ext;
            }
            properties.abs_vec[[t, 0]] = Self::value(&self.absorption, "absorption", t, f_index)?;
        }
        Ok(properties)
    }
}

/// Bulk properties as the sum over particle types weighted by their number density
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberDensityWeightedSum {
    /// Particle number density `(type, p, lat, lon)` over the cloudbox
    pub pnd_field: Array4<FloatValue>,
}

#[typetag::serde]
impl ParticleSumAgenda for NumberDensityWeightedSum {
    fn execute(
        &self,
        properties: &SingleScatteringProperties,
        position: CloudboxIndex,
    ) -> DoitResult<(ExtinctionMatrix, StokesVector)> {
        let n_types = properties.n_types();
        let shape = self.pnd_field.shape();
        if shape[0] != n_types
            || position.p >= shape[1]
            || position.lat >= shape[2]
            || position.lon >= shape[3]
        {
            return Err(DoitError::ShapeMismatch {
                name: "pnd_field".to_string(),
                expected: vec![n_types, position.p + 1, position.lat + 1, position.lon + 1],
                actual: shape.to_vec(),
            });
        }

        let stokes_dim = properties.abs_vec.ncols();
        let pnd = self
            .pnd_field
            .slice(s![.., position.p, position.lat, position.lon]);
        let mut ext = ExtinctionMatrix::zeros(stokes_dim, stokes_dim);
        let mut abs = StokesVector::zeros(stokes_dim);
        for (t, &density) in pnd.iter().enumerate() {
            for i in 0..stokes_dim {
                abs[i] += density * properties.abs_vec[[t, i]];
                for j in 0..stokes_dim {
                    ext[(i, j)] += density * properties.ext_mat[[t, i, j]];
                }
            }
        }
        Ok((ext, abs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn particles() -> UniformParticles {
        UniformParticles {
            extinction: vec![vec![1e-6, 2e-6], vec![4e-6, 8e-6]],
            absorption: vec![vec![5e-7, 1e-6], vec![1e-6, 2e-6]],
        }
    }

    #[test]
    fn test_uniform_particles() {
        let properties = particles()
            .execute(CloudboxIndex::new(0, 0, 0), 250.0, 1, 0, 0, 2)
            .unwrap();
        assert_eq!(properties.n_types(), 2);
        assert_eq!(properties.ext_mat[[1, 1, 1]], 8e-6);
        assert_eq!(properties.ext_mat[[1, 0, 1]], 0.0);
        assert_eq!(properties.abs_vec[[0, 0]], 1e-6);
        assert_eq!(properties.abs_vec[[0, 1]], 0.0);

        assert!(particles()
            .execute(CloudboxIndex::new(0, 0, 0), 250.0, 2, 0, 0, 1)
            .is_err());
    }

    #[test]
    fn test_weighted_sum() {
        let properties = particles()
            .execute(CloudboxIndex::new(0, 0, 0), 250.0, 0, 0, 0, 1)
            .unwrap();
        let mut pnd_field = Array4::zeros((2, 3, 1, 1));
        pnd_field[[0, 1, 0, 0]] = 1000.0;
        pnd_field[[1, 1, 0, 0]] = 500.0;
        let sum = NumberDensityWeightedSum { pnd_field };

        let (ext, abs) = sum.execute(&properties, CloudboxIndex::new(1, 0, 0)).unwrap();
        assert_relative_eq!(ext[(0, 0)], 1000.0 * 1e-6 + 500.0 * 4e-6);
        assert_relative_eq!(abs[0], 1000.0 * 5e-7 + 500.0 * 1e-6);

        let (ext, _) = sum.execute(&properties, CloudboxIndex::new(0, 0, 0)).unwrap();
        assert_eq!(ext[(0, 0)], 0.0);

        assert!(matches!(
            sum.execute(&properties, CloudboxIndex::new(3, 0, 0)),
            Err(DoitError::ShapeMismatch { .. })
        ));
    }
}
