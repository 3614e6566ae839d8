//! Convergence tests

use doit_core::agenda::ConvergenceTest;
use doit_core::errors::{DoitError, DoitResult};
use doit_core::field::RadiationField;
use doit_core::FloatValue;
use ndarray::{Axis, Zip};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Converged when the absolute change of every Stokes component stays below its limit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbsoluteConvergence {
    /// Limit per Stokes component, in radiance units
    pub epsilon: Vec<FloatValue>,
}

#[typetag::serde]
impl ConvergenceTest for AbsoluteConvergence {
    fn execute(&self, new: &RadiationField, previous: &RadiationField) -> DoitResult<bool> {
        let shape = new.shape();
        previous.check_shape("previous radiation field", &shape)?;
        if self.epsilon.len() < shape.stokes_dim {
            return Err(DoitError::InvalidConfig(format!(
                "convergence needs {} epsilon values, got {}",
                shape.stokes_dim,
                self.epsilon.len()
            )));
        }

        let new = new.data();
        let previous = previous.data();
        for (i, &epsilon) in self.epsilon.iter().take(shape.stokes_dim).enumerate() {
            let mut max_change: FloatValue = 0.0;
            Zip::from(new.index_axis(Axis(5), i))
                .and(previous.index_axis(Axis(5), i))
                .for_each(|a, b| max_change = max_change.max((a - b).abs()));
            debug!(stokes = i, max_change, epsilon, "Convergence check");
            if !(max_change < epsilon) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doit_core::field::FieldShape;

    fn shape() -> FieldShape {
        FieldShape {
            n_p: 3,
            n_lat: 1,
            n_lon: 1,
            n_za: 4,
            n_aa: 1,
            stokes_dim: 2,
        }
    }

    #[test]
    fn test_per_component_limits() {
        let test = AbsoluteConvergence {
            epsilon: vec![1e-3, 1e-6],
        };
        let previous = RadiationField::zeros(shape());
        let mut new = RadiationField::zeros(shape());
        new.data_mut()[[1, 0, 0, 2, 0, 0]] = 5e-4;
        assert!(test.execute(&new, &previous).unwrap());

        new.data_mut()[[2, 0, 0, 0, 0, 1]] = -5e-4;
        assert!(!test.execute(&new, &previous).unwrap());
    }

    #[test]
    fn test_missing_epsilon() {
        let test = AbsoluteConvergence { epsilon: vec![1e-3] };
        let field = RadiationField::zeros(shape());
        assert!(matches!(
            test.execute(&field, &field),
            Err(DoitError::InvalidConfig(_))
        ));
    }
}
