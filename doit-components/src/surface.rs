//! Surface agendas

use doit_core::agenda::{SurfaceProperties, SurfacePropertiesAgenda};
use doit_core::atmosphere::AtmosphericState;
use doit_core::errors::{DoitError, DoitResult};
use doit_core::ppath::PpathPoint;
use doit_core::rte::planck;
use doit_core::FloatValue;
use ndarray::{Array2, Array4};
use serde::{Deserialize, Serialize};

/// Flat specular reflector with a frequency independent reflectivity
///
/// Emits `(1 - r) B(f, T_skin)` and reflects the radiation arriving from the mirrored
/// direction `180 - za` with the matrix `r I`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecularSurface {
    pub reflectivity: FloatValue,
    /// Surface skin temperature (K)
    pub skin_temperature: FloatValue,
}

#[typetag::serde]
impl SurfacePropertiesAgenda for SpecularSurface {
    fn execute(
        &self,
        atmosphere: &AtmosphericState,
        point: &PpathPoint,
        stokes_dim: usize,
    ) -> DoitResult<SurfaceProperties> {
        if !(0.0..=1.0).contains(&self.reflectivity) {
            return Err(DoitError::InvalidConfig(format!(
                "surface reflectivity must be within [0, 1], got {}",
                self.reflectivity
            )));
        }
        let n_f = atmosphere.f_grid.len();
        let mut emission = Array2::zeros((n_f, stokes_dim));
        let mut rmatrix = Array4::zeros((1, n_f, stokes_dim, stokes_dim));
        for (f, &frequency) in atmosphere.f_grid.iter().enumerate() {
            emission[[f, 0]] = (1.0 - self.reflectivity) * planck(frequency, self.skin_temperature);
            for i in 0..stokes_dim {
                rmatrix[[0, f, i, i]] = self.reflectivity;
            }
        }
        Ok(SurfaceProperties {
            emission,
            los: vec![[180.0 - point.za(), point.aa()]],
            rmatrix,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use doit_core::ppath::PpathStep;
    use ndarray::array;

    #[test]
    fn test_specular_surface() {
        let atmosphere = AtmosphericState::one_d(
            array![1e5, 9e4],
            array![0.0, 800.0],
            array![280.0, 275.0],
            Array2::zeros((0, 2)),
            6.371e6,
            0.0,
            array![1e10, 1e11],
        )
        .unwrap();
        let point = PpathStep::start_1d(&atmosphere, 0, 140.0).first().clone();
        let surface = SpecularSurface {
            reflectivity: 0.25,
            skin_temperature: 290.0,
        };
        let properties = surface.execute(&atmosphere, &point, 2).unwrap();
        properties.check_shape(2, 2).unwrap();

        assert_eq!(properties.los, vec![[40.0, 0.0]]);
        assert_relative_eq!(properties.emission[[1, 0]], 0.75 * planck(1e11, 290.0));
        assert_eq!(properties.emission[[1, 1]], 0.0);
        assert_eq!(properties.rmatrix[[0, 0, 1, 1]], 0.25);
        assert_eq!(properties.rmatrix[[0, 0, 0, 1]], 0.0);
    }
}
