//! Monochromatic DOIT solves over a configured cloudbox
//!
//! [`DoitSolver`] owns everything a solve needs: options, agendas, atmosphere, cloudbox
//! limits and the angular grids of the radiation field. It checks their consistency once and
//! builds a [`SweepContext`] per frequency.

use crate::agenda::Agendas;
use crate::atmosphere::AtmosphericState;
use crate::cloudbox::{AtmosphereDim, CloudboxLimits};
use crate::config::DoitConfig;
use crate::context::SweepContext;
use crate::errors::{DoitError, DoitResult};
use crate::field::{FieldShape, RadiationField};
use crate::iteration::{IterationDriver, IterationOutcome};
use crate::rte::planck;
use crate::FloatValue;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Serialize, Deserialize)]
pub struct DoitSolver {
    pub config: DoitConfig,
    pub agendas: Agendas,
    pub atmosphere: AtmosphericState,
    pub limits: CloudboxLimits,
    /// Zenith angle grid (degrees), strictly increasing from 0 to 180
    pub za_grid: Array1<FloatValue>,
    /// Azimuth angle grid (degrees), a single point for 1D atmospheres
    pub aa_grid: Array1<FloatValue>,
}

impl DoitSolver {
    pub fn new(
        config: DoitConfig,
        agendas: Agendas,
        atmosphere: AtmosphericState,
        limits: CloudboxLimits,
        za_grid: Array1<FloatValue>,
        aa_grid: Array1<FloatValue>,
    ) -> DoitResult<Self> {
        let solver = Self {
            config,
            agendas,
            atmosphere,
            limits,
            za_grid,
            aa_grid,
        };
        solver.validate()?;
        Ok(solver)
    }

    /// Read a complete solver setup from TOML
    pub fn from_toml_str(text: &str) -> DoitResult<Self> {
        let solver: Self = toml::from_str(text)?;
        solver.validate()?;
        Ok(solver)
    }

    pub fn to_toml_string(&self) -> DoitResult<String> {
        Ok(toml::to_string(self)?)
    }

    pub fn validate(&self) -> DoitResult<()> {
        self.atmosphere.validate()?;
        let dim = self.atmosphere.dim;
        self.config.validate(Some(dim))?;

        if self.limits.dim() != dim {
            return Err(DoitError::InvalidCloudboxLimits {
                limits: self.limits.as_slice().to_vec(),
                reason: format!("limits do not match a {:?} atmosphere", dim),
            });
        }
        self.limits.check_within(
            self.atmosphere.n_p(),
            self.atmosphere.n_lat(),
            self.atmosphere.n_lon(),
        )?;

        let za = &self.za_grid;
        if za.len() < 2 || za.windows(2).into_iter().any(|w| w[1] <= w[0]) {
            return Err(invalid_grid("za_grid", "must be strictly increasing"));
        }
        if za[0] != 0.0 || za[za.len() - 1] != 180.0 {
            return Err(invalid_grid("za_grid", "must start at 0 and end at 180 degrees"));
        }

        let aa = &self.aa_grid;
        if aa.is_empty() || aa.windows(2).into_iter().any(|w| w[1] <= w[0]) {
            return Err(invalid_grid("aa_grid", "must be non-empty and strictly increasing"));
        }
        if dim == AtmosphereDim::OneD && aa.len() != 1 {
            return Err(invalid_grid(
                "aa_grid",
                "1D atmospheres use a single azimuth angle",
            ));
        }
        Ok(())
    }

    /// Shape of the radiation field of every solve
    pub fn field_shape(&self) -> FieldShape {
        FieldShape::for_cloudbox(
            &self.limits,
            self.za_grid.len(),
            self.aa_grid.len(),
            self.config.stokes_dim,
        )
    }

    pub fn context(&self, f_index: usize) -> DoitResult<SweepContext<'_>> {
        let n_f = self.atmosphere.f_grid.len();
        if f_index >= n_f {
            return Err(DoitError::Error(format!(
                "frequency index {} is outside a grid of {} frequencies",
                f_index, n_f
            )));
        }
        Ok(SweepContext {
            atmosphere: &self.atmosphere,
            limits: &self.limits,
            za_grid: self.za_grid.view(),
            aa_grid: self.aa_grid.view(),
            f_index,
            agendas: &self.agendas,
            config: &self.config,
        })
    }

    /// Unpolarised blackbody radiation at the local temperature, for every direction
    ///
    /// A common first guess for the iteration.
    pub fn blackbody_field(&self, f_index: usize) -> DoitResult<RadiationField> {
        let ctx = self.context(f_index)?;
        let frequency = ctx.frequency();
        let mut field = RadiationField::zeros(self.field_shape());
        for position in self.limits.positions() {
            let (p, lat, lon) = self.limits.to_global(position);
            let b = planck(frequency, self.atmosphere.t_field[[p, lat, lon]]);
            field
                .data_mut()
                .slice_mut(ndarray::s![position.p, position.lat, position.lon, .., .., 0])
                .fill(b);
        }
        Ok(field)
    }

    /// Run the DOIT iteration for frequency `f_index` starting from `initial`
    pub fn solve(&self, f_index: usize, initial: RadiationField) -> DoitResult<IterationOutcome> {
        let ctx = self.context(f_index)?;
        info!(
            f_index,
            frequency = ctx.frequency(),
            dim = ?self.atmosphere.dim,
            "Starting DOIT solve"
        );
        IterationDriver::new(ctx)?.run(initial)
    }

    /// Solve every frequency of the atmosphere, each starting from its blackbody field
    pub fn solve_all(&self) -> DoitResult<Vec<IterationOutcome>> {
        (0..self.atmosphere.f_grid.len())
            .map(|f_index| self.solve(f_index, self.blackbody_field(f_index)?))
            .collect()
    }
}

fn invalid_grid(name: &str, reason: &str) -> DoitError {
    DoitError::InvalidGrid {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iteration::IterationStatus;
    use crate::config::UpdateScheme;
    use crate::test_utils::{one_d_setup, one_d_setup_with_limits, MaxAbsDifference, TestSetup};
    use is_close::is_close;
    use ndarray::array;

    fn solver(setup: TestSetup) -> DoitResult<DoitSolver> {
        DoitSolver::new(
            setup.config,
            setup.agendas,
            setup.atmosphere,
            setup.limits,
            setup.za_grid,
            setup.aa_grid,
        )
    }

    #[test]
    fn test_solve_from_blackbody() {
        let mut setup = one_d_setup(0.01, 0.01);
        setup.agendas.convergence = Box::new(MaxAbsDifference { epsilon: 1e-20 });
        let solver = solver(setup).unwrap();
        let initial = solver.blackbody_field(0).unwrap();
        assert!(is_close!(initial.data()[[0, 0, 0, 0, 0, 0]], planck(1e11, 250.0)));

        // an isothermal purely absorbing cloud is already in equilibrium
        let outcome = solver.solve(0, initial).unwrap();
        assert_eq!(outcome.status, IterationStatus::Converged);
        assert_eq!(outcome.iterations, 1);
    }

    #[test]
    fn test_plane_parallel_solve_on_surface_fails() {
        let mut setup = one_d_setup_with_limits(0, 4, 0.01, 0.005);
        setup.config.update_scheme = UpdateScheme::PlaneParallel;
        let solver = solver(setup).unwrap();
        let initial = solver.blackbody_field(0).unwrap();
        assert!(matches!(
            solver.solve(0, initial),
            Err(DoitError::SurfaceReflectionUnsupported { p_index: 0, .. })
        ));
    }

    #[test]
    fn test_frequency_index_is_checked() {
        let solver = solver(one_d_setup(0.01, 0.01)).unwrap();
        assert!(matches!(solver.context(1), Err(DoitError::Error(_))));
    }

    #[test]
    fn test_zenith_grid_must_cover_hemispheres() {
        let mut setup = one_d_setup(0.01, 0.01);
        setup.za_grid = array![0.0, 90.0, 170.0];
        assert!(matches!(solver(setup), Err(DoitError::InvalidGrid { .. })));
    }

    #[test]
    fn test_limits_must_fit_atmosphere() {
        let mut setup = one_d_setup(0.01, 0.01);
        setup.limits = CloudboxLimits::one_d(3, 12).unwrap();
        assert!(matches!(
            solver(setup),
            Err(DoitError::InvalidCloudboxLimits { .. })
        ));
    }

    #[test]
    fn test_one_d_uses_single_azimuth() {
        let mut setup = one_d_setup(0.01, 0.01);
        setup.aa_grid = array![0.0, 180.0];
        assert!(matches!(solver(setup), Err(DoitError::InvalidGrid { .. })));
    }
}
