//! Fixed-point iteration of the radiation field
//!
//! The driver alternates field sweeps and scattering source updates until the convergence
//! test accepts the new field or `max_iterations` sweeps have been performed:
//!
//! ```text
//! Initializing -> Sweeping -> SourceUpdating -> ConvergenceCheck -> Sweeping
//!                                                                -> Converged
//!                                                                -> Aborted
//! ```
//!
//! Reaching the iteration cap is not an error. The returned [`IterationOutcome`] carries the
//! last field together with an [`IterationStatus::Aborted`] status.

use crate::context::SweepContext;
use crate::errors::DoitResult;
use crate::field::{RadiationField, ScatteringSourceField};
use crate::update::{updater_for, FieldUpdater};
use crate::FloatValue;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationState {
    Initializing,
    Sweeping,
    SourceUpdating,
    ConvergenceCheck,
    Converged,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationStatus {
    Converged,
    Aborted,
}

#[derive(Debug, Clone)]
pub struct IterationOutcome {
    pub field: RadiationField,
    pub scattering_source: ScatteringSourceField,
    pub status: IterationStatus,
    /// Number of sweeps performed
    pub iterations: usize,
}

impl IterationOutcome {
    pub fn converged(&self) -> bool {
        self.status == IterationStatus::Converged
    }
}

#[derive(Debug)]
pub struct IterationDriver<'a> {
    ctx: SweepContext<'a>,
    updater: Box<dyn FieldUpdater>,
    state: IterationState,
}

impl<'a> IterationDriver<'a> {
    /// Driver using the update scheme selected by the configuration
    pub fn new(ctx: SweepContext<'a>) -> DoitResult<Self> {
        ctx.config.validate(Some(ctx.dim()))?;
        let updater = updater_for(ctx.config, ctx.dim());
        Ok(Self {
            ctx,
            updater,
            state: IterationState::Initializing,
        })
    }

    /// Replace the update scheme
    pub fn with_updater(mut self, updater: Box<dyn FieldUpdater>) -> Self {
        self.updater = updater;
        self
    }

    pub fn state(&self) -> IterationState {
        self.state
    }

    fn transition(&mut self, next: IterationState) {
        debug!(from = ?self.state, to = ?next, "Iteration state transition");
        self.state = next;
    }

    fn scattering_source(&self, field: &RadiationField) -> DoitResult<ScatteringSourceField> {
        let source = self
            .ctx
            .agendas
            .scattering_source
            .execute(&self.ctx, field)?;
        source.check_shape("scattering source field", &self.ctx.field_shape())?;
        Ok(source)
    }

    /// Iterate from `initial` until convergence or the iteration cap
    pub fn run(&mut self, initial: RadiationField) -> DoitResult<IterationOutcome> {
        self.state = IterationState::Initializing;
        debug!(
            updater = self.updater.name(),
            f_index = self.ctx.f_index,
            "Initializing DOIT iteration"
        );
        initial.check_shape("initial radiation field", &self.ctx.field_shape())?;
        let mut field = initial;
        let mut source = self.scattering_source(&field)?;
        let max_iterations = self.ctx.config.max_iterations;
        let mut iterations = 0;

        loop {
            if iterations >= max_iterations {
                self.transition(IterationState::Aborted);
                warn!(
                    iterations,
                    f_index = self.ctx.f_index,
                    "DOIT iteration did not converge"
                );
                return Ok(IterationOutcome {
                    field,
                    scattering_source: source,
                    status: IterationStatus::Aborted,
                    iterations,
                });
            }

            self.transition(IterationState::Sweeping);
            let previous = field.clone();
            self.updater.sweep(&self.ctx, &mut field, &source)?;
            iterations += 1;

            self.transition(IterationState::SourceUpdating);
            source = self.scattering_source(&field)?;

            self.transition(IterationState::ConvergenceCheck);
            let converged = self.ctx.agendas.convergence.execute(&field, &previous)?;
            info!(
                iteration = iterations,
                max_change = max_abs_difference(&field, &previous),
                converged,
                "DOIT iteration"
            );

            if converged {
                self.transition(IterationState::Converged);
                return Ok(IterationOutcome {
                    field,
                    scattering_source: source,
                    status: IterationStatus::Converged,
                    iterations,
                });
            }
        }
    }
}

fn max_abs_difference(a: &RadiationField, b: &RadiationField) -> FloatValue {
    a.data()
        .iter()
        .zip(b.data().iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, FloatValue::max)
}
