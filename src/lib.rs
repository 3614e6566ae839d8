//! Discrete Ordinate Iterative (DOIT) radiative transfer through a scattering cloudbox
//!
//! This crate bundles the solver core with the reference agendas:
//!
//! * [`core`] holds the radiation field, the sweep and iteration machinery, the field
//!   interpolator and the zenith grid optimiser
//! * [`components`] provides gas, particle, surface, path and scattering agendas
//!
//! A complete setup can be written as TOML and loaded with [`DoitSolver::from_toml_str`].

pub use doit_components as components;
pub use doit_core as core;

pub use doit_core::agenda::Agendas;
pub use doit_core::atmosphere::AtmosphericState;
pub use doit_core::cloudbox::{AtmosphereDim, CloudboxLimits};
pub use doit_core::config::{DoitConfig, UpdateScheme};
pub use doit_core::errors::{DoitError, DoitResult};
pub use doit_core::field::{FieldShape, RadiationField, ScatteringSourceField};
pub use doit_core::field_interp::CloudboxFieldInterpolator;
pub use doit_core::interpolate::InterpMethod;
pub use doit_core::iteration::{IterationOutcome, IterationStatus};
pub use doit_core::solver::DoitSolver;
pub use doit_core::za_grid::{optimize_za_grid, optimize_za_grid_from_field};
