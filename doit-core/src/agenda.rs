//! Physics callbacks ("agendas") used by the solver
//!
//! Every agenda kind is a trait with a single `execute` method. Implementations are
//! registered with `typetag` so that a boxed set of agendas ([`Agendas`]) can be serialised
//! together with the rest of a solver setup.
//! Agendas must be `Send + Sync`; the solver itself is single threaded but the per-direction
//! work of some update schemes is independent.

use crate::atmosphere::AtmosphericState;
use crate::atmosphere::check_shape;
use crate::cloudbox::CloudboxIndex;
use crate::context::SweepContext;
use crate::errors::{DoitError, DoitResult};
use crate::field::{RadiationField, ScatteringSourceField};
use crate::ppath::{PpathPoint, PpathStep};
use crate::rte::{ExtinctionMatrix, StokesVector};
use crate::FloatValue;
use ndarray::{Array1, Array2, Array3, Array4, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Absorption coefficients of the gas species
#[typetag::serde(tag = "type")]
pub trait GasAbsorptionAgenda: Debug + Send + Sync {
    /// Absorption coefficient (1/m) per species at frequency `f_index`
    fn execute(
        &self,
        f_index: usize,
        pressure: FloatValue,
        temperature: FloatValue,
        vmr: &[FloatValue],
    ) -> DoitResult<Array1<FloatValue>>;
}

/// Gas extinction matrix and absorption vector from the per species absorption
#[typetag::serde(tag = "type")]
pub trait GasOpticalPropertiesAgenda: Debug + Send + Sync {
    fn execute(
        &self,
        f_index: usize,
        absorption: ArrayView1<FloatValue>,
        stokes_dim: usize,
    ) -> DoitResult<(ExtinctionMatrix, StokesVector)>;
}

/// Optical properties of each particle type at one position and direction
#[typetag::serde(tag = "type")]
pub trait ParticlePropertiesAgenda: Debug + Send + Sync {
    fn execute(
        &self,
        position: CloudboxIndex,
        temperature: FloatValue,
        f_index: usize,
        za_index: usize,
        aa_index: usize,
        stokes_dim: usize,
    ) -> DoitResult<SingleScatteringProperties>;
}

/// Bulk particle optical properties from the per type properties
#[typetag::serde(tag = "type")]
pub trait ParticleSumAgenda: Debug + Send + Sync {
    fn execute(
        &self,
        properties: &SingleScatteringProperties,
        position: CloudboxIndex,
    ) -> DoitResult<(ExtinctionMatrix, StokesVector)>;
}

/// Completes a one-point start path up to the next grid cell boundary or the surface
#[typetag::serde(tag = "type")]
pub trait PpathStepAgenda: Debug + Send + Sync {
    fn execute(&self, atmosphere: &AtmosphericState, start: PpathStep) -> DoitResult<PpathStep>;
}

/// Surface emission and reflection at the point where a path meets the surface
#[typetag::serde(tag = "type")]
pub trait SurfacePropertiesAgenda: Debug + Send + Sync {
    fn execute(
        &self,
        atmosphere: &AtmosphericState,
        point: &PpathPoint,
        stokes_dim: usize,
    ) -> DoitResult<SurfaceProperties>;
}

/// Scattering source term from the current radiation field
#[typetag::serde(tag = "type")]
pub trait ScatteringSourceAgenda: Debug + Send + Sync {
    fn execute(
        &self,
        ctx: &SweepContext,
        field: &RadiationField,
    ) -> DoitResult<ScatteringSourceField>;
}

/// Decides whether two successive iterates are close enough
#[typetag::serde(tag = "type")]
pub trait ConvergenceTest: Debug + Send + Sync {
    fn execute(&self, new: &RadiationField, previous: &RadiationField) -> DoitResult<bool>;
}

/// Per particle type optical properties
#[derive(Debug, Clone, PartialEq)]
pub struct SingleScatteringProperties {
    /// `(type, stokes, stokes)`
    pub ext_mat: Array3<FloatValue>,
    /// `(type, stokes)`
    pub abs_vec: Array2<FloatValue>,
}

impl SingleScatteringProperties {
    pub fn zeros(n_types: usize, stokes_dim: usize) -> Self {
        Self {
            ext_mat: Array3::zeros((n_types, stokes_dim, stokes_dim)),
            abs_vec: Array2::zeros((n_types, stokes_dim)),
        }
    }

    pub fn n_types(&self) -> usize {
        self.abs_vec.nrows()
    }
}

/// Output of a [`SurfacePropertiesAgenda`]
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceProperties {
    /// Emitted radiance `(f, stokes)`
    pub emission: Array2<FloatValue>,
    /// Incoming directions `[za, aa]` (degrees) contributing by reflection
    pub los: Vec<[FloatValue; 2]>,
    /// Reflection matrices `(los, f, stokes, stokes)`
    pub rmatrix: Array4<FloatValue>,
}

impl SurfaceProperties {
    pub fn check_shape(&self, n_f: usize, stokes_dim: usize) -> DoitResult<()> {
        check_shape("surface_emission", self.emission.shape(), &[n_f, stokes_dim])?;
        check_shape(
            "surface_rmatrix",
            self.rmatrix.shape(),
            &[self.los.len(), n_f, stokes_dim, stokes_dim],
        )
    }
}

/// Check the extinction matrix and absorption vector returned by an agenda
pub fn check_optical_properties(
    agenda: &str,
    ext: &ExtinctionMatrix,
    abs: &StokesVector,
    stokes_dim: usize,
) -> DoitResult<()> {
    if ext.shape() != (stokes_dim, stokes_dim) || abs.len() != stokes_dim {
        return Err(DoitError::InvalidAgendaOutput {
            agenda: agenda.to_string(),
            reason: format!(
                "expected a {0}x{0} extinction matrix and {0} absorption components, got {1:?} and {2}",
                stokes_dim,
                ext.shape(),
                abs.len()
            ),
        });
    }
    Ok(())
}

/// The complete set of agendas needed by a solve
#[derive(Debug, Serialize, Deserialize)]
pub struct Agendas {
    pub gas_absorption: Box<dyn GasAbsorptionAgenda>,
    pub gas_optical_properties: Box<dyn GasOpticalPropertiesAgenda>,
    pub particle_properties: Box<dyn ParticlePropertiesAgenda>,
    pub particle_sum: Box<dyn ParticleSumAgenda>,
    pub ppath_step: Box<dyn PpathStepAgenda>,
    /// Only needed when the surface lies inside the cloudbox
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surface: Option<Box<dyn SurfacePropertiesAgenda>>,
    pub scattering_source: Box<dyn ScatteringSourceAgenda>,
    pub convergence: Box<dyn ConvergenceTest>,
}
