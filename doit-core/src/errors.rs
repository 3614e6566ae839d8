use crate::field::FieldIndex;
use crate::FloatValue;
use thiserror::Error;

/// Error type for invalid operations.
#[derive(Error, Debug)]
pub enum DoitError {
    #[error("{0}")]
    Error(String),
    #[error("Extrapolation is not allowed. Target={0}, grid range=[{1}, {2}]")]
    ExtrapolationNotAllowed(FloatValue, FloatValue, FloatValue),
    #[error("Wrong shape for {name}. Expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        name: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("Invalid cloudbox limits {limits:?}: {reason}")]
    InvalidCloudboxLimits { limits: Vec<usize>, reason: String },
    #[error("Invalid grid {name}: {reason}")]
    InvalidGrid { name: String, reason: String },
    #[error("Extinction matrix is singular at {index:?}: {matrix}")]
    SingularExtinctionMatrix { index: FieldIndex, matrix: String },
    #[error("Surface reflections inside the cloudbox are not handled by the plane-parallel update (pressure index {p_index}, zenith angle {za} deg)")]
    SurfaceReflectionUnsupported { p_index: usize, za: FloatValue },
    #[error("Position (p={gp_p}, lat={gp_lat}, lon={gp_lon}) is outside the cloudbox")]
    OutsideCloudbox {
        gp_p: FloatValue,
        gp_lat: FloatValue,
        gp_lon: FloatValue,
    },
    #[error("Interpolation of the radiation field inside a 3D cloudbox is not implemented")]
    InteriorInterpolation3DUnsupported,
    #[error("Polynomial zenith angle interpolation is only available for 1D atmospheres")]
    PolynomialInterpolationUnsupported,
    #[error("Agenda {agenda} returned an invalid result: {reason}")]
    InvalidAgendaOutput { agenda: String, reason: String },
    #[error("No {0} agenda has been configured")]
    MissingAgenda(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Could not parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("Could not serialise configuration: {0}")]
    ConfigSerialise(#[from] toml::ser::Error),
}

/// Convenience type for `Result<T, DoitError>`.
pub type DoitResult<T> = Result<T, DoitError>;
