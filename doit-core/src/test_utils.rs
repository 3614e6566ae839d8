//! Minimal agendas and small 1D and 3D setups shared by the unit tests

use crate::agenda::{
    Agendas, ConvergenceTest, GasAbsorptionAgenda, GasOpticalPropertiesAgenda,
    ParticlePropertiesAgenda, ParticleSumAgenda, PpathStepAgenda, ScatteringSourceAgenda,
    SingleScatteringProperties, SurfaceProperties, SurfacePropertiesAgenda,
};
use crate::atmosphere::AtmosphericState;
use crate::cloudbox::{AtmosphereDim, CloudboxIndex, CloudboxLimits};
use crate::config::DoitConfig;
use crate::context::SweepContext;
use crate::errors::DoitResult;
use crate::field::{RadiationField, ScatteringSourceField};
use crate::interpolate::GridPos;
use crate::ppath::{Background, PpathPoint, PpathStep};
use crate::rte::{ExtinctionMatrix, StokesVector};
use crate::{FloatValue, DEG2RAD};
use ndarray::{array, Array1, Array2, Array3, Array4, ArrayView1};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstantGasAbsorption {
    pub coefficient: FloatValue,
}

#[typetag::serde]
impl GasAbsorptionAgenda for ConstantGasAbsorption {
    fn execute(
        &self,
        _f_index: usize,
        _pressure: FloatValue,
        _temperature: FloatValue,
        _vmr: &[FloatValue],
    ) -> DoitResult<Array1<FloatValue>> {
        Ok(Array1::from_elem(1, self.coefficient))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagonalGas {}

#[typetag::serde]
impl GasOpticalPropertiesAgenda for DiagonalGas {
    fn execute(
        &self,
        _f_index: usize,
        absorption: ArrayView1<FloatValue>,
        stokes_dim: usize,
    ) -> DoitResult<(ExtinctionMatrix, StokesVector)> {
        let total = absorption.sum();
        let mut abs = StokesVector::zeros(stokes_dim);
        abs[0] = total;
        Ok((
            ExtinctionMatrix::from_diagonal_element(stokes_dim, stokes_dim, total),
            abs,
        ))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstantParticles {
    pub ext: FloatValue,
    pub abs: FloatValue,
}

#[typetag::serde]
impl ParticlePropertiesAgenda for ConstantParticles {
    fn execute(
        &self,
        _position: CloudboxIndex,
        _temperature: FloatValue,
        _f_index: usize,
        _za_index: usize,
        _aa_index: usize,
        stokes_dim: usize,
    ) -> DoitResult<SingleScatteringProperties> {
        let mut properties = SingleScatteringProperties::zeros(1, stokes_dim);
        for i in 0..stokes_dim {
            properties.ext_mat[[0, i, i]] = self.ext;
        }
        properties.abs_vec[[0, 0]] = self.abs;
        Ok(properties)
    }
}

#[typetag::serde]
impl ParticleSumAgenda for ConstantParticles {
    fn execute(
        &self,
        properties: &SingleScatteringProperties,
        _position: CloudboxIndex,
    ) -> DoitResult<(ExtinctionMatrix, StokesVector)> {
        let stokes_dim = properties.abs_vec.ncols();
        let ext = ExtinctionMatrix::from_fn(stokes_dim, stokes_dim, |i, j| {
            properties.ext_mat.slice(ndarray::s![.., i, j]).sum()
        });
        let abs = StokesVector::from_fn(stokes_dim, |i, _| {
            properties.abs_vec.column(i).sum()
        });
        Ok((ext, abs))
    }
}

/// Flat geometry: a step always ends on the neighbouring level, horizontal rays travel 1e7 m
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanarPpath1D {}

#[typetag::serde]
impl PpathStepAgenda for PlanarPpath1D {
    fn execute(&self, atmosphere: &AtmosphericState, start: PpathStep) -> DoitResult<PpathStep> {
        let mut ppath = start;
        let first = ppath.first().clone();
        let p = first.gp_p.idx;
        let za = first.za();
        let z = atmosphere.z_column(0, 0);

        let end = if za <= 90.0 {
            if p + 1 >= atmosphere.n_p() {
                return Ok(ppath);
            }
            p + 1
        } else {
            if p == 0 {
                ppath.background = Background::Surface;
                return Ok(ppath);
            }
            p - 1
        };
        let dz = (z[end] - z[p]).abs();
        let l = if za == 90.0 {
            1e7
        } else {
            (dz / (za * DEG2RAD).cos()).abs()
        };
        let point = PpathPoint {
            pos: [atmosphere.r_geoid[[0, 0]] + z[end], 0.0, 0.0],
            z: z[end],
            los: first.los,
            gp_p: GridPos::at_index(end),
            gp_lat: None,
            gp_lon: None,
        };
        ppath.push(point, l);
        if end == 0 {
            ppath.background = Background::Surface;
        }
        Ok(ppath)
    }
}

/// Vertical steps in a 3D atmosphere: latitude, longitude and line of sight are kept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerticalPpath3D {}

#[typetag::serde]
impl PpathStepAgenda for VerticalPpath3D {
    fn execute(&self, atmosphere: &AtmosphericState, start: PpathStep) -> DoitResult<PpathStep> {
        let mut ppath = start;
        let first = ppath.first().clone();
        let (p, lat, lon) = (
            first.gp_p.idx,
            first.gp_lat_or_origin().idx,
            first.gp_lon_or_origin().idx,
        );
        let za = first.za();
        let end = if za <= 90.0 {
            if p + 1 >= atmosphere.n_p() {
                return Ok(ppath);
            }
            p + 1
        } else {
            if p == 0 {
                ppath.background = Background::Surface;
                return Ok(ppath);
            }
            p - 1
        };
        let z = atmosphere.z_field[[end, lat, lon]];
        let dz = (z - atmosphere.z_field[[p, lat, lon]]).abs();
        let l = if za == 90.0 {
            1e7
        } else {
            (dz / (za * DEG2RAD).cos()).abs()
        };
        if z <= atmosphere.z_surface[[lat, lon]] {
            ppath.background = Background::Surface;
        }
        let point = PpathPoint {
            pos: [atmosphere.r_geoid[[lat, lon]] + z, first.pos[1], first.pos[2]],
            z,
            los: first.los,
            gp_p: GridPos::at_index(end),
            gp_lat: first.gp_lat,
            gp_lon: first.gp_lon,
        };
        ppath.push(point, l);
        Ok(ppath)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedSurface {
    pub emission: FloatValue,
    pub reflectivity: FloatValue,
}

#[typetag::serde]
impl SurfacePropertiesAgenda for FixedSurface {
    fn execute(
        &self,
        atmosphere: &AtmosphericState,
        point: &PpathPoint,
        stokes_dim: usize,
    ) -> DoitResult<SurfaceProperties> {
        let n_f = atmosphere.f_grid.len();
        let mut emission = Array2::zeros((n_f, stokes_dim));
        emission.column_mut(0).fill(self.emission);
        let mut rmatrix = Array4::zeros((1, n_f, stokes_dim, stokes_dim));
        for f in 0..n_f {
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

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZeroScattering {}

#[typetag::serde]
impl ScatteringSourceAgenda for ZeroScattering {
    fn execute(
        &self,
        ctx: &SweepContext,
        _field: &RadiationField,
    ) -> DoitResult<ScatteringSourceField> {
        Ok(ScatteringSourceField::zeros(ctx.field_shape()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaxAbsDifference {
    pub epsilon: FloatValue,
}

#[typetag::serde]
impl ConvergenceTest for MaxAbsDifference {
    fn execute(&self, new: &RadiationField, previous: &RadiationField) -> DoitResult<bool> {
        let max = new
            .data()
            .iter()
            .zip(previous.data().iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, FloatValue::max);
        Ok(max < self.epsilon)
    }
}

pub struct TestSetup {
    pub atmosphere: AtmosphericState,
    pub limits: CloudboxLimits,
    pub za_grid: Array1<FloatValue>,
    pub aa_grid: Array1<FloatValue>,
    pub agendas: Agendas,
    pub config: DoitConfig,
}

impl TestSetup {
    pub fn context(&self, f_index: usize) -> SweepContext<'_> {
        SweepContext {
            atmosphere: &self.atmosphere,
            limits: &self.limits,
            za_grid: self.za_grid.view(),
            aa_grid: self.aa_grid.view(),
            f_index,
            agendas: &self.agendas,
            config: &self.config,
        }
    }
}

/// Twelve levels 100 m apart at 250 K, cloudbox over levels 3 to 10
pub fn one_d_setup(particle_ext: FloatValue, particle_abs: FloatValue) -> TestSetup {
    one_d_setup_with_limits(3, 10, particle_ext, particle_abs)
}

pub fn one_d_setup_with_limits(
    p_lower: usize,
    p_upper: usize,
    particle_ext: FloatValue,
    particle_abs: FloatValue,
) -> TestSetup {
    let n_p = 12;
    let atmosphere = AtmosphericState::one_d(
        Array1::from_shape_fn(n_p, |i| 1000.0 * 0.9_f64.powi(i as i32)),
        Array1::from_shape_fn(n_p, |i| 100.0 * i as FloatValue),
        Array1::from_elem(n_p, 250.0),
        Array2::zeros((0, n_p)),
        6.371e6,
        0.0,
        array![1e11],
    )
    .unwrap();
    TestSetup {
        atmosphere,
        limits: CloudboxLimits::one_d(p_lower, p_upper).unwrap(),
        za_grid: array![0.0, 45.0, 90.0, 135.0, 180.0],
        aa_grid: array![0.0],
        agendas: test_agendas(particle_ext, particle_abs, Box::new(PlanarPpath1D {})),
        config: DoitConfig::default(),
    }
}

/// Six levels on a 4x4 lat/lon grid, cloudbox over levels 1 to 4 and the two central
/// latitudes and longitudes, full circle azimuth grid
pub fn three_d_setup(particle_ext: FloatValue, particle_abs: FloatValue) -> TestSetup {
    let (n_p, n_lat, n_lon) = (6, 4, 4);
    let atmosphere = AtmosphericState::new(
        AtmosphereDim::ThreeD,
        Array1::from_shape_fn(n_p, |i| 1000.0 * 0.9_f64.powi(i as i32)),
        array![0.0, 1.0, 2.0, 3.0],
        array![0.0, 1.0, 2.0, 3.0],
        Array3::from_shape_fn((n_p, n_lat, n_lon), |(p, _, _)| 100.0 * p as FloatValue),
        Array3::from_elem((n_p, n_lat, n_lon), 250.0),
        Array4::zeros((0, n_p, n_lat, n_lon)),
        Array2::from_elem((n_lat, n_lon), 6.371e6),
        Array2::zeros((n_lat, n_lon)),
        array![1e11],
    )
    .unwrap();
    TestSetup {
        atmosphere,
        limits: CloudboxLimits::three_d((1, 4), (1, 2), (1, 2)).unwrap(),
        za_grid: array![0.0, 45.0, 90.0, 135.0, 180.0],
        aa_grid: array![0.0, 90.0, 180.0, 270.0, 360.0],
        agendas: test_agendas(particle_ext, particle_abs, Box::new(VerticalPpath3D {})),
        config: DoitConfig::default(),
    }
}

fn test_agendas(
    particle_ext: FloatValue,
    particle_abs: FloatValue,
    ppath_step: Box<dyn PpathStepAgenda>,
) -> Agendas {
    let particles = ConstantParticles {
        ext: particle_ext,
        abs: particle_abs,
    };
    Agendas {
        gas_absorption: Box::new(ConstantGasAbsorption { coefficient: 0.0 }),
        gas_optical_properties: Box::new(DiagonalGas {}),
        particle_properties: Box::new(particles.clone()),
        particle_sum: Box::new(particles),
        ppath_step,
        surface: Some(Box::new(FixedSurface {
            emission: 0.0,
            reflectivity: 1.0,
        })),
        scattering_source: Box::new(ZeroScattering {}),
        convergence: Box::new(MaxAbsDifference { epsilon: 1e-30 }),
    }
}
