//! Meshed pipe segment with its port-Hamiltonian operators.

use crate::error::{NetworkError, NetworkResult, check_len};
use crate::snapshot::{NetworkSnapshot, PipeSnapshot};
use crate::traits::{PortHamiltonian, SystemTerms};
use pg_core::units::{Length, Temperature, k};
use pg_core::{GasConstant, Real, Scalar, ensure_finite, ensure_positive};
use pg_operators::{EffortMap, FrictionOperator, PipeStructure, SparseOperator};

/// Physical description of a pipe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipeGeometry {
    pub length: Length,
    pub diameter: Length,
    /// Darcy friction factor, dimensionless.
    pub friction: Real,
}

impl PipeGeometry {
    pub fn new(length: Length, diameter: Length, friction: Real) -> NetworkResult<Self> {
        ensure_positive(length.value, "pipe length")?;
        ensure_positive(diameter.value, "pipe diameter")?;
        if ensure_finite(friction, "friction factor")? < 0.0 {
            return Err(NetworkError::NonPhysical {
                what: "friction factor must be non-negative",
            });
        }
        Ok(Self {
            length,
            diameter,
            friction,
        })
    }
}

/// A pipe discretized on `resolution + 1` uniformly spaced nodes.
///
/// State layout is `[rho_0..rho_N, m_0..m_N]`. Density and momentum start
/// at zero; seed a plausible state before evaluating friction.
#[derive(Debug, Clone)]
pub struct DiscretePipe {
    name: String,
    geometry: PipeGeometry,
    gas: GasConstant,
    temperature: Real,
    mesh: Vec<Real>,
    structure: PipeStructure,
    friction: FrictionOperator,
    effort: EffortMap,
    density: Vec<Real>,
    momentum: Vec<Real>,
}

impl DiscretePipe {
    pub fn new(
        name: impl Into<String>,
        geometry: PipeGeometry,
        resolution: usize,
        temperature: Temperature,
        gas: GasConstant,
    ) -> NetworkResult<Self> {
        if resolution < 2 {
            return Err(NetworkError::InvalidArg {
                what: "pipe resolution must be at least 2 intervals",
            });
        }
        let temperature = ensure_positive(temperature.value, "pipe temperature")?;
        let nodes = resolution + 1;
        let length = geometry.length.value;
        let width = length / resolution as Real;

        let structure = PipeStructure::new(nodes, width)?;
        let friction = FrictionOperator::new(nodes, geometry.friction, geometry.diameter.value)?;
        let effort = EffortMap::new(nodes, structure.output().clone())?;
        let mesh = (0..nodes).map(|i| i as Real * width).collect();

        let name = name.into();
        tracing::debug!(pipe = %name, nodes, width, "discretized pipe");

        Ok(Self {
            name,
            geometry,
            gas,
            temperature,
            mesh,
            structure,
            friction,
            effort,
            density: vec![0.0; nodes],
            momentum: vec![0.0; nodes],
        })
    }

    pub fn geometry(&self) -> &PipeGeometry {
        &self.geometry
    }

    pub fn gas(&self) -> GasConstant {
        self.gas
    }

    pub fn nodes(&self) -> usize {
        self.mesh.len()
    }

    /// Number of mesh intervals.
    pub fn resolution(&self) -> usize {
        self.nodes() - 1
    }

    pub fn mesh(&self) -> &[Real] {
        &self.mesh
    }

    pub fn mesh_width(&self) -> Real {
        self.structure.mesh_width()
    }

    pub fn structure(&self) -> &PipeStructure {
        &self.structure
    }

    pub fn temperature(&self) -> Temperature {
        k(self.temperature)
    }

    /// `R·T` of this pipe.
    pub fn rt(&self) -> Real {
        self.gas.rt(self.temperature)
    }

    pub fn set_temperature(&mut self, temperature: Temperature) -> NetworkResult<()> {
        self.temperature = ensure_positive(temperature.value, "pipe temperature")?;
        Ok(())
    }

    pub fn density(&self) -> &[Real] {
        &self.density
    }

    pub fn momentum(&self) -> &[Real] {
        &self.momentum
    }

    /// `rho·R·T` per node.
    pub fn pressure(&self) -> Vec<Real> {
        let rt = self.rt();
        self.density.iter().map(|rho| rho * rt).collect()
    }

    pub fn set_density(&mut self, density: &[Real]) -> NetworkResult<()> {
        check_len("pipe density", self.nodes(), density.len())?;
        self.density.copy_from_slice(density);
        Ok(())
    }

    pub fn set_uniform_density(&mut self, density: Real) {
        self.density.fill(density);
    }

    /// Set density from pressure through `rho = p / (R·T)`.
    pub fn set_pressure(&mut self, pressure: &[Real]) -> NetworkResult<()> {
        check_len("pipe pressure", self.nodes(), pressure.len())?;
        let rt = self.rt();
        for (rho, p) in self.density.iter_mut().zip(pressure) {
            *rho = p / rt;
        }
        Ok(())
    }

    pub fn set_uniform_pressure(&mut self, pressure: Real) {
        let rho = pressure / self.rt();
        self.density.fill(rho);
    }

    pub fn set_momentum(&mut self, momentum: &[Real]) -> NetworkResult<()> {
        check_len("pipe momentum", self.nodes(), momentum.len())?;
        self.momentum.copy_from_slice(momentum);
        Ok(())
    }

    pub fn set_uniform_momentum(&mut self, momentum: Real) {
        self.momentum.fill(momentum);
    }

    /// Friction values and effort vector for one pipe-local state.
    pub fn local_terms<T: Scalar>(
        &self,
        density: &[T],
        momentum: &[T],
    ) -> NetworkResult<(Vec<T>, Vec<T>)> {
        let friction = self.friction.values(density, momentum)?;
        let effort = self.effort.evaluate(density, momentum, self.rt())?;
        Ok((friction, effort))
    }

    pub(crate) fn friction_operator(&self) -> &FrictionOperator {
        &self.friction
    }

    pub(crate) fn pipe_snapshot(&self) -> PipeSnapshot {
        PipeSnapshot {
            name: self.name.clone(),
            temperature: self.temperature,
            mesh: self.mesh.clone(),
            density: self.density.clone(),
            momentum: self.momentum.clone(),
            pressure: self.pressure(),
        }
    }
}

impl PortHamiltonian for DiscretePipe {
    fn name(&self) -> &str {
        &self.name
    }

    fn state_len(&self) -> usize {
        self.structure.state_len()
    }

    fn residual_len(&self) -> usize {
        self.structure.residual_len()
    }

    fn input_len(&self) -> usize {
        2
    }

    fn energy(&self) -> &SparseOperator<Real> {
        self.structure.energy()
    }

    fn skew(&self) -> &SparseOperator<Real> {
        self.structure.skew()
    }

    fn closure(&self) -> &SparseOperator<Real> {
        self.structure.closure()
    }

    fn terms<T: Scalar>(&self, state: &[T]) -> NetworkResult<SystemTerms<T>> {
        check_len("pipe state", self.state_len(), state.len())?;
        let (density, momentum) = state.split_at(self.nodes());
        let (friction_values, effort) = self.local_terms(density, momentum)?;
        let friction = SparseOperator::from_pattern(self.friction.pattern().clone(), friction_values)?;
        Ok(SystemTerms {
            friction,
            effort,
            input: self.structure.input().lift(),
            compression_ratio: None,
        })
    }

    fn state(&self) -> Vec<Real> {
        let mut state = Vec::with_capacity(self.state_len());
        state.extend_from_slice(&self.density);
        state.extend_from_slice(&self.momentum);
        state
    }

    fn set_state(&mut self, state: &[Real]) -> NetworkResult<()> {
        check_len("pipe state", self.state_len(), state.len())?;
        let (density, momentum) = state.split_at(self.nodes());
        self.density.copy_from_slice(density);
        self.momentum.copy_from_slice(momentum);
        Ok(())
    }

    /// `[p_in, -m_out]`.
    fn boundary_inputs(&self, inlet_pressure: Real, outlet_momentum: Real) -> Vec<Real> {
        vec![inlet_pressure, -outlet_momentum]
    }

    fn pin_boundary(
        &self,
        guess: &mut [Real],
        inlet_pressure: Real,
        outlet_momentum: Real,
    ) -> NetworkResult<()> {
        check_len("pipe guess", self.state_len(), guess.len())?;
        guess[0] = inlet_pressure / self.rt();
        guess[self.state_len() - 1] = outlet_momentum;
        Ok(())
    }

    fn snapshot(&self, time: Real) -> NetworkSnapshot {
        NetworkSnapshot {
            time,
            compression_ratio: None,
            pipes: vec![self.pipe_snapshot()],
        }
    }
}
