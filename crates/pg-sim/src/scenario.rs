//! Compile a validated configuration into a runnable scenario.

use crate::boundary::{BoundaryCondition, BoundarySet, ConstantBoundary, DiurnalProfile};
use crate::error::{SimError, SimResult};
use pg_core::units::{hours, k, m, s};
use pg_core::{GasConstant, Real, Time};
use pg_network::{
    Compressor, DiscretePipe, Network, NetworkSnapshot, PipeGeometry, PortHamiltonian,
};
use pg_project::{ScenarioConfig, TimeDef, validate_config};
use uom::si::time::second;

/// Uniform time grid `t_k = start + k·step`, all in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeGrid {
    start: Real,
    end: Real,
    step: Real,
}

impl TimeGrid {
    pub fn new(start: Time, end: Time, step: Time) -> SimResult<Self> {
        let (start, end, step) = (start.get::<second>(), end.get::<second>(), step.get::<second>());
        if !(step.is_finite() && step > 0.0) {
            return Err(SimError::InvalidArg {
                what: "time step must be positive",
            });
        }
        if !(start.is_finite() && end.is_finite() && end >= start) {
            return Err(SimError::InvalidArg {
                what: "end time must not precede start time",
            });
        }
        Ok(Self { start, end, step })
    }

    /// Start and end in hours, step in seconds.
    pub fn from_def(def: &TimeDef) -> SimResult<Self> {
        Self::new(hours(def.start), hours(def.end), s(def.step))
    }

    pub fn start(&self) -> Real {
        self.start
    }

    pub fn end(&self) -> Real {
        self.end
    }

    pub fn step(&self) -> Real {
        self.step
    }

    /// `ceil((end - start) / step)`; the last step may overshoot `end`.
    pub fn step_count(&self) -> usize {
        ((self.end - self.start) / self.step).ceil() as usize
    }

    pub fn time_at(&self, step: usize) -> Real {
        self.start + step as Real * self.step
    }
}

/// The system a scenario drives.
#[derive(Debug, Clone)]
pub enum ScenarioSystem {
    Pipe(DiscretePipe),
    Network(Network),
}

impl ScenarioSystem {
    pub fn snapshot(&self, time: Real) -> NetworkSnapshot {
        match self {
            ScenarioSystem::Pipe(pipe) => pipe.snapshot(time),
            ScenarioSystem::Network(network) => network.snapshot(time),
        }
    }

    pub fn state_len(&self) -> usize {
        match self {
            ScenarioSystem::Pipe(pipe) => pipe.state_len(),
            ScenarioSystem::Network(network) => network.state_len(),
        }
    }
}

/// A compiled run: system, boundary drivers, initial state and time grid.
#[derive(Debug)]
pub struct Scenario {
    pub name: String,
    pub system: ScenarioSystem,
    pub boundaries: BoundarySet,
    /// Uniform starting pressure (Pa) and momentum for the steady solve.
    pub initial_pressure: Real,
    pub initial_momentum: Real,
    pub grid: TimeGrid,
    pub io_frequency: usize,
}

impl Scenario {
    /// Build the pipe (or compressor chain) described by `config`.
    ///
    /// The inlet pressure is held constant and the outlet follows the
    /// reference daily demand; swap either with [`Scenario::with_outlet_momentum`]
    /// or by replacing `boundaries`.
    pub fn from_config(config: &ScenarioConfig) -> SimResult<Self> {
        validate_config(config)?;

        let gas = GasConstant::new(config.gas_constant)?;
        let geometry = PipeGeometry::new(
            m(config.pipe.length),
            m(config.pipe.diameter),
            config.pipe.friction,
        )?;
        let temperature = config.inlet_temperature().ok_or(SimError::InvalidArg {
            what: "inlet temperature missing",
        })?;
        let resolution = config.discretization.space.resolution;

        let system = match &config.compressor {
            Some(def) => {
                let kappa = config.fluid.isentropic_exponent.ok_or(SimError::InvalidArg {
                    what: "isentropic exponent missing",
                })?;
                let compressor = Compressor::new(def.kind, def.model, def.specification, kappa)?
                    .with_mass_flow_coupling(def.mass_flow_coupling);
                ScenarioSystem::Network(Network::compressor_chain(
                    geometry,
                    geometry,
                    resolution,
                    k(temperature),
                    compressor,
                    gas,
                )?)
            }
            None => ScenarioSystem::Pipe(DiscretePipe::new(
                "pipe",
                geometry,
                resolution,
                k(temperature),
                gas,
            )?),
        };

        let scenario = Self {
            name: config.io.filename.clone(),
            system,
            boundaries: BoundarySet::new(
                ConstantBoundary(config.boundary_conditions.inlet.pressure),
                DiurnalProfile::default(),
            ),
            initial_pressure: config.initial_conditions.pressure,
            initial_momentum: config.initial_conditions.momentum,
            grid: TimeGrid::from_def(&config.discretization.time)?,
            io_frequency: config.io.frequency,
        };
        tracing::info!(
            scenario = %scenario.name,
            state_len = scenario.system.state_len(),
            steps = scenario.grid.step_count(),
            "compiled scenario"
        );
        Ok(scenario)
    }

    pub fn with_outlet_momentum(mut self, profile: impl BoundaryCondition + 'static) -> Self {
        self.boundaries.outlet_momentum = Box::new(profile);
        self
    }

    /// Write the uniform initial state into the owned system state.
    ///
    /// A compressor chain takes the scaled layout of
    /// [`Network::uniform_initial_guess`].
    pub fn seed_initial_state(&mut self) -> SimResult<()> {
        let (p0, m0) = (self.initial_pressure, self.initial_momentum);
        match &mut self.system {
            ScenarioSystem::Pipe(pipe) => {
                pipe.set_uniform_pressure(p0);
                pipe.set_uniform_momentum(m0);
            }
            ScenarioSystem::Network(network) => {
                let guess = network.uniform_initial_guess(p0, m0)?;
                network.set_state(&guess)?;
            }
        }
        Ok(())
    }
}
