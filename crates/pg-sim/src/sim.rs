//! Steady initialization and the implicit-midpoint time loop.

use crate::boundary::BoundarySet;
use crate::error::{SimError, SimResult};
use crate::scenario::{Scenario, ScenarioSystem, TimeGrid};
use pg_core::Real;
use pg_core::timing::{RunTimings, Timer};
use pg_network::{NetworkSnapshot, PortHamiltonian, SummaryRow};
use pg_solver::{LmConfig, LmReport, midpoint_inputs, solve_steady, step_transient};

/// Solver settings for a run.
#[derive(Clone, Debug, Default)]
pub struct SimOptions {
    /// Least-squares settings for the steady initialization
    pub steady: LmConfig,
    /// Least-squares settings for every time step
    pub transient: LmConfig,
}

/// Solver outcome of one accepted step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepRecord {
    /// 0 for the steady initialization
    pub step: usize,
    /// Seconds
    pub time: Real,
    pub iterations: usize,
    pub cost: Real,
    pub converged: bool,
}

impl StepRecord {
    fn from_report(step: usize, time: Real, report: &LmReport) -> Self {
        Self {
            step,
            time,
            iterations: report.iterations,
            cost: report.cost,
            converged: report.converged,
        }
    }
}

/// Record of a run.
#[derive(Clone, Debug, Default)]
pub struct SimRecord {
    pub steady: Option<StepRecord>,
    pub steps: Vec<StepRecord>,
    /// Initial state, then every `io_frequency`-th step.
    pub snapshots: Vec<NetworkSnapshot>,
    pub timings: RunTimings,
}

impl SimRecord {
    /// Inlet/outlet time series over the recorded snapshots.
    pub fn summary(&self) -> Vec<SummaryRow> {
        self.snapshots
            .iter()
            .filter_map(NetworkSnapshot::summary)
            .collect()
    }

    pub fn all_converged(&self) -> bool {
        self.steady.is_none_or(|s| s.converged) && self.steps.iter().all(|s| s.converged)
    }
}

/// Solve the steady problem for the boundary values at `time` and store
/// the result as the owned state.
pub fn solve_initial_state<S: PortHamiltonian>(
    system: &mut S,
    boundaries: &BoundarySet,
    time: Real,
    config: &LmConfig,
) -> SimResult<LmReport> {
    let inputs = boundaries.inputs_at(&*system, time);
    let report = solve_steady(system, inputs, config)?;
    if !report.converged {
        tracing::warn!(
            system = system.name(),
            termination = ?report.termination,
            cost = report.cost,
            "steady initialization did not converge"
        );
    }
    Ok(report)
}

/// Advance `system` over `grid` from its owned state.
pub fn run_transient<S: PortHamiltonian>(
    system: &mut S,
    boundaries: &BoundarySet,
    grid: &TimeGrid,
    io_frequency: usize,
    config: &LmConfig,
) -> SimResult<SimRecord> {
    run_transient_with_progress(system, boundaries, grid, io_frequency, config, |_| {})
}

/// Like [`run_transient`], calling `progress` after every accepted step.
///
/// Each step pins the inlet density and outlet momentum of the guess to the
/// boundary values at the new time, drives the residual with the average of
/// the inputs at both ends of the step, and accepts the solver result as the
/// new state whether or not it converged.
pub fn run_transient_with_progress<S, F>(
    system: &mut S,
    boundaries: &BoundarySet,
    grid: &TimeGrid,
    io_frequency: usize,
    config: &LmConfig,
    mut progress: F,
) -> SimResult<SimRecord>
where
    S: PortHamiltonian,
    F: FnMut(&StepRecord),
{
    if io_frequency == 0 {
        return Err(SimError::InvalidArg {
            what: "io_frequency must be at least 1",
        });
    }

    let dt = grid.step();
    let steps = grid.step_count();
    let timer = Timer::start("transient");

    let mut record = SimRecord::default();
    record.snapshots.push(system.snapshot(grid.start()));
    let mut guess = system.state();

    for step in 1..=steps {
        let time = grid.time_at(step);
        let (p_in, m_out) = boundaries.values_at(time);
        let inputs = midpoint_inputs(
            &boundaries.inputs_at(&*system, time - dt),
            &system.boundary_inputs(p_in, m_out),
        )?;
        system.pin_boundary(&mut guess, p_in, m_out)?;

        let report = step_transient(system, &guess, dt, inputs, config)?;
        let step_record = StepRecord::from_report(step, time, &report);
        if !report.converged {
            tracing::warn!(
                step,
                time,
                termination = ?report.termination,
                cost = report.cost,
                "time step did not converge"
            );
        }
        tracing::debug!(step, time, iterations = report.iterations, "step accepted");
        guess = report.x;

        if step % io_frequency == 0 {
            tracing::info!(step, steps, time, "snapshot");
            record.snapshots.push(system.snapshot(time));
        }
        progress(&step_record);
        record.steps.push(step_record);
    }

    record.timings.transient_total_time_s = timer.stop();
    record.timings.transient_steps = steps;
    Ok(record)
}

/// Seed, initialize and run a compiled scenario.
pub fn run_scenario(scenario: &mut Scenario, options: &SimOptions) -> SimResult<SimRecord> {
    scenario.seed_initial_state()?;
    let boundaries = &scenario.boundaries;
    let grid = &scenario.grid;
    let record = match &mut scenario.system {
        ScenarioSystem::Pipe(pipe) => {
            run_system(pipe, boundaries, grid, scenario.io_frequency, options)?
        }
        ScenarioSystem::Network(network) => {
            run_system(network, boundaries, grid, scenario.io_frequency, options)?
        }
    };
    tracing::info!(
        scenario = %scenario.name,
        snapshots = record.snapshots.len(),
        converged = record.all_converged(),
        "scenario finished"
    );
    Ok(record)
}

fn run_system<S: PortHamiltonian>(
    system: &mut S,
    boundaries: &BoundarySet,
    grid: &TimeGrid,
    io_frequency: usize,
    options: &SimOptions,
) -> SimResult<SimRecord> {
    let timer = Timer::start("steady");
    let steady = solve_initial_state(system, boundaries, grid.start(), &options.steady)?;
    let steady_time = timer.stop();

    let mut record = run_transient(system, boundaries, grid, io_frequency, &options.transient)?;
    record.steady = Some(StepRecord::from_report(0, grid.start(), &steady));
    record.timings.steady_solve_time_s = steady_time;
    record.timings.log_summary();
    Ok(record)
}
