//! Implicit-midpoint steps on a single pipe and on a compressor chain.

use pg_core::units::{k, m};
use pg_core::{GasConstant, Real};
use pg_network::{
    Compressor, CompressorKind, ControlLaw, DiscretePipe, Network, PipeGeometry, PortHamiltonian,
};
use pg_solver::{
    LmConfig, Residual, TransientResidual, midpoint_inputs, solve_steady, step_transient,
};

fn settled_pipe() -> DiscretePipe {
    let geometry = PipeGeometry::new(m(5000.0), m(0.5), 0.01).unwrap();
    let mut pipe = DiscretePipe::new("p", geometry, 8, k(300.0), GasConstant::default()).unwrap();
    pipe.set_uniform_pressure(50.0e5);
    pipe.set_uniform_momentum(463.33);
    let inputs = pipe.boundary_inputs(50.0e5, 463.33);
    let report = solve_steady(&mut pipe, inputs, &LmConfig::default()).unwrap();
    assert!(report.converged);
    pipe
}

#[test]
fn constant_boundaries_keep_the_steady_state() {
    let mut pipe = settled_pipe();
    let steady = pipe.state();
    let u = pipe.boundary_inputs(50.0e5, 463.33);
    for _ in 0..3 {
        let guess = pipe.state();
        let report = step_transient(&mut pipe, &guess, 600.0, u.clone(), &LmConfig::default()).unwrap();
        assert!(report.converged);
    }
    for (a, b) in pipe.state().iter().zip(&steady) {
        assert!((a - b).abs() <= 1e-5 * b.abs().max(1.0));
    }
}

#[test]
fn outlet_demand_step_moves_outlet_momentum() {
    let mut pipe = settled_pipe();
    let before = pipe.boundary_inputs(50.0e5, 463.33);
    let after = pipe.boundary_inputs(50.0e5, 540.55);
    let u = midpoint_inputs(&before, &after).unwrap();

    let mut guess = pipe.state();
    pipe.pin_boundary(&mut guess, 50.0e5, 540.55).unwrap();
    let report = step_transient(&mut pipe, &guess, 600.0, u, &LmConfig::default()).unwrap();
    assert!(report.converged, "{:?}", report.termination);

    let outlet: Real = *pipe.momentum().last().unwrap();
    assert!(outlet > 463.33);
    assert!(pipe.density().iter().all(|d| d.is_finite() && *d > 0.0));
}

fn chain(kind: CompressorKind, spec: Real) -> Network {
    let compressor = Compressor::new(kind, ControlLaw::ValveActuated, spec, 1.3).unwrap();
    let geometry = PipeGeometry::new(m(5000.0), m(0.5), 0.01).unwrap();
    Network::compressor_chain(geometry, geometry, 6, k(300.0), compressor, GasConstant::default())
        .unwrap()
}

/// Column `column` of `G` as seen by the step residual at `x`.
fn input_column(network: &Network, previous: &[Real], x: &[Real], column: usize) -> Vec<Real> {
    let u = network.boundary_inputs(50.0e5, 463.33);
    let mut bumped = u.clone();
    bumped[column] += 1.0;
    let at = |inputs: Vec<Real>| {
        TransientResidual::new(network, previous.to_vec(), 600.0, inputs)
            .unwrap()
            .values(x)
            .unwrap()
    };
    at(u).iter().zip(at(bumped)).map(|(a, b)| a - b).collect()
}

/// Previous state, a moved end state and their midpoint.
fn moved_states(network: &mut Network) -> (Vec<Real>, Vec<Real>, Vec<Real>) {
    let previous = network.uniform_initial_guess(50.0e5, 463.33).unwrap();
    network.set_state(&previous).unwrap();
    let up_nodes = network.pipes()[0].nodes();
    let down_momentum = network.state_offsets()[1] + network.pipes()[1].nodes();
    let mut x = previous.clone();
    x[up_nodes - 1] *= 0.9;
    x[down_momentum] *= 1.2;
    let midpoint = x.iter().zip(&previous).map(|(a, b)| 0.5 * (a + b)).collect();
    (previous, x, midpoint)
}

#[test]
fn fixed_ratio_coupling_is_taken_at_the_midpoint() {
    let mut network = chain(CompressorKind::FixedRatio, 1.2);
    let (previous, x, mid) = moved_states(&mut network);
    let up_nodes = network.pipes()[0].nodes();
    let down_momentum = network.state_offsets()[1] + network.pipes()[1].nodes();
    let rt = network.pipes()[0].rt();
    let up_rows = network.residual_offsets()[1];
    let rows = network.residual_len();

    let p_mid = mid[up_nodes - 1] * rt;
    let pressure = input_column(&network, &previous, &x, 2);
    assert!((pressure[rows - 2] - p_mid).abs() <= 1e-9 * p_mid, "{}", pressure[rows - 2]);
    assert!((pressure[rows - 2] - x[up_nodes - 1] * rt).abs() > 1.0e3);

    let m_mid = mid[down_momentum];
    let momentum = input_column(&network, &previous, &x, 1);
    assert!((momentum[up_rows - 1] + m_mid).abs() <= 1e-9 * m_mid, "{}", momentum[up_rows - 1]);
    assert!((momentum[up_rows - 1] + x[down_momentum]).abs() > 1.0);

    let terms = network.terms(&mid).unwrap();
    assert_eq!(terms.input.get(rows - 2, 2), Some(p_mid));
    assert_eq!(terms.input.get(up_rows - 1, 1), Some(-m_mid));
}

#[test]
fn valve_scaling_uses_midpoint_pressure() {
    let mut network = chain(CompressorKind::FixedOutletPressure, 60.0e5);
    let (previous, x, mid) = moved_states(&mut network);
    let up_nodes = network.pipes()[0].nodes();
    let down_momentum = network.state_offsets()[1] + network.pipes()[1].nodes();
    let up_rows = network.residual_offsets()[1];

    let p_mid = mid[up_nodes - 1] * network.pipes()[0].rt();
    let expected = -mid[down_momentum] * p_mid.powf(1.0 / 1.3);
    let momentum = input_column(&network, &previous, &x, 1);
    let got = momentum[up_rows - 1];
    assert!((got - expected).abs() <= 1e-8 * expected.abs(), "{got} vs {expected}");
}
