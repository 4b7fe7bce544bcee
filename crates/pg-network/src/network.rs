//! Pipe -> compressor -> pipe chain.
//!
//! Assembly is block-diagonal over the two pipes. The only cross terms live
//! in the input operator `G`, whose four columns are
//!
//! | column | row | drives |
//! |---|---|---|
//! | 0 | inlet boundary of pipe 0 | inlet pressure |
//! | 1 | outlet boundary of pipe 0 | momentum continuity across the compressor |
//! | 2 | inlet boundary of pipe 1 | outlet pressure (ratio or target) |
//! | 3 | outlet boundary of pipe 1 | outlet momentum |
//!
//! Columns 1 and 2 carry state-dependent values, rewritten on every evaluation.

use crate::compressor::{Compressor, CompressorKind};
use crate::error::{NetworkError, NetworkResult, check_len};
use crate::pipe::{DiscretePipe, PipeGeometry};
use crate::snapshot::NetworkSnapshot;
use crate::traits::{PortHamiltonian, SystemTerms};
use pg_core::units::{Temperature, k};
use pg_core::{GasConstant, Real, Scalar};
use pg_operators::{SparseOperator, SparsityPattern, Triplet};
use std::sync::Arc;

const UPSTREAM: usize = 0;
const DOWNSTREAM: usize = 1;

#[derive(Debug, Clone)]
pub struct Network {
    name: String,
    pipes: Vec<DiscretePipe>,
    compressor: Compressor,
    energy: SparseOperator<Real>,
    skew: SparseOperator<Real>,
    closure: SparseOperator<Real>,
    friction_pattern: Arc<SparsityPattern>,
    input: SparseOperator<Real>,
    state_offsets: Vec<usize>,
    residual_offsets: Vec<usize>,
    /// Storage index of the momentum coupling entry in `input`.
    momentum_coupling: usize,
    /// Storage index of the outlet pressure entry in `input`.
    pressure_coupling: usize,
}

impl Network {
    /// Join exactly two pipes through `compressor`, upstream first.
    pub fn new(
        name: impl Into<String>,
        pipes: Vec<DiscretePipe>,
        compressor: Compressor,
    ) -> NetworkResult<Self> {
        if pipes.len() != 2 {
            return Err(NetworkError::Topology {
                what: "a compressor network joins exactly two pipes",
            });
        }

        let energy_blocks: Vec<_> = pipes.iter().map(|p| p.energy()).collect();
        let skew_blocks: Vec<_> = pipes.iter().map(|p| p.skew()).collect();
        let closure_blocks: Vec<_> = pipes.iter().map(|p| p.closure()).collect();
        let friction_blocks: Vec<&SparsityPattern> = pipes
            .iter()
            .map(|p| p.friction_operator().pattern().as_ref())
            .collect();

        let mut state_offsets = Vec::with_capacity(pipes.len() + 1);
        let mut residual_offsets = Vec::with_capacity(pipes.len() + 1);
        state_offsets.push(0);
        residual_offsets.push(0);
        for pipe in &pipes {
            state_offsets.push(state_offsets[state_offsets.len() - 1] + pipe.state_len());
            residual_offsets.push(residual_offsets[residual_offsets.len() - 1] + pipe.residual_len());
        }

        let up_residual = pipes[UPSTREAM].residual_len();
        let residual_len = residual_offsets[pipes.len()];
        let outlet_coupling_row = up_residual - 1;
        let outlet_pressure_row = residual_len - 2;
        let input = SparseOperator::from_triplets(
            residual_len,
            4,
            [
                Triplet::new(up_residual - 2, 0, 1.0),
                Triplet::new(outlet_coupling_row, 1, 1.0),
                Triplet::new(outlet_pressure_row, 2, 1.0),
                Triplet::new(residual_len - 1, 3, 1.0),
            ],
        )?;
        let missing = NetworkError::Topology {
            what: "compressor coupling entry missing from input operator",
        };
        let momentum_coupling = input
            .pattern()
            .position(outlet_coupling_row, 1)
            .ok_or_else(|| missing.clone())?;
        let pressure_coupling = input
            .pattern()
            .position(outlet_pressure_row, 2)
            .ok_or(missing)?;

        let network = Self {
            name: name.into(),
            energy: SparseOperator::block_diagonal(&energy_blocks),
            skew: SparseOperator::block_diagonal(&skew_blocks),
            closure: SparseOperator::block_diagonal(&closure_blocks),
            friction_pattern: Arc::new(SparsityPattern::block_diagonal(&friction_blocks)),
            input,
            state_offsets,
            residual_offsets,
            momentum_coupling,
            pressure_coupling,
            pipes,
            compressor,
        };
        tracing::debug!(
            network = %network.name,
            state_len = network.state_len(),
            residual_len = network.residual_len(),
            kind = ?network.compressor.kind(),
            control = ?network.compressor.control_law(),
            "assembled compressor network"
        );
        Ok(network)
    }

    /// Two pipes of equal resolution, the downstream one at the compressed
    /// temperature `T_in · temperature_scale`.
    pub fn compressor_chain(
        upstream: PipeGeometry,
        downstream: PipeGeometry,
        resolution: usize,
        inlet_temperature: Temperature,
        compressor: Compressor,
        gas: GasConstant,
    ) -> NetworkResult<Self> {
        let outlet_temperature = k(inlet_temperature.value * compressor.scales().temperature);
        let pipes = vec![
            DiscretePipe::new("upstream", upstream, resolution, inlet_temperature, gas)?,
            DiscretePipe::new("downstream", downstream, resolution, outlet_temperature, gas)?,
        ];
        Self::new("compressor_chain", pipes, compressor)
    }

    pub fn pipes(&self) -> &[DiscretePipe] {
        &self.pipes
    }

    pub fn compressor(&self) -> &Compressor {
        &self.compressor
    }

    pub fn compressor_mut(&mut self) -> &mut Compressor {
        &mut self.compressor
    }

    /// Cumulative state offsets, one more entry than pipes.
    pub fn state_offsets(&self) -> &[usize] {
        &self.state_offsets
    }

    pub fn residual_offsets(&self) -> &[usize] {
        &self.residual_offsets
    }

    /// Pressure at the last node of the upstream pipe, from the owned state.
    pub fn precompressor_pressure(&self) -> Real {
        let up = &self.pipes[UPSTREAM];
        up.density().last().copied().unwrap_or(0.0) * up.rt()
    }

    /// Split a network vector into per-pipe (density, momentum) slices.
    pub fn split_state<'a, T>(&self, state: &'a [T]) -> NetworkResult<Vec<(&'a [T], &'a [T])>> {
        check_len("network state", self.state_len(), state.len())?;
        Ok(self
            .pipes
            .iter()
            .zip(self.state_offsets.windows(2))
            .map(|(pipe, bounds)| state[bounds[0]..bounds[1]].split_at(pipe.nodes()))
            .collect())
    }

    /// Uniform starting state at pressure `p0` (Pa) and momentum `m0`.
    ///
    /// The guess uses the scales the network was built with: the upstream
    /// momentum is reduced by the momentum scale, the downstream density
    /// raised by the ratio. A fixed-outlet-pressure compressor then takes the
    /// ratio implied by `p0`; pipe temperatures keep their construction values.
    pub fn uniform_initial_guess(&mut self, p0: Real, m0: Real) -> NetworkResult<Vec<Real>> {
        let ratio = self.compressor.compression_ratio();
        let scales = self.compressor.scales();

        let up = &self.pipes[UPSTREAM];
        let down = &self.pipes[DOWNSTREAM];
        let mut guess = Vec::with_capacity(self.state_len());
        guess.extend(std::iter::repeat_n(p0 / up.rt(), up.nodes()));
        guess.extend(std::iter::repeat_n(m0 / scales.momentum, up.nodes()));
        guess.extend(std::iter::repeat_n(p0 * ratio / down.rt(), down.nodes()));
        guess.extend(std::iter::repeat_n(m0, down.nodes()));

        if self.compressor.kind() == CompressorKind::FixedOutletPressure {
            self.compressor
                .update_compression_ratio(self.compressor.specification() / p0)?;
        }
        Ok(guess)
    }
}

impl PortHamiltonian for Network {
    fn name(&self) -> &str {
        &self.name
    }

    fn state_len(&self) -> usize {
        self.state_offsets[self.pipes.len()]
    }

    fn residual_len(&self) -> usize {
        self.residual_offsets[self.pipes.len()]
    }

    fn input_len(&self) -> usize {
        4
    }

    fn energy(&self) -> &SparseOperator<Real> {
        &self.energy
    }

    fn skew(&self) -> &SparseOperator<Real> {
        &self.skew
    }

    fn closure(&self) -> &SparseOperator<Real> {
        &self.closure
    }

    fn terms<T: Scalar>(&self, state: &[T]) -> NetworkResult<SystemTerms<T>> {
        let parts = self.split_state(state)?;

        let mut friction_values = Vec::with_capacity(self.friction_pattern.nnz());
        let mut effort = Vec::with_capacity(self.residual_len());
        for (pipe, &(density, momentum)) in self.pipes.iter().zip(&parts) {
            let (friction, pipe_effort) = pipe.local_terms(density, momentum)?;
            friction_values.extend(friction);
            effort.extend(pipe_effort);
        }
        let friction = SparseOperator::from_pattern(Arc::clone(&self.friction_pattern), friction_values)?;

        let (up_density, _) = parts[UPSTREAM];
        let (_, down_momentum) = parts[DOWNSTREAM];
        let precompressor_pressure = up_density[up_density.len() - 1].scale(self.pipes[UPSTREAM].rt());
        let compression_ratio = self.compressor.ratio_for(precompressor_pressure);

        let mut input = self.input.lift::<T>();
        let values = input.values_mut();
        let mut coupling = -down_momentum[0];
        if self.compressor.kind() == CompressorKind::FixedRatio {
            values[self.pressure_coupling] = precompressor_pressure;
        } else if self.compressor.valve_scaled() {
            coupling = coupling * precompressor_pressure.powf(1.0 / self.compressor.isentropic_exponent());
        }
        values[self.momentum_coupling] = coupling;

        Ok(SystemTerms {
            friction,
            effort,
            input,
            compression_ratio: Some(compression_ratio),
        })
    }

    fn state(&self) -> Vec<Real> {
        let mut state = Vec::with_capacity(self.state_len());
        for pipe in &self.pipes {
            state.extend(pipe.state());
        }
        state
    }

    /// Hands each pipe its slice; a fixed-outlet-pressure compressor then
    /// takes the ratio implied by the new upstream pressure.
    fn set_state(&mut self, state: &[Real]) -> NetworkResult<()> {
        check_len("network state", self.state_len(), state.len())?;
        for (pipe, bounds) in self.pipes.iter_mut().zip(self.state_offsets.windows(2)) {
            pipe.set_state(&state[bounds[0]..bounds[1]])?;
        }
        if self.compressor.kind() == CompressorKind::FixedOutletPressure {
            let ratio = self.compressor.ratio_for(self.precompressor_pressure());
            self.compressor.update_compression_ratio(ratio)?;
        }
        Ok(())
    }

    /// `[p_in, u_ratio, specification, -m_out]`.
    fn boundary_inputs(&self, inlet_pressure: Real, outlet_momentum: Real) -> Vec<Real> {
        vec![
            inlet_pressure,
            self.compressor.momentum_input(),
            self.compressor.specification(),
            -outlet_momentum,
        ]
    }

    fn pin_boundary(
        &self,
        guess: &mut [Real],
        inlet_pressure: Real,
        outlet_momentum: Real,
    ) -> NetworkResult<()> {
        check_len("network guess", self.state_len(), guess.len())?;
        guess[0] = inlet_pressure / self.pipes[UPSTREAM].rt();
        guess[self.state_len() - 1] = outlet_momentum;
        Ok(())
    }

    fn snapshot(&self, time: Real) -> NetworkSnapshot {
        NetworkSnapshot {
            time,
            compression_ratio: Some(self.compressor.compression_ratio()),
            pipes: self.pipes.iter().map(DiscretePipe::pipe_snapshot).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compressor::{ControlLaw, MassFlowCoupling};
    use pg_core::units::m;

    fn geometry() -> PipeGeometry {
        PipeGeometry::new(m(1000.0), m(0.5), 0.01).unwrap()
    }

    fn chain(kind: CompressorKind, control: ControlLaw, spec: Real) -> Network {
        let compressor = Compressor::new(kind, control, spec, 1.3).unwrap();
        Network::compressor_chain(
            geometry(),
            geometry(),
            4,
            k(300.0),
            compressor,
            GasConstant::default(),
        )
        .unwrap()
    }

    fn seeded(network: &mut Network) -> Vec<Real> {
        let guess = network.uniform_initial_guess(50.0e5, 400.0).unwrap();
        network.set_state(&guess).unwrap();
        guess
    }

    #[test]
    fn sizes_add_up() {
        let n = chain(CompressorKind::FixedRatio, ControlLaw::ValveActuated, 2.0);
        assert_eq!(n.state_len(), 20);
        assert_eq!(n.residual_len(), 24);
        assert_eq!(n.state_offsets(), &[0, 10, 20]);
        assert_eq!(n.residual_offsets(), &[0, 12, 24]);
        assert_eq!(n.energy().shape(), (24, 20));
        assert_eq!(n.skew().shape(), (24, 24));
        assert!(n.skew().is_antisymmetric(0.0));
    }

    #[test]
    fn downstream_temperature_is_compressed() {
        let n = chain(CompressorKind::FixedRatio, ControlLaw::ValveActuated, 2.0);
        let scale = n.pipes()[1].temperature().value / n.pipes()[0].temperature().value;
        assert!((scale - 2.0_f64.powf(0.3 / 1.3)).abs() < 1e-12);
    }

    #[test]
    fn rejects_wrong_pipe_count() {
        let pipe = DiscretePipe::new("p", geometry(), 4, k(300.0), GasConstant::default()).unwrap();
        let compressor =
            Compressor::new(CompressorKind::FixedRatio, ControlLaw::ValveActuated, 2.0, 1.3)
                .unwrap();
        let err = Network::new("n", vec![pipe], compressor).unwrap_err();
        assert!(matches!(err, NetworkError::Topology { .. }));
    }

    #[test]
    fn state_split_round_trip() {
        let mut n = chain(CompressorKind::FixedRatio, ControlLaw::MassFlowActuated, 1.5);
        let state: Vec<Real> = (0..20).map(|i| 10.0 + i as Real).collect();
        n.set_state(&state).unwrap();
        assert_eq!(n.state(), state);
        assert_eq!(n.pipes()[0].density(), &state[0..5]);
        assert_eq!(n.pipes()[0].momentum(), &state[5..10]);
        assert_eq!(n.pipes()[1].density(), &state[10..15]);
        assert_eq!(n.pipes()[1].momentum(), &state[15..20]);
        assert!(n.set_state(&state[..19]).is_err());
    }

    #[test]
    fn fixed_ratio_coupling_entries() {
        let mut n = chain(CompressorKind::FixedRatio, ControlLaw::ValveActuated, 2.0);
        let guess = seeded(&mut n);
        let terms = n.terms(&guess).unwrap();
        let p_pre = guess[4] * n.pipes()[0].rt();
        assert_eq!(terms.input.get(11, 1), Some(-guess[15]));
        assert_eq!(terms.input.get(22, 2), Some(p_pre));
        assert_eq!(terms.input.get(10, 0), Some(1.0));
        assert_eq!(terms.input.get(23, 3), Some(1.0));
        assert_eq!(terms.compression_ratio, Some(2.0));
    }

    #[test]
    fn fixed_pressure_valve_scales_momentum_coupling() {
        let mut n = chain(
            CompressorKind::FixedOutletPressure,
            ControlLaw::ValveActuated,
            60.0e5,
        );
        let guess = seeded(&mut n);
        let terms = n.terms(&guess).unwrap();
        let p_pre = guess[4] * n.pipes()[0].rt();
        let expected = -guess[15] * p_pre.powf(1.0 / 1.3);
        let got = terms.input.get(11, 1).unwrap();
        assert!((got - expected).abs() <= 1e-12 * expected.abs());
        assert_eq!(terms.input.get(22, 2), Some(1.0));
        let ratio = terms.compression_ratio.unwrap();
        assert!((ratio - 60.0e5 / p_pre).abs() < 1e-12);
        assert!((n.compressor().compression_ratio() - 1.2).abs() < 1e-12);
    }

    #[test]
    fn fixed_pressure_mass_flow_coupling_switch() {
        let mut plain = chain(
            CompressorKind::FixedOutletPressure,
            ControlLaw::MassFlowActuated,
            60.0e5,
        );
        let guess = seeded(&mut plain);
        let unscaled = plain.terms(&guess).unwrap();
        assert_eq!(unscaled.input.get(11, 1), Some(-guess[15]));
        assert_eq!(plain.boundary_inputs(50.0e5, 400.0)[1], 1.0);

        let compressor = plain
            .compressor()
            .clone()
            .with_mass_flow_coupling(MassFlowCoupling::PressureScaled);
        *plain.compressor_mut() = compressor;
        let scaled = plain.terms(&guess).unwrap();
        assert_ne!(scaled.input.get(11, 1), Some(-guess[15]));
        assert!(plain.boundary_inputs(50.0e5, 400.0)[1] < 1.0);
    }

    #[test]
    fn evaluation_leaves_owned_state_alone() {
        let mut n = chain(
            CompressorKind::FixedOutletPressure,
            ControlLaw::ValveActuated,
            60.0e5,
        );
        let guess = seeded(&mut n);
        let ratio = n.compressor().compression_ratio();
        let perturbed: Vec<Real> = guess.iter().map(|v| v * 0.9).collect();
        let terms = n.terms(&perturbed).unwrap();
        assert_ne!(terms.compression_ratio, Some(ratio));
        assert_eq!(n.compressor().compression_ratio(), ratio);
        assert_eq!(n.state(), guess);
    }

    #[test]
    fn set_state_updates_fixed_pressure_ratio() {
        let mut n = chain(
            CompressorKind::FixedOutletPressure,
            ControlLaw::MassFlowActuated,
            60.0e5,
        );
        let mut guess = seeded(&mut n);
        let rt = n.pipes()[0].rt();
        guess[4] = 40.0e5 / rt;
        n.set_state(&guess).unwrap();
        assert!((n.compressor().compression_ratio() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn initial_guess_layout() {
        let mut n = chain(CompressorKind::FixedRatio, ControlLaw::ValveActuated, 2.0);
        let guess = n.uniform_initial_guess(50.0e5, 400.0).unwrap();
        let up_rt = n.pipes()[0].rt();
        let down_rt = n.pipes()[1].rt();
        let momentum_scale = 2.0_f64.powf(1.0 / 1.3);
        assert_eq!(guess.len(), 20);
        assert_eq!(guess[0], 50.0e5 / up_rt);
        assert_eq!(guess[5], 400.0 / momentum_scale);
        assert_eq!(guess[10], 50.0e5 * 2.0 / down_rt);
        assert_eq!(guess[19], 400.0);
    }

    #[test]
    fn fixed_pressure_guess_uses_construction_scales() {
        let mut n = chain(
            CompressorKind::FixedOutletPressure,
            ControlLaw::ValveActuated,
            60.0e5,
        );
        assert_eq!(n.compressor().compression_ratio(), 1.0);
        let guess = n.uniform_initial_guess(50.0e5, 400.0).unwrap();

        let rt = n.pipes()[0].rt();
        assert_eq!(n.pipes()[1].rt(), rt);
        assert_eq!(n.pipes()[1].temperature().value, 300.0);
        assert_eq!(guess[5], 400.0);
        assert_eq!(guess[10], 50.0e5 / rt);
        assert!((n.compressor().compression_ratio() - 1.2).abs() < 1e-12);
    }

    #[test]
    fn boundary_inputs_and_pinning() {
        let n = chain(CompressorKind::FixedRatio, ControlLaw::ValveActuated, 2.0);
        let u = n.boundary_inputs(50.0e5, 463.33);
        assert_eq!(u.len(), n.input_len());
        assert_eq!(u[0], 50.0e5);
        assert!((u[1] - 1.0 / 2.0_f64.powf(1.0 / 1.3)).abs() < 1e-15);
        assert_eq!(u[2], 2.0);
        assert_eq!(u[3], -463.33);

        let mut guess = vec![1.0; 20];
        n.pin_boundary(&mut guess, 50.0e5, 463.33).unwrap();
        assert_eq!(guess[0], 50.0e5 / n.pipes()[0].rt());
        assert_eq!(guess[19], 463.33);
        assert!(n.pin_boundary(&mut guess[..3], 1.0, 1.0).is_err());
    }

    #[test]
    fn snapshot_lists_both_pipes() {
        let mut n = chain(CompressorKind::FixedRatio, ControlLaw::ValveActuated, 2.0);
        seeded(&mut n);
        let snap = n.snapshot(0.0);
        assert_eq!(snap.pipes.len(), 2);
        assert_eq!(snap.compression_ratio, Some(2.0));
        let row = snap.summary().unwrap();
        assert!((row.inlet_pressure_bar - 50.0).abs() < 1e-9);
        assert!((row.outlet_pressure_bar - 100.0).abs() < 1e-9);
    }
}
