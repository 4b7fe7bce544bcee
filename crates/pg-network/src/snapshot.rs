//! Owned-state snapshots for an external writer.

use pg_core::{Real, to_bar};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipeSnapshot {
    pub name: String,
    /// Kelvin.
    pub temperature: Real,
    pub mesh: Vec<Real>,
    pub density: Vec<Real>,
    pub momentum: Vec<Real>,
    /// Pascal, `rho·R·T`.
    pub pressure: Vec<Real>,
}

/// State of every pipe at one accepted time, in pipe order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkSnapshot {
    /// Seconds.
    pub time: Real,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_ratio: Option<Real>,
    pub pipes: Vec<PipeSnapshot>,
}

/// One line of the boundary time series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryRow {
    pub time: Real,
    pub inlet_pressure_bar: Real,
    pub outlet_pressure_bar: Real,
    pub inlet_momentum: Real,
    pub outlet_momentum: Real,
}

impl NetworkSnapshot {
    /// Inlet of the first pipe and outlet of the last one.
    pub fn summary(&self) -> Option<SummaryRow> {
        let first = self.pipes.first()?;
        let last = self.pipes.last()?;
        Some(SummaryRow {
            time: self.time,
            inlet_pressure_bar: to_bar(*first.pressure.first()?),
            outlet_pressure_bar: to_bar(*last.pressure.last()?),
            inlet_momentum: *first.momentum.first()?,
            outlet_momentum: *last.momentum.last()?,
        })
    }
}
