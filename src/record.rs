//! Portable record of a gate-network run for persistence and transport.
//!
//! # Layout
//!
//! ```text
//! GateRunRecord
//!   version:  u16 = 1
//!   times:    [f64]            grid times, one per step
//!   nodes:    [NodeRecord]     declaration order
//!     name
//!     amplitude:           [f64]
//!     active:              [bool]
//!     occupancy:           [Option<f64>]   None for input nodes
//!     mutual_information:  [Option<f64>]   None for input nodes and indeterminate steps
//!     free_energy:         [Option<f64>]   None for input nodes
//! ```
//!
//! Columns are stored per node rather than per step so the record maps
//! directly onto a table. This module requires the `serde` feature.
//!
//! [`GateRun`]: crate::gates::GateRun

use crate::error::{Error, Result};
use crate::gates::{GateRun, NodeSeries};
use crate::phase::PhaseMetrics;

/// Current record format version.
pub const GATE_RUN_RECORD_VERSION: u16 = 1;

/// Column-oriented snapshot of a [`GateRun`].
///
/// # Example
///
/// ```rust,ignore
/// use bfip_core::record::GateRunRecord;
///
/// let record = GateRunRecord::from_run(&run);
/// let json = serde_json::to_string(&record).unwrap();
/// let restored: GateRunRecord = serde_json::from_str(&json).unwrap();
/// ```
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct GateRunRecord {
    /// Format version, [`GATE_RUN_RECORD_VERSION`] for new records.
    pub version: u16,
    /// Grid times.
    pub times: Vec<f64>,
    /// One entry per node, in declaration order.
    pub nodes: Vec<NodeRecord>,
}

/// Columns of one node.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct NodeRecord {
    /// Node name.
    pub name: String,
    /// Driving amplitude per step.
    pub amplitude: Vec<f64>,
    /// State per step.
    pub active: Vec<bool>,
    /// Occupancy statistic per step.
    pub occupancy: Vec<Option<f64>>,
    /// Mutual information per step.
    pub mutual_information: Vec<Option<f64>>,
    /// ΔG per step.
    pub free_energy: Vec<Option<f64>>,
}

impl NodeRecord {
    fn from_series(series: &NodeSeries) -> Self {
        let metric = |f: fn(&PhaseMetrics) -> Option<f64>| -> Vec<Option<f64>> {
            series
                .steps
                .iter()
                .map(|s| s.metrics.as_ref().and_then(f))
                .collect()
        };
        Self {
            name: series.name.clone(),
            amplitude: series.amplitudes(),
            active: series.states(),
            occupancy: metric(|m| Some(m.occupancy)),
            mutual_information: metric(|m| m.mutual_information),
            free_energy: metric(|m| Some(m.free_energy)),
        }
    }

    fn steps(&self) -> usize {
        self.amplitude.len()
    }
}

impl GateRunRecord {
    /// Capture a run.
    pub fn from_run(run: &GateRun) -> Self {
        Self {
            version: GATE_RUN_RECORD_VERSION,
            times: run.times.clone(),
            nodes: run.nodes.iter().map(NodeRecord::from_series).collect(),
        }
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Columns of node `name`.
    pub fn find_node(&self, name: &str) -> Option<&NodeRecord> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Check the version and that every column has one entry per time.
    pub fn validate(&self) -> Result<()> {
        if self.version != GATE_RUN_RECORD_VERSION {
            return Err(Error::invalid(
                "version",
                format!("unsupported record version {}", self.version),
            ));
        }
        let steps = self.times.len();
        for node in &self.nodes {
            let lengths = [
                node.steps(),
                node.active.len(),
                node.occupancy.len(),
                node.mutual_information.len(),
                node.free_energy.len(),
            ];
            if lengths.iter().any(|&l| l != steps) {
                return Err(Error::ShapeMismatch(format!(
                    "node `{}` has columns of lengths {:?} for {} times",
                    node.name, lengths, steps
                )));
            }
        }
        Ok(())
    }
}
