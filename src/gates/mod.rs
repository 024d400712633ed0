//! Logic primitives built from repeated active-phase evaluations.
//!
//! | Module | Content |
//! |---|---|
//! | [`control`] | time-dependent control amplitudes |
//! | [`evaluator`] | one window pair → [`GateReading`] |
//! | [`network`] | named nodes, wiring, latches, retention |
//! | [`topologies`] | preset networks (AND, NOT, register, chain, ...) |

pub mod control;
pub mod evaluator;
pub mod network;
pub mod topologies;

pub use control::ControlSignal;
pub use evaluator::{ComparatorReading, GateEvaluator, GateReading, TwinTrajectory, WindowAnchor};
pub use network::{AmplitudeSource, GateNetwork, GateNode, GateRun, NodeKind, NodeRef, NodeSeries, NodeStep, Retention};

/// Pack boolean states into a code, first state most significant.
///
/// Two ions give `(first << 1) | second`. Only the last eight states fit.
pub fn pack_states<I: IntoIterator<Item = bool>>(states: I) -> u8 {
    states
        .into_iter()
        .fold(0u8, |code, state| (code << 1) | u8::from(state))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_states_first_is_most_significant() {
        assert_eq!(pack_states([true, false]), 0b10);
        assert_eq!(pack_states([false, true]), 0b01);
        assert_eq!(pack_states([true, true, false]), 0b110);
        assert_eq!(pack_states(Vec::new()), 0);
    }
}
