//! GateRunRecord round-trip integration tests.
//!
//! Captures a live network run as a GateRunRecord, serialises it to JSON,
//! deserialises it back and checks that every column survives.

#[cfg(feature = "serde")]
mod tests {
    use bfip_core::gates::topologies::{chain_stage, memory_chain};
    use bfip_core::gates::{GateNetwork, GateNode, WindowAnchor};
    use bfip_core::gates::{AmplitudeSource, ControlSignal};
    use bfip_core::record::{GateRunRecord, GATE_RUN_RECORD_VERSION};
    use bfip_core::{ActivationRule, Error, GateEvaluator, GateRun};

    // ── Helpers ──────────────────────────────────────────────────────────────

    fn evaluator() -> GateEvaluator {
        GateEvaluator::new()
            .with_anchor(WindowAnchor::Fixed(0.0))
            .with_rule(ActivationRule::dynamic_model().with_information_threshold(0.5))
    }

    /// Two-stage chain plus an input node, three steps.
    fn make_run() -> GateRun {
        let mut network = memory_chain(2, evaluator()).unwrap();
        network
            .add(GateNode::input("clock", AmplitudeSource::Control(ControlSignal::Constant(0.3))))
            .unwrap();
        network.run(&[0.0, 20.0, 45.0]).unwrap()
    }

    fn close(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-12)
    }

    fn close_opt(a: &[Option<f64>], b: &[Option<f64>]) -> bool {
        a.len() == b.len()
            && a.iter().zip(b).all(|pair| match pair {
                (Some(x), Some(y)) => (x - y).abs() < 1e-12,
                (None, None) => true,
                _ => false,
            })
    }

    // ── Capture ──────────────────────────────────────────────────────────────

    #[test]
    fn test_record_captures_columns() {
        let run = make_run();
        let record = GateRunRecord::from_run(&run);

        assert_eq!(record.version, GATE_RUN_RECORD_VERSION);
        assert_eq!(record.node_count(), 3);
        assert_eq!(record.times, vec![0.0, 20.0, 45.0]);
        assert!(record.validate().is_ok());

        let stage0 = record.find_node(&chain_stage(0)).unwrap();
        assert_eq!(stage0.active, run.states(&chain_stage(0)).unwrap());
        assert!(stage0.occupancy.iter().all(Option::is_some));

        let clock = record.find_node("clock").unwrap();
        assert_eq!(clock.amplitude, vec![0.3; 3]);
        assert!(clock.occupancy.iter().all(Option::is_none));
        assert!(clock.free_energy.iter().all(Option::is_none));
        assert!(record.find_node("missing").is_none());
    }

    // ── Round trip ───────────────────────────────────────────────────────────

    #[test]
    fn test_json_round_trip() {
        let record = GateRunRecord::from_run(&make_run());
        let json = serde_json::to_string(&record).unwrap();
        let restored: GateRunRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.version, record.version);
        assert!(close(&restored.times, &record.times));
        assert_eq!(restored.node_count(), record.node_count());
        for (a, b) in restored.nodes.iter().zip(&record.nodes) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.active, b.active);
            assert!(close(&a.amplitude, &b.amplitude), "amplitude of {}", a.name);
            assert!(close_opt(&a.occupancy, &b.occupancy), "occupancy of {}", a.name);
            assert!(close_opt(&a.mutual_information, &b.mutual_information), "information of {}", a.name);
            assert!(close_opt(&a.free_energy, &b.free_energy), "free energy of {}", a.name);
        }
        assert!(restored.validate().is_ok());
    }

    #[test]
    fn test_run_itself_serialises() {
        let run = make_run();
        let json = serde_json::to_string(&run).unwrap();
        assert!(json.contains("\"stage1\""));
        let restored: GateRun = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.nodes.len(), run.nodes.len());
    }

    // ── Validation ───────────────────────────────────────────────────────────

    #[test]
    fn test_validate_rejects_ragged_columns() {
        let mut record = GateRunRecord::from_run(&make_run());
        record.nodes[1].active.pop();
        assert!(matches!(record.validate(), Err(Error::ShapeMismatch(_))));
    }

    #[test]
    fn test_validate_rejects_unknown_version() {
        let mut record = GateRunRecord::from_run(&make_run());
        record.version = GATE_RUN_RECORD_VERSION + 1;
        assert!(matches!(record.validate(), Err(Error::InvalidParameter { .. })));
    }

    #[test]
    fn test_network_description_round_trips() {
        let network = GateNetwork::new(evaluator())
            .with_node(GateNode::gate("a", AmplitudeSource::Control(ControlSignal::Constant(0.5))).latched())
            .unwrap();
        let json = serde_json::to_string(&network.nodes()[0]).unwrap();
        let node: GateNode = serde_json::from_str(&json).unwrap();
        assert_eq!(node.name, "a");
        assert!(node.latched);
    }
}
