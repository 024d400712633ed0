/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Time-stepped networks of gates.
//!
//! A [`GateNetwork`] is an ordered list of named nodes. At every grid time the
//! nodes are visited in declaration order; each resolves its driving amplitude
//! from its [`AmplitudeSource`], evaluates a binding window if it is a gate,
//! and appends a [`NodeStep`] to its series.
//!
//! # Causality
//!
//! A [`NodeRef`] with `lag = 0` reads the value produced in the current step
//! and must name a node declared earlier. A reference with `lag ≥ 1` may name
//! any node, including the reading node itself. Before the first step a
//! delayed reference reads zero amplitude, zero occupancy and an inactive state.

use hashbrown::HashMap;
use heapless::HistoryBuffer;
use tracing::{debug, info, trace};

use super::control::ControlSignal;
use super::evaluator::GateEvaluator;
use crate::error::{ensure_finite, ensure_positive, Error, Result};
use crate::phase::{ActivationLatch, PhaseMetrics};
use crate::solver::validate_grid;

/// Number of past information values averaged by an information bootstrap.
pub const BOOTSTRAP_HISTORY: usize = 5;

// ─── Wiring ──────────────────────────────────────────────────────────────────

/// Reference to another node's output, optionally delayed.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeRef {
    /// Name of the referenced node.
    pub name: String,
    /// Steps of delay; 0 reads the current step.
    pub lag: usize,
}

impl NodeRef {
    /// Same-step reference.
    pub fn current(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lag: 0,
        }
    }

    /// Reference delayed by `lag` steps.
    pub fn delayed(name: impl Into<String>, lag: usize) -> Self {
        Self {
            name: name.into(),
            lag,
        }
    }
}

/// How a node obtains its driving amplitude.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AmplitudeSource {
    /// An external control signal.
    Control(ControlSignal),
    /// scale·amplitude(node) + offset.
    Affine {
        /// Source node.
        node: NodeRef,
        /// Multiplier.
        scale: f64,
        /// Added after scaling.
        offset: f64,
    },
    /// Mean of the referenced nodes' amplitudes.
    MeanAmplitude(Vec<NodeRef>),
    /// `high` when every referenced node is active, otherwise `low`.
    Conjunction {
        /// Nodes whose states are combined.
        inputs: Vec<NodeRef>,
        /// Amplitude when all inputs are active.
        high: f64,
        /// Amplitude otherwise.
        low: f64,
    },
    /// The occupancy statistic of another node.
    Occupancy(NodeRef),
    /// A carrier signal raised by the node's own recent information.
    ///
    /// Once [`BOOTSTRAP_HISTORY`] values are recorded the amplitude is
    /// carrier(t) + gain·(clip(mean, lo, hi) − lo)/(hi − lo); indeterminate
    /// information counts as zero.
    InformationBootstrap {
        /// Signal before any feedback.
        carrier: ControlSignal,
        /// Largest amplitude boost.
        gain: f64,
        /// Clip range of the averaged information.
        clip: (f64, f64),
    },
}

impl AmplitudeSource {
    fn references(&self) -> Vec<&NodeRef> {
        match self {
            AmplitudeSource::Control(_) | AmplitudeSource::InformationBootstrap { .. } => Vec::new(),
            AmplitudeSource::Affine { node, .. } | AmplitudeSource::Occupancy(node) => vec![node],
            AmplitudeSource::MeanAmplitude(nodes) => nodes.iter().collect(),
            AmplitudeSource::Conjunction { inputs, .. } => inputs.iter().collect(),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            AmplitudeSource::Control(signal) => signal.validate(),
            AmplitudeSource::Affine { scale, offset, .. } => {
                ensure_finite("scale", *scale)?;
                ensure_finite("offset", *offset)
            }
            AmplitudeSource::MeanAmplitude(nodes) => {
                if nodes.is_empty() {
                    Err(Error::InvalidWiring("mean of no inputs".into()))
                } else {
                    Ok(())
                }
            }
            AmplitudeSource::Conjunction { inputs, high, low } => {
                if inputs.is_empty() {
                    return Err(Error::InvalidWiring("conjunction of no inputs".into()));
                }
                ensure_finite("high", *high)?;
                ensure_finite("low", *low)
            }
            AmplitudeSource::Occupancy(_) => Ok(()),
            AmplitudeSource::InformationBootstrap { carrier, gain, clip } => {
                carrier.validate()?;
                ensure_finite("gain", *gain)?;
                ensure_finite("clip_low", clip.0)?;
                ensure_finite("clip_high", clip.1)?;
                if clip.1 > clip.0 {
                    Ok(())
                } else {
                    Err(Error::invalid("clip", format!("empty range {:?}", clip)))
                }
            }
        }
    }
}

/// Hill-exponent retention after a successful evaluation.
///
/// A passing step sets the exponent to `boosted_hill`; every later failing
/// step multiplies it by `decay`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Retention {
    /// Exponent after a pass.
    pub boosted_hill: f64,
    /// Per-step multiplier while retained.
    pub decay: f64,
}

impl Default for Retention {
    fn default() -> Self {
        Self {
            boosted_hill: 1.25,
            decay: 0.999,
        }
    }
}

/// What a node does with its amplitude.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeKind {
    /// Carries an amplitude, evaluates nothing.
    Input(AmplitudeSource),
    /// Evaluates a binding window at its amplitude.
    Gate(AmplitudeSource),
    /// Evaluates two parallel windows at the amplitudes of two other nodes.
    Comparator {
        /// First input.
        first: NodeRef,
        /// Second input.
        second: NodeRef,
        /// Occupancy difference that must be exceeded.
        threshold: f64,
    },
}

/// A named node with its evaluation options.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GateNode {
    /// Unique node name.
    pub name: String,
    /// Behaviour.
    pub kind: NodeKind,
    /// Hold the active state while occupancy and free energy stay favourable.
    pub latched: bool,
    /// Optional Hill retention.
    pub retention: Option<Retention>,
    /// Overrides the network's evaluator.
    pub evaluator: Option<GateEvaluator>,
}

impl GateNode {
    fn with_kind(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            latched: false,
            retention: None,
            evaluator: None,
        }
    }

    /// Amplitude-only node.
    pub fn input(name: impl Into<String>, source: AmplitudeSource) -> Self {
        Self::with_kind(name, NodeKind::Input(source))
    }

    /// Gate driven by `source`.
    pub fn gate(name: impl Into<String>, source: AmplitudeSource) -> Self {
        Self::with_kind(name, NodeKind::Gate(source))
    }

    /// Comparator over the amplitudes of `first` and `second`.
    pub fn comparator(name: impl Into<String>, first: NodeRef, second: NodeRef, threshold: f64) -> Self {
        Self::with_kind(
            name,
            NodeKind::Comparator {
                first,
                second,
                threshold,
            },
        )
    }

    /// Enable latching.
    pub fn latched(mut self) -> Self {
        self.latched = true;
        self
    }

    /// Enable Hill retention.
    pub fn with_retention(mut self, retention: Retention) -> Self {
        self.retention = Some(retention);
        self
    }

    /// Use a node-specific evaluator.
    pub fn with_evaluator(mut self, evaluator: GateEvaluator) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    fn references(&self) -> Vec<&NodeRef> {
        match &self.kind {
            NodeKind::Input(source) | NodeKind::Gate(source) => source.references(),
            NodeKind::Comparator { first, second, .. } => vec![first, second],
        }
    }
}

// ─── Results ─────────────────────────────────────────────────────────────────

/// One node's output at one grid time.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeStep {
    /// Driving amplitude (the first input's amplitude for comparators).
    pub amplitude: f64,
    /// Classifier inputs, `None` for input nodes.
    pub metrics: Option<PhaseMetrics>,
    /// State after latching.
    pub active: bool,
}

impl NodeStep {
    const INITIAL: NodeStep = NodeStep {
        amplitude: 0.0,
        metrics: None,
        active: false,
    };

    /// Occupancy statistic, zero for input nodes.
    pub fn occupancy(&self) -> f64 {
        self.metrics.map_or(0.0, |m| m.occupancy)
    }
}

/// The series of one node.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeSeries {
    /// Node name.
    pub name: String,
    /// One entry per grid time.
    pub steps: Vec<NodeStep>,
}

impl NodeSeries {
    /// Amplitude series.
    pub fn amplitudes(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.amplitude).collect()
    }

    /// State series.
    pub fn states(&self) -> Vec<bool> {
        self.steps.iter().map(|s| s.active).collect()
    }

    /// Occupancy-statistic series.
    pub fn occupancy(&self) -> Vec<f64> {
        self.steps.iter().map(NodeStep::occupancy).collect()
    }

    /// Information series; `None` where indeterminate or not evaluated.
    pub fn mutual_information(&self) -> Vec<Option<f64>> {
        self.steps
            .iter()
            .map(|s| s.metrics.and_then(|m| m.mutual_information))
            .collect()
    }

    /// Number of active steps.
    pub fn active_count(&self) -> usize {
        self.steps.iter().filter(|s| s.active).count()
    }
}

/// Output of [`GateNetwork::run`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GateRun {
    /// Grid times.
    pub times: Vec<f64>,
    /// Series in declaration order.
    pub nodes: Vec<NodeSeries>,
}

impl GateRun {
    /// Series of node `name`.
    pub fn node(&self, name: &str) -> Option<&NodeSeries> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// State series of node `name`.
    pub fn states(&self, name: &str) -> Result<Vec<bool>> {
        self.node(name)
            .map(NodeSeries::states)
            .ok_or_else(|| Error::UnknownNode(name.to_string()))
    }

    /// Per-step code of the named nodes' states, first name most significant.
    pub fn packed_codes(&self, names: &[&str]) -> Result<Vec<u8>> {
        if names.len() > 8 {
            return Err(Error::invalid("names", format!("at most 8 bits, got {}", names.len())));
        }
        let series = names
            .iter()
            .map(|name| self.node(name).ok_or_else(|| Error::UnknownNode(name.to_string())))
            .collect::<Result<Vec<_>>>()?;
        Ok((0..self.times.len())
            .map(|k| super::pack_states(series.iter().map(|s| s.steps[k].active)))
            .collect())
    }
}

// ─── Network ─────────────────────────────────────────────────────────────────

struct NodeRuntime {
    latch: Option<ActivationLatch>,
    hill: f64,
    retained: bool,
    information: HistoryBuffer<f64, BOOTSTRAP_HISTORY>,
}

/// Ordered, named gates sharing a default evaluator.
#[derive(Clone, Debug, Default)]
pub struct GateNetwork {
    evaluator: GateEvaluator,
    nodes: Vec<GateNode>,
    index: HashMap<String, usize>,
}

impl GateNetwork {
    /// Empty network whose gates use `evaluator` unless overridden.
    pub fn new(evaluator: GateEvaluator) -> Self {
        Self {
            evaluator,
            nodes: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Append a node. Names must be unique.
    pub fn add(&mut self, node: GateNode) -> Result<&mut Self> {
        if self.index.contains_key(&node.name) {
            return Err(Error::InvalidWiring(format!("duplicate node `{}`", node.name)));
        }
        self.index.insert(node.name.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(self)
    }

    /// Builder form of [`add`](Self::add).
    pub fn with_node(mut self, node: GateNode) -> Result<Self> {
        self.add(node)?;
        Ok(self)
    }

    /// Declared nodes.
    pub fn nodes(&self) -> &[GateNode] {
        &self.nodes
    }

    /// Default evaluator.
    pub fn evaluator(&self) -> &GateEvaluator {
        &self.evaluator
    }

    /// Check names, causality and every parameter.
    pub fn validate(&self) -> Result<()> {
        self.evaluator.validate()?;
        for (position, node) in self.nodes.iter().enumerate() {
            for reference in node.references() {
                let target = *self
                    .index
                    .get(&reference.name)
                    .ok_or_else(|| Error::UnknownNode(reference.name.clone()))?;
                if reference.lag == 0 && target >= position {
                    return Err(Error::InvalidWiring(format!(
                        "`{}` reads `{}` in the same step but it is not declared earlier",
                        node.name, reference.name
                    )));
                }
            }
            match &node.kind {
                NodeKind::Input(source) | NodeKind::Gate(source) => source.validate()?,
                NodeKind::Comparator { threshold, .. } => ensure_finite("threshold", *threshold)?,
            }
            if let Some(retention) = node.retention {
                ensure_positive("boosted_hill", retention.boosted_hill)?;
                ensure_positive("decay", retention.decay)?;
            }
            if let Some(evaluator) = &node.evaluator {
                evaluator.validate()?;
            }
        }
        Ok(())
    }

    /// Step every node across `grid`.
    pub fn run(&self, grid: &[f64]) -> Result<GateRun> {
        validate_grid(grid)?;
        self.validate()?;

        let mut runtime = self
            .nodes
            .iter()
            .map(|node| {
                let evaluator = node.evaluator.as_ref().unwrap_or(&self.evaluator);
                let rule = match node.kind {
                    NodeKind::Comparator { threshold, .. } => evaluator.rule.with_occupancy_threshold(threshold),
                    _ => evaluator.rule,
                };
                let latch = if node.latched {
                    Some(ActivationLatch::new(rule, evaluator.thermo.temperature)?)
                } else {
                    None
                };
                Ok(NodeRuntime {
                    latch,
                    hill: evaluator.hill_coefficient,
                    retained: false,
                    information: HistoryBuffer::new(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let mut series: Vec<Vec<NodeStep>> = vec![Vec::with_capacity(grid.len()); self.nodes.len()];

        for (k, &t) in grid.iter().enumerate() {
            for (i, node) in self.nodes.iter().enumerate() {
                let evaluator = node
                    .evaluator
                    .unwrap_or(self.evaluator)
                    .with_hill_coefficient(runtime[i].hill);
                let step = match &node.kind {
                    NodeKind::Input(source) => NodeStep {
                        amplitude: self.resolve(source, t, k, &series, &runtime[i])?,
                        metrics: None,
                        active: false,
                    },
                    NodeKind::Gate(source) => {
                        let amplitude = self.resolve(source, t, k, &series, &runtime[i])?;
                        let reading = evaluator.evaluate(t, amplitude)?;
                        let state = &mut runtime[i];
                        state.information.write(reading.mutual_information.unwrap_or(0.0));
                        if let Some(retention) = node.retention {
                            if reading.active {
                                state.retained = true;
                                state.hill = retention.boosted_hill;
                            } else if state.retained {
                                state.hill *= retention.decay;
                            }
                        }
                        NodeStep {
                            amplitude,
                            metrics: Some(reading.metrics()),
                            active: latch_step(state, reading.metrics(), reading.active),
                        }
                    }
                    NodeKind::Comparator {
                        first,
                        second,
                        threshold,
                    } => {
                        let a = self.lookup(first, k, &series)?.amplitude;
                        let b = self.lookup(second, k, &series)?.amplitude;
                        let reading = evaluator.compare(t, a, b, *threshold)?;
                        NodeStep {
                            amplitude: a,
                            metrics: Some(reading.metrics()),
                            active: latch_step(&mut runtime[i], reading.metrics(), reading.active),
                        }
                    }
                };
                let previous = series[i].last().is_some_and(|s| s.active);
                if step.active != previous {
                    debug!(node = %node.name, t, active = step.active, "gate state change");
                }
                trace!(node = %node.name, t, amplitude = step.amplitude, occupancy = step.occupancy(), active = step.active, "gate step");
                series[i].push(step);
            }
        }

        let run = GateRun {
            times: grid.to_vec(),
            nodes: self
                .nodes
                .iter()
                .zip(series)
                .map(|(node, steps)| NodeSeries {
                    name: node.name.clone(),
                    steps,
                })
                .collect(),
        };
        info!(
            nodes = run.nodes.len(),
            steps = grid.len(),
            active = run.nodes.iter().map(NodeSeries::active_count).sum::<usize>(),
            "gate network run complete"
        );
        Ok(run)
    }

    fn lookup<'s>(&self, reference: &NodeRef, k: usize, series: &'s [Vec<NodeStep>]) -> Result<&'s NodeStep> {
        let index = *self
            .index
            .get(&reference.name)
            .ok_or_else(|| Error::UnknownNode(reference.name.clone()))?;
        if k < reference.lag {
            return Ok(&NodeStep::INITIAL);
        }
        series[index]
            .get(k - reference.lag)
            .ok_or_else(|| Error::InvalidWiring(format!("`{}` has no value yet", reference.name)))
    }

    fn resolve(
        &self,
        source: &AmplitudeSource,
        t: f64,
        k: usize,
        series: &[Vec<NodeStep>],
        runtime: &NodeRuntime,
    ) -> Result<f64> {
        Ok(match source {
            AmplitudeSource::Control(signal) => signal.at(t),
            AmplitudeSource::Affine { node, scale, offset } => scale * self.lookup(node, k, series)?.amplitude + offset,
            AmplitudeSource::MeanAmplitude(nodes) => {
                let mut total = 0.0;
                for node in nodes {
                    total += self.lookup(node, k, series)?.amplitude;
                }
                total / nodes.len() as f64
            }
            AmplitudeSource::Conjunction { inputs, high, low } => {
                let mut all = true;
                for input in inputs {
                    all &= self.lookup(input, k, series)?.active;
                }
                if all {
                    *high
                } else {
                    *low
                }
            }
            AmplitudeSource::Occupancy(node) => self.lookup(node, k, series)?.occupancy(),
            AmplitudeSource::InformationBootstrap { carrier, gain, clip } => {
                let base = carrier.at(t);
                if runtime.information.len() < BOOTSTRAP_HISTORY {
                    base
                } else {
                    let average = runtime.information.as_slice().iter().sum::<f64>() / BOOTSTRAP_HISTORY as f64;
                    let (lo, hi) = *clip;
                    base + gain * (average.clamp(lo, hi) - lo) / (hi - lo)
                }
            }
        })
    }
}

fn latch_step(state: &mut NodeRuntime, metrics: PhaseMetrics, memoryless: bool) -> bool {
    match state.latch.as_mut() {
        Some(latch) => latch.step(metrics).active,
        None => memoryless,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::evaluator::WindowAnchor;
    use crate::information::InformationEstimator;
    use crate::phase::ActivationRule;

    fn constant(level: f64) -> AmplitudeSource {
        AmplitudeSource::Control(ControlSignal::Constant(level))
    }

    fn alternating() -> AmplitudeSource {
        AmplitudeSource::Control(ControlSignal::Pulse {
            high: 1.0,
            low: 0.0,
            period: 2.0,
            duty: 0.5,
            offset: 0.0,
        })
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut network = GateNetwork::default();
        network.add(GateNode::input("a", constant(0.5))).unwrap();
        let err = network.add(GateNode::input("a", constant(0.6))).unwrap_err();
        assert!(matches!(err, Error::InvalidWiring(_)), "got {:?}", err);
        assert_eq!(network.nodes().len(), 1);
    }

    #[test]
    fn test_unknown_reference() {
        let network = GateNetwork::default()
            .with_node(GateNode::gate("b", AmplitudeSource::Occupancy(NodeRef::current("ghost"))))
            .unwrap();
        assert!(matches!(network.validate(), Err(Error::UnknownNode(name)) if name == "ghost"));
    }

    #[test]
    fn test_same_step_reference_must_be_earlier() {
        let forward = GateNetwork::default()
            .with_node(GateNode::input("a", AmplitudeSource::MeanAmplitude(vec![NodeRef::current("b")])))
            .unwrap()
            .with_node(GateNode::input("b", constant(0.3)))
            .unwrap();
        assert!(matches!(forward.validate(), Err(Error::InvalidWiring(_))));

        let delayed = GateNetwork::default()
            .with_node(GateNode::input("a", AmplitudeSource::MeanAmplitude(vec![NodeRef::delayed("b", 1)])))
            .unwrap()
            .with_node(GateNode::input("b", constant(0.3)))
            .unwrap();
        assert!(delayed.validate().is_ok());
    }

    #[test]
    fn test_input_wiring_and_delays() {
        let network = GateNetwork::default()
            .with_node(GateNode::input("x", alternating()))
            .unwrap()
            .with_node(GateNode::input(
                "y",
                AmplitudeSource::Affine {
                    node: NodeRef::current("x"),
                    scale: 2.0,
                    offset: 0.5,
                },
            ))
            .unwrap()
            .with_node(GateNode::input(
                "z",
                AmplitudeSource::MeanAmplitude(vec![NodeRef::current("x"), NodeRef::delayed("y", 1)]),
            ))
            .unwrap()
            .with_node(GateNode::input(
                "count",
                AmplitudeSource::Affine {
                    node: NodeRef::delayed("count", 1),
                    scale: 1.0,
                    offset: 1.0,
                },
            ))
            .unwrap();
        let run = network.run(&[0.0, 1.0, 2.0]).unwrap();

        assert_eq!(run.node("x").unwrap().amplitudes(), vec![1.0, 0.0, 1.0]);
        assert_eq!(run.node("y").unwrap().amplitudes(), vec![2.5, 0.5, 2.5]);
        assert_eq!(run.node("z").unwrap().amplitudes(), vec![0.5, 1.25, 0.75]);
        assert_eq!(run.node("count").unwrap().amplitudes(), vec![1.0, 2.0, 3.0]);
        assert_eq!(run.states("z").unwrap(), vec![false; 3]);
        assert!(run.node("z").unwrap().mutual_information().iter().all(Option::is_none));
    }

    #[test]
    fn test_conjunction_of_inactive_inputs_is_low() {
        let network = GateNetwork::default()
            .with_node(GateNode::input("a", constant(0.9)))
            .unwrap()
            .with_node(GateNode::input(
                "c",
                AmplitudeSource::Conjunction {
                    inputs: vec![NodeRef::current("a")],
                    high: 1.0,
                    low: 0.3,
                },
            ))
            .unwrap();
        let run = network.run(&[0.0, 1.0]).unwrap();
        assert_eq!(run.node("c").unwrap().amplitudes(), vec![0.3, 0.3]);
    }

    #[test]
    fn test_packed_codes_arguments() {
        let run = GateNetwork::default()
            .with_node(GateNode::input("a", constant(0.1)))
            .unwrap()
            .run(&[0.0, 1.0])
            .unwrap();
        assert_eq!(run.packed_codes(&["a", "a"]).unwrap(), vec![0, 0]);
        assert!(matches!(run.packed_codes(&["a", "nope"]), Err(Error::UnknownNode(_))));
        assert!(run.packed_codes(&["a"; 9]).is_err());
        assert!(matches!(run.states("nope"), Err(Error::UnknownNode(_))));
    }

    #[test]
    fn test_latched_gate_holds_through_weak_information() {
        // Every window spans [0, 1]. With the covariance estimator the value
        // falls from ~0.019 at amplitude 0.5 to below 0.009 at amplitude 0.2
        // while the mean occupancy stays above 0.05.
        let evaluator = GateEvaluator::new()
            .with_anchor(WindowAnchor::Fixed(0.0))
            .with_estimator(InformationEstimator::CorrelationProxy)
            .with_rule(
                ActivationRule::dynamic_model()
                    .with_occupancy_threshold(0.05)
                    .with_information_threshold(0.01),
            );
        let drive = || {
            AmplitudeSource::Control(ControlSignal::Pulse {
                high: 0.5,
                low: 0.2,
                period: 2.0,
                duty: 0.5,
                offset: 0.0,
            })
        };
        let run = GateNetwork::new(evaluator)
            .with_node(GateNode::gate("held", drive()).latched())
            .unwrap()
            .with_node(GateNode::gate("free", drive()))
            .unwrap()
            .run(&[0.0, 1.0])
            .unwrap();

        assert_eq!(run.states("held").unwrap(), vec![true, true]);
        assert_eq!(run.states("free").unwrap(), vec![true, false]);
        let weak = run.node("free").unwrap().mutual_information()[1].unwrap();
        assert!(weak < 0.01, "got {}", weak);
    }

    #[test]
    fn test_information_bootstrap_boost() {
        let rule = ActivationRule::dynamic_model().with_information_threshold(0.5);
        let run = GateNetwork::new(GateEvaluator::new().with_rule(rule))
            .with_node(GateNode::gate(
                "boot",
                AmplitudeSource::InformationBootstrap {
                    carrier: ControlSignal::Constant(0.5),
                    gain: 0.2,
                    clip: (0.5, 2.5),
                },
            ))
            .unwrap()
            .run(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0])
            .unwrap();
        let amplitudes = run.node("boot").unwrap().amplitudes();
        assert!(amplitudes[..5].iter().all(|&a| a == 0.5));
        // Two-sample windows carry ln 2 nats each.
        let expected = 0.5 + 0.2 * (core::f64::consts::LN_2 - 0.5) / 2.0;
        assert!((amplitudes[5] - expected).abs() < 1e-9, "got {}", amplitudes[5]);
    }

    #[test]
    fn test_retention_boosts_hill() {
        let rule = ActivationRule::dynamic_model().with_information_threshold(0.5);
        let retention = Retention {
            boosted_hill: 2.0,
            decay: 0.5,
        };
        let run = GateNetwork::new(GateEvaluator::new().with_rule(rule))
            .with_node(GateNode::gate("plain", constant(0.5)))
            .unwrap()
            .with_node(GateNode::gate("boosted", constant(0.5)).with_retention(retention))
            .unwrap()
            .run(&[0.0, 1.0])
            .unwrap();
        let plain = run.node("plain").unwrap().occupancy();
        let boosted = run.node("boosted").unwrap().occupancy();
        // Same first window; afterwards L² < L for L < 1 lowers the occupancy.
        assert!((plain[0] - boosted[0]).abs() < 1e-12);
        assert!(boosted[1] < plain[1], "plain {} boosted {}", plain[1], boosted[1]);
    }

    #[test]
    fn test_run_rejects_bad_grid() {
        let network = GateNetwork::default()
            .with_node(GateNode::input("a", constant(0.1)))
            .unwrap();
        assert!(matches!(network.run(&[1.0, 0.5]), Err(Error::InvalidTimeGrid(_))));
    }
}
