//! Result trees produced by method calls.
//!
//! Native calls produce a single [`LeafNode`]; DSL method calls compose
//! sub-results into an [`OpNode`].

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ast::Literal;
use crate::outcome::{AccessResult, Duration, Outcomes};

/// Value track of a variable state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OutcomeValue {
    /// No value (empty outcome)
    Nil,
    /// Boolean outcomes
    Bool(Outcomes<bool>),
    /// Integer outcomes
    Int(Outcomes<i64>),
    /// Float outcomes
    Float(Outcomes<f64>),
    /// String outcomes
    Str(Outcomes<String>),
    /// Duration outcomes
    Duration(Outcomes<Duration>),
}

impl fmt::Display for OutcomeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeValue::Nil => f.write_str("nil"),
            OutcomeValue::Bool(outcomes) => write!(f, "{}", outcomes),
            OutcomeValue::Int(outcomes) => write!(f, "{}", outcomes),
            OutcomeValue::Float(outcomes) => write!(f, "{}", outcomes),
            OutcomeValue::Str(outcomes) => write!(f, "{}", outcomes),
            OutcomeValue::Duration(outcomes) => write!(f, "{}", outcomes),
        }
    }
}

/// A value distribution paired with its latency distribution.
///
/// Both tracks carry the same weights bucket for bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarState {
    /// Value track
    pub value: OutcomeValue,
    /// Latency track
    pub latency: Outcomes<Duration>,
}

impl VarState {
    /// The state of an operation that produced nothing.
    pub fn nil() -> Self {
        Self {
            value: OutcomeValue::Nil,
            latency: Outcomes::new(),
        }
    }

    /// Whether this is the nil state.
    pub fn is_nil(&self) -> bool {
        matches!(self.value, OutcomeValue::Nil)
    }

    /// Deterministic state holding a literal, with zero latency.
    pub fn from_literal(literal: &Literal) -> Self {
        let value = match literal {
            Literal::Int(v) => OutcomeValue::Int(Outcomes::deterministic(*v)),
            Literal::Float(v) => OutcomeValue::Float(Outcomes::deterministic(*v)),
            Literal::Bool(v) => OutcomeValue::Bool(Outcomes::deterministic(*v)),
            Literal::String(v) => OutcomeValue::Str(Outcomes::deterministic(v.clone())),
            Literal::Duration(v) => OutcomeValue::Duration(Outcomes::deterministic(*v)),
        };
        Self {
            value,
            latency: Outcomes::deterministic(Duration::ZERO),
        }
    }
}

impl fmt::Display for VarState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nil() {
            return f.write_str("nil");
        }
        write!(f, "value={} latency={}", self.value, self.latency)
    }
}

/// Conversion of a host return value into a [`VarState`].
pub trait IntoVarState {
    /// Convert into a variable state.
    fn into_var_state(self) -> VarState;
}

impl IntoVarState for VarState {
    fn into_var_state(self) -> VarState {
        self
    }
}

fn zero_latency<V>(outcomes: &Outcomes<V>) -> Outcomes<Duration> {
    outcomes.map(|_| Duration::ZERO)
}

impl IntoVarState for Outcomes<AccessResult> {
    fn into_var_state(self) -> VarState {
        if self.is_empty() {
            return VarState::nil();
        }
        VarState {
            value: OutcomeValue::Bool(self.map(|access| access.success)),
            latency: self.map(|access| access.latency),
        }
    }
}

impl IntoVarState for Outcomes<Duration> {
    /// A pure delay: the value is `true`, the latency is the outcome itself.
    fn into_var_state(self) -> VarState {
        if self.is_empty() {
            return VarState::nil();
        }
        VarState {
            value: OutcomeValue::Bool(self.map(|_| true)),
            latency: self,
        }
    }
}

macro_rules! zero_latency_state {
    ($ty:ty, $variant:ident) => {
        impl IntoVarState for Outcomes<$ty> {
            fn into_var_state(self) -> VarState {
                if self.is_empty() {
                    return VarState::nil();
                }
                VarState {
                    latency: zero_latency(&self),
                    value: OutcomeValue::$variant(self),
                }
            }
        }
    };
}

zero_latency_state!(bool, Bool);
zero_latency_state!(i64, Int);
zero_latency_state!(f64, Float);
zero_latency_state!(String, Str);

/// Result of a single native call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafNode {
    /// The lifted state
    pub state: VarState,
}

impl LeafNode {
    /// Wrap an existing state.
    pub fn new(state: VarState) -> Self {
        Self { state }
    }

    /// Lift a host return value into a leaf.
    pub fn lift<O: IntoVarState>(outcome: O) -> Self {
        Self::new(outcome.into_var_state())
    }
}

/// Composition of sub-results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OpNode {
    /// Nothing was produced
    Nil,
    /// Sub-results in evaluation order
    Sequence(Vec<ResultNode>),
}

/// A node of the result tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResultNode {
    /// Outcome distribution of a native call
    Leaf(LeafNode),
    /// Composition produced by a DSL method
    Op(OpNode),
}

impl ResultNode {
    /// The leaf, if this node is one.
    pub fn as_leaf(&self) -> Option<&LeafNode> {
        match self {
            ResultNode::Leaf(leaf) => Some(leaf),
            ResultNode::Op(_) => None,
        }
    }

    /// Build the node for a DSL method body from its statement results.
    pub fn compose(mut results: Vec<ResultNode>) -> Self {
        match results.len() {
            0 => ResultNode::Op(OpNode::Nil),
            1 => results.remove(0),
            _ => ResultNode::Op(OpNode::Sequence(results)),
        }
    }
}

impl From<LeafNode> for ResultNode {
    fn from(leaf: LeafNode) -> Self {
        ResultNode::Leaf(leaf)
    }
}

impl fmt::Display for ResultNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultNode::Leaf(leaf) => write!(f, "{}", leaf.state),
            ResultNode::Op(OpNode::Nil) => f.write_str("nil"),
            ResultNode::Op(OpNode::Sequence(children)) => {
                f.write_str("[")?;
                for (idx, child) in children.iter().enumerate() {
                    if idx > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{}", child)?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_result_splits_into_value_and_latency() {
        let outcomes = Outcomes::new()
            .add(0.9, AccessResult::new(true, Duration::millis(1.0)))
            .add(0.1, AccessResult::new(false, Duration::millis(10.0)));
        let state = outcomes.into_var_state();

        match &state.value {
            OutcomeValue::Bool(values) => {
                assert_eq!(values.len(), 2);
                assert!(values.buckets[0].value);
                assert!(!values.buckets[1].value);
                assert_eq!(values.buckets[1].weight, 0.1);
            }
            other => panic!("expected bool track, got {:?}", other),
        }
        assert_eq!(state.latency.buckets[1].value, Duration::millis(10.0));
        assert_eq!(state.latency.buckets[0].weight, 0.9);
    }

    #[test]
    fn duration_outcome_becomes_latency() {
        let state = Outcomes::deterministic(Duration::millis(5.0)).into_var_state();
        assert_eq!(state.value, OutcomeValue::Bool(Outcomes::deterministic(true)));
        assert_eq!(state.latency.value(), Some(&Duration::millis(5.0)));
    }

    #[test]
    fn plain_values_have_zero_latency() {
        let state = Outcomes::new().add(3.0, 7_i64).add(1.0, 9).into_var_state();
        assert_eq!(state.latency.len(), 2);
        assert!(state.latency.iter().all(|b| b.value == Duration::ZERO));
        assert_eq!(state.latency.buckets[0].weight, 3.0);
    }

    #[test]
    fn empty_outcome_lifts_to_nil() {
        let leaf = LeafNode::lift(Outcomes::<bool>::new());
        assert!(leaf.state.is_nil());
    }

    #[test]
    fn compose_collapses_single_result() {
        let leaf = ResultNode::from(LeafNode::lift(Outcomes::deterministic(true)));
        assert_eq!(ResultNode::compose(vec![leaf.clone()]), leaf);
        assert_eq!(ResultNode::compose(Vec::new()), ResultNode::Op(OpNode::Nil));
        assert!(matches!(
            ResultNode::compose(vec![leaf.clone(), leaf]),
            ResultNode::Op(OpNode::Sequence(children)) if children.len() == 2
        ));
    }
}
