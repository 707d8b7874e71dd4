//! Typed state machines
//!
//! Flat state machines keyed by caller-defined state and event enums.
//! The playback transport (`idle -> playing -> paused -> finished`) is built
//! on this. Transitions are looked up in a hash table; an event with no
//! transition from the current state is ignored.

use rustc_hash::FxHashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Maximum number of transitions kept for debugging
const HISTORY_LIMIT: usize = 64;

/// A transition in the state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition<S, E> {
    pub from_state: S,
    pub event: E,
    pub to_state: S,
}

impl<S, E> Transition<S, E> {
    pub fn new(from: S, event: E, to: S) -> Self {
        Self {
            from_state: from,
            event,
            to_state: to,
        }
    }
}

/// Builder for creating state machines
pub struct StateMachineBuilder<S, E> {
    initial_state: S,
    transitions: Vec<Transition<S, E>>,
}

impl<S, E> StateMachineBuilder<S, E>
where
    S: Copy + Eq + Hash + Debug,
    E: Copy + Eq + Hash + Debug,
{
    pub fn new(initial_state: S) -> Self {
        Self {
            initial_state,
            transitions: Vec::new(),
        }
    }

    /// Add a transition
    pub fn transition(mut self, transition: Transition<S, E>) -> Self {
        self.transitions.push(transition);
        self
    }

    /// Add a simple transition (from, event, to)
    pub fn on(mut self, from: S, event: E, to: S) -> Self {
        self.transitions.push(Transition::new(from, event, to));
        self
    }

    /// Add the same event transition from several states
    pub fn on_any(mut self, from: &[S], event: E, to: S) -> Self {
        for state in from {
            self.transitions.push(Transition::new(*state, event, to));
        }
        self
    }

    /// Build the state machine
    pub fn build(self) -> StateMachine<S, E> {
        StateMachine::new(self.initial_state, self.transitions)
    }
}

/// A state machine instance
#[derive(Clone, Debug)]
pub struct StateMachine<S, E> {
    initial_state: S,
    current_state: S,
    table: FxHashMap<(S, E), S>,
    /// History of state transitions (for debugging)
    history: Vec<(S, E, S)>,
}

impl<S, E> StateMachine<S, E>
where
    S: Copy + Eq + Hash + Debug,
    E: Copy + Eq + Hash + Debug,
{
    /// Create a new state machine with an initial state and transitions.
    /// A later transition for the same `(state, event)` pair replaces an earlier one.
    pub fn new(initial_state: S, transitions: Vec<Transition<S, E>>) -> Self {
        let mut table = FxHashMap::default();
        for t in transitions {
            table.insert((t.from_state, t.event), t.to_state);
        }
        Self {
            initial_state,
            current_state: initial_state,
            table,
            history: Vec::new(),
        }
    }

    /// Create a builder for a state machine
    pub fn builder(initial_state: S) -> StateMachineBuilder<S, E> {
        StateMachineBuilder::new(initial_state)
    }

    /// Get the current state
    pub fn current_state(&self) -> S {
        self.current_state
    }

    /// Check if we're in a specific state
    pub fn is_in(&self, state: S) -> bool {
        self.current_state == state
    }

    /// Get transition history
    pub fn history(&self) -> &[(S, E, S)] {
        &self.history
    }

    /// Clear transition history
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Check if an event can trigger a transition from current state
    pub fn can_send(&self, event: E) -> bool {
        self.table.contains_key(&(self.current_state, event))
    }

    /// Send an event. Returns the new state if a transition happened.
    pub fn send(&mut self, event: E) -> Option<S> {
        let from = self.current_state;
        let to = *self.table.get(&(from, event))?;

        self.current_state = to;
        if self.history.len() == HISTORY_LIMIT {
            self.history.remove(0);
        }
        self.history.push((from, event, to));
        tracing::trace!("fsm: {:?} --{:?}--> {:?}", from, event, to);

        Some(to)
    }

    /// Return to the initial state without consulting the transition table
    pub fn restart(&mut self) {
        self.current_state = self.initial_state;
    }
}
