//! Per-piece state machine.
//!
//! A [`StateGraph`] is the shared, immutable description of a piece type's
//! states: each [`StateBlueprint`] names a render handle, maps command kinds
//! to successor states, and may name a state to fall back to once the action
//! completes. One graph is shared by every piece of a type through an `Arc`.
//!
//! A [`PieceStateMachine`] is the owned, mutable instance: the current state
//! name, a cloned render handle, and the piece's own [`MotionModel`]. Taking a
//! transition builds a *new* machine value from the target blueprint; nothing
//! mutable is ever shared between two pieces built from the same template.
//!
//! # Unhandled commands
//!
//! When the current state has no transition for a command kind, the machine
//! re-arms itself in place with the command. This is surfaced as
//! [`TransitionError::Unhandled`] carrying the re-armed machine, so callers
//! decide whether to accept it (lenient) or treat it as an error (strict).

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::command::{Command, CommandKind};
use crate::motion::MotionModel;
use crate::rules::MoveRuleSet;
use crate::CoreError;

/// Minimum time a state must exist before another external transition.
pub const DEFAULT_MIN_DWELL_MS: u64 = 100;

/// Conventional state names used by the default graph.
pub mod names {
    /// At rest.
    pub const IDLE: &str = "idle";
    /// Sliding.
    pub const MOVE: &str = "move";
    /// Airborne.
    pub const JUMP: &str = "jump";
}

// ---------------------------------------------------------------------------
// RenderHandle
// ---------------------------------------------------------------------------

/// Opaque handle the rendering collaborator uses to pick sprites.
///
/// The core never reads it beyond cloning it into each piece.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RenderHandle {
    /// Name of the state the sprites belong to.
    pub state: String,
    /// Directory holding the sprite frames, when loaded from disk.
    pub sprite_dir: Option<PathBuf>,
}

impl RenderHandle {
    /// A handle with no sprite directory.
    pub fn named(state: &str) -> Self {
        Self {
            state: state.to_owned(),
            sprite_dir: None,
        }
    }
}

// ---------------------------------------------------------------------------
// StateBlueprint / StateGraph
// ---------------------------------------------------------------------------

/// Template for one state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateBlueprint {
    /// Unique name within the graph.
    pub name: String,
    /// Render data cloned into every piece entering this state.
    pub render: RenderHandle,
    /// Successor state per command kind.
    pub transitions: BTreeMap<CommandKind, String>,
    /// State entered automatically when the action finishes.
    pub on_complete: Option<String>,
}

impl StateBlueprint {
    /// A blueprint with no transitions.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            render: RenderHandle::named(name),
            transitions: BTreeMap::new(),
            on_complete: None,
        }
    }
}

/// Shared, immutable state graph for one piece type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateGraph {
    initial: String,
    states: BTreeMap<String, StateBlueprint>,
    min_dwell_ms: u64,
}

impl Default for StateGraph {
    /// `idle`, `move` and `jump`; both commands are accepted from every
    /// state, and actions return to `idle` when complete.
    fn default() -> Self {
        let mut graph = Self::new(StateBlueprint::new(names::IDLE));
        graph.insert(StateBlueprint::new(names::MOVE));
        graph.insert(StateBlueprint::new(names::JUMP));
        for from in [names::IDLE, names::MOVE, names::JUMP] {
            graph.set_transition(from, CommandKind::Move, names::MOVE);
            graph.set_transition(from, CommandKind::Jump, names::JUMP);
        }
        graph.set_on_complete(names::MOVE, names::IDLE);
        graph.set_on_complete(names::JUMP, names::IDLE);
        graph
    }
}

impl StateGraph {
    /// A graph containing only its initial state.
    pub fn new(initial: StateBlueprint) -> Self {
        let name = initial.name.clone();
        let mut states = BTreeMap::new();
        states.insert(name.clone(), initial);
        Self {
            initial: name,
            states,
            min_dwell_ms: DEFAULT_MIN_DWELL_MS,
        }
    }

    /// Add or replace a state.
    pub fn insert(&mut self, blueprint: StateBlueprint) {
        self.states.insert(blueprint.name.clone(), blueprint);
    }

    /// Register `from --kind--> to`. Unknown `from` states are ignored.
    pub fn set_transition(&mut self, from: &str, kind: CommandKind, to: &str) {
        if let Some(bp) = self.states.get_mut(from) {
            bp.transitions.insert(kind, to.to_owned());
        }
    }

    /// Register the automatic successor of `from`.
    pub fn set_on_complete(&mut self, from: &str, to: &str) {
        if let Some(bp) = self.states.get_mut(from) {
            bp.on_complete = Some(to.to_owned());
        }
    }

    /// Override the minimum dwell time.
    pub fn set_min_dwell_ms(&mut self, ms: u64) {
        self.min_dwell_ms = ms;
    }

    /// Minimum dwell time.
    pub fn min_dwell_ms(&self) -> u64 {
        self.min_dwell_ms
    }

    /// The initial blueprint.
    pub fn initial(&self) -> &StateBlueprint {
        // `new` always inserts the initial state and `insert` can only replace it.
        &self.states[&self.initial]
    }

    /// Look up a blueprint by name.
    pub fn blueprint(&self, name: &str) -> Option<&StateBlueprint> {
        self.states.get(name)
    }

    /// Names of all states, sorted.
    pub fn state_names(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Transition errors
// ---------------------------------------------------------------------------

/// The current state had no transition for the command kind.
///
/// `rearmed` is the current state reset with the command, which is what a
/// lenient caller should adopt.
#[derive(Debug, Clone, thiserror::Error)]
#[error("state '{state}' has no transition for {kind}; re-armed in place")]
pub struct UnhandledCommand {
    /// State the piece was in.
    pub state: String,
    /// Kind of the unhandled command.
    pub kind: CommandKind,
    /// The current state reset with the command.
    pub rearmed: Box<PieceStateMachine>,
}

/// Why [`PieceStateMachine::transition`] did not produce a successor.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransitionError {
    /// No registered transition; see [`UnhandledCommand`].
    #[error(transparent)]
    Unhandled(#[from] UnhandledCommand),
    /// The command could not be applied (bad squares, dwell not elapsed).
    #[error(transparent)]
    Invalid(#[from] CoreError),
}

// ---------------------------------------------------------------------------
// PieceStateMachine
// ---------------------------------------------------------------------------

/// Owned per-piece state: current state, render data and motion.
#[derive(Debug, Clone)]
pub struct PieceStateMachine {
    rules: Arc<MoveRuleSet>,
    graph: Arc<StateGraph>,
    state: String,
    render: RenderHandle,
    motion: MotionModel,
    /// `None` until the first command; the initial state has no dwell guard.
    state_start_ms: Option<u64>,
    current_command: Option<Command>,
}

impl PieceStateMachine {
    /// A machine in the graph's initial state.
    pub fn new(rules: Arc<MoveRuleSet>, graph: Arc<StateGraph>, motion: MotionModel) -> Self {
        let initial = graph.initial();
        let state = initial.name.clone();
        let render = initial.render.clone();
        Self {
            rules,
            graph,
            state,
            render,
            motion,
            state_start_ms: None,
            current_command: None,
        }
    }

    /// Whether the current state has existed long enough to leave it.
    pub fn can_transition(&self, now_ms: u64) -> bool {
        self.state_start_ms
            .map_or(true, |t| now_ms.saturating_sub(t) >= self.graph.min_dwell_ms())
    }

    /// First millisecond at which [`can_transition`](Self::can_transition)
    /// holds.
    pub fn dwell_eligible_ms(&self) -> u64 {
        self.state_start_ms
            .map_or(0, |t| t + self.graph.min_dwell_ms())
    }

    /// Compute the successor state for `command`.
    ///
    /// The target blueprint is cloned into a fresh machine that keeps this
    /// piece's motion and is then reset with the command. `self` is never
    /// modified.
    pub fn transition(
        &self,
        command: &Command,
        now_ms: u64,
        board: &Board,
    ) -> Result<Self, TransitionError> {
        if !self.can_transition(now_ms) {
            return Err(CoreError::DwellNotElapsed {
                entered_ms: self.state_start_ms.unwrap_or_default(),
                eligible_ms: self.dwell_eligible_ms(),
            }
            .into());
        }

        let target = self
            .graph
            .blueprint(&self.state)
            .and_then(|bp| bp.transitions.get(&command.kind))
            .and_then(|name| self.graph.blueprint(name));

        match target {
            Some(bp) => {
                let mut next = self.enter(bp);
                next.reset(command, board)?;
                Ok(next)
            }
            None => {
                let mut rearmed = self.clone();
                rearmed.reset(command, board)?;
                Err(UnhandledCommand {
                    state: self.state.clone(),
                    kind: command.kind,
                    rearmed: Box::new(rearmed),
                }
                .into())
            }
        }
    }

    /// Stamp the state start time and forward the command to motion.
    pub fn reset(&mut self, command: &Command, board: &Board) -> Result<(), CoreError> {
        self.motion.apply(command, board)?;
        self.state_start_ms = Some(command.timestamp);
        self.current_command = Some(command.clone());
        Ok(())
    }

    /// Advance motion to `now_ms`, following `on_complete` when the action
    /// finishes. Returns `true` if an action finished.
    pub fn update(&mut self, now_ms: u64) -> bool {
        let finished = self.motion.update(now_ms);
        if finished {
            self.complete_action();
        }
        finished
    }

    /// Land a due jump (collision lifecycle pass). Returns `true` if it
    /// landed.
    pub fn land_if_due(&mut self, now_ms: u64) -> bool {
        let landed = self.motion.land_if_due(now_ms);
        if landed {
            self.complete_action();
        }
        landed
    }

    fn complete_action(&mut self) {
        let next = self
            .graph
            .blueprint(&self.state)
            .and_then(|bp| bp.on_complete.as_deref())
            .and_then(|name| self.graph.blueprint(name))
            .cloned();
        if let Some(bp) = next {
            let end = self.motion.action_start_ms() + self.motion.action_duration_ms();
            *self = self.enter(&bp);
            self.state_start_ms = Some(end);
        }
    }

    fn enter(&self, bp: &StateBlueprint) -> Self {
        Self {
            rules: Arc::clone(&self.rules),
            graph: Arc::clone(&self.graph),
            state: bp.name.clone(),
            render: bp.render.clone(),
            motion: self.motion.clone(),
            state_start_ms: self.state_start_ms,
            current_command: self.current_command.clone(),
        }
    }

    // -- accessors ----------------------------------------------------------

    /// Name of the current state.
    pub fn state_name(&self) -> &str {
        &self.state
    }

    /// Render data for the current state.
    pub fn render(&self) -> &RenderHandle {
        &self.render
    }

    /// Motion model.
    pub fn motion(&self) -> &MotionModel {
        &self.motion
    }

    /// Mutable motion model, for setup and teleports.
    pub fn motion_mut(&mut self) -> &mut MotionModel {
        &mut self.motion
    }

    /// Shared move rules.
    pub fn rules(&self) -> &Arc<MoveRuleSet> {
        &self.rules
    }

    /// Shared state graph.
    pub fn graph(&self) -> &Arc<StateGraph> {
        &self.graph
    }

    /// Command that last reset this machine.
    pub fn current_command(&self) -> Option<&Command> {
        self.current_command.as_ref()
    }

    /// When the current state was entered.
    pub fn state_start_ms(&self) -> Option<u64> {
        self.state_start_ms
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
