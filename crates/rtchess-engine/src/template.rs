//! Piece templates, template loading and the piece factory.
//!
//! A [`PieceTemplate`] is the shared, read-only half of a piece type: its
//! move rules and state graph (both behind an `Arc`) plus motion timing. The
//! [`PieceFactory`] stamps out [`Piece`]s from templates, giving each one a
//! fresh id and its own motion state.
//!
//! # Template directories
//!
//! [`TemplateLibrary::load_dir`] reads one directory per piece code:
//!
//! ```text
//! pieces/
//!   PW/
//!     moves.txt          # "dx,dy" per line
//!     config.json        # {"physics": {"slide_cells_per_sec": 2.0}}
//!     states/
//!       idle/sprites/
//!       move/sprites/
//! ```
//!
//! Every file is optional. Broken pieces fall back to the built-in template
//! with a warning; loading as a whole never fails.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rtchess_core::board::Cell;
use rtchess_core::motion::{MotionConfig, MotionModel};
use rtchess_core::piece::{Piece, PieceCode, PieceId, PieceKind};
use rtchess_core::rules::MoveRuleSet;
use rtchess_core::side::Side;
use rtchess_core::state::{PieceStateMachine, StateGraph};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::EngineConfig;

// ---------------------------------------------------------------------------
// TemplateError
// ---------------------------------------------------------------------------

/// Problems with template data. Always recovered by the loader.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// A directory name is not a piece code.
    #[error("'{name}' is not a piece code")]
    NotAPieceCode { name: String },

    /// The factory was asked for a code it has no template for.
    #[error("no template for piece code {code}")]
    UnknownCode { code: PieceCode },

    /// A template file could not be read.
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A template `config.json` was malformed.
    #[error("malformed template config '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// PieceTemplate
// ---------------------------------------------------------------------------

/// Shared data for one piece code.
#[derive(Debug, Clone)]
pub struct PieceTemplate {
    pub code: PieceCode,
    pub rules: Arc<MoveRuleSet>,
    pub graph: Arc<StateGraph>,
    pub motion: MotionConfig,
}

impl PieceTemplate {
    /// Default rules and graph with the engine's motion timing.
    pub fn builtin(code: PieceCode, config: &EngineConfig) -> Self {
        Self {
            code,
            rules: Arc::new(MoveRuleSet::default()),
            graph: Arc::new(default_graph(config)),
            motion: config.motion,
        }
    }

    /// Load a template from a piece directory.
    ///
    /// Only I/O and JSON errors on `config.json` are reported; a missing or
    /// malformed `moves.txt` already degrades to default offsets.
    pub fn load(dir: &Path, code: PieceCode, config: &EngineConfig) -> Result<Self, TemplateError> {
        let rules = MoveRuleSet::load(&dir.join("moves.txt"));

        let mut motion = config.motion;
        let config_path = dir.join("config.json");
        if config_path.is_file() {
            let text = std::fs::read_to_string(&config_path).map_err(|source| TemplateError::Io {
                path: config_path.clone(),
                source,
            })?;
            let file: TemplateFile =
                serde_json::from_str(&text).map_err(|source| TemplateError::Json {
                    path: config_path.clone(),
                    source,
                })?;
            if let Some(rate) = file.physics.slide_cells_per_sec {
                if rate > 0.0 && rate.is_finite() {
                    motion.slide_cells_per_sec = rate;
                } else {
                    warn!(piece = %code, rate, "ignoring non-positive slide speed");
                }
            }
        }

        let mut graph = default_graph(config);
        attach_sprites(&mut graph, &dir.join("states"), code);

        Ok(Self {
            code,
            rules: Arc::new(rules),
            graph: Arc::new(graph),
            motion,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct TemplateFile {
    #[serde(default)]
    physics: PhysicsSection,
}

#[derive(Debug, Default, Deserialize)]
struct PhysicsSection {
    slide_cells_per_sec: Option<f64>,
}

fn default_graph(config: &EngineConfig) -> StateGraph {
    let mut graph = StateGraph::default();
    graph.set_min_dwell_ms(config.admission.min_dwell_ms);
    graph
}

/// Point known states at their sprite directories.
fn attach_sprites(graph: &mut StateGraph, states_dir: &Path, code: PieceCode) {
    let Ok(entries) = std::fs::read_dir(states_dir) else {
        return;
    };
    let mut dirs: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();

    for dir in dirs {
        let Some(name) = dir.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(mut blueprint) = graph.blueprint(name).cloned() else {
            debug!(piece = %code, state = name, "state directory has no matching state; skipped");
            continue;
        };
        let sprites = dir.join("sprites");
        blueprint.render.sprite_dir = Some(if sprites.is_dir() { sprites } else { dir.clone() });
        graph.insert(blueprint);
    }
}

// ---------------------------------------------------------------------------
// TemplateLibrary
// ---------------------------------------------------------------------------

/// Templates keyed by piece code.
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    templates: BTreeMap<PieceCode, PieceTemplate>,
}

impl TemplateLibrary {
    /// All twelve codes with default rules and graph.
    pub fn builtin(config: &EngineConfig) -> Self {
        let mut library = Self::default();
        for side in Side::ALL {
            for kind in PieceKind::ALL {
                library.insert(PieceTemplate::builtin(PieceCode::new(kind, side), config));
            }
        }
        library
    }

    /// Built-in templates overridden by whatever `root` provides.
    pub fn load_dir(root: &Path, config: &EngineConfig) -> Self {
        let mut library = Self::builtin(config);
        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(path = %root.display(), error = %e, "template directory unavailable; using built-in templates");
                return library;
            }
        };

        let mut dirs: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();

        for dir in dirs {
            match load_piece_dir(&dir, config) {
                Ok(template) => {
                    debug!(piece = %template.code, offsets = template.rules.offsets().len(), "loaded template");
                    library.insert(template);
                }
                Err(e) => warn!(path = %dir.display(), error = %e, "skipping piece template"),
            }
        }
        library
    }

    /// Add or replace a template.
    pub fn insert(&mut self, template: PieceTemplate) {
        self.templates.insert(template.code, template);
    }

    pub fn get(&self, code: PieceCode) -> Option<&PieceTemplate> {
        self.templates.get(&code)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn codes(&self) -> impl Iterator<Item = PieceCode> + '_ {
        self.templates.keys().copied()
    }
}

fn load_piece_dir(dir: &Path, config: &EngineConfig) -> Result<PieceTemplate, TemplateError> {
    let name = dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let code: PieceCode = name.parse().map_err(|_| TemplateError::NotAPieceCode {
        name: name.to_owned(),
    })?;
    PieceTemplate::load(dir, code, config)
}

// ---------------------------------------------------------------------------
// Placement / layouts
// ---------------------------------------------------------------------------

/// A piece code at a starting cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub code: PieceCode,
    pub cell: Cell,
}

impl Placement {
    pub fn new(code: PieceCode, cell: Cell) -> Self {
        Self { code, cell }
    }
}

/// The classic 32-piece setup: White on rows 0 and 1, Black on rows 6 and 7.
pub fn standard_layout() -> Vec<Placement> {
    const BACK_RANK: [PieceKind; 8] = [
        PieceKind::Rook,
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Queen,
        PieceKind::King,
        PieceKind::Bishop,
        PieceKind::Knight,
        PieceKind::Rook,
    ];

    let mut layout = Vec::with_capacity(32);
    for (side, back, pawns) in [(Side::White, 0, 1), (Side::Black, 7, 6)] {
        for (col, kind) in BACK_RANK.iter().enumerate() {
            layout.push(Placement::new(PieceCode::new(*kind, side), Cell::new(back, col as i32)));
        }
        for col in 0..8 {
            layout.push(Placement::new(PieceCode::new(PieceKind::Pawn, side), Cell::new(pawns, col)));
        }
    }
    layout
}

// ---------------------------------------------------------------------------
// PieceFactory
// ---------------------------------------------------------------------------

/// Builds pieces from a template library.
#[derive(Debug, Clone)]
pub struct PieceFactory {
    library: Arc<TemplateLibrary>,
    next_seq: u64,
}

impl PieceFactory {
    pub fn new(library: Arc<TemplateLibrary>) -> Self {
        Self {
            library,
            next_seq: 0,
        }
    }

    /// Create a piece with id `"{code}_{seq}"` at `cell`.
    ///
    /// Rules and graph are shared with every other piece of the code; motion
    /// state is the piece's own.
    pub fn create(&mut self, code: PieceCode, cell: Cell) -> Result<Piece, TemplateError> {
        let template = self
            .library
            .get(code)
            .ok_or(TemplateError::UnknownCode { code })?;
        let seq = self.next_seq;
        self.next_seq += 1;

        let machine = PieceStateMachine::new(
            Arc::clone(&template.rules),
            Arc::clone(&template.graph),
            MotionModel::new(cell, template.motion),
        );
        let id = PieceId::new(&format!("{code}_{seq}"));
        Ok(Piece::new(id, code, seq, machine))
    }

    pub fn library(&self) -> &Arc<TemplateLibrary> {
        &self.library
    }

    /// Number of pieces created so far.
    pub fn created(&self) -> u64 {
        self.next_seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> PieceCode {
        s.parse().unwrap()
    }

    #[test]
    fn builtin_has_all_codes() {
        let library = TemplateLibrary::builtin(&EngineConfig::default());
        assert_eq!(library.len(), 12);
        assert!(library.get(code("KB")).is_some());
    }

    #[test]
    fn factory_shares_rules_but_not_motion() {
        let library = Arc::new(TemplateLibrary::builtin(&EngineConfig::default()));
        let mut factory = PieceFactory::new(library);
        let a = factory.create(code("PW"), Cell::new(1, 0)).unwrap();
        let b = factory.create(code("PW"), Cell::new(1, 1)).unwrap();

        assert_eq!(a.id().as_str(), "PW_0");
        assert_eq!(b.id().as_str(), "PW_1");
        assert_eq!(b.seq(), 1);
        assert!(Arc::ptr_eq(a.machine().rules(), b.machine().rules()));
        assert!(Arc::ptr_eq(a.machine().graph(), b.machine().graph()));
        assert_ne!(a.cell(), b.cell());
    }

    #[test]
    fn unknown_code_is_an_error() {
        let mut factory = PieceFactory::new(Arc::new(TemplateLibrary::default()));
        assert!(matches!(
            factory.create(code("QW"), Cell::new(0, 3)),
            Err(TemplateError::UnknownCode { .. })
        ));
        assert_eq!(factory.created(), 0);
    }

    #[test]
    fn standard_layout_is_symmetric() {
        let layout = standard_layout();
        assert_eq!(layout.len(), 32);
        let white = layout.iter().filter(|p| p.code.side == Side::White).count();
        assert_eq!(white, 16);
        assert!(layout
            .iter()
            .filter(|p| p.code.side == Side::White)
            .all(|p| p.cell.row <= 1));
        assert!(layout.contains(&Placement::new(code("KW"), Cell::new(0, 4))));
        assert!(layout.contains(&Placement::new(code("QB"), Cell::new(7, 3))));
    }

    #[test]
    fn min_dwell_comes_from_config() {
        let mut config = EngineConfig::default();
        config.admission.min_dwell_ms = 250;
        let template = PieceTemplate::builtin(code("NB"), &config);
        assert_eq!(template.graph.min_dwell_ms(), 250);
    }
}
