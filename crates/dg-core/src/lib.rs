#![forbid(unsafe_code)]

mod flow_db;
mod sequence_db;

pub use flow_db::{ClassDef, Edge, FlowDb, LinkStyle, LinkStyleIndex, Vertex, VertexId};
pub use sequence_db::{
    Actor, ActorId, ActorKind, BlockKind, Message, MessageKind, Note, NotePlacement, SequenceDb,
    SequenceItem,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    #[must_use]
    pub const fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    #[must_use]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Span covering a token of `width` columns starting at `col` on `line`.
    #[must_use]
    pub const fn at_token(line: usize, col: usize, width: usize) -> Self {
        Self {
            start: Position::new(line, col),
            end: Position::new(line, col + width),
        }
    }

    #[must_use]
    pub fn at_line(line: usize, line_len: usize) -> Self {
        Self {
            start: Position::new(line, 1),
            end: Position::new(line, line_len.max(1)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Error, PartialEq, Eq)]
pub enum DiagramError {
    #[error("no diagram dialect signature matches the definition starting with {first_line:?}")]
    UnknownDiagramType { first_line: String },
    #[error("parse error at line {}, column {}: {message}", .span.start.line, .span.start.col)]
    Parse {
        message: String,
        span: Span,
        expected: Vec<String>,
    },
}

impl DiagramError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownDiagramType { .. } => "diagraph/error/unknown-type",
            Self::Parse { .. } => "diagraph/error/parse",
        }
    }

    #[must_use]
    pub const fn span(&self) -> Option<Span> {
        match self {
            Self::UnknownDiagramType { .. } => None,
            Self::Parse { span, .. } => Some(*span),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum WarningCode {
    /// A directive referenced a vertex or actor that was never declared;
    /// the target was created implicitly.
    #[default]
    ImplicitTarget,
    /// A `classDef` re-used an existing class name and replaced it.
    DuplicateClassDef,
    /// A `linkStyle` index does not correspond to any declared edge.
    LinkStyleIndexOutOfRange,
}

impl WarningCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ImplicitTarget => "diagraph/warn/implicit-target",
            Self::DuplicateClassDef => "diagraph/warn/duplicate-class-def",
            Self::LinkStyleIndexOutOfRange => "diagraph/warn/link-style-index-out-of-range",
        }
    }
}

/// A tolerated semantic problem. Warnings reduce the effect of a statement
/// instead of aborting the parse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Warning {
    pub code: WarningCode,
    pub message: String,
    pub span: Option<Span>,
}

impl Warning {
    #[must_use]
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            span: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Dialect {
    Flowchart,
    Sequence,
}

impl Dialect {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Flowchart => "flowchart",
            Self::Sequence => "sequence",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    TB,
    TD,
    LR,
    RL,
    BT,
}

impl Direction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TB => "TB",
            Self::TD => "TD",
            Self::LR => "LR",
            Self::RL => "RL",
            Self::BT => "BT",
        }
    }

    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "TB" => Some(Self::TB),
            "TD" => Some(Self::TD),
            "LR" => Some(Self::LR),
            "RL" => Some(Self::RL),
            "BT" => Some(Self::BT),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum VertexShape {
    #[default]
    Rect,
    Rounded,
    Stadium,
    Subroutine,
    Cylinder,
    Circle,
    DoubleCircle,
    Diamond,
    Hexagon,
    Odd,
}

impl VertexShape {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rect => "rect",
            Self::Rounded => "rounded",
            Self::Stadium => "stadium",
            Self::Subroutine => "subroutine",
            Self::Cylinder => "cylinder",
            Self::Circle => "circle",
            Self::DoubleCircle => "doublecircle",
            Self::Diamond => "diamond",
            Self::Hexagon => "hexagon",
            Self::Odd => "odd",
        }
    }
}

/// Line style of an edge, independent of its arrowhead.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Stroke {
    #[default]
    Solid,
    Dotted,
    Thick,
}

impl Stroke {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Solid => "solid",
            Self::Dotted => "dotted",
            Self::Thick => "thick",
        }
    }
}

/// Arrowhead drawn at the target end of an edge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Arrowhead {
    #[default]
    None,
    Normal,
    Cross,
    Circle,
}

impl Arrowhead {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Normal => "normal",
            Self::Cross => "cross",
            Self::Circle => "circle",
        }
    }
}

/// Edge-type token: the line style × arrowhead combination a single edge
/// operator encodes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum EdgeType {
    #[default]
    SolidOpen,
    SolidArrow,
    SolidCross,
    SolidCircle,
    DottedOpen,
    DottedArrow,
    DottedCross,
    DottedCircle,
    ThickOpen,
    ThickArrow,
    ThickCross,
    ThickCircle,
}

impl EdgeType {
    #[must_use]
    pub const fn arrowhead(self) -> Arrowhead {
        match self {
            Self::SolidOpen | Self::DottedOpen | Self::ThickOpen => Arrowhead::None,
            Self::SolidArrow | Self::DottedArrow | Self::ThickArrow => Arrowhead::Normal,
            Self::SolidCross | Self::DottedCross | Self::ThickCross => Arrowhead::Cross,
            Self::SolidCircle | Self::DottedCircle | Self::ThickCircle => Arrowhead::Circle,
        }
    }

    #[must_use]
    pub const fn stroke(self) -> Stroke {
        match self {
            Self::SolidOpen | Self::SolidArrow | Self::SolidCross | Self::SolidCircle => {
                Stroke::Solid
            }
            Self::DottedOpen | Self::DottedArrow | Self::DottedCross | Self::DottedCircle => {
                Stroke::Dotted
            }
            Self::ThickOpen | Self::ThickArrow | Self::ThickCross | Self::ThickCircle => {
                Stroke::Thick
            }
        }
    }

    /// Canonical operator spelling for this token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SolidOpen => "---",
            Self::SolidArrow => "-->",
            Self::SolidCross => "--x",
            Self::SolidCircle => "--o",
            Self::DottedOpen => "-.-",
            Self::DottedArrow => "-.->",
            Self::DottedCross => "-.-x",
            Self::DottedCircle => "-.-o",
            Self::ThickOpen => "===",
            Self::ThickArrow => "==>",
            Self::ThickCross => "==x",
            Self::ThickCircle => "==o",
        }
    }

    #[must_use]
    pub fn from_operator(op: &str) -> Option<Self> {
        match op {
            "---" => Some(Self::SolidOpen),
            "-->" => Some(Self::SolidArrow),
            "--x" => Some(Self::SolidCross),
            "--o" => Some(Self::SolidCircle),
            "-.-" => Some(Self::DottedOpen),
            "-.->" => Some(Self::DottedArrow),
            "-.-x" => Some(Self::DottedCross),
            "-.-o" => Some(Self::DottedCircle),
            "===" => Some(Self::ThickOpen),
            "==>" => Some(Self::ThickArrow),
            "==x" => Some(Self::ThickCross),
            "==o" => Some(Self::ThickCircle),
            _ => None,
        }
    }
}

/// Identifier-formatting policy for renderer-facing ids, kept as an explicit
/// strategy so the database never branches on a string tag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Generation {
    /// Legacy policy: the raw vertex id doubles as the rendered identifier.
    Gen1,
    /// Current policy: a prefixed id with a numeric suffix, so reserved
    /// characters in user ids never collide with generated identifiers.
    #[default]
    Gen2,
}

impl Generation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gen1 => "gen-1",
            Self::Gen2 => "gen-2",
        }
    }

    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "gen-1" => Some(Self::Gen1),
            "gen-2" => Some(Self::Gen2),
            _ => None,
        }
    }

    /// Derive the renderer-facing identifier for a vertex. `seq` is the
    /// vertex creation ordinal within the current parse.
    #[must_use]
    pub fn dom_id(self, vertex_id: &str, seq: usize) -> String {
        match self {
            Self::Gen1 => vertex_id.to_string(),
            Self::Gen2 => format!("flowchart-{vertex_id}-{seq}"),
        }
    }
}
