//! Raw input as reported by the drawing surface.

use serde::{Deserialize, Serialize};

use crate::model::{NodeId, RelationId};

/// A point in viewport (screen) coordinates unless stated otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Keyboard modifiers held during a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        shift: false,
        alt: false,
    };
    pub const CTRL: Self = Self {
        ctrl: true,
        ..Self::NONE
    };
    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::NONE
    };
    pub const ALT: Self = Self {
        alt: true,
        ..Self::NONE
    };

    pub fn any(self) -> bool {
        self.ctrl || self.shift || self.alt
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PointerButton {
    #[default]
    Primary,
    Secondary,
}

/// Camera as last reported by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub x: f64,
    pub y: f64,
    pub ratio: f64,
    pub angle: f64,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            x: 0.5,
            y: 0.5,
            ratio: 1.0,
            angle: 0.0,
        }
    }
}

/// Everything the drawing surface can report.
#[derive(Debug, Clone, PartialEq)]
pub enum RawInput {
    NodeDown {
        node: NodeId,
        pointer: Point,
        modifiers: Modifiers,
        button: PointerButton,
    },
    NodeClick { node: NodeId, pointer: Point },
    NodeRightClick { node: NodeId, pointer: Point },
    RelationClick { relation: RelationId, pointer: Point },
    RelationRightClick { relation: RelationId, pointer: Point },
    StageDown {
        pointer: Point,
        modifiers: Modifiers,
        button: PointerButton,
    },
    StageUp { pointer: Point },
    StageRightClick { pointer: Point },
    PointerMove { pointer: Point },
    PointerUp { pointer: Point },
    /// Positive `delta` scrolls up (zoom in).
    Wheel {
        pointer: Point,
        delta: f64,
        modifiers: Modifiers,
    },
    CameraUpdated(CameraState),
}

impl RawInput {
    /// Primary-button press on a node without modifiers.
    pub fn node_down(node: impl Into<NodeId>, pointer: Point) -> Self {
        Self::NodeDown {
            node: node.into(),
            pointer,
            modifiers: Modifiers::NONE,
            button: PointerButton::Primary,
        }
    }

    pub fn stage_down(pointer: Point, modifiers: Modifiers) -> Self {
        Self::StageDown {
            pointer,
            modifiers,
            button: PointerButton::Primary,
        }
    }

    pub fn wheel(pointer: Point, delta: f64, modifiers: Modifiers) -> Self {
        Self::Wheel {
            pointer,
            delta,
            modifiers,
        }
    }
}
