//! Interaction states and the transitions allowed between them.
//!
//! Every gesture starts from `Idle` and returns to it through
//! `reset_state`. Anything not listed is rejected.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the pointer interaction currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionState {
    #[default]
    Idle,
    StageDown,
    StageContextMenu,
    NodeDown,
    NodeDrag,
    NodeSelection,
    NodeQuick,
    NodeAutoConnect,
    NodeClick,
    NodeContextMenu,
    RelationClick,
    RelationContextMenu,
    Scale,
    ZoomFactor,
}

impl InteractionState {
    /// States reachable from `self`.
    pub fn allowed_transitions(self) -> &'static [InteractionState] {
        use InteractionState::*;
        match self {
            Idle => &[
                NodeDown,
                StageDown,
                RelationClick,
                Scale,
                ZoomFactor,
                NodeContextMenu,
                StageContextMenu,
                RelationContextMenu,
            ],
            StageDown => &[NodeSelection, NodeQuick, Idle],
            NodeDown => &[NodeDrag, NodeAutoConnect, NodeClick, NodeContextMenu, Idle],
            NodeClick => &[NodeContextMenu, Idle],
            RelationClick => &[RelationContextMenu, Idle],
            StageContextMenu | NodeContextMenu | RelationContextMenu => &[Idle],
            NodeDrag | NodeSelection | NodeQuick | NodeAutoConnect => &[Idle],
            Scale | ZoomFactor => &[Idle],
        }
    }

    pub fn can_transition_to(self, next: InteractionState) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Gestures that own the pointer until release. Only one may be active.
    pub fn is_exclusive_gesture(self) -> bool {
        matches!(
            self,
            Self::NodeDrag | Self::NodeSelection | Self::NodeAutoConnect
        )
    }

    /// States cleared by a pointer release.
    pub fn resets_on_pointer_up(self) -> bool {
        matches!(
            self,
            Self::NodeDrag
                | Self::NodeSelection
                | Self::NodeAutoConnect
                | Self::StageDown
                | Self::NodeQuick
        )
    }
}

impl fmt::Display for InteractionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use InteractionState::*;

    const ALL: [InteractionState; 14] = [
        Idle,
        StageDown,
        StageContextMenu,
        NodeDown,
        NodeDrag,
        NodeSelection,
        NodeQuick,
        NodeAutoConnect,
        NodeClick,
        NodeContextMenu,
        RelationClick,
        RelationContextMenu,
        Scale,
        ZoomFactor,
    ];

    #[test]
    fn every_state_can_return_to_idle() {
        for state in ALL.into_iter().filter(|s| *s != Idle) {
            assert!(state.can_transition_to(Idle), "{state} cannot reach Idle");
        }
    }

    #[test]
    fn no_self_transitions() {
        for state in ALL {
            assert!(!state.can_transition_to(state), "{state} loops onto itself");
        }
    }

    #[test]
    fn gestures_do_not_chain() {
        assert!(!NodeDrag.can_transition_to(NodeSelection));
        assert!(!NodeSelection.can_transition_to(NodeDrag));
        assert!(!Idle.can_transition_to(NodeDrag));
        assert!(NodeDown.can_transition_to(NodeDrag));
        assert!(StageDown.can_transition_to(NodeSelection));
    }
}
