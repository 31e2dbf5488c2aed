//! Camera model shared with the external renderer.
//!
//! Graph coordinates are viewport pixels at ratio 1 around the camera
//! position: a larger ratio shows more of the graph.

use crate::config::CameraConfig;
use crate::dispatcher::{CameraState, Point};
use crate::model::{NodeId, Position};

/// A pending `animate_to`; the renderer performs the animation.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraAnimation {
    pub node: NodeId,
    pub target: Position,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub state: CameraState,
    pub enabled: bool,
    pub viewport_width: f64,
    pub viewport_height: f64,
    min_ratio: f64,
    max_ratio: f64,
    animation: Option<CameraAnimation>,
}

impl Camera {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            state: CameraState {
                x: 0.0,
                y: 0.0,
                ..CameraState::default()
            },
            enabled: true,
            viewport_width: 800.0,
            viewport_height: 600.0,
            min_ratio: config.min_ratio,
            max_ratio: config.max_ratio,
            animation: None,
        }
    }

    pub fn ratio(&self) -> f64 {
        self.state.ratio
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport_width = width;
        self.viewport_height = height;
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Adopt the state reported by the renderer. Returns whether the ratio
    /// changed.
    pub fn update(&mut self, state: CameraState) -> bool {
        let ratio_changed = state.ratio != self.state.ratio;
        self.state = state;
        ratio_changed
    }

    pub fn viewport_to_graph(&self, point: Point) -> Position {
        let dx = (point.x - self.viewport_width / 2.0) * self.state.ratio;
        let dy = (point.y - self.viewport_height / 2.0) * self.state.ratio;
        let (sin, cos) = self.state.angle.sin_cos();
        Position::new(
            self.state.x + dx * cos - dy * sin,
            self.state.y + dx * sin + dy * cos,
        )
    }

    /// Corners of the visible graph area.
    pub fn visible_bounds(&self) -> (Position, Position) {
        let corners = [
            self.viewport_to_graph(Point::new(0.0, 0.0)),
            self.viewport_to_graph(Point::new(self.viewport_width, 0.0)),
            self.viewport_to_graph(Point::new(0.0, self.viewport_height)),
            self.viewport_to_graph(Point::new(self.viewport_width, self.viewport_height)),
        ];
        let min = corners.iter().fold(Position::new(f64::MAX, f64::MAX), |acc, p| {
            Position::new(acc.x.min(p.x), acc.y.min(p.y))
        });
        let max = corners.iter().fold(Position::new(f64::MIN, f64::MIN), |acc, p| {
            Position::new(acc.x.max(p.x), acc.y.max(p.y))
        });
        (min, max)
    }

    /// Plain wheel zoom by `zoom_factor`. Ignored while disabled.
    ///
    /// Returns whether the ratio changed.
    pub fn wheel_zoom(&mut self, delta: f64, zoom_factor: f64) -> bool {
        if !self.enabled || delta == 0.0 {
            return false;
        }
        let next = if delta > 0.0 {
            self.state.ratio / zoom_factor
        } else {
            self.state.ratio * zoom_factor
        };
        let next = next.clamp(self.min_ratio, self.max_ratio);
        let changed = next != self.state.ratio;
        self.state.ratio = next;
        changed
    }

    /// Ask the renderer to center on `node`.
    pub fn animate_to(&mut self, node: NodeId, target: Position) {
        self.animation = Some(CameraAnimation { node, target });
    }

    pub fn take_animation(&mut self) -> Option<CameraAnimation> {
        self.animation.take()
    }
}
