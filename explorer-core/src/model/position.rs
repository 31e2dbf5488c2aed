use serde::{Deserialize, Serialize};

/// Graph-space coordinates of a node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    pub fn translate(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_keeps_depth() {
        let p = Position { x: 1.0, y: 2.0, z: 3.0 }.translate(0.5, -1.0);
        assert_eq!(p, Position { x: 1.5, y: 1.0, z: 3.0 });
    }

    #[test]
    fn depth_defaults_to_zero() {
        let p: Position = serde_json::from_str(r#"{"x": 1, "y": 2}"#).unwrap();
        assert_eq!(p, Position::new(1.0, 2.0));
    }
}
