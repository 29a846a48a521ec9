//! Scene statistics shown in the info panel.

use serde::{Deserialize, Serialize};

/// Vertex and face counts for a scene.
///
/// Faces follow the flat counting convention used for display:
/// `faces = floor(vertices / 3)`, regardless of indexing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneStats {
    pub vertices: usize,
    pub faces: usize,
}

impl SceneStats {
    /// Build stats from the total vertex-attribute count of a scene.
    pub fn from_vertex_count(vertices: usize) -> Self {
        Self {
            vertices,
            faces: vertices / 3,
        }
    }
}

/// Coordinate axis for discrete transform commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Component index (x = 0, y = 1, z = 2).
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Parse `x`, `y` or `z` (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "x" => Some(Axis::X),
            "y" => Some(Axis::Y),
            "z" => Some(Axis::Z),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faces_floor_vertices() {
        assert_eq!(SceneStats::from_vertex_count(300).faces, 100);
        assert_eq!(SceneStats::from_vertex_count(301).faces, 100);
        assert_eq!(SceneStats::from_vertex_count(2).faces, 0);
        assert_eq!(SceneStats::from_vertex_count(0), SceneStats::default());
    }

    #[test]
    fn test_axis_parse() {
        assert_eq!(Axis::parse("X"), Some(Axis::X));
        assert_eq!(Axis::parse("z"), Some(Axis::Z));
        assert_eq!(Axis::parse("w"), None);
        assert_eq!(Axis::Y.index(), 1);
    }
}
