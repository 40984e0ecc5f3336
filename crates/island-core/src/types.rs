//! Core type definitions for the simulation.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an agent instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub Uuid);

impl AgentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 2D position on the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn add(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// Clamp to `[0, width) x [0, height)`. The grid has hard edges, no wraparound.
    pub fn clamp(&self, width: i32, height: i32) -> Self {
        Self {
            x: self.x.clamp(0, (width - 1).max(0)),
            y: self.y.clamp(0, (height - 1).max(0)),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Cardinal direction for movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub fn to_delta(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    pub fn all() -> [Direction; 4] {
        [
            Direction::North,
            Direction::East,
            Direction::South,
            Direction::West,
        ]
    }

    /// Pick one of the four directions uniformly.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::all()[rng.gen_range(0..4)]
    }

    /// Displacement of `distance` cells in this direction
    pub fn scaled(&self, distance: i32) -> (i32, i32) {
        let (dx, dy) = self.to_delta();
        (dx * distance, dy * distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_position_clamp() {
        let pos = Position::new(-2, 5);
        assert_eq!(pos.clamp(10, 10), Position::new(0, 5));

        let pos = Position::new(12, 12);
        assert_eq!(pos.clamp(10, 10), Position::new(9, 9));

        let pos = Position::new(3, 4);
        assert_eq!(pos.clamp(10, 10), pos);
    }

    #[test]
    fn test_direction_delta() {
        assert_eq!(Direction::North.to_delta(), (0, -1));
        assert_eq!(Direction::South.to_delta(), (0, 1));
        assert_eq!(Direction::East.to_delta(), (1, 0));
        assert_eq!(Direction::West.to_delta(), (-1, 0));
        assert_eq!(Direction::West.scaled(2), (-2, 0));
    }

    proptest! {
        #[test]
        fn clamped_position_is_always_on_grid(
            x in -1000i32..1000,
            y in -1000i32..1000,
            width in 1i32..64,
            height in 1i32..64,
        ) {
            let clamped = Position::new(x, y).clamp(width, height);
            prop_assert!(clamped.x >= 0 && clamped.x < width);
            prop_assert!(clamped.y >= 0 && clamped.y < height);
        }
    }
}
