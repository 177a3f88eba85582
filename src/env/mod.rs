use std::fmt;

mod grid;
mod movement;

pub use grid::GridEnvironment;
pub use movement::Direction;

/// Identity of an occupant of the grid's spatial index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(pub u64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Integer grid coordinates
///
/// Positions are values: moving produces a new `Position` rather than mutating one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighbouring position one step in `dir`
    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.vector();
        Self::new(self.x + dx, self.y + dy)
    }

    /// Manhattan distance to `other`
    pub fn manhattan(self, other: Self) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Classification of a single grid cell, fixed when the grid is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Free = 0,
    Blocked = 1,
    Exit = 2,
}

impl Cell {
    /// Map a raster code to a cell: 0 is free, 2 is the exit, anything else blocks
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Cell::Free,
            2 => Cell::Exit,
            _ => Cell::Blocked,
        }
    }
}
