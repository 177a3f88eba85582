use std::collections::HashMap;

use log::trace;

use crate::error::{Error, Result};

use super::{AgentId, Cell, Position};

/// A `width x height` grid of fixed cell classifications plus a spatial index of
/// the agents standing on it
///
/// Cells are stored row-major and never change after construction. The spatial
/// index has no internal synchronization: hosts that tick agents in parallel must
/// serialize access to the grid, e.g. behind an `RwLock`.
#[derive(Debug, Clone)]
pub struct GridEnvironment {
    width: i32,
    height: i32,
    cells: Vec<Cell>,
    occupants: HashMap<AgentId, Position>,
}

impl GridEnvironment {
    /// Create a grid where every cell is free
    ///
    /// **Panics** if either dimension is not positive
    pub fn new(width: i32, height: i32) -> Self {
        assert!(
            width > 0 && height > 0,
            "Grid dimensions must be positive, got {width}x{height}."
        );
        Self {
            width,
            height,
            cells: vec![Cell::Free; (width * height) as usize],
            occupants: HashMap::new(),
        }
    }

    /// Create a grid from row-major cells, `y = 0` first
    pub fn from_cells(width: i32, height: i32, cells: Vec<Cell>) -> Result<Self> {
        if width <= 0 || height <= 0 || cells.len() != (width as usize) * (height as usize) {
            return Err(Error::Raster(format!(
                "{} cells cannot fill a {width}x{height} grid",
                cells.len()
            )));
        }
        Ok(Self {
            width,
            height,
            cells,
            occupants: HashMap::new(),
        })
    }

    /// Classify the given cells, leaving the rest as they were
    pub fn with_cells(mut self, cells: impl IntoIterator<Item = (Position, Cell)>) -> Result<Self> {
        for (pos, cell) in cells {
            let i = self.offset(pos.x, pos.y)?;
            self.cells[i] = cell;
        }
        Ok(self)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        0 <= x && x < self.width && 0 <= y && y < self.height
    }

    fn offset(&self, x: i32, y: i32) -> Result<usize> {
        if self.in_bounds(x, y) {
            Ok((y * self.width + x) as usize)
        } else {
            Err(self.out_of_range(x, y))
        }
    }

    pub(crate) fn out_of_range(&self, x: i32, y: i32) -> Error {
        Error::OutOfRange {
            x,
            y,
            width: self.width,
            height: self.height,
        }
    }

    /// Classification of `(x, y)`, or `None` off the grid
    pub fn cell(&self, x: i32, y: i32) -> Option<Cell> {
        self.offset(x, y).ok().map(|i| self.cells[i])
    }

    /// Whether `(x, y)` is on the grid and free
    ///
    /// Exit cells are not routable; check [`is_exit`](Self::is_exit) separately.
    pub fn is_routable(&self, x: i32, y: i32) -> bool {
        self.cell(x, y) == Some(Cell::Free)
    }

    /// Whether `(x, y)` is on the grid and an exit
    pub fn is_exit(&self, x: i32, y: i32) -> bool {
        self.cell(x, y) == Some(Cell::Exit)
    }

    /// Place an occupant in the spatial index
    pub fn insert(&mut self, id: AgentId, pos: Position) -> Result<()> {
        self.offset(pos.x, pos.y)?;
        if self.occupants.contains_key(&id) {
            return Err(Error::AlreadyIndexed(id));
        }
        trace!("Indexed agent {id} at {pos}");
        self.occupants.insert(id, pos);
        Ok(())
    }

    /// Take an occupant out of the spatial index, returning its last position
    pub fn remove(&mut self, id: AgentId) -> Result<Position> {
        let pos = self.occupants.remove(&id).ok_or(Error::NotIndexed(id))?;
        trace!("Unindexed agent {id} from {pos}");
        Ok(pos)
    }

    /// Record a new position for an indexed occupant
    pub fn move_to(&mut self, id: AgentId, pos: Position) -> Result<()> {
        self.offset(pos.x, pos.y)?;
        let slot = self.occupants.get_mut(&id).ok_or(Error::NotIndexed(id))?;
        *slot = pos;
        Ok(())
    }

    /// Indexed position of an occupant
    pub fn position_of(&self, id: AgentId) -> Option<Position> {
        self.occupants.get(&id).copied()
    }

    /// Occupants currently indexed at `pos`
    pub fn occupants_at(&self, pos: Position) -> impl Iterator<Item = AgentId> + '_ {
        self.occupants
            .iter()
            .filter(move |(_, &p)| p == pos)
            .map(|(&id, _)| id)
    }

    /// Number of indexed occupants
    pub fn occupant_count(&self) -> usize {
        self.occupants.len()
    }
}
