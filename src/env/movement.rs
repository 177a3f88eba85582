use rand::Rng;
use strum::{EnumIter, FromRepr, VariantArray};

/// The four cardinal moves available to an agent
///
/// The discriminant is the action index used by the Q-table, so the variant order
/// must not change. North points towards increasing `y`.
#[derive(EnumIter, VariantArray, FromRepr, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    North = 0,
    East = 1,
    South = 2,
    West = 3,
}

impl Direction {
    /// Number of actions
    pub const COUNT: usize = 4;

    /// Action index of this direction
    pub fn index(self) -> usize {
        self as usize
    }

    /// Direction for an action index, if it names one
    pub fn from_index(index: usize) -> Option<Self> {
        Self::from_repr(index)
    }

    /// Unit displacement `(dx, dy)`
    pub fn vector(self) -> (i32, i32) {
        match self {
            Direction::North => (0, 1),
            Direction::East => (1, 0),
            Direction::South => (0, -1),
            Direction::West => (-1, 0),
        }
    }

    /// Uniformly sample one of the four directions
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::VARIANTS[rng.gen_range(0..Self::COUNT)]
    }
}
