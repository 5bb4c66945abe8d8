/// Reasons a level (or level pack) cannot be loaded.
#[derive(Debug, Clone, PartialEq)]
pub enum LevelError {
    /// The grid has no rows or its first row is empty.
    EmptyGrid { level: String },
    /// A row's length differs from the first row's.
    RaggedRow {
        level: String,
        row: usize,
        expected: usize,
        found: usize,
    },
    /// Global level index outside the pack.
    UnknownLevel(usize),
    /// The level exists but its predecessor has not been completed.
    Locked(usize),
    /// The pack file could not be read or decoded.
    Pack(String),
}

impl std::fmt::Display for LevelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyGrid { level } => write!(f, "level '{level}' has an empty grid"),
            Self::RaggedRow {
                level,
                row,
                expected,
                found,
            } => write!(
                f,
                "level '{level}' row {row} has {found} cells, expected {expected}"
            ),
            Self::UnknownLevel(i) => write!(f, "no level with index {i}"),
            Self::Locked(i) => write!(f, "level {i} is locked"),
            Self::Pack(m) => write!(f, "invalid level pack: {m}"),
        }
    }
}

impl std::error::Error for LevelError {}
