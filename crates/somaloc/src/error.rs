/// Failures raised by the refinement stages.
///
/// All variants are local to one seed; batch entry points report them per
/// seed and continue.
#[derive(Debug, Clone, PartialEq)]
pub enum RefineError {
    /// A required voxel read fell outside the cell stack.
    OutOfBounds {
        /// Requested point in cell-stack coordinates.
        point: [i32; 3],
    },
    /// A sampling stage found no voxel to average over.
    DegenerateNeighborhood {
        /// Stage that produced the empty set.
        stage: &'static str,
    },
    /// Configuration failed validation.
    InvalidConfig(String),
}

impl std::fmt::Display for RefineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfBounds { point } => write!(
                f,
                "point ({}, {}, {}) is outside the cell stack",
                point[0], point[1], point[2]
            ),
            Self::DegenerateNeighborhood { stage } => {
                write!(f, "empty neighborhood in {}", stage)
            }
            Self::InvalidConfig(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for RefineError {}
