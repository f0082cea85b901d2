//! Seed-to-centroid orchestration.
//!
//! Primitives live in `crate::cell` and `crate::modes`; this layer wires
//! them in order (crop → border policy → local max → threshold → profile →
//! peaks → mean shift → second pass) and fans seeds out over a batch.
//!
//! Entry points:
//! - `refine_cell`: one seed
//! - `refine_cells` / `refine_cells_par`: all seeds, sequential or on the
//!   rayon pool

mod batch;
mod result;
mod run;

pub use batch::{refine_cells, refine_cells_par};
pub use result::{BatchResult, BatchSummary, CellResult, CellStatus, RefineDiagnostics};
pub use run::refine_cell;
