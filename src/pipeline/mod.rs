//! This module contains the pull pipeline itself: what a chain is built from
//! (`plan`), the per-codec stage (`stage`), the top-level driver (`driver`),
//! and concurrent draining of independent chains (`parallel`).

//==================================================================================
// 1. Module Declarations
//==================================================================================
pub mod driver;
pub mod parallel;
pub mod plan;
pub mod stage;


//==================================================================================
// 2. Public API Re-exports
//==================================================================================
pub use self::driver::{Pipeline, ProgressObserver};
pub use self::parallel::drain_independent;
pub use self::plan::{ChainPlan, CodecMethod};
pub use self::stage::{CodecStage, TransformStage};
