//! Progress reporting and cancellation, shared by the cross-fit driver.

pub mod progress;

pub use progress::{
    CancellationToken, ClosureProgressReporter, FitProgress, FitStage, NullProgressReporter,
    ProgressReporter,
};
