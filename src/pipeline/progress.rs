//! Progress reporting and cancellation support for the cross-fit driver.
//!
//! This module provides types for tracking fit progress and supporting
//! cancellation from external threads (e.g., a UI cancel button), at the
//! granularity the driver actually works at: one origin column, one fold.
//!
//! # Example
//!
//! ```rust,ignore
//! use vartreat::{CancellationToken, ClosureProgressReporter};
//!
//! let token = CancellationToken::new();
//! let token_clone = token.clone();
//!
//! std::thread::spawn(move || {
//!     std::thread::sleep(std::time::Duration::from_secs(5));
//!     token_clone.cancel();
//! });
//!
//! let reporter = ClosureProgressReporter::new(|update| {
//!     println!("[{:?}] {}", update.stage, update.message);
//! });
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Stages of a single `TreatmentPlan::fit` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitStage {
    /// Partitioning rows into folds.
    Splitting,
    /// Fitting and applying per-column, per-fold encoders.
    Encoding,
    /// Fitting the full-data (deployment) encoder set.
    FullDataFit,
    /// Scoring derived columns against the outcome.
    Scoring,
    /// Fit completed successfully.
    Complete,
    /// Fit was cancelled by the caller.
    Cancelled,
    /// Fit failed with an error.
    Failed,
}

impl FitStage {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Splitting => "Splitting",
            Self::Encoding => "Encoding",
            Self::FullDataFit => "Fitting Deployment Encoders",
            Self::Scoring => "Scoring",
            Self::Complete => "Complete",
            Self::Cancelled => "Cancelled",
            Self::Failed => "Failed",
        }
    }
}

/// One progress update from the cross-fit driver, addressed by the
/// origin column and fold it concerns rather than an overall percentage
/// (there is no reliable way to know the total unit count ahead of the
/// split plan and encoder instantiation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitProgress {
    pub stage: FitStage,

    /// The origin column this update concerns, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_column: Option<String>,

    /// The fold index this update concerns, if any (`None` for full-data
    /// fits, which run once over the whole training set).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fold: Option<usize>,

    pub message: String,
}

impl FitProgress {
    pub fn new(stage: FitStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            origin_column: None,
            fold: None,
            message: message.into(),
        }
    }

    pub fn for_fold(stage: FitStage, origin_column: impl Into<String>, fold: usize, message: impl Into<String>) -> Self {
        Self {
            stage,
            origin_column: Some(origin_column.into()),
            fold: Some(fold),
            message: message.into(),
        }
    }

    pub fn for_column(stage: FitStage, origin_column: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage,
            origin_column: Some(origin_column.into()),
            fold: None,
            message: message.into(),
        }
    }

    pub fn complete(message: impl Into<String>) -> Self {
        Self::new(FitStage::Complete, message)
    }

    pub fn cancelled() -> Self {
        Self::new(FitStage::Cancelled, "fit cancelled by caller")
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(FitStage::Failed, message)
    }
}

/// Trait for receiving progress updates during a fit. Implementations must
/// be `Send + Sync` so a reporter can be shared with a worker pool.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: FitProgress);
}

/// A no-op reporter, used as the default when the caller registers none.
pub struct NullProgressReporter;

impl ProgressReporter for NullProgressReporter {
    fn report(&self, _update: FitProgress) {}
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(FitProgress) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(FitProgress) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(FitProgress) + Send + Sync,
{
    fn report(&self, update: FitProgress) {
        (self.callback)(update);
    }
}

/// Token for cancelling a running fit. Clone and share across threads;
/// call [`cancel()`](Self::cancel) from any of them.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(CancellationToken: Send, Sync);
static_assertions::assert_impl_all!(FitProgress: Send, Sync);

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn cancellation_token_default_not_cancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn cancellation_token_cancel_and_reset() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(token.is_cancelled());
        token.reset();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn cancellation_across_threads() {
        let token = CancellationToken::new();
        let token_clone = token.clone();

        let handle = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(20));
            token_clone.is_cancelled()
        });

        token.cancel();
        assert!(handle.join().unwrap());
    }

    #[test]
    fn closure_reporter_invoked_per_update() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();
        let reporter = ClosureProgressReporter::new(move |_update| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        reporter.report(FitProgress::for_fold(FitStage::Encoding, "x", 0, "fold 0"));
        reporter.report(FitProgress::complete("done"));

        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn fit_progress_json_serialization() {
        let update = FitProgress::for_fold(FitStage::Encoding, "age", 2, "fitting impact encoder");
        let json = serde_json::to_string(&update).unwrap();
        assert!(json.contains("\"stage\":\"encoding\""));
        assert!(json.contains("\"origin_column\":\"age\""));
        assert!(json.contains("\"fold\":2"));

        let deserialized: FitProgress = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.fold, Some(2));
    }

    #[test]
    fn null_reporter_accepts_updates_without_panicking() {
        let reporter = NullProgressReporter;
        reporter.report(FitProgress::new(FitStage::Splitting, "partitioning rows"));
    }
}
