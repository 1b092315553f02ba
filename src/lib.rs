//! Statistically Honest Variable Treatment Plans
//!
//! `vartreat` fits cross-validated ("cross-fit") encoders for heterogeneous
//! tabular data: categorical levels, missing-value indicators, and
//! numeric cleaning, all estimated out-of-fold so that downstream models
//! never train on a column that was fit against the same rows it
//! describes.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use vartreat::{Column, Frame, OutcomeSpec, Parameters, TreatmentPlan};
//!
//! let frame = Frame::new(vec![
//!     Column::categorical("city", vec![Some("nyc".into()), Some("sf".into())]),
//!     Column::numeric("income", vec![Some(85_000.0), Some(120_000.0)]),
//! ])?;
//!
//! let outcome = OutcomeSpec::Binomial {
//!     column: "churned".to_string(),
//!     positive_value: "yes".to_string(),
//! };
//!
//! let (plan, cross_frame) = TreatmentPlan::fit_transform(
//!     &frame,
//!     outcome,
//!     &["city".to_string(), "income".to_string()],
//!     Parameters::default(),
//! )?;
//!
//! println!("recommended features: {:?}", plan.feature_names());
//! # Ok::<(), vartreat::VartreatError>(())
//! ```
//!
//! # Progress and Cancellation
//!
//! A long-running fit can be observed and cancelled cooperatively:
//!
//! ```rust,ignore
//! use vartreat::{CancellationToken, ClosureProgressReporter};
//!
//! let token = CancellationToken::new();
//! let reporter = ClosureProgressReporter::new(|update| {
//!     println!("[{:?}] {}", update.stage, update.message);
//! });
//! ```
//!
//! # Multinomial Outcomes
//!
//! A K-class categorical outcome is fit through [`MultinomialPlan`] rather
//! than [`TreatmentPlan`]; see its docs for the per-class fan-out.

pub mod config;
pub mod crossfit;
pub mod encoders;
pub mod error;
pub mod frame;
pub mod multinomial;
pub mod outcome;
pub mod pipeline;
pub mod plan;
pub mod regression;
pub mod sanitize;
pub mod scale;
pub mod scorer;
pub mod split;
pub mod stats;

pub use config::{ConfigValidationError, EncoderKind, MissingnessImputation, Parameters, ParametersBuilder};
pub use crossfit::CrossFitOutput;
pub use encoders::Encoder;
pub use error::{Result, ResultExt, VartreatError};
pub use frame::{Column, ColumnData, Frame};
pub use multinomial::MultinomialPlan;
pub use outcome::OutcomeSpec;
pub use pipeline::{
    CancellationToken, ClosureProgressReporter, FitProgress, FitStage, NullProgressReporter, ProgressReporter,
};
pub use plan::{PLAN_VERSION, TransformOutput, TreatmentPlan};
pub use scorer::{DerivedColumn, ScoreRow};
pub use split::{Fold, PrecomputedSplit, SimpleKFold, SplitPlanner, StratifiedKFold};
