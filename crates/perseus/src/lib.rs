//! Perseus exercise archives.
//!
//! Turns an exercise's assessment items into the zip archive the learning
//! platform's exercise player consumes:
//!
//! - [`mastery`] resolves legacy mastery models into m-of-n.
//! - [`normalize`] rewrites item markdown for the player and cleans answers.
//! - [`template`] renders items and `exercise.json` from embedded templates.
//! - [`archive`] assembles the deterministic archive.
//!
//! ```no_run
//! # use studio_perseus::*;
//! # use studio_storage::ContentStore;
//! # async fn example(store: &ContentStore, items: Vec<AssessmentItem>) -> error::Result<()> {
//! let templates = Templates::builtin()?;
//! let config = ExerciseConfig::derive(&ExerciseSettings::default(), &items)?;
//! let archive = ExerciseArchiveBuilder::new(store, &templates)
//!     .with_policy(ItemFailurePolicy::SkipAndLog)
//!     .build(&config, &items)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod archive;
mod consts;
pub mod error;
pub mod exercise;
pub mod item;
pub mod mastery;
pub mod normalize;
pub mod template;

pub use crate::archive::{ExerciseArchiveBuilder, ItemFailurePolicy};
pub use crate::consts::{CONTENT_STORAGE_PLACEHOLDER, IMG_PLACEHOLDER, PERSEUS_IMG_DIR};
pub use crate::exercise::{ExerciseConfig, ExerciseSettings};
pub use crate::item::{Answer, AnswerValue, AssessmentItem, Hint, ItemFile, ItemFilePreset, ItemType, OrderKey};
pub use crate::mastery::{LegacyMasteryType, MasteryModel};
pub use crate::template::Templates;
