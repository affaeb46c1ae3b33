//! # Load Series
//!
//! `load_series` turns a pile of daily grid-load extracts into one gap-free,
//! uniformly sampled series with calendar features attached.
//!
//! Each extract carries a day header (`Journée du DD/MM/YYYY`) followed by
//! delimited rows `time;forecastDayMinus1;forecastDay;consumption` written
//! with decimal commas. The crate is organised as the stages the data flows
//! through:
//!
//! - **Record parser** ([`parser`]): one extract in, typed observations and
//!   rejection counts out
//! - **Series assembler** ([`assembler`]): many extracts merged, sorted and
//!   deduplicated (first seen wins)
//! - **Gap repair** ([`repair`]): outlier filter, resampling onto a fixed
//!   grid, time-weighted interpolation and an hour-of-day median fallback
//! - **Feature enricher** ([`features`]): calendar, cyclic hour and
//!   forecast-error features
//! - **Persistence** ([`persist`]): the clean series as CSV
//!
//! ## Usage Example
//!
//! ```no_run
//! use load_series::{CleaningConfig, CleaningPipeline, SourceFile};
//!
//! let sources = vec![SourceFile::new(
//!     "conso_mix_RTE_2023-01-01.csv",
//!     std::fs::read_to_string("conso_mix_RTE_2023-01-01.csv").unwrap(),
//! )];
//!
//! let pipeline = CleaningPipeline::new(CleaningConfig::default()).unwrap();
//! let clean = pipeline.run(&sources).unwrap();
//! println!("{} points, {} residual missing", clean.points.len(),
//!     clean.report.repair.residual_missing.total());
//! ```

pub mod assembler;
pub mod config;
pub mod error;
pub mod features;
pub mod parser;
pub mod persist;
pub mod pipeline;
pub mod records;
pub mod repair;

// Re-export commonly used types
pub use crate::assembler::{assemble, AssembledSeries};
pub use crate::config::{CleaningConfig, RepairConfig};
pub use crate::error::{Result, SeriesError};
pub use crate::features::{enrich, enrich_all, EnrichedPoint};
pub use crate::parser::{parse_extract, ParseStats, ParsedExtract};
pub use crate::pipeline::{
    CleanSeries, CleaningPipeline, FileStats, PipelineReport, SkippedFile, SourceFile,
};
pub use crate::records::{RawObservation, SeriesPoint, ValueColumn};
pub use crate::repair::{ColumnCounts, GapRepairEngine, RepairReport, RepairedSeries};
