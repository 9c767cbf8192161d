//! Ariel - Multi-source topic analysis
//!
//! Fans a topic out to independent information sources, analyzes their text
//! segment by segment with a reasoning model, and combines everything into
//! one report.
//!
//! # Overview
//!
//! Ariel:
//! - Queries a research API and a video platform for a topic, concurrently
//! - Splits the returned text into bounded segments and judges each one
//! - Aggregates segment judgments into one result per source
//! - Synthesizes a cross-source narrative with follow-up questions
//!
//! A failing or slow source never fails the run: it contributes a neutral
//! fallback result and the report says so.
//!
//! # Architecture
//!
//! - `config` - Configuration management and prompt templates
//! - `provider` - Reasoning provider abstraction (live and fake)
//! - `source` - Source adapters (research, video)
//! - `chunking` - Segmentation of long text
//! - `analysis` - Segment analysis, aggregation and synthesis
//! - `report` - The final report
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use ariel::config::Settings;
//! use ariel::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(&settings)?;
//!
//!     let report = orchestrator.run("quantum computing").await?;
//!     println!("{}", report.to_text());
//!
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod provider;
pub mod report;
pub mod source;

pub use error::{ArielError, Result};
