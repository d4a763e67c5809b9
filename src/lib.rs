//! Hansard Ingestion Core Library
//!
//! Batch ingestion of parliamentary Hansard documents: discovery on a
//! paginated listing site, exactly-once download tracking, text extraction,
//! speaker segmentation and attribution, and idempotent statement storage.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`listing`] - Paginated listing walker with date-window early stop
//! - [`fetch`] - HTTP retrieval with bounded retry and per-host spacing
//! - [`reconcile`] - Resolves listing, file store and database into one action
//! - [`storage`] - Byte-oriented storage port (local filesystem, dry-run overlay)
//! - [`extract`] - Paginated text extraction (PDF, plain text)
//! - [`segment`] - Speaker markers, boilerplate, bill references, name normalisation
//! - [`attribute`] - Exact and fuzzy MP matching with confidence tiers
//! - [`dedup`] - Statement content hashes and at-most-once insertion
//! - [`catalog`] - Download records, sessions, statements, MP roster
//! - [`pipeline`] - Scrape and processing stages, run statistics
//! - [`config`] - TOML file configuration and command-line merge
//! - [`db`] - Connection pool, migrations, schema integrity

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod attribute;
pub mod catalog;
pub mod config;
pub mod db;
pub mod dedup;
pub mod document;
pub mod extract;
pub mod fetch;
pub mod listing;
pub mod pipeline;
pub mod reconcile;
pub mod segment;
pub mod storage;
mod user_agent;

// Re-export commonly used types
pub use attribute::{AttributionConfidence, Attributor, MpRoster};
pub use catalog::{Catalog, CatalogError, DownloadRecord, DownloadStatus};
pub use config::{ConfigError, FileConfig, Overrides, Settings};
pub use db::{Database, DatabaseOptions, DbError};
pub use document::{RemoteDocumentRef, SessionPeriod};
pub use fetch::{FetchError, Fetcher, HttpFetcher, RateLimiter, RetryPolicy};
pub use pipeline::{PipelineError, RunOutcome, RunStatistics};
pub use reconcile::{ReconcileAction, ReconcileOutcome, Reconciler};
pub use storage::{LocalStorage, StorageError, StoragePort};
