//! # Library Synchronization Engine
//!
//! Reconciles the device-wide media index with the local library store.
//!
//! ## Overview
//!
//! A scan runs in two halves:
//! - **Planning** enumerates one scope of the media index and computes a
//!   [`ReconciliationPlan`] without writing anything
//! - **Applying** writes the plan in a fixed order and recomputes the derived
//!   statistics of every album and artist it touched
//!
//! User-owned song state (play counts, favorites, ratings) is never written by
//! a scan.
//!
//! ## Components
//!
//! - **Validity Filter** (`filter`): drops records that are not playable files
//! - **Change Classifier** (`classifier`): New / Updated / Unchanged per path
//! - **Aggregator** (`aggregator`): proposes previously-unseen albums and artists
//! - **Reconciliation Planner** (`planner`): runs the planning phases per scope
//! - **Store Writer** (`writer`): ordered writes plus statistic recompute
//! - **Scan Report** (`report`): counters returned to the caller
//! - **Scan State Machine** (`state`): validated pipeline transitions
//! - **Scan Coordinator** (`coordinator`): entry point, events, timeout, retry

pub mod aggregator;
pub mod classifier;
pub mod coordinator;
pub mod error;
pub mod filter;
pub mod plan;
pub mod planner;
pub mod report;
pub mod scope;
pub mod state;
pub mod store;
pub mod writer;

pub use aggregator::{aggregate, AggregationResult, AlbumCandidate, ArtistCandidate};
pub use classifier::{changed_fields, classify, Classification, SongField};
pub use coordinator::ScanCoordinator;
pub use error::{Result, SyncError};
pub use filter::{FilterPolicy, RejectReason, ValidityFilter};
pub use plan::{ReconciliationPlan, SongChange, SongRemoval};
pub use planner::{normalize_names, ReconciliationPlanner};
pub use report::ScanReport;
pub use scope::ScanScope;
pub use state::{ScanId, ScanState, ScanStateMachine};
pub use store::LibraryStore;
pub use writer::{ApplyOutcome, StoreWriter};
