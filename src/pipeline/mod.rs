//! Reading Pipeline
//!
//! ```text
//! reading ─► stress index ─► detect (remote | fallback) ─► ScoredReading
//!                                                              │
//!               ActivityEntry + HistoricalPoint ◄──────────────┤
//!               AnomalyRecord (flagged only)    ◄──────────────┘
//!                       │
//!                       ▼
//!          HistoryTracker (AppState lock) + AnomalyStore
//! ```
//!
//! Readings arrive from the live simulator feed, the startup backfill, or
//! `POST /api/v1/nodes/:node_id/readings`.

mod state;
mod processor;
pub mod live_feed;

pub use state::*;
pub use processor::{BackfillStats, ProcessedReading, ReadingPipeline};
pub use live_feed::{FeedStats, LiveFeed};
