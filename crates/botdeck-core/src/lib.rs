//! Reconciliation core between `botdeck-api` and the operator console.
//!
//! - **[`Dashboard`]** -- lifecycle facade. [`start()`](Dashboard::start)
//!   spawns the reconcile task, the status poller and the push bridge;
//!   [`stop()`](Dashboard::stop) tears them down and drops late results.
//!   Every state change is routed through one channel and applied in
//!   arrival order, so the view layer only ever sees whole snapshots.
//!
//! - **[`DashboardState`]** -- the reconciled state itself: polled status
//!   and stats guarded by request sequence numbers, the merged bot config
//!   and masked env, the roster with any open draft overlaid, and the
//!   bounded log buffer.
//!
//! - **[`merge`]** / **[`BotConfig`]** -- deep merge of a partial server
//!   config over the default template, dotted-path editing.
//!
//! - **[`MemberEditSession`]** -- at most one roster entry under edit.
//!
//! - **[`SnapshotStream`]** -- subscription handle for snapshot updates.

pub mod config;
pub mod controller;
pub mod edit;
pub mod env;
pub mod error;
pub mod merge;
pub mod notify;
mod poller;
pub mod store;
pub mod stream;
pub mod validate;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DashboardConfig, TlsVerification};
pub use controller::Dashboard;
pub use edit::{EditPhase, EditPolicy, MemberEditSession};
pub use env::{EnvVars, SECRET_KEYS};
pub use error::CoreError;
pub use merge::{BotConfig, TRAITS_PATH, merge, traits_from_text, traits_to_text};
pub use notify::{Notification, NotificationLevel};
pub use store::{
    Applied, BoundedLogBuffer, DashboardSnapshot, DashboardState, EditSnapshot, StreamState, View,
};
pub use stream::SnapshotStream;
pub use validate::{Validation, ValidationReport, validate};

// Wire types the view layer needs alongside the snapshot.
pub use botdeck_api::{BotStatus, LogEntry, Member, StatsSnapshot};
