// ── Reconciled dashboard state ──
//
// The single mutable aggregate and its building blocks. Everything here is
// synchronous; the controller serializes access through one task.

mod log_buffer;
mod state;

pub use log_buffer::{BoundedLogBuffer, DEFAULT_FULL_CAPACITY, DEFAULT_RECENT_CAPACITY};
pub use state::{Applied, DashboardSnapshot, DashboardState, EditSnapshot, StreamState, View};
