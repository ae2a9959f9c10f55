//! Live status line.
//!
//! Runs a full dashboard session (poller and push channel) and prints one
//! line whenever the bot status, today's counters, or the push channel
//! state change. Notifications go to stderr.

use botdeck_core::{
    BotStatus, Dashboard, DashboardConfig, DashboardSnapshot, NotificationLevel, StatsSnapshot,
    StreamState,
};
use futures_util::StreamExt;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output::{self, Painter};

use super::util;

#[derive(Serialize)]
struct WatchLine<'a> {
    status: &'a BotStatus,
    stats: &'a StatsSnapshot,
    stream: &'a StreamState,
}

pub async fn handle(config: DashboardConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let dashboard = Dashboard::new(config)?;
    let mut notifications = dashboard.notifications();
    let mut snapshots = dashboard.subscribe().into_stream();
    dashboard.start().await?;

    let paint = Painter::new(global.color);
    let mut last_line = String::new();

    loop {
        tokio::select! {
            () = util::interrupted() => break,
            snap = snapshots.next() => {
                let Some(snap) = snap else { break };
                let line = render(&snap, global.output, paint);
                if line != last_line {
                    output::print_output(&line, global.quiet);
                    last_line = line;
                }
            }
            note = notifications.recv() => match note {
                Ok(note) if !global.quiet => {
                    let tag = match note.level {
                        NotificationLevel::Success => paint.good("✓"),
                        NotificationLevel::Info => paint.dim("i"),
                        NotificationLevel::Warning => paint.warn("!"),
                        NotificationLevel::Error => paint.bad("✗"),
                    };
                    eprintln!("{tag} {}", note.message);
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }

    dashboard.stop().await;
    Ok(())
}

fn render(snap: &DashboardSnapshot, format: OutputFormat, paint: Painter) -> String {
    match format {
        OutputFormat::Table | OutputFormat::Plain => status_line(snap, paint),
        OutputFormat::Json | OutputFormat::JsonCompact | OutputFormat::Yaml => {
            output::render_json_compact(&WatchLine {
                status: &snap.status,
                stats: &snap.stats,
                stream: &snap.stream,
            })
        }
    }
}

fn status_line(snap: &DashboardSnapshot, paint: Painter) -> String {
    let status = &snap.status;
    let state = if status.running {
        paint.good("● running")
    } else {
        paint.bad("○ stopped")
    };
    let process = if status.running {
        format!(
            "up {}  mem {:.1} MB  cpu {:.1}%",
            status.uptime, status.memory_mb, status.cpu_percent
        )
    } else {
        String::new()
    };
    let stats = &snap.stats;
    let counters = format!(
        "recv {}  replies {}  proactive {}",
        stats.messages_received, stats.replies_sent, stats.proactive_messages
    );
    let stream = match &snap.stream {
        StreamState::Disabled => paint.dim("push off"),
        StreamState::Connecting => paint.dim("connecting"),
        StreamState::Connected => paint.good("live"),
        StreamState::Disconnected { reason } => paint.warn(&format!("offline ({reason})")),
    };
    [state, process, counters, stream]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" │ ")
}
