//! Log output handlers.

use std::sync::Arc;

use botdeck_core::{BoundedLogBuffer, Dashboard, DashboardConfig, LogEntry, StreamState};

use crate::cli::{GlobalOpts, LogsArgs, OutputFormat};
use crate::error::CliError;
use crate::output::{self, Painter};

use super::util;

pub async fn handle(
    config: DashboardConfig,
    args: LogsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if args.follow {
        return follow(config, args.recent, global).await;
    }

    let (full, recent) = (config.log_capacity, config.recent_capacity);
    let dashboard = util::dashboard(config)?;
    let backlog = dashboard
        .client()
        .recent_logs(full)
        .await
        .map_err(util::core_err)?;

    let mut buffer = BoundedLogBuffer::new(full, recent);
    buffer.seed(backlog);
    let entries = if args.recent {
        buffer.recent()
    } else {
        buffer.all()
    };
    print_entries(&entries, global);
    Ok(())
}

/// Print the backlog, then every new line from the push channel until
/// Ctrl-C.
async fn follow(
    mut config: DashboardConfig,
    recent_only: bool,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    config.push_enabled = true;
    let dashboard = Dashboard::new(config)?;
    dashboard.set_view(botdeck_core::View::Logs).await;
    let mut snapshots = dashboard.subscribe();
    dashboard.start().await?;

    let paint = Painter::new(global.color);
    let mut last: Option<Arc<LogEntry>> = None;
    let mut stream = StreamState::Connecting;
    let mut first = true;

    loop {
        let snap = snapshots.latest();
        if snap.stream != stream {
            report_stream(&snap.stream, paint, global);
            stream = snap.stream.clone();
        }

        let source = if first && recent_only {
            &snap.recent_logs
        } else {
            &snap.logs
        };
        let fresh = unseen(source, last.as_ref());
        if fresh.reseeded && last.is_some() && !global.quiet {
            eprintln!("{}", paint.dim("── log backlog reloaded ──"));
        }
        print_entries(fresh.entries, global);
        if let Some(tail) = source.last() {
            last = Some(Arc::clone(tail));
        }
        first = false;

        tokio::select! {
            () = util::interrupted() => break,
            changed = snapshots.changed() => {
                if changed.is_none() {
                    break;
                }
            }
        }
    }

    dashboard.stop().await;
    Ok(())
}

struct Unseen<'a> {
    entries: &'a [Arc<LogEntry>],
    /// The previously printed tail is gone: the buffer was reseeded.
    reseeded: bool,
}

/// Entries after the last one already printed.
fn unseen<'a>(logs: &'a [Arc<LogEntry>], last: Option<&Arc<LogEntry>>) -> Unseen<'a> {
    let Some(last) = last else {
        return Unseen {
            entries: logs,
            reseeded: false,
        };
    };
    match logs.iter().rposition(|e| Arc::ptr_eq(e, last)) {
        Some(pos) => Unseen {
            entries: logs.get(pos + 1..).unwrap_or_default(),
            reseeded: false,
        },
        None => Unseen {
            entries: logs,
            reseeded: true,
        },
    }
}

fn report_stream(state: &StreamState, paint: Painter, global: &GlobalOpts) {
    if global.quiet {
        return;
    }
    match state {
        StreamState::Connected => eprintln!("{}", paint.dim("── live ──")),
        StreamState::Disconnected { reason } => {
            eprintln!("{}", paint.warn(&format!("── disconnected: {reason} ──")));
        }
        StreamState::Connecting | StreamState::Disabled => {}
    }
}

fn print_entries(entries: &[Arc<LogEntry>], global: &GlobalOpts) {
    for entry in entries {
        output::print_output(&format_entry(entry, global.output), global.quiet);
    }
}

fn format_entry(entry: &LogEntry, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table | OutputFormat::Plain => match entry.level {
            Some(ref level) => format!("[{}] {level}: {}", entry.timestamp, entry.message),
            None => format!("[{}] {}", entry.timestamp, entry.message),
        },
        // One document per line so the stream stays parseable.
        OutputFormat::Json | OutputFormat::JsonCompact | OutputFormat::Yaml => {
            output::render_json_compact(entry)
        }
    }
}
