//! Status and stats command handlers.

use botdeck_core::{BotStatus, DashboardConfig, StatsSnapshot};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::{self, Painter};

use super::util;

pub async fn handle_status(config: DashboardConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let dashboard = util::dashboard(config)?;
    let status = dashboard
        .client()
        .bot_status()
        .await
        .map_err(util::core_err)?;

    let paint = Painter::new(global.color);
    let out = output::render_single(
        global.output,
        &status,
        |s| status_detail(s, paint),
        |s| String::from(if s.running { "running" } else { "stopped" }),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn handle_stats(config: DashboardConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let dashboard = util::dashboard(config)?;
    let stats = dashboard
        .client()
        .today_stats()
        .await
        .map_err(util::core_err)?;

    let out = output::render_single(global.output, &stats, stats_detail, |s| {
        format!(
            "{}\t{}\t{}",
            s.messages_received, s.replies_sent, s.proactive_messages
        )
    });
    output::print_output(&out, global.quiet);
    Ok(())
}

fn status_detail(status: &BotStatus, paint: Painter) -> String {
    let state = if status.running {
        paint.good("● running")
    } else {
        paint.bad("○ stopped")
    };
    let mut rows = vec![("Status", state)];
    if let Some(pid) = status.pid {
        rows.push(("PID", pid.to_string()));
    }
    rows.push(("Uptime", status.uptime.clone()));
    if status.running {
        rows.push(("Memory", format!("{:.1} MB", status.memory_mb)));
        rows.push(("CPU", format!("{:.1}%", status.cpu_percent)));
    }
    output::detail(&rows)
}

fn stats_detail(stats: &StatsSnapshot) -> String {
    output::detail(&[
        ("Received", stats.messages_received.to_string()),
        ("Replies", stats.replies_sent.to_string()),
        ("Proactive", stats.proactive_messages.to_string()),
        ("Trigger rate", format!("{:.1}%", stats.trigger_rate * 100.0)),
    ])
}
