#![allow(clippy::unwrap_used)]
// Integration tests for the `Dashboard` lifecycle against a wiremock
// admin server. The push channel is disabled throughout; push handling is
// covered by the state unit tests and the botdeck-api push tests.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use botdeck_core::{
    CoreError, Dashboard, DashboardConfig, NotificationLevel, StreamState, Validation, View,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, Dashboard) {
    let server = MockServer::start().await;
    let mut config = DashboardConfig::new(Url::parse(&server.uri()).unwrap());
    config.push_enabled = false;
    config.poll_interval = Duration::from_secs(60);
    let dashboard = Dashboard::new(config).unwrap();
    (server, dashboard)
}

fn ok() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true }))
}

fn members(list: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true, "members": list }))
}

async fn mount_config(server: &MockServer, config: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "config": config,
            "env": { "DEEPSEEK_API_KEY": "sk-abcdefghijkl" }
        })))
        .mount(server)
        .await;
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_state_calls_before_start_are_rejected() {
    let (_server, dashboard) = setup().await;

    assert!(matches!(
        dashboard.clear_logs().await,
        Err(CoreError::NotRunning)
    ));
    assert!(matches!(
        dashboard.start_edit("10001").await,
        Err(CoreError::NotRunning)
    ));
    // Stopping a dashboard that never started is a no-op.
    dashboard.stop().await;
}

#[tokio::test]
async fn test_initial_load_merges_config_and_masks_env() {
    let (server, dashboard) = setup().await;
    mount_config(&server, json!({ "bot": { "qq_number": "10001" } })).await;

    dashboard.start().await.unwrap();
    let snap = dashboard.settled_snapshot().await.unwrap();
    dashboard.stop().await;

    assert!(snap.config_loaded);
    assert_eq!(snap.config["bot"]["qq_number"], "10001");
    // Template fields the server omitted are still present.
    assert_eq!(snap.config["bot"]["admin_qq"], "");
    assert_eq!(snap.config["features"]["smart_reply"], true);
    assert_eq!(snap.env["DEEPSEEK_API_KEY"], "sk-********");
    assert_eq!(snap.env["DASHSCOPE_API_KEY"], "");
    assert_eq!(snap.stream, StreamState::Disabled);
}

#[tokio::test]
async fn test_server_fallback_config_loads() {
    let (server, dashboard) = setup().await;
    mount_config(
        &server,
        json!({
            "bot": { "qq_number": "", "admin_qq": "", "target_group": "" },
            "personality": {
                "name": "",
                "nickname": "",
                "background": "",
                "appearance": { "height": "", "hair": "", "features": "", "aura": "" },
                "character": { "core": "", "traits": [] },
                "speaking_style": { "tone": "", "manner": "", "response": "", "emoji_usage": "" }
            },
            "features": {},
            "ai": {}
        }),
    )
    .await;

    dashboard.start().await.unwrap();
    let snap = dashboard.settled_snapshot().await.unwrap();
    dashboard.stop().await;

    assert!(snap.config_loaded);
    assert_eq!(snap.config["personality"]["appearance"]["aura"], "");
    assert_eq!(snap.config["personality"]["speaking_style"]["tone"], "");
    assert_eq!(snap.config["ai"]["temperature"], 0.7);
}

#[tokio::test]
async fn test_log_backlog_seeded_without_push() {
    let (server, dashboard) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/logs/recent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "logs": [
                { "timestamp": "08:00:00", "message": "boot" },
                { "timestamp": "08:00:01", "message": "ready" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    dashboard.start().await.unwrap();
    let snap = dashboard.settled_snapshot().await.unwrap();
    dashboard.stop().await;

    let messages: Vec<_> = snap.logs.iter().map(|l| l.message.as_str()).collect();
    assert_eq!(messages, ["boot", "ready"]);
    assert_eq!(snap.recent_logs[0].message, "ready");
}

#[tokio::test]
async fn test_result_arriving_after_stop_is_discarded() {
    let (server, dashboard) = setup().await;

    // The initial load gets an empty roster quickly; the next fetch is slow.
    Mock::given(method("GET"))
        .and(path("/api/members"))
        .respond_with(members(json!([])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/members"))
        .respond_with(
            members(json!([{ "qq": "10001", "nickname": "late" }]))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    dashboard.start().await.unwrap();

    let in_flight = {
        let dashboard = dashboard.clone();
        tokio::spawn(async move { dashboard.refresh_members().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    dashboard.stop().await;

    in_flight.await.unwrap().unwrap();
    assert!(dashboard.snapshot().members.is_empty());
}

// ── Polling ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_stats_not_polled_outside_dashboard_view() {
    let (server, dashboard) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/bot/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "running": false })))
        .expect(1..)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/stats/today"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "messages_received": 1 }
        })))
        .expect(0)
        .mount(&server)
        .await;

    dashboard.set_view(View::Logs).await;
    dashboard.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    dashboard.stop().await;

    assert_eq!(dashboard.snapshot().view, View::Logs);
}

#[tokio::test]
async fn test_poll_now_fetches_status_and_stats() {
    let (server, dashboard) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/bot/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "running": true,
            "uptime": "1:00:00",
            "pid": 4242
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/stats/today"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "messages_received": 12, "replies_sent": 3 }
        })))
        .mount(&server)
        .await;

    dashboard.start().await.unwrap();
    dashboard.poll_now();
    tokio::time::sleep(Duration::from_millis(200)).await;
    let snap = dashboard.settled_snapshot().await.unwrap();
    dashboard.stop().await;

    assert!(snap.status.running);
    assert_eq!(snap.status.pid, Some(4242));
    assert_eq!(snap.stats.messages_received, 12);
}

// ── Bot control ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_rejected_bot_start_notifies_server_message() {
    let (server, dashboard) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/bot/start"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": false, "error": "Bot已在运行" })),
        )
        .mount(&server)
        .await;

    let mut notifications = dashboard.notifications();
    let err = dashboard.start_bot().await.unwrap_err();
    assert!(matches!(err, CoreError::Rejected { ref message } if message == "Bot已在运行"));

    let note = notifications.recv().await.unwrap();
    assert_eq!(note.level, NotificationLevel::Error);
    assert!(note.message.contains("Bot已在运行"), "got: {}", note.message);
}

#[tokio::test]
async fn test_bot_stop_success_notifies() {
    let (server, dashboard) = setup().await;
    Mock::given(method("POST"))
        .and(path("/api/bot/stop"))
        .respond_with(ok())
        .expect(1)
        .mount(&server)
        .await;

    let mut notifications = dashboard.notifications();
    dashboard.stop_bot().await.unwrap();

    let note = notifications.recv().await.unwrap();
    assert_eq!(note.level, NotificationLevel::Success);
    assert_eq!(note.message, "Bot stopped");
}

// ── Configuration ───────────────────────────────────────────────────

#[tokio::test]
async fn test_strict_save_blocks_invalid_config() {
    let (server, dashboard) = setup().await;
    mount_config(&server, json!({})).await;
    Mock::given(method("POST"))
        .and(path("/api/config"))
        .respond_with(ok())
        .expect(0)
        .mount(&server)
        .await;

    dashboard.start().await.unwrap();
    let err = dashboard.save_config(Validation::Strict).await.unwrap_err();
    dashboard.stop().await;

    let CoreError::ValidationFailed { errors } = err else {
        panic!("expected validation failure, got: {err:?}");
    };
    assert!(errors.iter().any(|e| e.contains("bot.qq_number")));
}

#[tokio::test]
async fn test_save_refused_when_config_never_loaded() {
    let (server, dashboard) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/config"))
        .respond_with(ok())
        .expect(0)
        .mount(&server)
        .await;

    dashboard.start().await.unwrap();
    let mut notifications = dashboard.notifications();
    let err = dashboard.save_config(Validation::Skip).await.unwrap_err();
    let snap = dashboard.settled_snapshot().await.unwrap();
    dashboard.stop().await;

    assert!(matches!(err, CoreError::ConfigNotLoaded), "got: {err:?}");
    assert!(!snap.config_loaded);
    let note = notifications.recv().await.unwrap();
    assert_eq!(note.level, NotificationLevel::Error);
    assert!(note.message.starts_with("Save failed"));
}

#[tokio::test]
async fn test_edited_config_is_saved() {
    let (server, dashboard) = setup().await;
    mount_config(
        &server,
        json!({ "bot": { "qq_number": "1", "admin_qq": "2", "target_group": "3" } }),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/api/config"))
        .respond_with(ok())
        .expect(1)
        .mount(&server)
        .await;

    dashboard.start().await.unwrap();
    dashboard
        .set_config_value("ai.temperature", json!(0.3))
        .await
        .unwrap();
    dashboard.set_traits_text("calm\n; curious ;").await.unwrap();
    let mut notifications = dashboard.notifications();
    let report = dashboard.save_config(Validation::Strict).await.unwrap();
    let snap = dashboard.settled_snapshot().await.unwrap();
    dashboard.stop().await;

    assert!(report.is_ok());
    assert_eq!(
        snap.config["personality"]["character"]["traits"],
        json!(["calm", "curious"])
    );
    let note = notifications.recv().await.unwrap();
    assert_eq!(note.level, NotificationLevel::Success);
}

// ── Member editing ──────────────────────────────────────────────────

#[tokio::test]
async fn test_member_save_reloads_roster() {
    let (server, dashboard) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/members"))
        .respond_with(members(json!([{ "qq": "10001", "nickname": "old" }])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/members"))
        .respond_with(members(json!([{ "qq": "10001", "nickname": "new" }])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/members/10001"))
        .respond_with(ok())
        .expect(1)
        .mount(&server)
        .await;

    dashboard.start().await.unwrap();
    dashboard.start_edit("10001").await.unwrap();
    let draft = dashboard
        .edit_draft(|m| m.nickname = Some("new".into()))
        .await
        .unwrap();
    assert_eq!(draft.nickname.as_deref(), Some("new"));

    let mut notifications = dashboard.notifications();
    dashboard.save_member().await.unwrap();
    let snap = dashboard.settled_snapshot().await.unwrap();
    dashboard.stop().await;

    assert!(snap.edit.is_none());
    assert_eq!(snap.members[0].nickname.as_deref(), Some("new"));
    let note = notifications.recv().await.unwrap();
    assert_eq!(note.message, "Member new saved");
}

#[tokio::test]
async fn test_failed_member_save_keeps_draft() {
    let (server, dashboard) = setup().await;
    Mock::given(method("GET"))
        .and(path("/api/members"))
        .respond_with(members(json!([{ "qq": "42", "nickname": "x" }])))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/members/42"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": false, "error": "成员不存在" })),
        )
        .mount(&server)
        .await;

    dashboard.start().await.unwrap();
    dashboard.start_edit("42").await.unwrap();
    dashboard
        .edit_draft(|m| m.notes = Some("vip".into()))
        .await
        .unwrap();
    let err = dashboard.save_member().await.unwrap_err();
    let snap = dashboard.settled_snapshot().await.unwrap();
    dashboard.stop().await;

    assert!(matches!(err, CoreError::Rejected { .. }));
    let edit = snap.edit.unwrap();
    assert!(edit.dirty);
    assert_eq!(edit.draft.notes.as_deref(), Some("vip"));
    // The roster shows the draft while it is open.
    assert_eq!(snap.members[0].notes.as_deref(), Some("vip"));
}

#[tokio::test]
async fn test_start_edit_unknown_member() {
    let (_server, dashboard) = setup().await;

    dashboard.start().await.unwrap();
    let err = dashboard.start_edit("999").await.unwrap_err();
    dashboard.stop().await;

    assert!(matches!(err, CoreError::MemberNotFound { ref qq } if qq == "999"));
}
