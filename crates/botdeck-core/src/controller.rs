// ── Dashboard lifecycle ──
//
// Explicit start/stop object owning every background task of a console
// session: the reconcile task (sole owner of `DashboardState`), the status
// poller, and the push bridge. All state changes travel through one mpsc
// channel and are applied in arrival order by the reconcile task, which
// publishes a fresh snapshot after each batch.
//
// Fetches capture the session's sender when they start. Stopping the
// session drops the receiver, so a response that lands after teardown
// has nowhere to go and is discarded.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use botdeck_api::transport::{TlsMode, TransportConfig};
use botdeck_api::{
    BotStatus, DashboardClient, LogEntry, Member, PushEvent, PushHandle, StatsSnapshot,
};
use secrecy::SecretString;
use serde_json::Value;
use tokio::sync::{Mutex, Notify, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::{DashboardConfig, TlsVerification};
use crate::error::CoreError;
use crate::merge::BotConfig;
use crate::notify::{Notification, NotificationLevel};
use crate::poller::poll_task;
use crate::store::{DashboardSnapshot, DashboardState, StreamState, View};
use crate::stream::SnapshotStream;
use crate::validate::{Validation, ValidationReport};

const UPDATE_CHANNEL_SIZE: usize = 256;
const NOTIFICATION_CHANNEL_SIZE: usize = 64;

// ── Updates ──────────────────────────────────────────────────────

type Mutation = Box<dyn FnOnce(&mut DashboardState) + Send>;

/// One state change, applied by the reconcile task.
pub(crate) enum Update {
    Status { seq: u64, status: BotStatus },
    Stats { seq: u64, stats: StatsSnapshot },
    Members { seq: u64, members: Vec<Member> },
    SeedLogs(Vec<LogEntry>),
    Push(Arc<PushEvent>),
    View(View),
    /// Operator intent; replies through a oneshot captured in the closure.
    Mutate(Mutation),
}

/// Monotonic request counters, one per polled record.
#[derive(Default)]
struct Sequencer {
    status: AtomicU64,
    stats: AtomicU64,
    members: AtomicU64,
}

impl Sequencer {
    fn next(counter: &AtomicU64) -> u64 {
        counter.fetch_add(1, Ordering::Relaxed) + 1
    }
}

// ── Dashboard ────────────────────────────────────────────────────

/// Entry point for the view layer.
///
/// Cheaply cloneable. Reads go through [`snapshot`](Self::snapshot) /
/// [`subscribe`](Self::subscribe); everything else is an intent call.
/// Bot control works without [`start`](Self::start); state-touching calls
/// return [`CoreError::NotRunning`] until the dashboard is started.
#[derive(Clone)]
pub struct Dashboard {
    inner: Arc<DashboardInner>,
}

struct DashboardInner {
    config: DashboardConfig,
    client: DashboardClient,
    snapshot_tx: watch::Sender<Arc<DashboardSnapshot>>,
    notify_tx: broadcast::Sender<Notification>,
    view_tx: watch::Sender<View>,
    seq: Sequencer,
    poll_trigger: Arc<Notify>,
    session: Mutex<Option<Session>>,
}

struct Session {
    tx: mpsc::Sender<Update>,
    cancel: CancellationToken,
    push: Option<PushHandle>,
    task_handles: Vec<JoinHandle<()>>,
}

impl Dashboard {
    /// Build the HTTP client. Does NOT start anything -- call
    /// [`start()`](Self::start).
    pub fn new(config: DashboardConfig) -> Result<Self, CoreError> {
        let client = DashboardClient::new(config.url.clone(), &build_transport(&config))?;
        Ok(Self::with_client(config, client))
    }

    /// Use a pre-built client.
    pub fn with_client(config: DashboardConfig, client: DashboardClient) -> Self {
        let (snapshot_tx, _) = watch::channel(Arc::new(DashboardSnapshot::initial(&config)));
        let (notify_tx, _) = broadcast::channel(NOTIFICATION_CHANNEL_SIZE);
        let (view_tx, _) = watch::channel(View::default());

        Self {
            inner: Arc::new(DashboardInner {
                config,
                client,
                snapshot_tx,
                notify_tx,
                view_tx,
                seq: Sequencer::default(),
                poll_trigger: Arc::new(Notify::new()),
                session: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &DashboardClient {
        &self.inner.client
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Start a session: spawn the reconcile task, poller and push bridge,
    /// then load config, roster, and (without push) the log backlog.
    ///
    /// Load failures are logged, not returned; the poller keeps going.
    /// Calling `start` on a running dashboard is a no-op.
    pub async fn start(&self) -> Result<(), CoreError> {
        let mut guard = self.inner.session.lock().await;
        if guard.is_some() {
            debug!("dashboard already running");
            return Ok(());
        }

        let config = &self.inner.config;
        let push_url = if config.push_enabled {
            Some(self.inner.client.push_url()?)
        } else {
            None
        };

        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(UPDATE_CHANNEL_SIZE);
        let mut state = DashboardState::new(config);
        state.set_view(self.view());

        let mut task_handles = Vec::new();
        task_handles.push(tokio::spawn(reconcile_task(
            self.clone(),
            state,
            rx,
            cancel.clone(),
        )));

        let push = push_url.map(|url| {
            let handle = PushHandle::connect(url, config.reconnect.clone(), cancel.child_token());
            task_handles.push(tokio::spawn(push_bridge_task(
                handle.subscribe(),
                tx.clone(),
                cancel.clone(),
            )));
            handle
        });

        task_handles.push(tokio::spawn(poll_task(
            self.clone(),
            tx.clone(),
            config.poll_interval,
            cancel.clone(),
        )));

        *guard = Some(Session {
            tx,
            cancel,
            push,
            task_handles,
        });
        drop(guard);

        info!(url = %config.url, push = config.push_enabled, "dashboard started");
        self.initial_load().await;
        Ok(())
    }

    /// Tear the session down: stop polling, close the push channel, join
    /// every task. Results of fetches still in flight are dropped.
    pub async fn stop(&self) {
        let Some(session) = self.inner.session.lock().await.take() else {
            return;
        };
        let Session {
            tx,
            cancel,
            push,
            task_handles,
        } = session;

        cancel.cancel();
        if let Some(push) = push {
            push.join().await;
        }
        for handle in task_handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "dashboard task panicked");
            }
        }
        drop(tx);
        info!("dashboard stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.inner.session.lock().await.is_some()
    }

    async fn initial_load(&self) {
        let logs = async {
            if self.inner.config.push_enabled {
                Ok(())
            } else {
                self.reload_logs().await
            }
        };
        let (config, members, logs) =
            tokio::join!(self.refresh_config(), self.refresh_members(), logs);
        for (what, result) in [("config", config), ("members", members), ("logs", logs)] {
            if let Err(e) = result {
                debug!(error = %e, what, "initial load failed");
            }
        }
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Arc<DashboardSnapshot> {
        self.inner.snapshot_tx.borrow().clone()
    }

    /// Snapshot reflecting every update submitted before this call.
    pub async fn settled_snapshot(&self) -> Result<DashboardSnapshot, CoreError> {
        self.mutate(|state| state.snapshot()).await
    }

    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.inner.snapshot_tx.subscribe())
    }

    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.inner.notify_tx.subscribe()
    }

    pub fn view(&self) -> View {
        *self.inner.view_tx.borrow()
    }

    /// Switch the active view. Entering the dashboard view polls at once
    /// so the stats are not a full period old.
    pub async fn set_view(&self, view: View) {
        let previous = self.inner.view_tx.send_replace(view);
        if let Ok(tx) = self.session_tx().await {
            let _ = tx.send(Update::View(view)).await;
        }
        if view == View::Dashboard && previous != View::Dashboard {
            self.poll_now();
        }
    }

    /// Poll status (and stats) now instead of waiting for the next tick.
    pub fn poll_now(&self) {
        self.inner.poll_trigger.notify_one();
    }

    pub(crate) fn poll_trigger(&self) -> Arc<Notify> {
        Arc::clone(&self.inner.poll_trigger)
    }

    // ── Refreshes (read-only: failures are logged, never notified) ──

    pub async fn refresh_status(&self) -> Result<(), CoreError> {
        let tx = self.session_tx().await?;
        self.fetch_status(&tx).await
    }

    pub async fn refresh_stats(&self) -> Result<(), CoreError> {
        let tx = self.session_tx().await?;
        self.fetch_stats(&tx).await
    }

    /// Fetch the config and merge it over the default template.
    pub async fn refresh_config(&self) -> Result<(), CoreError> {
        let tx = self.session_tx().await?;
        let bundle = self
            .inner
            .client
            .get_config()
            .await
            .inspect_err(|e| debug!(error = %e, "config fetch failed"))?;
        let result = submit(&tx, move |state| state.apply_config(bundle)).await;
        match result {
            Some(Err(e)) => {
                warn!(error = %e, "fetched config does not fit the template");
                Err(e)
            }
            Some(Ok(())) | None => Ok(()),
        }
    }

    pub async fn refresh_members(&self) -> Result<(), CoreError> {
        let tx = self.session_tx().await?;
        let seq = Sequencer::next(&self.inner.seq.members);
        let members = self
            .inner
            .client
            .list_members()
            .await
            .inspect_err(|e| debug!(error = %e, "member fetch failed"))?;
        deliver(&tx, Update::Members { seq, members }).await;
        Ok(())
    }

    /// Reseed the log buffer from the server backlog.
    pub async fn reload_logs(&self) -> Result<(), CoreError> {
        let tx = self.session_tx().await?;
        let logs = self
            .inner
            .client
            .recent_logs(self.inner.config.log_capacity)
            .await
            .inspect_err(|e| debug!(error = %e, "log backlog fetch failed"))?;
        deliver(&tx, Update::SeedLogs(logs)).await;
        Ok(())
    }

    pub(crate) async fn fetch_status(&self, tx: &mpsc::Sender<Update>) -> Result<(), CoreError> {
        let seq = Sequencer::next(&self.inner.seq.status);
        let status = self.inner.client.bot_status().await?;
        deliver(tx, Update::Status { seq, status }).await;
        Ok(())
    }

    pub(crate) async fn fetch_stats(&self, tx: &mpsc::Sender<Update>) -> Result<(), CoreError> {
        let seq = Sequencer::next(&self.inner.seq.stats);
        let stats = self.inner.client.today_stats().await?;
        deliver(tx, Update::Stats { seq, stats }).await;
        Ok(())
    }

    // ── Bot control ──────────────────────────────────────────────

    pub async fn start_bot(&self) -> Result<(), CoreError> {
        self.bot_action(BotAction::Start).await
    }

    pub async fn stop_bot(&self) -> Result<(), CoreError> {
        self.bot_action(BotAction::Stop).await
    }

    pub async fn restart_bot(&self) -> Result<(), CoreError> {
        self.bot_action(BotAction::Restart).await
    }

    async fn bot_action(&self, action: BotAction) -> Result<(), CoreError> {
        let client = &self.inner.client;
        let result = match action {
            BotAction::Start => client.start_bot().await,
            BotAction::Stop => client.stop_bot().await,
            BotAction::Restart => client.restart_bot().await,
        };
        match result {
            Ok(()) => {
                self.notify(NotificationLevel::Success, action.done());
                if let Err(e) = self.refresh_status().await {
                    debug!(error = %e, "status refresh after bot control failed");
                }
                Ok(())
            }
            Err(e) => {
                let err = CoreError::from(e);
                self.notify(
                    NotificationLevel::Error,
                    format!("{} failed: {err}", action.verb()),
                );
                Err(err)
            }
        }
    }

    // ── Configuration editing ────────────────────────────────────

    /// Apply an edit to the working config.
    pub async fn edit_config<R, F>(&self, edit: F) -> Result<R, CoreError>
    where
        F: FnOnce(&mut BotConfig) -> Result<R, CoreError> + Send + 'static,
        R: Send + 'static,
    {
        self.mutate(move |state| edit(state.config_mut())).await?
    }

    pub async fn set_config_value(&self, path: &str, value: Value) -> Result<(), CoreError> {
        let path = path.to_owned();
        self.edit_config(move |config| config.set_path(&path, value))
            .await
    }

    /// Replace the personality traits from free text.
    pub async fn set_traits_text(&self, text: &str) -> Result<(), CoreError> {
        let text = text.to_owned();
        self.edit_config(move |config| config.set_traits_text(&text))
            .await
    }

    pub async fn set_env(&self, key: &str, value: SecretString) -> Result<(), CoreError> {
        let key = key.to_owned();
        self.mutate(move |state| state.set_env(key, value)).await
    }

    /// Check the working config without saving.
    pub async fn validate_config(&self) -> Result<ValidationReport, CoreError> {
        self.mutate(|state| state.validate()).await
    }

    /// Send the working config and env to the server.
    ///
    /// Refused with [`CoreError::ConfigNotLoaded`] until the server config
    /// has been fetched, whatever the validation mode. With
    /// [`Validation::Strict`] a report with errors aborts the save.
    /// Warnings are surfaced either way.
    pub async fn save_config(&self, validation: Validation) -> Result<ValidationReport, CoreError> {
        let prepared = self
            .mutate(|state| {
                state
                    .config_payload()
                    .map(|payload| (payload, state.validate()))
            })
            .await?;
        let (payload, report) = match prepared {
            Ok(prepared) => prepared,
            Err(err) => {
                self.notify(NotificationLevel::Error, format!("Save failed: {err}"));
                return Err(err);
            }
        };

        if !report.warnings.is_empty() {
            self.notify(NotificationLevel::Warning, report.warnings.join("; "));
        }
        if validation == Validation::Strict && !report.is_ok() {
            let err = CoreError::ValidationFailed {
                errors: report.errors.clone(),
            };
            self.notify(NotificationLevel::Error, err.to_string());
            return Err(err);
        }

        match self.inner.client.save_config(&payload).await {
            Ok(()) => {
                self.notify(NotificationLevel::Success, "Configuration saved");
                Ok(report)
            }
            Err(e) => {
                let err = CoreError::from(e);
                self.notify(NotificationLevel::Error, format!("Save failed: {err}"));
                Err(err)
            }
        }
    }

    // ── Logs ─────────────────────────────────────────────────────

    pub async fn clear_logs(&self) -> Result<(), CoreError> {
        self.mutate(DashboardState::clear_logs).await
    }

    // ── Member editing ───────────────────────────────────────────

    /// Open a draft for a roster entry and return it.
    pub async fn start_edit(&self, qq: &str) -> Result<Member, CoreError> {
        let qq = qq.to_owned();
        self.mutate(move |state| {
            state.start_edit(&qq)?;
            state.edit().draft().cloned().ok_or(CoreError::NoActiveEdit)
        })
        .await?
    }

    /// Change the open draft and return it.
    pub async fn edit_draft<F>(&self, edit: F) -> Result<Member, CoreError>
    where
        F: FnOnce(&mut Member) + Send + 'static,
    {
        self.mutate(move |state| {
            state.edit_mut().update(edit)?;
            state.edit().draft().cloned().ok_or(CoreError::NoActiveEdit)
        })
        .await?
    }

    /// Drop the open draft, returning it.
    pub async fn cancel_edit(&self) -> Result<Option<Member>, CoreError> {
        self.mutate(|state| state.edit_mut().cancel()).await
    }

    /// Send the draft. On success the session closes and the roster is
    /// reloaded in the same step; on failure the draft stays open.
    pub async fn save_member(&self) -> Result<(), CoreError> {
        let draft = self
            .mutate(|state| state.edit_mut().begin_save())
            .await??;
        let qq = draft.qq.clone();

        if let Err(e) = self.inner.client.update_member(&draft).await {
            let err = CoreError::from(e);
            if let Err(e) = self
                .mutate(move |state| state.edit_mut().save_failed(&qq))
                .await
            {
                debug!(error = %e, "could not reopen draft after failed save");
            }
            self.notify(NotificationLevel::Error, format!("Save failed: {err}"));
            return Err(err);
        }

        let seq = Sequencer::next(&self.inner.seq.members);
        let reloaded = self.inner.client.list_members().await;
        self.mutate(move |state| {
            state.edit_mut().save_succeeded(&qq);
            match reloaded {
                Ok(members) => {
                    state.apply_member_list(seq, members);
                }
                Err(e) => debug!(error = %e, "roster reload after save failed"),
            }
        })
        .await?;

        self.notify(
            NotificationLevel::Success,
            format!("Member {} saved", draft.display_name()),
        );
        Ok(())
    }

    // ── Plumbing ─────────────────────────────────────────────────

    async fn session_tx(&self) -> Result<mpsc::Sender<Update>, CoreError> {
        self.inner
            .session
            .lock()
            .await
            .as_ref()
            .map(|s| s.tx.clone())
            .ok_or(CoreError::NotRunning)
    }

    /// Run `f` on the state inside the reconcile task and return its
    /// result.
    async fn mutate<R, F>(&self, f: F) -> Result<R, CoreError>
    where
        F: FnOnce(&mut DashboardState) -> R + Send + 'static,
        R: Send + 'static,
    {
        let tx = self.session_tx().await?;
        submit(&tx, f).await.ok_or(CoreError::NotRunning)
    }

    fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        let notification =
            Notification::new(level, message, self.inner.config.notification_ttl);
        debug!(level = %notification.level, message = %notification.message, "notification");
        // No receivers just means nobody is showing notifications.
        let _ = self.inner.notify_tx.send(notification);
    }

    fn publish(&self, state: &DashboardState) {
        self.inner.snapshot_tx.send_replace(Arc::new(state.snapshot()));
    }
}

#[derive(Debug, Clone, Copy)]
enum BotAction {
    Start,
    Stop,
    Restart,
}

impl BotAction {
    fn verb(self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::Stop => "Stop",
            Self::Restart => "Restart",
        }
    }

    fn done(self) -> &'static str {
        match self {
            Self::Start => "Bot started",
            Self::Stop => "Bot stopped",
            Self::Restart => "Bot restarted",
        }
    }
}

/// Hand an update to the reconcile task. After teardown the receiver is
/// gone and the update is dropped.
async fn deliver(tx: &mpsc::Sender<Update>, update: Update) {
    if tx.send(update).await.is_err() {
        trace!("discarding result that arrived after teardown");
    }
}

/// Run a closure in the reconcile task; `None` if the session ended first.
async fn submit<R, F>(tx: &mpsc::Sender<Update>, f: F) -> Option<R>
where
    F: FnOnce(&mut DashboardState) -> R + Send + 'static,
    R: Send + 'static,
{
    let (reply_tx, reply_rx) = oneshot::channel();
    let mutation: Mutation = Box::new(move |state| {
        let _ = reply_tx.send(f(state));
    });
    tx.send(Update::Mutate(mutation)).await.ok()?;
    reply_rx.await.ok()
}

// ── Background tasks ─────────────────────────────────────────────

/// Sole owner of the state. Applies updates in arrival order and
/// publishes once per drained batch.
async fn reconcile_task(
    dashboard: Dashboard,
    mut state: DashboardState,
    mut rx: mpsc::Receiver<Update>,
    cancel: CancellationToken,
) {
    dashboard.publish(&state);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            update = rx.recv() => {
                let Some(update) = update else { break };
                apply(&mut state, update);
                while let Ok(next) = rx.try_recv() {
                    apply(&mut state, next);
                }
                dashboard.publish(&state);
            }
        }
    }

    state.set_stream_state(if dashboard.config().push_enabled {
        StreamState::Disconnected {
            reason: "dashboard stopped".into(),
        }
    } else {
        StreamState::Disabled
    });
    dashboard.publish(&state);
    debug!("reconcile task exiting");
}

fn apply(state: &mut DashboardState, update: Update) {
    match update {
        Update::Status { seq, status } => {
            state.apply_status(seq, status);
        }
        Update::Stats { seq, stats } => {
            state.apply_stats(seq, stats);
        }
        Update::Members { seq, members } => {
            state.apply_member_list(seq, members);
        }
        Update::SeedLogs(batch) => state.seed_logs(batch),
        Update::Push(event) => state.apply_push(&event),
        Update::View(view) => state.set_view(view),
        Update::Mutate(f) => f(state),
    }
}

/// Forward push events into the update channel, in delivery order.
async fn push_bridge_task(
    mut events: broadcast::Receiver<Arc<PushEvent>>,
    tx: mpsc::Sender<Update>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            event = events.recv() => match event {
                Ok(event) => {
                    if tx.send(Update::Push(event)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "push bridge lagged; log view may have gaps");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("push channel closed");
                    break;
                }
            }
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn build_transport(config: &DashboardConfig) -> TransportConfig {
    TransportConfig {
        tls: match &config.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        },
        timeout: config.timeout,
    }
}
