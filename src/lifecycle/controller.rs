//! Session lifecycle controller
//!
//! Binds transport lifecycle events to the registry, admission gates,
//! takeover coordination, and the periodic monitoring loops. Every
//! external call degrades gracefully: a failed collaborator is logged and
//! the in-memory registry stays authoritative.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::admission::{ConnectionRateLimiter, RetryDecision, ViewerRetryBackoff};
use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::health::{HealthStatus, MonitorSummary, SessionHealth};
use crate::hooks::Collaborators;
use crate::lifecycle::events::SessionEvent;
use crate::lifecycle::takeover::TakeoverCoordinator;
use crate::monitor::{
    BitrateEstimator, QualityAction, QualityMonitor, ReapVerdict, StaleReaper,
    CONNECTION_LOST_REASON, LOW_BITRATE_REASON,
};
use crate::registry::{SessionRegistry, SessionRole, StreamKey};

/// Reason attached to a clean unpublish teardown
pub const STREAM_ENDED_REASON: &str = "stream ended";

/// Orchestrates the relay's session lifecycle and admission control
pub struct SessionController {
    config: RelayConfig,
    registry: Arc<SessionRegistry>,
    hooks: Collaborators,
    takeover: TakeoverCoordinator,
    estimator: BitrateEstimator,
    quality: QualityMonitor,
    reaper: StaleReaper,
    rate_limiter: Mutex<ConnectionRateLimiter>,
    backoff: Mutex<ViewerRetryBackoff>,
}

impl SessionController {
    /// Create a controller wired to the given collaborators
    pub fn new(config: RelayConfig, hooks: Collaborators) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let takeover = TakeoverCoordinator::new(
            Arc::clone(&registry),
            Arc::clone(&hooks.transport),
            Arc::clone(&hooks.persistence),
            Arc::clone(&hooks.restream),
        );

        Self {
            estimator: BitrateEstimator::new(&config),
            quality: QualityMonitor::new(&config),
            reaper: StaleReaper::new(&config),
            rate_limiter: Mutex::new(ConnectionRateLimiter::new(
                config.max_connections_per_ip,
                config.connection_window,
            )),
            backoff: Mutex::new(ViewerRetryBackoff::new(
                config.backoff_base,
                config.backoff_cap,
                config.backoff_idle_ttl,
            )),
            registry,
            hooks,
            takeover,
            config,
        }
    }

    /// The shared session registry
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// The relay configuration
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    // ---- transport lifecycle events ----

    /// Dispatch one transport lifecycle event
    ///
    /// Channel-style transports feed [`SessionEvent`] values here; the
    /// per-event `on_*` methods below are equivalent for callback-style
    /// integrations. Admission rejections surface as `Err`.
    pub async fn dispatch(&self, event: SessionEvent) -> Result<()> {
        match event {
            SessionEvent::Connect { session_id, ip } => {
                self.on_connect(session_id, ip).await;
                Ok(())
            }
            SessionEvent::PublishRequest {
                session_id,
                ip,
                path,
            } => self.on_publish(session_id, ip, &path).await,
            SessionEvent::PlayRequest {
                session_id,
                ip,
                path,
            } => self.on_play(session_id, ip, &path).await,
            SessionEvent::Data { session_id, bytes } => {
                self.on_data(session_id, bytes).await;
                Ok(())
            }
            SessionEvent::Unpublish { session_id } => {
                self.on_unpublish(session_id).await;
                Ok(())
            }
            SessionEvent::Unplay { session_id } => {
                self.on_unplay(session_id).await;
                Ok(())
            }
            SessionEvent::Disconnect { session_id } => {
                self.on_disconnect(session_id).await;
                Ok(())
            }
        }
    }

    /// Transport connection established
    pub async fn on_connect(&self, session_id: u64, ip: IpAddr) {
        self.registry.insert(session_id, ip, Instant::now()).await;
        tracing::debug!(session_id, ip = %ip, "Connection registered");
    }

    /// Publish request for a stream path
    ///
    /// Authenticates the key, runs the takeover critical section, then
    /// promotes the session to publisher and kicks off the downstream
    /// collaborators. The session row is created lazily if the connect
    /// event hasn't landed yet.
    pub async fn on_publish(&self, session_id: u64, ip: IpAddr, path: &str) -> Result<()> {
        let now = Instant::now();
        let key = self.parse_key(path)?;

        if !self.authenticate(&key).await {
            tracing::warn!(session_id, stream = %key, "Publish rejected: invalid stream key");
            return Err(RelayError::AuthenticationFailed(key));
        }

        // Check-evict-promote is a critical section per key: two racing
        // publish requests serialize here, so the loser sees the winner
        // as the active publisher and evicts it rather than joining it.
        let _admission = self.takeover.lock_key(&key).await;

        if self.registry.has_active_publisher(&key, Some(session_id)).await {
            let evicted = self.takeover.evict_existing(&key, session_id).await;
            tracing::info!(
                stream = %key,
                session_id,
                evicted,
                "Takeover: evicted prior sessions for key"
            );
        }

        let row = self.registry.get_or_insert(session_id, ip, now).await;
        row.write().await.promote_publisher(key.clone(), now);
        tracing::info!(session_id, ip = %ip, stream = %key, "Publisher started");

        if let Err(e) = self
            .hooks
            .persistence
            .create_record(session_id, &key, ip, true)
            .await
        {
            tracing::warn!(session_id, error = %e, "Failed to persist publisher record");
        }
        if let Err(e) = self.hooks.notifier.send_connect_message(&key).await {
            tracing::warn!(stream = %key, error = %e, "Connect notification failed");
        }
        if let Err(e) = self.hooks.restream.start(&key, path).await {
            tracing::warn!(stream = %key, error = %e, "Restream start failed");
        }

        // Viewers waiting on this key reconnect without delay
        let waiting_ips = self.backoff.lock().await.clear_key(&key);
        if !waiting_ips.is_empty() {
            let mut limiter = self.rate_limiter.lock().await;
            for waiting_ip in &waiting_ips {
                limiter.forget(waiting_ip);
            }
            tracing::debug!(
                stream = %key,
                viewers = waiting_ips.len(),
                "Cleared retry backoff for waiting viewers"
            );
        }

        Ok(())
    }

    /// Playback request for a stream path
    pub async fn on_play(&self, session_id: u64, ip: IpAddr, path: &str) -> Result<()> {
        let now = Instant::now();
        let key = self.parse_key(path)?;

        if !self.authenticate(&key).await {
            tracing::warn!(session_id, stream = %key, "Play rejected: invalid stream key");
            return Err(RelayError::AuthenticationFailed(key));
        }

        // Every playback attempt counts against the per-IP window, so a
        // flood of retries for an absent stream is still bounded.
        if !self.rate_limiter.lock().await.check(ip, now) {
            tracing::debug!(session_id, ip = %ip, "Play rejected: rate limited");
            return Err(RelayError::RateLimited(ip));
        }

        if !self.registry.has_active_publisher(&key, None).await {
            let decision = self
                .backoff
                .lock()
                .await
                .register_rejection(ip, &key, now);
            if let RetryDecision::Logged { attempt, next_wait } = decision {
                tracing::info!(
                    session_id,
                    ip = %ip,
                    stream = %key,
                    attempt,
                    next_wait_ms = next_wait.as_millis() as u64,
                    "Play rejected: no active publisher"
                );
            }
            return Err(RelayError::NoActivePublisher(key));
        }

        let row = self.registry.get_or_insert(session_id, ip, now).await;
        row.write().await.promote_viewer(key.clone(), now);
        tracing::info!(session_id, ip = %ip, stream = %key, "Viewer started");

        if let Err(e) = self
            .hooks
            .persistence
            .create_record(session_id, &key, ip, false)
            .await
        {
            tracing::warn!(session_id, error = %e, "Failed to persist viewer record");
        }

        Ok(())
    }

    /// Data packet observed on a connection (activity signal)
    pub async fn on_data(&self, session_id: u64, bytes: u64) {
        if let Some(row) = self.registry.get(session_id).await {
            row.write().await.touch_data(bytes, Instant::now());
        }
    }

    /// Publisher stopped publishing cleanly
    pub async fn on_unpublish(&self, session_id: u64) {
        self.end_session(session_id, STREAM_ENDED_REASON).await;
    }

    /// Viewer stopped playback cleanly
    pub async fn on_unplay(&self, session_id: u64) {
        self.end_session(session_id, STREAM_ENDED_REASON).await;
    }

    /// Transport connection closed
    pub async fn on_disconnect(&self, session_id: u64) {
        self.end_session(session_id, STREAM_ENDED_REASON).await;
    }

    // ---- periodic ticks ----

    /// One bitrate/quality monitoring pass over all publishers
    pub async fn run_monitor_once(&self) {
        for session_id in self.registry.snapshot_ids().await {
            // Rows may vanish mid-sweep; skip, don't fail
            let Some(row) = self.registry.get(session_id).await else {
                continue;
            };
            let (role, key) = {
                let session = row.read().await;
                (session.role, session.key.clone())
            };
            if role != SessionRole::Publisher {
                continue;
            }
            let Some(key) = key else { continue };

            let now = Instant::now();
            let fetched = match tokio::time::timeout(
                self.config.stats_timeout,
                self.hooks.transport.stream_bytes(&key),
            )
            .await
            {
                Ok(Ok(bytes)) => Some(bytes),
                Ok(Err(e)) => {
                    tracing::warn!(stream = %key, error = %e, "Stats fetch failed; skipping sample");
                    None
                }
                Err(_) => {
                    tracing::warn!(stream = %key, "Stats fetch timed out; skipping sample");
                    None
                }
            };

            let assessment = {
                let mut session = row.write().await;
                if let Some(bytes) = fetched {
                    if let Some(bps) = self.estimator.record(&mut session, bytes, now) {
                        tracing::debug!(stream = %key, session_id, bits_per_sec = bps, "Bitrate sample");
                    }
                }
                self.quality.assess(&mut session, now)
            };

            match assessment.action {
                QualityAction::Disconnect => {
                    tracing::warn!(
                        stream = %key,
                        session_id,
                        current_bps = assessment.current_bps,
                        average_bps = assessment.average_bps,
                        "Disconnecting publisher: sustained low bitrate"
                    );
                    if let Err(e) = self.hooks.transport.force_disconnect(session_id).await {
                        tracing::warn!(session_id, error = %e, "Quality disconnect failed at transport");
                    }
                    self.teardown_publisher(session_id, &key, LOW_BITRATE_REASON)
                        .await;
                }
                QualityAction::Warn => {
                    tracing::warn!(
                        stream = %key,
                        session_id,
                        status = ?assessment.status,
                        current_bps = assessment.current_bps,
                        average_bps = assessment.average_bps,
                        "{}", assessment.message
                    );
                }
                QualityAction::Monitor | QualityAction::None => {}
            }
        }
    }

    /// One stale-session sweep over all sessions
    pub async fn run_reaper_once(&self) {
        let now = Instant::now();
        for session_id in self.registry.snapshot_ids().await {
            let Some(row) = self.registry.get(session_id).await else {
                continue;
            };
            let alive = self.hooks.transport.connection_alive(session_id).await;
            let (verdict, role, key, idle) = {
                let session = row.read().await;
                (
                    self.reaper.verdict(&session, alive, now),
                    session.role,
                    session.key.clone(),
                    session.idle_for(now),
                )
            };
            if verdict == ReapVerdict::Keep {
                continue;
            }

            tracing::warn!(
                session_id,
                role = ?role,
                idle_secs = idle.as_secs(),
                transport_alive = alive,
                "Reaping stale session"
            );
            if let Err(e) = self.hooks.transport.force_disconnect(session_id).await {
                tracing::debug!(session_id, error = %e, "Stale disconnect failed at transport");
            }

            match (role, key) {
                (SessionRole::Publisher, Some(key)) => {
                    self.teardown_publisher(session_id, &key, CONNECTION_LOST_REASON)
                        .await;
                }
                _ => self.finalize_and_remove(session_id).await,
            }
        }
    }

    /// One admission cleanup pass (rate-limiter and backoff tables)
    pub async fn run_sweep_once(&self) {
        let now = Instant::now();
        self.rate_limiter.lock().await.sweep(now);
        self.backoff.lock().await.purge(now);
        self.takeover.prune_idle_locks().await;
    }

    /// Spawn the bitrate/quality monitoring loop
    pub fn spawn_monitor_task(self: &Arc<Self>) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        let interval = controller.config.monitor_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                controller.run_monitor_once().await;
            }
        })
    }

    /// Spawn the stale reaper loop
    pub fn spawn_reaper_task(self: &Arc<Self>) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        let interval = controller.config.reap_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                controller.run_reaper_once().await;
            }
        })
    }

    /// Spawn the admission sweep loop
    pub fn spawn_sweep_task(self: &Arc<Self>) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        let interval = controller.config.sweep_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                controller.run_sweep_once().await;
            }
        })
    }

    /// Spawn all periodic loops; abort the handles to stop them
    pub fn spawn_background_tasks(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        vec![
            self.spawn_monitor_task(),
            self.spawn_reaper_task(),
            self.spawn_sweep_task(),
        ]
    }

    // ---- surface for the surrounding layer ----

    /// Read-only health snapshot for display
    pub async fn health_status(&self) -> HealthStatus {
        let now = Instant::now();
        let mut sessions = Vec::new();

        for session_id in self.registry.snapshot_ids().await {
            let Some(row) = self.registry.get(session_id).await else {
                continue;
            };
            let alive = self.hooks.transport.connection_alive(session_id).await;
            let session = row.read().await;
            sessions.push(SessionHealth {
                id: session.id,
                stream_key: session.key.as_ref().map(|k| k.to_string()),
                ip: session.ip.to_string(),
                role: match session.role {
                    SessionRole::Provisional => "provisional",
                    SessionRole::Publisher => "publisher",
                    SessionRole::Viewer => "viewer",
                },
                connected_secs: now.saturating_duration_since(session.connected_at).as_secs(),
                idle_secs: session.idle_for(now).as_secs(),
                current_bps: session.current_bitrate(),
                average_bps: session.average_bitrate(),
                peak_bps: session.peak_bitrate(),
                data_packets: session.data_packets,
                bytes_received: session.bytes_received,
                actively_streaming: self.reaper.is_actively_streaming(&session, alive, now),
            });
        }
        sessions.sort_by_key(|s| s.id);

        HealthStatus {
            active_sessions: sessions.len(),
            monitor: MonitorSummary::from(&self.config),
            sessions,
        }
    }

    /// Finalize every open record and drop all sessions (process shutdown)
    pub async fn shutdown(&self) {
        for key in self.registry.active_keys().await {
            if let Err(e) = self.hooks.persistence.end_all_active_for_key(&key).await {
                tracing::warn!(stream = %key, error = %e, "Shutdown record cleanup failed");
            }
        }
        self.registry.clear().await;
        tracing::info!("Session controller shut down");
    }

    // ---- internals ----

    fn parse_key(&self, path: &str) -> Result<StreamKey> {
        StreamKey::from_path(path).ok_or_else(|| RelayError::InvalidStreamPath(path.to_string()))
    }

    /// Key verification; storage errors reject like inactive keys
    async fn authenticate(&self, key: &StreamKey) -> bool {
        match self.hooks.keys.verify_key(key).await {
            Ok(active) => active,
            Err(e) => {
                tracing::warn!(stream = %key, error = %e, "Key verification failed");
                false
            }
        }
    }

    /// Route a clean end event by the session's role
    async fn end_session(&self, session_id: u64, reason: &str) {
        let Some(row) = self.registry.get(session_id).await else {
            // Already gone (takeover, reap, double disconnect): no-op
            return;
        };
        let (role, key) = {
            let session = row.read().await;
            (session.role, session.key.clone())
        };

        match (role, key) {
            (SessionRole::Publisher, Some(key)) => {
                self.teardown_publisher(session_id, &key, reason).await;
            }
            _ => {
                self.finalize_and_remove(session_id).await;
                tracing::debug!(session_id, "Session ended");
            }
        }
    }

    /// Full teardown of a publisher: stop restream, notify, cascade every
    /// viewer of the key, finalize, remove
    async fn teardown_publisher(&self, session_id: u64, key: &StreamKey, reason: &str) {
        if let Err(e) = self.hooks.restream.stop(key).await {
            tracing::warn!(stream = %key, error = %e, "Restream stop failed");
        }
        if let Err(e) = self
            .hooks
            .notifier
            .send_disconnect_message(key, reason)
            .await
        {
            tracing::warn!(stream = %key, error = %e, "Disconnect notification failed");
        }

        // No viewer may stay attached to a dead stream
        let mut cascaded = 0;
        for row in self.registry.all_by_stream_key(key).await {
            let viewer_id = row.read().await.id;
            if viewer_id == session_id {
                continue;
            }
            if let Err(e) = self.hooks.transport.force_disconnect(viewer_id).await {
                tracing::debug!(session_id = viewer_id, error = %e, "Viewer cascade disconnect failed");
            }
            self.finalize_and_remove(viewer_id).await;
            cascaded += 1;
        }

        self.finalize_and_remove(session_id).await;
        tracing::info!(
            stream = %key,
            session_id,
            cascaded_viewers = cascaded,
            reason,
            "Publisher torn down"
        );
    }

    /// Registry removal is authoritative; record finalization is best-effort
    async fn finalize_and_remove(&self, session_id: u64) {
        if self.registry.remove(session_id).await.is_some() {
            if let Err(e) = self.hooks.persistence.end_record(session_id).await {
                tracing::warn!(session_id, error = %e, "Failed to finalize session record");
            }
        }
    }
}
