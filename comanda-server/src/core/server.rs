//! Server Implementation
//!
//! HTTP 服务器启动和后台任务编排

use std::time::Duration;

use crate::core::{BackgroundTasks, Config, Result, ServerError, ServerState, TaskKind};
use crate::message::{BusMessage, MessageServer};
use crate::snapshot::VenueSnapshot;
use crate::venue::Dest;
use shared::util::now_millis;

/// HTTP Server
pub struct Server {
    config: Config,
    state: Option<ServerState>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Create server with existing state (for tests)
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self {
            config,
            state: Some(state),
        }
    }

    pub async fn run(&self) -> Result<()> {
        let state = match &self.state {
            Some(s) => s.clone(),
            None => ServerState::initialize(&self.config).await,
        };

        let mut tasks = BackgroundTasks::new();
        let token = tasks.shutdown_token();

        // 消息 TCP 服务器
        let message_server = MessageServer::new(
            state.bus.clone(),
            state.venue.clone(),
            state.registry.clone(),
        );
        tasks.spawn("message-server", TaskKind::Listener, async move {
            if let Err(e) = message_server.run().await {
                tracing::error!("Message server failed: {}", e);
            }
        });

        // 每 10 秒刷新等待时长并推给员工面板
        {
            let venue = state.venue.clone();
            let bus = state.bus.clone();
            let token = token.clone();
            tasks.spawn("elapsed-ticker", TaskKind::Periodic, async move {
                let mut interval = tokio::time::interval(Duration::from_secs(10));
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = interval.tick() => {
                            let out = venue.refresh_elapsed();
                            if let Dest::Room(room) = out.dest
                                && let Ok(msg) = BusMessage::event(&out.event)
                            {
                                let _ = bus.publish(msg.to_room(room));
                            }
                        }
                    }
                }
            });
        }

        // 变更驱动 (带兜底间隔) 的快照落盘
        {
            let autosave = state.clone();
            let interval = Duration::from_secs(self.config.autosave_interval_secs);
            let token = token.clone();
            tasks.spawn("snapshot-autosave", TaskKind::Worker, async move {
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = autosave.venue.wait_dirty() => {}
                        _ = tokio::time::sleep(interval) => {}
                    }
                    let snapshot = autosave.venue.with_state(VenueSnapshot::capture);
                    autosave.snapshot.save(&snapshot).await;
                }
            });
        }

        // 清理失联连接
        {
            let registry = state.registry.clone();
            let sweep_interval = Duration::from_secs(self.config.sweep_interval_secs);
            let stale_after_ms = self.config.stale_after_secs as i64 * 1000;
            let token = token.clone();
            tasks.spawn("connection-sweeper", TaskKind::Periodic, async move {
                let mut interval = tokio::time::interval(sweep_interval);
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = interval.tick() => {
                            registry.sweep_stale(now_millis(), stale_after_ms);
                        }
                    }
                }
            });
        }

        // HTTP 服务
        let app = crate::api::router(state.clone());
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::internal(format!("Failed to bind HTTP port: {}", e)))?;

        tracing::info!("🍀 Comanda Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Shutting down...");
            })
            .await
            .map_err(|e| ServerError::internal(format!("HTTP server failed: {}", e)))?;

        // 退出前最后一次落盘
        state.persist().await;
        state.bus.shutdown();
        tasks.shutdown().await;

        Ok(())
    }
}
