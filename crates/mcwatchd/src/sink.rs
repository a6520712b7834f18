//! Notification sinks - deliver rendered events to a chat channel.
//!
//! Delivery is best-effort. A sink reports failure, the monitor logs it and
//! moves on.

use crate::error::{Result, WatchError};
use async_trait::async_trait;
use mcwatch_shared::{ChannelId, EventKind, NotificationEvent};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, channel: ChannelId, event: &NotificationEvent) -> Result<()>;
}

/// Chat text for an event
pub fn render(event: &NotificationEvent) -> String {
    let server = &event.server;
    match &event.kind {
        EventKind::ServerOnline => format!("🟢 **{}** is now online", server),
        EventKind::ServerOffline => format!("🔴 **{}** went offline", server),
        EventKind::PlayerJoined { name } => format!("➡️ **{}** joined **{}**", name, server),
        EventKind::PlayerLeft { name } => format!("⬅️ **{}** left **{}**", name, server),
    }
}

/// Posts messages through the Discord REST API
pub struct DiscordSink {
    client: Client,
    api_base: String,
    token: String,
}

impl DiscordSink {
    pub fn new(api_base: &str, token: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(concat!("mcwatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }
}

#[async_trait]
impl NotificationSink for DiscordSink {
    async fn deliver(&self, channel: ChannelId, event: &NotificationEvent) -> Result<()> {
        let url = format!("{}/channels/{}/messages", self.api_base, channel);
        let payload = serde_json::json!({ "content": render(event) });

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bot {}", self.token))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WatchError::Delivery(format!(
                "channel {} returned {}",
                channel,
                response.status()
            )));
        }

        debug!("Delivered {:?} for {} to channel {}", event.kind, event.server, channel);
        Ok(())
    }
}

/// Writes events to the log only. Used when no chat transport is configured.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, channel: ChannelId, event: &NotificationEvent) -> Result<()> {
        info!("[channel {}] {}", channel, render(event));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use mcwatch_shared::ServerId;
    use tokio::sync::mpsc;

    fn event(kind: EventKind) -> NotificationEvent {
        NotificationEvent::new(ServerId::new("Survival").unwrap(), kind)
    }

    #[test]
    fn test_render_messages() {
        assert_eq!(render(&event(EventKind::ServerOnline)), "🟢 **survival** is now online");
        assert_eq!(render(&event(EventKind::ServerOffline)), "🔴 **survival** went offline");
        assert_eq!(
            render(&event(EventKind::PlayerJoined {
                name: "Steve".to_string()
            })),
            "➡️ **Steve** joined **survival**"
        );
        assert_eq!(
            render(&event(EventKind::PlayerLeft {
                name: "Alex".to_string()
            })),
            "⬅️ **Alex** left **survival**"
        );
    }

    #[tokio::test]
    async fn test_discord_sink_posts_to_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let app = Router::new().route(
            "/channels/:channel/messages",
            post(
                move |Path(channel): Path<u64>, headers: HeaderMap, Json(body): Json<serde_json::Value>| {
                    let tx = tx.clone();
                    async move {
                        let auth = headers
                            .get("authorization")
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string();
                        let _ = tx.send((channel, auth, body));
                        StatusCode::OK
                    }
                },
            ),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let sink = DiscordSink::new(&format!("http://{}/", addr), "secret").unwrap();
        sink.deliver(ChannelId(99), &event(EventKind::ServerOnline))
            .await
            .unwrap();

        let (channel, auth, body) = rx.recv().await.unwrap();
        assert_eq!(channel, 99);
        assert_eq!(auth, "Bot secret");
        assert_eq!(body["content"], "🟢 **survival** is now online");
    }

    #[tokio::test]
    async fn test_discord_sink_reports_rejection() {
        let app = Router::new().route(
            "/channels/:channel/messages",
            post(|| async { StatusCode::FORBIDDEN }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let sink = DiscordSink::new(&format!("http://{}", addr), "secret").unwrap();
        let result = sink.deliver(ChannelId(1), &event(EventKind::ServerOffline)).await;
        assert!(matches!(result, Err(WatchError::Delivery(_))));
    }
}
