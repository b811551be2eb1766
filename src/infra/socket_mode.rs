use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use crate::context::AppContext;
use crate::domain::message::MessageEvent;
use crate::error::{AppError, AppResult};
use crate::infra::slack::SlackClient;
use crate::workflow::router;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Feeds Socket Mode events to the router, one at a time.
pub struct SocketModeListener {
    slack: Arc<SlackClient>,
    ctx: AppContext,
    reconnect_delay: Duration,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    envelope_id: Option<String>,
    #[serde(default)]
    payload: Option<serde_json::Value>,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Serialize)]
struct Ack<'a> {
    envelope_id: &'a str,
}

#[derive(Debug)]
enum Frame {
    Hello,
    Message(Box<MessageEvent>),
    Disconnect(Option<String>),
    Skip(String),
}

impl Envelope {
    fn parse(text: &str) -> AppResult<Self> {
        serde_json::from_str(text)
            .map_err(|err| AppError::Chat(format!("invalid Socket Mode envelope: {err}")))
    }

    fn into_frame(self) -> Frame {
        match self.kind.as_str() {
            "hello" => Frame::Hello,
            "disconnect" => Frame::Disconnect(self.reason),
            "events_api" => {
                let event = self
                    .payload
                    .and_then(|mut payload| payload.get_mut("event").map(serde_json::Value::take));
                let Some(event) = event else {
                    return Frame::Skip("events_api envelope without event".to_string());
                };
                let event_type = event
                    .get("type")
                    .and_then(|kind| kind.as_str())
                    .unwrap_or("unknown")
                    .to_string();
                match serde_json::from_value::<MessageEvent>(event) {
                    Ok(message) if message.kind == "message" => {
                        Frame::Message(Box::new(message))
                    }
                    Ok(_) => Frame::Skip(format!("{event_type} event")),
                    Err(_) if event_type != "message" => {
                        Frame::Skip(format!("{event_type} event"))
                    }
                    Err(err) => Frame::Skip(format!("malformed message event: {err}")),
                }
            }
            other => Frame::Skip(format!("{other} envelope")),
        }
    }
}

impl SocketModeListener {
    pub fn new(slack: Arc<SlackClient>, ctx: AppContext) -> Self {
        Self {
            slack,
            ctx,
            reconnect_delay: RECONNECT_DELAY,
        }
    }

    #[cfg(test)]
    fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Runs until the process is interrupted. Only the first connection URL
    /// is required; later reconnects retry until Slack hands out a new one.
    pub async fn run(&self) -> AppResult<()> {
        let mut url = self.slack.open_socket_url().await?;
        loop {
            info!("connecting to Slack Socket Mode");
            match self.listen(&url).await {
                Ok(()) => info!("Socket Mode session ended; reconnecting"),
                Err(err) => error!(error = %err, "Socket Mode session failed; reconnecting"),
            }
            url = self.reconnect_url().await;
        }
    }

    async fn reconnect_url(&self) -> String {
        loop {
            tokio::time::sleep(self.reconnect_delay).await;
            match self.slack.open_socket_url().await {
                Ok(url) => return url,
                Err(err) => warn!(error = %err, "could not obtain a Socket Mode URL; retrying"),
            }
        }
    }

    async fn listen(&self, url: &str) -> AppResult<()> {
        let (stream, _) = connect_async(url).await.map_err(|err| {
            AppError::Chat(format!("failed to open Socket Mode connection: {err}"))
        })?;
        let (mut write, mut read) = stream.split();

        while let Some(frame) = read.next().await {
            let frame =
                frame.map_err(|err| AppError::Chat(format!("Socket Mode read failed: {err}")))?;

            match frame {
                WsMessage::Text(text) => {
                    let envelope = match Envelope::parse(&text) {
                        Ok(envelope) => envelope,
                        Err(err) => {
                            warn!(error = %err, "ignoring unreadable Socket Mode frame");
                            continue;
                        }
                    };

                    if let Some(envelope_id) = envelope.envelope_id.as_deref() {
                        let ack = serde_json::to_string(&Ack { envelope_id }).map_err(|err| {
                            AppError::Chat(format!("failed to encode acknowledgement: {err}"))
                        })?;
                        write.send(WsMessage::Text(ack)).await.map_err(|err| {
                            AppError::Chat(format!("failed to acknowledge envelope: {err}"))
                        })?;
                    }

                    match envelope.into_frame() {
                        Frame::Hello => info!("Socket Mode connection established"),
                        Frame::Message(event) => self.handle(*event).await,
                        Frame::Disconnect(reason) => {
                            info!(
                                reason = reason.as_deref().unwrap_or("none"),
                                "Slack asked to reconnect"
                            );
                            return Ok(());
                        }
                        Frame::Skip(what) => debug!(%what, "skipping Socket Mode frame"),
                    }
                }
                WsMessage::Ping(data) => {
                    write
                        .send(WsMessage::Pong(data))
                        .await
                        .map_err(|err| AppError::Chat(format!("failed to answer ping: {err}")))?;
                }
                WsMessage::Close(_) => {
                    info!("Socket Mode connection closed by Slack");
                    return Ok(());
                }
                _ => {}
            }
        }

        Ok(())
    }

    async fn handle(&self, event: MessageEvent) {
        let outcome = AssertUnwindSafe(router::dispatch(&self.ctx, &event))
            .catch_unwind()
            .await;

        match outcome {
            Ok(outcome) => debug!(?outcome, "event handled"),
            Err(_) => error!(
                channel = %event.channel,
                ts = %event.ts,
                "message handler panicked; event dropped"
            ),
        }
    }
}
