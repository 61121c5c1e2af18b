use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio_tungstenite::{connect_async, tungstenite::Message};

#[cfg(debug_assertions)]
use crate::config::DF;

/// One physical socket as seen by the channel driver: text frames in and out.
/// The inbound side ending means the socket is gone; dropping the link closes it.
pub struct SocketLink {
    pub outbound: UnboundedSender<String>,
    pub inbound: UnboundedReceiver<String>,
}

/// The server end of an in-memory link.
pub struct PeerLink {
    pub to_client: UnboundedSender<String>,
    pub from_client: UnboundedReceiver<String>,
}

impl SocketLink {
    /// A connected pair with no network underneath (tests, replays).
    pub fn in_memory() -> (SocketLink, PeerLink) {
        let (to_client, inbound) = unbounded_channel();
        let (outbound, from_client) = unbounded_channel();
        (
            SocketLink { outbound, inbound },
            PeerLink {
                to_client,
                from_client,
            },
        )
    }
}

/// Opens physical sockets for the push channel.
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    async fn open(&self, url: &str) -> Result<SocketLink>;
}

/// WebSocket transport. Each open spawns one pump task bridging the socket
/// and the link's channels.
pub struct WsTransport {
    connect_timeout: Duration,
}

impl WsTransport {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl ChannelTransport for WsTransport {
    async fn open(&self, url: &str) -> Result<SocketLink> {
        let (ws_stream, _) = tokio::time::timeout(self.connect_timeout, connect_async(url))
            .await
            .with_context(|| format!("connecting to {} timed out", url))?
            .with_context(|| format!("connecting to {}", url))?;

        let (mut write, mut read) = ws_stream.split();
        let (in_tx, in_rx) = unbounded_channel::<String>();
        let (out_tx, mut out_rx) = unbounded_channel::<String>();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    outbound = out_rx.recv() => match outbound {
                        Some(text) => {
                            if let Err(e) = write.send(Message::Text(text.into())).await {
                                log::warn!("Push channel write failed: {}", e);
                                break;
                            }
                        }
                        None => {
                            let _ = write.send(Message::Close(None)).await;
                            break;
                        }
                    },
                    frame = read.next() => match frame {
                        Some(Ok(Message::Text(text))) => {
                            #[cfg(debug_assertions)]
                            if DF.log_channel_frames {
                                log::debug!("[push-frame] {}", text.as_str());
                            }
                            if in_tx.send(text.to_string()).is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            log::warn!("Push channel read failed: {}", e);
                            break;
                        }
                    },
                }
            }
        });

        Ok(SocketLink {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}
