use std::{sync::Arc, time::Duration};

use anyhow::anyhow;
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use serde_json::json;
use tokio::{net::TcpStream, sync::Mutex};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, Message},
    MaybeTlsStream, WebSocketStream,
};

use super::types::{GatewayPayload, Hello, MessageCreate};
use super::USER_AGENT;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = Arc<Mutex<SplitSink<WsStream, Message>>>;

const OP_DISPATCH: u8 = 0;
const OP_HEARTBEAT: u8 = 1;
const OP_IDENTIFY: u8 = 2;
const OP_RECONNECT: u8 = 7;
const OP_INVALID_SESSION: u8 = 9;
const OP_HELLO: u8 = 10;
const OP_HEARTBEAT_ACK: u8 = 11;

// GUILD_MESSAGES | DIRECT_MESSAGES | MESSAGE_CONTENT
const INTENTS: u64 = (1 << 9) | (1 << 12) | (1 << 15);

pub trait WsHandler {
    /// Waits for the next message. Resolves to None once the gateway stream has ended
    fn recv(
        &mut self,
    ) -> impl std::future::Future<Output = Result<Option<MessageCreate>, anyhow::Error>>
           + std::marker::Send;
}

pub struct WsHandlerImpl {
    handle: tokio::task::JoinHandle<()>,
    heartbeat: tokio::task::JoinHandle<()>,
    rx: tokio::sync::mpsc::UnboundedReceiver<MessageCreate>,
}

impl WsHandlerImpl {
    pub async fn connect(ws_url: &str, token: &str) -> Result<Self, anyhow::Error> {
        ws_url
            .parse::<http::Uri>()?
            .host()
            .ok_or(anyhow!("cannot parse host from uri"))?;

        let mut request = ws_url.into_client_request()?;
        request.headers_mut().insert(
            http::header::USER_AGENT,
            http::HeaderValue::from_static(USER_AGENT),
        );

        let (ws_stream, _) = connect_async(request).await?;
        let (sink, mut stream) = ws_stream.split();
        let sink: WsSink = Arc::new(Mutex::new(sink));

        let hello = Self::wait_for_hello(&mut stream).await?;
        log::debug!("gateway hello, heartbeat every {}ms", hello.heartbeat_interval);

        Self::send_payload(
            &sink,
            &GatewayPayload {
                op: OP_IDENTIFY,
                d: json!({
                    "token": token,
                    "intents": INTENTS,
                    "properties": {
                        "os": std::env::consts::OS,
                        "browser": USER_AGENT,
                        "device": USER_AGENT,
                    }
                }),
                s: None,
                t: None,
            },
        )
        .await?;

        let sequence = Arc::new(Mutex::new(None::<u64>));
        let heartbeat = tokio::spawn(Self::heartbeat_loop(
            sink.clone(),
            sequence.clone(),
            Duration::from_millis(hello.heartbeat_interval),
        ));
        let heartbeat_abort = heartbeat.abort_handle();

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let handle = tokio::spawn(async move {
            while let Some(msg_maybe) = stream.next().await {
                let text = match msg_maybe {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(frame)) => {
                        log::warn!("gateway closed the connection {:?}", frame);
                        break;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        log::error!("can't get gateway message due to {e}");
                        break;
                    }
                };

                let payload = match serde_json::from_str::<GatewayPayload>(&text) {
                    Ok(payload) => payload,
                    Err(e) => {
                        log::warn!("not a gateway payload {e}");
                        continue;
                    }
                };

                if payload.s.is_some() {
                    *sequence.lock().await = payload.s;
                }

                match payload.op {
                    OP_DISPATCH => match payload.t.as_deref() {
                        Some("MESSAGE_CREATE") => {
                            let _ = serde_json::from_value::<MessageCreate>(payload.d)
                                .map(|message| {
                                    let _ = tx.send(message).inspect_err(|e| {
                                        log::warn!("can't send message to channel {e}")
                                    });
                                })
                                .inspect_err(|e| log::warn!("malformed MESSAGE_CREATE {e}"));
                        }
                        Some("READY") => log::info!("gateway session is ready"),
                        _ => {}
                    },
                    OP_HEARTBEAT => {
                        let seq = *sequence.lock().await;
                        if let Err(e) = Self::send_heartbeat(&sink, seq).await {
                            log::error!("can't answer heartbeat request {e}");
                            break;
                        }
                    }
                    OP_HEARTBEAT_ACK => log::debug!("heartbeat acknowledged"),
                    OP_RECONNECT | OP_INVALID_SESSION => {
                        log::warn!("gateway asked to end the session (op {})", payload.op);
                        break;
                    }
                    _ => {}
                }
            }

            heartbeat_abort.abort();
            log::warn!("gateway stream ended");
        });

        Ok(Self {
            handle,
            heartbeat,
            rx,
        })
    }

    async fn wait_for_hello(stream: &mut SplitStream<WsStream>) -> Result<Hello, anyhow::Error> {
        while let Some(msg) = stream.next().await {
            if let Message::Text(text) = msg? {
                let payload = serde_json::from_str::<GatewayPayload>(&text)?;
                if payload.op == OP_HELLO {
                    return Ok(serde_json::from_value(payload.d)?);
                }
            }
        }

        Err(anyhow!("gateway closed before hello"))
    }

    async fn heartbeat_loop(sink: WsSink, sequence: Arc<Mutex<Option<u64>>>, every: Duration) {
        let mut interval = tokio::time::interval(every);
        interval.tick().await;

        loop {
            interval.tick().await;
            let seq = *sequence.lock().await;
            if let Err(e) = Self::send_heartbeat(&sink, seq).await {
                log::error!("heartbeat failed {e}");
                break;
            }
        }
    }

    async fn send_heartbeat(sink: &WsSink, seq: Option<u64>) -> Result<(), anyhow::Error> {
        Self::send_payload(
            sink,
            &GatewayPayload {
                op: OP_HEARTBEAT,
                d: json!(seq),
                s: None,
                t: None,
            },
        )
        .await
    }

    async fn send_payload(sink: &WsSink, payload: &GatewayPayload) -> Result<(), anyhow::Error> {
        let text = serde_json::to_string(payload)?;
        sink.lock().await.send(Message::Text(text)).await?;
        Ok(())
    }
}

impl WsHandler for WsHandlerImpl {
    async fn recv(&mut self) -> Result<Option<MessageCreate>, anyhow::Error> {
        Ok(self.rx.recv().await)
    }
}

impl Drop for WsHandlerImpl {
    fn drop(&mut self) {
        self.heartbeat.abort();
        self.handle.abort();
    }
}

#[cfg(test)]
pub struct MockWsHandler {
    pub tx: crossbeam::channel::Sender<MessageCreate>,
    pub rx: crossbeam::channel::Receiver<MessageCreate>,
}

#[cfg(test)]
impl Default for MockWsHandler {
    fn default() -> Self {
        let (tx, rx) = crossbeam::channel::unbounded();
        Self { tx, rx }
    }
}

#[cfg(test)]
impl WsHandler for MockWsHandler {
    // an empty queue ends the stream
    async fn recv(&mut self) -> Result<Option<MessageCreate>, anyhow::Error> {
        Ok(self.rx.try_recv().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::{WsHandler, WsHandlerImpl};
    use crate::discordclient::{Author, MessageCreate};

    fn message(id: u64) -> MessageCreate {
        MessageCreate {
            id,
            channel_id: 20,
            guild_id: Some(10),
            author: Author {
                id: 100,
                username: "lowend".to_string(),
                discriminator: None,
                global_name: None,
                bot: false,
            },
            content: format!("message {}", id),
            attachments: vec![],
            mentions: vec![],
        }
    }

    // a burst larger than any fixed buffer must reach the event loop intact
    #[tokio::test]
    async fn test_recv_delivers_every_queued_message() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let mut ws_handler = WsHandlerImpl {
            handle: tokio::spawn(async {}),
            heartbeat: tokio::spawn(async {}),
            rx,
        };

        (0..100).for_each(|id| tx.send(message(id)).expect("receiver is alive"));
        drop(tx);

        let mut seen = vec![];
        while let Some(message) = ws_handler.recv().await.expect("can receive") {
            seen.push(message.id);
        }

        assert_eq!(seen.len(), 100);
        assert_eq!(seen.first(), Some(&0));
        assert_eq!(seen.last(), Some(&99));
    }

    #[ignore = "this is a live test, requires a bot token"]
    #[tokio::test]
    async fn test_ws_handler() {
        let token = std::env::var("TOKEN_BOT").expect("please set TOKEN_BOT");
        let mut ws_handler = WsHandlerImpl::connect(crate::discordclient::DEFAULT_GATEWAY_URL, &token)
            .await
            .expect("can get ws handler");

        let item = ws_handler.recv().await.expect("can receive");
        println!("item: {:#?}", item);
    }
}
