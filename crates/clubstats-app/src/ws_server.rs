// WebSocket server for dashboard and admin clients.

use futures_util::stream::Stream;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Capacity of each client's outbound queue.
const OUTBOUND_CAPACITY: usize = 64;

/// Events emitted by the WebSocket server to the application layer.
#[derive(Debug)]
pub enum WsEvent {
    /// A client finished the handshake. Replies go through `outbound`.
    Connected {
        conn_id: u64,
        addr: String,
        outbound: mpsc::Sender<String>,
    },
    Disconnected { conn_id: u64 },
    /// A text frame from a client (raw JSON string).
    Message { conn_id: u64, text: String },
}

impl PartialEq for WsEvent {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                WsEvent::Connected {
                    conn_id: a,
                    addr: addr_a,
                    outbound: out_a,
                },
                WsEvent::Connected {
                    conn_id: b,
                    addr: addr_b,
                    outbound: out_b,
                },
            ) => a == b && addr_a == addr_b && out_a.same_channel(out_b),
            (WsEvent::Disconnected { conn_id: a }, WsEvent::Disconnected { conn_id: b }) => a == b,
            (
                WsEvent::Message {
                    conn_id: a,
                    text: text_a,
                },
                WsEvent::Message {
                    conn_id: b,
                    text: text_b,
                },
            ) => a == b && text_a == text_b,
            _ => false,
        }
    }
}

/// Run the WebSocket server on the given port, forwarding events through `tx`.
///
/// Binds `127.0.0.1:{port}` and serves every connection on its own task.
/// Runs until the event receiver is dropped or the task is cancelled.
pub async fn run(port: u16, tx: mpsc::Sender<WsEvent>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(format!("127.0.0.1:{port}")).await?;
    let local_addr = listener.local_addr()?;
    info!("WebSocket server listening on {local_addr}");

    let mut next_conn_id: u64 = 0;
    loop {
        let (stream, addr) = listener.accept().await?;
        if tx.is_closed() {
            break;
        }
        next_conn_id += 1;
        let conn_id = next_conn_id;
        info!("Accepted TCP connection {conn_id} from {addr}");

        let tx = tx.clone();
        tokio::spawn(async move {
            serve_connection(stream, addr.to_string(), conn_id, tx).await;
        });
    }

    Ok(())
}

/// Handshake, then pump frames both ways until either side goes away.
async fn serve_connection(
    stream: TcpStream,
    addr: String,
    conn_id: u64,
    tx: mpsc::Sender<WsEvent>,
) {
    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake failed for {addr}: {e}");
            return;
        }
    };

    let (mut write, read) = ws_stream.split();
    let (out_tx, mut out_rx) = mpsc::channel::<String>(OUTBOUND_CAPACITY);

    let writer = tokio::spawn(async move {
        while let Some(text) = out_rx.recv().await {
            if let Err(e) = write.send(Message::Text(text.into())).await {
                debug!("Write to connection {conn_id} failed: {e}");
                break;
            }
        }
        let _ = write.close().await;
    });

    let connected = WsEvent::Connected {
        conn_id,
        addr: addr.clone(),
        outbound: out_tx,
    };
    if tx.send(connected).await.is_ok()
        && process_message_stream(read, &tx, conn_id, &addr).await.is_ok()
    {
        let _ = tx.send(WsEvent::Disconnected { conn_id }).await;
    }

    // The app drops its outbound sender on Disconnected; stop the writer
    // regardless in case the app loop is already gone.
    writer.abort();
    info!("Connection {conn_id} from {addr} closed");
}

/// Process raw WebSocket [`Message`] items from any [`Stream`], forwarding
/// text payloads through `tx`. Returns `Err(())` if the channel is closed
/// (receiver dropped), signalling the caller to stop.
///
/// Generic over the stream so it can be tested without opening TCP ports.
pub async fn process_message_stream<St>(
    mut stream: St,
    tx: &mpsc::Sender<WsEvent>,
    conn_id: u64,
    addr: &str,
) -> Result<(), ()>
where
    St: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(msg_result) = stream.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                let event = WsEvent::Message {
                    conn_id,
                    text: text.to_string(),
                };
                if tx.send(event).await.is_err() {
                    return Err(());
                }
            }
            Ok(Message::Close(_)) => {
                info!("Client {addr} sent close frame");
                break;
            }
            Err(e) => {
                warn!("WebSocket error from {addr}: {e}");
                break;
            }
            _ => {
                // Ignore Binary, Ping, Pong, Frame variants.
            }
        }
    }
    Ok(())
}
