//! WebSocket transport
//!
//! Minimal WebSocket server that hands each connection to a `Router`.
//! Responsibilities:
//! - accept TCP connections and perform the WebSocket upgrade
//! - give each connection a `Client` with a bounded outbound queue
//! - run a writer task that drains that queue into the socket
//! - run the router over the inbound half until the connection ends

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn;
use tokio::sync::{Notify, mpsc};
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::Broker;
use crate::client::{Client, ConnectionId};
use crate::config::{BrokerSettings, Settings};
use crate::transport::router::Router;
use crate::utils::BrokerError;

/// Bind `addr` and serve connections until the listener fails.
pub async fn start_websocket_server(
    addr: String,
    broker: Arc<Broker>,
    settings: Settings,
) -> Result<(), BrokerError> {
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| BrokerError::Bind {
            addr: addr.clone(),
            source,
        })?;

    info!("WebSocket server listening on ws://{addr}");

    serve(listener, broker, settings).await;
    Ok(())
}

/// Accept loop over an already bound listener.
pub async fn serve(listener: TcpListener, broker: Arc<Broker>, settings: Settings) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                spawn(handle_connection(
                    stream,
                    peer,
                    broker.clone(),
                    settings.broker.clone(),
                ));
            }
            Err(e) => {
                warn!("Failed to accept connection: {e}");
                // avoid spinning while e.g. out of file descriptors
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    broker: Arc<Broker>,
    settings: BrokerSettings,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake error from {peer}: {e}");
            return;
        }
    };

    let (ws_sender, ws_receiver) = ws_stream.split();
    let (tx, rx) = mpsc::channel::<WsMessage>(settings.outbound_buffer);
    let client = Client::new(tx);
    let client_id = client.id;

    info!("{client_id} connected from {peer}");

    spawn(send_loop(
        ws_sender,
        rx,
        client.shutdown_signal(),
        client_id,
        Duration::from_millis(settings.write_timeout_ms),
    ));

    Router::new(broker, client).run(ws_receiver).await;
}

/// Forward queued frames to the socket. A failed or timed-out write asks the
/// connection to shut down. Ends once every sender is gone.
pub(crate) async fn send_loop<S>(
    mut sink: S,
    mut rx: mpsc::Receiver<WsMessage>,
    shutdown: Arc<Notify>,
    client_id: ConnectionId,
    write_timeout: Duration,
) where
    S: Sink<WsMessage> + Unpin,
    S::Error: std::fmt::Display,
{
    while let Some(msg) = rx.recv().await {
        match timeout(write_timeout, sink.send(msg)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("Failed to send message to {client_id}: {e}");
                shutdown.notify_one();
                break;
            }
            Err(_) => {
                warn!("Send to {client_id} timed out after {write_timeout:?}");
                shutdown.notify_one();
                break;
            }
        }
    }

    // dropping rx makes further sends to this connection fail
    drop(rx);
    let _ = timeout(write_timeout, sink.close()).await;
    debug!("Send loop closed for {client_id}");
}
