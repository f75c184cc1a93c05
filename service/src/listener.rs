//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Listener and connection table
//!
//! The listener owns the listening socket and every [`Session`]. One
//! `tokio::select!` per iteration waits on the shutdown token, the listening
//! socket, the merged read streams of all sessions and a housekeeping tick.
//! Everything runs on the serving thread's current-thread runtime; there is
//! no task per connection.

use crate::bridge::CommandBridge;
use crate::session::{Directive, Session};
use crate::{ConnectionId, RconError, Result, ServerConfig};
use futures::stream::{self, BoxStream, SelectAll};
use futures::StreamExt;
use metrics::{counter, gauge};
use rconix_rconcodec::{CodecError, Packet, RconCodec};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::MissedTickBehavior;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Something that happened on a session's read half
#[derive(Debug)]
enum Inbound {
    Packet(Packet),
    Malformed(CodecError),
    Closed,
}

type ReadStream = BoxStream<'static, (ConnectionId, Inbound)>;

/// Event loop of the serving thread
pub(crate) struct Listener {
    config: ServerConfig,
    listener: TcpListener,
    sessions: HashMap<ConnectionId, Session<OwnedWriteHalf>>,
    reads: SelectAll<ReadStream>,
    bridge: CommandBridge,
    shutdown: CancellationToken,
    next_id: u64,
}

impl Listener {
    pub(crate) fn new(
        config: ServerConfig,
        listener: TcpListener,
        bridge: CommandBridge,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            listener,
            sessions: HashMap::new(),
            reads: SelectAll::new(),
            bridge,
            shutdown,
            next_id: 1,
        }
    }

    /// Serve until the shutdown token is cancelled
    pub(crate) async fn run(mut self) {
        let period = self.config.housekeeping_interval;
        let mut housekeeping =
            tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        housekeeping.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            address = ?self.listener.local_addr().ok(),
            max_connections = self.config.max_connections,
            "RCON listener running"
        );

        loop {
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => break,
                accepted = self.listener.accept() => self.on_accept(accepted).await,
                Some((id, inbound)) = self.reads.next(), if !self.reads.is_empty() => {
                    self.on_inbound(id, inbound).await;
                }
                _ = housekeeping.tick() => self.housekeeping(),
            }
        }

        self.close_all();
        info!("RCON listener stopped");
    }

    fn next_connection_id(&mut self) -> ConnectionId {
        let id = ConnectionId::new(self.next_id);
        self.next_id += 1;
        id
    }

    async fn on_accept(&mut self, accepted: std::io::Result<(TcpStream, SocketAddr)>) {
        let (socket, peer_addr) = match accepted {
            Ok(accepted) => accepted,
            Err(e) => {
                error!(error = %e, "Failed to accept connection");
                // Back off on errors to avoid tight loop
                tokio::select! {
                    () = self.shutdown.cancelled() => {}
                    () = tokio::time::sleep(Duration::from_millis(100)) => {}
                }
                return;
            }
        };

        if self.sessions.len() >= self.config.max_connections {
            warn!(
                peer_addr = %peer_addr,
                max_connections = self.config.max_connections,
                "Connection limit reached, rejecting connection"
            );
            counter!("rconix.connections.rejected").increment(1);
            drop(socket);
            return;
        }

        if let Err(e) = socket.set_nodelay(true) {
            debug!(peer_addr = %peer_addr, error = %e, "Failed to set TCP_NODELAY");
        }

        let id = self.next_connection_id();
        let (read_half, write_half) = socket.into_split();
        let reader_stop = self.shutdown.child_token();

        let session = Session::new(id, peer_addr, write_half, &self.config, reader_stop.clone());
        self.reads.push(read_stream(id, read_half, reader_stop));
        self.sessions.insert(id, session);

        debug!(
            connection_id = %id,
            sessions = self.sessions.len(),
            "Connection accepted"
        );
    }

    async fn on_inbound(&mut self, id: ConnectionId, inbound: Inbound) {
        let Some(session) = self.sessions.get_mut(&id) else {
            trace!(connection_id = %id, "Event for closed session");
            return;
        };

        let directive = match inbound {
            Inbound::Packet(packet) => session.process(packet),
            Inbound::Malformed(error) => session.on_malformed(&error),
            Inbound::Closed => {
                debug!(connection_id = %id, "Peer closed connection");
                Directive::Reject(Vec::new())
            }
        };

        self.apply(id, directive).await;
    }

    async fn apply(&mut self, id: ConnectionId, directive: Directive) {
        match directive {
            Directive::Reply(packets) => {
                if let Err(e) = self.write(id, packets).await {
                    self.on_write_error(id, &e).await;
                }
            }
            Directive::Reject(packets) => {
                if let Err(e) = self.write(id, packets).await {
                    debug!(connection_id = %id, error = %e, "Failed to send final packets");
                }
                self.close_session(id).await;
            }
            Directive::Execute {
                request_id,
                command,
            } => {
                info!(connection_id = %id, command = %command, "Executing RCON command");
                let response = match self.bridge.submit(command).await {
                    Ok(response) => response,
                    Err(RconError::ServerShuttingDown) => return,
                    Err(e) => {
                        warn!(connection_id = %id, error = %e, "Command was not executed");
                        e.to_string()
                    }
                };
                if let Err(e) = self.respond(id, request_id, &response).await {
                    self.on_write_error(id, &e).await;
                }
            }
        }
    }

    async fn write(&mut self, id: ConnectionId, packets: Vec<Packet>) -> Result<()> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(RconError::ConnectionNotFound(id))?;
        tokio::select! {
            biased;
            () = self.shutdown.cancelled() => Err(RconError::ServerShuttingDown),
            result = session.send(packets) => result,
        }
    }

    async fn respond(&mut self, id: ConnectionId, request_id: i32, text: &str) -> Result<()> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(RconError::ConnectionNotFound(id))?;
        tokio::select! {
            biased;
            () = self.shutdown.cancelled() => Err(RconError::ServerShuttingDown),
            result = session.respond(request_id, text) => result,
        }
    }

    async fn on_write_error(&mut self, id: ConnectionId, error: &RconError) {
        if error.is_connection_local() {
            warn!(connection_id = %id, error = %error, "Write failed, closing session");
            self.close_session(id).await;
        }
    }

    async fn close_session(&mut self, id: ConnectionId) {
        if let Some(mut session) = self.sessions.remove(&id) {
            session.close().await;
        }
    }

    fn housekeeping(&mut self) {
        self.sessions.retain(|_, session| !session.state().is_terminal());
        let authenticated = self
            .sessions
            .values()
            .filter(|session| session.state().is_authenticated())
            .count();

        gauge!("rconix.connections.active").set(self.sessions.len() as f64);
        debug!(
            sessions = self.sessions.len(),
            authenticated,
            max_connections = self.config.max_connections,
            "Housekeeping"
        );
    }

    fn close_all(&mut self) {
        for (id, mut session) in self.sessions.drain() {
            trace!(connection_id = %id, peer_addr = %session.peer_addr(), "Closing on shutdown");
            session.abort();
        }
    }
}

/// Turn a socket read half into a stream of events for the listener
///
/// The stream ends with one `Closed` event, after EOF, after a decode error,
/// or once `stop` is cancelled.
fn read_stream<R>(id: ConnectionId, reader: R, stop: CancellationToken) -> ReadStream
where
    R: AsyncRead + Send + 'static,
{
    FramedRead::new(reader, RconCodec::new())
        .map(|item| match item {
            Ok(packet) => Inbound::Packet(packet),
            Err(error) => Inbound::Malformed(error),
        })
        .take_until(stop.cancelled_owned())
        .chain(stream::once(async { Inbound::Closed }))
        .map(move |inbound| (id, inbound))
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rconix_rconcodec::consts::SERVERDATA_AUTH;

    async fn collect(stream: ReadStream) -> Vec<Inbound> {
        stream.map(|(_, inbound)| inbound).collect().await
    }

    #[tokio::test]
    async fn test_read_stream_ends_with_closed_on_eof() {
        let mut bytes = Vec::new();
        for packet in [Packet::auth(1, "pw"), Packet::exec_command(2, "list")] {
            bytes.extend_from_slice(&packet.to_bytes().unwrap());
        }

        let events = collect(read_stream(
            ConnectionId::new(1),
            std::io::Cursor::new(bytes),
            CancellationToken::new(),
        ))
        .await;

        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], Inbound::Packet(p) if p.kind == SERVERDATA_AUTH));
        assert!(matches!(&events[1], Inbound::Packet(p) if p.body == "list"));
        assert!(matches!(events[2], Inbound::Closed));
    }

    #[tokio::test]
    async fn test_read_stream_stops_after_malformed() {
        let mut bytes = (-1i32).to_le_bytes().to_vec();
        bytes.extend_from_slice(&Packet::auth(1, "pw").to_bytes().unwrap());

        let events = collect(read_stream(
            ConnectionId::new(1),
            std::io::Cursor::new(bytes),
            CancellationToken::new(),
        ))
        .await;

        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            Inbound::Malformed(CodecError::InvalidSize { size: -1 })
        ));
        assert!(matches!(events[1], Inbound::Closed));
    }

    #[tokio::test]
    async fn test_read_stream_stops_when_cancelled() {
        let (_client, server) = tokio::io::duplex(64);
        let stop = CancellationToken::new();
        let mut stream = read_stream(ConnectionId::new(7), server, stop.clone());

        stop.cancel();
        let (id, event) = stream.next().await.unwrap();
        assert_eq!(id, ConnectionId::new(7));
        assert!(matches!(event, Inbound::Closed));
        assert!(stream.next().await.is_none());
    }
}
