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

//! Per-client RCON session
//!
//! A [`Session`] owns the write half of one client socket and the client's
//! authentication state. Inbound packets are fed to [`Session::process`],
//! which advances the state machine and returns a [`Directive`] telling the
//! listener what to do next. The session never reads from its socket; the
//! listener multiplexes all read halves itself.

use crate::{ConnectionId, RconError, Result, ServerConfig, SessionState};
use futures::SinkExt;
use metrics::{counter, gauge};
use rconix_rconcodec::consts::{MAX_BODY_SIZE, SERVERDATA_AUTH, SERVERDATA_EXECCOMMAND};
use rconix_rconcodec::{CodecError, Packet, RconCodec};
use std::borrow::Cow;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

/// What the listener must do after a packet has been processed
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Directive {
    /// Write these packets and keep the session open
    Reply(Vec<Packet>),
    /// Run the command through the bridge and answer with `request_id`
    Execute {
        /// Request id to echo on every response packet
        request_id: i32,
        /// Command line exactly as the client sent it
        command: String,
    },
    /// Write these packets, then close the session
    Reject(Vec<Packet>),
}

/// One connected RCON client
pub(crate) struct Session<W> {
    id: ConnectionId,
    peer_addr: SocketAddr,
    state: SessionState,
    writer: FramedWrite<W, RconCodec>,
    password: Arc<str>,
    auth_ack: bool,
    write_timeout: Duration,
    reader_stop: CancellationToken,
}

impl<W> Session<W>
where
    W: AsyncWrite + Unpin,
{
    /// Create a session around the write half of an accepted socket
    ///
    /// `reader_stop` is cancelled when the session closes so the listener's
    /// read stream for this client ends as well.
    #[instrument(skip(writer, config, reader_stop), fields(connection_id = %id))]
    pub(crate) fn new(
        id: ConnectionId,
        peer_addr: SocketAddr,
        writer: W,
        config: &ServerConfig,
        reader_stop: CancellationToken,
    ) -> Self {
        info!(peer_addr = %peer_addr, "Creating new RCON session");

        counter!("rconix.connections.total").increment(1);
        gauge!("rconix.connections.active").increment(1.0);

        Self {
            id,
            peer_addr,
            state: SessionState::Unauthenticated,
            writer: FramedWrite::new(writer, RconCodec::new()),
            password: Arc::from(config.password.as_str()),
            auth_ack: config.auth_ack,
            write_timeout: config.write_timeout,
            reader_stop,
        }
    }

    /// Get the peer address
    pub(crate) fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Get the current authentication state
    pub(crate) fn state(&self) -> SessionState {
        self.state
    }

    /// Advance the state machine with one decoded packet
    ///
    /// Type `2` means EXECCOMMAND only on an authenticated session. Before
    /// authentication anything but AUTH is refused.
    pub(crate) fn process(&mut self, packet: Packet) -> Directive {
        trace!(
            connection_id = %self.id,
            request_id = packet.id,
            kind = packet.kind,
            "Processing packet"
        );

        match self.state {
            SessionState::Unauthenticated => self.authenticate(packet),
            SessionState::Authenticated => match packet.kind {
                SERVERDATA_EXECCOMMAND => Directive::Execute {
                    request_id: packet.id,
                    command: packet.body,
                },
                SERVERDATA_AUTH => {
                    warn!(connection_id = %self.id, "Repeated AUTH on authenticated session");
                    counter!("rconix.auth.failures").increment(1);
                    Directive::Reject(vec![Packet::auth_failure()])
                }
                kind => {
                    warn!(connection_id = %self.id, kind, "Unexpected packet type");
                    counter!("rconix.protocol.errors").increment(1);
                    Directive::Reject(Vec::new())
                }
            },
            SessionState::Closed => Directive::Reject(Vec::new()),
        }
    }

    fn authenticate(&mut self, packet: Packet) -> Directive {
        if let Err(e) = self.check_credentials(&packet) {
            debug!(connection_id = %self.id, error = %e, "Refusing unauthenticated client");
            counter!("rconix.auth.failures").increment(1);
            return Directive::Reject(vec![Packet::auth_failure()]);
        }

        self.state = SessionState::Authenticated;
        info!(connection_id = %self.id, peer_addr = %self.peer_addr, "Session authenticated");

        let mut replies = vec![Packet::auth_response(packet.id)];
        if self.auth_ack {
            replies.push(Packet::response_value(packet.id, ""));
        }
        Directive::Reply(replies)
    }

    /// Check that `packet` is an AUTH carrying the configured password
    fn check_credentials(&self, packet: &Packet) -> Result<()> {
        if packet.kind != SERVERDATA_AUTH {
            warn!(
                connection_id = %self.id,
                kind = packet.kind,
                "Packet received before authentication"
            );
            return Err(RconError::AuthenticationFailed);
        }
        if packet.body != *self.password {
            warn!(
                connection_id = %self.id,
                peer_addr = %self.peer_addr,
                "Wrong RCON password"
            );
            return Err(RconError::AuthenticationFailed);
        }
        Ok(())
    }

    /// Decide how to react to input the codec could not decode
    ///
    /// An unauthenticated client whose frame was delimited but invalid still
    /// receives an AUTH failure. Everything else closes silently.
    pub(crate) fn on_malformed(&mut self, error: &CodecError) -> Directive {
        if error.is_io_error() {
            debug!(connection_id = %self.id, error = %error, "Read failed");
            return Directive::Reject(Vec::new());
        }

        warn!(connection_id = %self.id, error = %error, "Malformed packet");
        counter!("rconix.protocol.errors").increment(1);

        if self.state == SessionState::Unauthenticated && !error.is_framing_error() {
            counter!("rconix.auth.failures").increment(1);
            Directive::Reject(vec![Packet::auth_failure()])
        } else {
            Directive::Reject(Vec::new())
        }
    }

    /// Write a batch of packets, bounded by the write timeout
    pub(crate) async fn send(&mut self, packets: Vec<Packet>) -> Result<()> {
        if self.state.is_terminal() {
            return Err(RconError::ConnectionClosed);
        }
        if packets.is_empty() {
            return Ok(());
        }

        let timeout = self.write_timeout;
        let writer = &mut self.writer;
        let write = async move {
            for packet in packets {
                writer.feed(packet).await?;
            }
            SinkExt::<Packet>::flush(writer).await
        };

        match tokio::time::timeout(timeout, write).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(RconError::WriteTimeout),
        }
    }

    /// Write the executor's answer to a command
    #[instrument(skip(self, text), fields(connection_id = %self.id, len = text.len()))]
    pub(crate) async fn respond(&mut self, request_id: i32, text: &str) -> Result<()> {
        let packets = split_response(request_id, text);
        debug!(packets = packets.len(), "Sending command response");
        self.send(packets).await
    }

    /// Mark the session closed without touching the socket
    ///
    /// Stops the listener's read stream. Returns `false` if the session was
    /// already closed.
    pub(crate) fn abort(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = SessionState::Closed;
        self.reader_stop.cancel();
        gauge!("rconix.connections.active").decrement(1.0);
        info!(connection_id = %self.id, peer_addr = %self.peer_addr, "Session closed");
        true
    }

    /// Close the session and shut down the write half
    ///
    /// Safe to call more than once.
    pub(crate) async fn close(&mut self) {
        if self.abort() {
            let timeout = self.write_timeout;
            let _ = tokio::time::timeout(timeout, self.writer.get_mut().shutdown()).await;
        }
    }
}

/// Build the `RESPONSE_VALUE` packets for one command response
///
/// Text of at most [`MAX_BODY_SIZE`] bytes is a single packet. Longer text is
/// cut on character boundaries into packets of at most [`MAX_BODY_SIZE`]
/// bytes and followed by one empty terminator packet. NUL bytes cannot travel
/// in a body and are dropped.
///
/// # Example
///
/// ```
/// use rconix_service::split_response;
///
/// let packets = split_response(7, &"x".repeat(5000));
/// assert_eq!(packets.len(), 3);
/// assert!(packets.iter().all(|p| p.id == 7));
/// assert!(packets[2].body.is_empty());
/// ```
pub fn split_response(request_id: i32, text: &str) -> Vec<Packet> {
    let text = if text.contains('\0') {
        Cow::Owned(text.replace('\0', ""))
    } else {
        Cow::Borrowed(text)
    };

    if text.len() <= MAX_BODY_SIZE {
        return vec![Packet::response_value(request_id, text.into_owned())];
    }

    let mut packets = Vec::with_capacity(text.len() / MAX_BODY_SIZE + 2);
    let mut rest: &str = &text;
    while !rest.is_empty() {
        let mut cut = rest.len().min(MAX_BODY_SIZE);
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        let (chunk, tail) = rest.split_at(cut);
        packets.push(Packet::response_value(request_id, chunk));
        rest = tail;
    }
    packets.push(Packet::response_value(request_id, ""));
    packets
}
