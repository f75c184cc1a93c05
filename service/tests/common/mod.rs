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

//! Shared helpers for the service integration tests

#![allow(dead_code)]

use futures::{SinkExt, StreamExt};
use rconix_rconcodec::RconCodec;
use rconix_rconcodec::consts::{SERVERDATA_AUTH_RESPONSE, SERVERDATA_RESPONSE_VALUE};
use rconix_service::{CommandExecutor, HostTask, Packet, RconServer, ServerConfig};
use std::net::SocketAddr;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

pub const PASSWORD: &str = "secret";

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Loopback configuration on an ephemeral port
pub fn config() -> ServerConfig {
    ServerConfig::new("127.0.0.1:0".parse().unwrap(), PASSWORD)
        .with_write_timeout(Duration::from_secs(2))
}

/// Scheduler running every task on a fresh thread, standing in for a host
pub fn threaded(task: HostTask) {
    std::thread::spawn(task);
}

/// Start a server with the threaded scheduler
pub fn start(config: ServerConfig, executor: impl CommandExecutor) -> RconServer {
    RconServer::start(config, executor, threaded).unwrap()
}

/// Executor that answers with the command line itself
pub fn echo(command: &str) -> String {
    command.to_string()
}

/// Minimal RCON client
pub struct TestClient {
    framed: Framed<TcpStream, RconCodec>,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        Self {
            framed: Framed::new(stream, RconCodec::new()),
        }
    }

    pub async fn send(&mut self, packet: Packet) {
        self.framed.send(packet).await.unwrap();
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        let stream = self.framed.get_mut();
        stream.write_all(bytes).await.unwrap();
        stream.flush().await.unwrap();
    }

    /// Next packet, or `None` once the server closed the connection
    pub async fn recv(&mut self) -> Option<Packet> {
        match tokio::time::timeout(RECV_TIMEOUT, self.framed.next()).await {
            Ok(Some(Ok(packet))) => Some(packet),
            Ok(Some(Err(_))) | Ok(None) => None,
            Err(_) => panic!("no packet from server within {RECV_TIMEOUT:?}"),
        }
    }

    /// Authenticate and consume the acknowledgement packets
    pub async fn authenticate(&mut self, id: i32) {
        self.send(Packet::auth(id, PASSWORD)).await;
        let response = self.recv().await.expect("auth response");
        assert_eq!(response.kind, SERVERDATA_AUTH_RESPONSE);
        assert_eq!(response.id, id);
        let ack = self.recv().await.expect("auth acknowledgement");
        assert_eq!(ack, Packet::response_value(id, ""));
    }

    /// Run a command whose response fits in one packet
    pub async fn exec(&mut self, id: i32, command: &str) -> String {
        self.send(Packet::exec_command(id, command)).await;
        let response = self.recv().await.expect("command response");
        assert_eq!(response.kind, SERVERDATA_RESPONSE_VALUE);
        assert_eq!(response.id, id);
        response.body
    }

    pub async fn assert_closed(&mut self) {
        assert_eq!(self.recv().await, None);
    }
}

/// A latch executors can block on until the test opens it
#[derive(Clone, Default)]
pub struct Gate {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Gate {
    pub fn wait(&self) {
        let (open, signal) = &*self.inner;
        let mut open = open.lock().unwrap();
        while !*open {
            open = signal.wait(open).unwrap();
        }
    }

    pub fn open(&self) {
        let (open, signal) = &*self.inner;
        *open.lock().unwrap() = true;
        signal.notify_all();
    }
}

/// Poll `condition` until it holds or two seconds pass
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
