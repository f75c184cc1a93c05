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

//! RCON server lifecycle
//!
//! The RconServer is the main entry point. It binds the listening socket,
//! runs the listener on a dedicated serving thread and tears everything down
//! again on [`RconServer::stop`].

use crate::bridge::CommandBridge;
use crate::listener::Listener;
use crate::{CommandExecutor, HostScheduler, RconError, Result, ServerConfig};
use std::net::SocketAddr;
use std::sync::mpsc::{SyncSender, sync_channel};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tokio::net::{TcpListener, TcpSocket};
use tokio_util::sync::CancellationToken;

/// Name of the serving thread
pub const SERVING_THREAD_NAME: &str = "rcon-server";

/// A running RCON server
///
/// Created by [`RconServer::start`]; stopped by [`RconServer::stop`] or by
/// dropping it.
///
/// # Example
///
/// ```no_run
/// use rconix_service::{HostQueue, RconServer, ServerConfig};
/// use std::time::Duration;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut queue = HostQueue::new();
///     let config = ServerConfig::new("0.0.0.0:25575".parse()?, "hunter2");
///
///     let server = RconServer::start(
///         config,
///         |command: &str| format!("You said: {command}"),
///         queue.scheduler(),
///     )?;
///
///     // Host main loop
///     for _ in 0..100 {
///         queue.run_pending();
///         std::thread::sleep(Duration::from_millis(50));
///     }
///
///     server.stop();
///     Ok(())
/// }
/// ```
pub struct RconServer {
    /// Address the listening socket is bound to
    local_addr: SocketAddr,
    /// Control channel of the serving thread
    shutdown: CancellationToken,
    /// Serving thread, taken on stop
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl RconServer {
    /// Bind the listening socket and start the serving thread
    ///
    /// Returns once the socket is listening. Fails without retrying if the
    /// configuration is invalid or the address cannot be bound.
    pub fn start<E, S>(config: ServerConfig, executor: E, scheduler: S) -> Result<Self>
    where
        E: CommandExecutor,
        S: HostScheduler,
    {
        config.validate()?;

        let shutdown = CancellationToken::new();
        let bridge = CommandBridge::new(
            Arc::new(executor),
            Arc::new(scheduler),
            shutdown.clone(),
            config.strip_formatting,
        );

        let (ready_tx, ready_rx) = sync_channel(1);
        let thread_shutdown = shutdown.clone();
        let handle = std::thread::Builder::new()
            .name(SERVING_THREAD_NAME.to_string())
            .spawn(move || serve(config, bridge, thread_shutdown, ready_tx))
            .map_err(RconError::Runtime)?;

        let startup = ready_rx.recv().unwrap_or_else(|_| {
            Err(RconError::Runtime(std::io::Error::other(
                "serving thread exited during startup",
            )))
        });

        match startup {
            Ok(local_addr) => {
                tracing::info!("RCON server listening on {}", local_addr);
                Ok(Self {
                    local_addr,
                    shutdown,
                    thread: Mutex::new(Some(handle)),
                })
            }
            Err(e) => {
                let _ = handle.join();
                tracing::error!("Failed to start RCON server: {}", e);
                Err(e)
            }
        }
    }

    /// Stop the server
    ///
    /// Wakes the serving thread, waits for it to exit and releases every
    /// socket. A command still waiting for the host is abandoned. Calling
    /// this on a stopped server does nothing.
    pub fn stop(&self) {
        let handle = match self.thread.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(handle) = handle else {
            return;
        };

        tracing::info!("Shutting down RCON server on {}", self.local_addr);
        self.shutdown.cancel();

        if handle.join().is_err() {
            tracing::error!("RCON serving thread panicked");
        }

        tracing::info!("RCON server shutdown complete");
    }

    /// Check if the serving thread is running
    pub fn is_running(&self) -> bool {
        match self.thread.lock() {
            Ok(guard) => guard.as_ref().is_some_and(|handle| !handle.is_finished()),
            Err(_) => false,
        }
    }

    /// Get the address the server is bound to
    ///
    /// Reports the actual port when the configuration asked for port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl std::fmt::Debug for RconServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RconServer")
            .field("local_addr", &self.local_addr)
            .field("running", &self.is_running())
            .finish()
    }
}

impl Drop for RconServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Body of the serving thread
fn serve(
    config: ServerConfig,
    bridge: CommandBridge,
    shutdown: CancellationToken,
    ready: SyncSender<Result<SocketAddr>>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            let _ = ready.send(Err(RconError::Runtime(e)));
            return;
        }
    };

    runtime.block_on(async move {
        let listener = match bind(&config) {
            Ok(listener) => listener,
            Err(e) => {
                let _ = ready.send(Err(e));
                return;
            }
        };
        let local_addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                let _ = ready.send(Err(RconError::Runtime(e)));
                return;
            }
        };
        if ready.send(Ok(local_addr)).is_err() {
            return;
        }
        drop(ready);

        Listener::new(config, listener, bridge, shutdown).run().await;
    });
}

/// Create the listening socket with address reuse enabled
fn bind(config: &ServerConfig) -> Result<TcpListener> {
    let address = config.bind_address;
    let open = || -> std::io::Result<TcpListener> {
        let socket = TcpSocket::new_v4()?;
        socket.set_reuseaddr(true)?;
        socket.bind(address)?;
        socket.listen(config.backlog)
    };
    open().map_err(|source| RconError::Bind { address, source })
}
