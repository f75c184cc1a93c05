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

//! RCON Host Example
//!
//! This example runs a small "game server" main loop at 20 ticks per second
//! and exposes it through RCON. Commands run on the main loop thread between
//! ticks, never on the RCON serving thread.
//!
//! ## Usage
//!
//! Run the host:
//! ```bash
//! cargo run --example rcon_host -- 127.0.0.1:25575 hunter2
//! ```
//!
//! Connect with any Source RCON client, for example:
//! ```bash
//! mcrcon -H 127.0.0.1 -P 25575 -p hunter2 help
//! ```
//!
//! ## Commands
//!
//! - `echo <text>` - Send the text back
//! - `time` - Show the current tick and uptime
//! - `help` - List commands
//! - `stop` - Stop the host

use rconix_service::{HostQueue, RconServer, ServerConfig};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_millis(50);

/// State the main loop shares with the command executor
struct HostState {
    started: Instant,
    ticks: AtomicU64,
    running: AtomicBool,
}

impl HostState {
    fn execute(&self, line: &str) -> String {
        let (command, args) = line
            .trim()
            .split_once(' ')
            .unwrap_or((line.trim(), ""));

        match command {
            "echo" => args.to_string(),
            "time" => format!(
                "§eTick §a{}§e, uptime §a{:.1}s",
                self.ticks.load(Ordering::Relaxed),
                self.started.elapsed().as_secs_f64()
            ),
            "help" => "echo <text>, time, help, stop".to_string(),
            "stop" => {
                self.running.store(false, Ordering::Relaxed);
                "Stopping host".to_string()
            }
            "" => String::new(),
            other => format!("Unknown command: {other}. Try help."),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let address = args.next().unwrap_or_else(|| "127.0.0.1:25575".to_string());
    let password = args.next().unwrap_or_else(|| "hunter2".to_string());

    let state = Arc::new(HostState {
        started: Instant::now(),
        ticks: AtomicU64::new(0),
        running: AtomicBool::new(true),
    });

    let mut queue = HostQueue::new();
    let config = ServerConfig::new(address.parse()?, password).with_max_connections(10);

    let executor_state = Arc::clone(&state);
    let server = RconServer::start(
        config,
        move |line: &str| executor_state.execute(line),
        queue.scheduler(),
    )?;

    println!("RCON listening on {}", server.local_addr());
    println!("Send 'stop' over RCON to exit\n");

    while state.running.load(Ordering::Relaxed) {
        let tick_started = Instant::now();

        // The host's own work for this tick.
        state.ticks.fetch_add(1, Ordering::Relaxed);

        // Commands queued by the RCON server since the last tick.
        queue.run_pending();

        if let Some(rest) = TICK.checked_sub(tick_started.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    println!("Shutting down RCON server...");
    server.stop();
    println!("Host stopped after {} ticks", state.ticks.load(Ordering::Relaxed));

    Ok(())
}
