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

//! Hand-off of commands from the serving thread to the host thread

use crate::{RconError, Result};
use metrics::counter;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument};

/// Runs a command line on the host and returns its output
///
/// Called on the host thread, never on the serving thread. Any closure
/// `Fn(&str) -> String` is an executor.
pub trait CommandExecutor: Send + Sync + 'static {
    /// Execute one command line and return the text to send back
    fn execute(&self, command: &str) -> String;
}

impl<F> CommandExecutor for F
where
    F: Fn(&str) -> String + Send + Sync + 'static,
{
    fn execute(&self, command: &str) -> String {
        self(command)
    }
}

/// A unit of work to run on the host thread
pub type HostTask = Box<dyn FnOnce() + Send + 'static>;

/// Wakes the host and runs a task on its thread
///
/// Each scheduled task must be run exactly once. Dropping a task without
/// running it is reported to the waiting client as an error. Any closure
/// `Fn(HostTask)` is a scheduler.
pub trait HostScheduler: Send + Sync + 'static {
    /// Queue `task` to run on the host thread
    fn schedule(&self, task: HostTask);
}

impl<F> HostScheduler for F
where
    F: Fn(HostTask) + Send + Sync + 'static,
{
    fn schedule(&self, task: HostTask) {
        self(task);
    }
}

/// Single-slot rendezvous between the serving thread and the host
///
/// `submit` takes `&mut self`, so at most one command is outstanding for
/// the whole server.
pub(crate) struct CommandBridge {
    executor: Arc<dyn CommandExecutor>,
    scheduler: Arc<dyn HostScheduler>,
    shutdown: CancellationToken,
    strip_formatting: bool,
}

impl CommandBridge {
    pub(crate) fn new(
        executor: Arc<dyn CommandExecutor>,
        scheduler: Arc<dyn HostScheduler>,
        shutdown: CancellationToken,
        strip_formatting: bool,
    ) -> Self {
        Self {
            executor,
            scheduler,
            shutdown,
            strip_formatting,
        }
    }

    /// Run `command` on the host thread and wait for its output
    ///
    /// Returns [`RconError::ServerShuttingDown`] as soon as shutdown is
    /// requested, even if the host never answers.
    #[instrument(skip(self))]
    pub(crate) async fn submit(&mut self, command: String) -> Result<String> {
        let (tx, rx) = oneshot::channel::<String>();
        let executor = Arc::clone(&self.executor);
        let strip_formatting = self.strip_formatting;

        debug!("Scheduling command on host");
        self.scheduler.schedule(Box::new(move || {
            // The serving thread stopped waiting.
            if tx.is_closed() {
                return;
            }
            let response = execute_on_host(executor.as_ref(), &command, strip_formatting);
            let _ = tx.send(response);
        }));

        tokio::select! {
            biased;
            () = self.shutdown.cancelled() => Err(RconError::ServerShuttingDown),
            response = rx => {
                let response = response.map_err(|_| RconError::BridgeClosed)?;
                counter!("rconix.commands.executed").increment(1);
                debug!(len = response.len(), "Host answered command");
                Ok(response)
            }
        }
    }
}

fn execute_on_host(executor: &dyn CommandExecutor, command: &str, strip_formatting: bool) -> String {
    match catch_unwind(AssertUnwindSafe(|| executor.execute(command))) {
        Ok(response) if strip_formatting => clean_response(&response),
        Ok(response) => response,
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            error!(command = %command, reason = %reason, "Command executor panicked");
            format!("Error executing command: {reason}")
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

/// Remove text formatting from command output
///
/// Strips `§`-prefixed colour and style codes and ANSI CSI escape sequences
/// such as `ESC[1;31m`. Other text is passed through untouched.
///
/// # Example
///
/// ```
/// use rconix_service::clean_response;
///
/// assert_eq!(clean_response("§aOnline:§r 3"), "Online: 3");
/// assert_eq!(clean_response("\x1b[1;31mred\x1b[0m"), "red");
/// ```
pub fn clean_response(text: &str) -> String {
    let mut clean = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '§' => {
                chars.next();
            }
            '\u{1b}' => {
                if chars.peek() == Some(&'[') {
                    chars.next();
                    // Parameter and intermediate bytes run until a final byte.
                    for ch in chars.by_ref() {
                        if ('\u{40}'..='\u{7e}').contains(&ch) {
                            break;
                        }
                    }
                }
            }
            ch => clean.push(ch),
        }
    }

    clean
}
