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

//! Task queue for hosts that run their own main loop

use crate::{HostScheduler, HostTask};
use tokio::sync::mpsc;
use tracing::trace;

/// Queue of tasks waiting to run on the host thread
///
/// The host keeps the queue, hands [`HostQueue::scheduler`] to the server
/// and drains the queue from its own loop.
///
/// ```
/// use rconix_service::{HostQueue, HostScheduler};
///
/// let mut queue = HostQueue::new();
/// let scheduler = queue.scheduler();
/// scheduler.schedule(Box::new(|| println!("on the host thread")));
/// assert_eq!(queue.run_pending(), 1);
/// ```
#[derive(Debug)]
pub struct HostQueue {
    sender: mpsc::UnboundedSender<HostTask>,
    receiver: mpsc::UnboundedReceiver<HostTask>,
}

/// Cloneable handle that pushes tasks onto a [`HostQueue`]
#[derive(Debug, Clone)]
pub struct QueueScheduler {
    sender: mpsc::UnboundedSender<HostTask>,
}

impl HostQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self { sender, receiver }
    }

    /// Get a scheduler feeding this queue
    pub fn scheduler(&self) -> QueueScheduler {
        QueueScheduler {
            sender: self.sender.clone(),
        }
    }

    /// Run every task queued so far without waiting
    ///
    /// Returns the number of tasks run. Call once per host tick.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.receiver.try_recv() {
            task();
            ran += 1;
        }
        if ran > 0 {
            trace!(tasks = ran, "Ran host tasks");
        }
        ran
    }

    /// Block the calling thread until one task arrives, then run it
    ///
    /// The queue holds a sender of its own, so the wait has no end while
    /// nothing is scheduled. Use from a thread dedicated to host work. Must
    /// not be called from inside an async runtime.
    pub fn run_next(&mut self) {
        if let Some(task) = self.receiver.blocking_recv() {
            task();
        }
    }
}

impl Default for HostQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl HostScheduler for QueueScheduler {
    fn schedule(&self, task: HostTask) {
        // The receiver lives in the HostQueue; if the host dropped it the
        // task is dropped too and the waiting client sees an error.
        let _ = self.sender.send(task);
    }
}
