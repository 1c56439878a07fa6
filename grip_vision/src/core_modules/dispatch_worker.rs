// THEORY:
// The playback call is a blocking network request. Left on the capture thread, a
// slow response would freeze the camera feed and the status display. The
// `DispatchWorker` moves it off that thread: the control loop hands over a
// `TriggerEvent` snapshot through a channel and goes straight back to the next frame.
//
// Key architectural principles:
// 1.  **Snapshots, not shared state**: the worker never sees `DebounceState`. It only
//     receives `Copy` trigger events, so no locking is needed around the core.
// 2.  **Bounded calls**: each request runs on tokio's blocking pool under a timeout,
//     so a stalled network call can neither delay the loop nor its shutdown. A
//     blocking call cannot be cancelled, so every event also carries a deadline set
//     when it is dequeued. An event still waiting for the target once its deadline
//     has passed is dropped instead of played, matching the `TimedOut` already
//     reported for it.
// 3.  **Reports flow back**: the outcome of every request is sent back over a second
//     channel, which the loop drains without blocking.

use crate::core_modules::debounce::TriggerEvent;
use crate::core_modules::dispatcher::{ActionDispatcher, DispatchOutcome, PlaybackError, PlaybackTarget};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum DispatchWorkerError {
    #[error("dispatch worker has stopped")]
    Stopped,
}

/// The result of one offloaded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub event: TriggerEvent,
    pub outcome: DispatchOutcome,
}

pub struct DispatchWorker {
    event_sender: mpsc::UnboundedSender<TriggerEvent>,
    report_receiver: mpsc::UnboundedReceiver<DispatchReport>,
    worker: JoinHandle<()>,
}

impl DispatchWorker {
    /// Spawns the worker task. Must be called from within a tokio runtime.
    pub fn spawn<P>(target: P, dispatcher: ActionDispatcher, call_timeout: Duration) -> Self
    where
        P: PlaybackTarget + Send + 'static,
    {
        let (event_sender, mut event_receiver) = mpsc::unbounded_channel::<TriggerEvent>();
        let (report_sender, report_receiver) = mpsc::unbounded_channel::<DispatchReport>();
        let target = Arc::new(Mutex::new(target));

        let worker = tokio::spawn(async move {
            while let Some(event) = event_receiver.recv().await {
                let deadline = Instant::now() + call_timeout;
                let call_target = Arc::clone(&target);
                let call_dispatcher = dispatcher.clone();
                let call = tokio::task::spawn_blocking(move || {
                    let mut guard = call_target.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                    if Instant::now() >= deadline {
                        debug!(activation = event.activation, "stale trigger dropped after waiting for the target");
                        return DispatchOutcome::Failed(PlaybackError::TimedOut(call_timeout));
                    }
                    call_dispatcher.dispatch(&mut *guard, &event)
                });

                let outcome = match tokio::time::timeout(call_timeout, call).await {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(join_error)) => {
                        warn!(activation = event.activation, error = %join_error, "playback task aborted");
                        DispatchOutcome::Failed(PlaybackError::Transport(join_error.to_string()))
                    }
                    Err(_) => {
                        warn!(activation = event.activation, timeout = ?call_timeout, "playback call timed out");
                        DispatchOutcome::Failed(PlaybackError::TimedOut(call_timeout))
                    }
                };

                if report_sender.send(DispatchReport { event, outcome }).is_err() {
                    debug!("report receiver dropped, worker continues silently");
                }
            }
        });

        Self {
            event_sender,
            report_receiver,
            worker,
        }
    }

    /// Queues a trigger event without waiting for the call.
    pub fn submit(&self, event: TriggerEvent) -> Result<(), DispatchWorkerError> {
        self.event_sender.send(event).map_err(|_| DispatchWorkerError::Stopped)
    }

    /// Non-blocking check for a finished request.
    pub fn try_next_report(&mut self) -> Option<DispatchReport> {
        self.report_receiver.try_recv().ok()
    }

    pub async fn next_report(&mut self) -> Option<DispatchReport> {
        self.report_receiver.recv().await
    }

    /// Stops accepting events and waits for queued ones to finish.
    pub async fn shutdown(self) {
        let Self { event_sender, worker, .. } = self;
        drop(event_sender);
        if let Err(e) = worker.await {
            warn!(error = %e, "dispatch worker ended abnormally");
        }
    }
}
