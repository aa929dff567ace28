//! Recurring "still thinking" notifications.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::sink::OutputSink;

/// How often the indicator reposts while reasoning continues.
pub const THINKING_INTERVAL: Duration = Duration::from_secs(15);

/// Per-turn timer that posts a periodic action while the model is reasoning.
///
/// Started on the first reasoning event of a turn, stopped when content or a
/// terminal event arrives. Dropping an active indicator stops it.
#[derive(Debug, Default)]
pub struct ThinkingIndicator {
    task: Option<JoinHandle<()>>,
}

impl ThinkingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin posting. No-op if already running.
    pub fn start(&mut self, sink: OutputSink, interval: Duration) {
        if self.task.is_some() {
            return;
        }
        tracing::debug!("thinking_indicator_started");
        let started = Instant::now();
        self.task = Some(tokio::spawn(async move {
            let mut ticker = time::interval_at(started + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let elapsed = started.elapsed().as_secs();
                if !sink.action(format!("thinking... ({elapsed}s elapsed)")).await {
                    return;
                }
            }
        }));
    }

    /// Stop posting. No-op if not running.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("thinking_indicator_stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for ThinkingIndicator {
    fn drop(&mut self) {
        self.stop();
    }
}
