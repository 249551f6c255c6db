//! Progress Bus - per-task pub/sub with replay
//!
//! Each task gets a bounded ring buffer of recent events plus a tokio
//! broadcast channel for live delivery. Subscribers receive buffered events
//! since their resume point, then tail the live stream until the terminal
//! event. `seq` is assigned under the per-task lock, so it is strictly
//! increasing per task regardless of how many tasks publish concurrently.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::types::{ProgressEvent, ProgressEventKind};

/// Default ring capacity per task. The spec floor is 32; keep well above it
/// so a three-step workflow's full history survives for late joiners.
pub const DEFAULT_RING_CAPACITY: usize = 256;

/// Broadcast channel capacity per task
const BROADCAST_CAPACITY: usize = 256;

struct TaskChannel {
    next_seq: u64,
    ring: VecDeque<ProgressEvent>,
    /// Events evicted from the ring since the channel opened
    dropped: u64,
    tx: broadcast::Sender<ProgressEvent>,
    terminal: bool,
    last_percent: u8,
    last_event_at: Instant,
}

impl TaskChannel {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            next_seq: 1,
            ring: VecDeque::new(),
            dropped: 0,
            tx,
            terminal: false,
            last_percent: 0,
            last_event_at: Instant::now(),
        }
    }
}

/// Fan-out of per-task progress events to subscribers
pub struct ProgressBus {
    channels: DashMap<String, Mutex<TaskChannel>>,
    capacity: usize,
    heartbeat_interval: Duration,
}

impl ProgressBus {
    pub fn new(capacity: usize, heartbeat_interval: Duration) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(32),
            heartbeat_interval,
        }
    }

    /// Open a channel for a task (idempotent)
    pub fn open(&self, task_id: &str) {
        self.channels
            .entry(task_id.to_string())
            .or_insert_with(|| Mutex::new(TaskChannel::new()));
    }

    /// Publish an event, returning its `seq`
    ///
    /// Publishing after the terminal event is a contract violation and is
    /// dropped with a warning; the terminal event stays last.
    pub fn publish(
        &self,
        task_id: &str,
        kind: ProgressEventKind,
        step: Option<&str>,
        progress_percent: u8,
        payload: serde_json::Value,
    ) -> Option<u64> {
        self.open(task_id);
        let entry = self.channels.get(task_id)?;
        let mut channel = entry.lock().expect("progress channel poisoned");

        if channel.terminal {
            warn!(%task_id, kind = kind.as_str(), "Dropping event published after terminal");
            return None;
        }

        let seq = channel.next_seq;
        channel.next_seq += 1;

        let event = ProgressEvent {
            task_id: task_id.to_string(),
            seq,
            kind,
            step: step.map(|s| s.to_string()),
            progress_percent,
            payload,
            timestamp: Utc::now(),
        };

        channel.ring.push_back(event.clone());
        while channel.ring.len() > self.capacity {
            channel.ring.pop_front();
            channel.dropped += 1;
        }

        if kind.is_terminal() {
            channel.terminal = true;
        }
        channel.last_percent = progress_percent;
        channel.last_event_at = Instant::now();

        // No subscribers is fine
        let _ = channel.tx.send(event);
        debug!(%task_id, seq, kind = kind.as_str(), "Published progress event");
        Some(seq)
    }

    /// Subscribe to a task's events, resuming after `last_seq`
    ///
    /// Returns buffered events with `seq > last_seq` followed by the live
    /// stream. If the resume point has already been evicted from the ring, a
    /// `backpressure_drop` marker leads the backlog so the subscriber can
    /// detect the gap. Returns `None` for tasks the bus has never seen.
    pub fn subscribe(&self, task_id: &str, last_seq: Option<u64>) -> Option<Subscription> {
        let entry = self.channels.get(task_id)?;
        let channel = entry.lock().expect("progress channel poisoned");

        let resume_after = last_seq.unwrap_or(0);
        let mut backlog: VecDeque<ProgressEvent> = VecDeque::new();

        let oldest_buffered = channel.ring.front().map(|e| e.seq);
        if let Some(oldest) = oldest_buffered {
            // Dropped events the subscriber has not seen leave a gap marker
            if channel.dropped > 0 && resume_after + 1 < oldest {
                backlog.push_back(ProgressEvent {
                    task_id: task_id.to_string(),
                    seq: oldest - 1,
                    kind: ProgressEventKind::BackpressureDrop,
                    step: None,
                    progress_percent: channel.last_percent,
                    payload: serde_json::json!({ "dropped_before_seq": oldest }),
                    timestamp: Utc::now(),
                });
            }
        }

        backlog.extend(channel.ring.iter().filter(|e| e.seq > resume_after).cloned());

        let live = if channel.terminal {
            None
        } else {
            Some(channel.tx.subscribe())
        };

        Some(Subscription {
            backlog,
            live,
            last_seq: resume_after,
            done: false,
        })
    }

    /// True once the task has emitted its terminal event
    pub fn is_terminal(&self, task_id: &str) -> bool {
        self.channels
            .get(task_id)
            .map(|entry| entry.lock().expect("progress channel poisoned").terminal)
            .unwrap_or(false)
    }

    /// Drop a task's channel (after registry GC)
    pub fn close(&self, task_id: &str) {
        self.channels.remove(task_id);
    }

    /// Synthesize heartbeats for quiet, non-terminal tasks
    ///
    /// Returns how many heartbeats were published. Call this periodically;
    /// [`spawn_heartbeats`](Self::spawn_heartbeats) does so on a timer.
    pub fn heartbeat_pass(&self) -> usize {
        let mut due: Vec<(String, u8)> = Vec::new();
        for entry in self.channels.iter() {
            let channel = entry.value().lock().expect("progress channel poisoned");
            if !channel.terminal && channel.last_event_at.elapsed() >= self.heartbeat_interval {
                due.push((entry.key().clone(), channel.last_percent));
            }
        }

        let count = due.len();
        for (task_id, percent) in due {
            self.publish(
                &task_id,
                ProgressEventKind::Heartbeat,
                None,
                percent,
                serde_json::Value::Null,
            );
        }
        count
    }

    /// Spawn the heartbeat timer task for a shared bus
    pub fn spawn_heartbeats(bus: &std::sync::Arc<Self>) -> tokio::task::JoinHandle<()> {
        let bus = bus.clone();
        let tick = bus
            .heartbeat_interval
            .min(Duration::from_secs(5))
            .max(Duration::from_millis(100));
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(tick).await;
                bus.heartbeat_pass();
            }
        })
    }
}

/// A subscriber's view of one task's event stream
pub struct Subscription {
    backlog: VecDeque<ProgressEvent>,
    live: Option<broadcast::Receiver<ProgressEvent>>,
    last_seq: u64,
    done: bool,
}

impl Subscription {
    /// Next event, in order, ending after the terminal event
    ///
    /// Returns `None` once the stream is exhausted. Events already seen in
    /// the backlog are deduplicated by `seq`.
    pub async fn next(&mut self) -> Option<ProgressEvent> {
        if self.done {
            return None;
        }

        if let Some(event) = self.backlog.pop_front() {
            self.last_seq = self.last_seq.max(event.seq);
            if event.is_terminal() {
                self.done = true;
            }
            return Some(event);
        }

        let rx = match self.live.as_mut() {
            Some(rx) => rx,
            None => {
                self.done = true;
                return None;
            }
        };

        loop {
            match rx.recv().await {
                Ok(event) => {
                    if event.seq <= self.last_seq {
                        continue;
                    }
                    self.last_seq = event.seq;
                    if event.is_terminal() {
                        self.done = true;
                    }
                    return Some(event);
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(missed = n, "Subscriber lagged behind live stream");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    self.done = true;
                    return None;
                }
            }
        }
    }

    /// Drain everything currently buffered without waiting for live events
    pub fn drain_backlog(&mut self) -> Vec<ProgressEvent> {
        let events: Vec<ProgressEvent> = self.backlog.drain(..).collect();
        if let Some(last) = events.last() {
            self.last_seq = self.last_seq.max(last.seq);
            if last.is_terminal() {
                self.done = true;
            }
        }
        events
    }
}
