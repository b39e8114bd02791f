// SPDX-License-Identifier: MIT

//! The C4 change stream: every committed write emits a raw [`ChangeEvent`];
//! [`Coalescer`] multiplexes the raw stream into a rate-limited, deduplicated
//! batch stream (§4.4, §9 Design Note — "implement as a coalescing windowed
//! channel ... tests must assert the 2.0s / 1.0s timing with a controllable
//! clock"). The coalescing logic is a pure struct so it can be driven by a
//! `FakeClock` in tests; [`ChangeBus`] wraps it with a real tokio interval
//! for production use.

use std::collections::BTreeSet;
use wf_core::NodeId;

/// One raw or coalesced change notification (§4.3: "names either
/// `new_nodes(ids)` or `nodes_changed(ids)`").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Started,
    NewNodes(Vec<NodeId>),
    NodesChanged(Vec<NodeId>),
}

/// A coalesced emission: the distinct new/changed ids accumulated in one window.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChangeBatch {
    pub new_nodes: Vec<NodeId>,
    pub nodes_changed: Vec<NodeId>,
}

impl ChangeBatch {
    pub fn is_empty(&self) -> bool {
        self.new_nodes.is_empty() && self.nodes_changed.is_empty()
    }
}

/// Pure, clock-driven coalescing window (§4.4): at most one emission every
/// `window_ms`, forced within `max_wait_ms` of the first pending event.
pub struct Coalescer {
    window_ms: u64,
    max_wait_ms: u64,
    pending_new: BTreeSet<NodeId>,
    pending_changed: BTreeSet<NodeId>,
    first_pending_at: Option<u64>,
    last_emit_at: Option<u64>,
}

impl Coalescer {
    /// The spec's default window: at most one batch every 2.0s, forced
    /// within 1.0s of the first pending event.
    pub fn default_window() -> Self {
        Self::new(2_000, 1_000)
    }

    pub fn new(window_ms: u64, max_wait_ms: u64) -> Self {
        Self {
            window_ms,
            max_wait_ms,
            pending_new: BTreeSet::new(),
            pending_changed: BTreeSet::new(),
            first_pending_at: None,
            last_emit_at: None,
        }
    }

    /// Record a raw event arriving at `now_ms`. `started` carries no ids and
    /// is dropped — it exists only so callers can thread the raw stream's
    /// shape through without a separate case.
    pub fn record(&mut self, event: ChangeEvent, now_ms: u64) {
        match event {
            ChangeEvent::Started => {}
            ChangeEvent::NewNodes(ids) => {
                self.pending_new.extend(ids);
                self.first_pending_at.get_or_insert(now_ms);
            }
            ChangeEvent::NodesChanged(ids) => {
                self.pending_changed.extend(ids);
                self.first_pending_at.get_or_insert(now_ms);
            }
        }
    }

    fn has_pending(&self) -> bool {
        !self.pending_new.is_empty() || !self.pending_changed.is_empty()
    }

    /// The next instant, if any, at which a batch should be emitted: no
    /// sooner than `max_wait_ms` after the first pending event, but never
    /// sooner than `window_ms` after the previous emission either — the
    /// rate-limit floor dominates when the two are in tension.
    pub fn deadline_ms(&self) -> Option<u64> {
        let first_pending = self.first_pending_at?;
        let forced = first_pending + self.max_wait_ms;
        match self.last_emit_at {
            Some(last) => Some(forced.max(last + self.window_ms)),
            None => Some(forced),
        }
    }

    /// Emit a batch if `now_ms` has reached the deadline; otherwise `None`.
    pub fn poll(&mut self, now_ms: u64) -> Option<ChangeBatch> {
        if !self.has_pending() {
            return None;
        }
        let deadline = self.deadline_ms()?;
        if now_ms < deadline {
            return None;
        }
        let batch = ChangeBatch {
            new_nodes: std::mem::take(&mut self.pending_new).into_iter().collect(),
            nodes_changed: std::mem::take(&mut self.pending_changed).into_iter().collect(),
        };
        self.first_pending_at = None;
        self.last_emit_at = Some(now_ms);
        Some(batch)
    }
}

/// Production wiring: a raw event channel plus a coalescing task driven by
/// the real clock. Idle windows emit nothing (§4.4).
///
/// `coalesced_rx` is behind a `tokio::sync::Mutex` rather than taken by
/// value so `next_change` can run through a shared `Arc<ChangeBus>` — the
/// engine loop publishes through the same `Arc` the HTTP layer's relay task
/// drains (§6 `GET /changes`).
pub struct ChangeBus {
    raw_tx: tokio::sync::mpsc::UnboundedSender<ChangeEvent>,
    coalesced_rx: tokio::sync::Mutex<tokio::sync::mpsc::UnboundedReceiver<ChangeBatch>>,
}

impl ChangeBus {
    pub fn spawn(window_ms: u64, max_wait_ms: u64) -> (Self, tokio::task::JoinHandle<()>) {
        let (raw_tx, mut raw_rx) = tokio::sync::mpsc::unbounded_channel::<ChangeEvent>();
        let (coalesced_tx, coalesced_rx) = tokio::sync::mpsc::unbounded_channel::<ChangeBatch>();
        let handle = tokio::spawn(async move {
            let mut coalescer = Coalescer::new(window_ms, max_wait_ms);
            let start = tokio::time::Instant::now();
            loop {
                let sleep_until = coalescer
                    .deadline_ms()
                    .map(|d| start + tokio::time::Duration::from_millis(d));
                tokio::select! {
                    event = raw_rx.recv() => {
                        match event {
                            Some(event) => coalescer.record(event, start.elapsed().as_millis() as u64),
                            None => break,
                        }
                    }
                    _ = async {
                        match sleep_until {
                            Some(instant) => tokio::time::sleep_until(instant).await,
                            None => std::future::pending::<()>().await,
                        }
                    } => {}
                }
                if let Some(batch) = coalescer.poll(start.elapsed().as_millis() as u64) {
                    if !batch.is_empty() && coalesced_tx.send(batch).is_err() {
                        break;
                    }
                }
            }
        });
        (Self { raw_tx, coalesced_rx: tokio::sync::Mutex::new(coalesced_rx) }, handle)
    }

    /// A bus with no coalescing task behind it — `publish` is a no-op sink.
    /// For tests that only need a `&ChangeBus` to satisfy a store method's
    /// signature and don't inspect the change stream itself.
    #[cfg(any(test, feature = "test-support"))]
    pub fn inert() -> Self {
        let (raw_tx, _raw_rx) = tokio::sync::mpsc::unbounded_channel::<ChangeEvent>();
        let (_coalesced_tx, coalesced_rx) = tokio::sync::mpsc::unbounded_channel::<ChangeBatch>();
        Self { raw_tx, coalesced_rx: tokio::sync::Mutex::new(coalesced_rx) }
    }

    pub fn publish(&self, event: ChangeEvent) {
        // Receiver only drops when the coalescing task has ended; dropping a
        // publish at shutdown is fine, nothing downstream is listening.
        let _ = self.raw_tx.send(event);
    }

    /// Block for the next coalesced batch (§4.3: `next_change()`, blocking).
    /// Only one logical consumer should call this at a time — concurrent
    /// callers would each get a disjoint subset of batches, not a broadcast.
    pub async fn next_change(&self) -> Option<ChangeBatch> {
        self.coalesced_rx.lock().await.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> NodeId {
        NodeId::new()
    }

    #[test]
    fn idle_window_emits_nothing() {
        let mut c = Coalescer::default_window();
        assert_eq!(c.poll(10_000), None);
    }

    #[test]
    fn forces_emission_within_max_wait_of_first_event() {
        let mut c = Coalescer::default_window();
        let a = id();
        c.record(ChangeEvent::NodesChanged(vec![a]), 0);
        assert_eq!(c.poll(500), None);
        let batch = c.poll(1_000).expect("forced by max_wait_ms");
        assert_eq!(batch.nodes_changed, vec![a]);
    }

    #[test]
    fn rate_limits_to_one_batch_per_window() {
        let mut c = Coalescer::default_window();
        let a = id();
        c.record(ChangeEvent::NodesChanged(vec![a]), 0);
        c.poll(1_000).expect("first batch");
        let b = id();
        // A second event right after the first batch must wait a full
        // window, not just max_wait_ms, since the rate limit floor governs.
        c.record(ChangeEvent::NodesChanged(vec![b]), 1_100);
        assert_eq!(c.poll(1_600), None);
        let batch = c.poll(3_000).expect("second batch after the window");
        assert_eq!(batch.nodes_changed, vec![b]);
    }

    #[test]
    fn deduplicates_ids_within_a_window() {
        let mut c = Coalescer::default_window();
        let a = id();
        c.record(ChangeEvent::NodesChanged(vec![a]), 0);
        c.record(ChangeEvent::NodesChanged(vec![a]), 200);
        let batch = c.poll(1_000).unwrap();
        assert_eq!(batch.nodes_changed, vec![a]);
    }

    #[tokio::test]
    async fn spawned_bus_delivers_a_batch() {
        let (bus, _handle) = ChangeBus::spawn(50, 25);
        let a = id();
        bus.publish(ChangeEvent::NodesChanged(vec![a]));
        let batch = tokio::time::timeout(std::time::Duration::from_secs(2), bus.next_change())
            .await
            .expect("batch should arrive")
            .expect("channel open");
        assert_eq!(batch.nodes_changed, vec![a]);
    }
}
