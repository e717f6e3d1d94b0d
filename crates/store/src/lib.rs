//! Fleetscope store: coalescing delta ingest into immutable [`Inventory`] snapshots.

#![forbid(unsafe_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use fleetscope_core::{Delta, DeltaKind, FleetResource};
use rustc_hash::FxHashMap;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

pub mod inventory;
pub mod load;

pub use inventory::{decode_lenient, Inventory};
pub use load::{load_path, load_str, LoadError};

/// Ingest queue capacity unless `FLEETSCOPE_QUEUE_CAP` says otherwise.
pub const DEFAULT_QUEUE_CAP: usize = 2048;

pub fn queue_cap_from_env() -> usize {
    std::env::var("FLEETSCOPE_QUEUE_CAP").ok().and_then(|s| s.parse().ok()).filter(|c| *c > 0).unwrap_or(DEFAULT_QUEUE_CAP)
}

/// Coalescing queue keyed by store key with FIFO order and fixed capacity.
///
/// A newer delta for a queued key replaces the older one in place. When full,
/// the oldest key is dropped.
pub struct Coalescer {
    map: FxHashMap<String, Delta>,
    order: VecDeque<String>,
    cap: usize,
    dropped: u64,
}

impl Coalescer {
    pub fn with_capacity(cap: usize) -> Self {
        Self { map: FxHashMap::default(), order: VecDeque::new(), cap: cap.max(1), dropped: 0 }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn push(&mut self, d: Delta) {
        if !self.map.contains_key(&d.key) {
            if self.order.len() >= self.cap {
                if let Some(old) = self.order.pop_front() {
                    self.map.remove(&old);
                    self.dropped += 1;
                    metrics::counter!("ingest_dropped_total", 1u64);
                    warn!(key = %old, "ingest queue full; dropped oldest delta");
                }
            }
            self.order.push_back(d.key.clone());
        }
        self.map.insert(d.key.clone(), d);
    }

    /// Drain all coalesced deltas in arrival order of their keys.
    pub fn drain_ready(&mut self) -> Vec<Delta> {
        let mut out = Vec::with_capacity(self.order.len());
        while let Some(key) = self.order.pop_front() {
            if let Some(d) = self.map.remove(&key) {
                out.push(d);
            }
        }
        out
    }
}

/// Accumulates decoded objects and freezes them into [`Inventory`] snapshots.
#[derive(Default)]
pub struct InventoryBuilder {
    epoch: u64,
    index: FxHashMap<String, usize>,
    items: Vec<(String, FleetResource)>,
}

impl InventoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Apply a batch and bump the epoch. Updates keep their position.
    pub fn apply(&mut self, batch: Vec<Delta>) {
        let mut removed = false;
        for d in batch {
            match d.kind {
                DeltaKind::Applied => {
                    let Some(res) = decode_lenient(d.raw) else { continue };
                    match self.index.get(&d.key) {
                        Some(&idx) => self.items[idx].1 = res,
                        None => {
                            self.index.insert(d.key.clone(), self.items.len());
                            self.items.push((d.key, res));
                        }
                    }
                }
                DeltaKind::Deleted => {
                    if self.index.remove(&d.key).is_some() {
                        self.items.retain(|(k, _)| k != &d.key);
                        removed = true;
                    }
                }
            }
        }
        if removed {
            self.index = self.items.iter().enumerate().map(|(i, (k, _))| (k.clone(), i)).collect();
        }
        self.epoch = self.epoch.saturating_add(1);
    }

    pub fn freeze(&self) -> Arc<Inventory> {
        let mut inv = Inventory::from_resources(self.items.iter().map(|(_, r)| r.clone()));
        inv.epoch = self.epoch;
        inv.record_gauges();
        Arc::new(inv)
    }
}

/// Handle for readers to access the current snapshot and subscribe to swaps.
#[derive(Clone)]
pub struct InventoryHandle {
    snap: Arc<ArcSwap<Inventory>>,
    epoch_rx: watch::Receiver<u64>,
}

impl InventoryHandle {
    pub fn current(&self) -> Arc<Inventory> {
        self.snap.load_full()
    }

    pub fn subscribe_epoch(&self) -> watch::Receiver<u64> {
        self.epoch_rx.clone()
    }

    /// Wait until a snapshot with `epoch >= min` is published, or `timeout` elapses.
    pub async fn wait_for_epoch(&self, min: u64, timeout: Duration) -> Arc<Inventory> {
        let mut rx = self.subscribe_epoch();
        let _ = tokio::time::timeout(timeout, rx.wait_for(|e| *e >= min)).await;
        self.current()
    }

    /// Wait for the ingest loop to drain and stop after its senders are dropped,
    /// then return the final snapshot.
    pub async fn wait_closed(&self) -> Arc<Inventory> {
        let mut rx = self.subscribe_epoch();
        while rx.changed().await.is_ok() {}
        self.current()
    }
}

/// Spawn an ingest loop consuming deltas and swapping snapshots.
/// Returns a sender for deltas and a handle for reads.
pub fn spawn_ingest(cap: usize) -> (mpsc::Sender<Delta>, InventoryHandle) {
    let (tx, mut rx) = mpsc::channel::<Delta>(cap.max(1));
    let snap = Arc::new(ArcSwap::from_pointee(Inventory::default()));
    let (epoch_tx, epoch_rx) = watch::channel(0u64);
    let snap_clone = Arc::clone(&snap);

    tokio::spawn(async move {
        let mut coalescer = Coalescer::with_capacity(cap);
        let mut builder = InventoryBuilder::new();
        let mut ticker = tokio::time::interval(Duration::from_millis(8));
        let publish = |batch: Vec<Delta>, builder: &mut InventoryBuilder| {
            if batch.is_empty() {
                return;
            }
            let n = batch.len();
            builder.apply(batch);
            let next = builder.freeze();
            let epoch = next.epoch;
            snap_clone.store(next);
            let _ = epoch_tx.send(epoch);
            debug!(epoch, deltas = n, "published inventory");
        };
        loop {
            tokio::select! {
                maybe = rx.recv() => {
                    match maybe {
                        Some(d) => coalescer.push(d),
                        None => {
                            debug!("delta channel closed; draining and exiting ingest loop");
                            publish(coalescer.drain_ready(), &mut builder);
                            break;
                        }
                    }
                }
                _ = ticker.tick() => publish(coalescer.drain_ready(), &mut builder),
            }
        }
        info!(dropped = coalescer.dropped(), "ingest loop stopped");
    });

    (tx, InventoryHandle { snap, epoch_rx })
}
