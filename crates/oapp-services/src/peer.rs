//! Peer authorization: which remote contract is trusted on each endpoint id.
//!
//! Each eid is either UNSET (zero peer) or SET (non-zero peer):
//!
//! ```text
//! UNSET --set_peer(a≠0)--> SET      eid appended to the configured list
//! SET   --set_peer(a≠0)--> SET      peer replaced, list untouched
//! SET   --set_peer(0)-->   UNSET    eid swap-removed from the list
//! UNSET --set_peer(0)-->   UNSET    no-op
//! ```
//!
//! The configured list is dense with an eid → position index, so membership
//! and removal are O(1). Removal moves the last eid into the hole: callers
//! must not rely on positions after a removal.
//!
//! Multi-peer updates go through [`PeerTxn`]: mutations are staged and only
//! touch the table on [`PeerTxn::commit`]. Dropping the transaction discards
//! them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::path::PathBuf;

use crate::error::OAppError;

/// Fixed-width peer identifier. The all-zero value means "no peer".
pub trait PeerAddress: Copy + Eq + Hash + Debug + AsRef<[u8]> {
    const ZERO: Self;

    fn is_zero(&self) -> bool {
        self.as_ref().iter().all(|b| *b == 0)
    }

    /// Build from a slice of exactly the right width.
    fn from_slice(bytes: &[u8]) -> Option<Self>;
}

impl<const N: usize> PeerAddress for [u8; N] {
    const ZERO: Self = [0u8; N];

    fn from_slice(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok()
    }
}

/// What a `set_peer` call did to an eid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerTransition<A> {
    /// UNSET → SET.
    Added,
    /// SET → SET with a different peer.
    Updated { previous: A },
    /// SET → UNSET.
    Removed { previous: A },
    /// Same state, same peer.
    Unchanged,
}

/// Trusted peer per endpoint id.
///
/// When constructed with a persistence path the table is written to disk as
/// JSON after every mutation and reloaded on construction.
#[derive(Debug, Clone)]
pub struct PeerTable<A: PeerAddress> {
    /// Dense list of configured `(eid, peer)`, peer always non-zero.
    entries: Vec<(u32, A)>,
    /// eid → position in `entries`.
    index: HashMap<u32, usize>,
    persist_path: Option<PathBuf>,
}

impl<A: PeerAddress> Default for PeerTable<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: PeerAddress> PeerTable<A> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            persist_path: None,
        }
    }

    /// Create a table that persists to the given file path.
    /// Loads existing peers from disk if the file exists.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut table = Self {
            entries: Vec::new(),
            index: HashMap::new(),
            persist_path: Some(path),
        };
        table.load_from_disk();
        table
    }

    /// Seed peers from configuration. Config-sourced peers are not written
    /// back to the snapshot until the next runtime mutation.
    pub fn apply_config(&mut self, peers: impl IntoIterator<Item = (u32, A)>) {
        for (eid, peer) in peers {
            self.apply(eid, peer);
            tracing::info!(eid, peer = hex::encode(peer), "peer from config");
        }
    }

    /// Set or clear (zero) the trusted peer for `eid`.
    pub fn set_peer(&mut self, eid: u32, peer: A) -> PeerTransition<A> {
        let transition = self.apply(eid, peer);
        if transition != PeerTransition::Unchanged {
            self.save_to_disk();
        }
        log_transition(eid, &peer, &transition);
        transition
    }

    /// The trusted peer for `eid`, zero if none.
    pub fn peer(&self, eid: u32) -> A {
        self.index
            .get(&eid)
            .map(|&pos| self.entries[pos].1)
            .unwrap_or(A::ZERO)
    }

    /// The trusted peer for `eid`, or `NoPeer` if none is configured.
    pub fn get_peer_or_revert(&self, eid: u32) -> Result<A, OAppError> {
        self.index
            .get(&eid)
            .map(|&pos| self.entries[pos].1)
            .ok_or(OAppError::NoPeer(eid))
    }

    /// Exact comparison against the stored value (zero when unset).
    pub fn is_peer(&self, eid: u32, peer: &A) -> bool {
        self.peer(eid) == *peer
    }

    pub fn contains(&self, eid: u32) -> bool {
        self.index.contains_key(&eid)
    }

    /// Eids holding a non-zero peer. Order is not stable across removals.
    pub fn configured_eids(&self) -> Vec<u32> {
        self.entries.iter().map(|(eid, _)| *eid).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, A)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Start a batch of peer updates.
    pub fn begin(&mut self) -> PeerTxn<'_, A> {
        PeerTxn {
            table: self,
            staged: Vec::new(),
        }
    }

    fn apply(&mut self, eid: u32, peer: A) -> PeerTransition<A> {
        match (self.index.get(&eid).copied(), peer.is_zero()) {
            (None, true) => PeerTransition::Unchanged,
            (None, false) => {
                self.index.insert(eid, self.entries.len());
                self.entries.push((eid, peer));
                PeerTransition::Added
            }
            (Some(pos), false) => {
                let previous = std::mem::replace(&mut self.entries[pos].1, peer);
                if previous == peer {
                    PeerTransition::Unchanged
                } else {
                    PeerTransition::Updated { previous }
                }
            }
            (Some(pos), true) => {
                let (_, previous) = self.entries.swap_remove(pos);
                self.index.remove(&eid);
                if let Some(&(moved, _)) = self.entries.get(pos) {
                    self.index.insert(moved, pos);
                }
                PeerTransition::Removed { previous }
            }
        }
    }
}

fn log_transition<A: PeerAddress>(eid: u32, peer: &A, transition: &PeerTransition<A>) {
    match transition {
        PeerTransition::Added => tracing::info!(eid, peer = hex::encode(peer), "peer set"),
        PeerTransition::Updated { previous } => tracing::info!(
            eid,
            peer = hex::encode(peer),
            previous = hex::encode(previous),
            "peer updated"
        ),
        PeerTransition::Removed { previous } => {
            tracing::info!(eid, previous = hex::encode(previous), "peer removed")
        }
        PeerTransition::Unchanged => tracing::debug!(eid, "peer unchanged"),
    }
}

// ── Transactions ──────────────────────────────────────────────────────────────

/// Staged peer updates. Nothing reaches the table until [`commit`].
///
/// [`commit`]: PeerTxn::commit
pub struct PeerTxn<'a, A: PeerAddress> {
    table: &'a mut PeerTable<A>,
    staged: Vec<(u32, A)>,
}

impl<A: PeerAddress> PeerTxn<'_, A> {
    pub fn set_peer(&mut self, eid: u32, peer: A) -> &mut Self {
        self.staged.push((eid, peer));
        self
    }

    /// The peer `eid` will have after commit.
    pub fn peer(&self, eid: u32) -> A {
        self.staged
            .iter()
            .rev()
            .find(|(staged, _)| *staged == eid)
            .map(|(_, peer)| *peer)
            .unwrap_or_else(|| self.table.peer(eid))
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Apply every staged update in order, then persist once.
    pub fn commit(self) -> Vec<(u32, PeerTransition<A>)> {
        let mut transitions = Vec::with_capacity(self.staged.len());
        for (eid, peer) in self.staged {
            let transition = self.table.apply(eid, peer);
            log_transition(eid, &peer, &transition);
            transitions.push((eid, transition));
        }
        if transitions
            .iter()
            .any(|(_, t)| *t != PeerTransition::Unchanged)
        {
            self.table.save_to_disk();
        }
        transitions
    }
}

// ── Persistence ───────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct PeerRecord {
    eid: u32,
    peer: String,
}

impl<A: PeerAddress> PeerTable<A> {
    /// Serialize the table to disk as JSON. Best-effort: logs on failure.
    fn save_to_disk(&self) {
        let path = match self.persist_path.as_ref() {
            Some(p) => p,
            None => return,
        };
        let snapshot: Vec<PeerRecord> = self
            .entries
            .iter()
            .map(|(eid, peer)| PeerRecord {
                eid: *eid,
                peer: hex::encode(peer),
            })
            .collect();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if let Err(e) = std::fs::create_dir_all(dir) {
                tracing::warn!(error = %e, dir = %dir.display(), "failed to create peers directory");
                return;
            }
        }
        match serde_json::to_string_pretty(&snapshot) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    tracing::warn!(error = %e, path = %path.display(), "failed to persist peers");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize peers");
            }
        }
    }

    /// Load peers from disk. Called once during construction.
    fn load_from_disk(&mut self) {
        let path = match self.persist_path.as_ref() {
            Some(p) => p.clone(),
            None => return,
        };
        let text = match std::fs::read_to_string(&path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "failed to read peers");
                return;
            }
        };
        let records: Vec<PeerRecord> = match serde_json::from_str(&text) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "failed to parse peers");
                return;
            }
        };
        let mut loaded = 0usize;
        for record in &records {
            let peer = hex::decode(&record.peer)
                .ok()
                .and_then(|bytes| A::from_slice(&bytes));
            match peer {
                Some(peer) => {
                    self.apply(record.eid, peer);
                    loaded += 1;
                }
                None => {
                    tracing::warn!(eid = record.eid, peer = %record.peer, "skipping malformed peer")
                }
            }
        }
        if loaded > 0 {
            tracing::info!(count = loaded, path = %path.display(), "loaded persisted peers");
        }
    }
}
