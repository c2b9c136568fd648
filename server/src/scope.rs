//! Per-instance observer bookkeeping.
//!
//! Each replicated instance is either observed by all connected players or
//! by an explicit set, never both; setting one clears the other. For
//! explicit observers the last wire value pushed per key is retained, so a
//! redundant `SetValue` costs no traffic.

use std::collections::{HashMap, HashSet};

use mimic_shared::{InstanceAddr, PlayerId, WireValue};

#[derive(Debug, Default)]
pub(crate) struct ScopeEntry {
    pub all: bool,
    pub players: HashSet<PlayerId>,
    last_sent: HashMap<PlayerId, HashMap<String, WireValue>>,
}

impl ScopeEntry {
    pub fn observes(&self, player: PlayerId) -> bool {
        self.all || self.players.contains(&player)
    }

    /// Flips to observed-by-all, dropping the explicit set and its diff
    /// state.
    pub fn set_all(&mut self) {
        self.all = true;
        self.players.clear();
        self.last_sent.clear();
    }

    pub fn is_vacant(&self) -> bool {
        !self.all && self.players.is_empty()
    }

    /// True when the value differs from the last one pushed to this player.
    pub fn needs_value(&self, player: PlayerId, key: &str, value: &WireValue) -> bool {
        self.last_sent
            .get(&player)
            .and_then(|values| values.get(key))
            .map(|last| last != value)
            .unwrap_or(true)
    }

    pub fn note_sent(&mut self, player: PlayerId, key: &str, value: WireValue) {
        self.last_sent
            .entry(player)
            .or_default()
            .insert(key.to_owned(), value);
    }

    pub fn note_snapshot(&mut self, player: PlayerId, values: &[(String, WireValue)]) {
        let sent = self.last_sent.entry(player).or_default();
        for (key, value) in values {
            sent.insert(key.clone(), value.clone());
        }
    }

    pub fn forget_player(&mut self, player: PlayerId) -> bool {
        self.last_sent.remove(&player);
        self.players.remove(&player)
    }

    /// Explicit observers in a stable order.
    pub fn players_sorted(&self) -> Vec<PlayerId> {
        let mut players: Vec<PlayerId> = self.players.iter().copied().collect();
        players.sort_unstable();
        players
    }
}

#[derive(Debug, Default)]
pub(crate) struct ScopeMap {
    entries: HashMap<InstanceAddr, ScopeEntry>,
}

impl ScopeMap {
    pub fn get(&self, addr: InstanceAddr) -> Option<&ScopeEntry> {
        self.entries.get(&addr)
    }

    pub fn get_mut(&mut self, addr: InstanceAddr) -> Option<&mut ScopeEntry> {
        self.entries.get_mut(&addr)
    }

    pub fn entry(&mut self, addr: InstanceAddr) -> &mut ScopeEntry {
        self.entries.entry(addr).or_default()
    }

    pub fn remove(&mut self, addr: InstanceAddr) -> Option<ScopeEntry> {
        self.entries.remove(&addr)
    }

    /// Drops the entry again if nothing observes it anymore.
    pub fn prune(&mut self, addr: InstanceAddr) {
        if self.entries.get(&addr).map(ScopeEntry::is_vacant).unwrap_or(false) {
            self.entries.remove(&addr);
        }
    }

    /// All scoped instances in a stable order.
    pub fn addrs_sorted(&self) -> Vec<InstanceAddr> {
        let mut addrs: Vec<InstanceAddr> = self.entries.keys().copied().collect();
        addrs.sort_unstable();
        addrs
    }
}
