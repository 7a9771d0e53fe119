//! Per-actor bridge state, one lock per actor.

use super::BridgeState;
use crate::config::BridgeConfig;
use crate::forces::{lock, read, write};
use crate::state::ActorId;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex, RwLock};

/// Bridge state keyed by actor. An actor's state is created the first time
/// anything touches it.
#[derive(Default)]
pub struct BridgeRegistry {
    states: RwLock<FxHashMap<ActorId, Arc<Mutex<BridgeState>>>>,
}

impl BridgeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The actor's state, created if missing. Creation happens under the
    /// write lock, so two callers racing on a new actor share one state.
    pub fn entry(&self, actor: ActorId, config: &BridgeConfig) -> Arc<Mutex<BridgeState>> {
        if let Some(handle) = self.get(actor) {
            return handle;
        }
        write(&self.states)
            .entry(actor)
            .or_insert_with(|| {
                log::debug!("Bridge state created for actor {}", actor);
                Arc::new(Mutex::new(BridgeState::new(actor, config)))
            })
            .clone()
    }

    pub fn get(&self, actor: ActorId) -> Option<Arc<Mutex<BridgeState>>> {
        read(&self.states).get(&actor).cloned()
    }

    pub fn contains(&self, actor: ActorId) -> bool {
        read(&self.states).contains_key(&actor)
    }

    pub fn len(&self) -> usize {
        read(&self.states).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Actors in ascending order.
    pub fn actors(&self) -> Vec<ActorId> {
        let mut actors: Vec<_> = read(&self.states).keys().copied().collect();
        actors.sort_unstable();
        actors
    }

    pub fn snapshot(&self, actor: ActorId) -> Option<BridgeState> {
        let handle = self.get(actor)?;
        let state = lock(&handle).clone();
        Some(state)
    }

    /// Every actor's state, by ascending actor, for saving.
    pub fn snapshot_all(&self) -> Vec<BridgeState> {
        self.actors()
            .into_iter()
            .filter_map(|actor| self.snapshot(actor))
            .collect()
    }

    /// Replace the registry contents with saved states.
    pub fn restore(&self, states: Vec<BridgeState>) {
        let mut map = write(&self.states);
        map.clear();
        for state in states {
            map.insert(state.actor, Arc::new(Mutex::new(state)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Fixed;
    use std::thread;

    #[test]
    fn test_entry_is_created_once() {
        let registry = BridgeRegistry::new();
        let config = BridgeConfig::default();
        let a = registry.entry(4, &config);
        lock(&a).accumulated_debt = Fixed::from_int(10);
        let b = registry.entry(4, &config);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.snapshot(4).unwrap().accumulated_debt, Fixed::from_int(10));
        assert!(registry.snapshot(5).is_none());
    }

    #[test]
    fn test_concurrent_first_use_shares_state() {
        let registry = Arc::new(BridgeRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    let state = registry.entry(1, &BridgeConfig::default());
                    lock(&state).unpaid_months += 1;
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.snapshot(1).unwrap().unpaid_months, 8);
    }

    #[test]
    fn test_snapshot_and_restore() {
        let config = BridgeConfig::default();
        let registry = BridgeRegistry::new();
        registry.entry(9, &config);
        lock(&registry.entry(2, &config)).months_at_war = 3;
        let saved = registry.snapshot_all();
        assert_eq!(saved.iter().map(|s| s.actor).collect::<Vec<_>>(), vec![2, 9]);

        let json = serde_json::to_string(&saved).unwrap();
        let restored = BridgeRegistry::new();
        restored.restore(serde_json::from_str(&json).unwrap());
        assert_eq!(restored.actors(), vec![2, 9]);
        assert_eq!(restored.snapshot(2).unwrap().months_at_war, 3);
    }
}
