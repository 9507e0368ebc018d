//! Арена блокировок по ключу: один `tokio::sync::Mutex` на сеанс или на
//! пару (зал, дата). Запись в арене слабая, мьютекс живет, пока его держат
//! или ждут.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex as StdMutex, PoisonError, Weak};
use tokio::sync::{Mutex, OwnedMutexGuard};

pub struct KeyedLocks<K> {
    slots: StdMutex<HashMap<K, Weak<Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self { slots: StdMutex::new(HashMap::new()) }
    }
}

impl<K: Eq + Hash + Ord + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &K) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = slots.get(key).and_then(Weak::upgrade) {
            return existing;
        }
        slots.retain(|_, weak| weak.strong_count() > 0);
        let fresh = Arc::new(Mutex::new(()));
        slots.insert(key.clone(), Arc::downgrade(&fresh));
        fresh
    }

    pub async fn acquire(&self, key: K) -> OwnedMutexGuard<()> {
        self.slot(&key).lock_owned().await
    }

    /// Несколько ключей сразу, всегда в порядке возрастания (без взаимных блокировок).
    pub async fn acquire_many(&self, keys: impl IntoIterator<Item = K>) -> Vec<OwnedMutexGuard<()>> {
        let mut keys: Vec<K> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();
        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            guards.push(self.acquire(key).await);
        }
        guards
    }

    /// Число живых записей (для тестов).
    pub fn live_keys(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}
