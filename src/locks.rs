//! Per-entity advisory locks.
//!
//! Workers handling updates for the same chat or the same user must not
//! interleave their persistence, so each entity gets one lazily created
//! mutex. The maps only ever grow; entries are reclaimed at process exit.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::shutdown::StopToken;

type LockMap = Mutex<HashMap<i64, Arc<Mutex<()>>>>;

pub struct EntityLocks {
    chats: LockMap,
    users: LockMap,
    stop: StopToken,
}

impl EntityLocks {
    pub fn new(stop: StopToken) -> Self {
        Self {
            chats: Mutex::new(HashMap::new()),
            users: Mutex::new(HashMap::new()),
            stop,
        }
    }

    /// Advisory lock for one chat. `None` once the daemon is stopping.
    pub fn chat_lock(&self, chat_id: i64) -> Option<Arc<Mutex<()>>> {
        Self::lookup(&self.chats, &self.stop, chat_id)
    }

    /// Advisory lock for one user. `None` once the daemon is stopping.
    pub fn user_lock(&self, user_id: i64) -> Option<Arc<Mutex<()>>> {
        Self::lookup(&self.users, &self.stop, user_id)
    }

    fn lookup(map: &LockMap, stop: &StopToken, id: i64) -> Option<Arc<Mutex<()>>> {
        if stop.should_stop() {
            return None;
        }
        let mut map = map.lock().unwrap();
        Some(Arc::clone(
            map.entry(id).or_insert_with(|| Arc::new(Mutex::new(()))),
        ))
    }

    /// Number of chat locks created so far.
    pub fn chat_lock_count(&self) -> usize {
        self.chats.lock().unwrap().len()
    }

    /// Number of user locks created so far.
    pub fn user_lock_count(&self) -> usize {
        self.users.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_entity_gets_same_lock() {
        let locks = EntityLocks::new(StopToken::new());
        let a = locks.chat_lock(42).unwrap();
        let b = locks.chat_lock(42).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(locks.chat_lock_count(), 1);
    }

    #[test]
    fn chats_and_users_are_separate_namespaces() {
        let locks = EntityLocks::new(StopToken::new());
        let chat = locks.chat_lock(7).unwrap();
        let user = locks.user_lock(7).unwrap();
        assert!(!Arc::ptr_eq(&chat, &user));
        assert_eq!(locks.chat_lock_count(), 1);
        assert_eq!(locks.user_lock_count(), 1);
    }

    #[test]
    fn stopping_refuses_new_locks() {
        let stop = StopToken::new();
        let locks = EntityLocks::new(stop.clone());
        assert!(locks.chat_lock(1).is_some());
        stop.stop();
        assert!(locks.chat_lock(1).is_none());
        assert!(locks.user_lock(1).is_none());
    }
}
