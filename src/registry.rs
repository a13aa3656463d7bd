//! An explicit, owned collection of live sessions. The dispatcher is the
//! only writer: it inserts on session creation and the registry itself
//! removes on termination during `tick_all`.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Instant;

use crate::connection::Connection;
use crate::error::Error;
use crate::session::Session;

/// The dispatcher decides what identifies a peer-pair (a socket address, a
/// 4-tuple, ...); the registry only requires it be hashable, comparable,
/// and printable for logging.
pub struct SessionRegistry<Id: Clone + Eq + Hash + std::fmt::Debug, C: Connection> {
    sessions: HashMap<Id, Session<C>>,
}

impl<Id: Clone + Eq + Hash + std::fmt::Debug, C: Connection> Default for SessionRegistry<Id, C> {
    fn default() -> Self {
        SessionRegistry {
            sessions: HashMap::new(),
        }
    }
}

impl<Id: Clone + Eq + Hash + std::fmt::Debug, C: Connection> SessionRegistry<Id, C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: Id, session: Session<C>) -> Result<(), Error> {
        if self.sessions.contains_key(&id) {
            return Err(Error::DuplicateSession(format!("{id:?}")));
        }
        self.sessions.insert(id, session);
        Ok(())
    }

    pub fn get_mut(&mut self, id: &Id) -> Option<&mut Session<C>> {
        self.sessions.get_mut(id)
    }

    pub fn remove(&mut self, id: &Id) -> Option<Session<C>> {
        self.sessions.remove(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// One tick across every live session: retransmit expired packets,
    /// retry delivery, check termination, and drop anything that finished
    /// this round.
    pub fn tick_all(&mut self, now: Instant) {
        self.sessions.retain(|id, session| {
            let done = session.on_tick(now);
            if done {
                log::info!("session {id:?} destroyed");
            }
            !done
        });
    }
}
