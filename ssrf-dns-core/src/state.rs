use std::collections::HashSet;
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::Arc;

use parking_lot::Mutex;

/// Which address a rebind answer carries.
#[derive(Eq, PartialEq, Copy, Clone, Debug, Hash)]
pub enum RebindState {
    /// first lookup of a name
    New,
    /// the name has been answered before
    Returning,
}

impl RebindState {
    fn from_seen(seen: bool) -> Self {
        if seen {
            RebindState::Returning
        } else {
            RebindState::New
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RebindState::New => "NEW",
            RebindState::Returning => "RETURNING",
        }
    }
}

impl fmt::Display for RebindState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The pair of addresses handed out for rebind answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebindAddrs {
    /// returned on the first lookup of a name
    pub first: Ipv4Addr,
    /// returned on every later lookup
    pub subsequent: Ipv4Addr,
}

impl RebindAddrs {
    pub fn new(first: Ipv4Addr, subsequent: Ipv4Addr) -> Self {
        Self { first, subsequent }
    }

    pub fn for_state(&self, state: RebindState) -> Ipv4Addr {
        match state {
            RebindState::New => self.first,
            RebindState::Returning => self.subsequent,
        }
    }
}

/// Remembers which query names have already been answered.
///
/// Keys are the query names exactly as received, so `a.evil.test.` and
/// `A.evil.test.` are tracked separately. Entries are never removed.
#[derive(Clone, Default)]
pub struct RebindTracker {
    seen: Arc<Mutex<HashSet<String>>>,
}

impl RebindTracker {
    pub fn new() -> Self {
        Self {
            seen: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Marks `name` as seen and reports whether it was seen before.
    pub fn check_and_mark(&self, name: &str) -> bool {
        let mut seen = self.seen.lock();
        if seen.contains(name) {
            return true;
        }
        seen.insert(name.to_string());
        false
    }

    /// Like [`RebindTracker::check_and_mark`], mapped to the answer state.
    pub fn next_state(&self, name: &str) -> RebindState {
        RebindState::from_seen(self.check_and_mark(name))
    }

    /// Whether `name` has been answered before, without marking it.
    pub fn is_seen(&self, name: &str) -> bool {
        self.seen.lock().contains(name)
    }

    /// Number of distinct names seen so far
    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for RebindTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RebindTracker")
            .field("seen", &self.len())
            .finish()
    }
}
