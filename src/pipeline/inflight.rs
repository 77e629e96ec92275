use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

#[derive(Default)]
struct Slot {
    done: Mutex<bool>,
    cv: Condvar,
}

/// Per-path registry of artifact generations in progress.
///
/// The first caller for a path becomes its leader and generates; later callers block until the
/// leader's guard drops and then re-check the store.
#[derive(Default)]
pub struct InFlight {
    slots: Mutex<HashMap<PathBuf, Arc<Slot>>>,
}

/// Outcome of [`InFlight::claim`].
pub enum Claim<'a> {
    /// This caller generates; dropping the guard releases waiters.
    Leader(LeaderGuard<'a>),
    /// Another caller was generating and has finished (successfully or not).
    Waited,
}

/// Held by the generating caller for the duration of the generation.
pub struct LeaderGuard<'a> {
    registry: &'a InFlight,
    path: PathBuf,
    slot: Arc<Slot>,
}

impl InFlight {
    /// Become the leader for `path`, or wait for the current leader to finish.
    pub fn claim(&self, path: &Path) -> Claim<'_> {
        let slot = {
            let mut slots = self.slots.lock();
            if let Some(slot) = slots.get(path).cloned() {
                slot
            } else {
                let slot = Arc::new(Slot::default());
                slots.insert(path.to_path_buf(), Arc::clone(&slot));
                return Claim::Leader(LeaderGuard {
                    registry: self,
                    path: path.to_path_buf(),
                    slot,
                });
            }
        };

        let mut done = slot.done.lock();
        while !*done {
            slot.cv.wait(&mut done);
        }
        Claim::Waited
    }

    /// Number of paths currently being generated.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Whether nothing is being generated.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        self.registry.slots.lock().remove(&self.path);
        *self.slot.done.lock() = true;
        self.slot.cv.notify_all();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/inflight.rs"]
mod tests;
