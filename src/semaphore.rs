//! A small counting semaphore used to bound the generator's concurrent digest workers:
//! acquire a permit before spawning a hashing task, release it on completion.
//!
//! `std` has no counting semaphore, so this is the conventional hand-rolled
//! `Mutex` + `Condvar` implementation rather than a crate dependency — it is a dozen
//! lines and pulling in a crate for it would be the opposite of idiomatic here.

use std::sync::{Condvar, Mutex};

pub struct Semaphore {
    state: Mutex<usize>,
    cond: Condvar,
    capacity: usize,
}

impl Semaphore {
    pub fn new(capacity: usize) -> Self {
        Semaphore {
            state: Mutex::new(capacity),
            cond: Condvar::new(),
            capacity,
        }
    }

    /// Blocks until a permit is available, then takes it.
    pub fn acquire(&self) {
        let mut available = self.state.lock().unwrap();
        while *available == 0 {
            available = self.cond.wait(available).unwrap();
        }
        *available -= 1;
    }

    /// Returns a permit, waking one waiter if any.
    pub fn release(&self) {
        let mut available = self.state.lock().unwrap();
        *available += 1;
        self.cond.notify_one();
    }

    /// Blocks until every permit has been returned (all in-flight work has drained).
    pub fn drain(&self) {
        let mut available = self.state.lock().unwrap();
        while *available < self.capacity {
            available = self.cond.wait(available).unwrap();
        }
    }
}
