use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;

/// Fixed-capacity gate in front of the OCR engine. Never queues callers.
#[derive(Debug, Clone)]
pub struct AdmissionController {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// One admitted request. The slot is returned when the permit is dropped.
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionController {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn try_acquire(&self) -> Option<AdmissionPermit> {
        let permit = self.semaphore.clone().try_acquire_owned().ok()?;
        Some(AdmissionPermit { _permit: permit })
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        debug!("releasing admission slot");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_once_capacity_is_exhausted() {
        let gate = AdmissionController::new(2);
        let first = gate.try_acquire().expect("first slot");
        let _second = gate.try_acquire().expect("second slot");
        assert_eq!(gate.available(), 0);
        assert!(gate.try_acquire().is_none());

        drop(first);
        assert_eq!(gate.available(), 1);
        assert!(gate.try_acquire().is_some());
        assert_eq!(gate.capacity(), 2);
    }

    #[test]
    fn zero_capacity_admits_nothing() {
        let gate = AdmissionController::new(0);
        assert!(gate.try_acquire().is_none());
    }

    #[test]
    fn clones_share_the_same_counter() {
        let gate = AdmissionController::new(1);
        let other = gate.clone();
        let _permit = gate.try_acquire().expect("slot");
        assert!(other.try_acquire().is_none());
    }

    #[test]
    fn slot_is_released_when_the_holder_panics() {
        let gate = AdmissionController::new(1);
        let permit = gate.try_acquire().expect("slot");
        let result = std::thread::spawn(move || {
            let _permit = permit;
            panic!("inference blew up");
        })
        .join();
        assert!(result.is_err());
        assert_eq!(gate.available(), 1);
    }

    #[test]
    fn concurrent_callers_never_exceed_capacity() {
        let gate = AdmissionController::new(4);
        let barrier = Arc::new(std::sync::Barrier::new(9));
        let handles = (0..9)
            .map(|_| {
                let gate = gate.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    let permit = gate.try_acquire();
                    barrier.wait();
                    permit.is_some()
                })
            })
            .collect::<Vec<_>>();
        let admitted = handles
            .into_iter()
            .map(|handle| handle.join().expect("thread"))
            .filter(|admitted| *admitted)
            .count();
        assert_eq!(admitted, 4);
        assert_eq!(gate.available(), 4);
    }
}
