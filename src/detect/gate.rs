use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Allows at most one inference in flight. A frame that finds the gate
/// closed is skipped, never queued.
#[derive(Clone, Debug, Default)]
pub struct InferenceGate {
    busy: Arc<AtomicBool>,
}

impl InferenceGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the gate. The permit reopens it when dropped.
    pub fn try_acquire(&self) -> Option<InferencePermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InferencePermit {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct InferencePermit {
    busy: Arc<AtomicBool>,
}

impl Drop for InferencePermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_permit_dropped() {
        let gate = InferenceGate::new();
        let shared = gate.clone();

        let permit = gate.try_acquire().expect("gate open");
        assert!(shared.is_busy());
        assert!(shared.try_acquire().is_none());

        drop(permit);
        assert!(!gate.is_busy());
        assert!(shared.try_acquire().is_some());
    }

    #[test]
    fn permit_released_when_thread_finishes() {
        let gate = InferenceGate::new();
        let worker_gate = gate.clone();
        std::thread::spawn(move || {
            let _permit = worker_gate.try_acquire().expect("gate open");
        })
        .join()
        .expect("worker thread");
        assert!(!gate.is_busy());
    }
}
