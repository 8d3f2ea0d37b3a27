use std::{
    ops::{Deref, DerefMut},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Admission gate that lets at most one frame at a time work on the guarded value. Admission is a single atomic
/// check-and-set: a frame that finds the gate taken is dropped instead of queued
pub struct CaptureGate<T> {
    slot: Arc<Mutex<T>>,
    dropped: AtomicUsize,
}

/// Exclusive access to the guarded value for the duration of one frame. The gate opens again when the admission
/// is dropped. Admissions are `Send`, so they can be moved into the task that processes the frame
pub struct Admission<T> {
    guard: OwnedMutexGuard<T>,
}

impl<T> CaptureGate<T> {
    pub fn new(value: T) -> Self {
        Self {
            slot: Arc::new(Mutex::new(value)),
            dropped: AtomicUsize::default(),
        }
    }

    /// Admits the caller if no other frame is in flight, otherwise counts the frame as dropped
    pub fn try_admit(&self) -> Option<Admission<T>> {
        match self.slot.clone().try_lock_owned() {
            Ok(guard) => Some(Admission { guard }),
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::SeqCst);
                None
            }
        }
    }

    /// Number of frames that were turned away because another frame was in flight
    pub fn dropped_frames(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    /// Returns the guarded value, or `None` if an admission is still alive
    pub fn into_inner(self) -> Option<T> {
        Arc::try_unwrap(self.slot).ok().map(Mutex::into_inner)
    }
}

impl<T> Deref for Admission<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<T> DerefMut for Admission<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    #[test]
    fn test_second_frame_is_dropped_while_first_is_in_flight() {
        let gate = CaptureGate::new(Vec::<u32>::new());

        let mut first = gate.try_admit().expect("Gate must be open initially");
        first.push(1);
        assert!(gate.try_admit().is_none());
        assert_eq!(gate.dropped_frames(), 1);
        drop(first);

        let mut third = gate.try_admit().expect("Gate must open again after the first frame");
        third.push(3);
        drop(third);

        assert_eq!(gate.into_inner().unwrap(), vec![1, 3]);
    }

    #[test]
    fn test_into_inner_fails_with_live_admission() {
        let gate = CaptureGate::new(7u8);
        let admission = gate.try_admit().unwrap();
        assert!(gate.into_inner().is_none());
        assert_eq!(*admission, 7);
    }

    #[test]
    fn test_concurrent_admission_admits_exactly_one() {
        const THREADS: usize = 8;
        let gate = Arc::new(CaptureGate::new(()));
        let barrier = Arc::new(Barrier::new(THREADS));
        // Each admitted thread holds its admission until every thread has tried
        let done = Arc::new(Barrier::new(THREADS));

        let handles = (0..THREADS)
            .map(|_| {
                let gate = gate.clone();
                let barrier = barrier.clone();
                let done = done.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    let admission = gate.try_admit();
                    let admitted = admission.is_some();
                    done.wait();
                    drop(admission);
                    admitted
                })
            })
            .collect::<Vec<_>>();

        let admitted = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|admitted| *admitted)
            .count();
        assert_eq!(admitted, 1);
        assert_eq!(gate.dropped_frames(), THREADS - 1);
    }
}
