//! Frame bridge between the engine's decode thread and the render thread
//!
//! The decode thread drives the bridge through [`FrameCallbacks`]; the render
//! thread reads the displayable frame with [`FrameBridge::with_front`].
//!
//! In [`BufferMode::Single`] both sides share one buffer, so a render can see
//! a frame that is only partly replaced by the next one (each access is still
//! serialized by the slot lock). In [`BufferMode::Double`] the displayed slot
//! is never handed to the writer, and `present` publishes exactly the frame it
//! names. A spare slot lets the engine release one frame ahead of its present.
//! When the writer runs further ahead, the oldest unpresented frame is dropped
//! and its later `present` does nothing.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, MutexGuard};

use super::frame::FrameBuffer;
use super::types::{BufferMode, Resolution};
use crate::engine::{FrameCallbacks, FrameId, FrameLock};

/// Which slot is shown and which frames wait for `present`
#[derive(Debug)]
struct Schedule {
    front: usize,
    /// Released frames not yet presented, oldest first
    pending: VecDeque<FrameId>,
    next_sequence: u64,
}

impl Schedule {
    /// A slot that is neither displayed nor holding a pending frame. Falls back
    /// to dropping the oldest pending frame.
    fn claim_slot(&mut self, slot_count: usize) -> usize {
        let free = (0..slot_count)
            .find(|&slot| slot != self.front && !self.pending.iter().any(|id| id.slot() == slot));
        match free {
            Some(slot) => slot,
            None => match self.pending.pop_front() {
                Some(dropped) => {
                    tracing::trace!("Dropping unpresented frame {}", dropped.sequence());
                    dropped.slot()
                }
                None => (self.front + 1) % slot_count,
            },
        }
    }
}

/// Pixel storage for one loaded media, sized once at the native resolution.
pub struct FrameBridge {
    slots: Vec<Mutex<FrameBuffer>>,
    mode: BufferMode,
    resolution: Resolution,
    schedule: Mutex<Schedule>,
    written: AtomicU64,
    presented: AtomicU64,
}

impl FrameBridge {
    pub fn new(resolution: Resolution, mode: BufferMode) -> Self {
        let slots = (0..mode.slot_count())
            .map(|_| Mutex::new(FrameBuffer::new(resolution)))
            .collect();

        Self {
            slots,
            mode,
            resolution,
            schedule: Mutex::new(Schedule {
                front: 0,
                pending: VecDeque::new(),
                next_sequence: 0,
            }),
            written: AtomicU64::new(0),
            presented: AtomicU64::new(0),
        }
    }

    pub fn mode(&self) -> BufferMode {
        self.mode
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Size of one slot in bytes (`width * height * 4`)
    pub fn frame_len(&self) -> usize {
        self.resolution.byte_len()
    }

    /// Frames released by the writer so far
    pub fn frames_written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Present notifications received so far
    pub fn frames_presented(&self) -> u64 {
        self.presented.load(Ordering::Relaxed)
    }

    /// Run `f` with read access to the frame that should be displayed.
    ///
    /// Blocks while the decode thread holds the same slot.
    pub fn with_front<R>(&self, f: impl FnOnce(&FrameBuffer) -> R) -> R {
        let frame = self.lock_front();
        f(&frame)
    }

    fn lock_front(&self) -> MutexGuard<'_, FrameBuffer> {
        match self.mode {
            BufferMode::Single => self.slots[0].lock(),
            BufferMode::Double => {
                // The writer never claims the front slot while the schedule is held
                let schedule = self.schedule.lock();
                self.slots[schedule.front].lock()
            }
        }
    }
}

impl FrameCallbacks for FrameBridge {
    fn acquire(&self) -> FrameLock<'_> {
        let id = {
            let mut schedule = self.schedule.lock();
            let slot = match self.mode {
                BufferMode::Single => 0,
                BufferMode::Double => schedule.claim_slot(self.slots.len()),
            };
            schedule.next_sequence += 1;
            FrameId::new(slot, schedule.next_sequence)
        };

        let pixels = MutexGuard::map(self.slots[id.slot()].lock(), FrameBuffer::as_bytes_mut);
        FrameLock::new(id, self.resolution, pixels)
    }

    fn release(&self, frame: FrameLock<'_>) {
        let id = frame.id();
        drop(frame);

        self.written.fetch_add(1, Ordering::Relaxed);
        if self.mode == BufferMode::Double {
            self.schedule.lock().pending.push_back(id);
        }
    }

    fn present(&self, frame: FrameId) {
        self.presented.fetch_add(1, Ordering::Relaxed);
        if self.mode != BufferMode::Double {
            return;
        }

        let mut schedule = self.schedule.lock();
        let Some(index) = schedule.pending.iter().position(|id| *id == frame) else {
            return;
        };
        // Older pending frames can no longer be shown in order
        schedule.pending.drain(..=index);
        schedule.front = frame.slot();
    }
}

impl std::fmt::Debug for FrameBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBridge")
            .field("mode", &self.mode)
            .field("resolution", &self.resolution)
            .field("front", &self.schedule.lock().front)
            .field("written", &self.frames_written())
            .field("presented", &self.frames_presented())
            .finish()
    }
}
