//! Segment endpoint storage and the read/write arbiter in front of it.
//! The store has a single address port: reads own it for their tick, writes
//! park in a depth-1 pending register and drain on the next free tick.

use alloc::boxed::Box;
use alloc::vec;
use bytemuck::{Pod, Zeroable};
use heapless::Deque;
use log::warn;
use rand::rngs::SmallRng;
use rand_core::{RngCore, SeedableRng};

pub const STORE_CAPACITY: usize = 1 << 14;
pub const INDEX_MASK: u16 = (STORE_CAPACITY - 1) as u16;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Endpoint {
    pub x: u8,
    pub y: u8,
}

/// endpoint pair; no geometric invariant, a point is a valid segment
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Segment {
    pub p0: Endpoint,
    pub p1: Endpoint,
}

unsafe impl Zeroable for Endpoint {}
unsafe impl Pod for Endpoint {}
unsafe impl Zeroable for Segment {}
unsafe impl Pod for Segment {}

pub struct SegmentStore {
    mem: Box<[Segment]>,
}

impl SegmentStore {
    /// contents at power-on are undefined; a seeded fill keeps the garbage
    /// reproducible
    pub fn power_on(seed: u64) -> Self {
        let mut mem = vec![Segment::default(); STORE_CAPACITY].into_boxed_slice();
        let mut rng = SmallRng::seed_from_u64(seed);
        rng.fill_bytes(bytemuck::cast_slice_mut(&mut mem));
        Self { mem }
    }

    fn get(&self, index: u16) -> Segment {
        self.mem[(index & INDEX_MASK) as usize]
    }

    fn set(&mut self, index: u16, segment: Segment) {
        self.mem[(index & INDEX_MASK) as usize] = segment;
    }
}

#[derive(Debug, Clone, Copy)]
struct WriteOp {
    index: u16,
    segment: Segment,
}

pub struct SegmentArbiter {
    store: SegmentStore,
    pending: Deque<WriteOp, 1>,
    read_req: Option<u16>,
    read_result: Option<Segment>,
}

impl SegmentArbiter {
    pub fn new(store: SegmentStore) -> Self {
        Self {
            store,
            pending: Deque::new(),
            read_req: None,
            read_result: None,
        }
    }

    /// the result is available one tick after the request
    pub fn begin_read(&mut self, index: u16) {
        self.read_req = Some(index);
    }

    pub fn read_result(&self) -> Option<Segment> {
        self.read_result
    }

    /// bypasses the arbitrated port; for host-side inspection only
    pub fn peek(&self, index: u16) -> Segment {
        self.store.get(index)
    }

    pub fn tick(&mut self, write: Option<(u16, Segment)>) {
        match self.read_req.take() {
            Some(index) => self.read_result = Some(self.store.get(index)),
            None => {
                self.read_result = None;
                if let Some(op) = self.pending.pop_front() {
                    self.store.set(op.index, op.segment);
                }
            }
        }

        if let Some((index, segment)) = write {
            if self.pending.is_full() {
                // last write wins; a caller pacing faster than the drain
                // latency loses the earlier write
                self.pending.pop_front();
                warn!(target: "segments", "pending segment write {} overwritten before drain", index);
            }
            let _ = self.pending.push_back(WriteOp { index, segment });
        }
    }
}
