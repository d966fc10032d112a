//! Per-frame sweep sequencer: walks the committed index range through the
//! segment arbiter and the rasterizer, one segment at a time.

use log::debug;

use crate::raster::LineRasterizer;
use crate::segments::SegmentArbiter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderBounds {
    pub start: u16,
    pub end: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SweepState {
    Idle,
    Request,
    Latency,
    Draw,
}

pub struct LineSet {
    bounds: RenderBounds,
    counter: u16,
    state: SweepState,
    rearm: bool,
}

impl LineSet {
    pub fn new() -> Self {
        Self {
            bounds: RenderBounds { start: 0, end: 0 },
            counter: 0,
            state: SweepState::Idle,
            rearm: false,
        }
    }

    /// called by the decoder exactly at the frame boundary
    pub fn set_bounds(&mut self, bounds: RenderBounds) {
        debug!(target: "gpu", "render bounds [{}, {}]", bounds.start, bounds.end);
        self.bounds = bounds;
    }

    pub fn bounds(&self) -> RenderBounds {
        self.bounds
    }

    pub fn sweeping(&self) -> bool {
        self.state != SweepState::Idle
    }

    pub fn tick(&mut self, frame: bool, arbiter: &mut SegmentArbiter, raster: &mut LineRasterizer) {
        if frame {
            // one attempted sweep per frame period; an unfinished remainder
            // is dropped, never carried over
            self.rearm = true;
        }

        // never interrupt a segment mid-draw
        if self.rearm && self.state != SweepState::Draw {
            self.rearm = false;
            if self.bounds.start > self.bounds.end {
                // malformed bounds: nothing redrawn this frame
                self.state = SweepState::Idle;
                return;
            }
            self.counter = self.bounds.start;
            self.state = SweepState::Request;
        }

        match self.state {
            SweepState::Idle => {}
            SweepState::Request => {
                arbiter.begin_read(self.counter);
                self.state = SweepState::Latency;
            }
            SweepState::Latency => {
                if let Some(segment) = arbiter.read_result() {
                    raster.start(segment);
                    self.state = SweepState::Draw;
                }
            }
            SweepState::Draw => {
                if raster.done() {
                    if self.counter == self.bounds.end || self.rearm {
                        // sweep complete (or superseded); the re-arm latches
                        // start again on the next tick
                        self.state = SweepState::Idle;
                    } else {
                        self.counter += 1;
                        self.state = SweepState::Request;
                    }
                }
            }
        }
    }
}
