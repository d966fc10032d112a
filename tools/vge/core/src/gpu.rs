//! Top-level composition: every state machine advanced once per tick of
//! the shared pixel clock. The frame strobe is the single serialization
//! point: buffer swap, bounds commit and sweep re-arm all gate on it.

use heapless::Deque;
use log::{debug, warn};

use crate::framebuffer::{FrameBuffer, Palette, PixelWrite, Rgb444};
use crate::lineset::{LineSet, RenderBounds};
use crate::protocol::{ProtocolDecoder, RX_QUEUE_DEPTH};
use crate::raster::LineRasterizer;
use crate::segments::{SegmentArbiter, SegmentStore};
use crate::timing::{ScanConfig, ScanTiming};

const TX_QUEUE_DEPTH: usize = 4;

/// display-link tuple emitted every tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayOut {
    pub color: Rgb444,
    pub h_sync: bool,
    pub v_sync: bool,
    pub data_enable: bool,
}

pub struct VectorGpu {
    scan: ScanTiming,
    framebuffer: FrameBuffer,
    arbiter: SegmentArbiter,
    raster: LineRasterizer,
    sweep: LineSet,
    decoder: ProtocolDecoder,
    rx: Deque<u8, RX_QUEUE_DEPTH>,
    tx: Deque<u8, TX_QUEUE_DEPTH>,
    pixel_repeat: u32,
    draw_color: u8,
    frames: u64,
}

impl VectorGpu {
    pub fn new(config: &ScanConfig, seed: u64) -> Self {
        Self {
            scan: ScanTiming::new(config),
            framebuffer: FrameBuffer::new(),
            arbiter: SegmentArbiter::new(SegmentStore::power_on(seed)),
            raster: LineRasterizer::new(),
            sweep: LineSet::new(),
            decoder: ProtocolDecoder::new(),
            rx: Deque::new(),
            tx: Deque::new(),
            pixel_repeat: config.pixel_repeat,
            draw_color: 0x07,
            frames: 0,
        }
    }

    pub fn set_palette(&mut self, palette: Palette) {
        self.framebuffer.set_palette(palette);
    }

    /// palette index the rasterizer writes with
    pub fn set_draw_color(&mut self, color: u8) {
        self.draw_color = color & 0x07;
    }

    pub fn framebuffer(&self) -> &FrameBuffer {
        &self.framebuffer
    }

    pub fn segments(&self) -> &SegmentArbiter {
        &self.arbiter
    }

    pub fn render_bounds(&self) -> RenderBounds {
        self.sweep.bounds()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// host -> device serial byte; false when the receive queue is full
    #[must_use]
    pub fn send_byte(&mut self, byte: u8) -> bool {
        self.rx.push_back(byte).is_ok()
    }

    /// device -> host reply byte, if one is waiting
    pub fn take_reply(&mut self) -> Option<u8> {
        self.tx.pop_front()
    }

    pub fn tick(&mut self) -> DisplayOut {
        self.scan.tick();
        let frame = self.scan.frame();
        if frame {
            self.frames += 1;
            debug!(target: "gpu", "frame {}", self.frames);
        }

        let fx = self.decoder.tick(&mut self.rx, frame);
        if let Some(bounds) = fx.bounds {
            // committed exactly at the frame boundary, before the sweep re-arms
            self.sweep.set_bounds(bounds);
        }
        if let Some(byte) = fx.reply {
            if self.tx.push_back(byte).is_err() {
                warn!(target: "protocol", "reply dropped, tx queue full");
            }
        }

        self.raster.tick();
        let write = self
            .raster
            .write()
            .map(|(x, y)| PixelWrite { x, y, data: self.draw_color });
        self.sweep.tick(frame, &mut self.arbiter, &mut self.raster);
        self.arbiter.tick(fx.write);

        let fill = self.scan.valid_data();
        self.framebuffer.tick(
            self.scan.x() / self.pixel_repeat,
            self.scan.y() / self.pixel_repeat,
            write,
            fill,
            frame,
        );

        DisplayOut {
            color: self.framebuffer.color(),
            h_sync: self.scan.h_sync(),
            v_sync: self.scan.v_sync(),
            data_enable: self.scan.valid_data(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framebuffer::{FB_HEIGHT, FB_WIDTH};
    use crate::protocol::{self, ACK, PING_REPLY};
    use crate::segments::{Endpoint, Segment};
    use crate::timing::SIM_SMALL;

    const FRAME_TICKS: u32 = 750;

    fn gpu() -> VectorGpu {
        VectorGpu::new(&SIM_SMALL, 99)
    }

    fn command(gpu: &mut VectorGpu, bytes: &[u8]) -> u8 {
        for &b in bytes {
            assert!(gpu.send_byte(b));
        }
        for _ in 0..3 * FRAME_TICKS {
            gpu.tick();
            if let Some(reply) = gpu.take_reply() {
                return reply;
            }
        }
        panic!("no reply within three frames");
    }

    #[test]
    fn ping_replies_through_the_byte_queues() {
        let mut gpu = gpu();
        assert_eq!(command(&mut gpu, &protocol::encode_ping()), PING_REPLY);
    }

    #[test]
    fn write_command_lands_in_the_store() {
        let mut gpu = gpu();
        let s = Segment {
            p0: Endpoint { x: 9, y: 8 },
            p1: Endpoint { x: 7, y: 6 },
        };
        assert_eq!(command(&mut gpu, &protocol::encode_write(123, s)), ACK);
        // the queued write drains within a couple of ticks
        gpu.tick();
        gpu.tick();
        assert_eq!(gpu.segments().peek(123), s);
    }

    #[test]
    fn vsync_acks_after_the_next_frame_strobe() {
        let mut gpu = gpu();
        let before = gpu.frames();
        assert_eq!(command(&mut gpu, &protocol::encode_vsync()), ACK);
        assert!(gpu.frames() > before);
    }

    #[test]
    fn bounds_commit_at_the_boundary_then_the_sweep_draws_the_line() {
        let mut gpu = gpu();
        let s = Segment {
            p0: Endpoint { x: 40, y: 40 },
            p1: Endpoint { x: 44, y: 42 },
        };
        assert_eq!(command(&mut gpu, &protocol::encode_write(3, s)), ACK);

        assert_eq!(command(&mut gpu, &protocol::encode_set_bounds(3, 3)), ACK);
        assert_eq!(gpu.render_bounds(), RenderBounds { start: 3, end: 3 });

        // the ack arrives on the frame strobe tick; the sweep that follows it
        // finishes well within the frame
        for _ in 0..FRAME_TICKS / 2 {
            gpu.tick();
        }
        let bank = gpu.framebuffer().selected();
        for (x, y) in [(40, 40), (41, 41), (42, 41), (43, 42), (44, 42)] {
            assert_eq!(gpu.framebuffer().pixel(bank, x, y), 0x07, "({x},{y})");
        }
    }

    #[test]
    fn sweep_redraws_every_frame_after_the_swap() {
        let mut gpu = gpu();
        let s = Segment {
            p0: Endpoint { x: 100, y: 10 },
            p1: Endpoint { x: 100, y: 13 },
        };
        assert_eq!(command(&mut gpu, &protocol::encode_write(0, s)), ACK);
        // the bounds ack lands exactly on a frame strobe
        assert_eq!(command(&mut gpu, &protocol::encode_set_bounds(0, 0)), ACK);

        // inspect mid-frame: the segment reappears in whichever bank is
        // selected, frame after frame
        for _ in 0..3 {
            for _ in 0..FRAME_TICKS / 2 {
                gpu.tick();
            }
            let bank = gpu.framebuffer().selected();
            assert_eq!(gpu.framebuffer().pixel(bank, 100, 10), 0x07);
            for _ in 0..FRAME_TICKS / 2 {
                gpu.tick();
            }
        }
    }

    #[test]
    fn erase_covers_the_scanned_window() {
        let mut gpu = gpu();
        // SIM_SMALL scans a 20x8 window of the grid; those display-bank
        // cells are cleared behind the beam within one frame
        for _ in 0..2 * FRAME_TICKS {
            gpu.tick();
        }
        let display = gpu.framebuffer().selected() ^ 1;
        for y in 0..8 {
            for x in 0..20 {
                assert_eq!(gpu.framebuffer().pixel(display, x, y), 0);
            }
        }
        // outside the scanned window the pattern survives
        assert_ne!(gpu.framebuffer().pixel(display, FB_WIDTH - 1, FB_HEIGHT - 1), 0);
    }
}
