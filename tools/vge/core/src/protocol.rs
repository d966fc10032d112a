//! Byte-level command protocol: the device-side decoder state machine and
//! the host-side encoders for the same wire format.
//!
//! Strictly half-duplex request/response; one byte consumed per receive
//! event. A byte arriving mid-command always advances that command's
//! machine, so a corrupted stream desynchronizes the decoder until an
//! external reset.

use bit_field::BitField;
use heapless::Deque;
use log::{debug, warn};

use crate::lineset::RenderBounds;
use crate::segments::{Segment, INDEX_MASK};

pub const BAUD: u32 = 115_200;

pub const CMD_PING: u8 = 0x00;
pub const CMD_WRITE: u8 = 0x01;
pub const CMD_SET_BOUNDS: u8 = 0x02;
pub const CMD_VSYNC: u8 = 0x03;

pub const PING_REPLY: u8 = 0x42;
pub const ACK: u8 = 0xBD;

/// receive queue depth; real hardware paces bytes at the baud rate, the
/// queue only adds slack for hosts that do not
pub const RX_QUEUE_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    Cmd,
    WrIdx0,
    WrIdx1,
    WrX0,
    WrY0,
    WrX1,
    WrY1,
    BoundsS0,
    BoundsS1,
    BoundsE0,
    BoundsE1,
    BoundsCommit,
    Vsync,
}

/// what one decoder tick asks the rest of the pipeline to do
#[derive(Debug, Default)]
pub struct DecoderEffects {
    pub write: Option<(u16, Segment)>,
    pub bounds: Option<RenderBounds>,
    pub reply: Option<u8>,
}

pub struct ProtocolDecoder {
    state: DecoderState,
    index: u16,
    segment: Segment,
    start: u16,
    end: u16,
}

impl ProtocolDecoder {
    pub fn new() -> Self {
        Self {
            state: DecoderState::Cmd,
            index: 0,
            segment: Segment::default(),
            start: 0,
            end: 0,
        }
    }

    pub fn tick(&mut self, rx: &mut Deque<u8, RX_QUEUE_DEPTH>, frame: bool) -> DecoderEffects {
        let mut fx = DecoderEffects::default();

        // boundary-gated states hold without consuming a byte
        match self.state {
            DecoderState::BoundsCommit => {
                if frame {
                    fx.bounds = Some(RenderBounds {
                        start: self.start & INDEX_MASK,
                        end: self.end & INDEX_MASK,
                    });
                    fx.reply = Some(ACK);
                    self.state = DecoderState::Cmd;
                }
                return fx;
            }
            DecoderState::Vsync => {
                if frame {
                    fx.reply = Some(ACK);
                    self.state = DecoderState::Cmd;
                }
                return fx;
            }
            _ => {}
        }

        let byte = match rx.pop_front() {
            Some(byte) => byte,
            None => return fx,
        };

        self.state = match self.state {
            DecoderState::Cmd => match byte {
                CMD_PING => {
                    debug!(target: "protocol", "ping");
                    fx.reply = Some(PING_REPLY);
                    DecoderState::Cmd
                }
                CMD_WRITE => DecoderState::WrIdx0,
                CMD_SET_BOUNDS => DecoderState::BoundsS0,
                CMD_VSYNC => DecoderState::Vsync,
                other => {
                    warn!(target: "protocol", "unknown command byte {:#04x}", other);
                    DecoderState::Cmd
                }
            },
            DecoderState::WrIdx0 => {
                self.index.set_bits(0..8, byte as u16);
                DecoderState::WrIdx1
            }
            DecoderState::WrIdx1 => {
                self.index.set_bits(8..16, byte as u16);
                DecoderState::WrX0
            }
            DecoderState::WrX0 => {
                self.segment.p0.x = byte;
                DecoderState::WrY0
            }
            DecoderState::WrY0 => {
                self.segment.p0.y = byte;
                DecoderState::WrX1
            }
            DecoderState::WrX1 => {
                self.segment.p1.x = byte;
                DecoderState::WrY1
            }
            DecoderState::WrY1 => {
                self.segment.p1.y = byte;
                let index = self.index & INDEX_MASK;
                debug!(target: "protocol", "write segment {}", index);
                fx.write = Some((index, self.segment));
                fx.reply = Some(ACK);
                DecoderState::Cmd
            }
            DecoderState::BoundsS0 => {
                self.start.set_bits(0..8, byte as u16);
                DecoderState::BoundsS1
            }
            DecoderState::BoundsS1 => {
                self.start.set_bits(8..16, byte as u16);
                DecoderState::BoundsE0
            }
            DecoderState::BoundsE0 => {
                self.end.set_bits(0..8, byte as u16);
                DecoderState::BoundsE1
            }
            DecoderState::BoundsE1 => {
                self.end.set_bits(8..16, byte as u16);
                DecoderState::BoundsCommit
            }
            // handled before the byte fetch
            DecoderState::BoundsCommit | DecoderState::Vsync => self.state,
        };

        fx
    }
}

// host-side encoders; the tools and the tests share one wire format

pub fn encode_ping() -> [u8; 1] {
    [CMD_PING]
}

pub fn encode_write(index: u16, segment: Segment) -> [u8; 7] {
    [
        CMD_WRITE,
        index.get_bits(0..8) as u8,
        index.get_bits(8..16) as u8,
        segment.p0.x,
        segment.p0.y,
        segment.p1.x,
        segment.p1.y,
    ]
}

pub fn encode_set_bounds(start: u16, end: u16) -> [u8; 5] {
    [
        CMD_SET_BOUNDS,
        start.get_bits(0..8) as u8,
        start.get_bits(8..16) as u8,
        end.get_bits(0..8) as u8,
        end.get_bits(8..16) as u8,
    ]
}

pub fn encode_vsync() -> [u8; 1] {
    [CMD_VSYNC]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segments::Endpoint;

    fn feed(decoder: &mut ProtocolDecoder, bytes: &[u8]) -> Vec<DecoderEffects> {
        let mut rx = Deque::new();
        for &b in bytes {
            rx.push_back(b).unwrap();
        }
        let mut effects = Vec::new();
        while !rx.is_empty() {
            effects.push(decoder.tick(&mut rx, false));
        }
        effects
    }

    fn seg(x0: u8, y0: u8, x1: u8, y1: u8) -> Segment {
        Segment {
            p0: Endpoint { x: x0, y: y0 },
            p1: Endpoint { x: x1, y: y1 },
        }
    }

    #[test]
    fn ping_replies_immediately() {
        let mut decoder = ProtocolDecoder::new();
        let fx = feed(&mut decoder, &encode_ping());
        assert_eq!(fx[0].reply, Some(PING_REPLY));
    }

    #[test]
    fn write_command_emits_one_store_write() {
        let mut decoder = ProtocolDecoder::new();
        let s = seg(1, 2, 3, 4);
        let fx = feed(&mut decoder, &encode_write(0x0123, s));
        let last = fx.last().unwrap();
        assert_eq!(last.write, Some((0x0123, s)));
        assert_eq!(last.reply, Some(ACK));
        assert!(fx[..fx.len() - 1].iter().all(|f| f.reply.is_none()));
    }

    #[test]
    fn write_index_wraps_modulo_capacity() {
        let mut decoder = ProtocolDecoder::new();
        let s = seg(0, 0, 0, 0);
        let fx = feed(&mut decoder, &encode_write(0x4005, s));
        assert_eq!(fx.last().unwrap().write, Some((0x0005, s)));
    }

    #[test]
    fn bounds_commit_waits_for_the_frame_strobe() {
        let mut decoder = ProtocolDecoder::new();
        let fx = feed(&mut decoder, &encode_set_bounds(2, 9));
        assert!(fx.iter().all(|f| f.bounds.is_none() && f.reply.is_none()));

        let mut rx = Deque::new();
        // no strobe, no commit
        let fx = decoder.tick(&mut rx, false);
        assert!(fx.bounds.is_none());

        let fx = decoder.tick(&mut rx, true);
        assert_eq!(fx.bounds, Some(RenderBounds { start: 2, end: 9 }));
        assert_eq!(fx.reply, Some(ACK));
    }

    #[test]
    fn vsync_acks_only_after_the_frame_strobe() {
        let mut decoder = ProtocolDecoder::new();
        let fx = feed(&mut decoder, &encode_vsync());
        assert!(fx[0].reply.is_none());

        let mut rx = Deque::new();
        assert!(decoder.tick(&mut rx, false).reply.is_none());
        assert_eq!(decoder.tick(&mut rx, true).reply, Some(ACK));
    }

    #[test]
    fn unknown_command_is_ignored() {
        let mut decoder = ProtocolDecoder::new();
        let fx = feed(&mut decoder, &[0x7F]);
        assert!(fx[0].reply.is_none() && fx[0].write.is_none());
        // decoder still answers a ping afterwards
        let fx = feed(&mut decoder, &encode_ping());
        assert_eq!(fx[0].reply, Some(PING_REPLY));
    }

    #[test]
    fn ping_replies_regardless_of_in_flight_rendering_state() {
        // ping between complete commands: idle command state is all that matters
        let mut decoder = ProtocolDecoder::new();
        feed(&mut decoder, &encode_write(1, seg(0, 0, 5, 5)));
        let fx = feed(&mut decoder, &encode_ping());
        assert_eq!(fx[0].reply, Some(PING_REPLY));
    }
}
