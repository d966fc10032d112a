//! Built-in demo scene: a square and a diamond uploaded over the simulated
//! serial channel, centered on the 160x120 grid.

use anyhow::bail;
use vge_core::gpu::VectorGpu;
use vge_core::protocol::{self, ACK};
use vge_core::segments::{Endpoint, Segment};

const CENTER: (i32, i32) = (80, 60);

const SQUARE: [(i32, i32); 4] = [(20, 20), (20, -20), (-20, -20), (-20, 20)];
const DIAMOND: [(i32, i32); 4] = [(0, 25), (25, 0), (0, -25), (-25, 0)];

pub fn upload(gpu: &mut VectorGpu) -> anyhow::Result<()> {
    let mut index = 1u16;
    for shape in [SQUARE, DIAMOND] {
        for i in 0..shape.len() {
            let segment = edge(shape[i], shape[(i + 1) % shape.len()])?;
            command(gpu, &protocol::encode_write(index, segment))?;
            index += 1;
        }
    }
    command(gpu, &protocol::encode_set_bounds(1, index - 1))?;
    tracing::info!("demo scene uploaded, {} segments", index - 1);
    Ok(())
}

fn edge(a: (i32, i32), b: (i32, i32)) -> anyhow::Result<Segment> {
    Ok(Segment {
        p0: centered(a)?,
        p1: centered(b)?,
    })
}

fn centered(p: (i32, i32)) -> anyhow::Result<Endpoint> {
    let (x, y) = (p.0 + CENTER.0, p.1 + CENTER.1);
    if !(0..=255).contains(&x) || !(0..=255).contains(&y) {
        bail!("point ({}, {}) is outside the device coordinate range", x, y);
    }
    Ok(Endpoint { x: x as u8, y: y as u8 })
}

/// one half-duplex exchange: send the command, tick until the reply
fn command(gpu: &mut VectorGpu, bytes: &[u8]) -> anyhow::Result<()> {
    for &b in bytes {
        if !gpu.send_byte(b) {
            bail!("receive queue full mid-command");
        }
    }
    // bounds commits wait for a frame boundary; give it two frames of slack
    for _ in 0..2 * 1056 * 628 {
        gpu.tick();
        if let Some(reply) = gpu.take_reply() {
            if reply != ACK {
                bail!("device replied {:#04x}, expected ack", reply);
            }
            return Ok(());
        }
    }
    bail!("no reply from the device")
}
