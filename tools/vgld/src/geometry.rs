//! Client-side mesh authoring: points and edge lists flattened into the
//! segments the device stores. The device never range-checks coordinates,
//! so the client does it here before anything goes on the wire.

use anyhow::bail;
use vge_core::segments::{Endpoint, Segment};

#[derive(Debug, Clone, Copy)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

pub struct Mesh {
    pub points: Vec<Point>,
    pub edges: Vec<(usize, usize)>,
}

impl Mesh {
    /// flatten the edge list into device segments, translated by `offset`
    pub fn segments(&self, offset: Point) -> anyhow::Result<Vec<Segment>> {
        self.edges
            .iter()
            .map(|&(a, b)| {
                Ok(Segment {
                    p0: endpoint(self.points[a], offset)?,
                    p1: endpoint(self.points[b], offset)?,
                })
            })
            .collect()
    }
}

fn endpoint(p: Point, offset: Point) -> anyhow::Result<Endpoint> {
    let (x, y) = (p.x + offset.x, p.y + offset.y);
    if !(0..=255).contains(&x) || !(0..=255).contains(&y) {
        bail!("coordinates must be in the range of 0 to 255, got ({x}, {y})");
    }
    Ok(Endpoint { x: x as u8, y: y as u8 })
}

pub fn segment(x0: u8, y0: u8, x1: u8, y1: u8) -> Segment {
    Segment {
        p0: Endpoint { x: x0, y: y0 },
        p1: Endpoint { x: x1, y: y1 },
    }
}

const RING: [(usize, usize); 4] = [(0, 1), (1, 2), (2, 3), (3, 0)];

pub fn square(half: i32) -> Mesh {
    Mesh {
        points: vec![
            Point { x: half, y: half },
            Point { x: half, y: -half },
            Point { x: -half, y: -half },
            Point { x: -half, y: half },
        ],
        edges: RING.to_vec(),
    }
}

pub fn diamond(radius: i32) -> Mesh {
    Mesh {
        points: vec![
            Point { x: 0, y: radius },
            Point { x: radius, y: 0 },
            Point { x: 0, y: -radius },
            Point { x: -radius, y: 0 },
        ],
        edges: RING.to_vec(),
    }
}
