//! Bresenham line engine: latches a segment, then streams exactly one
//! pixel write per tick until the end point is reached.

use log::debug;

use crate::segments::{Endpoint, Segment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RasterState {
    Wait,
    Update,
    UpdateNext,
    Draw,
}

pub struct LineRasterizer {
    state: RasterState,
    p0: Endpoint,
    p1: Endpoint,
    dx: i32,
    sx: i32,
    dy: i32,
    sy: i32,
    error: i32,
    x: i32,
    y: i32,
    pixels: u32,
    write: Option<(u8, u8)>,
    done: bool,
}

impl LineRasterizer {
    pub fn new() -> Self {
        Self {
            state: RasterState::Wait,
            p0: Endpoint::default(),
            p1: Endpoint::default(),
            dx: 0,
            sx: 0,
            dy: 0,
            sy: 0,
            error: 0,
            x: 0,
            y: 0,
            pixels: 0,
            write: None,
            done: false,
        }
    }

    pub fn start(&mut self, segment: Segment) {
        self.p0 = segment.p0;
        self.p1 = segment.p1;
        self.state = RasterState::Update;
        debug!(
            target: "raster",
            "starting line ({},{}) -> ({},{})",
            segment.p0.x, segment.p0.y, segment.p1.x, segment.p1.y
        );
    }

    pub fn busy(&self) -> bool {
        self.state != RasterState::Wait
    }

    /// pixel write for this tick, if any
    pub fn write(&self) -> Option<(u8, u8)> {
        self.write
    }

    /// strobed for one tick when the segment completes
    pub fn done(&self) -> bool {
        self.done
    }

    fn finish(&mut self) {
        self.done = true;
        self.state = RasterState::Wait;
        debug!(target: "raster", "line complete, {} pixels", self.pixels);
    }

    pub fn tick(&mut self) {
        self.write = None;
        self.done = false;

        match self.state {
            RasterState::Wait => {}
            RasterState::Update => {
                let (x0, y0) = (self.p0.x as i32, self.p0.y as i32);
                let (x1, y1) = (self.p1.x as i32, self.p1.y as i32);
                self.dx = (x1 - x0).abs();
                self.sx = if x0 > x1 { -1 } else { 1 };
                // dy kept non-positive, canonical integer form
                self.dy = -(y1 - y0).abs();
                self.sy = if y0 > y1 { -1 } else { 1 };
                self.state = RasterState::UpdateNext;
            }
            RasterState::UpdateNext => {
                self.error = self.dx + self.dy;
                self.x = self.p0.x as i32;
                self.y = self.p0.y as i32;
                self.pixels = 1;
                self.write = Some((self.p0.x, self.p0.y));
                self.state = RasterState::Draw;
            }
            RasterState::Draw => {
                if self.x == self.p1.x as i32 && self.y == self.p1.y as i32 {
                    self.finish();
                    return;
                }

                let e2 = 2 * self.error;
                let step_x = e2 >= self.dy;
                let step_y = e2 <= self.dx;
                if step_x && step_y {
                    self.error += self.dx + self.dy;
                    self.x += self.sx;
                    self.y += self.sy;
                } else if step_x {
                    // end column reached: one more x step would overshoot
                    if self.x == self.p1.x as i32 {
                        self.finish();
                        return;
                    }
                    self.error += self.dy;
                    self.x += self.sx;
                } else {
                    if self.y == self.p1.y as i32 {
                        self.finish();
                        return;
                    }
                    self.error += self.dx;
                    self.y += self.sy;
                }

                self.pixels += 1;
                self.write = Some((self.x as u8, self.y as u8));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(x0: u8, y0: u8, x1: u8, y1: u8) -> Segment {
        Segment {
            p0: Endpoint { x: x0, y: y0 },
            p1: Endpoint { x: x1, y: y1 },
        }
    }

    fn rasterize(segment: Segment) -> Vec<(u8, u8)> {
        let mut raster = LineRasterizer::new();
        raster.start(segment);
        let mut pixels = Vec::new();
        for _ in 0..2048 {
            raster.tick();
            if let Some(p) = raster.write() {
                pixels.push(p);
            }
            if raster.done() {
                return pixels;
            }
        }
        panic!("rasterizer never finished");
    }

    #[test]
    fn point_segment_emits_exactly_one_pixel() {
        assert_eq!(rasterize(seg(37, 91, 37, 91)), vec![(37, 91)]);
    }

    #[test]
    fn shallow_line_stepping_sequence_is_exact() {
        assert_eq!(
            rasterize(seg(0, 0, 4, 2)),
            vec![(0, 0), (1, 1), (2, 1), (3, 2), (4, 2)]
        );
    }

    #[test]
    fn horizontal_and_vertical_lines() {
        assert_eq!(rasterize(seg(3, 7, 6, 7)), vec![(3, 7), (4, 7), (5, 7), (6, 7)]);
        assert_eq!(rasterize(seg(7, 3, 7, 6)), vec![(7, 3), (7, 4), (7, 5), (7, 6)]);
        assert_eq!(rasterize(seg(6, 7, 3, 7)), vec![(6, 7), (5, 7), (4, 7), (3, 7)]);
    }

    #[test]
    fn one_pixel_per_tick_while_drawing() {
        let mut raster = LineRasterizer::new();
        raster.start(seg(0, 0, 9, 3));
        // WAIT -> UPDATE -> UPDATE_NEXT: two setup ticks, then a write on
        // every tick until done
        raster.tick();
        assert!(raster.write().is_none());
        let mut writes = 0;
        loop {
            raster.tick();
            if raster.done() {
                break;
            }
            assert!(raster.write().is_some());
            writes += 1;
        }
        assert_eq!(writes, 10);
    }

    #[test]
    fn all_octants_touch_both_endpoints_without_gaps_or_duplicates() {
        let cases = [
            seg(10, 10, 20, 13),
            seg(10, 10, 13, 20),
            seg(20, 13, 10, 10),
            seg(13, 20, 10, 10),
            seg(10, 20, 20, 10),
            seg(20, 10, 10, 20),
            seg(0, 0, 17, 17),
            seg(5, 0, 0, 9),
        ];
        for segment in cases {
            let pixels = rasterize(segment);
            let expected = i32::max(
                (segment.p1.x as i32 - segment.p0.x as i32).abs(),
                (segment.p1.y as i32 - segment.p0.y as i32).abs(),
            ) + 1;
            assert_eq!(pixels.len() as i32, expected, "{segment:?}");
            assert_eq!(pixels.first(), Some(&(segment.p0.x, segment.p0.y)), "{segment:?}");
            assert_eq!(pixels.last(), Some(&(segment.p1.x, segment.p1.y)), "{segment:?}");
            for pair in pixels.windows(2) {
                let dx = (pair[1].0 as i32 - pair[0].0 as i32).abs();
                let dy = (pair[1].1 as i32 - pair[0].1 as i32).abs();
                assert!(dx <= 1 && dy <= 1 && dx + dy > 0, "{segment:?}");
            }
            for (i, a) in pixels.iter().enumerate() {
                assert!(!pixels[i + 1..].contains(a), "{segment:?}");
            }
        }
    }
}
