//! Scan-position timing: one counter state machine per axis, composed so
//! the vertical axis advances once per completed horizontal line.

#[derive(Debug, Clone, Copy)]
pub struct AxisLengths {
    pub sync: u32,
    pub back_porch: u32,
    pub active: u32,
    pub front_porch: u32,
}

impl AxisLengths {
    pub fn total(&self) -> u32 {
        self.sync + self.back_porch + self.active + self.front_porch
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScanConfig {
    pub h: AxisLengths,
    pub v: AxisLengths,
    /// ticks the horizontal coordinate leads the visible pixel by, covering
    /// the framebuffer read latency
    pub coord_delay: u32,
    /// framebuffer cells are repeated this many times along both axes
    pub pixel_repeat: u32,
}

/// 800x600, 60Hz -> 40MHz px clock
pub const SVGA_800X600: ScanConfig = ScanConfig {
    h: AxisLengths { sync: 128, back_porch: 88, active: 800, front_porch: 40 },
    v: AxisLengths { sync: 4, back_porch: 23, active: 600, front_porch: 1 },
    coord_delay: 1,
    pixel_repeat: 5,
};

/// shrunk timings for simulation: whole frames in 750 ticks
pub const SIM_SMALL: ScanConfig = ScanConfig {
    h: AxisLengths { sync: 15, back_porch: 10, active: 20, front_porch: 5 },
    v: AxisLengths { sync: 2, back_porch: 4, active: 8, front_porch: 1 },
    coord_delay: 0,
    pixel_repeat: 1,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Sync,
    BackPorch,
    Active,
    FrontPorch,
}

#[derive(Debug)]
pub struct AxisTiming {
    lengths: AxisLengths,
    coord_delay: u32,
    phase: Phase,
    counter: u32,
    coord: u32,
    drawing: bool,
    valid_data: bool,
    sync: bool,
    overflow: bool,
}

impl AxisTiming {
    pub fn new(lengths: AxisLengths, coord_delay: u32) -> Self {
        Self {
            lengths,
            coord_delay,
            phase: Phase::Sync,
            counter: lengths.sync - 1,
            coord: 0,
            drawing: false,
            valid_data: false,
            sync: false,
            overflow: false,
        }
    }

    pub fn tick(&mut self, enable: bool) {
        self.overflow = false;
        if !enable {
            return;
        }

        let counter = self.counter;
        self.counter = counter.wrapping_sub(1);

        if matches!(self.phase, Phase::BackPorch | Phase::Active) {
            self.coord += 1;
            if self.coord == self.lengths.active {
                self.coord = 0;
            }
        }

        match self.phase {
            Phase::Sync => {
                if counter == 1 {
                    // one tick early so a chained slower axis updates in step
                    self.overflow = true;
                }
                if counter == 0 {
                    self.sync = true;
                    self.counter = self.lengths.back_porch - 1;
                    self.phase = Phase::BackPorch;
                }
            }
            Phase::BackPorch => {
                if counter == self.coord_delay {
                    self.coord = 0;
                    self.drawing = true;
                }
                if counter == 0 {
                    self.valid_data = true;
                    self.counter = self.lengths.active - 1;
                    self.phase = Phase::Active;
                }
            }
            Phase::Active => {
                if counter == self.coord_delay {
                    self.drawing = false;
                }
                if counter == 0 {
                    self.valid_data = false;
                    self.counter = self.lengths.front_porch - 1;
                    self.phase = Phase::FrontPorch;
                }
            }
            Phase::FrontPorch => {
                if counter == 0 {
                    self.sync = false;
                    self.counter = self.lengths.sync - 1;
                    self.phase = Phase::Sync;
                }
            }
        }
    }

    pub fn coord(&self) -> u32 {
        self.coord
    }

    /// delay-shifted active window, for coordinate consumers
    pub fn drawing(&self) -> bool {
        self.drawing
    }

    /// unshifted active window, for the data-enable pin
    pub fn valid_data(&self) -> bool {
        self.valid_data
    }

    /// low exactly during the SYNC period
    pub fn sync(&self) -> bool {
        self.sync
    }

    pub fn overflow(&self) -> bool {
        self.overflow
    }
}

#[derive(Debug)]
pub struct ScanTiming {
    h: AxisTiming,
    v: AxisTiming,
}

impl ScanTiming {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            h: AxisTiming::new(config.h, config.coord_delay),
            v: AxisTiming::new(config.v, 0),
        }
    }

    /// one pixel clock; the vertical axis ticks on horizontal overflow
    pub fn tick(&mut self) {
        self.h.tick(true);
        self.v.tick(self.h.overflow());
    }

    pub fn x(&self) -> u32 {
        self.h.coord()
    }

    pub fn y(&self) -> u32 {
        self.v.coord()
    }

    pub fn line(&self) -> bool {
        self.h.overflow()
    }

    pub fn frame(&self) -> bool {
        self.v.overflow()
    }

    pub fn valid_data(&self) -> bool {
        self.h.valid_data() && self.v.valid_data()
    }

    pub fn in_bounds(&self) -> bool {
        self.h.drawing()
    }

    pub fn h_sync(&self) -> bool {
        self.h.sync()
    }

    pub fn v_sync(&self) -> bool {
        self.v.sync()
    }
}
