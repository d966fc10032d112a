mod demo;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use image::{Rgb, RgbImage};
use vge_core::framebuffer::Rgb444;
use vge_core::gpu::VectorGpu;
use vge_core::timing::SVGA_800X600;

const DISPLAY_WIDTH: u32 = 800;
const DISPLAY_HEIGHT: u32 = 600;

#[derive(Parser)]
#[command(name = "vge")]
#[command(version, about = "vector GPU emulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run headless and dump scanned-out frames as PNGs
    Run {
        /// Number of frames to scan out
        #[arg(short, long, default_value_t = 4)]
        frames: u32,

        /// Output directory for frame-NNNN.png
        #[arg(short, long, default_value = "frames")]
        out: PathBuf,

        /// Seed for the segment store's power-on contents
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Upload the two-square demo scene before scanning
        #[arg(long)]
        demo: bool,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { frames, out, seed, demo } => run(frames, &out, seed, demo),
    }
}

fn run(frames: u32, out: &Path, seed: u64, demo: bool) -> anyhow::Result<()> {
    std::fs::create_dir_all(out)
        .with_context(|| format!("creating output directory {}", out.display()))?;

    let mut gpu = VectorGpu::new(&SVGA_800X600, seed);
    if demo {
        demo::upload(&mut gpu)?;
    }

    for n in 0..frames {
        let img = scan_frame(&mut gpu);
        let path = out.join(format!("frame-{n:04}.png"));
        img.save(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        tracing::info!("wrote {}", path.display());
    }

    Ok(())
}

/// Reconstruct one frame the way a monitor would: rows are bursts of
/// data-enable, delimited by blanking, starting from a frame strobe.
fn scan_frame(gpu: &mut VectorGpu) -> RgbImage {
    let start = gpu.frames();
    while gpu.frames() == start {
        gpu.tick();
    }

    let mut img = RgbImage::new(DISPLAY_WIDTH, DISPLAY_HEIGHT);
    let collecting = gpu.frames();
    let (mut col, mut row) = (0u32, 0u32);
    let mut in_row = false;

    while gpu.frames() == collecting {
        let out = gpu.tick();
        if out.data_enable {
            if !in_row {
                in_row = true;
                col = 0;
            }
            if col < DISPLAY_WIDTH && row < DISPLAY_HEIGHT {
                img.put_pixel(col, row, widen(out.color));
            }
            col += 1;
        } else if in_row {
            in_row = false;
            row += 1;
        }
    }

    img
}

// 4-bit channels widen by nibble duplication
fn widen(color: Rgb444) -> Rgb<u8> {
    Rgb([
        color.red() << 4 | color.red(),
        color.green() << 4 | color.green(),
        color.blue() << 4 | color.blue(),
    ])
}
