mod geometry;

use std::io::{Read, Write};
use std::time::Duration;

use dialoguer::Select;
use serialport::{available_ports, SerialPort, SerialPortInfo};
use structopt::StructOpt;
use vge_core::protocol::{self, ACK, BAUD, PING_REPLY};

use crate::geometry::{diamond, square, Point};

#[derive(Debug, PartialEq, StructOpt)]
#[structopt(name = "vgld", about = "VGE link tool")]
struct Opt {
    /// serial device; prompts when several USB ports are present
    #[structopt(long)]
    port: Option<String>,

    #[structopt(subcommand)]
    subcommand: Subcommands,
}

#[derive(Debug, PartialEq, StructOpt)]
enum Subcommands {
    /// Check the device answers on the command channel
    Ping,
    /// Upload one segment
    Write {
        index: u16,
        x0: u8,
        y0: u8,
        x1: u8,
        y1: u8,
    },
    /// Set the inclusive redraw range
    Bounds { start: u16, end: u16 },
    /// Wait for the next frame boundary
    Vsync,
    /// Collapse the redraw range to segment 0
    Blank,
    /// Upload the two-square scene and flip between the shapes
    Demo {
        #[structopt(default_value = "300")]
        rounds: u32,
    },
}

fn main() -> anyhow::Result<()> {
    let opt: Opt = Opt::from_args();
    let mut port = open_port(opt.port)?;

    match opt.subcommand {
        Subcommands::Ping => {
            exchange(&mut port, &protocol::encode_ping(), PING_REPLY)?;
            println!("alive");
        }
        Subcommands::Write { index, x0, y0, x1, y1 } => {
            let segment = geometry::segment(x0, y0, x1, y1);
            exchange(&mut port, &protocol::encode_write(index, segment), ACK)?;
        }
        Subcommands::Bounds { start, end } => {
            exchange(&mut port, &protocol::encode_set_bounds(start, end), ACK)?;
        }
        Subcommands::Vsync => {
            exchange(&mut port, &protocol::encode_vsync(), ACK)?;
        }
        Subcommands::Blank => {
            exchange(&mut port, &protocol::encode_set_bounds(0, 0), ACK)?;
        }
        Subcommands::Demo { rounds } => demo(&mut port, rounds)?,
    }

    Ok(())
}

fn demo(port: &mut Box<dyn SerialPort>, rounds: u32) -> anyhow::Result<()> {
    exchange(port, &protocol::encode_ping(), PING_REPLY)?;
    exchange(port, &protocol::encode_set_bounds(0, 0), ACK)?;

    let center = Point { x: 80, y: 60 };
    let shapes = [square(20), diamond(25)];

    let mut index = 1u16;
    let mut ranges = Vec::new();
    for mesh in &shapes {
        let start = index;
        for segment in mesh.segments(center)? {
            exchange(port, &protocol::encode_write(index, segment), ACK)?;
            index += 1;
        }
        ranges.push((start, index - 1));
    }
    println!("uploaded {} segments", index - 1);

    // flip the redraw range between the shapes; each change lands at a
    // frame boundary, so this alternates them on screen
    for _ in 0..rounds {
        for &(start, end) in &ranges {
            exchange(port, &protocol::encode_set_bounds(start, end), ACK)?;
        }
    }

    exchange(port, &protocol::encode_set_bounds(0, 0), ACK)?;
    println!("done!");
    Ok(())
}

/// one half-duplex exchange: write the command, read the single reply byte
fn exchange(port: &mut Box<dyn SerialPort>, msg: &[u8], expected: u8) -> anyhow::Result<()> {
    port.write_all(msg)?;
    port.flush().ok();

    let mut reply = [0u8; 1];
    port.read_exact(&mut reply)?;
    anyhow::ensure!(
        reply[0] == expected,
        "unexpected reply {:#04x}, wanted {:#04x}",
        reply[0],
        expected
    );
    Ok(())
}

fn open_port(name: Option<String>) -> anyhow::Result<Box<dyn SerialPort>> {
    let name = match name {
        Some(name) => name,
        None => select_port()?,
    };

    let port = serialport::new(&name, BAUD)
        .timeout(Duration::from_millis(2000))
        .open()
        .expect("Failed to open port");

    Ok(port)
}

fn select_port() -> anyhow::Result<String> {
    let ports = available_ports().expect("No ports found!");

    // filter for USB serial on linux/windows/macos
    let ports = ports
        .iter()
        .filter(|port| {
            port.port_name.contains("USB")
                || port.port_name.contains("COM")
                || port.port_name.contains("usb")
        })
        .collect::<Vec<&SerialPortInfo>>();

    match ports.as_slice() {
        [] => {
            println!("No USB serial ports found! Are you in the dialout group?");
            Err(anyhow::anyhow!("No USB serial ports found!"))
        }
        [p] => {
            println!("Using {}", p.port_name);
            Ok(p.port_name.clone())
        }
        ports => {
            println!("Multiple USB serial ports found");

            let port_names: Vec<String> = ports.iter().map(|port| port.port_name.clone()).collect();

            let selected = Select::new()
                .with_prompt("Select your USB serial port")
                .default(0)
                .items(&port_names)
                .interact()
                .expect("this should work?");

            Ok(port_names[selected].clone())
        }
    }
}
