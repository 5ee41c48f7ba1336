//! # Phomemo CLI
//!
//! Command-line interface for printing images on Phomemo printers.
//!
//! ## Usage
//!
//! ```bash
//! # Print over Bluetooth (binds /dev/rfcommN if needed)
//! phomemo print --image cat.jpg --address DC:0D:30:12:34:56 --channel 1
//!
//! # Print through an already bound device with the wide profile
//! phomemo print --image cat.jpg --device /dev/rfcomm0 --profile phomemo-880
//!
//! # Write the byte stream to a file (or "-" for stdout) instead of printing
//! phomemo print --image cat.jpg --output job.bin
//!
//! # Save a preview of the dithered image
//! phomemo print --image cat.jpg --png preview.png
//!
//! # List built-in profiles
//! phomemo profiles
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use phomemo::{
    PhomemoError,
    printer::{self, DeviceProfile, FixedPacing, NoPacing},
    render::{self, DitheringAlgorithm},
};

/// Phomemo - Thermal printer image utility
#[derive(Parser, Debug)]
#[command(name = "phomemo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log more detail (repeat for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print an image
    Print {
        /// Image file to print
        #[arg(short, long)]
        image: PathBuf,

        /// Bluetooth address of the printer (XX:XX:XX:XX:XX:XX)
        #[arg(short, long, requires = "channel", conflicts_with_all = ["device", "output"])]
        address: Option<String>,

        /// RFCOMM channel to connect on
        #[arg(short, long, requires = "address")]
        channel: Option<u8>,

        /// Already bound RFCOMM device
        #[arg(long, conflicts_with = "output")]
        device: Option<PathBuf>,

        /// Write the byte stream to FILE ("-" for stdout) instead of printing
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Device profile: phomemo-560, phomemo-880 or custom:WIDTHxROWS[@DELAY]
        #[arg(short, long, default_value = "phomemo-560")]
        profile: String,

        /// Load the device profile from a JSON file (overrides --profile)
        #[arg(long, value_name = "FILE")]
        profile_file: Option<PathBuf>,

        /// Keep landscape images as they are
        #[arg(long)]
        no_rotate: bool,

        /// Dithering: floyd-steinberg, bayer or threshold
        #[arg(long, default_value = "floyd-steinberg")]
        dither: DitheringAlgorithm,

        /// Also save the dithered image as PNG
        #[arg(long, value_name = "FILE")]
        png: Option<PathBuf>,
    },

    /// List built-in device profiles
    Profiles,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(command: Commands) -> Result<(), PhomemoError> {
    match command {
        Commands::Profiles => {
            println!("Built-in profiles:");
            for p in DeviceProfile::built_in() {
                println!(
                    "  {:<12} {} dots, {} rows/block, {}ms/{}ms pacing",
                    p.name,
                    p.width_dots,
                    p.max_block_rows,
                    p.pacing.block_delay_ms,
                    p.pacing.trailer_delay_ms
                );
            }
            Ok(())
        }
        Commands::Print {
            image,
            address,
            channel,
            device,
            output,
            profile,
            profile_file,
            no_rotate,
            dither,
            png,
        } => {
            let profile = match profile_file {
                Some(path) => DeviceProfile::from_json_file(path)?,
                None => DeviceProfile::parse(&profile)?,
            };
            profile.validate()?;

            let source = render::load_image(&image)?;
            let bilevel = render::normalize(&source, profile.width_dots as u32, !no_rotate, dither)?;
            drop(source);

            if let Some(png_path) = &png {
                bilevel
                    .to_gray_image()
                    .save(png_path)
                    .map_err(|e| PhomemoError::Io(io::Error::other(e)))?;
                info!(path = %png_path.display(), "saved preview");
            }

            if let Some(path) = output {
                return write_stream(&bilevel, &profile, &path);
            }

            let device = match (address, channel, device) {
                (Some(address), Some(channel), _) => Some(resolve(&address, channel)?),
                (_, _, Some(device)) => Some(device),
                _ => None,
            };

            match device {
                Some(device) => print_to_device(&bilevel, &profile, &device),
                // Preview-only run
                None if png.is_some() => Ok(()),
                None => Err(PhomemoError::Transport(
                    "No destination: give --address/--channel, --device or --output".to_string(),
                )),
            }
        }
    }
}

/// Encode without pacing into a file or stdout.
fn write_stream(
    image: &render::BilevelImage,
    profile: &DeviceProfile,
    path: &Path,
) -> Result<(), PhomemoError> {
    if path.as_os_str() == "-" {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        printer::transmit(image, &mut out, profile, &NoPacing)?;
    } else {
        let mut out = BufWriter::new(File::create(path)?);
        printer::transmit(image, &mut out, profile, &NoPacing)?;
        out.flush()?;
        info!(path = %path.display(), "wrote byte stream");
    }
    Ok(())
}

#[cfg(unix)]
fn resolve(address: &str, channel: u8) -> Result<PathBuf, PhomemoError> {
    phomemo::transport::resolve_device(address, channel).map(PathBuf::from)
}

#[cfg(unix)]
fn print_to_device(
    image: &render::BilevelImage,
    profile: &DeviceProfile,
    device: &Path,
) -> Result<(), PhomemoError> {
    let mut transport = phomemo::BluetoothTransport::open(device)?;
    printer::transmit(image, &mut transport, profile, &FixedPacing::from(&profile.pacing))?;
    println!("Printed successfully!");
    Ok(())
}

#[cfg(not(unix))]
fn resolve(_address: &str, _channel: u8) -> Result<PathBuf, PhomemoError> {
    Err(PhomemoError::Transport(
        "Bluetooth printing is not supported on this platform".to_string(),
    ))
}

#[cfg(not(unix))]
fn print_to_device(
    _image: &render::BilevelImage,
    _profile: &DeviceProfile,
    _device: &Path,
) -> Result<(), PhomemoError> {
    Err(PhomemoError::Transport(
        "Bluetooth printing is not supported on this platform".to_string(),
    ))
}
