//! # Bluetooth RFCOMM Transport
//!
//! Phomemo printers expose a Serial Port Profile over Bluetooth. On Linux
//! the link is bound to a `/dev/rfcommN` TTY and written like a file.
//!
//! ## Bluetooth Setup (Linux)
//!
//! [`resolve_device`] does this automatically, but by hand it is:
//!
//! ```bash
//! $ bluetoothctl
//! [bluetooth]# scan on
//! # Note the printer address, e.g. DC:0D:30:XX:XX:XX
//! [bluetooth]# pair DC:0D:30:XX:XX:XX
//!
//! $ sudo rfcomm bind 0 DC:0D:30:XX:XX:XX 1
//! # This creates /dev/rfcomm0
//! ```
//!
//! ## TTY Configuration
//!
//! The device is switched to raw mode before the first write, see
//! [`BluetoothTransport::open`].

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::mem::MaybeUninit;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;
use std::process::{Command, Output};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::PhomemoError;

/// Highest `/dev/rfcommN` index tried when binding a new device.
const MAX_RFCOMM_INDEX: u8 = 31;

/// Settle time after `bluetoothctl connect` and `rfcomm bind`.
const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// # Bluetooth Printer Transport
///
/// An open, raw-mode RFCOMM TTY. Implements [`Write`], so it can be handed
/// straight to [`crate::printer::transmit`]. Closed on drop.
///
/// ## Example
///
/// ```no_run
/// use phomemo::printer::{self, DeviceProfile, NoPacing};
/// use phomemo::render::BilevelImage;
/// use phomemo::transport::BluetoothTransport;
///
/// let mut transport = BluetoothTransport::open("/dev/rfcomm0")?;
/// let image = BilevelImage::from_fn(560, 100, |x, y| (x + y) % 2 == 0)?;
/// printer::transmit(&image, &mut transport, &DeviceProfile::phomemo_560(), &NoPacing)?;
///
/// # Ok::<(), phomemo::error::PhomemoError>(())
/// ```
pub struct BluetoothTransport {
    file: File,
}

impl BluetoothTransport {
    /// Open a bound RFCOMM device for writing and switch it to raw mode.
    ///
    /// Fails with [`PhomemoError::Transport`] when the device is missing,
    /// not writable (usually the `dialout` group), or not a TTY.
    pub fn open<P: AsRef<Path>>(device: P) -> Result<Self, PhomemoError> {
        let path = device.as_ref();

        let file = OpenOptions::new().write(true).open(path).map_err(|e| {
            PhomemoError::Transport(format!("Failed to open {}: {}", path.display(), e))
        })?;

        configure_tty_raw(file.as_raw_fd())?;
        info!(device = %path.display(), "opened printer");

        Ok(Self { file })
    }
}

impl Write for BluetoothTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Put the TTY behind `fd` in raw mode with `cfmakeraw`.
///
/// Raster rows contain every byte value. Cooked mode would turn 0x0A into
/// CR LF, and software flow control would swallow 0x11 and 0x13, both of
/// which appear in the vendor commands as well as in dot patterns.
fn configure_tty_raw(fd: RawFd) -> Result<(), PhomemoError> {
    let tty_error = |call: &str| {
        PhomemoError::Transport(format!(
            "{} on printer TTY: {}",
            call,
            io::Error::last_os_error()
        ))
    };

    let mut attrs = MaybeUninit::<libc::termios>::uninit();
    // SAFETY: fd is an open descriptor and tcgetattr fills the whole struct on success.
    if unsafe { libc::tcgetattr(fd, attrs.as_mut_ptr()) } != 0 {
        return Err(tty_error("tcgetattr"));
    }
    // SAFETY: initialized by the successful tcgetattr above.
    let mut attrs = unsafe { attrs.assume_init() };

    // SAFETY: attrs is a valid, initialized termios.
    unsafe { libc::cfmakeraw(&mut attrs) };

    // SAFETY: fd is open and attrs is fully initialized.
    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &attrs) } != 0 {
        return Err(tty_error("tcsetattr"));
    }
    Ok(())
}

// ============================================================================
// RFCOMM SETUP HELPERS
// ============================================================================

/// `true` for six colon-separated hex octets, e.g. `DC:0D:30:12:34:56`.
pub fn is_valid_mac(mac: &str) -> bool {
    let bytes = mac.as_bytes();
    bytes.len() == 17
        && bytes.iter().enumerate().all(|(i, &b)| {
            if i % 3 == 2 {
                b == b':'
            } else {
                b.is_ascii_hexdigit()
            }
        })
}

/// Find the RFCOMM device already bound to `mac` on `channel`.
///
/// `/proc/net/rfcomm` lines look like
/// `rfcomm0: 00:00:00:00:00:00 -> DC:0D:30:12:34:56 channel 1 clean`.
pub fn find_rfcomm_for_mac(mac: &str, channel: u8) -> Option<String> {
    let contents = fs::read_to_string("/proc/net/rfcomm").ok()?;
    parse_rfcomm_table(&contents, mac, channel)
        .map(|dev| format!("/dev/{}", dev))
        .filter(|path| Path::new(path).exists())
}

fn parse_rfcomm_table(contents: &str, mac: &str, channel: u8) -> Option<String> {
    let mac_upper = mac.to_uppercase();
    let channel = channel.to_string();

    contents
        .lines()
        .filter(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let on_channel = fields
                .windows(2)
                .any(|w| w[0] == "channel" && w[1] == channel);
            on_channel && fields.iter().any(|f| f.eq_ignore_ascii_case(&mac_upper))
        })
        .find_map(|line| line.split(':').next().map(|dev| dev.trim().to_string()))
        .filter(|dev| dev.starts_with("rfcomm"))
}

/// Bind a fresh `/dev/rfcommN` to `mac` on `channel`.
///
/// Connects with `bluetoothctl`, checks the link with one `l2ping`, then
/// runs `rfcomm bind` on the lowest free index. `rfcomm bind` needs root.
pub fn setup_rfcomm(mac: &str, channel: u8) -> Result<String, PhomemoError> {
    let mac = mac.to_uppercase();

    let index = (0..=MAX_RFCOMM_INDEX)
        .find(|i| !Path::new(&format!("/dev/rfcomm{}", i)).exists())
        .ok_or_else(|| PhomemoError::Transport("all rfcomm indices are in use".to_string()))?;
    let device_path = format!("/dev/rfcomm{}", index);

    // Connect failures are tolerated here; l2ping is the real check.
    info!(address = %mac, "connecting");
    let connect = run("bluetoothctl", &["connect", &mac])?;
    let reply = String::from_utf8_lossy(&connect.stdout);
    if !reply.contains("Connection successful") && !reply.contains("already connected") {
        warn!(reply = %reply.trim(), "bluetoothctl did not confirm the connection");
    }
    thread::sleep(SETTLE_DELAY);

    require_success(run("l2ping", &["-c", "1", &mac])?, &format!("{} is unreachable", mac))?;

    info!(device = %device_path, channel, "binding rfcomm");
    require_success(
        run("rfcomm", &["bind", &index.to_string(), &mac, &channel.to_string()])?,
        "rfcomm bind",
    )?;
    thread::sleep(SETTLE_DELAY);

    if Path::new(&device_path).exists() {
        Ok(device_path)
    } else {
        Err(PhomemoError::Transport(format!(
            "rfcomm bind succeeded but {} is missing",
            device_path
        )))
    }
}

fn require_success(output: Output, what: &str) -> Result<(), PhomemoError> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(PhomemoError::Transport(format!("{}: {}", what, stderr.trim())))
}

/// Turn a printer address and RFCOMM channel into a device path, reusing an
/// existing binding when there is one.
pub fn resolve_device(mac: &str, channel: u8) -> Result<String, PhomemoError> {
    if !is_valid_mac(mac) {
        return Err(PhomemoError::Transport(format!(
            "Invalid Bluetooth address '{}'",
            mac
        )));
    }
    if let Some(device) = find_rfcomm_for_mac(mac, channel) {
        info!(%device, "using existing rfcomm binding");
        return Ok(device);
    }
    setup_rfcomm(mac, channel)
}

fn run(program: &str, args: &[&str]) -> Result<Output, PhomemoError> {
    Command::new(program)
        .args(args)
        .output()
        .map_err(|e| PhomemoError::Transport(format!("Failed to run {}: {}", program, e)))
}

// ============================================================================
// TESTS
// ============================================================================
