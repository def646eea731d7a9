//! Serial port communication implementation
//!
//! Provides the raw-mode TTY link used for direct hardware connection to
//! motion controllers via USB or RS-232.
//!
//! Supports:
//! - Port enumeration and discovery
//! - Baud rate selection from a closed whitelist
//! - 8-N-1 framing, no hardware or software flow control
//! - Non-canonical blocking reads (VMIN=1, VTIME=1)

use super::descriptor::{BaudRate, TtySpec};
use super::readiness::poll_readable;
use super::{MachineLink, Readiness};
use gcodestream_core::{ConnectionError, Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::mem::MaybeUninit;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::Duration;

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct SerialPortInfo {
    /// Port name (e.g., "/dev/ttyUSB0", "COM3")
    pub port_name: String,

    /// Port description (e.g., "USB Serial Port")
    pub description: String,

    /// Manufacturer name if available
    pub manufacturer: Option<String>,

    /// Serial number if available
    pub serial_number: Option<String>,

    /// USB vendor ID if applicable
    pub vid: Option<u16>,

    /// USB product ID if applicable
    pub pid: Option<u16>,
}

impl SerialPortInfo {
    /// Create a new port info
    pub fn new(port_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            description: description.into(),
            manufacturer: None,
            serial_number: None,
            vid: None,
            pid: None,
        }
    }

    /// Set manufacturer
    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    /// Set serial number
    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = Some(serial_number.into());
        self
    }

    /// Set USB IDs
    pub fn with_usb_ids(mut self, vid: u16, pid: u16) -> Self {
        self.vid = Some(vid);
        self.pid = Some(pid);
        self
    }

    /// Descriptor string that would open this port at the default speed
    pub fn descriptor(&self) -> String {
        format!("{},b{}", self.port_name, BaudRate::default())
    }
}

/// List serial ports that look like motion controllers
///
/// Filters the system port list down to:
/// - Windows: COM* (e.g., COM1, COM3)
/// - Linux: /dev/ttyUSB*, /dev/ttyACM*
/// - macOS: /dev/cu.usbserial-*, /dev/cu.usbmodem*
pub fn list_ports() -> Result<Vec<SerialPortInfo>> {
    match serialport::available_ports() {
        Ok(ports) => {
            let port_infos: Vec<SerialPortInfo> = ports
                .iter()
                .filter(|port| is_valid_cnc_port(&port.port_name))
                .map(|port| {
                    let info = SerialPortInfo::new(&port.port_name, get_port_description(port));

                    match &port.port_type {
                        serialport::SerialPortType::UsbPort(usb_info) => {
                            let mut info = info.with_usb_ids(usb_info.vid, usb_info.pid);
                            if let Some(ref mfg) = usb_info.manufacturer {
                                info = info.with_manufacturer(mfg);
                            }
                            if let Some(ref serial) = usb_info.serial_number {
                                info = info.with_serial_number(serial);
                            }
                            info
                        }
                        _ => info,
                    }
                })
                .collect();

            Ok(port_infos)
        }
        Err(e) => {
            tracing::error!("Failed to enumerate serial ports: {}", e);
            Err(Error::other(format!("Failed to enumerate ports: {}", e)))
        }
    }
}

fn is_valid_cnc_port(port_name: &str) -> bool {
    if let Some(number) = port_name.strip_prefix("COM") {
        return !number.is_empty() && number.chars().all(|c| c.is_ascii_digit());
    }

    port_name.starts_with("/dev/ttyUSB")
        || port_name.starts_with("/dev/ttyACM")
        || port_name.starts_with("/dev/cu.usbserial-")
        || port_name.starts_with("/dev/cu.usbmodem")
}

fn get_port_description(port: &serialport::SerialPortInfo) -> String {
    match &port.port_type {
        serialport::SerialPortType::UsbPort(usb_info) => {
            format!(
                "USB {} {}",
                usb_info.manufacturer.as_deref().unwrap_or("Device"),
                usb_info.product.as_deref().unwrap_or("Serial Port")
            )
        }
        serialport::SerialPortType::BluetoothPort => "Bluetooth Serial".to_string(),
        serialport::SerialPortType::PciPort => "PCI Serial".to_string(),
        _ => "Serial Port".to_string(),
    }
}

/// A raw-mode serial TTY
pub struct TtyLink {
    file: File,
    path: String,
    baud_rate: BaudRate,
}

impl TtyLink {
    /// Open and configure the device named by `spec`
    ///
    /// The path is opened read-write, without becoming the controlling
    /// terminal, with synchronous writes. Failing to open or configure the
    /// path yields an error that lets bare descriptors fall through to TCP;
    /// an unsupported baud suffix does not.
    pub fn open(spec: &TtySpec) -> std::result::Result<Self, ConnectionError> {
        let path = spec.path().display().to_string();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_SYNC)
            .open(spec.path())
            .map_err(|e| ConnectionError::FailedToOpen {
                port: path.clone(),
                reason: e.to_string(),
            })?;

        // the file is closed on every early return below
        let baud_rate = spec.baud_rate()?;

        configure_tty(file.as_raw_fd(), baud_rate).map_err(|e| {
            tracing::debug!("tcgetattr/tcsetattr failed on {}: {}", path, e);
            ConnectionError::SerialError {
                port: path.clone(),
                reason: e.to_string(),
            }
        })?;

        tracing::info!("Opened serial port {} at {} baud", path, baud_rate);

        Ok(Self {
            file,
            path,
            baud_rate,
        })
    }

    /// Configured speed
    pub fn baud_rate(&self) -> BaudRate {
        self.baud_rate
    }
}

impl Read for TtyLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for TtyLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl MachineLink for TtyLink {
    fn await_read_ready(&mut self, timeout: Duration) -> io::Result<Readiness> {
        poll_readable(self.file.as_raw_fd(), timeout)
    }

    fn describe(&self) -> String {
        format!("{},b{}", self.path, self.baud_rate)
    }
}

fn speed_constant(baud_rate: BaudRate) -> io::Result<libc::speed_t> {
    let speed = match baud_rate {
        BaudRate::B9600 => libc::B9600,
        BaudRate::B19200 => libc::B19200,
        BaudRate::B38400 => libc::B38400,
        BaudRate::B57600 => libc::B57600,
        BaudRate::B115200 => libc::B115200,
        BaudRate::B230400 => libc::B230400,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        BaudRate::B460800 => libc::B460800,
        #[cfg(not(any(target_os = "linux", target_os = "android")))]
        BaudRate::B460800 => {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "460800 baud is not available on this platform",
            ))
        }
    };
    Ok(speed)
}

/// Put a TTY into 8-N-1 raw mode at the given speed.
///
/// Input: no break handling, parity marking, stripping, CR/LF translation
/// or XON/XOFF. Output: no post-processing. Local: no echo, canonical mode
/// or signals. Reads return once one byte is available, with a 0.1 s
/// inter-byte timer.
fn configure_tty(fd: RawFd, baud_rate: BaudRate) -> io::Result<()> {
    let mut tty = MaybeUninit::<libc::termios>::uninit();
    if unsafe { libc::tcgetattr(fd, tty.as_mut_ptr()) } < 0 {
        return Err(io::Error::last_os_error());
    }
    let mut tty = unsafe { tty.assume_init() };

    let speed = speed_constant(baud_rate)?;
    if unsafe { libc::cfsetospeed(&mut tty, speed) } != 0
        || unsafe { libc::cfsetispeed(&mut tty, speed) } != 0
    {
        return Err(io::Error::last_os_error());
    }

    tty.c_cflag |= libc::CLOCAL | libc::CREAD;
    tty.c_cflag &= !libc::CSIZE;
    tty.c_cflag |= libc::CS8;
    tty.c_cflag &= !libc::PARENB;
    tty.c_cflag &= !libc::CSTOPB;
    tty.c_cflag &= !libc::CRTSCTS;

    tty.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON);
    tty.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
    tty.c_oflag &= !libc::OPOST;

    tty.c_cc[libc::VMIN] = 1;
    tty.c_cc[libc::VTIME] = 1;

    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &tty) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cnc_port_filter() {
        assert!(is_valid_cnc_port("/dev/ttyUSB0"));
        assert!(is_valid_cnc_port("/dev/ttyACM3"));
        assert!(is_valid_cnc_port("/dev/cu.usbmodem14101"));
        assert!(is_valid_cnc_port("COM7"));
        assert!(!is_valid_cnc_port("COM"));
        assert!(!is_valid_cnc_port("/dev/ttyS0"));
        assert!(!is_valid_cnc_port("/dev/rfcomm0"));
    }

    #[test]
    fn test_every_whitelisted_speed_maps() {
        for rate in BaudRate::ALL {
            #[cfg(not(any(target_os = "linux", target_os = "android")))]
            if rate == BaudRate::B460800 {
                continue;
            }
            assert!(speed_constant(rate).is_ok(), "{} should map", rate);
        }
    }

    #[test]
    fn test_regular_file_is_not_a_tty() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let spec = TtySpec::parse(&file.path().display().to_string());
        let err = TtyLink::open(&spec).err().expect("a plain file is not a TTY");
        assert!(matches!(err, ConnectionError::SerialError { .. }));
        assert!(err.falls_through_to_tcp());
    }

    #[test]
    fn test_bad_baud_on_open_path_is_fatal() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let spec = TtySpec::parse(&format!("{},b12345", file.path().display()));
        let err = TtyLink::open(&spec).err().expect("12345 is not a supported speed");
        assert!(matches!(err, ConnectionError::UnsupportedBaudRate { .. }));
        assert!(!err.falls_through_to_tcp());
    }

    #[test]
    fn test_missing_path() {
        let spec = TtySpec::parse("/nonexistent/ttyUSB9,b9600");
        let err = TtyLink::open(&spec).err().unwrap();
        assert!(matches!(err, ConnectionError::FailedToOpen { .. }));
    }

    #[test]
    fn test_port_info_descriptor() {
        let info = SerialPortInfo::new("/dev/ttyACM0", "USB Serial").with_usb_ids(0x2341, 0x0043);
        assert_eq!(info.descriptor(), "/dev/ttyACM0,b115200");
        assert_eq!(info.vid, Some(0x2341));
    }
}
