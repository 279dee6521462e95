//! Delivery of encoded print jobs to a printer.
//!
//! A printer is addressed by a descriptor string:
//!
//! * `tcp://192.168.0.23:9100` for network printers (port defaults to 9100),
//! * `file:///dev/usb/lp0` for the kernel's printer device,
//! * `usb://000G2G844181` to talk to the printer directly over libusb, the
//!   serial number is optional.

use log::{debug, info};
use rusb::{Context, Device, DeviceDescriptor, DeviceHandle, Direction, TransferType, UsbContext};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::net::TcpStream;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::{
    error::{Error, PrinterError},
    model::Model,
};

const BROTHER_VENDOR_ID: u16 = 0x04F9;
const DEFAULT_PORT: u16 = 9100;

pub trait Transport {
    fn send(&mut self, data: &[u8]) -> Result<(), Error>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrinterAddress {
    Network { host: String, port: u16 },
    File(PathBuf),
    Usb { serial: Option<String> },
}

impl FromStr for PrinterAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix("tcp://") {
            let rest = rest.trim_end_matches('/');
            let (host, port) = match rest.rsplit_once(':') {
                Some((host, port)) => {
                    let port = port.parse().map_err(|_| {
                        Error::InvalidConfig(format!("invalid port in printer {:?}", s))
                    })?;
                    (host, port)
                }
                None => (rest, DEFAULT_PORT),
            };
            if host.is_empty() {
                return Err(Error::InvalidConfig(format!("missing host in printer {:?}", s)));
            }
            Ok(Self::Network {
                host: host.to_string(),
                port,
            })
        } else if let Some(path) = s.strip_prefix("file://") {
            Ok(Self::File(PathBuf::from(path)))
        } else if let Some(serial) = s.strip_prefix("usb://") {
            let serial = serial.trim_end_matches('/');
            Ok(Self::Usb {
                serial: if serial.is_empty() {
                    None
                } else {
                    Some(serial.to_string())
                },
            })
        } else {
            Err(Error::InvalidConfig(format!(
                "couldn't guess the backend to use from the printer {:?}",
                s
            )))
        }
    }
}

/// Open the printer named by `descriptor`.
pub fn open(descriptor: &str, model: Model) -> Result<Box<dyn Transport>, Error> {
    let transport: Box<dyn Transport> = match descriptor.parse::<PrinterAddress>()? {
        PrinterAddress::Network { host, port } => Box::new(NetworkPrinter::connect(&host, port)?),
        PrinterAddress::File(path) => Box::new(FilePrinter::open(path)?),
        PrinterAddress::Usb { serial } => Box::new(UsbPrinter::open(model, serial)?),
    };
    Ok(transport)
}

pub struct NetworkPrinter {
    stream: TcpStream,
}

impl NetworkPrinter {
    pub fn connect(host: &str, port: u16) -> Result<Self, Error> {
        info!("Connecting to printer at {}:{}", host, port);
        let stream = TcpStream::connect((host, port))?;
        stream.set_write_timeout(Some(Duration::from_secs(10)))?;
        Ok(NetworkPrinter { stream })
    }
}

impl Transport for NetworkPrinter {
    fn send(&mut self, data: &[u8]) -> Result<(), Error> {
        self.stream.write_all(data)?;
        self.stream.flush()?;
        debug!("Sent {} bytes over the network", data.len());
        Ok(())
    }
}

pub struct FilePrinter {
    file: File,
    path: PathBuf,
}

impl FilePrinter {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        info!("Opening printer device {:?}", path);
        // The device node must exist, a typo must not leave a regular file behind.
        let file = OpenOptions::new().write(true).open(&path)?;
        Ok(FilePrinter { file, path })
    }
}

impl Transport for FilePrinter {
    fn send(&mut self, data: &[u8]) -> Result<(), Error> {
        self.file.write_all(data)?;
        self.file.flush()?;
        debug!("Wrote {} bytes to {:?}", data.len(), self.path);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Endpoint {
    config: u8,
    iface: u8,
    setting: u8,
    address: u8,
}

pub struct UsbPrinter {
    handle: Box<DeviceHandle<Context>>,
    endpoint_out: Endpoint,
    endpoint_in: Endpoint,
}

impl UsbPrinter {
    /// Open the first Brother printer of `model`, or the one with `serial`.
    pub fn open(model: Model, serial: Option<String>) -> Result<Self, Error> {
        let mut context = Context::new()?;
        let (mut device, device_desc, mut handle) =
            match Self::open_device(&mut context, BROTHER_VENDOR_ID, model.pid(), &serial) {
                Ok(found) => found,
                Err(err) => {
                    debug!("{:?}", err);
                    return Err(Error::DeviceOffline);
                }
            };
        handle.reset()?;

        let endpoint_in =
            Self::find_endpoint(&mut device, &device_desc, Direction::In, TransferType::Bulk)
                .ok_or(Error::MissingEndpoint)?;
        let endpoint_out =
            Self::find_endpoint(&mut device, &device_desc, Direction::Out, TransferType::Bulk)
                .ok_or(Error::MissingEndpoint)?;

        // Some models (QL-800) bind a kernel driver that has to be detached first.
        handle.set_auto_detach_kernel_driver(true)?;
        let has_kernel_driver = matches!(handle.kernel_driver_active(endpoint_out.iface), Ok(true));
        info!("Kernel driver support is {}", has_kernel_driver);
        handle.set_active_configuration(endpoint_out.config)?;
        handle.claim_interface(endpoint_out.iface)?;
        handle.set_alternate_setting(endpoint_out.iface, endpoint_out.setting)?;

        Ok(UsbPrinter {
            handle: Box::new(handle),
            endpoint_out,
            endpoint_in,
        })
    }

    fn open_device(
        context: &mut Context,
        vid: u16,
        pid: u16,
        serial: &Option<String>,
    ) -> Result<(Device<Context>, DeviceDescriptor, DeviceHandle<Context>), Error> {
        let devices = context.devices()?;

        for device in devices.iter() {
            let device_desc = match device.device_descriptor() {
                Ok(d) => d,
                Err(err) => {
                    debug!("{:?}", err);
                    continue;
                }
            };

            if device_desc.vendor_id() != vid || device_desc.product_id() != pid {
                continue;
            }
            let handle = match device.open() {
                Ok(handle) => handle,
                Err(err) => {
                    debug!("Failed to open device: {:?}", err);
                    continue;
                }
            };
            let wanted = match serial {
                Some(wanted) => wanted,
                None => return Ok((device, device_desc, handle)),
            };

            let timeout = Duration::from_secs(1);
            let languages = handle.read_languages(timeout)?;
            if let Some(language) = languages.first() {
                match handle.read_serial_number_string(*language, &device_desc, timeout) {
                    Ok(s) if &s == wanted => return Ok((device, device_desc, handle)),
                    Ok(_) => continue,
                    Err(err) => {
                        debug!("Failed to read serial number string: {:?}", err);
                        continue;
                    }
                }
            }
        }
        debug!("No device match with this serial: {:?}", serial);
        Err(Error::DeviceOffline)
    }

    fn find_endpoint(
        device: &mut Device<Context>,
        device_desc: &DeviceDescriptor,
        direction: Direction,
        transfer_type: TransferType,
    ) -> Option<Endpoint> {
        for n in 0..device_desc.num_configurations() {
            let config_desc = match device.config_descriptor(n) {
                Ok(c) => c,
                Err(_) => continue,
            };
            for interface in config_desc.interfaces() {
                for interface_desc in interface.descriptors() {
                    for endpoint_desc in interface_desc.endpoint_descriptors() {
                        if endpoint_desc.direction() == direction
                            && endpoint_desc.transfer_type() == transfer_type
                        {
                            return Some(Endpoint {
                                config: config_desc.number(),
                                iface: interface_desc.interface_number(),
                                setting: interface_desc.setting_number(),
                                address: endpoint_desc.address(),
                            });
                        }
                    }
                }
            }
        }
        None
    }

    fn write(&self, buf: &[u8]) -> Result<usize, Error> {
        let timeout = Duration::from_secs(10);
        let n = self
            .handle
            .write_bulk(self.endpoint_out.address, buf, timeout)?;
        if n == buf.len() {
            Ok(n)
        } else {
            debug!(
                "write error: bytes wrote {} != bytes supplied {}, possibly timeout ?",
                n,
                buf.len()
            );
            Err(Error::InvalidResponse(n))
        }
    }

    /// Ask the printer for its status and wait until it is idle again.
    pub fn check_status(&self) -> Result<Status, Error> {
        let mut buf = [0x00; 400].to_vec();
        buf.append(&mut [0x1B, 0x40, 0x1B, 0x69, 0x53].to_vec()); // ESC i S : Status request
        self.write(&buf)?;
        self.read_status()
    }

    fn read_status(&self) -> Result<Status, Error> {
        let timeout = Duration::from_secs(1);
        let mut buf: [u8; 32] = [0x00; 32];

        for _ in 0..10 {
            match self
                .handle
                .read_bulk(self.endpoint_in.address, &mut buf, timeout)
            {
                Ok(32) => {
                    let status = Status::from_buf(buf);
                    debug!("Raw status code: {:X?}", buf);
                    debug!("Parsed Status struct: {:?}", status);
                    if !status.error.is_no_error() {
                        return Err(Error::PrinterError(status.error));
                    }
                    if status.phase == Phase::Receiving {
                        return Ok(status);
                    }
                }
                Ok(_) => {}
                Err(rusb::Error::Timeout) => {}
                Err(e) => return Err(Error::UsbError(e)),
            };
            std::thread::sleep(Duration::from_secs(1));
        }
        Err(Error::ReadStatusTimeout)
    }
}

impl Transport for UsbPrinter {
    fn send(&mut self, data: &[u8]) -> Result<(), Error> {
        self.check_status()?;
        let n = self.write(data)?;
        info!("Sent {} bytes to the printer", n);
        self.read_status()?;
        Ok(())
    }
}

/// Status received from the printer encoded to Rust friendly type.
#[derive(Debug)]
pub struct Status {
    model: Option<Model>,
    error: PrinterError,
    media_width: u8,
    media_length: u8,
    phase: Phase,
}

impl Status {
    fn from_buf(buf: [u8; 32]) -> Self {
        Status {
            model: Model::from_code(buf[4]),
            error: PrinterError::from_buf(buf),
            media_width: buf[10],
            media_length: buf[17],
            phase: Phase::from_buf(buf),
        }
    }

    pub fn model(&self) -> Option<Model> {
        self.model
    }

    /// Installed media width and length in millimetres, length is zero for continuous tape.
    pub fn media_mm(&self) -> (u8, u8) {
        (self.media_width, self.media_length)
    }
}

#[derive(Debug, PartialEq)]
enum Phase {
    Receiving,
    Printing,
}

impl Phase {
    fn from_buf(buf: [u8; 32]) -> Self {
        match buf[19] {
            0x00 => Self::Receiving,
            _ => Self::Printing,
        }
    }
}
