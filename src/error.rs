//! Error types for label rendering and printing.
//!
//! This module defines all possible errors that can occur while resolving a
//! label request, rasterizing it, encoding it for the printer and sending it
//! to the device.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for label operations.
///
/// Every failure is reported to the immediate caller; no partial bitmap or
/// command buffer is ever returned alongside an error.
#[derive(Error, Debug)]
pub enum Error {
    /// The requested font family and style are not in the font catalog.
    #[error("Couldn't find the font {family:?} with style {style:?}")]
    FontNotFound { family: String, style: String },

    /// The label size identifier is not in the label table.
    #[error("Unknown label size {0:?}")]
    UnknownLabelSize(String),

    /// A print job was requested without any text.
    #[error("Please provide the text for the label")]
    MissingText,

    /// The font data could not be used to render glyphs.
    ///
    /// Retrying is pointless, the same font data fails the same way.
    #[error("Failed to rasterize label with font {path:?}")]
    Rasterization { path: PathBuf },

    /// The bitmap handed to the encoder does not match the label stock.
    #[error("Image of {width}x{height} does not fit label {label} ({expected_width}x{expected_height})")]
    InvalidImageSize {
        label: String,
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },

    /// Invalid configuration parameter provided.
    ///
    /// This error occurs when configuration values are out of range
    /// or incompatible with the selected printer model.
    #[error("Invalid configuration parameter: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to write PNG image")]
    Image(#[from] image::ImageError),

    /// USB communication error.
    ///
    /// Wraps underlying rusb errors for device communication issues,
    /// timeouts, or permission problems.
    #[error(transparent)]
    UsbError(#[from] rusb::Error),

    /// Printer device is not connected or not responding.
    #[error("Device is offline")]
    DeviceOffline,

    #[error("Device is missing endpoint")]
    MissingEndpoint,

    #[error("Received invalid response from printer")]
    InvalidResponse(usize),

    #[error("Status request return no response")]
    ReadStatusTimeout,

    /// Hardware-level printer error.
    ///
    /// Wraps printer-specific errors reported by the device itself,
    /// such as cover open, media issues, or mechanical problems.
    #[error(transparent)]
    PrinterError(PrinterError),
}

/// Hardware-specific errors reported by the printer.
///
/// These errors are parsed from the printer's status response and indicate
/// physical problems with the device that need user intervention.
#[derive(Error, Debug, PartialEq)]
pub enum PrinterError {
    #[error("No media is installed")]
    NoMedia,

    #[error("End of media")]
    EndOfMedia,

    #[error("Cutter jam")]
    CutterJam,

    #[error("Printer is in use")]
    PrinterInUse,

    #[error("Printer is offline")]
    PrinterOffline,

    #[error("Installed media is not match")]
    InvalidMedia,

    #[error("Expansion buffer is full")]
    BufferFull,

    #[error("Communication error")]
    CommunicationError,

    #[error("Cover is open")]
    CoverOpen,

    #[error("Media can not be fed")]
    FeedMediaFail,

    #[error("System error")]
    SystemError,

    #[error("Unknown error")]
    UnknownError((u8, u8)),
}

impl PrinterError {
    /// Parse printer error from 32-byte status buffer.
    ///
    /// Analyzes bytes 8 and 9 of the printer status response to determine
    /// the specific error condition reported by the hardware.
    pub fn from_buf(buf: [u8; 32]) -> Self {
        let err_1 = buf[8];
        let err_2 = buf[9];

        match err_1 {
            0b0000_0001 => Self::NoMedia,
            0b0000_0010 => Self::EndOfMedia,
            0b0000_0100 => Self::CutterJam,
            0b0001_0000 => Self::PrinterInUse,
            0b0010_0000 => Self::PrinterOffline,
            _ => match err_2 {
                0b0000_0001 => Self::InvalidMedia,
                0b0000_0010 => Self::BufferFull,
                0b0000_0100 => Self::CommunicationError,
                0b0001_0000 => Self::CoverOpen,
                0b0100_0000 => Self::FeedMediaFail,
                0b1000_0000 => Self::SystemError,
                _ => Self::UnknownError((err_1, err_2)),
            },
        }
    }

    /// Returns `true` if the printer is reporting no error condition.
    pub fn is_no_error(&self) -> bool {
        matches!(self, Self::UnknownError((0, 0)))
    }
}
