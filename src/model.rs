use std::fmt;
use std::str::FromStr;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model {
    QL500,
    QL550,
    QL560,
    QL570,
    QL580N,
    QL600,
    QL650TD,
    QL700,
    QL710W,
    QL720NW, // TESTED
    QL800,   // TESTED
    QL810W,
    QL820NWB, //TESTED
    QL1050,
    QL1060N,
    QL1100,
    QL1110NWB,
    QL1115NWB,
}

const ALL: [Model; 18] = [
    Model::QL500,
    Model::QL550,
    Model::QL560,
    Model::QL570,
    Model::QL580N,
    Model::QL600,
    Model::QL650TD,
    Model::QL700,
    Model::QL710W,
    Model::QL720NW,
    Model::QL800,
    Model::QL810W,
    Model::QL820NWB,
    Model::QL1050,
    Model::QL1060N,
    Model::QL1100,
    Model::QL1110NWB,
    Model::QL1115NWB,
];

impl Model {
    pub fn all() -> impl Iterator<Item = Model> {
        ALL.iter().copied()
    }

    /// Model from the code reported in byte 4 of the status buffer.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x47 => Some(Self::QL600),
            0x37 => Some(Self::QL720NW),
            0x38 => Some(Self::QL800),
            0x39 => Some(Self::QL810W),
            0x41 => Some(Self::QL820NWB),
            0x43 => Some(Self::QL1100),
            0x44 => Some(Self::QL1110NWB),
            0x45 => Some(Self::QL1115NWB),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::QL500 => "QL-500",
            Self::QL550 => "QL-550",
            Self::QL560 => "QL-560",
            Self::QL570 => "QL-570",
            Self::QL580N => "QL-580N",
            Self::QL600 => "QL-600",
            Self::QL650TD => "QL-650TD",
            Self::QL700 => "QL-700",
            Self::QL710W => "QL-710W",
            Self::QL720NW => "QL-720NW",
            Self::QL800 => "QL-800",
            Self::QL810W => "QL-810W",
            Self::QL820NWB => "QL-820NWB",
            Self::QL1050 => "QL-1050",
            Self::QL1060N => "QL-1060N",
            Self::QL1100 => "QL-1100",
            Self::QL1110NWB => "QL-1110NWB",
            Self::QL1115NWB => "QL-1115NWB",
        }
    }

    /// USB product id, `0x0000` for models never seen on USB.
    pub fn pid(&self) -> u16 {
        match self {
            Self::QL500 => 0x2015,
            Self::QL550 => 0x2016,
            Self::QL560 => 0x2027,
            Self::QL570 => 0x2028,
            Self::QL580N => 0x2029,
            Self::QL600 => 0x20C0,
            Self::QL650TD => 0x201B,
            Self::QL700 => 0x2042,
            Self::QL710W => 0x2043,
            Self::QL720NW => 0x2044,
            Self::QL800 => 0x209b,
            Self::QL810W => 0x209c,
            Self::QL820NWB => 0x209d,
            Self::QL1050 => 0x2020,
            Self::QL1060N => 0x202A,
            Self::QL1100 => 0x20A7,
            Self::QL1110NWB => 0x20A8,
            Self::QL1115NWB => 0x20AB,
        }
    }

    /// Number of print head pins, i.e. dots per raster line.
    pub fn pins(&self) -> u32 {
        match self {
            Self::QL1050 => crate::WIDE_PRINTER_WIDTH,
            Self::QL1060N => crate::WIDE_PRINTER_WIDTH,
            Self::QL1100 => crate::WIDE_PRINTER_WIDTH,
            Self::QL1110NWB => crate::WIDE_PRINTER_WIDTH,
            Self::QL1115NWB => crate::WIDE_PRINTER_WIDTH,
            _ => crate::NORMAL_PRINTER_WIDTH,
        }
    }

    /// Black and red printing on DK-22251 tape.
    pub fn two_color(&self) -> bool {
        matches!(self, Self::QL800 | Self::QL810W | Self::QL820NWB)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Model {
    type Err = Error;

    /// Accepts `QL-820NWB` as well as `ql820nwb`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| *c != '-')
            .collect::<String>()
            .to_uppercase();
        Model::all()
            .find(|model| model.name().replace('-', "") == wanted)
            .ok_or_else(|| Error::InvalidConfig(format!("unknown printer model {:?}", s)))
    }
}
