//! Label geometry table.
//!
//! Every media supported by the Brother QL series, keyed by the identifier the
//! user selects (`"62"`, `"29x90"`, `"d24"`, ...). Dimensions are in dots at
//! the printer's native 300 dpi.

use std::fmt;

/// How the label stock constrains the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelClass {
    /// Endless tape, the feed length follows the content.
    Continuous,
    /// Pre-cut rectangular labels.
    DieCut,
    /// Pre-cut round labels, laid out like `DieCut`.
    RoundDieCut,
}

impl LabelClass {
    pub fn is_fixed(&self) -> bool {
        !matches!(self, Self::Continuous)
    }
}

impl fmt::Display for LabelClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Continuous => "continuous",
            Self::DieCut => "die-cut",
            Self::RoundDieCut => "round die-cut",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub class: LabelClass,
    /// Tape width in millimetres, as reported to the printer.
    pub tape_width_mm: u8,
    /// Label length in millimetres, zero for continuous tape.
    pub tape_length_mm: u8,
    /// Printable dots across the feed direction.
    pub printable_width: u32,
    /// Printable dots along the feed direction, zero for continuous tape.
    pub printable_height: u32,
    /// Unused print head pins on the right hand side of the media.
    pub right_margin: u32,
}

impl LabelSpec {
    const fn continuous(
        id: &'static str,
        name: &'static str,
        tape_width_mm: u8,
        printable_width: u32,
        right_margin: u32,
    ) -> Self {
        LabelSpec {
            id,
            name,
            class: LabelClass::Continuous,
            tape_width_mm,
            tape_length_mm: 0,
            printable_width,
            printable_height: 0,
            right_margin,
        }
    }

    const fn die_cut(
        id: &'static str,
        name: &'static str,
        class: LabelClass,
        mm: (u8, u8),
        dots: (u32, u32),
        right_margin: u32,
    ) -> Self {
        LabelSpec {
            id,
            name,
            class,
            tape_width_mm: mm.0,
            tape_length_mm: mm.1,
            printable_width: dots.0,
            printable_height: dots.1,
            right_margin,
        }
    }

    /// Media printing in black and red on two colour capable printers.
    pub fn is_red(&self) -> bool {
        self.id.contains("red")
    }
}

use LabelClass::{DieCut, RoundDieCut};

const BUILTIN: &[LabelSpec] = &[
    LabelSpec::continuous("12", "12mm endless", 12, 106, 29),
    LabelSpec::continuous("29", "29mm endless", 29, 306, 6),
    LabelSpec::continuous("38", "38mm endless", 38, 413, 12),
    LabelSpec::continuous("50", "50mm endless", 50, 554, 12),
    LabelSpec::continuous("54", "54mm endless", 54, 590, 0),
    LabelSpec::continuous("62", "62mm endless", 62, 696, 12),
    LabelSpec::continuous("62red", "62mm endless (black/red/white)", 62, 696, 12),
    LabelSpec::continuous("102", "102mm endless", 102, 1164, 12),
    LabelSpec::continuous("103", "103mm endless", 103, 1200, 12),
    LabelSpec::continuous("104", "104mm endless", 104, 1200, 12),
    LabelSpec::die_cut("17x54", "17mm x 54mm die-cut", DieCut, (17, 54), (165, 566), 0),
    LabelSpec::die_cut("17x87", "17mm x 87mm die-cut", DieCut, (17, 87), (165, 956), 0),
    LabelSpec::die_cut("23x23", "23mm x 23mm die-cut", DieCut, (23, 23), (202, 202), 42),
    LabelSpec::die_cut("29x42", "29mm x 42mm die-cut", DieCut, (29, 42), (306, 425), 6),
    LabelSpec::die_cut("29x90", "29mm x 90mm die-cut", DieCut, (29, 90), (306, 991), 6),
    LabelSpec::die_cut("39x90", "38mm x 90mm die-cut", DieCut, (39, 90), (413, 991), 12),
    LabelSpec::die_cut("39x48", "39mm x 48mm die-cut", DieCut, (39, 48), (425, 495), 6),
    LabelSpec::die_cut("52x29", "52mm x 29mm die-cut", DieCut, (52, 29), (578, 271), 0),
    LabelSpec::die_cut("54x29", "54mm x 29mm die-cut", DieCut, (54, 29), (598, 271), 60),
    LabelSpec::die_cut("60x86", "60mm x 87mm die-cut", DieCut, (60, 87), (672, 954), 18),
    LabelSpec::die_cut("62x29", "62mm x 29mm die-cut", DieCut, (62, 29), (696, 271), 12),
    LabelSpec::die_cut("62x100", "62mm x 100mm die-cut", DieCut, (62, 100), (696, 1109), 12),
    LabelSpec::die_cut("102x51", "102mm x 51mm die-cut", DieCut, (102, 51), (1164, 526), 12),
    LabelSpec::die_cut("102x152", "102mm x 153mm die-cut", DieCut, (102, 153), (1164, 1660), 12),
    LabelSpec::die_cut("103x164", "104mm x 164mm die-cut", DieCut, (104, 164), (1200, 1822), 12),
    LabelSpec::die_cut("d12", "12mm round die-cut", RoundDieCut, (12, 12), (94, 94), 113),
    LabelSpec::die_cut("d24", "24mm round die-cut", RoundDieCut, (24, 24), (236, 236), 42),
    LabelSpec::die_cut("d58", "58mm round die-cut", RoundDieCut, (58, 58), (618, 618), 51),
];

/// Read-only lookup of label geometry by identifier.
#[derive(Debug, Clone)]
pub struct LabelTable {
    specs: Vec<LabelSpec>,
}

impl LabelTable {
    /// Table made of the given entries, mainly useful in tests.
    pub fn new(specs: Vec<LabelSpec>) -> Self {
        LabelTable { specs }
    }

    /// All media known to the Brother QL series.
    pub fn builtin() -> Self {
        Self::new(BUILTIN.to_vec())
    }

    pub fn get(&self, id: &str) -> Option<&LabelSpec> {
        self.specs.iter().find(|spec| spec.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabelSpec> {
        self.specs.iter()
    }
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::builtin()
    }
}
