//! Brother QL raster command encoding.
//!
//! Turns a rendered label bitmap into the byte stream understood by the
//! printer: initialisation, print information, cut and margin settings, one
//! raster command per line and the final print command.

use bitflags::bitflags;
use image::{imageops, Rgb, RgbImage};
use log::debug;

use crate::{
    context::Orientation,
    error::Error,
    labels::{LabelClass, LabelSpec},
    model::Model,
};

/// Packed raster lines, one `Vec<u8>` of `pins / 8` bytes per row.
type Matrix = Vec<Vec<u8>>;

/// Feed margin in dots for continuous tape.
const CONTINUOUS_FEED: u16 = 35;

bitflags! {
    /// `ESC i z` valid flags.
    struct PrintInfo: u8 {
        const KIND = 0x02;
        const WIDTH = 0x04;
        const LENGTH = 0x08;
        const RECOVER = 0x80;
    }
}

bitflags! {
    /// `ESC i M` various mode.
    struct VariousMode: u8 {
        const AUTO_CUT = 0b0100_0000;
    }
}

bitflags! {
    /// `ESC i K` expanded mode.
    struct ExpandedMode: u8 {
        const TWO_COLORS = 0b0000_0001;
        const CUT_AT_END = 0b0000_1000;
        const HIGH_RESOLUTION = 0b0100_0000;
    }
}

/// How the bitmap is turned before it is sent line by line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotate {
    Degrees0,
    /// Counter-clockwise.
    Degrees90,
    /// Turn die-cut labels whose bitmap is transposed with respect to the stock.
    Auto,
}

impl Rotate {
    pub fn for_label(class: LabelClass, orientation: Orientation) -> Self {
        match (class, orientation) {
            (LabelClass::Continuous, Orientation::Standard) => Self::Degrees0,
            (LabelClass::Continuous, Orientation::Rotated) => Self::Degrees90,
            (LabelClass::DieCut, _) | (LabelClass::RoundDieCut, _) => Self::Auto,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PrintOptions {
    red: bool,
    threshold: u8,
    cut: bool,
    rotate: Rotate,
    compress: bool,
    high_resolution: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        PrintOptions {
            red: false,
            threshold: 70,
            cut: true,
            rotate: Rotate::Auto,
            compress: false,
            high_resolution: false,
        }
    }
}

impl PrintOptions {
    /// Print black and red, the model must support two colours.
    pub fn red(self, red: bool) -> Self {
        PrintOptions { red, ..self }
    }

    /// Percentage of darkness below which a pixel stays blank, `0..=100`.
    pub fn threshold(self, threshold: u8) -> Self {
        PrintOptions {
            threshold: threshold.min(100),
            ..self
        }
    }

    pub fn cut(self, cut: bool) -> Self {
        PrintOptions { cut, ..self }
    }

    pub fn rotate(self, rotate: Rotate) -> Self {
        PrintOptions { rotate, ..self }
    }

    /// Pack raster lines with PackBits.
    pub fn compress(self, compress: bool) -> Self {
        PrintOptions { compress, ..self }
    }

    /// Print 600 dpi along the feed axis, every line of the bitmap is sent twice.
    pub fn high_resolution(self, high_resolution: bool) -> Self {
        PrintOptions {
            high_resolution,
            ..self
        }
    }
}

/// Encode `image` as a complete print job for `label` on `model`.
pub fn encode(
    image: &RgbImage,
    label: &LabelSpec,
    model: Model,
    options: &PrintOptions,
) -> Result<Vec<u8>, Error> {
    if options.red && !model.two_color() {
        return Err(Error::InvalidConfig(format!(
            "{} can not print two colors",
            model
        )));
    }
    let pins = model.pins();
    if label.printable_width + label.right_margin > pins {
        return Err(Error::InvalidConfig(format!(
            "label {} is too wide for {}",
            label.id, model
        )));
    }

    let image = orient(image, label, options.rotate);
    check_size(&image, label)?;

    let (black, red) = split_planes(&image, options.threshold, options.red);
    let mut black = raster_rows(&black, image.width(), pins, label.right_margin);
    let mut red = red.map(|plane| raster_rows(&plane, image.width(), pins, label.right_margin));
    if options.high_resolution {
        black = double_rows(black);
        red = red.map(double_rows);
    }

    let mut buf: Vec<u8> = Vec::new();
    buf.append(&mut [0x00; 400].to_vec()); // Invalidate
    buf.append(&mut [0x1B, 0x40].to_vec()); // ESC @ : Initialize
    buf.append(&mut [0x1B, 0x69, 0x61, 0x01].to_vec()); // Set raster command mode
    buf.append(&mut [0x1B, 0x69, 0x21, 0x00].to_vec()); // Set auto status notification mode

    // ESC i z : Print information
    {
        let flags = PrintInfo::KIND | PrintInfo::WIDTH | PrintInfo::LENGTH | PrintInfo::RECOVER;
        let media_type: u8 = match label.class {
            LabelClass::Continuous => 0x0A,
            LabelClass::DieCut | LabelClass::RoundDieCut => 0x0B,
        };
        buf.append(&mut [0x1B, 0x69, 0x7A, flags.bits(), media_type].to_vec());
        buf.append(&mut [label.tape_width_mm, label.tape_length_mm].to_vec());
        buf.append(&mut (black.len() as u32).to_le_bytes().to_vec());
        buf.append(&mut [0x00, 0x00].to_vec());
    }
    // Set auto cut settings
    {
        let mut various_mode = VariousMode::empty();
        if options.cut {
            various_mode |= VariousMode::AUTO_CUT;
        }
        debug!("Various mode: {:X}", various_mode.bits());
        buf.append(&mut [0x1B, 0x69, 0x4D, various_mode.bits()].to_vec()); // ESC i M : Set various mode
        if options.cut {
            buf.append(&mut [0x1B, 0x69, 0x41, 0x01].to_vec()); // ESC i A : Set auto cut number
        }
    }
    // Set expanded mode
    {
        let mut expanded_mode = ExpandedMode::empty();
        if red.is_some() {
            expanded_mode |= ExpandedMode::TWO_COLORS;
        }
        if options.cut {
            expanded_mode |= ExpandedMode::CUT_AT_END;
        }
        if options.high_resolution {
            expanded_mode |= ExpandedMode::HIGH_RESOLUTION;
        }
        debug!("Expanded mode: {:X}", expanded_mode.bits());
        buf.append(&mut [0x1B, 0x69, 0x4B, expanded_mode.bits()].to_vec()); // ESC i K : Set expanded mode
    }
    // Set feeding values in dots
    {
        let feed = match label.class {
            LabelClass::Continuous if options.high_resolution => CONTINUOUS_FEED * 2,
            LabelClass::Continuous => CONTINUOUS_FEED,
            _ => 0,
        };
        buf.append(&mut [0x1B, 0x69, 0x64].to_vec());
        buf.append(&mut feed.to_le_bytes().to_vec());
    }

    let compress = options.compress && red.is_none();
    if compress {
        buf.append(&mut [0x4D, 0x02].to_vec()); // Set to pack bits compression mode
    } else {
        buf.append(&mut [0x4D, 0x00].to_vec()); // Set to no compression mode
    }

    let row_len = (pins / 8) as u8;
    match red {
        Some(red) => {
            for (mut black_row, mut red_row) in black.into_iter().zip(red.into_iter()) {
                buf.append(&mut [0x77, 0x01, row_len].to_vec());
                buf.append(&mut black_row);
                buf.append(&mut [0x77, 0x02, row_len].to_vec());
                buf.append(&mut red_row);
            }
        }
        None if compress => {
            for row in black {
                let mut packed = pack_bits(&row);
                buf.append(&mut [0x67, 0x00, packed.len() as u8].to_vec());
                buf.append(&mut packed);
            }
        }
        None => {
            for mut row in black {
                buf.append(&mut [0x67, 0x00, row_len].to_vec());
                buf.append(&mut row);
            }
        }
    }

    buf.push(0x1A); // Control-Z : Print then Eject
    debug!("Encoded {} bytes for label {}", buf.len(), label.id);
    Ok(buf)
}

fn orient(image: &RgbImage, label: &LabelSpec, rotate: Rotate) -> RgbImage {
    match rotate {
        Rotate::Degrees0 => image.clone(),
        Rotate::Degrees90 => imageops::rotate270(image),
        Rotate::Auto => {
            let transposed = label.class.is_fixed()
                && image.width() == label.printable_height
                && image.height() == label.printable_width;
            if transposed {
                imageops::rotate270(image)
            } else {
                image.clone()
            }
        }
    }
}

fn check_size(image: &RgbImage, label: &LabelSpec) -> Result<(), Error> {
    let fits_width = image.width() == label.printable_width;
    let fits_height = match label.class {
        LabelClass::Continuous => image.height() > 0,
        _ => image.height() == label.printable_height,
    };
    if fits_width && fits_height {
        Ok(())
    } else {
        Err(Error::InvalidImageSize {
            label: label.id.to_string(),
            width: image.width(),
            height: image.height(),
            expected_width: label.printable_width,
            expected_height: label.printable_height,
        })
    }
}

/// Hue, saturation and value of a pixel, each scaled to `0..=255`.
fn hsv(Rgb([r, g, b]): Rgb<u8>) -> (u8, u8, u8) {
    let (r, g, b) = (r as i32, g as i32, b as i32);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    if delta == 0 {
        return (0, 0, max as u8);
    }
    let sector = if max == r {
        (g - b) * 60 / delta
    } else if max == g {
        120 + (b - r) * 60 / delta
    } else {
        240 + (r - g) * 60 / delta
    };
    let degrees = sector.rem_euclid(360);
    (
        (degrees * 255 / 360) as u8,
        (delta * 255 / max) as u8,
        max as u8,
    )
}

/// Saturated, bright pixels with a red hue, anti-aliased edges of red text included.
fn is_red_pixel(pixel: Rgb<u8>) -> bool {
    let (h, s, v) = hsv(pixel);
    (h < 40 || h > 210) && s > 100 && v > 80
}

/// Darkness of a pixel, 0 for white and 255 for black.
fn darkness(Rgb([r, g, b]): Rgb<u8>) -> u32 {
    let luma = (r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000;
    255 - luma
}

/// Row-major dot masks for the black plane and, when printing two colours, the red plane.
fn split_planes(image: &RgbImage, threshold: u8, two_colors: bool) -> (Vec<bool>, Option<Vec<bool>>) {
    let cut = (100 - threshold.min(100) as u32) * 255 / 100;
    let mut black = Vec::with_capacity((image.width() * image.height()) as usize);
    let mut red = Vec::with_capacity(if two_colors { black.capacity() } else { 0 });

    for pixel in image.pixels() {
        let is_red = two_colors && is_red_pixel(*pixel);
        black.push(!is_red && darkness(*pixel) >= cut);
        if two_colors {
            red.push(is_red);
        }
    }

    (black, if two_colors { Some(red) } else { None })
}

fn double_rows(rows: Matrix) -> Matrix {
    rows.into_iter()
        .flat_map(|row| vec![row.clone(), row])
        .collect()
}

/// Place each image row on the print head and pack it into bytes.
///
/// The head prints right to left, so the row is mirrored and offset by the
/// unused pins on the right of the media.
fn raster_rows(mask: &[bool], width: u32, pins: u32, right_margin: u32) -> Matrix {
    let row_bytes = (pins / 8) as usize;
    mask.chunks(width as usize)
        .map(|row| {
            let mut bytes = vec![0u8; row_bytes];
            for (x, dot) in row.iter().enumerate() {
                if *dot {
                    let pin = (right_margin + width - 1) as usize - x;
                    bytes[pin / 8] |= 0x80 >> (pin % 8);
                }
            }
            bytes
        })
        .collect()
}

/// TIFF PackBits.
fn pack_bits(data: &[u8]) -> Vec<u8> {
    let mut packed = Vec::new();
    let mut i = 0;

    while i < data.len() {
        let mut run_length = 1;
        while i + run_length < data.len() && run_length < 128 && data[i + run_length] == data[i] {
            run_length += 1;
        }

        if run_length > 1 {
            packed.push((1 - run_length as i16) as i8 as u8);
            packed.push(data[i]);
            i += run_length;
        } else {
            let start = i;
            while i < data.len()
                && i - start < 128
                && !(i + 1 < data.len() && data[i] == data[i + 1])
            {
                i += 1;
            }
            packed.push((i - start - 1) as u8);
            packed.extend_from_slice(&data[start..i]);
        }
    }

    packed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::LabelTable;

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

    fn label(id: &str) -> LabelSpec {
        LabelTable::builtin().get(id).cloned().unwrap()
    }

    fn unpack_bits(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < data.len() {
            let n = data[i] as i8;
            if n >= 0 {
                let len = n as usize + 1;
                out.extend_from_slice(&data[i + 1..i + 1 + len]);
                i += 1 + len;
            } else {
                out.extend(std::iter::repeat(data[i + 1]).take((1 - n as i16) as usize));
                i += 2;
            }
        }
        out
    }

    #[test]
    fn rotate_directive_follows_class_and_orientation() {
        assert_eq!(
            Rotate::for_label(LabelClass::Continuous, Orientation::Standard),
            Rotate::Degrees0
        );
        assert_eq!(
            Rotate::for_label(LabelClass::Continuous, Orientation::Rotated),
            Rotate::Degrees90
        );
        for orientation in &[Orientation::Standard, Orientation::Rotated] {
            assert_eq!(Rotate::for_label(LabelClass::DieCut, *orientation), Rotate::Auto);
            assert_eq!(
                Rotate::for_label(LabelClass::RoundDieCut, *orientation),
                Rotate::Auto
            );
        }
    }

    #[test]
    fn pack_bits_compresses_runs() {
        let data = [0, 0, 0, 0, 1, 2, 3, 3];
        let packed = pack_bits(&data);
        assert_eq!(packed, vec![0xFD, 0, 0x01, 1, 2, 0xFF, 3]);

        let mut row = vec![0u8; 90];
        row[40] = 0xAA;
        row[41] = 0x55;
        assert_eq!(unpack_bits(&pack_bits(&row)), row);
    }

    #[test]
    fn rows_are_mirrored_onto_the_head() {
        // 4 dots wide with 2 unused pins on the right, on a 16 pin head
        let mask = [true, false, false, false, false, false, false, true];
        let rows = raster_rows(&mask, 4, 16, 2);
        assert_eq!(rows.len(), 2);
        // x = 0 lands on pin 5, x = 3 on pin 2
        assert_eq!(rows[0], vec![0b0000_0100, 0]);
        assert_eq!(rows[1], vec![0b0010_0000, 0]);
    }

    #[test]
    fn threshold_splits_black_and_red() {
        let mut image = RgbImage::from_pixel(3, 1, WHITE);
        image.put_pixel(0, 0, Rgb([0, 0, 0]));
        image.put_pixel(1, 0, Rgb([255, 0, 0]));
        image.put_pixel(2, 0, Rgb([200, 200, 200]));

        let (black, red) = split_planes(&image, 70, true);
        assert_eq!(black, vec![true, false, false]);
        assert_eq!(red, Some(vec![false, true, false]));

        let (black, red) = split_planes(&image, 100, false);
        assert_eq!(black, vec![true, true, true]);
        assert_eq!(red, None);

        let (black, _) = split_planes(&image, 0, false);
        assert_eq!(black, vec![true, false, false]);
    }

    #[test]
    fn darkness_at_the_cut_prints() {
        // luma 179 is a darkness of 76, the cut at 70 percent
        let image = RgbImage::from_pixel(1, 1, Rgb([179, 179, 179]));
        assert_eq!(darkness(Rgb([179, 179, 179])), 76);
        assert_eq!(split_planes(&image, 70, false).0, vec![true]);
        let lighter = RgbImage::from_pixel(1, 1, Rgb([180, 180, 180]));
        assert_eq!(split_planes(&lighter, 70, false).0, vec![false]);
    }

    #[test]
    fn red_glyph_edges_stay_on_the_red_plane() {
        let mut image = RgbImage::from_pixel(4, 1, WHITE);
        image.put_pixel(0, 0, Rgb([255, 140, 140]));
        image.put_pixel(1, 0, Rgb([255, 60, 60]));
        image.put_pixel(2, 0, Rgb([255, 220, 220]));
        image.put_pixel(3, 0, Rgb([60, 60, 60]));

        let (black, red) = split_planes(&image, 70, true);
        assert_eq!(black, vec![false, false, false, true]);
        assert_eq!(red, Some(vec![true, true, false, false]));

        assert_eq!(hsv(Rgb([255, 140, 140])), (0, 115, 255));
        assert_eq!(hsv(Rgb([0, 0, 255])), (170, 255, 255));
        assert!(!is_red_pixel(Rgb([0, 0, 255])));
        assert!(!is_red_pixel(Rgb([60, 0, 0])));
    }

    #[test]
    fn high_resolution_doubles_feed_lines() {
        let label = label("62");
        let image = RgbImage::from_pixel(696, 3, Rgb([0, 0, 0]));
        let options = PrintOptions::default().high_resolution(true);
        let job = encode(&image, &label, Model::QL800, &options).unwrap();

        let info = 400 + 2 + 4 + 4;
        assert_eq!(&job[info + 7..info + 11], &6u32.to_le_bytes());
        let expanded = job.windows(3).position(|w| w == [0x1Bu8, 0x69, 0x4B]).unwrap();
        assert_eq!(job[expanded + 3], 0b0100_1000);
        let feed = job.windows(3).position(|w| w == [0x1Bu8, 0x69, 0x64]).unwrap();
        assert_eq!(&job[feed + 3..feed + 5], &70u16.to_le_bytes());

        let raster = 6 * (3 + 90);
        let start = job.len() - 1 - raster;
        assert_eq!(&job[start - 2..start], &[0x4D, 0x00]);
        let lines: Vec<&[u8]> = job[start..job.len() - 1].chunks(93).collect();
        assert!(lines.iter().all(|line| line[0] == 0x67));
        assert_eq!(lines[0], lines[1]);
    }

    #[test]
    fn encodes_continuous_job() {
        let label = label("62");
        let image = RgbImage::from_pixel(696, 10, Rgb([0, 0, 0]));
        let job = encode(&image, &label, Model::QL800, &PrintOptions::default()).unwrap();

        assert!(job[..400].iter().all(|b| *b == 0));
        assert_eq!(&job[400..402], &[0x1B, 0x40]);
        let info = 400 + 2 + 4 + 4;
        assert_eq!(&job[info..info + 5], &[0x1B, 0x69, 0x7A, 0x8E, 0x0A]);
        assert_eq!(&job[info + 5..info + 7], &[62, 0]);
        assert_eq!(&job[info + 7..info + 11], &10u32.to_le_bytes());
        assert_eq!(*job.last().unwrap(), 0x1A);
        // 10 raster lines of 3 + 90 bytes
        let raster = 10 * (3 + 90);
        let lines = &job[job.len() - 1 - raster..job.len() - 1];
        assert_eq!(&lines[..3], &[0x67, 0x00, 90]);
        // 696 dots on pins 12 to 707, the rest is blank
        let row = &lines[3..93];
        assert_eq!(row[0], 0);
        assert_eq!(row[1], 0b0000_1111);
        assert_eq!(row[50], 0xFF);
        assert_eq!(row[88], 0b1111_0000);
        assert_eq!(row[89], 0);
    }

    #[test]
    fn die_cut_is_turned_automatically() {
        let label = label("29x90");
        let image = RgbImage::from_pixel(991, 306, WHITE);
        assert!(encode(&image, &label, Model::QL700, &PrintOptions::default()).is_ok());

        let options = PrintOptions::default().rotate(Rotate::Degrees0);
        match encode(&image, &label, Model::QL700, &options) {
            Err(Error::InvalidImageSize { width, height, .. }) => {
                assert_eq!((width, height), (991, 306))
            }
            other => panic!("unexpected {:?}", other.map(|job| job.len())),
        }
    }

    #[test]
    fn rejects_red_on_single_color_model_and_wide_tape() {
        let image = RgbImage::from_pixel(696, 10, WHITE);
        let options = PrintOptions::default().red(true);
        assert!(matches!(
            encode(&image, &label("62red"), Model::QL700, &options),
            Err(Error::InvalidConfig(_))
        ));
        assert!(encode(&image, &label("62red"), Model::QL820NWB, &options).is_ok());

        let wide = RgbImage::from_pixel(1164, 10, WHITE);
        assert!(matches!(
            encode(&wide, &label("102"), Model::QL800, &PrintOptions::default()),
            Err(Error::InvalidConfig(_))
        ));
        assert!(encode(&wide, &label("102"), Model::QL1100, &PrintOptions::default()).is_ok());
    }

    #[test]
    fn compressed_lines_expand_to_raw_rows() {
        let label = label("29");
        let image = RgbImage::from_pixel(306, 2, WHITE);
        let options = PrintOptions::default().compress(true);
        let job = encode(&image, &label, Model::QL700, &options).unwrap();
        let start = job.windows(2).position(|w| w == [0x4Du8, 0x02]).unwrap() + 2;
        let mut i = start;
        let mut rows = 0;
        while job[i] == 0x67 {
            let len = job[i + 2] as usize;
            assert_eq!(unpack_bits(&job[i + 3..i + 3 + len]), vec![0u8; 90]);
            i += 3 + len;
            rows += 1;
        }
        assert_eq!(rows, 2);
        assert_eq!(job[i], 0x1A);
    }
}
