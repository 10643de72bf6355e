//! Value types of the `.xopp` format and their textual forms.
//!
//! Everything here parses out of attribute values or element text. Parsing
//! is deliberately forgiving; the document parser decides whether a failed
//! parse warrants a warning, a default, or both.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::{DecodeError, Engine as _};
use log::warn;

/// Error for values that have a closed set of textual forms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvalidValue;

impl fmt::Display for InvalidValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("not a recognized value")
    }
}

impl std::error::Error for InvalidValue {}

/// An RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    /// Red component.
    pub r: u8,
    /// Green component.
    pub g: u8,
    /// Blue component.
    pub b: u8,
    /// Alpha component, 255 is opaque.
    pub a: u8,
}

impl Color {
    /// An opaque color from its components.
    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    const fn from_rgb_u32(rgb: u32) -> Self {
        Self::rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    /// Opaque black, the fallback for unparseable stroke and text colors.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white, the fallback for unparseable background colors.
    pub const WHITE: Self = Self::rgb(255, 255, 255);
}

/// Color names accepted anywhere a color attribute appears.
const PREDEFINED_COLORS: &[(&str, u32)] = &[
    ("black", 0x000000),
    ("blue", 0x3333cc),
    ("red", 0xff0000),
    ("green", 0x008000),
    ("gray", 0x808080),
    ("lightblue", 0x00c0ff),
    ("lightgreen", 0x00ff00),
    ("magenta", 0xff00ff),
    ("orange", 0xff8000),
    ("yellow", 0xffff00),
    ("white", 0xffffff),
];

/// Translations applied to background colors only. Original Xournal wrote
/// paper colors by name; these are the pastel values it meant.
const BACKGROUND_COLORS: &[(&str, u32)] = &[
    ("blue", 0xa0e8ff),
    ("pink", 0xfabebe),
    ("green", 0x80ffc0),
    ("orange", 0xffc080),
    ("yellow", 0xffff80),
    ("white", 0xffffff),
];

/// Parses a color attribute value: `#RRGGBB` or `#RRGGBBAA` hex, then the
/// predefined color names, then (for backgrounds only) the background
/// color translations.
pub fn parse_color(value: &str, background: bool) -> Option<Color> {
    if let Some(hex) = value.strip_prefix('#') {
        let digits = u32::from_str_radix(hex, 16).ok()?;
        return match hex.len() {
            6 => Some(Color::from_rgb_u32(digits)),
            8 => Some(Color {
                r: (digits >> 24) as u8,
                g: (digits >> 16) as u8,
                b: (digits >> 8) as u8,
                a: digits as u8,
            }),
            _ => None,
        };
    }
    if let Some(&(_, rgb)) = PREDEFINED_COLORS.iter().find(|&&(name, _)| name == value) {
        return Some(Color::from_rgb_u32(rgb));
    }
    if background {
        if let Some(&(_, rgb)) = BACKGROUND_COLORS.iter().find(|&&(name, _)| name == value) {
            return Some(Color::from_rgb_u32(rgb));
        }
    }
    None
}

/// The tool a stroke was drawn with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StrokeTool {
    /// An opaque pen stroke.
    #[default]
    Pen,
    /// An eraser stroke (whiteout mode).
    Eraser,
    /// A translucent highlighter stroke.
    Highlighter,
}

impl FromStr for StrokeTool {
    type Err = InvalidValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pen" => Ok(Self::Pen),
            "eraser" => Ok(Self::Eraser),
            "highlighter" => Ok(Self::Highlighter),
            _ => Err(InvalidValue),
        }
    }
}

/// How stroke ends are drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CapStyle {
    /// Flat end at the last point.
    Butt,
    /// Rounded end.
    #[default]
    Round,
    /// Flat end extended by half the line width.
    Square,
}

impl FromStr for CapStyle {
    type Err = InvalidValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "butt" => Ok(Self::Butt),
            "round" => Ok(Self::Round),
            "square" => Ok(Self::Square),
            _ => Err(InvalidValue),
        }
    }
}

/// The dash pattern of a stroke.
#[derive(Clone, Debug, PartialEq)]
pub enum LineStyle {
    /// Solid line.
    Plain,
    /// Dashed line.
    Dash,
    /// Dash-dot-dash pattern.
    DashDot,
    /// Dotted line.
    Dot,
    /// A custom dash pattern, `cust: <len> <gap> …` in the file.
    Custom(Vec<f64>),
}

impl FromStr for LineStyle {
    type Err = InvalidValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => return Ok(Self::Plain),
            "dash" => return Ok(Self::Dash),
            "dashdot" => return Ok(Self::DashDot),
            "dot" => return Ok(Self::Dot),
            _ => (),
        }
        if let Some(list) = s.strip_prefix("cust:") {
            let dashes: Result<Vec<f64>, _> =
                list.split_ascii_whitespace().map(str::parse).collect();
            return match dashes {
                Ok(dashes) if !dashes.is_empty() => Ok(Self::Custom(dashes)),
                _ => Err(InvalidValue),
            };
        }
        Err(InvalidValue)
    }
}

/// The ruling printed on a solid-color page.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PageTypeFormat {
    /// Blank paper.
    #[default]
    Plain,
    /// Horizontal lines with a margin line.
    Ruled,
    /// Horizontal lines.
    Lined,
    /// Square grid.
    Graph,
    /// Dot grid.
    Dotted,
    /// Isometric dot grid.
    IsoDotted,
    /// Isometric triangle grid.
    IsoGraph,
    /// Music staves.
    Staves,
}

impl FromStr for PageTypeFormat {
    type Err = InvalidValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => Ok(Self::Plain),
            "ruled" => Ok(Self::Ruled),
            "lined" => Ok(Self::Lined),
            "graph" => Ok(Self::Graph),
            "dotted" => Ok(Self::Dotted),
            "isodotted" => Ok(Self::IsoDotted),
            "isograph" => Ok(Self::IsoGraph),
            "staves" => Ok(Self::Staves),
            _ => Err(InvalidValue),
        }
    }
}

/// A solid background's ruling plus its free-form configuration string.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageType {
    /// The ruling.
    pub format: PageTypeFormat,
    /// Raw `config` attribute, empty when absent.
    pub config: String,
}

/// Where a pixmap or PDF background file lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackgroundDomain {
    /// An absolute path on disk.
    Absolute,
    /// A file stored next to the document.
    Attach,
    /// The background of an earlier page, by page number.
    Clone,
}

impl FromStr for BackgroundDomain {
    type Err = InvalidValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "absolute" => Ok(Self::Absolute),
            "attach" => Ok(Self::Attach),
            "clone" => Ok(Self::Clone),
            _ => Err(InvalidValue),
        }
    }
}

/// One stroke coordinate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    /// Horizontal position in document units.
    pub x: f64,
    /// Vertical position in document units.
    pub y: f64,
}

/// Parses the space-separated `x y` pairs of a stroke body. Stops at the
/// first malformed pair with a warning; whatever parsed before it is kept.
pub fn parse_points(text: &str) -> Vec<Point> {
    let mut points = Vec::new();
    let mut words = text.split_ascii_whitespace();
    loop {
        let x = match words.next() {
            Some(w) => w,
            None => break,
        };
        let pair = match (x.parse(), words.next().map(str::parse)) {
            (Ok(x), Some(Ok(y))) => Point { x, y },
            _ => {
                warn!("malformed coordinate pair in stroke data, truncating");
                break;
            }
        };
        points.push(pair);
    }
    points
}

/// Splits a stroke `width` attribute: the head double is the nominal
/// width, the tail is the per-segment pressure list.
///
/// Returns `None` when even the head does not parse.
pub fn parse_width_list(value: &str) -> Option<(f64, Vec<f64>)> {
    let mut words = value.split_ascii_whitespace();
    let width: f64 = words.next()?.parse().ok()?;
    let mut pressures = Vec::new();
    for word in words {
        match word.parse() {
            Ok(p) => pressures.push(p),
            Err(_) => {
                warn!("malformed pressure value {:?} in width list, truncating", word);
                break;
            }
        }
    }
    Some((width, pressures))
}

/// Decodes a base64 image or LaTeX-image payload. ASCII whitespace is
/// stripped first; writers are allowed to wrap the payload.
pub fn decode_base64(text: &str) -> Result<Vec<u8>, DecodeError> {
    if text.bytes().any(|b| b.is_ascii_whitespace()) {
        let compact: Vec<u8> = text
            .bytes()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        STANDARD.decode(compact)
    } else {
        STANDARD.decode(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn hex_colors() {
        assert_eq!(parse_color("#ff8000", false), Some(Color::rgb(255, 128, 0)));
        assert_eq!(
            parse_color("#ff800080", false),
            Some(Color {
                r: 255,
                g: 128,
                b: 0,
                a: 128
            })
        );
        assert_eq!(parse_color("#ffffffff", false), Some(Color::WHITE));
        assert_eq!(parse_color("#fff", false), None);
        assert_eq!(parse_color("#gggggg", false), None);
    }

    #[test]
    fn named_colors() {
        assert_eq!(parse_color("black", false), Some(Color::BLACK));
        assert_eq!(parse_color("lightblue", false), Some(Color::rgb(0x00, 0xc0, 0xff)));
        assert_eq!(parse_color("chartreuse", false), None);
    }

    #[test]
    fn background_translations() {
        // only available when parsing a background color
        assert_eq!(parse_color("pink", false), None);
        assert_eq!(parse_color("pink", true), Some(Color::rgb(0xfa, 0xbe, 0xbe)));
        // predefined names win over the background table
        assert_eq!(parse_color("blue", true), Some(Color::rgb(0x33, 0x33, 0xcc)));
    }

    #[test]
    fn line_styles() {
        assert_eq!("plain".parse(), Ok(LineStyle::Plain));
        assert_eq!("dashdot".parse(), Ok(LineStyle::DashDot));
        assert_eq!(
            "cust: 5 3 1 3".parse(),
            Ok(LineStyle::Custom(vec![5.0, 3.0, 1.0, 3.0]))
        );
        assert_eq!("cust:".parse::<LineStyle>(), Err(InvalidValue));
        assert_eq!("wavy".parse::<LineStyle>(), Err(InvalidValue));
    }

    #[test]
    fn point_lists() {
        assert_eq!(
            parse_points("10 20 30 40"),
            vec![Point { x: 10.0, y: 20.0 }, Point { x: 30.0, y: 40.0 }]
        );
        // truncated at the malformed pair, prefix kept
        assert_eq!(parse_points("1 2 3 oops 5 6"), vec![Point { x: 1.0, y: 2.0 }]);
        // odd trailing coordinate is malformed
        assert_eq!(parse_points("1 2 3"), vec![Point { x: 1.0, y: 2.0 }]);
        assert_eq!(parse_points("  "), vec![]);
    }

    #[test]
    fn width_lists() {
        assert_eq!(parse_width_list("1.5"), Some((1.5, vec![])));
        assert_eq!(parse_width_list("1.5 0.8 0.9"), Some((1.5, vec![0.8, 0.9])));
        assert_eq!(parse_width_list("x"), None);
        assert_eq!(parse_width_list(""), None);
    }

    #[test]
    fn base64_payloads() {
        assert_eq!(decode_base64("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(decode_base64("aGVs\nbG8=\n").unwrap(), b"hello");
        assert!(decode_base64("???").is_err());
    }
}
