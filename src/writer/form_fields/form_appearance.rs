//! Form field appearance stream generation.
//!
//! Builds the content of normal (`/N`) appearance streams for text, choice
//! and button widgets. Text is laid out with the font named by the field's
//! `/DA` string, which is expected to be a simple font with
//! `WinAnsiEncoding`. Characters outside that encoding are replaced by `?`
//! and reported as lossy, so callers can ask viewers to regenerate the
//! appearance (`/NeedAppearances`).

use super::field_flags::TextAlignment;
use crate::geometry::Rect;

/// Inner padding between the widget border and its text.
const TEXT_PADDING: f32 = 2.0;

/// Line height as a multiple of the font size.
const LINE_SPACING: f32 = 1.15;

/// Device color as written in `/DA` and `/MK` entries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Color {
    /// DeviceGray
    Gray(f32),
    /// DeviceRGB
    Rgb(f32, f32, f32),
    /// DeviceCMYK
    Cmyk(f32, f32, f32, f32),
}

impl Color {
    /// Color from an `/MK /BG` or `/BC` component array. An empty array
    /// means transparent.
    pub fn from_components(components: &[f32]) -> Option<Self> {
        match *components {
            [g] => Some(Color::Gray(g)),
            [r, g, b] => Some(Color::Rgb(r, g, b)),
            [c, m, y, k] => Some(Color::Cmyk(c, m, y, k)),
            _ => None,
        }
    }

    /// Non-stroking color operator (`g`, `rg` or `k`).
    pub fn fill_op(&self) -> String {
        match *self {
            Color::Gray(g) => format!("{} g", num(g)),
            Color::Rgb(r, g, b) => format!("{} {} {} rg", num(r), num(g), num(b)),
            Color::Cmyk(c, m, y, k) => format!("{} {} {} {} k", num(c), num(m), num(y), num(k)),
        }
    }

    /// Stroking color operator (`G`, `RG` or `K`).
    pub fn stroke_op(&self) -> String {
        match *self {
            Color::Gray(g) => format!("{} G", num(g)),
            Color::Rgb(r, g, b) => format!("{} {} {} RG", num(r), num(g), num(b)),
            Color::Cmyk(c, m, y, k) => format!("{} {} {} {} K", num(c), num(m), num(y), num(k)),
        }
    }
}

/// The parts of a `/DA` (default appearance) string this crate uses.
///
/// Missing parts stay `None` so the caller can fill them from
/// [`FormOptions`](crate::config::FormOptions).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DefaultAppearance {
    /// Font resource name without the leading slash
    pub font: Option<String>,
    /// Font size; `0.0` requests auto-sizing
    pub size: Option<f32>,
    /// Text color
    pub color: Option<Color>,
}

impl DefaultAppearance {
    /// Parse a `/DA` string such as `/Helv 12 Tf 0 0 1 rg`.
    ///
    /// Unrecognized operators are skipped; the last `Tf` and color operator
    /// win.
    pub fn parse(da: &str) -> Self {
        let mut result = DefaultAppearance::default();
        let mut operands: Vec<&str> = Vec::new();

        for token in da.split_whitespace() {
            match token {
                "Tf" => {
                    if operands.len() >= 2 {
                        let font = operands[operands.len() - 2];
                        if let Some(name) = font.strip_prefix('/') {
                            result.font = Some(name.to_string());
                        }
                        result.size = operands[operands.len() - 1].parse::<f32>().ok();
                    }
                    operands.clear();
                },
                "g" => {
                    if let Some(v) = trailing_numbers(&operands, 1) {
                        result.color = Some(Color::Gray(v[0]));
                    }
                    operands.clear();
                },
                "rg" => {
                    if let Some(v) = trailing_numbers(&operands, 3) {
                        result.color = Some(Color::Rgb(v[0], v[1], v[2]));
                    }
                    operands.clear();
                },
                "k" => {
                    if let Some(v) = trailing_numbers(&operands, 4) {
                        result.color = Some(Color::Cmyk(v[0], v[1], v[2], v[3]));
                    }
                    operands.clear();
                },
                t if t.starts_with('/') || t.parse::<f32>().is_ok() => operands.push(t),
                _ => operands.clear(),
            }
        }

        result
    }
}

/// Last `count` operands parsed as numbers.
fn trailing_numbers(operands: &[&str], count: usize) -> Option<Vec<f32>> {
    if operands.len() < count {
        return None;
    }
    operands[operands.len() - count..]
        .iter()
        .map(|t| t.parse::<f32>().ok())
        .collect()
}

/// Resolved text style for one widget.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    /// Font resource name without the leading slash
    pub font: String,
    /// Font size; `0.0` requests auto-sizing
    pub size: f32,
    /// Text color
    pub color: Color,
    /// Horizontal alignment
    pub alignment: TextAlignment,
    /// Wrap text over several lines
    pub multiline: bool,
    /// Mask every character with `*`
    pub password: bool,
    /// Bounds for auto-sizing
    pub auto_size_range: (f32, f32),
}

/// Generator for form field appearance streams.
#[derive(Debug, Clone, Default)]
pub struct FormAppearanceGenerator {
    border_width: f32,
    border_color: Option<Color>,
    background_color: Option<Color>,
}

impl FormAppearanceGenerator {
    /// Create a new appearance generator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set border style.
    pub fn with_border(mut self, width: f32, color: Option<Color>) -> Self {
        self.border_width = width.max(0.0);
        self.border_color = color;
        self
    }

    /// Set background color.
    pub fn with_background(mut self, color: Option<Color>) -> Self {
        self.background_color = color;
        self
    }

    /// Background and border drawn under every appearance.
    fn frame(&self, width: f32, height: f32) -> String {
        let mut stream = String::new();
        if let Some(color) = self.background_color {
            stream.push_str(&format!("{}\n0 0 {} {} re f\n", color.fill_op(), num(width), num(height)));
        }
        if let Some(color) = self.border_color {
            if self.border_width > 0.0 {
                let half = self.border_width / 2.0;
                stream.push_str(&format!(
                    "{}\n{} w\n{} {} {} {} re S\n",
                    color.stroke_op(),
                    num(self.border_width),
                    num(half),
                    num(half),
                    num(width - self.border_width),
                    num(height - self.border_width)
                ));
            }
        }
        stream
    }

    /// Generate the appearance of a text or choice widget.
    ///
    /// Returns the content bytes and whether any character had to be
    /// replaced because the font encoding cannot show it.
    pub fn text_field_appearance(&self, rect: Rect, text: &str, style: &TextStyle) -> (Vec<u8>, bool) {
        let width = rect.width;
        let height = rect.height;
        let mut stream = self.frame(width, height).into_bytes();

        let shown: String = if style.password {
            text.chars().map(|c| if c == '\n' || c == '\r' { c } else { '*' }).collect()
        } else {
            text.to_string()
        };
        let (encoded, lossy) = encode_win_ansi(&shown);

        let inset = self.border_width + TEXT_PADDING;
        let inner_width = (width - 2.0 * inset).max(0.0);
        let inner_height = (height - 2.0 * self.border_width).max(0.0);

        stream.extend_from_slice(b"/Tx BMC\n");
        if !encoded.is_empty() {
            let (min_size, max_size) = style.size_bounds();
            let (lines, size) = if style.multiline {
                layout_multiline(&encoded, style.size, inner_width, inner_height, min_size, max_size)
            } else {
                let line: Vec<u8> = encoded.iter().copied().filter(|b| *b != b'\n' && *b != b'\r').collect();
                let size = if style.size > 0.0 {
                    style.size
                } else {
                    let by_height = (inner_height - 2.0) / LINE_SPACING;
                    let unit_width = text_width(&line, 1.0);
                    let by_width = if unit_width > 0.0 { inner_width / unit_width } else { max_size };
                    by_height.min(by_width).clamp(min_size, max_size)
                };
                (vec![line], size)
            };

            stream.extend_from_slice(
                format!(
                    "q\n{} {} {} {} re W n\nBT\n/{} {} Tf\n{}\n",
                    num(self.border_width),
                    num(self.border_width),
                    num(width - 2.0 * self.border_width),
                    num(inner_height),
                    style.font,
                    num(size),
                    style.color.fill_op()
                )
                .as_bytes(),
            );

            let leading = size * LINE_SPACING;
            let first_baseline = if style.multiline {
                height - self.border_width - TEXT_PADDING - size
            } else {
                (height - size) / 2.0 + size * 0.22
            };

            for (index, line) in lines.iter().enumerate() {
                let line_width = text_width(line, size);
                let x = match style.alignment {
                    TextAlignment::Left => inset,
                    TextAlignment::Center => (width - line_width) / 2.0,
                    TextAlignment::Right => width - inset - line_width,
                };
                let y = first_baseline - index as f32 * leading;
                stream.extend_from_slice(format!("1 0 0 1 {} {} Tm\n(", num(x), num(y)).as_bytes());
                stream.extend_from_slice(&escape_pdf_bytes(line));
                stream.extend_from_slice(b") Tj\n");
            }
            stream.extend_from_slice(b"ET\nQ\n");
        }
        stream.extend_from_slice(b"EMC\n");

        (stream, lossy)
    }

    /// Generate the checked appearance of a checkbox.
    pub fn checkbox_on_appearance(&self, rect: Rect, check_color: Color) -> String {
        let width = rect.width;
        let height = rect.height;
        let mut stream = self.frame(width, height);

        let margin = width.min(height) * 0.2;
        stream.push_str(&format!(
            "{}\n{} w\n{} {} m {} {} l {} {} l S\n",
            check_color.stroke_op(),
            num(width.min(height) * 0.1),
            num(margin),
            num(height * 0.5),
            num(width * 0.4),
            num(margin),
            num(width - margin),
            num(height - margin)
        ));
        stream
    }

    /// Generate the unchecked appearance of a checkbox.
    pub fn checkbox_off_appearance(&self, rect: Rect) -> String {
        self.frame(rect.width, rect.height)
    }

    /// Generate the selected appearance of a radio button.
    pub fn radio_on_appearance(&self, rect: Rect, indicator_color: Color) -> String {
        let mut stream = self.radio_off_appearance(rect);
        let cx = rect.width / 2.0;
        let cy = rect.height / 2.0;
        let radius = (rect.width.min(rect.height) / 2.0 - 1.0).max(0.5);
        stream.push_str(&format!("{}\n{}f\n", indicator_color.fill_op(), circle_path(cx, cy, radius * 0.5)));
        stream
    }

    /// Generate the unselected appearance of a radio button.
    pub fn radio_off_appearance(&self, rect: Rect) -> String {
        let cx = rect.width / 2.0;
        let cy = rect.height / 2.0;
        let radius = (rect.width.min(rect.height) / 2.0 - 1.0).max(0.5);
        let mut stream = String::new();

        if let Some(color) = self.background_color {
            stream.push_str(&format!("{}\n{}f\n", color.fill_op(), circle_path(cx, cy, radius)));
        }
        if let Some(color) = self.border_color {
            if self.border_width > 0.0 {
                stream.push_str(&format!(
                    "{}\n{} w\n{}S\n",
                    color.stroke_op(),
                    num(self.border_width),
                    circle_path(cx, cy, radius)
                ));
            }
        }
        stream
    }
}

impl TextStyle {
    /// Auto-size bounds ordered low to high; non-finite or negative ends
    /// fall back to the 4-12pt default.
    pub fn size_bounds(&self) -> (f32, f32) {
        let (a, b) = self.auto_size_range;
        let a = if a.is_finite() && a > 0.0 { a } else { 4.0 };
        let b = if b.is_finite() && b > 0.0 { b } else { 12.0 };
        (a.min(b), a.max(b))
    }
}

/// Split text into lines that fit `width`, picking a size when `size` is 0.
fn layout_multiline(
    text: &[u8],
    size: f32,
    width: f32,
    height: f32,
    min_size: f32,
    max_size: f32,
) -> (Vec<Vec<u8>>, f32) {
    if size > 0.0 {
        return (wrap_lines(text, size, width), size);
    }

    let mut candidate = max_size;
    loop {
        let lines = wrap_lines(text, candidate, width);
        let needed = lines.len() as f32 * candidate * LINE_SPACING + 2.0 * TEXT_PADDING;
        if needed <= height || candidate <= min_size {
            return (lines, candidate);
        }
        candidate = (candidate - 0.5).max(min_size);
    }
}

/// Greedy word wrap; explicit line breaks are kept.
fn wrap_lines(text: &[u8], size: f32, width: f32) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();
    for paragraph in text.split(|b| *b == b'\n') {
        let paragraph: Vec<u8> = paragraph.iter().copied().filter(|b| *b != b'\r').collect();
        let mut current: Vec<u8> = Vec::new();
        for word in paragraph.split(|b| *b == b' ') {
            let mut tentative = current.clone();
            if !tentative.is_empty() {
                tentative.push(b' ');
            }
            tentative.extend_from_slice(word);
            if current.is_empty() || text_width(&tentative, size) <= width {
                current = tentative;
            } else {
                lines.push(std::mem::replace(&mut current, word.to_vec()));
            }
        }
        lines.push(current);
    }
    lines
}

/// Approximate advance width of WinAnsi text in a Helvetica-like font.
pub fn text_width(text: &[u8], size: f32) -> f32 {
    let units: u32 = text
        .iter()
        .map(|&b| match b {
            b'i' | b'j' | b'l' | b'.' | b',' | b'\'' | b'!' | b'|' | b':' | b';' => 222,
            b' ' | b'f' | b't' | b'I' | b'r' | b'(' | b')' | b'[' | b']' | b'/' => 278,
            b'm' | b'w' | b'M' | b'W' | b'@' | b'%' => 833,
            b'A'..=b'Z' => 667,
            _ => 556,
        })
        .sum();
    units as f32 * size / 1000.0
}

/// Encode text as WinAnsiEncoding bytes.
///
/// Returns the bytes and whether any character was replaced by `?`.
pub fn encode_win_ansi(text: &str) -> (Vec<u8>, bool) {
    let mut lossy = false;
    let bytes: Vec<u8> = text
        .chars()
        .map(|c| {
            win_ansi_byte(c).unwrap_or_else(|| {
                lossy = true;
                b'?'
            })
        })
        .collect();
    (bytes, lossy)
}

fn win_ansi_byte(c: char) -> Option<u8> {
    let code = c as u32;
    match code {
        0x0A | 0x0D | 0x20..=0x7E | 0xA0..=0xFF => Some(code as u8),
        0x09 => Some(b' '),
        _ => WIN_ANSI_HIGH
            .iter()
            .find(|(mapped, _)| *mapped == c)
            .map(|(_, byte)| *byte),
    }
}

/// WinAnsiEncoding characters in the 0x80-0x9F range.
const WIN_ANSI_HIGH: [(char, u8); 27] = [
    ('\u{20AC}', 0x80),
    ('\u{201A}', 0x82),
    ('\u{0192}', 0x83),
    ('\u{201E}', 0x84),
    ('\u{2026}', 0x85),
    ('\u{2020}', 0x86),
    ('\u{2021}', 0x87),
    ('\u{02C6}', 0x88),
    ('\u{2030}', 0x89),
    ('\u{0160}', 0x8A),
    ('\u{2039}', 0x8B),
    ('\u{0152}', 0x8C),
    ('\u{017D}', 0x8E),
    ('\u{2018}', 0x91),
    ('\u{2019}', 0x92),
    ('\u{201C}', 0x93),
    ('\u{201D}', 0x94),
    ('\u{2022}', 0x95),
    ('\u{2013}', 0x96),
    ('\u{2014}', 0x97),
    ('\u{02DC}', 0x98),
    ('\u{2122}', 0x99),
    ('\u{0161}', 0x9A),
    ('\u{203A}', 0x9B),
    ('\u{0153}', 0x9C),
    ('\u{017E}', 0x9E),
    ('\u{0178}', 0x9F),
];

/// Generate a Bezier approximation of a circle path.
fn circle_path(cx: f32, cy: f32, r: f32) -> String {
    let k = r * 0.552_284_7;
    let mut path = format!("{} {} m\n", num(cx + r), num(cy));
    let segments = [
        (cx + r, cy + k, cx + k, cy + r, cx, cy + r),
        (cx - k, cy + r, cx - r, cy + k, cx - r, cy),
        (cx - r, cy - k, cx - k, cy - r, cx, cy - r),
        (cx + k, cy - r, cx + r, cy - k, cx + r, cy),
    ];
    for (x1, y1, x2, y2, x3, y3) in segments {
        path.push_str(&format!(
            "{} {} {} {} {} {} c\n",
            num(x1),
            num(y1),
            num(x2),
            num(y2),
            num(x3),
            num(y3)
        ));
    }
    path
}

/// Escape special bytes inside a literal string.
fn escape_pdf_bytes(bytes: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'\\' => result.extend_from_slice(b"\\\\"),
            b'(' => result.extend_from_slice(b"\\("),
            b')' => result.extend_from_slice(b"\\)"),
            b'\r' => result.extend_from_slice(b"\\r"),
            b'\n' => result.extend_from_slice(b"\\n"),
            _ => result.push(b),
        }
    }
    result
}

/// Format a number for a content stream with at most three decimals.
pub(crate) fn num(value: f32) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    let text = format!("{:.3}", rounded);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(size: f32) -> TextStyle {
        TextStyle {
            font: "Helv".to_string(),
            size,
            color: Color::Gray(0.0),
            alignment: TextAlignment::Left,
            multiline: false,
            password: false,
            auto_size_range: (4.0, 12.0),
        }
    }

    fn as_text(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }

    #[test]
    fn test_inverted_size_bounds_are_ordered() {
        let mut inverted = style(0.0);
        inverted.auto_size_range = (12.0, 4.0);
        assert_eq!(inverted.size_bounds(), (4.0, 12.0));
        inverted.auto_size_range = (f32::NAN, 2.0);
        assert_eq!(inverted.size_bounds(), (2.0, 4.0));

        inverted.auto_size_range = (12.0, 4.0);
        let gen = FormAppearanceGenerator::new();
        let (stream, _) = gen.text_field_appearance(Rect::new(0.0, 0.0, 100.0, 20.0), "Richard", &inverted);
        assert!(as_text(&stream).contains("(Richard) Tj"));
    }

    #[test]
    fn test_parse_default_appearance() {
        let da = DefaultAppearance::parse("/Helv 10 Tf 0 0 1 rg");
        assert_eq!(da.font.as_deref(), Some("Helv"));
        assert_eq!(da.size, Some(10.0));
        assert_eq!(da.color, Some(Color::Rgb(0.0, 0.0, 1.0)));

        let da = DefaultAppearance::parse("0 g /TiRo 0 Tf");
        assert_eq!(da.font.as_deref(), Some("TiRo"));
        assert_eq!(da.size, Some(0.0));
        assert_eq!(da.color, Some(Color::Gray(0.0)));

        assert_eq!(DefaultAppearance::parse(""), DefaultAppearance::default());
    }

    #[test]
    fn test_escape_pdf_bytes() {
        assert_eq!(escape_pdf_bytes(b"Hello (World)"), b"Hello \\(World\\)".to_vec());
        assert_eq!(escape_pdf_bytes(b"Back\\slash"), b"Back\\\\slash".to_vec());
    }

    #[test]
    fn test_text_field_appearance_marks_content() {
        let gen = FormAppearanceGenerator::new()
            .with_background(Some(Color::Gray(1.0)))
            .with_border(1.0, Some(Color::Gray(0.0)));
        let (stream, lossy) =
            gen.text_field_appearance(Rect::new(0.0, 0.0, 200.0, 20.0), "Richard", &style(10.0));
        let text = as_text(&stream);

        assert!(!lossy);
        assert!(text.contains("/Tx BMC"));
        assert!(text.contains("/Helv 10 Tf"));
        assert!(text.contains("(Richard) Tj"));
        assert!(text.trim_end().ends_with("EMC"));
    }

    #[test]
    fn test_empty_text_has_no_text_object() {
        let gen = FormAppearanceGenerator::new();
        let (stream, _) = gen.text_field_appearance(Rect::new(0.0, 0.0, 200.0, 20.0), "", &style(0.0));
        let text = as_text(&stream);
        assert!(!text.contains("BT"));
        assert!(text.contains("/Tx BMC"));
    }

    #[test]
    fn test_auto_size_shrinks_for_long_text() {
        let gen = FormAppearanceGenerator::new();
        let rect = Rect::new(0.0, 0.0, 60.0, 20.0);
        let (short, _) = gen.text_field_appearance(rect, "Hi", &style(0.0));
        let (long, _) = gen.text_field_appearance(rect, "A considerably longer value", &style(0.0));
        assert!(as_text(&short).contains("/Helv 12 Tf"));
        assert!(!as_text(&long).contains("/Helv 12 Tf"));
    }

    #[test]
    fn test_password_and_lossy_text() {
        let gen = FormAppearanceGenerator::new();
        let mut masked = style(10.0);
        masked.password = true;
        let (stream, _) = gen.text_field_appearance(Rect::new(0.0, 0.0, 100.0, 20.0), "secret", &masked);
        assert!(as_text(&stream).contains("(******) Tj"));

        let (_, lossy) = gen.text_field_appearance(Rect::new(0.0, 0.0, 100.0, 20.0), "理查德", &style(10.0));
        assert!(lossy);
    }

    #[test]
    fn test_multiline_wraps() {
        let lines = wrap_lines(b"one two three four five six", 12.0, 60.0);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| !l.is_empty()));

        let lines = wrap_lines(b"first\nsecond", 12.0, 500.0);
        assert_eq!(lines, vec![b"first".to_vec(), b"second".to_vec()]);
    }

    #[test]
    fn test_win_ansi_encoding() {
        assert_eq!(encode_win_ansi("Café €5"), (vec![b'C', b'a', b'f', 0xE9, b' ', 0x80, b'5'], false));
        assert!(encode_win_ansi("日本").1);
    }

    #[test]
    fn test_button_states() {
        let gen = FormAppearanceGenerator::new().with_border(1.0, Some(Color::Gray(0.0)));
        let rect = Rect::new(0.0, 0.0, 15.0, 15.0);

        let on = gen.checkbox_on_appearance(rect, Color::Gray(0.0));
        assert!(on.contains(" l S"));
        let off = gen.checkbox_off_appearance(rect);
        assert!(off.contains("re S"));
        assert!(!off.contains(" l S"));

        let radio_on = gen.radio_on_appearance(rect, Color::Gray(0.0));
        assert!(radio_on.contains(" c\n"));
        assert!(radio_on.trim_end().ends_with('f'));
        assert!(!gen.radio_off_appearance(rect).contains("g\n"));
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(num(1.0), "1");
        assert_eq!(num(0.5), "0.5");
        assert_eq!(num(0.30000001), "0.3");
        assert_eq!(num(-0.0001), "0");
        assert_eq!(num(12.3456), "12.346");
    }
}
