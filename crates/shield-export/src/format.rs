//! Fixed-column field rendering and parsing
//!
//! SHIELD-HIT12A reads its input files column by column: every value sits
//! right-aligned in a field of fixed width and the reader slices lines at
//! fixed offsets. This module owns all of that: float rendering, integer and
//! token columns, boolean polarity and the closed enum-to-code tables.

use crate::error::{Error, Result};

/// Column geometry of a keyword-prefixed record line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Keyword field, left-justified
    pub keyword_width: usize,
    /// Every value field, right-aligned
    pub column_width: usize,
}

impl Layout {
    /// `beam.dat` and `mat.dat` cards
    pub const CARD: Layout = Layout {
        keyword_width: 16,
        column_width: 8,
    };

    /// `detect.dat` cards
    pub const DETECT: Layout = Layout {
        keyword_width: 10,
        column_width: 10,
    };
}

/// A single value destined for one column.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Float(f64),
    Int(i64),
    Text(String),
}

impl Value {
    /// Render right-aligned into exactly `width` characters.
    pub fn render(&self, field: &'static str, width: usize) -> Result<String> {
        let text = match self {
            Value::Float(v) => format_float(*v, width).ok_or_else(|| Error::ColumnOverflow {
                field,
                value: v.to_string(),
                width,
            })?,
            Value::Int(v) => v.to_string(),
            Value::Text(s) => s.clone(),
        };
        if text.len() > width {
            return Err(Error::ColumnOverflow {
                field,
                value: text,
                width,
            });
        }
        Ok(format!("{:>width$}", text, width = width))
    }
}

/// Render a float as the shortest text that fits `width` characters.
///
/// Whole numbers keep a bare trailing point (`100.`), fractions print their
/// shortest exact decimal (`1.222`). Only when that is too wide are decimals
/// rounded away. Returns `None` for non-finite values or when even the
/// integer part does not fit.
pub fn format_float(value: f64, width: usize) -> Option<String> {
    if !value.is_finite() {
        return None;
    }

    let shortest = finish_float(value.to_string());
    if shortest.len() <= width {
        return Some(shortest);
    }

    (0..width)
        .rev()
        .map(|precision| finish_float(format!("{:.*}", precision, value)))
        .find(|text| text.len() <= width)
}

fn finish_float(mut text: String) -> String {
    if text.contains('.') {
        let kept = text.trim_end_matches('0').len();
        text.truncate(kept);
    } else {
        text.push('.');
    }

    // -0 and values rounded down to zero
    if text.trim_start_matches('-').chars().all(|c| c == '0' || c == '.') {
        return "0.".to_string();
    }
    text
}

/// Move the decimal point of `value` by `exponent` places.
///
/// Works on the shortest decimal text, so `7 -> 0.07 -> 7` comes back as the
/// same float where `value * 100.0` would not.
pub fn scale_decimal(value: f64, exponent: i32) -> f64 {
    format!("{}e{}", value, exponent)
        .parse()
        .unwrap_or(value * 10f64.powi(exponent))
}

/// Render `keyword` followed by value columns. The result carries no
/// trailing whitespace and no newline.
pub fn render_record(layout: Layout, keyword: &'static str, values: &[Value]) -> Result<String> {
    let mut line = format!("{:<width$}", keyword, width = layout.keyword_width);
    for value in values {
        line.push_str(&value.render(keyword, layout.column_width)?);
    }
    let kept = line.trim_end().len();
    line.truncate(kept);
    Ok(line)
}

/// Split `text` into trimmed fixed-width chunks. A trailing chunk shorter than
/// `width` means the line was truncated mid-column.
pub fn chunks(line: usize, text: &str, width: usize) -> Result<Vec<&str>> {
    if !text.is_ascii() {
        return Err(Error::malformed(line, "non-ASCII text in fixed-column record"));
    }
    if text.len() % width != 0 {
        return Err(Error::malformed(
            line,
            format!("record is not a whole number of {}-character columns", width),
        ));
    }
    Ok((0..text.len() / width)
        .map(|i| text[i * width..(i + 1) * width].trim())
        .collect())
}

/// One parsed record line: its keyword and raw column texts.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<'a> {
    pub line: usize,
    pub keyword: &'a str,
    columns: Vec<&'a str>,
}

impl<'a> Record<'a> {
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Fail unless the record carries exactly `count` columns.
    pub fn expect_columns(&self, count: usize) -> Result<()> {
        if self.columns.len() != count {
            return Err(Error::malformed(
                self.line,
                format!(
                    "{} expects {} column(s), found {}",
                    self.keyword,
                    count,
                    self.columns.len()
                ),
            ));
        }
        Ok(())
    }

    fn column(&self, index: usize) -> Result<&'a str> {
        self.columns.get(index).copied().ok_or_else(|| {
            Error::malformed(
                self.line,
                format!("{} is missing column {}", self.keyword, index + 1),
            )
        })
    }

    pub fn float(&self, index: usize) -> Result<f64> {
        let text = self.column(index)?;
        text.parse().map_err(|_| {
            Error::malformed(self.line, format!("{}: `{}` is not a number", self.keyword, text))
        })
    }

    pub fn int(&self, index: usize) -> Result<i64> {
        let text = self.column(index)?;
        text.parse().map_err(|_| {
            Error::malformed(self.line, format!("{}: `{}` is not an integer", self.keyword, text))
        })
    }

    pub fn text(&self, index: usize) -> Result<&'a str> {
        self.column(index)
    }
}

/// Slice a keyword-prefixed line according to `layout`.
pub fn split_record<'a>(line: usize, text: &'a str, layout: Layout) -> Result<Record<'a>> {
    if !text.is_ascii() {
        return Err(Error::malformed(line, "non-ASCII text in fixed-column record"));
    }
    let keyword_end = text.len().min(layout.keyword_width);
    let keyword = text[..keyword_end].trim();
    if keyword.is_empty() {
        return Err(Error::malformed(line, "record has no keyword"));
    }
    let columns = chunks(line, &text[keyword_end..], layout.column_width)?;
    Ok(Record {
        line,
        keyword,
        columns,
    })
}

/// Lines worth parsing: 1-based line number and text, with blank lines and
/// `*` comment lines skipped.
pub fn content_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim_end()))
        .filter(|(_, line)| !line.trim().is_empty() && !line.starts_with('*'))
}

/// How a boolean setting maps onto the engine's 0/1 switch.
///
/// Each switch declares its own polarity; nothing is inferred from the field
/// name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// true → 1
    Direct,
    /// true → 0
    Inverted,
}

impl Polarity {
    pub fn encode(self, on: bool) -> i64 {
        match (self, on) {
            (Polarity::Direct, true) | (Polarity::Inverted, false) => 1,
            (Polarity::Direct, false) | (Polarity::Inverted, true) => 0,
        }
    }

    pub fn decode(self, field: &'static str, code: i64) -> Result<bool> {
        match (self, code) {
            (Polarity::Direct, 1) | (Polarity::Inverted, 0) => Ok(true),
            (Polarity::Direct, 0) | (Polarity::Inverted, 1) => Ok(false),
            (_, other) => Err(Error::UnknownCode {
                field,
                code: other.to_string(),
            }),
        }
    }
}

/// Closed mapping between a domain enum and an engine integer code.
pub trait EngineCode: Sized + Copy {
    /// Engine field the code is written to, used in error messages
    const FIELD: &'static str;

    fn code(self) -> i64;

    fn from_code(code: i64) -> Result<Self>;
}

/// Closed mapping between a domain enum and an engine text token.
pub trait EngineToken: Sized + Copy {
    const FIELD: &'static str;

    fn token(self) -> &'static str;

    fn from_token(token: &str) -> Result<Self>;
}

/// Declare an [`EngineCode`] table once; both directions are generated from
/// it and the forward match is checked for exhaustiveness by the compiler.
macro_rules! engine_codes {
    ($ty:ty, $field:literal, { $($variant:ident => $code:literal),+ $(,)? }) => {
        impl $crate::format::EngineCode for $ty {
            const FIELD: &'static str = $field;

            fn code(self) -> i64 {
                match self {
                    $(Self::$variant => $code,)+
                }
            }

            fn from_code(code: i64) -> $crate::error::Result<Self> {
                match code {
                    $($code => Ok(Self::$variant),)+
                    other => Err($crate::error::Error::UnknownCode {
                        field: $field,
                        code: other.to_string(),
                    }),
                }
            }
        }
    };
}

/// Same as [`engine_codes!`] for text tokens.
macro_rules! engine_tokens {
    ($ty:ty, $field:literal, { $($variant:ident => $token:literal),+ $(,)? }) => {
        impl $crate::format::EngineToken for $ty {
            const FIELD: &'static str = $field;

            fn token(self) -> &'static str {
                match self {
                    $(Self::$variant => $token,)+
                }
            }

            fn from_token(token: &str) -> $crate::error::Result<Self> {
                match token {
                    $($token => Ok(Self::$variant),)+
                    other => Err($crate::error::Error::UnknownCode {
                        field: $field,
                        code: other.to_string(),
                    }),
                }
            }
        }
    };
}

pub(crate) use engine_codes;
pub(crate) use engine_tokens;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_numbers_keep_a_bare_point() {
        assert_eq!(format_float(100.0, 8).as_deref(), Some("100."));
        assert_eq!(format_float(0.0, 8).as_deref(), Some("0."));
        assert_eq!(format_float(-0.0, 8).as_deref(), Some("0."));
        assert_eq!(format_float(-3.0, 8).as_deref(), Some("-3."));
    }

    #[test]
    fn test_scaling_moves_the_decimal_point_exactly() {
        assert_eq!(scale_decimal(7.0, -2), 0.07);
        assert_eq!(scale_decimal(0.07, 2), 7.0);
        assert_eq!(scale_decimal(0.29, 2), 29.0);
        assert_eq!(scale_decimal(0.57, 2), 57.0);
        assert!(scale_decimal(f64::NAN, 2).is_nan());
    }

    #[test]
    fn test_fractions_print_shortest_decimal() {
        assert_eq!(format_float(1.2220, 8).as_deref(), Some("1.222"));
        assert_eq!(format_float(0.001, 8).as_deref(), Some("0.001"));
        assert_eq!(format_float(90.0 / 100.0, 8).as_deref(), Some("0.9"));
        assert_eq!(format_float(1.0 / 100.0, 8).as_deref(), Some("0.01"));
    }

    #[test]
    fn test_wide_fractions_are_rounded_to_fit() {
        assert_eq!(format_float(1.0 / 3.0, 8).as_deref(), Some("0.333333"));
        assert_eq!(format_float(12.3456789, 5).as_deref(), Some("12.35"));
        assert_eq!(format_float(0.0000001, 8).as_deref(), Some("0."));
        assert_eq!(format_float(123456789.5, 8), None);
        assert_eq!(format_float(f64::NAN, 8), None);
    }

    #[test]
    fn test_columns_have_exact_width() {
        for value in [0.0, 1.5, -12.25, 99999.0, 1.0 / 7.0] {
            let col = Value::Float(value).render("TEST", 8).unwrap();
            assert_eq!(col.len(), 8, "{:?}", col);
        }
        assert_eq!(Value::Int(-1).render("NSTAT", 8).unwrap(), "      -1");
        assert!(matches!(
            Value::Int(123456789).render("NSTAT", 8),
            Err(Error::ColumnOverflow { width: 8, .. })
        ));
    }

    #[test]
    fn test_record_line_layout() {
        let line = render_record(
            Layout::CARD,
            "NSTAT",
            &[Value::Int(1000), Value::Int(-1)],
        )
        .unwrap();
        assert_eq!(line, "NSTAT               1000      -1");
        assert_eq!(render_record(Layout::CARD, "END", &[]).unwrap(), "END");
    }

    #[test]
    fn test_split_inverts_render() {
        let values = [Value::Float(110.0), Value::Float(1.222), Value::Float(0.001)];
        let line = render_record(Layout::CARD, "BEAMPOS", &values).unwrap();
        let record = split_record(3, &line, Layout::CARD).unwrap();
        assert_eq!(record.keyword, "BEAMPOS");
        record.expect_columns(3).unwrap();
        assert_eq!(record.float(0).unwrap(), 110.0);
        assert_eq!(record.float(1).unwrap(), 1.222);
        assert_eq!(record.float(2).unwrap(), 0.001);
    }

    #[test]
    fn test_truncated_columns_are_malformed() {
        let err = split_record(9, "TMAX0               100.   1", Layout::CARD).unwrap_err();
        assert!(matches!(err, Error::Malformed { line: 9, .. }));
    }

    #[test]
    fn test_polarity_is_per_field() {
        assert_eq!(Polarity::Direct.encode(true), 1);
        assert_eq!(Polarity::Inverted.encode(true), 0);
        assert!(!Polarity::Inverted.decode("X", 1).unwrap());
        assert!(matches!(
            Polarity::Direct.decode("NUCRE", 2),
            Err(Error::UnknownCode { field: "NUCRE", .. })
        ));
    }

    #[test]
    fn test_comment_and_blank_lines_are_skipped() {
        let lines: Vec<_> = content_lines("* head\n\nAPCORR                 0\n").collect();
        assert_eq!(lines, vec![(3, "APCORR                 0")]);
    }
}
