//! CSS Values & Units Level 3 — §6 Dimensions (Lengths subset)
//! Spec: <https://www.w3.org/TR/css-values-3/#lengths>

use crate::ParseError;
use cssparser::{Parser, ParserInput, Token};

/// Supported subset of CSS <length>: px, em, rem, plus unitless zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LengthUnit {
    Pixels,
    Ems,
    RootEms,
}

/// A CSS <length> value with unit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Length {
    pub value: f32,
    pub unit: LengthUnit,
}

/// Compute the pixel value for a given `Length` using the current font sizes.
///
/// - Pixels: returns the raw value.
/// - Ems/RootEms: scales by the provided font sizes.
pub fn compute_length_px(length: Length, font_size_px: f32, root_font_size_px: f32) -> f32 {
    match length.unit {
        LengthUnit::Pixels => length.value,
        LengthUnit::Ems => length.value * font_size_px,
        LengthUnit::RootEms => length.value * root_font_size_px,
    }
}

/// Parse a CSS <length> (§6.1). Accepts px/em/rem dimensions and unitless zero.
///
/// # Errors
/// Returns `ParseError::UnexpectedToken` when the next token is not a
/// supported `<length>`.
pub fn parse_length(input: &mut Parser) -> Result<Length, ParseError> {
    let token = input
        .next_including_whitespace_and_comments()
        .map_err(|_| ParseError::UnexpectedToken)?
        .clone();
    match token {
        Token::Dimension { value, unit, .. } => {
            if unit.eq_ignore_ascii_case("px") {
                Ok(Length {
                    value,
                    unit: LengthUnit::Pixels,
                })
            } else if unit.eq_ignore_ascii_case("em") {
                Ok(Length {
                    value,
                    unit: LengthUnit::Ems,
                })
            } else if unit.eq_ignore_ascii_case("rem") {
                Ok(Length {
                    value,
                    unit: LengthUnit::RootEms,
                })
            } else {
                Err(ParseError::UnexpectedToken)
            }
        }
        // Unitless zero is a valid <length>.
        Token::Number { value, .. } if value == 0.0 => Ok(Length {
            value: 0.0,
            unit: LengthUnit::Pixels,
        }),
        _ => Err(ParseError::UnexpectedToken),
    }
}

/// Parse a whole value text as a single CSS <length>.
pub fn length_from_text(value_text: &str) -> Option<Length> {
    let mut input = ParserInput::new(value_text.trim());
    let mut parser = Parser::new(&mut input);
    let length = parse_length(&mut parser).ok()?;
    if parser.is_exhausted() {
        Some(length)
    } else {
        None
    }
}
