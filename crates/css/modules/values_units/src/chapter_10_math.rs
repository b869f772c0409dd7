//! CSS Values & Units Level 4 — §10 Mathematical Expressions
//! Spec: <https://www.w3.org/TR/css-values-4/#math>
//!
//! Evaluates `calc()`, `min()`, `max()` and `clamp()` over *resolved*
//! operands: numbers, percentages, and dimensions sharing one unit.
//! Mixed-unit arithmetic that needs layout context is left untouched.

use cssparser::ParseError as CssParseError;
use cssparser::{Parser, ParserInput, Token};

/// A numeric intermediate: a value with an optional canonical (lowercased) unit.
#[derive(Clone, Debug, PartialEq)]
struct Scalar {
    value: f32,
    unit: Option<String>,
}

/// Evaluate a value text consisting of a single top-level math function.
///
/// Returns the serialized result (`12px`, `0.5`, `30%`), or `None` when the
/// text is not a math function or its operands cannot be combined without
/// layout context.
pub fn evaluate_math(value_text: &str) -> Option<String> {
    let mut input = ParserInput::new(value_text.trim());
    let mut parser = Parser::new(&mut input);
    let token = parser.next().ok()?.clone();
    let Token::Function(ref name) = token else {
        return None;
    };
    let scalar = parse_math_function(name, &mut parser).ok()?;
    if parser.is_exhausted() {
        Some(serialize(&scalar))
    } else {
        None
    }
}

/// Whether a function name is one of the supported math functions.
pub fn is_math_function(name: &str) -> bool {
    name.eq_ignore_ascii_case("calc")
        || name.eq_ignore_ascii_case("min")
        || name.eq_ignore_ascii_case("max")
        || name.eq_ignore_ascii_case("clamp")
}

/// Parse and evaluate a math function whose name token was just consumed.
fn parse_math_function<'input>(
    name: &str,
    input: &mut Parser<'input, '_>,
) -> Result<Scalar, CssParseError<'input, ()>> {
    if name.eq_ignore_ascii_case("calc") {
        input.parse_nested_block(parse_sum)
    } else if name.eq_ignore_ascii_case("min") {
        input.parse_nested_block(|inner| fold_comparison(inner, f32::min))
    } else if name.eq_ignore_ascii_case("max") {
        input.parse_nested_block(|inner| fold_comparison(inner, f32::max))
    } else if name.eq_ignore_ascii_case("clamp") {
        input.parse_nested_block(parse_clamp)
    } else {
        Err(input.new_custom_error(()))
    }
}

/// min()/max(): comma-separated sums folded with `pick`, one common unit.
fn fold_comparison<'input>(
    input: &mut Parser<'input, '_>,
    pick: fn(f32, f32) -> f32,
) -> Result<Scalar, CssParseError<'input, ()>> {
    let args = input.parse_comma_separated(parse_sum)?;
    let mut iterator = args.into_iter();
    let mut acc = iterator.next().ok_or_else(|| input.new_custom_error(()))?;
    for arg in iterator {
        acc = combine(acc, arg, pick).ok_or_else(|| input.new_custom_error(()))?;
    }
    Ok(acc)
}

/// clamp(MIN, VAL, MAX) == max(MIN, min(VAL, MAX)).
fn parse_clamp<'input>(input: &mut Parser<'input, '_>) -> Result<Scalar, CssParseError<'input, ()>> {
    let args = input.parse_comma_separated(parse_sum)?;
    let [minimum, preferred, maximum]: [Scalar; 3] = args
        .try_into()
        .map_err(|_| input.new_custom_error(()))?;
    let upper = combine(preferred, maximum, f32::min);
    upper
        .and_then(|inner| combine(minimum, inner, f32::max))
        .ok_or_else(|| input.new_custom_error(()))
}

/// <calc-sum>: products joined by `+` / `-`.
fn parse_sum<'input>(input: &mut Parser<'input, '_>) -> Result<Scalar, CssParseError<'input, ()>> {
    let mut acc = parse_product(input)?;
    loop {
        let token = match input.next() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        let sign: f32 = match token {
            Token::Delim('+') => 1.0,
            Token::Delim('-') => -1.0,
            _ => return Err(input.new_custom_error(())),
        };
        let rhs = parse_product(input)?;
        acc = combine(acc, rhs, move |left, right| sign.mul_add(right, left))
            .ok_or_else(|| input.new_custom_error(()))?;
    }
    Ok(acc)
}

/// <calc-product>: values joined by `*` / `/`.
fn parse_product<'input>(
    input: &mut Parser<'input, '_>,
) -> Result<Scalar, CssParseError<'input, ()>> {
    let mut acc = parse_unit_value(input)?;
    loop {
        let state = input.state();
        let token = match input.next() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        match token {
            Token::Delim('*') => {
                let rhs = parse_unit_value(input)?;
                acc = multiply(acc, rhs).ok_or_else(|| input.new_custom_error(()))?;
            }
            Token::Delim('/') => {
                let rhs = parse_unit_value(input)?;
                acc = divide(acc, rhs).ok_or_else(|| input.new_custom_error(()))?;
            }
            _ => {
                // Not ours; hand back to the enclosing sum.
                input.reset(&state);
                break;
            }
        }
    }
    Ok(acc)
}

/// <calc-value>: number, dimension, percentage, parenthesis, nested math.
fn parse_unit_value<'input>(
    input: &mut Parser<'input, '_>,
) -> Result<Scalar, CssParseError<'input, ()>> {
    let token = input.next()?.clone();
    match token {
        Token::Number { value, .. } => Ok(Scalar { value, unit: None }),
        Token::Dimension { value, ref unit, .. } => Ok(Scalar {
            value,
            unit: Some(unit.to_ascii_lowercase()),
        }),
        Token::Percentage { unit_value, .. } => Ok(Scalar {
            value: unit_value * 100.0,
            unit: Some("%".to_owned()),
        }),
        Token::ParenthesisBlock => input.parse_nested_block(parse_sum),
        Token::Function(ref name) => parse_math_function(name, input),
        _ => Err(input.new_custom_error(())),
    }
}

/// Combine two scalars that must agree on a unit (unitless zero coerces).
fn combine(lhs: Scalar, rhs: Scalar, merge: impl Fn(f32, f32) -> f32) -> Option<Scalar> {
    let unit = match (&lhs.unit, &rhs.unit) {
        (None, None) => None,
        (Some(left), Some(right)) if left == right => Some(left.clone()),
        (Some(left), None) if rhs.value == 0.0 => Some(left.clone()),
        (None, Some(right)) if lhs.value == 0.0 => Some(right.clone()),
        _ => return None,
    };
    Some(Scalar {
        value: merge(lhs.value, rhs.value),
        unit,
    })
}

/// Multiplication: at most one operand may carry a unit.
fn multiply(lhs: Scalar, rhs: Scalar) -> Option<Scalar> {
    let unit = match (&lhs.unit, &rhs.unit) {
        (Some(_), Some(_)) => return None,
        (Some(unit), None) | (None, Some(unit)) => Some(unit.clone()),
        (None, None) => None,
    };
    Some(Scalar {
        value: lhs.value * rhs.value,
        unit,
    })
}

/// Division: the divisor must be a non-zero number.
fn divide(lhs: Scalar, rhs: Scalar) -> Option<Scalar> {
    if rhs.unit.is_some() || rhs.value == 0.0 {
        return None;
    }
    Some(Scalar {
        value: lhs.value / rhs.value,
        unit: lhs.unit,
    })
}

fn serialize(scalar: &Scalar) -> String {
    scalar.unit.as_ref().map_or_else(
        || format!("{}", scalar.value),
        |unit| format!("{}{unit}", scalar.value),
    )
}
