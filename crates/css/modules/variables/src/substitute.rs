//! Recursive-descent substitution of `var()` / `env()` / `attr()` and
//! user-defined function references over a value's token stream.
//! Spec: <https://www.w3.org/TR/css-variables-1/#using-variables>

use crate::token_sequence::TokenSequence;
use crate::VariableData;
use cssparser::{ParseError, Parser, ParserInput, Token};
use smallvec::SmallVec;
use std::sync::Arc;

/// Outcome of a single reference substitution, reported by the context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Substitution {
    /// The replacement was appended to the sequence.
    Done,
    /// The referenced name has no value; the fallback (if any) applies.
    Missing,
    /// The reference is invalid (cycle, taint violation, budget); the whole
    /// chain is invalid at computed-value time and fallbacks do not apply.
    Invalid,
}

/// Why a substitution failed; both collapse to IACVT at the resolver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubstitutionError {
    /// Missing reference without fallback, cycle, or malformed reference.
    Invalid,
    /// The token sequence byte budget was exceeded.
    BudgetExceeded,
}

/// Resolution callbacks supplied by the cascade. Each `substitute_*` either
/// appends the replacement text to `out` and returns [`Substitution::Done`],
/// or reports why it could not.
pub trait SubstitutionContext {
    /// Substitute the computed value of custom property `name` (function
    /// arguments shadow custom properties inside function bodies).
    fn substitute_var(&mut self, name: &str, out: &mut TokenSequence) -> Substitution;

    /// Substitute the environment value `name` (indexed).
    fn substitute_env(&mut self, name: &str, indices: &[u32], out: &mut TokenSequence)
    -> Substitution;

    /// Substitute the styled element's attribute `name`, converted per
    /// `syntax`.
    fn substitute_attr(
        &mut self,
        name: &str,
        syntax: &AttrSyntax,
        out: &mut TokenSequence,
    ) -> Substitution;

    /// Evaluate the user-defined function `name` with already-resolved
    /// arguments and splice its result.
    fn substitute_function(
        &mut self,
        name: &str,
        arguments: &[Arc<VariableData>],
        out: &mut TokenSequence,
    ) -> Substitution;
}

/// Requested conversion for `attr()` substitution.
/// Spec: <https://www.w3.org/TR/css-values-5/#attr-notation>
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttrSyntax {
    /// Default: the attribute text as a CSS string.
    String,
    /// A CSS identifier.
    Ident,
    /// A `<number>`.
    Number,
    /// A `<percentage>` (attribute text is the numeric part).
    Percentage,
    /// A dimension with the given unit (attribute text is the numeric part).
    Dimension(String),
    /// `type(<syntax>)`: attribute text validated against the given syntax.
    Type(String),
}

/// Substitute all references in `value_text` into `out`.
///
/// Text outside references is copied byte-for-byte. On error the sequence
/// contents are unspecified and the value is invalid at computed-value time.
///
/// # Errors
/// [`SubstitutionError::Invalid`] for missing references without fallback,
/// cycles, or malformed reference syntax; [`SubstitutionError::BudgetExceeded`]
/// when the sequence byte budget is hit.
pub fn substitute_references(
    value_text: &str,
    context: &mut dyn SubstitutionContext,
    out: &mut TokenSequence,
) -> Result<(), SubstitutionError> {
    let mut input = ParserInput::new(value_text);
    let mut parser = Parser::new(&mut input);
    resolve_tokens_into(&mut parser, context, out)
}

/// Walk one token stream level, copying literal spans and dispatching
/// references.
fn resolve_tokens_into(
    input: &mut Parser<'_, '_>,
    context: &mut dyn SubstitutionContext,
    out: &mut TokenSequence,
) -> Result<(), SubstitutionError> {
    loop {
        let start = input.position();
        let token = match input.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        match token {
            Token::Function(ref name) if name.eq_ignore_ascii_case("var") => {
                nested(input, |inner| resolve_var_into(inner, context, out))?;
            }
            Token::Function(ref name) if name.eq_ignore_ascii_case("env") => {
                nested(input, |inner| resolve_env_into(inner, context, out))?;
            }
            Token::Function(ref name) if name.eq_ignore_ascii_case("attr") => {
                nested(input, |inner| resolve_attr_into(inner, context, out))?;
            }
            Token::Function(ref name) if name.starts_with("--") => {
                let function_name = name.to_string();
                nested(input, |inner| {
                    resolve_function_into(inner, &function_name, context, out)
                })?;
            }
            Token::Function(_) | Token::ParenthesisBlock => {
                append_checked(out, input.slice_from(start))?;
                nested(input, |inner| resolve_tokens_into(inner, context, out))?;
                append_checked(out, ")")?;
            }
            Token::SquareBracketBlock => {
                append_checked(out, input.slice_from(start))?;
                nested(input, |inner| resolve_tokens_into(inner, context, out))?;
                append_checked(out, "]")?;
            }
            Token::CurlyBracketBlock => {
                append_checked(out, input.slice_from(start))?;
                nested(input, |inner| resolve_tokens_into(inner, context, out))?;
                append_checked(out, "}")?;
            }
            _ => append_checked(out, input.slice_from(start))?,
        }
    }
    Ok(())
}

/// Run `body` inside the just-opened nested block, flattening the parser
/// error layer into substitution errors.
fn nested<'input>(
    input: &mut Parser<'input, '_>,
    body: impl FnOnce(&mut Parser<'input, '_>) -> Result<(), SubstitutionError>,
) -> Result<(), SubstitutionError> {
    let outcome: Result<Result<(), SubstitutionError>, ParseError<'input, ()>> =
        input.parse_nested_block(|inner| Ok(body(inner)));
    outcome.unwrap_or(Err(SubstitutionError::Invalid))
}

fn append_checked(out: &mut TokenSequence, text: &str) -> Result<(), SubstitutionError> {
    if out.append_raw(text) {
        Ok(())
    } else {
        Err(SubstitutionError::BudgetExceeded)
    }
}

/// `var( <custom-property-name> [, fallback]? )`
fn resolve_var_into(
    inner: &mut Parser<'_, '_>,
    context: &mut dyn SubstitutionContext,
    out: &mut TokenSequence,
) -> Result<(), SubstitutionError> {
    let name = match inner.next() {
        Ok(Token::Ident(name)) if name.starts_with("--") => name.to_string(),
        _ => return Err(SubstitutionError::Invalid),
    };
    let fallback = take_fallback(inner)?;
    finish_reference(context.substitute_var(&name, out), fallback, context, out)
}

/// `env( <custom-ident> <integer>* [, fallback]? )`
fn resolve_env_into(
    inner: &mut Parser<'_, '_>,
    context: &mut dyn SubstitutionContext,
    out: &mut TokenSequence,
) -> Result<(), SubstitutionError> {
    let name = match inner.next() {
        Ok(Token::Ident(name)) => name.to_string(),
        _ => return Err(SubstitutionError::Invalid),
    };
    let mut indices: SmallVec<u32, 2> = SmallVec::new();
    let mut fallback = None;
    loop {
        let token = match inner.next() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        match token {
            Token::Comma => {
                fallback = take_fallback_after_comma(inner)?;
                break;
            }
            Token::Number {
                int_value: Some(index),
                ..
            } if index >= 0 => indices.push(index as u32),
            _ => return Err(SubstitutionError::Invalid),
        }
    }
    finish_reference(
        context.substitute_env(&name, &indices, out),
        fallback,
        context,
        out,
    )
}

/// `attr( <attr-name> <attr-syntax>? [, fallback]? )`
fn resolve_attr_into(
    inner: &mut Parser<'_, '_>,
    context: &mut dyn SubstitutionContext,
    out: &mut TokenSequence,
) -> Result<(), SubstitutionError> {
    let name = match inner.next() {
        Ok(Token::Ident(name)) => name.to_string(),
        _ => return Err(SubstitutionError::Invalid),
    };
    let mut syntax = AttrSyntax::String;
    let mut fallback = None;
    let token = match inner.next() {
        Ok(token) => Some(token.clone()),
        Err(_) => None,
    };
    match token {
        None => {}
        Some(Token::Comma) => fallback = take_fallback_after_comma(inner)?,
        Some(Token::Ident(ref keyword)) => {
            syntax = keyword_syntax(keyword);
            fallback = take_fallback(inner)?;
        }
        Some(Token::Function(ref keyword)) if keyword.eq_ignore_ascii_case("type") => {
            let mut type_text = String::new();
            nested(inner, |type_inner| {
                let start = type_inner.position();
                while type_inner.next_including_whitespace_and_comments().is_ok() {}
                type_text = type_inner.slice_from(start).trim().to_owned();
                Ok(())
            })?;
            syntax = AttrSyntax::Type(type_text);
            fallback = take_fallback(inner)?;
        }
        Some(_) => return Err(SubstitutionError::Invalid),
    }
    finish_reference(
        context.substitute_attr(&name, &syntax, out),
        fallback,
        context,
        out,
    )
}

fn keyword_syntax(keyword: &str) -> AttrSyntax {
    if keyword.eq_ignore_ascii_case("string") {
        AttrSyntax::String
    } else if keyword.eq_ignore_ascii_case("ident") {
        AttrSyntax::Ident
    } else if keyword.eq_ignore_ascii_case("number") {
        AttrSyntax::Number
    } else if keyword.eq_ignore_ascii_case("percentage") {
        AttrSyntax::Percentage
    } else {
        AttrSyntax::Dimension(keyword.to_ascii_lowercase())
    }
}

/// `--name( <argument>#? )`: arguments are resolved eagerly, in the caller's
/// context, before the function is entered.
fn resolve_function_into(
    inner: &mut Parser<'_, '_>,
    function_name: &str,
    context: &mut dyn SubstitutionContext,
    out: &mut TokenSequence,
) -> Result<(), SubstitutionError> {
    let byte_limit = out.byte_limit();
    let mut arguments: Vec<Arc<VariableData>> = Vec::new();
    if !inner.is_exhausted() {
        let parsed: Result<(), ParseError<'_, ()>> = inner
            .parse_comma_separated(|argument| {
                let mut sequence = TokenSequence::with_byte_limit(byte_limit);
                match resolve_tokens_into(argument, context, &mut sequence) {
                    Ok(()) => {
                        arguments.push(sequence.into_variable_data());
                        Ok(())
                    }
                    Err(_) => Err(argument.new_custom_error(())),
                }
            })
            .map(|_: Vec<()>| ());
        if parsed.is_err() {
            return Err(SubstitutionError::Invalid);
        }
    }
    match context.substitute_function(function_name, &arguments, out) {
        Substitution::Done => Ok(()),
        Substitution::Missing | Substitution::Invalid => Err(SubstitutionError::Invalid),
    }
}

/// Capture the raw fallback text if the next token is a comma.
fn take_fallback(inner: &mut Parser<'_, '_>) -> Result<Option<String>, SubstitutionError> {
    let token = match inner.next() {
        Ok(token) => token.clone(),
        Err(_) => return Ok(None),
    };
    match token {
        Token::Comma => take_fallback_after_comma(inner),
        _ => Err(SubstitutionError::Invalid),
    }
}

/// Capture everything after the comma as raw fallback text.
fn take_fallback_after_comma(
    inner: &mut Parser<'_, '_>,
) -> Result<Option<String>, SubstitutionError> {
    let start = inner.position();
    while inner.next_including_whitespace_and_comments().is_ok() {}
    Ok(Some(inner.slice_from(start).to_owned()))
}

/// Apply the common tail of every reference: success passes through, a
/// missing reference uses its fallback, and invalid references poison the
/// whole chain (fallbacks do not rescue cycles).
fn finish_reference(
    outcome: Substitution,
    fallback: Option<String>,
    context: &mut dyn SubstitutionContext,
    out: &mut TokenSequence,
) -> Result<(), SubstitutionError> {
    match outcome {
        Substitution::Done => Ok(()),
        Substitution::Invalid => Err(SubstitutionError::Invalid),
        Substitution::Missing => {
            let Some(fallback_text) = fallback else {
                return Err(SubstitutionError::Invalid);
            };
            let mut fallback_out = TokenSequence::with_byte_limit(out.byte_limit());
            substitute_references(&fallback_text, context, &mut fallback_out)?;
            if out.append_fallback(&fallback_out) {
                Ok(())
            } else {
                Err(SubstitutionError::BudgetExceeded)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Context backed by plain maps, standing in for the cascade.
    struct MapContext {
        variables: HashMap<String, Arc<VariableData>>,
        attributes: HashMap<String, String>,
    }

    impl SubstitutionContext for MapContext {
        fn substitute_var(&mut self, name: &str, out: &mut TokenSequence) -> Substitution {
            self.variables.get(name).cloned().map_or(
                Substitution::Missing,
                |data| {
                    if out.append_data(&data) {
                        Substitution::Done
                    } else {
                        Substitution::Invalid
                    }
                },
            )
        }

        fn substitute_env(
            &mut self,
            _name: &str,
            _indices: &[u32],
            _out: &mut TokenSequence,
        ) -> Substitution {
            Substitution::Missing
        }

        fn substitute_attr(
            &mut self,
            name: &str,
            _syntax: &AttrSyntax,
            out: &mut TokenSequence,
        ) -> Substitution {
            self.attributes.get(name).map_or(Substitution::Missing, |value| {
                if out.append_attr_tainted(value) {
                    Substitution::Done
                } else {
                    Substitution::Invalid
                }
            })
        }

        fn substitute_function(
            &mut self,
            _name: &str,
            _arguments: &[Arc<VariableData>],
            _out: &mut TokenSequence,
        ) -> Substitution {
            Substitution::Invalid
        }
    }

    fn context_with(variables: &[(&str, &str)]) -> MapContext {
        MapContext {
            variables: variables
                .iter()
                .map(|&(name, value)| (name.to_owned(), VariableData::new(value, false, false)))
                .collect(),
            attributes: HashMap::new(),
        }
    }

    fn run(context: &mut MapContext, text: &str) -> Result<String, SubstitutionError> {
        let mut out = TokenSequence::new();
        substitute_references(text, context, &mut out)?;
        Ok(out.text().to_owned())
    }

    #[test]
    fn literal_spans_are_preserved_exactly() {
        let mut context = context_with(&[("--x", "1.50px")]);
        assert_eq!(
            run(&mut context, "var(--x)  solid"),
            Ok("1.50px  solid".to_owned())
        );
    }

    #[test]
    fn fallback_applies_only_when_missing() {
        let mut context = context_with(&[("--x", "red")]);
        assert_eq!(run(&mut context, "var(--x, blue)"), Ok("red".to_owned()));
        assert_eq!(run(&mut context, "var(--y, blue)"), Ok("blue".to_owned()));
        assert_eq!(
            run(&mut context, "var(--y)"),
            Err(SubstitutionError::Invalid)
        );
    }

    #[test]
    fn nested_functions_are_walked() {
        let mut context = context_with(&[("--x", "2px")]);
        assert_eq!(
            run(&mut context, "calc(1px + var(--x, 9px))"),
            Ok("calc(1px + 2px)".to_owned())
        );
    }

    #[test]
    fn fallbacks_resolve_recursively() {
        let mut context = context_with(&[("--deep", "10%")]);
        assert_eq!(
            run(&mut context, "var(--missing, var(--deep))"),
            Ok("10%".to_owned())
        );
    }

    #[test]
    fn attr_substitution_taints_output() {
        let mut context = context_with(&[]);
        context
            .attributes
            .insert("data-width".to_owned(), "42px".to_owned());
        let mut out = TokenSequence::new();
        let outcome = substitute_references("attr(data-width px)", &mut context, &mut out);
        assert_eq!(outcome, Ok(()));
        assert_eq!(out.text(), "42px");
        assert_eq!(out.attr_taint_ranges().len(), 1);
    }
}
