//! CSS Syntax Module Level 3 — Declaration parsing and value-text utilities.
//! Spec: <https://www.w3.org/TR/css-syntax-3/>

#![forbid(unsafe_code)]

use cssparser::AtRuleParser as CssAtRuleParser;
use cssparser::BasicParseErrorKind;
use cssparser::CowRcStr;
use cssparser::DeclarationParser as CssDeclarationParser;
use cssparser::ParseError;
use cssparser::Parser;
use cssparser::ParserInput;
use cssparser::ParserState;
use cssparser::QualifiedRuleParser as CssQualifiedRuleParser;
use cssparser::RuleBodyItemParser as CssRuleBodyItemParser;
use cssparser::RuleBodyParser as CssRuleBodyParser;
use cssparser::Token;

/// A single CSS declaration (property: value [!important]).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    /// Property name. Lowercased, except custom properties (`--*`) which are
    /// case-sensitive per spec.
    pub name: String,
    /// Raw value text (without trailing !important), whitespace-trimmed but
    /// otherwise exactly as authored.
    pub value: String,
    /// Whether the declaration was marked as `!important`.
    pub important: bool,
}

/// The CSS-wide keywords recognized in any property value.
/// Spec: <https://www.w3.org/TR/css-cascade-5/#defaulting-keywords>
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CssWideKeyword {
    Initial,
    Inherit,
    Unset,
    Revert,
    RevertLayer,
}

/// Parse a value that consists solely of a CSS-wide keyword, if it does.
pub fn parse_css_wide_keyword(value_text: &str) -> Option<CssWideKeyword> {
    let trimmed = value_text.trim();
    if trimmed.eq_ignore_ascii_case("initial") {
        Some(CssWideKeyword::Initial)
    } else if trimmed.eq_ignore_ascii_case("inherit") {
        Some(CssWideKeyword::Inherit)
    } else if trimmed.eq_ignore_ascii_case("unset") {
        Some(CssWideKeyword::Unset)
    } else if trimmed.eq_ignore_ascii_case("revert") {
        Some(CssWideKeyword::Revert)
    } else if trimmed.eq_ignore_ascii_case("revert-layer") {
        Some(CssWideKeyword::RevertLayer)
    } else {
        None
    }
}

/// Parse `!important` at the end of a value, returning (`value_without_important`, `important_flag`).
pub fn split_important_tail(value: &str) -> (String, bool) {
    let trimmed = value.trim();
    if let Some(pos) = trimmed.rfind("!important")
        && let Some(prefix) = trimmed.get(..pos)
    {
        let head = prefix.trim_end();
        return (head.to_owned(), true);
    }
    (trimmed.to_owned(), false)
}

/// A declaration parser that records property name and its raw value.
struct BodyDeclParser;

impl CssDeclarationParser<'_> for BodyDeclParser {
    type Declaration = Declaration;
    type Error = ();

    fn parse_value<'input>(
        &mut self,
        name: CowRcStr<'input>,
        input: &mut Parser<'input, '_>,
        _decl_start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'input, Self::Error>> {
        let start = input.position();
        // Consume until end of the declaration item.
        while input.next_including_whitespace_and_comments().is_ok() {}
        let raw = input.slice_from(start);
        let (value, important) = split_important_tail(raw);
        // Custom property names are case-sensitive; everything else lowercases.
        let property_name = if name.starts_with("--") {
            name.to_string()
        } else {
            name.to_ascii_lowercase()
        };
        Ok(Declaration {
            name: property_name,
            value,
            important,
        })
    }
}

impl CssAtRuleParser<'_> for BodyDeclParser {
    type Prelude = ();
    type AtRule = Declaration; // Not produced
    type Error = ();

    #[inline]
    fn parse_prelude<'input>(
        &mut self,
        _name: CowRcStr<'input>,
        _input: &mut Parser<'input, '_>,
    ) -> Result<Self::Prelude, ParseError<'input, Self::Error>> {
        Ok(())
    }

    #[inline]
    fn parse_block<'input>(
        &mut self,
        _prelude: Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::AtRule, ParseError<'input, Self::Error>> {
        // Not produced by this parser
        Err(input.new_error(BasicParseErrorKind::AtRuleBodyInvalid))
    }

    #[inline]
    fn rule_without_block(
        &mut self,
        _prelude: Self::Prelude,
        _state: &ParserState,
    ) -> Result<Self::AtRule, Self::Error> {
        Err(())
    }
}

impl CssQualifiedRuleParser<'_> for BodyDeclParser {
    type Prelude = ();
    type QualifiedRule = Declaration; // Not produced
    type Error = ();

    #[inline]
    fn parse_prelude<'input>(
        &mut self,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::Prelude, ParseError<'input, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid))
    }

    #[inline]
    fn parse_block<'input>(
        &mut self,
        _prelude: Self::Prelude,
        _state: &ParserState,
        input: &mut Parser<'input, '_>,
    ) -> Result<Self::QualifiedRule, ParseError<'input, Self::Error>> {
        Err(input.new_error(BasicParseErrorKind::QualifiedRuleInvalid))
    }
}

impl CssRuleBodyItemParser<'_, Declaration, ()> for BodyDeclParser {
    fn parse_declarations(&self) -> bool {
        true
    }
    fn parse_qualified(&self) -> bool {
        false
    }
}

/// Parse a declaration block body (e.g. a style attribute's content) into
/// declarations, in source order. Invalid declarations are skipped.
pub fn parse_declaration_block(css_text: &str) -> Vec<Declaration> {
    let mut input = ParserInput::new(css_text);
    let mut parser = Parser::new(&mut input);
    let mut body = BodyDeclParser;
    let mut out: Vec<Declaration> = Vec::new();
    for decl in CssRuleBodyParser::new(&mut parser, &mut body).flatten() {
        out.push(decl);
    }
    out
}

/// Consume every token of a nested block, discarding them.
fn consume_nested<'input>(inner: &mut Parser<'input, '_>) -> Result<(), ParseError<'input, ()>> {
    while inner.next_including_whitespace_and_comments().is_ok() {}
    Ok(())
}

/// Recursive scan for substitution references at any nesting depth.
fn scan_references(input: &mut Parser<'_, '_>) -> bool {
    let mut found = false;
    loop {
        let token = match input.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        match token {
            Token::Function(ref name) => {
                if is_reference_function(name) {
                    found = true;
                }
                let nested: Result<bool, ParseError<'_, ()>> =
                    input.parse_nested_block(|inner| Ok(scan_references(inner)));
                if nested.unwrap_or(false) {
                    found = true;
                }
            }
            Token::ParenthesisBlock | Token::SquareBracketBlock | Token::CurlyBracketBlock => {
                let nested: Result<bool, ParseError<'_, ()>> =
                    input.parse_nested_block(|inner| Ok(scan_references(inner)));
                if nested.unwrap_or(false) {
                    found = true;
                }
            }
            _ => {}
        }
    }
    found
}

/// Whether a function name introduces a substitution reference.
///
/// Dashed function names (`--name(…)`) are user-defined function calls.
/// Spec: <https://www.w3.org/TR/css-variables-1/#using-variables>
pub fn is_reference_function(name: &str) -> bool {
    name.eq_ignore_ascii_case("var")
        || name.eq_ignore_ascii_case("env")
        || name.eq_ignore_ascii_case("attr")
        || name.starts_with("--")
}

/// Whether a value's text contains `var()`, `env()`, `attr()` or a
/// user-defined function call at any nesting depth.
pub fn has_references(value_text: &str) -> bool {
    let mut input = ParserInput::new(value_text);
    let mut parser = Parser::new(&mut input);
    scan_references(&mut parser)
}

/// Parse a text that consists of exactly one CSS identifier.
pub fn parse_single_ident(value_text: &str) -> Option<String> {
    let mut input = ParserInput::new(value_text.trim());
    let mut parser = Parser::new(&mut input);
    let ident = match parser.next() {
        Ok(Token::Ident(name)) => name.to_string(),
        _ => return None,
    };
    if parser.is_exhausted() { Some(ident) } else { None }
}

/// Whether a text tokenizes without errors (balanced blocks, closed
/// strings); used to validate attribute-derived substitution text.
pub fn is_valid_token_stream(value_text: &str) -> bool {
    let mut input = ParserInput::new(value_text);
    let mut parser = Parser::new(&mut input);
    tokens_are_valid(&mut parser)
}

fn tokens_are_valid(input: &mut Parser<'_, '_>) -> bool {
    loop {
        let token = match input.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        match token {
            Token::BadString(_) | Token::BadUrl(_) | Token::CloseParenthesis
            | Token::CloseSquareBracket | Token::CloseCurlyBracket => return false,
            Token::Function(_)
            | Token::ParenthesisBlock
            | Token::SquareBracketBlock
            | Token::CurlyBracketBlock => {
                let nested: Result<bool, ParseError<'_, ()>> =
                    input.parse_nested_block(|inner| Ok(tokens_are_valid(inner)));
                if !nested.unwrap_or(false) {
                    return false;
                }
            }
            _ => {}
        }
    }
    true
}

/// Split a value into its top-level whitespace-separated components,
/// keeping functions and bracketed blocks intact.
///
/// Used for slicing resolved shorthand text into longhand parts.
pub fn split_top_level_components(value_text: &str) -> Vec<String> {
    let mut input = ParserInput::new(value_text);
    let mut parser = Parser::new(&mut input);
    let mut components: Vec<String> = Vec::new();
    let mut current = String::new();
    loop {
        let start = parser.position();
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        match token {
            Token::WhiteSpace(_) | Token::Comment(_) => {
                if !current.is_empty() {
                    components.push(core::mem::take(&mut current));
                }
            }
            Token::Function(_)
            | Token::ParenthesisBlock
            | Token::SquareBracketBlock
            | Token::CurlyBracketBlock => {
                if parser.parse_nested_block(consume_nested).is_err() {
                    break;
                }
                current.push_str(parser.slice_from(start));
            }
            _ => current.push_str(parser.slice_from(start)),
        }
    }
    if !current.is_empty() {
        components.push(current);
    }
    components
}
