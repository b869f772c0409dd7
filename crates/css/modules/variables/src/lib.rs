//! CSS Custom Properties for Cascading Variables Module Level 1 — variable
//! data, substitution building, and environment variables.
//! Spec: <https://www.w3.org/TR/css-variables-1/>,
//! <https://www.w3.org/TR/css-env-1/>

#![forbid(unsafe_code)]

mod substitute;
mod token_sequence;

pub use substitute::{
    AttrSyntax, Substitution, SubstitutionContext, SubstitutionError, substitute_references,
};
pub use token_sequence::{MAX_SUBSTITUTION_BYTES, TokenSequence};

use cssparser::{ParseError, Parser, ParserInput, Token};
use std::collections::HashMap;
use std::sync::Arc;

/// Flags carried by a [`VariableData`], precomputed at construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VariableFlags {
    /// Value came (possibly transitively) from an animation keyframe.
    /// Spec: <https://www.w3.org/TR/css-variables-1/#animation-tainted>
    pub is_animation_tainted: bool,
    /// Value came (possibly transitively) from an `attr()` substitution.
    pub is_attr_tainted: bool,
    /// Contains font-relative units (em/ex/ch/cap/ic).
    pub has_font_units: bool,
    /// Contains root-font-relative units (rem/rex/rch/rcap/ric).
    pub has_root_font_units: bool,
    /// Contains line-height-relative units (lh/rlh).
    pub has_line_height_units: bool,
    /// Contains `var()`/`env()`/`attr()`/user-defined function references.
    pub has_references: bool,
}

/// The value of a custom property (or environment variable): the exact
/// original text plus flags needed for cycle safety and tainting.
///
/// The text is kept byte-for-byte as authored so that substitution
/// reproduces insignificant whitespace and number formatting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableData {
    text: String,
    flags: VariableFlags,
}

impl VariableData {
    /// Build from value text, scanning for units and references.
    pub fn new(text: impl Into<String>, is_animation_tainted: bool, is_attr_tainted: bool) -> Arc<Self> {
        let text = text.into();
        let mut flags = scan_flags(&text);
        flags.is_animation_tainted = is_animation_tainted;
        flags.is_attr_tainted = is_attr_tainted;
        Arc::new(Self { text, flags })
    }

    /// Build from already-known flags (used by [`TokenSequence`] to avoid
    /// rescanning substituted output).
    pub(crate) fn with_flags(text: String, flags: VariableFlags) -> Arc<Self> {
        Arc::new(Self { text, flags })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub const fn flags(&self) -> VariableFlags {
        self.flags
    }

    pub const fn is_animation_tainted(&self) -> bool {
        self.flags.is_animation_tainted
    }

    pub const fn is_attr_tainted(&self) -> bool {
        self.flags.is_attr_tainted
    }

    pub const fn has_references(&self) -> bool {
        self.flags.has_references
    }

    pub const fn has_font_units(&self) -> bool {
        self.flags.has_font_units
    }

    pub const fn has_root_font_units(&self) -> bool {
        self.flags.has_root_font_units
    }

    pub const fn has_line_height_units(&self) -> bool {
        self.flags.has_line_height_units
    }
}

/// Single-pass recursive scan for dependency-relevant units and references.
fn scan_flags(text: &str) -> VariableFlags {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    let mut flags = VariableFlags::default();
    scan_tokens(&mut parser, &mut flags);
    flags
}

fn scan_tokens(input: &mut Parser<'_, '_>, flags: &mut VariableFlags) {
    loop {
        let token = match input.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        match token {
            Token::Dimension { ref unit, .. } => record_unit(unit, flags),
            Token::Function(ref name) => {
                if name.eq_ignore_ascii_case("var")
                    || name.eq_ignore_ascii_case("env")
                    || name.eq_ignore_ascii_case("attr")
                    || name.starts_with("--")
                {
                    flags.has_references = true;
                }
                descend(input, flags);
            }
            Token::ParenthesisBlock | Token::SquareBracketBlock | Token::CurlyBracketBlock => {
                descend(input, flags);
            }
            _ => {}
        }
    }
}

fn descend(input: &mut Parser<'_, '_>, flags: &mut VariableFlags) {
    let nested: Result<(), ParseError<'_, ()>> = input.parse_nested_block(|inner| {
        scan_tokens(inner, flags);
        Ok(())
    });
    drop(nested);
}

/// Record font-dependency flags for a dimension unit.
/// Spec: <https://drafts.css-houdini.org/css-properties-values-api-1/#dependency-cycles>
fn record_unit(unit: &str, flags: &mut VariableFlags) {
    if unit.eq_ignore_ascii_case("em")
        || unit.eq_ignore_ascii_case("ex")
        || unit.eq_ignore_ascii_case("ch")
        || unit.eq_ignore_ascii_case("cap")
        || unit.eq_ignore_ascii_case("ic")
    {
        flags.has_font_units = true;
    } else if unit.eq_ignore_ascii_case("rem")
        || unit.eq_ignore_ascii_case("rex")
        || unit.eq_ignore_ascii_case("rch")
        || unit.eq_ignore_ascii_case("rcap")
        || unit.eq_ignore_ascii_case("ric")
    {
        flags.has_root_font_units = true;
    } else if unit.eq_ignore_ascii_case("lh") || unit.eq_ignore_ascii_case("rlh") {
        flags.has_line_height_units = true;
    }
}

/// Key of an environment variable: case-sensitive name plus integer indices
/// (e.g. `env(viewport-segment-width 0 0)`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct EnvironmentKey {
    name: String,
    indices: Vec<u32>,
}

/// Named environment values supplied by the embedder for `env()` resolution.
/// Lookups are case-sensitive.
/// Spec: <https://www.w3.org/TR/css-env-1/#environment>
#[derive(Debug, Default)]
pub struct EnvironmentMap {
    values: HashMap<EnvironmentKey, Arc<VariableData>>,
}

impl EnvironmentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an unindexed environment value.
    pub fn set(&mut self, name: &str, value_text: &str) {
        self.set_indexed(name, &[], value_text);
    }

    /// Register an indexed environment value.
    pub fn set_indexed(&mut self, name: &str, indices: &[u32], value_text: &str) {
        let key = EnvironmentKey {
            name: name.to_owned(),
            indices: indices.to_vec(),
        };
        self.values
            .insert(key, VariableData::new(value_text, false, false));
    }

    /// Look up an environment value by exact name and indices.
    pub fn lookup(&self, name: &str, indices: &[u32]) -> Option<&Arc<VariableData>> {
        let key = EnvironmentKey {
            name: name.to_owned(),
            indices: indices.to_vec(),
        };
        self.values.get(&key)
    }
}
