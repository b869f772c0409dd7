//! Builder for the "equivalent token sequence" produced by substitution.
//! Spec: <https://www.w3.org/TR/css-variables-1/#substitute-a-var>

use crate::{VariableData, VariableFlags};
use smallvec::SmallVec;
use std::sync::Arc;

/// Byte budget for a single substitution result. Exceeding it rejects the
/// append, which the resolver treats as invalid at computed-value time;
/// adversarial `var()` chains therefore cannot grow memory unboundedly.
pub const MAX_SUBSTITUTION_BYTES: usize = 2 * 1024 * 1024;

/// Accumulates the text reconstructed while resolving one property's
/// dependency chain.
///
/// Unsubstituted spans keep their original text exactly (whitespace, number
/// formatting); where substituted text would re-tokenize together with the
/// preceding text, an empty comment is inserted to keep token boundaries.
/// Attr-tainted byte ranges are recorded so security checks need no rescan.
#[derive(Clone, Debug)]
pub struct TokenSequence {
    text: String,
    byte_limit: usize,
    flags: VariableFlags,
    /// Attr-tainted intervals [start, end).
    attr_taint_ranges: SmallVec<(usize, usize), 2>,
    /// Whether the last append spliced substituted (non-original) text.
    last_was_substituted: bool,
}

impl Default for TokenSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenSequence {
    pub fn new() -> Self {
        Self::with_byte_limit(MAX_SUBSTITUTION_BYTES)
    }

    pub fn with_byte_limit(byte_limit: usize) -> Self {
        Self {
            text: String::new(),
            byte_limit,
            flags: VariableFlags {
                is_animation_tainted: false,
                is_attr_tainted: false,
                has_font_units: false,
                has_root_font_units: false,
                has_line_height_units: false,
                has_references: false,
            },
            attr_taint_ranges: SmallVec::new(),
            last_was_substituted: false,
        }
    }

    /// Prepare a sequence for resolving `source`'s references: everything
    /// but the text carries over (taint, unit flags).
    pub fn from_source(source: &VariableData, byte_limit: usize) -> Self {
        let mut sequence = Self::with_byte_limit(byte_limit);
        sequence.flags = source.flags();
        sequence.flags.has_references = false;
        sequence
    }

    pub const fn byte_limit(&self) -> usize {
        self.byte_limit
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub const fn is_animation_tainted(&self) -> bool {
        self.flags.is_animation_tainted
    }

    /// Attr-tainted intervals [start, end) into [`Self::text`].
    pub fn attr_taint_ranges(&self) -> &[(usize, usize)] {
        &self.attr_taint_ranges
    }

    /// Append original (unsubstituted) source text. Returns false when the
    /// byte budget would be exceeded.
    pub fn append_raw(&mut self, source_text: &str) -> bool {
        if self.last_was_substituted {
            self.guard_boundary(source_text);
        }
        if !self.fits(source_text.len()) {
            return false;
        }
        self.text.push_str(source_text);
        self.last_was_substituted = false;
        true
    }

    /// Splice a variable's data (a `var()`/`env()` replacement). Merges
    /// taint and unit flags; records an attr-taint range when the data is
    /// attr-tainted.
    pub fn append_data(&mut self, data: &VariableData) -> bool {
        self.guard_boundary(data.text());
        if !self.fits(data.text().len()) {
            return false;
        }
        let start = self.text.len();
        self.text.push_str(data.text());
        if data.is_attr_tainted() {
            self.attr_taint_ranges.push((start, self.text.len()));
        }
        self.merge_flags(data.flags());
        self.last_was_substituted = true;
        true
    }

    /// Splice attribute-derived text; the whole appended range is tainted.
    pub fn append_attr_tainted(&mut self, attr_text: &str) -> bool {
        self.guard_boundary(attr_text);
        if !self.fits(attr_text.len()) {
            return false;
        }
        let start = self.text.len();
        self.text.push_str(attr_text);
        self.attr_taint_ranges.push((start, self.text.len()));
        self.flags.is_attr_tainted = true;
        self.last_was_substituted = true;
        true
    }

    /// Append a resolved fallback sequence, stripping its outer whitespace.
    pub fn append_fallback(&mut self, fallback: &Self) -> bool {
        let trimmed = fallback.text.trim();
        if trimmed.is_empty() {
            // An empty fallback is a valid (empty) substitution value.
            self.merge_flags(fallback.flags);
            return true;
        }
        let leading = fallback.text.len() - fallback.text.trim_start().len();
        self.guard_boundary(trimmed);
        if !self.fits(trimmed.len()) {
            return false;
        }
        let base = self.text.len();
        self.text.push_str(trimmed);
        for &(start, end) in &fallback.attr_taint_ranges {
            // Re-offset taint ranges into the receiving sequence, clamped to
            // the trimmed span.
            let start = base + start.saturating_sub(leading).min(trimmed.len());
            let end = base + end.saturating_sub(leading).min(trimmed.len());
            if start < end {
                self.attr_taint_ranges.push((start, end));
            }
        }
        self.merge_flags(fallback.flags);
        self.last_was_substituted = true;
        true
    }

    /// Finish the sequence into a [`VariableData`] carrying the merged flags.
    pub fn into_variable_data(self) -> Arc<VariableData> {
        let mut flags = self.flags;
        flags.is_attr_tainted = flags.is_attr_tainted || !self.attr_taint_ranges.is_empty();
        // References have been substituted away by construction.
        flags.has_references = false;
        VariableData::with_flags(self.text, flags)
    }

    fn merge_flags(&mut self, other: VariableFlags) {
        self.flags.is_animation_tainted |= other.is_animation_tainted;
        self.flags.is_attr_tainted |= other.is_attr_tainted;
        self.flags.has_font_units |= other.has_font_units;
        self.flags.has_root_font_units |= other.has_root_font_units;
        self.flags.has_line_height_units |= other.has_line_height_units;
    }

    fn fits(&self, additional: usize) -> bool {
        self.text.len().saturating_add(additional) <= self.byte_limit
    }

    /// Insert an empty comment when the sequence tail and the next text
    /// would otherwise paste into a different token.
    fn guard_boundary(&mut self, next_text: &str) {
        let Some(previous) = self.text.chars().last() else {
            return;
        };
        let Some(next) = next_text.chars().next() else {
            return;
        };
        if needs_comment(previous, next) && self.fits(4) {
            self.text.push_str("/**/");
        }
    }
}

/// Whether `previous` directly followed by `next` would re-tokenize
/// (ident/number/dimension coalescing).
fn needs_comment(previous: char, next: char) -> bool {
    let word = |character: char| {
        character.is_ascii_alphanumeric() || character == '_' || character == '-'
    };
    if word(previous) && (word(next) || next == '(' || next == '%') {
        return true;
    }
    (previous.is_ascii_digit() && next == '.') || (previous == '.' && next.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn original_text_is_preserved() {
        let mut sequence = TokenSequence::new();
        assert!(sequence.append_raw("  1.50px "));
        assert_eq!(sequence.text(), "  1.50px ");
    }

    #[test]
    fn boundary_guard_keeps_tokens_apart() {
        let mut sequence = TokenSequence::new();
        assert!(sequence.append_data(&VariableData::new("10", false, false)));
        assert!(sequence.append_raw("px"));
        assert_eq!(sequence.text(), "10/**/px");
    }

    #[test]
    fn budget_rejects_oversized_appends() {
        let mut sequence = TokenSequence::with_byte_limit(8);
        assert!(sequence.append_raw("12345678"));
        assert!(!sequence.append_raw("9"));
        assert_eq!(sequence.text(), "12345678");
    }

    #[test]
    fn attr_taint_ranges_are_recorded() {
        let mut sequence = TokenSequence::new();
        assert!(sequence.append_raw("url("));
        assert!(sequence.append_attr_tainted("evil"));
        assert!(sequence.append_raw(")"));
        assert_eq!(sequence.attr_taint_ranges(), &[(4, 8)]);
        let data = sequence.into_variable_data();
        assert!(data.is_attr_tainted());
        assert_eq!(data.text(), "url(evil)");
    }
}
