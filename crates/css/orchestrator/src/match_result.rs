//! The declaration store: matched declarations grouped into blocks tagged
//! with origin, layer, and provenance, classified for resolution.
//!
//! Selector matching happens upstream; blocks arrive here already ordered,
//! with origin/layer/specificity/source-order encoded by the caller.

use css_cascade::{CascadeOrigin, DeclarationPosition, LayerOrder, Specificity};
use css_properties::{PropertyId, ShorthandId};
use css_syntax::CssWideKeyword;
use css_variables::VariableData;
use log::warn;
use std::sync::Arc;

/// A declaration's value, classified at insertion into the closed set of
/// shapes the resolver matches exhaustively.
#[derive(Clone, Debug)]
pub enum CascadeValue {
    /// No dependency tokens; applied as-is.
    Literal(String),
    /// Contains `var()`/`env()`/`attr()`/function references.
    Unparsed(Arc<VariableData>),
    /// One longhand's share of a shorthand declared with references; the
    /// substitution is resolved once and sliced per longhand.
    PendingSubstitution {
        shorthand: ShorthandId,
        data: Arc<VariableData>,
    },
    /// A CSS-wide keyword (`initial`/`inherit`/`unset`/`revert`/`revert-layer`).
    Keyword(CssWideKeyword),
}

/// One matched declaration with per-declaration cascade inputs.
#[derive(Clone, Debug)]
pub struct MatchedDeclaration {
    pub property: PropertyId,
    pub value: CascadeValue,
    pub important: bool,
    pub specificity: Specificity,
}

/// A group of declarations sharing origin, layer, and provenance (one
/// matched rule, the style attribute, or a conditional try set).
#[derive(Clone, Debug)]
pub struct MatchedBlock {
    pub origin: CascadeOrigin,
    pub layer_order: LayerOrder,
    pub is_inline_style: bool,
    /// Declarations from a conditional try set are treated as `revert-layer`
    /// unless the element is out-of-flow positioned.
    pub is_try_set: bool,
    pub declarations: Vec<MatchedDeclaration>,
}

/// Ordered matched declarations for one element, populated by the matching
/// subsystem between `reset()` and the first `apply()`.
#[derive(Debug, Default)]
pub struct MatchResult {
    pub(crate) blocks: Vec<MatchedBlock>,
}

impl MatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a declaration block for a matched rule.
    pub fn begin_block(&mut self, origin: CascadeOrigin, layer_order: LayerOrder) {
        self.push_block(origin, layer_order, false, false);
    }

    /// Open the style attribute's declaration block (author origin, above
    /// every layer).
    pub fn begin_inline_style_block(&mut self) {
        self.push_block(
            CascadeOrigin::Author,
            css_cascade::IMPLICIT_OUTER_LAYER,
            true,
            false,
        );
    }

    /// Open a conditional try-set block (author origin).
    pub fn begin_try_set_block(&mut self, layer_order: LayerOrder) {
        self.push_block(CascadeOrigin::Author, layer_order, false, true);
    }

    fn push_block(
        &mut self,
        origin: CascadeOrigin,
        layer_order: LayerOrder,
        is_inline_style: bool,
        is_try_set: bool,
    ) {
        self.blocks.push(MatchedBlock {
            origin,
            layer_order,
            is_inline_style,
            is_try_set,
            declarations: Vec::new(),
        });
    }

    /// Add a declaration to the current block, classifying its value.
    /// Shorthands are expanded to their longhands here; unknown non-custom
    /// property names are skipped.
    pub fn add_declaration(
        &mut self,
        name: &str,
        value_text: &str,
        important: bool,
        specificity: Specificity,
    ) {
        if self.blocks.is_empty() {
            // Tolerate a missing begin_block; matching bugs should not take
            // the cascade down.
            self.begin_block(CascadeOrigin::Author, css_cascade::IMPLICIT_OUTER_LAYER);
        }
        let value_text = value_text.trim();
        if let Some(shorthand) = ShorthandId::parse(name) {
            self.add_shorthand(shorthand, value_text, important, specificity);
            return;
        }
        let Some(property) = PropertyId::parse(name) else {
            warn!("skipping unknown property `{name}` from matching");
            return;
        };
        let value = classify_value(value_text);
        self.push_declaration(MatchedDeclaration {
            property,
            value,
            important,
            specificity,
        });
    }

    /// Parse a whole declaration block (e.g. a style attribute's text) and
    /// add its declarations to the current block in source order.
    pub fn add_declaration_block(&mut self, css_text: &str, specificity: Specificity) {
        for declaration in css_syntax::parse_declaration_block(css_text) {
            self.add_declaration(
                &declaration.name,
                &declaration.value,
                declaration.important,
                specificity,
            );
        }
    }

    /// Expand a shorthand into its longhands. With references the whole
    /// substitution is shared and sliced after resolution; without, the
    /// top-level components are sliced immediately.
    fn add_shorthand(
        &mut self,
        shorthand: ShorthandId,
        value_text: &str,
        important: bool,
        specificity: Specificity,
    ) {
        if let Some(keyword) = css_syntax::parse_css_wide_keyword(value_text) {
            for longhand in shorthand.longhands() {
                self.push_declaration(MatchedDeclaration {
                    property: longhand.clone(),
                    value: CascadeValue::Keyword(keyword),
                    important,
                    specificity,
                });
            }
            return;
        }
        if css_syntax::has_references(value_text) {
            let data = VariableData::new(value_text, false, false);
            for longhand in shorthand.longhands() {
                self.push_declaration(MatchedDeclaration {
                    property: longhand.clone(),
                    value: CascadeValue::PendingSubstitution {
                        shorthand,
                        data: Arc::clone(&data),
                    },
                    important,
                    specificity,
                });
            }
            return;
        }
        let components = css_syntax::split_top_level_components(value_text);
        for longhand in shorthand.longhands() {
            let Some(part) = shorthand.slice_for_longhand(longhand, &components) else {
                warn!(
                    "skipping malformed `{}` shorthand value `{value_text}`",
                    longhand.name()
                );
                continue;
            };
            self.push_declaration(MatchedDeclaration {
                property: longhand.clone(),
                value: CascadeValue::Literal(part),
                important,
                specificity,
            });
        }
    }

    fn push_declaration(&mut self, declaration: MatchedDeclaration) {
        if let Some(block) = self.blocks.last_mut() {
            block.declarations.push(declaration);
        }
    }

    /// The blocks added so far, in match order.
    pub fn blocks(&self) -> &[MatchedBlock] {
        &self.blocks
    }

    /// Look up a declaration by its cascade position.
    pub(crate) fn declaration_at(
        &self,
        position: DeclarationPosition,
    ) -> Option<(&MatchedBlock, &MatchedDeclaration)> {
        let DeclarationPosition::Declaration { block, index } = position else {
            return None;
        };
        let block = self.blocks.get(usize::from(block))?;
        let declaration = block.declarations.get(usize::from(index))?;
        Some((block, declaration))
    }

    pub(crate) fn clear(&mut self) {
        self.blocks.clear();
    }
}

/// Classify a longhand (or custom property) value.
fn classify_value(value_text: &str) -> CascadeValue {
    if let Some(keyword) = css_syntax::parse_css_wide_keyword(value_text) {
        return CascadeValue::Keyword(keyword);
    }
    if css_syntax::has_references(value_text) {
        return CascadeValue::Unparsed(VariableData::new(value_text, false, false));
    }
    CascadeValue::Literal(value_text.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_classified_at_insertion() {
        let mut result = MatchResult::new();
        result.begin_block(CascadeOrigin::Author, css_cascade::IMPLICIT_OUTER_LAYER);
        result.add_declaration("color", "red", false, Specificity(0, 0, 1));
        result.add_declaration("width", "var(--w)", false, Specificity(0, 0, 1));
        result.add_declaration("height", "revert", false, Specificity(0, 0, 1));
        result.add_declaration("flub", "1", false, Specificity(0, 0, 1));

        let declarations = &result.blocks()[0].declarations;
        assert_eq!(declarations.len(), 3);
        assert!(matches!(declarations[0].value, CascadeValue::Literal(_)));
        assert!(matches!(declarations[1].value, CascadeValue::Unparsed(_)));
        assert!(matches!(
            declarations[2].value,
            CascadeValue::Keyword(CssWideKeyword::Revert)
        ));
    }

    #[test]
    fn shorthands_expand_to_longhands() {
        let mut result = MatchResult::new();
        result.begin_block(CascadeOrigin::Author, css_cascade::IMPLICIT_OUTER_LAYER);
        result.add_declaration("margin", "1px 2px", false, Specificity(0, 0, 1));
        let declarations = &result.blocks()[0].declarations;
        assert_eq!(declarations.len(), 4);
        assert_eq!(declarations[0].property, PropertyId::MarginTop);
        assert!(
            matches!(&declarations[3].value, CascadeValue::Literal(text) if text == "2px")
        );
    }

    #[test]
    fn shorthands_with_references_share_one_substitution() {
        let mut result = MatchResult::new();
        result.begin_block(CascadeOrigin::Author, css_cascade::IMPLICIT_OUTER_LAYER);
        result.add_declaration("padding", "var(--pad)", false, Specificity(0, 0, 1));
        let declarations = &result.blocks()[0].declarations;
        assert_eq!(declarations.len(), 4);
        for declaration in declarations {
            assert!(matches!(
                declaration.value,
                CascadeValue::PendingSubstitution { .. }
            ));
        }
    }
}
