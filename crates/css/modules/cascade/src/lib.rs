//! CSS Cascading and Inheritance Level 5 — Cascade sorting and the priority map.
//! Spec: <https://www.w3.org/TR/css-cascade-5/>

#![forbid(unsafe_code)]

use core::cmp::Ordering;
use css_properties::PropertyId;
use smallvec::SmallVec;
use std::collections::HashMap;

/// Selector specificity (id, class-like, type-like), lexicographically ordered.
/// Spec: <https://www.w3.org/TR/selectors-4/#specificity-rules>
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity(pub u16, pub u16, pub u16);

/// Cascade layer order within an origin, increasing with layer declaration
/// order. Unlayered declarations use [`IMPLICIT_OUTER_LAYER`], which sorts
/// after every named layer for normal declarations; the encoding for
/// important declarations reverses this per spec.
/// Spec: <https://www.w3.org/TR/css-cascade-5/#layer-ordering>
pub type LayerOrder = u16;

/// Layer order of declarations outside any `@layer`.
pub const IMPLICIT_OUTER_LAYER: LayerOrder = LayerOrder::MAX;

/// Cascade origins, ordered by precedence (lowest first). `!important`
/// declarations are promoted to the mirrored important origins; transitions
/// outrank everything.
/// Spec: <https://www.w3.org/TR/css-cascade-5/#cascade-origin>
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CascadeOrigin {
    UserAgent,
    User,
    Author,
    Animation,
    ImportantAuthor,
    ImportantUser,
    ImportantUserAgent,
    Transition,
}

impl CascadeOrigin {
    /// Precedence rank; higher wins.
    pub const fn rank(self) -> u8 {
        match self {
            Self::UserAgent => 0,
            Self::User => 1,
            Self::Author => 2,
            Self::Animation => 3,
            Self::ImportantAuthor => 4,
            Self::ImportantUser => 5,
            Self::ImportantUserAgent => 6,
            Self::Transition => 7,
        }
    }

    /// The origin an `!important` declaration of this origin is promoted to.
    /// Note the inversion: UA-important outranks user-important outranks
    /// author-important.
    pub const fn important(self) -> Self {
        match self {
            Self::UserAgent => Self::ImportantUserAgent,
            Self::User => Self::ImportantUser,
            Self::Author => Self::ImportantAuthor,
            other => other,
        }
    }

    /// Whether this is one of the important origins.
    pub const fn is_important(self) -> bool {
        matches!(
            self,
            Self::ImportantAuthor | Self::ImportantUser | Self::ImportantUserAgent
        )
    }

    /// The declaration origin with importance stripped. Interpolation
    /// origins have no base and return `None`.
    pub const fn base(self) -> Option<Self> {
        match self {
            Self::UserAgent | Self::ImportantUserAgent => Some(Self::UserAgent),
            Self::User | Self::ImportantUser => Some(Self::User),
            Self::Author | Self::ImportantAuthor => Some(Self::Author),
            Self::Animation | Self::Transition => None,
        }
    }
}

/// Where a declaration's value can be looked up when a cascade entry wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeclarationPosition {
    /// A declaration in the match result: block index, declaration index.
    Declaration { block: u16, index: u16 },
    /// An active interpolation: interpolation set index.
    Interpolation { set: u16 },
}

/// Priority tuple used to order declarations in the cascade.
///
/// Ordering compares origin, layer order, style-attribute provenance,
/// specificity, then source order; `position` rides along for value lookup
/// and does not participate. Source order is unique per declaration, so two
/// priorities for distinct declarations never compare equal.
/// Spec: <https://www.w3.org/TR/css-cascade-5/#cascade-sort>
#[derive(Clone, Copy, Debug)]
pub struct CascadePriority {
    /// Spec: Section 6.1 — Cascade origins (with importance applied)
    pub origin: CascadeOrigin,
    /// Layer order within origin, already reversed for important origins.
    /// Spec: Section 6.4 — Cascade layers
    pub layer_order: LayerOrder,
    /// Declarations from the style attribute beat stylesheet declarations
    /// in the same origin/layer tier.
    /// Spec: Section 6.5 — Style attribute
    pub is_inline_style: bool,
    /// Spec: Selectors — specificity
    pub specificity: Specificity,
    /// Source order index, increasing with appearance; final tie-breaker.
    pub source_order: u32,
    /// Value lookup position; not part of the ordering.
    pub position: DeclarationPosition,
}

impl CascadePriority {
    /// Rank a declaration into a priority, applying importance promotion and
    /// the important-layer reversal.
    pub const fn new(
        origin: CascadeOrigin,
        important: bool,
        layer_order: LayerOrder,
        is_inline_style: bool,
        specificity: Specificity,
        source_order: u32,
        position: DeclarationPosition,
    ) -> Self {
        let origin = if important { origin.important() } else { origin };
        let layer_order = if origin.is_important() {
            LayerOrder::MAX - layer_order
        } else {
            layer_order
        };
        Self {
            origin,
            layer_order,
            is_inline_style,
            specificity,
            source_order,
            position,
        }
    }

    /// Priority for an active interpolation entry.
    pub const fn for_interpolation(
        origin: CascadeOrigin,
        source_order: u32,
        position: DeclarationPosition,
    ) -> Self {
        Self {
            origin,
            layer_order: 0,
            is_inline_style: false,
            specificity: Specificity(0, 0, 0),
            source_order,
            position,
        }
    }

    const fn key(&self) -> (u8, LayerOrder, bool, Specificity, u32) {
        (
            self.origin.rank(),
            self.layer_order,
            self.is_inline_style,
            self.specificity,
            self.source_order,
        )
    }
}

impl PartialEq for CascadePriority {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for CascadePriority {}

impl PartialOrd for CascadePriority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CascadePriority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Filter applied during one apply pass; rejected properties are neither
/// resolved nor marked applied, so a later pass with a different filter can
/// still apply them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CascadeFilter {
    /// Reject properties that inherit by default.
    pub reject_inherited: bool,
    /// Reject properties that do not inherit by default.
    pub reject_non_inherited: bool,
    /// Reject UA-internal properties (set while the element has no
    /// appearance).
    pub reject_internal_ua: bool,
}

impl CascadeFilter {
    /// Whether the filter rejects the given property.
    pub fn rejects(&self, property: &PropertyId) -> bool {
        if self.reject_inherited && property.is_inherited() {
            return true;
        }
        if self.reject_non_inherited && !property.is_inherited() {
            return true;
        }
        self.reject_internal_ua && property.is_internal_ua()
    }
}

/// One property's cascade state: candidate priorities (best per
/// origin/layer tier, descending) and the generation of the last apply.
#[derive(Clone, Debug, Default)]
struct PropertyNode {
    entries: SmallVec<CascadePriority, 2>,
    generation: u8,
}

impl PropertyNode {
    /// Insert keeping the best entry per (origin, layer) tier and the list
    /// sorted descending; a lower-priority re-insertion is a no-op.
    fn insert(&mut self, priority: CascadePriority) {
        let tier = (priority.origin.rank(), priority.layer_order);
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|entry| (entry.origin.rank(), entry.layer_order) == tier)
        {
            if priority > *existing {
                *existing = priority;
            }
        } else {
            self.entries.push(priority);
        }
        self.entries.sort_by(|left, right| right.cmp(left));
    }
}

/// Mapping from property identity to its winning [`CascadePriority`] plus
/// per-origin candidates (needed by `revert` / `revert-layer`) and the
/// generation stamp of the last application.
#[derive(Debug, Default)]
pub struct CascadeMap {
    nodes: HashMap<PropertyId, PropertyNode>,
    inline_style_lost: bool,
}

impl CascadeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a candidate declaration; keeps the highest priority seen.
    pub fn insert(&mut self, property: PropertyId, priority: CascadePriority) {
        let node = self.nodes.entry(property).or_default();
        node.insert(priority);
        if node
            .entries
            .iter()
            .skip(1)
            .any(|entry| entry.is_inline_style)
        {
            self.inline_style_lost = true;
        }
    }

    /// The winning priority for a property, if any declaration matched.
    pub fn find(&self, property: &PropertyId) -> Option<&CascadePriority> {
        self.nodes
            .get(property)
            .and_then(|node| node.entries.first())
    }

    /// The best declaration entry strictly below `below` in base-origin
    /// terms, for `revert`. Interpolation entries are skipped.
    /// Spec: <https://www.w3.org/TR/css-cascade-5/#default>
    pub fn find_reverted(
        &self,
        property: &PropertyId,
        below: CascadeOrigin,
    ) -> Option<&CascadePriority> {
        let below_rank = below.base()?.rank();
        self.nodes.get(property).and_then(|node| {
            node.entries.iter().find(|entry| {
                entry
                    .origin
                    .base()
                    .is_some_and(|base| base.rank() < below_rank)
            })
        })
    }

    /// The best entry in the same origin with a layer below `layer`, for
    /// `revert-layer`. Returns `None` when no lower layer exists in the
    /// origin; the caller then falls back to `revert` semantics.
    /// Spec: <https://www.w3.org/TR/css-cascade-5/#revert-layer>
    pub fn find_reverted_layer(
        &self,
        property: &PropertyId,
        origin: CascadeOrigin,
        layer: LayerOrder,
    ) -> Option<&CascadePriority> {
        self.nodes.get(property).and_then(|node| {
            node.entries
                .iter()
                .find(|entry| entry.origin.rank() == origin.rank() && entry.layer_order < layer)
        })
    }

    /// The generation in which the property was last applied (0 = never).
    pub fn generation(&self, property: &PropertyId) -> u8 {
        self.nodes
            .get(property)
            .map_or(0, |node| node.generation)
    }

    /// Record that the property's value was written during `generation`.
    pub fn stamp(&mut self, property: &PropertyId, generation: u8) {
        if let Some(node) = self.nodes.get_mut(property) {
            node.generation = generation;
        }
    }

    /// Whether an inline-style declaration has been beaten by a
    /// higher-priority declaration.
    pub const fn inline_style_lost(&self) -> bool {
        self.inline_style_lost
    }

    /// Properties currently tracked, with their winning priorities.
    pub fn iter(&self) -> impl Iterator<Item = (&PropertyId, &CascadePriority)> {
        self.nodes
            .iter()
            .filter_map(|(property, node)| node.entries.first().map(|top| (property, top)))
    }

    /// Empty the map; used when a full re-analysis is required.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.inline_style_lost = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POSITION: DeclarationPosition = DeclarationPosition::Declaration { block: 0, index: 0 };

    fn author(important: bool, specificity: Specificity, source_order: u32) -> CascadePriority {
        CascadePriority::new(
            CascadeOrigin::Author,
            important,
            IMPLICIT_OUTER_LAYER,
            false,
            specificity,
            source_order,
            POSITION,
        )
    }

    #[test]
    fn important_beats_later_normal_declaration() {
        let normal = author(false, Specificity(1, 0, 0), 7);
        let important = author(true, Specificity(0, 0, 1), 2);
        assert!(important > normal);
    }

    #[test]
    fn user_important_beats_author_important() {
        let author_important = author(true, Specificity(9, 9, 9), 9);
        let user_important = CascadePriority::new(
            CascadeOrigin::User,
            true,
            IMPLICIT_OUTER_LAYER,
            false,
            Specificity(0, 0, 0),
            1,
            POSITION,
        );
        assert!(user_important > author_important);
    }

    #[test]
    fn layer_order_reverses_for_important() {
        let early_layer = |important| {
            CascadePriority::new(
                CascadeOrigin::Author,
                important,
                0,
                false,
                Specificity(0, 0, 1),
                1,
                POSITION,
            )
        };
        let late_layer = |important| {
            CascadePriority::new(
                CascadeOrigin::Author,
                important,
                1,
                false,
                Specificity(0, 0, 1),
                2,
                POSITION,
            )
        };
        // Normal: later layers win. Important: earlier layers win.
        assert!(late_layer(false) > early_layer(false));
        assert!(early_layer(true) > late_layer(true));
    }

    #[test]
    fn inline_style_beats_stylesheet_specificity() {
        let stylesheet = author(false, Specificity(9, 9, 9), 1);
        let inline = CascadePriority::new(
            CascadeOrigin::Author,
            false,
            IMPLICIT_OUTER_LAYER,
            true,
            Specificity(0, 0, 0),
            2,
            POSITION,
        );
        assert!(inline > stylesheet);
    }

    #[test]
    fn priority_order_is_strict_and_deterministic() {
        let first = author(false, Specificity(0, 1, 0), 1);
        let second = author(false, Specificity(0, 1, 0), 2);
        assert!(second > first);
        assert!(first < second);
        assert_ne!(first, second);
    }

    #[test]
    fn map_keeps_highest_and_reverts_by_origin() {
        let mut map = CascadeMap::new();
        let property = PropertyId::Color;
        let ua_entry = CascadePriority::new(
            CascadeOrigin::UserAgent,
            false,
            IMPLICIT_OUTER_LAYER,
            false,
            Specificity(0, 0, 1),
            0,
            POSITION,
        );
        let author_entry = author(false, Specificity(0, 0, 1), 1);
        map.insert(property.clone(), author_entry);
        map.insert(property.clone(), ua_entry);
        assert_eq!(map.find(&property), Some(&author_entry));
        assert_eq!(
            map.find_reverted(&property, CascadeOrigin::Author),
            Some(&ua_entry)
        );
        assert_eq!(map.find_reverted(&property, CascadeOrigin::UserAgent), None);
    }

    #[test]
    fn generation_stamp_round_trips() {
        let mut map = CascadeMap::new();
        let property = PropertyId::Width;
        map.insert(property.clone(), author(false, Specificity(0, 0, 1), 0));
        assert_eq!(map.generation(&property), 0);
        map.stamp(&property, 3);
        assert_eq!(map.generation(&property), 3);
        map.clear();
        assert_eq!(map.find(&property), None);
    }
}
