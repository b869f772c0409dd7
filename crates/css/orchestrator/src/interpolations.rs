//! Active animation/transition interpolations feeding the cascade.
//!
//! The animation subsystem hands over property → interpolated-value maps
//! tagged with an origin tier, so `!important` declarations can still
//! override animations (but not transitions) per cascade sorting.

use css_cascade::CascadeOrigin;
use css_properties::PropertyId;
use css_variables::VariableData;
use std::sync::Arc;

/// One batch of interpolated values sharing an origin.
#[derive(Clone, Debug)]
pub(crate) struct InterpolationSet {
    pub(crate) origin: CascadeOrigin,
    pub(crate) values: Vec<(PropertyId, Arc<VariableData>)>,
}

/// All interpolation sets added since the last reset.
#[derive(Debug, Default)]
pub struct CascadeInterpolations {
    pub(crate) sets: Vec<InterpolationSet>,
}

impl CascadeInterpolations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a batch of interpolated values. `origin` must be
    /// [`CascadeOrigin::Animation`] or [`CascadeOrigin::Transition`]; other
    /// origins are clamped to animation. Values are animation-tainted.
    pub fn add(&mut self, values: Vec<(PropertyId, String)>, origin: CascadeOrigin) {
        let origin = match origin {
            CascadeOrigin::Transition => CascadeOrigin::Transition,
            _ => CascadeOrigin::Animation,
        };
        let values = values
            .into_iter()
            .map(|(property, text)| (property, VariableData::new(text, true, false)))
            .collect();
        self.sets.push(InterpolationSet { origin, values });
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// The interpolated value for `property` in set `set_index`.
    pub(crate) fn find(&self, set_index: usize, property: &PropertyId) -> Option<&Arc<VariableData>> {
        self.sets.get(set_index).and_then(|set| {
            set.values
                .iter()
                .find(|(candidate, _)| candidate == property)
                .map(|(_, data)| data)
        })
    }

    pub(crate) fn clear(&mut self) {
        self.sets.clear();
    }
}
