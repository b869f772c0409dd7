//! Per-element resolution state: the element/environment inputs the
//! resolver reads, and the computed style object the applier writes.

use css_properties::{Direction, PropertyId, WritingMode};
use css_variables::{EnvironmentMap, VariableData};
use css_values_units::{compute_length_px, length_from_text};
use std::collections::HashMap;
use std::sync::Arc;

use crate::functions::FunctionRegistry;

/// The output style object. Computed values are stored as text keyed by
/// storage property; a few cascade-relevant values are additionally kept in
/// typed form.
#[derive(Clone, Debug, PartialEq)]
pub struct ComputedValues {
    values: HashMap<PropertyId, String>,
    /// Custom property values; `None` records the guaranteed-invalid value.
    custom: HashMap<String, Option<Arc<VariableData>>>,
    direction: Direction,
    writing_mode: WritingMode,
    has_appearance: bool,
    font_size_px: f32,
}

impl Default for ComputedValues {
    fn default() -> Self {
        Self {
            values: HashMap::new(),
            custom: HashMap::new(),
            direction: Direction::default(),
            writing_mode: WritingMode::default(),
            has_appearance: false,
            font_size_px: 16.0,
        }
    }
}

impl ComputedValues {
    /// The computed value text written for a property, if any.
    pub fn value(&self, property: &PropertyId) -> Option<&str> {
        self.values
            .get(&property.storage_id())
            .map(String::as_str)
    }

    /// The computed value of a custom property; `None` covers both "never
    /// set" and the guaranteed-invalid value.
    pub fn custom_value(&self, name: &str) -> Option<&Arc<VariableData>> {
        self.custom.get(name).and_then(Option::as_ref)
    }

    pub const fn direction(&self) -> Direction {
        self.direction
    }

    pub const fn writing_mode(&self) -> WritingMode {
        self.writing_mode
    }

    /// Whether `-webkit-appearance` computed to something other than `none`.
    pub const fn has_appearance(&self) -> bool {
        self.has_appearance
    }

    pub const fn font_size_px(&self) -> f32 {
        self.font_size_px
    }
}

/// Inputs and output for one element's style computation, owned exclusively
/// by one cascade instance for its lifetime.
#[derive(Debug, Default)]
pub struct StyleState {
    attributes: HashMap<String, String>,
    environment: EnvironmentMap,
    functions: FunctionRegistry,
    parent: Option<Arc<ComputedValues>>,
    is_root_element: bool,
    is_out_of_flow_positioned: bool,
    root_font_size_px: Option<f32>,
    style: ComputedValues,
}

impl StyleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an element attribute for `attr()` resolution. Names are
    /// matched exactly; HTML embedders lowercase them upstream.
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        self.attributes.insert(name.to_owned(), value.to_owned());
    }

    pub fn environment_mut(&mut self) -> &mut EnvironmentMap {
        &mut self.environment
    }

    pub fn functions_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.functions
    }

    /// Supply the parent's computed style for inheritance.
    pub fn set_parent_style(&mut self, parent: Arc<ComputedValues>) {
        self.parent = Some(parent);
    }

    /// Whether styles are being computed for the root element (needed to
    /// detect `rem`-based cycles).
    pub fn set_is_root_element(&mut self, is_root: bool) {
        self.is_root_element = is_root;
    }

    /// Whether the element is out-of-flow positioned (gates conditional
    /// try-set declarations).
    pub fn set_out_of_flow_positioned(&mut self, out_of_flow: bool) {
        self.is_out_of_flow_positioned = out_of_flow;
    }

    /// Root element font size for `rem` resolution (defaults to 16px, or
    /// the element's own font size on the root).
    pub fn set_root_font_size_px(&mut self, px: f32) {
        self.root_font_size_px = Some(px);
    }

    pub const fn is_root_element(&self) -> bool {
        self.is_root_element
    }

    pub const fn is_out_of_flow_positioned(&self) -> bool {
        self.is_out_of_flow_positioned
    }

    /// The computed style written so far.
    pub const fn style(&self) -> &ComputedValues {
        &self.style
    }

    /// Take the finished computed style, leaving a fresh one behind.
    pub fn take_style(&mut self) -> ComputedValues {
        core::mem::take(&mut self.style)
    }

    pub(crate) fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub(crate) const fn environment(&self) -> &EnvironmentMap {
        &self.environment
    }

    pub(crate) const fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    fn parent_font_size_px(&self) -> f32 {
        self.parent
            .as_ref()
            .map_or(16.0, |parent| parent.font_size_px())
    }

    fn effective_root_font_size_px(&self) -> f32 {
        if self.is_root_element {
            return self.style.font_size_px;
        }
        self.root_font_size_px.unwrap_or(16.0)
    }

    /// The custom property value visible to `var()`: this element's resolved
    /// value (including an explicit guaranteed-invalid record), else the
    /// inherited one.
    pub(crate) fn computed_variable(&self, name: &str) -> Option<Arc<VariableData>> {
        if let Some(entry) = self.style.custom.get(name) {
            return entry.clone();
        }
        self.parent
            .as_ref()
            .and_then(|parent| parent.custom_value(name).cloned())
    }

    /// Write a resolved value; cascade-relevant properties update their
    /// typed slots as well.
    pub(crate) fn apply_value(&mut self, property: &PropertyId, value_text: String) {
        match property {
            PropertyId::Custom(name) => {
                let data = VariableData::new(value_text, false, false);
                self.style.custom.insert(name.clone(), Some(data));
                return;
            }
            PropertyId::Direction => {
                if let Some(direction) = Direction::parse(&value_text) {
                    self.style.direction = direction;
                }
            }
            PropertyId::WritingMode => {
                if let Some(writing_mode) = WritingMode::parse(&value_text) {
                    self.style.writing_mode = writing_mode;
                }
            }
            PropertyId::Appearance => {
                self.style.has_appearance = !value_text.trim().eq_ignore_ascii_case("none");
            }
            PropertyId::FontSize => {
                self.style.font_size_px = self.compute_font_size(&value_text);
            }
            _ => {}
        }
        self.style.values.insert(property.storage_id(), value_text);
    }

    pub(crate) fn apply_custom(&mut self, name: &str, data: Arc<VariableData>) {
        self.style.custom.insert(name.to_owned(), Some(data));
    }

    /// Record a custom property's guaranteed-invalid value (shadowing any
    /// inherited value).
    pub(crate) fn apply_guaranteed_invalid(&mut self, name: &str) {
        self.style.custom.insert(name.to_owned(), None);
    }

    pub(crate) fn apply_initial(&mut self, property: &PropertyId) {
        match property {
            PropertyId::Custom(name) => {
                let name = name.clone();
                self.apply_guaranteed_invalid(&name);
            }
            other => {
                if let Some(initial) = other.initial_value() {
                    self.apply_value(other, initial.to_owned());
                }
            }
        }
    }

    pub(crate) fn apply_inherit(&mut self, property: &PropertyId) {
        if let PropertyId::Custom(name) = property {
            let name = name.clone();
            let inherited = self
                .parent
                .as_ref()
                .and_then(|parent| parent.custom_value(&name).cloned());
            match inherited {
                Some(data) => self.apply_custom(&name, data),
                None => self.apply_guaranteed_invalid(&name),
            }
            return;
        }
        let inherited = self
            .parent
            .as_ref()
            .and_then(|parent| parent.value(property).map(str::to_owned));
        match inherited {
            Some(value_text) => self.apply_value(property, value_text),
            None => self.apply_initial(property),
        }
    }

    /// `unset`: inherit for inherited properties, initial otherwise.
    pub(crate) fn apply_unset(&mut self, property: &PropertyId) {
        if property.is_inherited() {
            self.apply_inherit(property);
        } else {
            self.apply_initial(property);
        }
    }

    /// Invalid at computed-value time: guaranteed-invalid for custom
    /// properties, the inherited/initial fallback for everything else.
    pub(crate) fn apply_iacvt(&mut self, property: &PropertyId) {
        if let PropertyId::Custom(name) = property {
            let name = name.clone();
            self.apply_guaranteed_invalid(&name);
        } else {
            self.apply_unset(property);
        }
    }

    /// Compute `font-size` to pixels using parent/root font sizes; values
    /// that need more context keep the parent size.
    fn compute_font_size(&self, value_text: &str) -> f32 {
        let trimmed = value_text.trim();
        if trimmed.eq_ignore_ascii_case("medium") {
            return 16.0;
        }
        if trimmed.eq_ignore_ascii_case("small") {
            return 13.0;
        }
        if trimmed.eq_ignore_ascii_case("large") {
            return 18.0;
        }
        if let Some(percent) = trimmed.strip_suffix('%')
            && let Ok(ratio) = percent.trim().parse::<f32>()
        {
            return self.parent_font_size_px() * ratio / 100.0;
        }
        length_from_text(trimmed).map_or_else(
            || self.parent_font_size_px(),
            |length| {
                compute_length_px(
                    length,
                    self.parent_font_size_px(),
                    self.effective_root_font_size_px(),
                )
            },
        )
    }
}
