//! `StyleCascade` analyzes the declarations provided by rules and
//! animations, figures out which declarations win, and applies them in
//! dependency-safe order, resolving substitution references on the way.
//! Spec: <https://www.w3.org/TR/css-cascade-5/#cascade>

use anyhow::{Result, bail};
use css_cascade::{
    CascadeFilter, CascadeMap, CascadeOrigin, CascadePriority, DeclarationPosition,
};
use css_properties::{HIGH_PRIORITY_PROPERTIES, PropertyId, ShorthandId, wide_overlapping_groups};
use css_syntax::CssWideKeyword;
use css_values_units::{Number, evaluate_math, number_from_text};
use css_variables::{
    AttrSyntax, MAX_SUBSTITUTION_BYTES, Substitution, SubstitutionContext, SubstitutionError,
    TokenSequence, VariableData, substitute_references,
};
use log::{debug, warn};
use std::collections::HashSet;
use std::sync::Arc;

use crate::functions::FunctionContext;
use crate::interpolations::CascadeInterpolations;
use crate::match_result::{CascadeValue, MatchResult};
use crate::resolver::CascadeResolver;
use crate::style_state::StyleState;

/// Ceiling for the generation counter; reaching it forces a re-analysis.
pub const MAX_CASCADE_GENERATION: u8 = 15;

/// Outcome of resolving one declaration. `None` from the resolve functions
/// (not representable here) means a cycle is unwinding.
#[derive(Debug)]
enum Resolved {
    /// Final value text for a non-custom property.
    Text(String),
    /// Computed value of a custom property.
    Data(Arc<VariableData>),
    /// Invalid at computed-value time.
    Iacvt,
    Initial,
    Inherit,
    Unset,
}

/// The cascade engine for one element.
///
/// Populate the match result and interpolations, then call
/// [`StyleCascade::apply`]; the winning declarations are resolved and
/// written to the state's computed style. Apply never fails: malformed or
/// cyclic input degrades to the property's inherited/initial value.
pub struct StyleCascade {
    state: StyleState,
    match_result: MatchResult,
    interpolations: CascadeInterpolations,
    map: CascadeMap,
    // Generational apply: incremented when inputs (or the filter) changed
    // since the last apply. A map entry whose stamp equals the current
    // generation has already been written to the computed style, so
    // re-application (including via dependency resolution) is a no-op.
    generation: u8,
    last_filter: Option<CascadeFilter>,
    needs_match_result_analyze: bool,
    needs_interpolations_analyze: bool,
    // Set when analysis saw a logical property; their physical mapping
    // depends on the computed direction/writing-mode.
    depends_on_cascade_affecting_property: bool,
    important_properties: HashSet<PropertyId>,
    sealed: bool,
    byte_limit: usize,
    custom_resolution_count: u64,
}

impl StyleCascade {
    pub fn new(state: StyleState) -> Self {
        Self::with_byte_limit(state, MAX_SUBSTITUTION_BYTES)
    }

    /// Create a cascade with a custom substitution byte budget.
    pub fn with_byte_limit(state: StyleState, byte_limit: usize) -> Self {
        Self {
            state,
            match_result: MatchResult::new(),
            interpolations: CascadeInterpolations::new(),
            map: CascadeMap::new(),
            generation: 0,
            last_filter: None,
            needs_match_result_analyze: false,
            needs_interpolations_analyze: false,
            depends_on_cascade_affecting_property: false,
            important_properties: HashSet::new(),
            sealed: false,
            byte_limit,
            custom_resolution_count: 0,
        }
    }

    pub const fn state(&self) -> &StyleState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut StyleState {
        &mut self.state
    }

    /// Access the match result to add declarations to it.
    ///
    /// # Errors
    /// The match result may not be modified after `apply` has been called,
    /// unless `reset` is called first; doing so is a caller bug.
    pub fn mutable_match_result(&mut self) -> Result<&mut MatchResult> {
        if self.sealed {
            bail!("match result cannot be modified after apply; call reset first");
        }
        self.needs_match_result_analyze = true;
        Ok(&mut self.match_result)
    }

    /// Add active interpolations. Valid at any time, including after apply.
    pub fn add_interpolations(
        &mut self,
        values: Vec<(PropertyId, String)>,
        origin: CascadeOrigin,
    ) {
        self.interpolations.add(values, origin);
        self.needs_interpolations_analyze = true;
    }

    /// Apply the current declarations and interpolations to the computed
    /// style. May be called repeatedly; identical inputs and filter resolve
    /// nothing anew (the generation guard holds), while a changed filter
    /// re-applies against the already-built map.
    pub fn apply(&mut self, filter: CascadeFilter) {
        self.sealed = true;
        let inputs_changed =
            self.needs_match_result_analyze || self.needs_interpolations_analyze;
        let filter_changed = self.last_filter != Some(filter);
        if inputs_changed || filter_changed || self.generation == 0 {
            if self.generation >= MAX_CASCADE_GENERATION {
                debug!("generation ceiling reached; reanalyzing");
                self.reanalyze();
                self.generation = 0;
            }
            self.generation += 1;
        }
        self.last_filter = Some(filter);
        self.analyze_if_needed();
        let mut resolver = CascadeResolver::new(filter, self.generation);
        self.apply_cascade_affecting(&mut resolver);
        self.apply_high_priority(&mut resolver);
        self.apply_appearance(&mut resolver);
        self.apply_wide_overlapping(&mut resolver);
        self.apply_match_result(&mut resolver);
        self.apply_interpolations(&mut resolver);
    }

    /// Properties with `!important` declarations (analyzing if needed).
    pub fn important_set(&mut self) -> HashSet<PropertyId> {
        self.analyze_if_needed();
        self.important_properties.clone()
    }

    /// The cascaded (pre-resolution) value text per property, for
    /// declaration origins only. Meaningful after `apply`.
    /// Spec: <https://www.w3.org/TR/css-cascade-5/#cascaded>
    pub fn cascaded_values(&self) -> Vec<(PropertyId, String)> {
        let mut out = Vec::new();
        for (property, priority) in self.map.iter() {
            if priority.origin.base().is_none() {
                continue;
            }
            let Some((_, declaration)) = self.match_result.declaration_at(priority.position)
            else {
                continue;
            };
            let text = match &declaration.value {
                CascadeValue::Literal(text) => text.clone(),
                CascadeValue::Unparsed(data)
                | CascadeValue::PendingSubstitution { data, .. } => data.text().to_owned(),
                CascadeValue::Keyword(keyword) => keyword_text(*keyword).to_owned(),
            };
            out.push((property.clone(), text));
        }
        out
    }

    /// Whether an inline-style declaration lost to a higher-priority one.
    pub const fn inline_style_lost(&self) -> bool {
        self.map.inline_style_lost()
    }

    /// Number of custom-property resolutions performed so far (diagnostic;
    /// also exercised by the generation-guard tests).
    pub const fn custom_resolution_count(&self) -> u64 {
        self.custom_resolution_count
    }

    /// Reset to the initial state. Values already applied to the computed
    /// style are not undone.
    pub fn reset(&mut self) {
        self.match_result.clear();
        self.interpolations.clear();
        self.map.clear();
        self.generation = 0;
        self.last_filter = None;
        self.sealed = false;
        self.needs_match_result_analyze = false;
        self.needs_interpolations_analyze = false;
        self.depends_on_cascade_affecting_property = false;
        self.important_properties.clear();
    }

    // --- Analysis -----------------------------------------------------

    fn analyze_if_needed(&mut self) {
        if !self.needs_match_result_analyze && !self.needs_interpolations_analyze {
            return;
        }
        self.map.clear();
        self.important_properties.clear();
        self.depends_on_cascade_affecting_property = false;
        self.analyze_match_result();
        self.analyze_interpolations();
        self.needs_match_result_analyze = false;
        self.needs_interpolations_analyze = false;
        debug!(
            "analyzed cascade: {} block(s), {} interpolation set(s)",
            self.match_result.blocks.len(),
            self.interpolations.sets.len()
        );
    }

    /// Clear the map and force a fresh analysis (cascade inputs changed in a
    /// way the existing analysis cannot represent).
    fn reanalyze(&mut self) {
        self.map.clear();
        self.needs_match_result_analyze = true;
        self.needs_interpolations_analyze = true;
    }

    fn analyze_match_result(&mut self) {
        let direction = self.state.style().direction();
        let writing_mode = self.state.style().writing_mode();
        let mut source_order: u32 = 0;
        for (block_index, block) in self.match_result.blocks.iter().enumerate() {
            for (index, declaration) in block.declarations.iter().enumerate() {
                let mut property = declaration.property.clone();
                if property.is_surrogate() {
                    self.depends_on_cascade_affecting_property = true;
                    property = property.to_physical(direction, writing_mode);
                }
                let position = DeclarationPosition::Declaration {
                    block: block_index as u16,
                    index: index as u16,
                };
                let priority = CascadePriority::new(
                    block.origin,
                    declaration.important,
                    block.layer_order,
                    block.is_inline_style,
                    declaration.specificity,
                    source_order,
                    position,
                );
                source_order += 1;
                if declaration.important {
                    self.important_properties.insert(property.clone());
                }
                self.map.insert(property, priority);
            }
        }
    }

    fn analyze_interpolations(&mut self) {
        let mut source_order: u32 = 0;
        for (set_index, set) in self.interpolations.sets.iter().enumerate() {
            for (property, _) in &set.values {
                let position = DeclarationPosition::Interpolation {
                    set: set_index as u16,
                };
                let priority =
                    CascadePriority::for_interpolation(set.origin, source_order, position);
                source_order += 1;
                self.map.insert(property.clone(), priority);
            }
        }
    }

    // --- Apply phases -------------------------------------------------

    /// Apply `direction`/`writing-mode` first; their computed values decide
    /// how logical properties map onto physical ones. When they change and
    /// logical properties were seen, the analysis is redone with the new
    /// mapping.
    fn apply_cascade_affecting(&mut self, resolver: &mut CascadeResolver) {
        let before = (
            self.state.style().direction(),
            self.state.style().writing_mode(),
        );
        self.lookup_and_apply(&PropertyId::Direction, resolver);
        self.lookup_and_apply(&PropertyId::WritingMode, resolver);
        let after = (
            self.state.style().direction(),
            self.state.style().writing_mode(),
        );
        if before != after && self.depends_on_cascade_affecting_property {
            debug!("cascade-affecting property changed; reanalyzing");
            self.reanalyze();
            self.analyze_if_needed();
            self.lookup_and_apply(&PropertyId::Direction, resolver);
            self.lookup_and_apply(&PropertyId::WritingMode, resolver);
        }
    }

    /// Apply font-affecting properties before everything else, so that
    /// em/ch/rem/lh units elsewhere see resolved font metrics.
    fn apply_high_priority(&mut self, resolver: &mut CascadeResolver) {
        for property in &HIGH_PRIORITY_PROPERTIES {
            self.lookup_and_apply(property, resolver);
        }
    }

    /// Apply `-webkit-appearance`; without an appearance, UA-internal
    /// properties are filtered out for the rest of this apply.
    fn apply_appearance(&mut self, resolver: &mut CascadeResolver) {
        self.lookup_and_apply(&PropertyId::Appearance, resolver);
        if !self.state.style().has_appearance() {
            resolver.filter.reject_internal_ua = true;
        }
    }

    /// Legacy overlapping properties share computed storage. The widest
    /// form is applied; narrow forms with lower priority are stamped as
    /// already applied so later passes skip them, preserving declared-order
    /// semantics despite the shared storage.
    fn apply_wide_overlapping(&mut self, resolver: &mut CascadeResolver) {
        for (wide, narrows) in wide_overlapping_groups() {
            let Some(wide_priority) = self.map.find(wide).copied() else {
                continue;
            };
            for narrow in *narrows {
                let overlapped = self
                    .map
                    .find(narrow)
                    .is_some_and(|narrow_priority| *narrow_priority < wide_priority);
                if overlapped {
                    debug!(
                        "skipping `{}`: overlapped by higher-priority `{}`",
                        narrow.name(),
                        wide.name()
                    );
                    self.map.stamp(narrow, resolver.generation);
                }
            }
        }
    }

    fn apply_match_result(&mut self, resolver: &mut CascadeResolver) {
        let mut pending: Vec<(PropertyId, CascadePriority)> = self
            .map
            .iter()
            .filter(|(_, priority)| {
                matches!(priority.position, DeclarationPosition::Declaration { .. })
            })
            .map(|(property, priority)| (property.clone(), *priority))
            .collect();
        pending.sort_by(|left, right| left.1.cmp(&right.1));
        for (property, _) in pending {
            self.lookup_and_apply(&property, resolver);
        }
    }

    fn apply_interpolations(&mut self, resolver: &mut CascadeResolver) {
        let mut pending: Vec<(PropertyId, CascadePriority)> = self
            .map
            .iter()
            .filter(|(_, priority)| {
                matches!(priority.position, DeclarationPosition::Interpolation { .. })
            })
            .map(|(property, priority)| (property.clone(), *priority))
            .collect();
        pending.sort_by(|left, right| left.1.cmp(&right.1));
        for (property, _) in pending {
            self.lookup_and_apply(&property, resolver);
        }
    }

    // --- Lookup & apply -----------------------------------------------

    /// Apply a property's winning declaration unless it was already applied
    /// this generation or the filter rejects it.
    fn lookup_and_apply(&mut self, property: &PropertyId, resolver: &mut CascadeResolver) {
        let Some(priority) = self.map.find(property).copied() else {
            return;
        };
        if self.map.generation(property) >= resolver.generation {
            return;
        }
        if resolver.filter.rejects(property) {
            return;
        }
        self.lookup_and_apply_value(property, priority, resolver);
    }

    fn lookup_and_apply_value(
        &mut self,
        property: &PropertyId,
        priority: CascadePriority,
        resolver: &mut CascadeResolver,
    ) {
        if !resolver.push(property.clone()) {
            warn!("resolution depth cap hit at `{}`", property.name());
            self.state.apply_iacvt(property);
            self.map.stamp(property, resolver.generation);
            return;
        }
        let resolved = self.resolve_priority(property, priority, resolver);
        resolver.pop();
        match resolved {
            None => {
                // A cycle: frames above the outermost cycle participant are
                // skipped while unwinding; the outermost one lands here with
                // the cycle closed and takes the guaranteed-invalid/unset
                // fallback.
                if resolver.in_cycle() {
                    return;
                }
                debug!("`{}` participates in a reference cycle", property.name());
                self.state.apply_iacvt(property);
                self.map.stamp(property, resolver.generation);
            }
            Some(resolved) => {
                self.apply_resolved(property, resolved);
                self.map.stamp(property, resolver.generation);
            }
        }
    }

    fn apply_resolved(&mut self, property: &PropertyId, resolved: Resolved) {
        match resolved {
            Resolved::Text(text) => self.state.apply_value(property, text),
            Resolved::Data(data) => {
                if let PropertyId::Custom(name) = property {
                    let name = name.clone();
                    self.state.apply_custom(&name, data);
                }
            }
            Resolved::Iacvt => {
                debug!(
                    "`{}` is invalid at computed-value time; using fallback value",
                    property.name()
                );
                self.state.apply_iacvt(property);
            }
            Resolved::Initial => self.state.apply_initial(property),
            Resolved::Inherit => self.state.apply_inherit(property),
            Resolved::Unset => self.state.apply_unset(property),
        }
    }

    // --- Resolution ---------------------------------------------------

    /// Resolve the declaration a priority points at. `None` means a cycle
    /// is unwinding.
    fn resolve_priority(
        &mut self,
        property: &PropertyId,
        priority: CascadePriority,
        resolver: &mut CascadeResolver,
    ) -> Option<Resolved> {
        if self.treat_as_revert_layer(priority) {
            return self.resolve_revert_layer(property, priority, resolver);
        }
        match priority.position {
            DeclarationPosition::Declaration { .. } => {
                let Some((_, declaration)) = self.match_result.declaration_at(priority.position)
                else {
                    return Some(Resolved::Iacvt);
                };
                let value = declaration.value.clone();
                self.resolve_value(property, &value, priority, resolver)
            }
            DeclarationPosition::Interpolation { set } => {
                let Some(data) = self.interpolations.find(usize::from(set), property) else {
                    return Some(Resolved::Iacvt);
                };
                let data = Arc::clone(data);
                if property.is_custom() {
                    self.resolve_custom_property(property, &data, resolver)
                } else if data.has_references() {
                    self.resolve_variable_reference(property, &data, resolver)
                } else {
                    Some(Resolved::Text(data.text().to_owned()))
                }
            }
        }
    }

    /// Declarations from a conditional try set apply only while the element
    /// is out-of-flow positioned; otherwise they behave as `revert-layer`,
    /// which (being in their own layer) skips the whole set.
    fn treat_as_revert_layer(&self, priority: CascadePriority) -> bool {
        !self.state.is_out_of_flow_positioned()
            && self
                .match_result
                .declaration_at(priority.position)
                .is_some_and(|(block, _)| block.is_try_set)
    }

    fn resolve_value(
        &mut self,
        property: &PropertyId,
        value: &CascadeValue,
        priority: CascadePriority,
        resolver: &mut CascadeResolver,
    ) -> Option<Resolved> {
        match value {
            CascadeValue::Literal(text) => {
                if property.is_custom() {
                    Some(Resolved::Data(VariableData::new(text.clone(), false, false)))
                } else {
                    Some(Resolved::Text(finish_math(text)))
                }
            }
            CascadeValue::Unparsed(data) => {
                if property.is_custom() {
                    self.resolve_custom_property(property, data, resolver)
                } else {
                    self.resolve_variable_reference(property, data, resolver)
                }
            }
            CascadeValue::PendingSubstitution { shorthand, data } => {
                let data = Arc::clone(data);
                self.resolve_pending_substitution(property, *shorthand, &data, resolver)
            }
            CascadeValue::Keyword(keyword) => match keyword {
                CssWideKeyword::Initial => Some(Resolved::Initial),
                CssWideKeyword::Inherit => Some(Resolved::Inherit),
                CssWideKeyword::Unset => Some(Resolved::Unset),
                CssWideKeyword::Revert => self.resolve_revert(property, priority.origin, resolver),
                CssWideKeyword::RevertLayer => {
                    self.resolve_revert_layer(property, priority, resolver)
                }
            },
        }
    }

    /// `revert`: re-resolve restricted to origins strictly below the
    /// declaration's base origin; nothing below behaves as `unset`.
    fn resolve_revert(
        &mut self,
        property: &PropertyId,
        origin: CascadeOrigin,
        resolver: &mut CascadeResolver,
    ) -> Option<Resolved> {
        match self.map.find_reverted(property, origin).copied() {
            None => Some(Resolved::Unset),
            Some(entry) => self.resolve_priority(property, entry, resolver),
        }
    }

    /// `revert-layer`: re-resolve restricted to layers below the
    /// declaration's layer in the same origin, falling back to `revert`
    /// semantics when the origin has nothing lower.
    fn resolve_revert_layer(
        &mut self,
        property: &PropertyId,
        priority: CascadePriority,
        resolver: &mut CascadeResolver,
    ) -> Option<Resolved> {
        match self
            .map
            .find_reverted_layer(property, priority.origin, priority.layer_order)
            .copied()
        {
            Some(entry) => self.resolve_priority(property, entry, resolver),
            None => self.resolve_revert(property, priority.origin, resolver),
        }
    }

    /// Compute a custom property's value, substituting its references.
    /// A custom property consumed while computing font metrics it itself
    /// depends on is a cycle.
    fn resolve_custom_property(
        &mut self,
        property: &PropertyId,
        data: &Arc<VariableData>,
        resolver: &mut CascadeResolver,
    ) -> Option<Resolved> {
        self.custom_resolution_count += 1;
        if data.has_font_units() && resolver.detect_cycle(&PropertyId::FontSize) {
            return None;
        }
        if data.has_root_font_units()
            && self.state.is_root_element()
            && resolver.detect_cycle(&PropertyId::FontSize)
        {
            return None;
        }
        if data.has_line_height_units() && resolver.detect_cycle(&PropertyId::LineHeight) {
            return None;
        }
        if !data.has_references() {
            return Some(Resolved::Data(Arc::clone(data)));
        }
        let mut sequence = TokenSequence::from_source(data, self.byte_limit);
        match self.substitute_into(property, data.text(), None, resolver, &mut sequence) {
            Ok(()) => Some(Resolved::Data(sequence.into_variable_data())),
            Err(error) => self.substitution_failure(property, error, resolver),
        }
    }

    /// Resolve a non-custom property whose value contains references.
    fn resolve_variable_reference(
        &mut self,
        property: &PropertyId,
        data: &Arc<VariableData>,
        resolver: &mut CascadeResolver,
    ) -> Option<Resolved> {
        let mut sequence = TokenSequence::from_source(data, self.byte_limit);
        match self.substitute_into(property, data.text(), None, resolver, &mut sequence) {
            Err(error) => self.substitution_failure(property, error, resolver),
            Ok(()) => {
                if sequence.is_animation_tainted() && property.is_animation_controlling() {
                    debug!(
                        "animation-tainted value rejected for `{}`",
                        property.name()
                    );
                    return Some(Resolved::Iacvt);
                }
                if attr_tainted_url(sequence.text(), sequence.attr_taint_ranges()) {
                    warn!("attr()-derived url blocked for `{}`", property.name());
                    return Some(Resolved::Iacvt);
                }
                Some(Resolved::Text(finish_math(sequence.text())))
            }
        }
    }

    /// Resolve a shorthand's shared substitution once (cached on the
    /// resolver) and slice out this longhand's part.
    fn resolve_pending_substitution(
        &mut self,
        longhand: &PropertyId,
        shorthand: ShorthandId,
        data: &Arc<VariableData>,
        resolver: &mut CascadeResolver,
    ) -> Option<Resolved> {
        let cached = resolver.shorthand_cache.as_ref().and_then(|(source, text)| {
            Arc::ptr_eq(source, data).then(|| text.clone())
        });
        let resolved_text = if let Some(text) = cached {
            text
        } else {
            let mut sequence = TokenSequence::from_source(data, self.byte_limit);
            let text =
                match self.substitute_into(longhand, data.text(), None, resolver, &mut sequence) {
                    Ok(()) => Some(sequence.text().to_owned()),
                    Err(error) => {
                        // Cycles propagate uncached; plain IACVT is shared by
                        // every longhand of the shorthand.
                        self.substitution_failure(longhand, error, resolver)?;
                        None
                    }
                };
            resolver.shorthand_cache = Some((Arc::clone(data), text.clone()));
            text
        };
        let Some(text) = resolved_text else {
            return Some(Resolved::Iacvt);
        };
        let components = css_syntax::split_top_level_components(&text);
        match shorthand.slice_for_longhand(longhand, &components) {
            Some(part) => Some(Resolved::Text(finish_math(&part))),
            None => Some(Resolved::Iacvt),
        }
    }

    /// Map a substitution failure to IACVT, or propagate the cycle.
    fn substitution_failure(
        &self,
        property: &PropertyId,
        error: SubstitutionError,
        resolver: &CascadeResolver,
    ) -> Option<Resolved> {
        if resolver.in_cycle() {
            return None;
        }
        match error {
            SubstitutionError::BudgetExceeded => warn!(
                "substitution for `{}` exceeded the byte budget",
                property.name()
            ),
            SubstitutionError::Invalid => debug!(
                "`{}` has an unresolvable reference",
                property.name()
            ),
        }
        Some(Resolved::Iacvt)
    }

    /// Run reference substitution for `value_text` with this cascade as the
    /// resolution context.
    fn substitute_into(
        &mut self,
        property: &PropertyId,
        value_text: &str,
        function_context: Option<&FunctionContext>,
        resolver: &mut CascadeResolver,
        out: &mut TokenSequence,
    ) -> core::result::Result<(), SubstitutionError> {
        let mut scope = SubstitutionScope {
            cascade: self,
            property,
            function_context,
            resolver,
        };
        substitute_references(value_text, &mut scope, out)
    }
}

/// Bundles the cascade, the property under resolution, the active function
/// context, and the resolver into one substitution callback target.
struct SubstitutionScope<'scope> {
    cascade: &'scope mut StyleCascade,
    property: &'scope PropertyId,
    function_context: Option<&'scope FunctionContext>,
    resolver: &'scope mut CascadeResolver,
}

impl SubstitutionContext for SubstitutionScope<'_> {
    fn substitute_var(&mut self, name: &str, out: &mut TokenSequence) -> Substitution {
        // Function arguments shadow custom properties inside function bodies.
        if let Some(context) = self.function_context
            && let Some(argument) = context.arguments.get(name)
        {
            return if out.append_data(argument) {
                Substitution::Done
            } else {
                Substitution::Invalid
            };
        }
        let custom = PropertyId::Custom(name.to_owned());
        if self.resolver.detect_cycle(&custom) {
            return Substitution::Invalid;
        }
        // The referenced property may not have been applied yet this
        // generation; apply acts as a service to itself here.
        self.cascade.lookup_and_apply(&custom, self.resolver);
        if self.resolver.in_cycle() {
            return Substitution::Invalid;
        }
        let Some(data) = self.cascade.state.computed_variable(name) else {
            return Substitution::Missing;
        };
        if data.is_animation_tainted() && self.property.is_animation_controlling() {
            return Substitution::Missing;
        }
        if out.append_data(&data) {
            Substitution::Done
        } else {
            Substitution::Invalid
        }
    }

    fn substitute_env(
        &mut self,
        name: &str,
        indices: &[u32],
        out: &mut TokenSequence,
    ) -> Substitution {
        let Some(data) = self.cascade.state.environment().lookup(name, indices) else {
            return Substitution::Missing;
        };
        let data = Arc::clone(data);
        if out.append_data(&data) {
            Substitution::Done
        } else {
            Substitution::Invalid
        }
    }

    fn substitute_attr(
        &mut self,
        name: &str,
        syntax: &AttrSyntax,
        out: &mut TokenSequence,
    ) -> Substitution {
        let converted = {
            let Some(value) = self.cascade.state.attribute(name) else {
                return Substitution::Missing;
            };
            let Some(converted) = convert_attribute(value, syntax) else {
                return Substitution::Missing;
            };
            converted
        };
        if out.append_attr_tainted(&converted) {
            Substitution::Done
        } else {
            Substitution::Invalid
        }
    }

    fn substitute_function(
        &mut self,
        name: &str,
        arguments: &[Arc<VariableData>],
        out: &mut TokenSequence,
    ) -> Substitution {
        let Some(definition) = self.cascade.state.functions().lookup(name).cloned() else {
            debug!("call to unknown function `{name}`");
            return Substitution::Invalid;
        };
        if definition.parameters.len() > arguments.len() {
            return Substitution::Invalid;
        }
        if !self.resolver.enter_function(name) {
            return Substitution::Invalid;
        }
        let mut context = FunctionContext::default();
        for (parameter, argument) in definition.parameters.iter().zip(arguments) {
            context
                .arguments
                .insert(parameter.clone(), Arc::clone(argument));
        }
        let mut body_out = TokenSequence::with_byte_limit(out.byte_limit());
        let outcome = self.cascade.substitute_into(
            self.property,
            definition.body.text(),
            Some(&context),
            self.resolver,
            &mut body_out,
        );
        self.resolver.exit_function();
        match outcome {
            Ok(()) => {
                let data = body_out.into_variable_data();
                if out.append_data(&data) {
                    Substitution::Done
                } else {
                    Substitution::Invalid
                }
            }
            Err(_) => Substitution::Invalid,
        }
    }
}

/// Evaluate a trailing math function over resolved operands; values that
/// need layout context keep their substituted text.
fn finish_math(text: &str) -> String {
    evaluate_math(text).unwrap_or_else(|| text.to_owned())
}

/// Convert an attribute's raw text per the requested syntax.
fn convert_attribute(value: &str, syntax: &AttrSyntax) -> Option<String> {
    match syntax {
        AttrSyntax::String => Some(serialize_string(value)),
        AttrSyntax::Ident => css_syntax::parse_single_ident(value),
        AttrSyntax::Number => number_from_text(value).map(|Number(number)| format!("{number}")),
        AttrSyntax::Percentage => {
            number_from_text(value).map(|Number(number)| format!("{number}%"))
        }
        AttrSyntax::Dimension(unit) => {
            number_from_text(value).map(|Number(number)| format!("{number}{unit}"))
        }
        AttrSyntax::Type(_) => {
            if css_syntax::is_valid_token_stream(value) {
                Some(value.to_owned())
            } else {
                None
            }
        }
    }
}

/// Serialize text as a CSS string token.
fn serialize_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for character in value.chars() {
        if character == '"' || character == '\\' {
            out.push('\\');
        }
        out.push(character);
    }
    out.push('"');
    out
}

/// Whether any attr-tainted byte range intersects a `url(…)` function in
/// the resolved text.
fn attr_tainted_url(text: &str, ranges: &[(usize, usize)]) -> bool {
    if ranges.is_empty() {
        return false;
    }
    let lower = text.to_ascii_lowercase();
    let mut search_from = 0;
    while let Some(found) = lower.get(search_from..).and_then(|tail| tail.find("url(")) {
        let start = search_from + found;
        let end = lower
            .get(start..)
            .and_then(|tail| tail.find(')'))
            .map_or(lower.len(), |close| start + close + 1);
        if ranges
            .iter()
            .any(|&(taint_start, taint_end)| taint_start < end && taint_end > start)
        {
            return true;
        }
        search_from = end;
    }
    false
}

fn keyword_text(keyword: CssWideKeyword) -> &'static str {
    match keyword {
        CssWideKeyword::Initial => "initial",
        CssWideKeyword::Inherit => "inherit",
        CssWideKeyword::Unset => "unset",
        CssWideKeyword::Revert => "revert",
        CssWideKeyword::RevertLayer => "revert-layer",
    }
}
