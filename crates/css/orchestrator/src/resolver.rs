//! The recursion guard for dependency resolution: tracks which properties
//! are on the resolution stack, detects reference cycles, and carries the
//! per-apply filter and generation.
//! Spec: <https://drafts.css-houdini.org/css-properties-values-api-1/#dependency-cycles>

use css_cascade::CascadeFilter;
use css_properties::PropertyId;
use css_variables::VariableData;
use std::sync::Arc;

/// Sentinel for "no active cycle".
const NO_CYCLE: usize = usize::MAX;

/// Hard bound on resolution depth. The cycle guard already prevents any
/// property from appearing twice on the stack, so depth is bounded by the
/// number of distinct properties; this cap turns pathological-but-legal
/// chains into IACVT instead of exhausting the native stack.
const MAX_RESOLUTION_DEPTH: usize = 512;

/// Transient per-apply resolution state. Created by `apply()` and threaded
/// through the mutually recursive apply/resolve calls.
#[derive(Debug)]
pub struct CascadeResolver {
    /// Properties currently being resolved, outermost first.
    stack: Vec<PropertyId>,
    /// Stack index of the outermost frame participating in a detected
    /// cycle, or [`NO_CYCLE`].
    cycle_start: usize,
    /// User-defined functions currently being evaluated.
    function_stack: Vec<String>,
    /// One-slot cache for a shared pending-substitution resolution: the
    /// shorthand's substitution data and its resolved text (`None` records
    /// an IACVT outcome shared by every longhand).
    pub(crate) shorthand_cache: Option<(Arc<VariableData>, Option<String>)>,
    pub(crate) filter: CascadeFilter,
    pub(crate) generation: u8,
}

impl CascadeResolver {
    pub(crate) fn new(filter: CascadeFilter, generation: u8) -> Self {
        Self {
            stack: Vec::new(),
            cycle_start: NO_CYCLE,
            function_stack: Vec::new(),
            shorthand_cache: None,
            filter,
            generation,
        }
    }

    /// If `property` is already being resolved, mark the cycle (widening an
    /// existing one if needed) and return true.
    pub(crate) fn detect_cycle(&mut self, property: &PropertyId) -> bool {
        let Some(index) = self.stack.iter().position(|frame| frame == property) else {
            return false;
        };
        self.cycle_start = self.cycle_start.min(index);
        true
    }

    /// Whether a detected cycle is still unwinding.
    pub(crate) const fn in_cycle(&self) -> bool {
        self.cycle_start != NO_CYCLE
    }

    /// Push a resolution frame. Returns false when the depth cap is hit,
    /// which the caller treats as invalid at computed-value time.
    pub(crate) fn push(&mut self, property: PropertyId) -> bool {
        if self.stack.len() >= MAX_RESOLUTION_DEPTH {
            return false;
        }
        self.stack.push(property);
        true
    }

    /// Pop a resolution frame; leaving the outermost cycle frame ends the
    /// cycle.
    pub(crate) fn pop(&mut self) {
        drop(self.stack.pop());
        if self.stack.len() <= self.cycle_start {
            self.cycle_start = NO_CYCLE;
        }
    }

    /// Enter a user-defined function body; self-recursive calls are cycles.
    pub(crate) fn enter_function(&mut self, name: &str) -> bool {
        if self
            .function_stack
            .iter()
            .any(|active| active == name)
        {
            return false;
        }
        self.function_stack.push(name.to_owned());
        true
    }

    pub(crate) fn exit_function(&mut self) {
        drop(self.function_stack.pop());
    }
}
