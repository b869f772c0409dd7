//! Orchestrator of the CSS cascade: analyzes matched declarations and active
//! interpolations, decides which declaration wins each property, and
//! resolves dependent values (`var()`, `env()`, `attr()`, user-defined
//! functions, `revert`/`revert-layer`, math) into the computed style.
//!
//! Usage:
//!
//! ```
//! use css_cascade::{CascadeFilter, CascadeOrigin, IMPLICIT_OUTER_LAYER, Specificity};
//! use css_orchestrator::{StyleCascade, StyleState};
//!
//! let mut cascade = StyleCascade::new(StyleState::new());
//! if let Ok(match_result) = cascade.mutable_match_result() {
//!     match_result.begin_block(CascadeOrigin::Author, IMPLICIT_OUTER_LAYER);
//!     match_result.add_declaration("--x", "red", false, Specificity(0, 0, 1));
//!     match_result.add_declaration("color", "var(--x)", false, Specificity(0, 0, 1));
//! }
//! cascade.apply(CascadeFilter::default());
//! assert_eq!(cascade.state().style().value(&css_properties::PropertyId::Color), Some("red"));
//! ```

#![forbid(unsafe_code)]

mod cascade;
mod functions;
mod interpolations;
mod match_result;
mod resolver;
mod style_state;

pub use cascade::{MAX_CASCADE_GENERATION, StyleCascade};
pub use functions::{FunctionDefinition, FunctionRegistry};
pub use interpolations::CascadeInterpolations;
pub use match_result::{CascadeValue, MatchResult, MatchedBlock, MatchedDeclaration};
pub use resolver::CascadeResolver;
pub use style_state::{ComputedValues, StyleState};
