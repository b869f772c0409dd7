#![allow(clippy::unwrap_used)]

use css_cascade::{CascadeFilter, CascadeOrigin, IMPLICIT_OUTER_LAYER, Specificity};
use css_orchestrator::{ComputedValues, StyleCascade, StyleState};
use css_properties::PropertyId;
use std::sync::Arc;

fn author_cascade(declarations: &[(&str, &str)]) -> StyleCascade {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut cascade = StyleCascade::new(StyleState::new());
    {
        let result = cascade.mutable_match_result().unwrap();
        result.begin_block(CascadeOrigin::Author, IMPLICIT_OUTER_LAYER);
        for &(name, value) in declarations {
            result.add_declaration(name, value, false, Specificity(0, 0, 1));
        }
    }
    cascade
}

fn computed(cascade: &StyleCascade, property: &PropertyId) -> Option<String> {
    cascade.state().style().value(property).map(str::to_owned)
}

#[test]
fn var_substitutes_the_computed_custom_property() {
    let mut cascade = author_cascade(&[("--x", "red"), ("color", "var(--x)")]);
    cascade.apply(CascadeFilter::default());
    assert_eq!(computed(&cascade, &PropertyId::Color), Some("red".to_owned()));
}

#[test]
fn reapply_with_identical_inputs_resolves_nothing_anew() {
    let mut cascade = author_cascade(&[("--x", "red"), ("color", "var(--x)")]);
    cascade.apply(CascadeFilter::default());
    assert_eq!(cascade.custom_resolution_count(), 1);
    cascade.apply(CascadeFilter::default());
    assert_eq!(cascade.custom_resolution_count(), 1);
    assert_eq!(computed(&cascade, &PropertyId::Color), Some("red".to_owned()));
}

#[test]
fn declaration_order_does_not_matter_for_dependencies() {
    // The consumer appears before its dependency; resolution applies the
    // custom property on demand.
    let mut cascade = author_cascade(&[("color", "var(--x)"), ("--x", "navy")]);
    cascade.apply(CascadeFilter::default());
    assert_eq!(
        computed(&cascade, &PropertyId::Color),
        Some("navy".to_owned())
    );
    assert_eq!(cascade.custom_resolution_count(), 1);
}

#[test]
fn fallback_is_used_for_undefined_variables_only() {
    let mut cascade = author_cascade(&[
        ("--x", "4px"),
        ("width", "var(--undefined, 10px)"),
        ("height", "var(--x, 10px)"),
    ]);
    cascade.apply(CascadeFilter::default());
    assert_eq!(
        computed(&cascade, &PropertyId::Width),
        Some("10px".to_owned())
    );
    assert_eq!(
        computed(&cascade, &PropertyId::Height),
        Some("4px".to_owned())
    );
}

#[test]
fn missing_variable_without_fallback_is_invalid_at_computed_value_time() {
    let mut cascade = author_cascade(&[("width", "var(--undefined)")]);
    cascade.apply(CascadeFilter::default());
    assert_eq!(
        computed(&cascade, &PropertyId::Width),
        Some("auto".to_owned())
    );
}

#[test]
fn reference_cycles_compute_to_the_initial_value() {
    let mut cascade = author_cascade(&[
        ("--a", "var(--b)"),
        ("--b", "var(--a)"),
        ("color", "var(--a)"),
    ]);
    cascade.apply(CascadeFilter::default());
    // Cyclic custom properties are guaranteed-invalid; color falls back to
    // its initial value rather than looping.
    assert_eq!(
        computed(&cascade, &PropertyId::Color),
        Some("black".to_owned())
    );
    assert!(cascade.state().style().custom_value("--a").is_none());
    assert!(cascade.state().style().custom_value("--b").is_none());
}

#[test]
fn self_reference_is_a_cycle() {
    let mut cascade = author_cascade(&[("--a", "var(--a, safe)"), ("width", "var(--a, 10px)")]);
    cascade.apply(CascadeFilter::default());
    // The cycle poisons --a itself (its fallback is not consulted); width
    // then sees a guaranteed-invalid variable and uses its own fallback.
    assert!(cascade.state().style().custom_value("--a").is_none());
    assert_eq!(
        computed(&cascade, &PropertyId::Width),
        Some("10px".to_owned())
    );
}

#[test]
fn substitution_preserves_original_number_formatting() {
    let mut cascade = author_cascade(&[("--x", "  1.50px  "), ("width", "var(--x)")]);
    cascade.apply(CascadeFilter::default());
    assert_eq!(
        computed(&cascade, &PropertyId::Width),
        Some("1.50px".to_owned())
    );
}

#[test]
fn math_over_resolved_operands_is_evaluated() {
    let mut cascade = author_cascade(&[("--x", "10px"), ("width", "calc(var(--x) * 2)")]);
    cascade.apply(CascadeFilter::default());
    assert_eq!(
        computed(&cascade, &PropertyId::Width),
        Some("20px".to_owned())
    );
}

#[test]
fn oversized_substitution_chains_are_rejected() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut cascade = StyleCascade::with_byte_limit(StyleState::new(), 256);
    {
        let result = cascade.mutable_match_result().unwrap();
        result.begin_block(CascadeOrigin::Author, IMPLICIT_OUTER_LAYER);
        // Each level pastes the previous one four times.
        result.add_declaration("--level0", "16px 16px 16px 16px", false, Specificity(0, 0, 1));
        for level in 1..6 {
            let value = format!(
                "var(--level{prev}) var(--level{prev}) var(--level{prev}) var(--level{prev})",
                prev = level - 1
            );
            result.add_declaration(
                &format!("--level{level}"),
                &value,
                false,
                Specificity(0, 0, 1),
            );
        }
        result.add_declaration("width", "var(--level5)", false, Specificity(0, 0, 1));
    }
    cascade.apply(CascadeFilter::default());
    assert_eq!(
        computed(&cascade, &PropertyId::Width),
        Some("auto".to_owned())
    );
}

#[test]
fn env_substitutes_registered_environment_values() {
    let mut cascade = author_cascade(&[
        ("padding-top", "env(safe-area-inset-top)"),
        ("padding-bottom", "env(missing-thing, 3px)"),
        ("width", "env(viewport-segment-width 0 0, 7px)"),
    ]);
    cascade
        .state_mut()
        .environment_mut()
        .set("safe-area-inset-top", "12px");
    cascade
        .state_mut()
        .environment_mut()
        .set_indexed("viewport-segment-width", &[0, 0], "340px");
    cascade.apply(CascadeFilter::default());
    assert_eq!(
        computed(&cascade, &PropertyId::PaddingTop),
        Some("12px".to_owned())
    );
    assert_eq!(
        computed(&cascade, &PropertyId::PaddingBottom),
        Some("3px".to_owned())
    );
    assert_eq!(
        computed(&cascade, &PropertyId::Width),
        Some("340px".to_owned())
    );
}

#[test]
fn attr_converts_per_requested_syntax() {
    let mut cascade = author_cascade(&[
        ("width", "attr(data-width px)"),
        ("height", "attr(data-missing px, 5px)"),
        ("--label", "attr(data-label)"),
    ]);
    cascade.state_mut().set_attribute("data-width", "42");
    cascade.state_mut().set_attribute("data-label", "he said \"hi\"");
    cascade.apply(CascadeFilter::default());
    assert_eq!(
        computed(&cascade, &PropertyId::Width),
        Some("42px".to_owned())
    );
    assert_eq!(
        computed(&cascade, &PropertyId::Height),
        Some("5px".to_owned())
    );
    let label = cascade.state().style().custom_value("--label").unwrap();
    assert_eq!(label.text(), "\"he said \\\"hi\\\"\"");
    assert!(label.is_attr_tainted());
}

#[test]
fn attr_derived_urls_are_blocked() {
    let mut cascade = author_cascade(&[
        ("--u", "attr(data-url type(*))"),
        ("background-image", "var(--u)"),
    ]);
    cascade
        .state_mut()
        .set_attribute("data-url", "url(https://attacker.example/x)");
    cascade.apply(CascadeFilter::default());
    // The tainted url never reaches the computed style.
    assert_eq!(
        computed(&cascade, &PropertyId::BackgroundImage),
        Some("none".to_owned())
    );
}

#[test]
fn animation_tainted_values_cannot_drive_animations() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut cascade = StyleCascade::new(StyleState::new());
    {
        let result = cascade.mutable_match_result().unwrap();
        result.begin_block(CascadeOrigin::Author, IMPLICIT_OUTER_LAYER);
        result.add_declaration(
            "animation-duration",
            "var(--speed)",
            false,
            Specificity(0, 0, 1),
        );
        result.add_declaration("width", "var(--speed)", false, Specificity(0, 0, 1));
    }
    cascade.add_interpolations(
        vec![(PropertyId::Custom("--speed".to_owned()), "5s".to_owned())],
        CascadeOrigin::Animation,
    );
    cascade.apply(CascadeFilter::default());
    // Animation-tainted in an animation-controlling property: unusable,
    // falls back to the initial value. Ordinary properties may consume it.
    assert_eq!(
        computed(&cascade, &PropertyId::AnimationDuration),
        Some("0s".to_owned())
    );
    assert_eq!(computed(&cascade, &PropertyId::Width), Some("5s".to_owned()));
}

#[test]
fn custom_properties_inherit_from_the_parent_style() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut parent_cascade = author_cascade(&[("--theme", "teal")]);
    parent_cascade.apply(CascadeFilter::default());
    let parent: Arc<ComputedValues> = Arc::new(parent_cascade.state_mut().take_style());

    let mut state = StyleState::new();
    state.set_parent_style(parent);
    let mut cascade = StyleCascade::new(state);
    {
        let result = cascade.mutable_match_result().unwrap();
        result.begin_block(CascadeOrigin::Author, IMPLICIT_OUTER_LAYER);
        result.add_declaration("color", "var(--theme)", false, Specificity(0, 0, 1));
    }
    cascade.apply(CascadeFilter::default());
    assert_eq!(
        computed(&cascade, &PropertyId::Color),
        Some("teal".to_owned())
    );
}

#[test]
fn user_defined_functions_evaluate_with_bound_arguments() {
    let mut cascade = author_cascade(&[("width", "--double(21px)"), ("height", "--nope(1px)")]);
    cascade.state_mut().functions_mut().register(
        "--double",
        vec!["--value".to_owned()],
        "calc(var(--value) * 2)",
    );
    cascade.apply(CascadeFilter::default());
    assert_eq!(
        computed(&cascade, &PropertyId::Width),
        Some("42px".to_owned())
    );
    // Unknown function: invalid at computed-value time.
    assert_eq!(
        computed(&cascade, &PropertyId::Height),
        Some("auto".to_owned())
    );
}

#[test]
fn function_arguments_may_reference_variables_and_nest() {
    let mut cascade = author_cascade(&[
        ("--base", "10px"),
        ("width", "--double(var(--base))"),
        ("height", "--double(--double(var(--base)))"),
    ]);
    cascade.state_mut().functions_mut().register(
        "--double",
        vec!["--value".to_owned()],
        "calc(var(--value) * 2)",
    );
    cascade.apply(CascadeFilter::default());
    assert_eq!(
        computed(&cascade, &PropertyId::Width),
        Some("20px".to_owned())
    );
    assert_eq!(
        computed(&cascade, &PropertyId::Height),
        Some("40px".to_owned())
    );
}
