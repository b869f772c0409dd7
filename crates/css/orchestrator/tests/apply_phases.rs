#![allow(clippy::unwrap_used)]

use css_cascade::{CascadeFilter, CascadeOrigin, IMPLICIT_OUTER_LAYER, Specificity};
use css_orchestrator::{StyleCascade, StyleState};
use css_properties::PropertyId;

fn computed(cascade: &StyleCascade, property: &PropertyId) -> Option<String> {
    cascade.state().style().value(property).map(str::to_owned)
}

fn add_author(cascade: &mut StyleCascade, declarations: &[(&str, &str)]) {
    let result = cascade.mutable_match_result().unwrap();
    result.begin_block(CascadeOrigin::Author, IMPLICIT_OUTER_LAYER);
    for &(name, value) in declarations {
        result.add_declaration(name, value, false, Specificity(0, 0, 1));
    }
}

#[test]
fn logical_properties_follow_the_computed_direction() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut cascade = StyleCascade::new(StyleState::new());
    // The logical declaration precedes `direction`; the initial analysis
    // maps it with the default direction and the cascade-affecting pass
    // forces a reanalysis.
    add_author(
        &mut cascade,
        &[("margin-inline-start", "7px"), ("direction", "rtl")],
    );
    cascade.apply(CascadeFilter::default());
    assert_eq!(
        computed(&cascade, &PropertyId::MarginRight),
        Some("7px".to_owned())
    );
    assert_eq!(computed(&cascade, &PropertyId::MarginLeft), None);
}

#[test]
fn logical_properties_follow_the_writing_mode() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut cascade = StyleCascade::new(StyleState::new());
    add_author(
        &mut cascade,
        &[
            ("writing-mode", "vertical-rl"),
            ("padding-inline-start", "3px"),
        ],
    );
    cascade.apply(CascadeFilter::default());
    assert_eq!(
        computed(&cascade, &PropertyId::PaddingTop),
        Some("3px".to_owned())
    );
}

#[test]
fn font_size_is_resolved_before_dependent_properties() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut cascade = StyleCascade::new(StyleState::new());
    add_author(&mut cascade, &[("--size", "2em"), ("font-size", "var(--size)")]);
    cascade.apply(CascadeFilter::default());
    // A custom property carrying font units consumed by font-size itself is
    // a dependency cycle; font-size keeps its unset value.
    assert!((cascade.state().style().font_size_px() - 16.0).abs() < 1e-5);

    let mut plain = StyleCascade::new(StyleState::new());
    add_author(&mut plain, &[("font-size", "2em")]);
    plain.apply(CascadeFilter::default());
    assert!((plain.state().style().font_size_px() - 32.0).abs() < 1e-5);
}

#[test]
fn root_font_unit_variables_cycle_only_on_the_root_element() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut root_state = StyleState::new();
    root_state.set_is_root_element(true);
    let mut root = StyleCascade::new(root_state);
    add_author(&mut root, &[("--size", "1rem"), ("font-size", "var(--size)")]);
    root.apply(CascadeFilter::default());
    assert!((root.state().style().font_size_px() - 16.0).abs() < 1e-5);

    let mut child = StyleCascade::new(StyleState::new());
    add_author(&mut child, &[("--size", "1rem"), ("font-size", "var(--size)")]);
    child.apply(CascadeFilter::default());
    // Not the root: rem resolves against the root font size, no cycle.
    assert_eq!(
        computed(&child, &PropertyId::FontSize),
        Some("1rem".to_owned())
    );
}

#[test]
fn internal_ua_properties_require_an_appearance() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut cascade = StyleCascade::new(StyleState::new());
    {
        let result = cascade.mutable_match_result().unwrap();
        result.begin_block(CascadeOrigin::UserAgent, IMPLICIT_OUTER_LAYER);
        result.add_declaration(
            "-internal-ua-background-color",
            "silver",
            false,
            Specificity(0, 0, 1),
        );
    }
    cascade.apply(CascadeFilter::default());
    assert_eq!(
        computed(&cascade, &PropertyId::InternalUaBackgroundColor),
        None
    );

    let mut styled = StyleCascade::new(StyleState::new());
    {
        let result = styled.mutable_match_result().unwrap();
        result.begin_block(CascadeOrigin::UserAgent, IMPLICIT_OUTER_LAYER);
        result.add_declaration(
            "-internal-ua-background-color",
            "silver",
            false,
            Specificity(0, 0, 1),
        );
        result.add_declaration("-webkit-appearance", "auto", false, Specificity(0, 0, 1));
    }
    styled.apply(CascadeFilter::default());
    assert_eq!(
        computed(&styled, &PropertyId::InternalUaBackgroundColor),
        Some("silver".to_owned())
    );
}

#[test]
fn overlapped_legacy_properties_are_skipped_when_the_wide_one_wins() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut cascade = StyleCascade::new(StyleState::new());
    add_author(
        &mut cascade,
        &[
            ("-webkit-border-image", "url(a.png) 1"),
            ("border-image", "url(b.png) 2"),
        ],
    );
    cascade.apply(CascadeFilter::default());
    // Same storage; the wide property was declared later and wins, and the
    // legacy longhand must not clobber it afterwards.
    assert_eq!(
        computed(&cascade, &PropertyId::BorderImage),
        Some("url(b.png) 2".to_owned())
    );

    let mut reversed = StyleCascade::new(StyleState::new());
    add_author(
        &mut reversed,
        &[
            ("border-image", "url(b.png) 2"),
            ("-webkit-border-image", "url(a.png) 1"),
        ],
    );
    reversed.apply(CascadeFilter::default());
    // Declared-order semantics: the later legacy declaration wins.
    assert_eq!(
        computed(&reversed, &PropertyId::BorderImage),
        Some("url(a.png) 1".to_owned())
    );
}

#[test]
fn shorthands_with_variables_share_one_substitution() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut cascade = StyleCascade::new(StyleState::new());
    add_author(&mut cascade, &[("--m", "1px 2px"), ("margin", "var(--m)")]);
    cascade.apply(CascadeFilter::default());
    assert_eq!(
        computed(&cascade, &PropertyId::MarginTop),
        Some("1px".to_owned())
    );
    assert_eq!(
        computed(&cascade, &PropertyId::MarginRight),
        Some("2px".to_owned())
    );
    assert_eq!(
        computed(&cascade, &PropertyId::MarginBottom),
        Some("1px".to_owned())
    );
    assert_eq!(
        computed(&cascade, &PropertyId::MarginLeft),
        Some("2px".to_owned())
    );
    // The shared substitution resolved the custom property once.
    assert_eq!(cascade.custom_resolution_count(), 1);
}

#[test]
fn animations_sit_between_normal_and_important_author_declarations() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut cascade = StyleCascade::new(StyleState::new());
    {
        let result = cascade.mutable_match_result().unwrap();
        result.begin_block(CascadeOrigin::Author, IMPLICIT_OUTER_LAYER);
        result.add_declaration("color", "blue", false, Specificity(0, 0, 1));
        result.add_declaration("width", "1px", true, Specificity(0, 0, 1));
        result.add_declaration("height", "2px", true, Specificity(0, 0, 1));
    }
    cascade.add_interpolations(
        vec![
            (PropertyId::Color, "rgb(1, 2, 3)".to_owned()),
            (PropertyId::Width, "50px".to_owned()),
        ],
        CascadeOrigin::Animation,
    );
    cascade.add_interpolations(
        vec![(PropertyId::Height, "75px".to_owned())],
        CascadeOrigin::Transition,
    );
    cascade.apply(CascadeFilter::default());
    // Animation beats normal, loses to important; transition beats both.
    assert_eq!(
        computed(&cascade, &PropertyId::Color),
        Some("rgb(1, 2, 3)".to_owned())
    );
    assert_eq!(computed(&cascade, &PropertyId::Width), Some("1px".to_owned()));
    assert_eq!(
        computed(&cascade, &PropertyId::Height),
        Some("75px".to_owned())
    );
}

#[test]
fn interpolated_keyframes_may_reference_variables() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut cascade = StyleCascade::new(StyleState::new());
    add_author(&mut cascade, &[("--target", "90px")]);
    cascade.add_interpolations(
        vec![(PropertyId::Width, "var(--target)".to_owned())],
        CascadeOrigin::Animation,
    );
    cascade.apply(CascadeFilter::default());
    assert_eq!(
        computed(&cascade, &PropertyId::Width),
        Some("90px".to_owned())
    );
}

#[test]
fn try_sets_apply_only_while_out_of_flow_positioned() {
    let _ = env_logger::builder().is_test(true).try_init();
    let build = |out_of_flow: bool| {
        let mut state = StyleState::new();
        state.set_out_of_flow_positioned(out_of_flow);
        let mut cascade = StyleCascade::new(state);
        {
            let result = cascade.mutable_match_result().unwrap();
            result.begin_block(CascadeOrigin::Author, 3);
            result.add_declaration("width", "50px", false, Specificity(0, 0, 1));
            result.begin_try_set_block(IMPLICIT_OUTER_LAYER);
            result.add_declaration("width", "100px", false, Specificity(0, 0, 1));
        }
        cascade.apply(CascadeFilter::default());
        computed(&cascade, &PropertyId::Width)
    };
    assert_eq!(build(true), Some("100px".to_owned()));
    // Not out-of-flow: the try set behaves as revert-layer and the layered
    // author declaration shows through.
    assert_eq!(build(false), Some("50px".to_owned()));
}

#[test]
fn filtered_applies_can_be_completed_later() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut cascade = StyleCascade::new(StyleState::new());
    add_author(&mut cascade, &[("color", "red"), ("width", "8px")]);
    let inherited_only = CascadeFilter {
        reject_non_inherited: true,
        ..CascadeFilter::default()
    };
    cascade.apply(inherited_only);
    assert_eq!(computed(&cascade, &PropertyId::Color), Some("red".to_owned()));
    assert_eq!(computed(&cascade, &PropertyId::Width), None);

    cascade.apply(CascadeFilter::default());
    assert_eq!(computed(&cascade, &PropertyId::Width), Some("8px".to_owned()));
}

#[test]
fn generation_ceiling_forces_reanalysis_and_stays_correct() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut cascade = StyleCascade::new(StyleState::new());
    add_author(&mut cascade, &[("--x", "red"), ("color", "var(--x)")]);
    let inherited_only = CascadeFilter {
        reject_non_inherited: true,
        ..CascadeFilter::default()
    };
    for round in 0..20 {
        let filter = if round % 2 == 0 {
            CascadeFilter::default()
        } else {
            inherited_only
        };
        cascade.apply(filter);
    }
    assert_eq!(computed(&cascade, &PropertyId::Color), Some("red".to_owned()));
}

#[test]
fn explicit_defaulting_keywords_apply() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut parent = StyleCascade::new(StyleState::new());
    add_author(&mut parent, &[("color", "teal"), ("width", "100px")]);
    parent.apply(CascadeFilter::default());
    let parent_style = std::sync::Arc::new(parent.state_mut().take_style());

    let mut state = StyleState::new();
    state.set_parent_style(parent_style);
    let mut cascade = StyleCascade::new(state);
    add_author(
        &mut cascade,
        &[
            ("color", "initial"),
            ("width", "inherit"),
            ("height", "unset"),
            ("font-size", "inherit"),
        ],
    );
    cascade.apply(CascadeFilter::default());
    assert_eq!(
        computed(&cascade, &PropertyId::Color),
        Some("black".to_owned())
    );
    assert_eq!(
        computed(&cascade, &PropertyId::Width),
        Some("100px".to_owned())
    );
    // unset on a non-inherited property is initial.
    assert_eq!(
        computed(&cascade, &PropertyId::Height),
        Some("auto".to_owned())
    );
}
