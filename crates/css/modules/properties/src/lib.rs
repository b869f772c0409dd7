//! CSS property registry — property identities, per-property flags, initial
//! values, shorthand expansion, and logical property mapping.
//! Spec: <https://www.w3.org/TR/css-cascade-5/> (defaulting),
//! <https://www.w3.org/TR/css-logical-1/> (logical property groups)

#![forbid(unsafe_code)]

/// Identity of a longhand property known to the cascade, or a custom property.
///
/// The registry is a closed set so the resolver can match exhaustively;
/// custom properties carry their case-sensitive name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyId {
    // Cascade-affecting: computed values change how logical properties map.
    Direction,
    WritingMode,
    // High priority: font metrics must resolve before anything using em/rem/lh.
    Color,
    FontFamily,
    FontSize,
    LineHeight,
    // Appearance gates internal UA-only properties.
    Appearance,
    InternalUaBackgroundColor,
    InternalUaBorderColor,
    // Box
    Display,
    Width,
    Height,
    MarginTop,
    MarginRight,
    MarginBottom,
    MarginLeft,
    PaddingTop,
    PaddingRight,
    PaddingBottom,
    PaddingLeft,
    // Logical surrogates, resolved to physical ids during analysis.
    MarginInlineStart,
    MarginInlineEnd,
    PaddingInlineStart,
    PaddingInlineEnd,
    // Backgrounds and borders
    BackgroundColor,
    BackgroundImage,
    BorderImage,
    WebkitBorderImage,
    // Legacy overlapping origin properties
    TransformOrigin,
    WebkitTransformOriginX,
    WebkitTransformOriginY,
    WebkitTransformOriginZ,
    PerspectiveOrigin,
    WebkitPerspectiveOriginX,
    WebkitPerspectiveOriginY,
    // Animation-controlling: may not consume animation-tainted values.
    AnimationName,
    AnimationDuration,
    TransitionProperty,
    TransitionDuration,
    // Misc
    Opacity,
    Visibility,
    /// An author-defined custom property (`--*`), case-sensitive.
    Custom(String),
}

impl PropertyId {
    /// Resolve a property name to its identity. Unknown non-custom names
    /// return `None`.
    pub fn parse(name: &str) -> Option<Self> {
        if name.starts_with("--") {
            return Some(Self::Custom(name.to_owned()));
        }
        let lower = name.to_ascii_lowercase();
        let id = match lower.as_str() {
            "direction" => Self::Direction,
            "writing-mode" => Self::WritingMode,
            "color" => Self::Color,
            "font-family" => Self::FontFamily,
            "font-size" => Self::FontSize,
            "line-height" => Self::LineHeight,
            "-webkit-appearance" | "appearance" => Self::Appearance,
            "-internal-ua-background-color" => Self::InternalUaBackgroundColor,
            "-internal-ua-border-color" => Self::InternalUaBorderColor,
            "display" => Self::Display,
            "width" => Self::Width,
            "height" => Self::Height,
            "margin-top" => Self::MarginTop,
            "margin-right" => Self::MarginRight,
            "margin-bottom" => Self::MarginBottom,
            "margin-left" => Self::MarginLeft,
            "padding-top" => Self::PaddingTop,
            "padding-right" => Self::PaddingRight,
            "padding-bottom" => Self::PaddingBottom,
            "padding-left" => Self::PaddingLeft,
            "margin-inline-start" => Self::MarginInlineStart,
            "margin-inline-end" => Self::MarginInlineEnd,
            "padding-inline-start" => Self::PaddingInlineStart,
            "padding-inline-end" => Self::PaddingInlineEnd,
            "background-color" => Self::BackgroundColor,
            "background-image" => Self::BackgroundImage,
            "border-image" => Self::BorderImage,
            "-webkit-border-image" => Self::WebkitBorderImage,
            "transform-origin" => Self::TransformOrigin,
            "-webkit-transform-origin-x" => Self::WebkitTransformOriginX,
            "-webkit-transform-origin-y" => Self::WebkitTransformOriginY,
            "-webkit-transform-origin-z" => Self::WebkitTransformOriginZ,
            "perspective-origin" => Self::PerspectiveOrigin,
            "-webkit-perspective-origin-x" => Self::WebkitPerspectiveOriginX,
            "-webkit-perspective-origin-y" => Self::WebkitPerspectiveOriginY,
            "animation-name" => Self::AnimationName,
            "animation-duration" => Self::AnimationDuration,
            "transition-property" => Self::TransitionProperty,
            "transition-duration" => Self::TransitionDuration,
            "opacity" => Self::Opacity,
            "visibility" => Self::Visibility,
            _ => return None,
        };
        Some(id)
    }

    /// The canonical property name.
    pub fn name(&self) -> &str {
        match self {
            Self::Direction => "direction",
            Self::WritingMode => "writing-mode",
            Self::Color => "color",
            Self::FontFamily => "font-family",
            Self::FontSize => "font-size",
            Self::LineHeight => "line-height",
            Self::Appearance => "-webkit-appearance",
            Self::InternalUaBackgroundColor => "-internal-ua-background-color",
            Self::InternalUaBorderColor => "-internal-ua-border-color",
            Self::Display => "display",
            Self::Width => "width",
            Self::Height => "height",
            Self::MarginTop => "margin-top",
            Self::MarginRight => "margin-right",
            Self::MarginBottom => "margin-bottom",
            Self::MarginLeft => "margin-left",
            Self::PaddingTop => "padding-top",
            Self::PaddingRight => "padding-right",
            Self::PaddingBottom => "padding-bottom",
            Self::PaddingLeft => "padding-left",
            Self::MarginInlineStart => "margin-inline-start",
            Self::MarginInlineEnd => "margin-inline-end",
            Self::PaddingInlineStart => "padding-inline-start",
            Self::PaddingInlineEnd => "padding-inline-end",
            Self::BackgroundColor => "background-color",
            Self::BackgroundImage => "background-image",
            Self::BorderImage => "border-image",
            Self::WebkitBorderImage => "-webkit-border-image",
            Self::TransformOrigin => "transform-origin",
            Self::WebkitTransformOriginX => "-webkit-transform-origin-x",
            Self::WebkitTransformOriginY => "-webkit-transform-origin-y",
            Self::WebkitTransformOriginZ => "-webkit-transform-origin-z",
            Self::PerspectiveOrigin => "perspective-origin",
            Self::WebkitPerspectiveOriginX => "-webkit-perspective-origin-x",
            Self::WebkitPerspectiveOriginY => "-webkit-perspective-origin-y",
            Self::AnimationName => "animation-name",
            Self::AnimationDuration => "animation-duration",
            Self::TransitionProperty => "transition-property",
            Self::TransitionDuration => "transition-duration",
            Self::Opacity => "opacity",
            Self::Visibility => "visibility",
            Self::Custom(name) => name,
        }
    }

    /// Whether this is a custom property (`--*`).
    pub const fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }

    /// Whether the property is inherited by default.
    /// Spec: <https://www.w3.org/TR/css-cascade-5/#inheriting>
    pub const fn is_inherited(&self) -> bool {
        matches!(
            self,
            Self::Direction
                | Self::WritingMode
                | Self::Color
                | Self::FontFamily
                | Self::FontSize
                | Self::LineHeight
                | Self::Visibility
                | Self::Custom(_)
        )
    }

    /// Whether the computed value affects how other declarations cascade
    /// (logical property mapping).
    pub const fn is_cascade_affecting(&self) -> bool {
        matches!(self, Self::Direction | Self::WritingMode)
    }

    /// Whether the property must be applied before properties that may use
    /// font-relative units.
    pub const fn is_high_priority(&self) -> bool {
        matches!(
            self,
            Self::Color | Self::FontFamily | Self::FontSize | Self::LineHeight
        )
    }

    /// Whether the property is visible only while the element has an
    /// appearance (UA-internal styling).
    pub const fn is_internal_ua(&self) -> bool {
        matches!(
            self,
            Self::InternalUaBackgroundColor | Self::InternalUaBorderColor
        )
    }

    /// Whether the property controls animations or transitions, and thus
    /// may not consume animation-tainted substitution values.
    /// Spec: <https://www.w3.org/TR/css-variables-1/#animation-tainted>
    pub const fn is_animation_controlling(&self) -> bool {
        matches!(
            self,
            Self::AnimationName
                | Self::AnimationDuration
                | Self::TransitionProperty
                | Self::TransitionDuration
        )
    }

    /// Whether this is a logical surrogate that maps onto a physical
    /// property depending on direction / writing-mode.
    pub const fn is_surrogate(&self) -> bool {
        matches!(
            self,
            Self::MarginInlineStart
                | Self::MarginInlineEnd
                | Self::PaddingInlineStart
                | Self::PaddingInlineEnd
        )
    }

    /// Map a logical surrogate to the physical property it cascades into.
    /// Non-surrogates map to themselves.
    /// Spec: <https://www.w3.org/TR/css-logical-1/#directional-keywords>
    pub fn to_physical(&self, direction: Direction, writing_mode: WritingMode) -> Self {
        let horizontal = matches!(writing_mode, WritingMode::HorizontalTb);
        match self {
            Self::MarginInlineStart => match (horizontal, direction) {
                (true, Direction::Ltr) => Self::MarginLeft,
                (true, Direction::Rtl) => Self::MarginRight,
                (false, Direction::Ltr) => Self::MarginTop,
                (false, Direction::Rtl) => Self::MarginBottom,
            },
            Self::MarginInlineEnd => match (horizontal, direction) {
                (true, Direction::Ltr) => Self::MarginRight,
                (true, Direction::Rtl) => Self::MarginLeft,
                (false, Direction::Ltr) => Self::MarginBottom,
                (false, Direction::Rtl) => Self::MarginTop,
            },
            Self::PaddingInlineStart => match (horizontal, direction) {
                (true, Direction::Ltr) => Self::PaddingLeft,
                (true, Direction::Rtl) => Self::PaddingRight,
                (false, Direction::Ltr) => Self::PaddingTop,
                (false, Direction::Rtl) => Self::PaddingBottom,
            },
            Self::PaddingInlineEnd => match (horizontal, direction) {
                (true, Direction::Ltr) => Self::PaddingRight,
                (true, Direction::Rtl) => Self::PaddingLeft,
                (false, Direction::Ltr) => Self::PaddingBottom,
                (false, Direction::Rtl) => Self::PaddingTop,
            },
            other => other.clone(),
        }
    }

    /// The property whose computed storage this property writes.
    ///
    /// `-webkit-border-image` shares its storage with `border-image`.
    pub fn storage_id(&self) -> Self {
        match self {
            Self::WebkitBorderImage => Self::BorderImage,
            other => other.clone(),
        }
    }

    /// The property's initial value, in specified-value text form.
    /// Custom properties have the guaranteed-invalid value (`None`).
    /// Spec: <https://www.w3.org/TR/css-cascade-5/#initial-values>
    pub const fn initial_value(&self) -> Option<&'static str> {
        let text = match self {
            Self::Direction => "ltr",
            Self::WritingMode => "horizontal-tb",
            Self::Color => "black",
            Self::FontFamily => "sans-serif",
            Self::FontSize => "medium",
            Self::LineHeight => "normal",
            Self::Appearance => "none",
            Self::InternalUaBackgroundColor | Self::BackgroundColor => "transparent",
            Self::InternalUaBorderColor => "currentcolor",
            Self::Display => "inline",
            Self::Width | Self::Height => "auto",
            Self::MarginTop
            | Self::MarginRight
            | Self::MarginBottom
            | Self::MarginLeft
            | Self::PaddingTop
            | Self::PaddingRight
            | Self::PaddingBottom
            | Self::PaddingLeft
            | Self::MarginInlineStart
            | Self::MarginInlineEnd
            | Self::PaddingInlineStart
            | Self::PaddingInlineEnd => "0",
            Self::BackgroundImage | Self::BorderImage | Self::WebkitBorderImage => "none",
            Self::TransformOrigin | Self::PerspectiveOrigin => "50% 50%",
            Self::WebkitTransformOriginX
            | Self::WebkitTransformOriginY
            | Self::WebkitPerspectiveOriginX
            | Self::WebkitPerspectiveOriginY => "50%",
            Self::WebkitTransformOriginZ => "0",
            Self::AnimationName => "none",
            Self::AnimationDuration | Self::TransitionDuration => "0s",
            Self::TransitionProperty => "all",
            Self::Opacity => "1",
            Self::Visibility => "visible",
            Self::Custom(_) => return None,
        };
        Some(text)
    }
}

/// The properties applied in the high-priority pass, in application order.
pub const HIGH_PRIORITY_PROPERTIES: [PropertyId; 4] = [
    PropertyId::Color,
    PropertyId::FontFamily,
    PropertyId::FontSize,
    PropertyId::LineHeight,
];

/// Legacy overlapping groups: the wide property first, then the narrow
/// properties that share parts of its computed storage.
/// A lower-priority narrow declaration must be skipped once the wide one is
/// known to win, preserving author-declared order semantics.
pub fn wide_overlapping_groups() -> &'static [(PropertyId, &'static [PropertyId])] {
    static GROUPS: [(PropertyId, &[PropertyId]); 3] = [
        (PropertyId::BorderImage, &[PropertyId::WebkitBorderImage]),
        (
            PropertyId::TransformOrigin,
            &[
                PropertyId::WebkitTransformOriginX,
                PropertyId::WebkitTransformOriginY,
                PropertyId::WebkitTransformOriginZ,
            ],
        ),
        (
            PropertyId::PerspectiveOrigin,
            &[
                PropertyId::WebkitPerspectiveOriginX,
                PropertyId::WebkitPerspectiveOriginY,
            ],
        ),
    ];
    &GROUPS
}

/// Computed value of `direction`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Direction {
    #[default]
    Ltr,
    Rtl,
}

impl Direction {
    /// Parse a `direction` keyword; unknown keywords keep the default.
    pub fn parse(value_text: &str) -> Option<Self> {
        let trimmed = value_text.trim();
        if trimmed.eq_ignore_ascii_case("ltr") {
            Some(Self::Ltr)
        } else if trimmed.eq_ignore_ascii_case("rtl") {
            Some(Self::Rtl)
        } else {
            None
        }
    }
}

/// Computed value of `writing-mode` (horizontal/vertical subset).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WritingMode {
    #[default]
    HorizontalTb,
    VerticalRl,
    VerticalLr,
}

impl WritingMode {
    /// Parse a `writing-mode` keyword.
    pub fn parse(value_text: &str) -> Option<Self> {
        let trimmed = value_text.trim();
        if trimmed.eq_ignore_ascii_case("horizontal-tb") {
            Some(Self::HorizontalTb)
        } else if trimmed.eq_ignore_ascii_case("vertical-rl") {
            Some(Self::VerticalRl)
        } else if trimmed.eq_ignore_ascii_case("vertical-lr") {
            Some(Self::VerticalLr)
        } else {
            None
        }
    }
}

/// Shorthand properties the cascade can expand and slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShorthandId {
    Margin,
    Padding,
}

impl ShorthandId {
    /// Resolve a shorthand name to its identity.
    pub fn parse(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
            "margin" => Some(Self::Margin),
            "padding" => Some(Self::Padding),
            _ => None,
        }
    }

    /// The shorthand's longhands in top/right/bottom/left order.
    pub const fn longhands(self) -> &'static [PropertyId] {
        match self {
            Self::Margin => &[
                PropertyId::MarginTop,
                PropertyId::MarginRight,
                PropertyId::MarginBottom,
                PropertyId::MarginLeft,
            ],
            Self::Padding => &[
                PropertyId::PaddingTop,
                PropertyId::PaddingRight,
                PropertyId::PaddingBottom,
                PropertyId::PaddingLeft,
            ],
        }
    }

    /// Extract the component belonging to `longhand` from the shorthand's
    /// top-level components (1–4 values, standard box expansion).
    pub fn slice_for_longhand(self, longhand: &PropertyId, components: &[String]) -> Option<String> {
        let side = self
            .longhands()
            .iter()
            .position(|candidate| candidate == longhand)?;
        let index = match components.len() {
            1 => 0,
            // [vertical, horizontal]
            2 => [0, 1, 0, 1][side],
            // [top, horizontal, bottom]
            3 => [0, 1, 2, 1][side],
            4 => side,
            _ => return None,
        };
        components.get(index).cloned()
    }
}
