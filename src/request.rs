//! Raw label request parameters.
//!
//! Values arrive as loosely typed text from the outer surface (CLI flags,
//! form fields) and are only interpreted by [`crate::context::resolve`].

/// Unparsed parameters of a label request. `None` means "use the default".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderRequest {
    /// Absent text is fine for a preview but rejected when printing.
    pub text: Option<String>,
    pub font_family: Option<String>,
    pub font_style: Option<String>,
    pub font_size: Option<String>,
    pub label_size: Option<String>,
    /// Flat pixel margin kept for compatibility with older clients. It has
    /// no effect on the layout, margins are derived from the percentages.
    pub margin: Option<String>,
    pub threshold: Option<String>,
    pub align: Option<String>,
    pub orientation: Option<String>,
    /// Margins in percent of the font size.
    pub margin_top: Option<String>,
    pub margin_bottom: Option<String>,
    pub margin_left: Option<String>,
    pub margin_right: Option<String>,
}

impl RenderRequest {
    pub fn new(text: impl Into<String>) -> Self {
        RenderRequest {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Fill family and style from the legacy `"Family (Style)"` form.
    pub fn with_combined_font(self, combined: &str) -> Self {
        let (family, style) = split_font_family(combined);
        RenderRequest {
            font_family: family,
            font_style: style,
            ..self
        }
    }
}

/// Split `"Family (Style)"` on the last opening parenthesis.
///
/// Families may contain parentheses themselves, only the last group is the
/// style. Empty parts come back as `None`.
pub fn split_font_family(combined: &str) -> (Option<String>, Option<String>) {
    let (family, style) = match combined.rfind('(') {
        Some(index) => (&combined[..index], &combined[index + 1..]),
        None => ("", combined),
    };
    let family = family.trim();
    let style = style.trim_end_matches(')');

    let non_empty = |s: &str| {
        if s.is_empty() {
            None
        } else {
            Some(s.to_string())
        }
    };
    (non_empty(family), non_empty(style))
}
