//! Narrow color parser used for shape `fill` and `border`.
//!
//! Accepted grammar: `#rrggbb`, `#rrggbbaa`, `rgb(...)`, `rgba(...)`. Anything else,
//! including named colors and short hex, is unparseable and yields `None`. Fully
//! transparent colors also yield `None`.

use std::str::FromStr;

use csscolorparser::Color as CssColor;

/// Normalizes a color to lowercase hex. Opaque colors come back as `#rrggbb`,
/// translucent ones as `#rrggbbaa`.
pub fn normalize_color(input: &str) -> Option<String> {
    let value = input.trim().to_ascii_lowercase();
    if !in_grammar(&value) {
        return None;
    }
    let color = CssColor::from_str(&value).ok()?;
    let r = channel(color.r);
    let g = channel(color.g);
    let b = channel(color.b);
    let a = channel(color.a);
    match a {
        0 => None,
        255 => Some(format!("#{:02x}{:02x}{:02x}", r, g, b)),
        _ => Some(format!("#{:02x}{:02x}{:02x}{:02x}", r, g, b, a)),
    }
}

/// True when `input` falls inside the accepted grammar, whether or not it is transparent.
pub fn is_color_literal(input: &str) -> bool {
    in_grammar(&input.trim().to_ascii_lowercase())
}

/// True for the `transparent` keyword and for in-grammar colors with zero alpha.
pub fn is_transparent(input: &str) -> bool {
    let value = input.trim().to_ascii_lowercase();
    value == "transparent"
        || (in_grammar(&value)
            && CssColor::from_str(&value).is_ok_and(|color| channel(color.a) == 0))
}

fn in_grammar(value: &str) -> bool {
    if let Some(digits) = value.strip_prefix('#') {
        return matches!(digits.len(), 6 | 8) && digits.chars().all(|c| c.is_ascii_hexdigit());
    }
    (value.starts_with("rgb(") || value.starts_with("rgba(")) && value.ends_with(')')
}

fn channel(value: f64) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}
