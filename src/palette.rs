use plotters::style::RGBColor;

/// matplotlib's "tab10" cycle
const CATEGORY10: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

/// Categorical colour cycle
#[derive(Debug, Clone)]
pub struct ColorPalette {
    colors: Vec<RGBColor>,
}

impl ColorPalette {
    pub fn category10() -> Self {
        Self {
            colors: CATEGORY10.to_vec(),
        }
    }

    /// Colour for the n-th category, cycling
    pub fn color(&self, index: usize) -> RGBColor {
        self.colors[index % self.colors.len()]
    }

    pub fn take(&self, n: usize) -> Vec<RGBColor> {
        (0..n).map(|i| self.color(i)).collect()
    }
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::category10()
    }
}

/// Parse a colour string, supporting hex (#RRGGBB, #RGB) and basic names
pub fn parse_color(color_str: &str) -> Option<RGBColor> {
    let color_str = color_str.trim();

    if color_str.starts_with('#') {
        return parse_hex_color(color_str);
    }

    match color_str.to_lowercase().as_str() {
        "white" => Some(RGBColor(255, 255, 255)),
        "black" => Some(RGBColor(0, 0, 0)),
        "red" => Some(RGBColor(255, 0, 0)),
        "green" => Some(RGBColor(0, 128, 0)),
        "blue" => Some(RGBColor(0, 0, 255)),
        "orange" => Some(RGBColor(255, 165, 0)),
        "purple" => Some(RGBColor(128, 0, 128)),
        "gray" | "grey" => Some(RGBColor(128, 128, 128)),
        "steelblue" => Some(RGBColor(70, 130, 180)),
        _ => None,
    }
}

fn parse_hex_color(hex: &str) -> Option<RGBColor> {
    let hex = hex.trim_start_matches('#');
    if !hex.is_ascii() {
        return None;
    }
    match hex.len() {
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(RGBColor(r, g, b))
        }
        3 => {
            let r = u8::from_str_radix(&hex[0..1], 16).ok()? * 17;
            let g = u8::from_str_radix(&hex[1..2], 16).ok()? * 17;
            let b = u8::from_str_radix(&hex[2..3], 16).ok()? * 17;
            Some(RGBColor(r, g, b))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_color("#1f77b4"), Some(RGBColor(31, 119, 180)));
        assert_eq!(parse_color("#fff"), Some(RGBColor(255, 255, 255)));
        assert_eq!(parse_color("#12345"), None);
        assert_eq!(parse_color("#あい"), None);
        assert_eq!(parse_color("#ggg"), None);
    }

    #[test]
    fn test_parse_named() {
        assert_eq!(parse_color(" SteelBlue "), Some(RGBColor(70, 130, 180)));
        assert_eq!(parse_color("chartreuse"), None);
    }

    #[test]
    fn test_palette_cycles() {
        let palette = ColorPalette::category10();
        assert_eq!(palette.color(0), palette.color(10));
        assert_eq!(palette.take(3).len(), 3);
    }
}
