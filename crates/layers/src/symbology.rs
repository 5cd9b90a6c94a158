use serde::{Serialize, Serializer};

/// Serialized as its CSS string.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgba(0, 0, 0, 1.0);

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// CSS color string understood by canvas renderers. Opaque colors use
    /// the 3-digit hex form when it is exact.
    pub fn css(&self) -> String {
        let short = |c: u8| c % 17 == 0;
        if self.a >= 1.0 && short(self.r) && short(self.g) && short(self.b) {
            format!("#{:x}{:x}{:x}", self.r / 17, self.g / 17, self.b / 17)
        } else if self.a >= 1.0 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.css())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Stroke {
    pub color: Color,
    pub width: f32,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Fill {
    pub color: Color,
}

/// Point symbol drawn from an image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IconStyle {
    pub src: String,
    /// Anchor as a fraction of the image size; `[0.5, 1.0]` is bottom-center.
    pub anchor: [f32; 2],
    pub scale: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayerStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Stroke>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<Fill>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<IconStyle>,
}

impl LayerStyle {
    pub fn area(stroke: Stroke, fill: Fill) -> Self {
        Self {
            stroke: Some(stroke),
            fill: Some(fill),
            icon: None,
        }
    }

    pub fn icon(icon: IconStyle) -> Self {
        Self {
            stroke: None,
            fill: None,
            icon: Some(icon),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Color, Fill, LayerStyle, Stroke};
    use serde_json::json;

    #[test]
    fn css_strings() {
        assert_eq!(Color::BLACK.css(), "#000");
        assert_eq!(Color::rgba(0x12, 0x34, 0x56, 1.0).css(), "#123456");
        assert_eq!(Color::rgba(0, 0, 255, 0.67).css(), "rgba(0, 0, 255, 0.67)");
    }

    #[test]
    fn style_json_carries_css_colors() {
        let style = LayerStyle::area(
            Stroke {
                color: Color::BLACK,
                width: 1.0,
            },
            Fill {
                color: Color::rgba(0, 0, 255, 0.67),
            },
        );
        assert_eq!(
            serde_json::to_value(&style).unwrap(),
            json!({
                "stroke": {"color": "#000", "width": 1.0},
                "fill": {"color": "rgba(0, 0, 255, 0.67)"}
            })
        );
    }
}
