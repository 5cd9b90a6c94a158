//! Hover tooltip anchored to a map coordinate.
//!
//! Visibility follows hover state only: a feature with a non-empty `name`
//! under the pointer shows the tooltip, anything else hides it.

use formats::Feature;
use foundation::math::Coord;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Positioning {
    BottomCenter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TooltipContent {
    pub name: String,
    pub full_address: Option<String>,
}

impl TooltipContent {
    /// Content for a hovered feature, if it has a usable `name`.
    pub fn for_feature(feature: &Feature) -> Option<Self> {
        let name = feature.string_property("name")?;
        Some(Self {
            name: name.to_string(),
            full_address: feature.string_property("fullAddress").map(str::to_string),
        })
    }

    /// Markup for the tooltip element; text is escaped.
    pub fn html(&self) -> String {
        match &self.full_address {
            Some(full) => format!(
                "<strong>{}</strong><br>{}",
                escape_html(&self.name),
                escape_html(full)
            ),
            None => format!("<strong>{}</strong>", escape_html(&self.name)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TooltipOverlay {
    /// Pixel offset from the anchor.
    pub offset: [f64; 2],
    pub positioning: Positioning,
    position: Option<Coord>,
    content: Option<TooltipContent>,
}

impl Default for TooltipOverlay {
    fn default() -> Self {
        Self {
            offset: [0.0, -20.0],
            positioning: Positioning::BottomCenter,
            position: None,
            content: None,
        }
    }
}

impl TooltipOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self) -> bool {
        self.content.is_some()
    }

    pub fn position(&self) -> Option<Coord> {
        self.position
    }

    pub fn content(&self) -> Option<&TooltipContent> {
        self.content.as_ref()
    }

    /// Shows `content` at `coord`. Returns `true` if anything changed.
    pub fn show(&mut self, content: TooltipContent, coord: Coord) -> bool {
        let changed = self.content.as_ref() != Some(&content) || self.position != Some(coord);
        self.content = Some(content);
        self.position = Some(coord);
        changed
    }

    /// Hides the tooltip. Returns `true` if it was visible.
    pub fn hide(&mut self) -> bool {
        self.position = None;
        self.content.take().is_some()
    }

    /// Pointer moved to `coord` with `hovered` under it.
    pub fn on_pointer_move(&mut self, hovered: Option<&Feature>, coord: Coord) -> bool {
        match hovered.and_then(TooltipContent::for_feature) {
            Some(content) => self.show(content, coord),
            None => self.hide(),
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
