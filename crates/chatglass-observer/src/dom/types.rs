//! Shared DOM types: viewport, bounding box, and node attributes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Viewport information for geometry checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewportInfo {
    /// Viewport width in pixels.
    pub width: u32,
    /// Viewport height in pixels.
    pub height: u32,
    /// Device pixel ratio.
    pub device_pixel_ratio: f64,
}

impl Default for ViewportInfo {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            device_pixel_ratio: 1.0,
        }
    }
}

impl ViewportInfo {
    /// Horizontal threshold separating the incoming (left) side from the
    /// outgoing (right) side of a two-column chat layout.
    pub fn incoming_side_limit(&self) -> f64 {
        f64::from(self.width) / 3.0
    }
}

/// Bounding box for an element, in viewport coordinates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Left edge in viewport coordinates.
    pub fn left(&self) -> f64 {
        self.x
    }

    /// Whether the box has any rendered extent at all.
    pub fn has_extent(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Attributes extracted from a page element.
///
/// Only attributes the heuristics key on are kept as named fields; the rest
/// of the `data-*` family lands in `data` verbatim (full attribute name as
/// the key).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NodeAttributes {
    /// Element ID attribute.
    pub id: Option<String>,
    /// Element class names, space separated.
    pub class: Option<String>,
    /// Role attribute (ARIA).
    pub role: Option<String>,
    /// Aria-label.
    pub aria_label: Option<String>,
    /// Placeholder text.
    pub placeholder: Option<String>,
    /// Type attribute (inputs).
    pub r#type: Option<String>,
    /// Contenteditable attribute, verbatim.
    pub content_editable: Option<String>,
    /// Src for images.
    pub src: Option<String>,
    /// Alt text.
    pub alt: Option<String>,
    /// Data attributes, keyed by full attribute name.
    #[serde(default)]
    pub data: HashMap<String, String>,
}

impl NodeAttributes {
    /// Build from the flat `[name, value, name, value, ...]` vector CDP
    /// returns on `DOM.getDocument` nodes.
    pub fn from_flat(pairs: &[String]) -> Self {
        let mut attrs = Self::default();
        for chunk in pairs.chunks_exact(2) {
            let (name, value) = (chunk[0].as_str(), chunk[1].clone());
            match name {
                "id" => attrs.id = Some(value),
                "class" => attrs.class = Some(value),
                "role" => attrs.role = Some(value),
                "aria-label" => attrs.aria_label = Some(value),
                "placeholder" => attrs.placeholder = Some(value),
                "type" => attrs.r#type = Some(value),
                "contenteditable" => attrs.content_editable = Some(value),
                "src" => attrs.src = Some(value),
                "alt" => attrs.alt = Some(value),
                _ if name.starts_with("data-") => {
                    attrs.data.insert(name.to_string(), value);
                }
                _ => {}
            }
        }
        attrs
    }

    /// Look up an attribute by its markup name.
    pub fn get(&self, name: &str) -> Option<&str> {
        match name {
            "id" => self.id.as_deref(),
            "class" => self.class.as_deref(),
            "role" => self.role.as_deref(),
            "aria-label" => self.aria_label.as_deref(),
            "placeholder" => self.placeholder.as_deref(),
            "type" => self.r#type.as_deref(),
            "contenteditable" => self.content_editable.as_deref(),
            "src" => self.src.as_deref(),
            "alt" => self.alt.as_deref(),
            _ => self.data.get(name).map(String::as_str),
        }
    }

    /// Whether the class list contains the given token.
    pub fn has_class_token(&self, token: &str) -> bool {
        self.class
            .as_deref()
            .is_some_and(|c| c.split_ascii_whitespace().any(|t| t == token))
    }
}
