//! Per-platform structural matchers, as declarative data.
//!
//! This table is the artifact to revise when a host page's markup changes.
//! Matchers key on stable structural attributes (roles, data attributes,
//! editability), never on obfuscated class names.

use crate::dom::PageNode;

/// WhatsApp message elements carry a copy-metadata attribute encoding
/// timestamp + sender.
pub const WHATSAPP_MARKER_ATTR: &str = "data-pre-plain-text";
/// Class token WhatsApp puts on messages sent by self.
pub const WHATSAPP_OUTGOING_TOKEN: &str = "message-out";
/// Instagram renders thread messages as list items.
pub const INSTAGRAM_MESSAGE_ROLE: &str = "listitem";
/// Messenger renders thread messages as grid rows.
pub const MESSENGER_MESSAGE_ROLE: &str = "row";

/// One compose-surface matcher. All populated conditions must hold.
#[derive(Debug, Clone, Copy)]
pub struct ComposeMatcher {
    pub tag: Option<&'static str>,
    pub role: Option<&'static str>,
    pub requires_editable: bool,
    pub attr_present: Option<&'static str>,
}

impl ComposeMatcher {
    pub fn matches(&self, node: &PageNode) -> bool {
        if let Some(tag) = self.tag {
            if node.tag_name != tag {
                return false;
            }
        }
        if let Some(role) = self.role {
            if node.attributes.role.as_deref() != Some(role) {
                return false;
            }
        }
        if self.requires_editable && !node.is_editable() {
            return false;
        }
        if let Some(attr) = self.attr_present {
            if node.attributes.get(attr).is_none() {
                return false;
            }
        }
        true
    }
}

/// Everything one platform strategy needs to find messages and the compose
/// surface.
#[derive(Debug, Clone, Copy)]
pub struct SelectorTable {
    /// Attribute marking message elements (encodes sender + timestamp).
    pub message_marker_attr: Option<&'static str>,
    /// Class token marking a message as sent by self.
    pub outgoing_class_token: Option<&'static str>,
    /// ARIA role carried by message elements.
    pub message_role: Option<&'static str>,
    /// Compose-surface matchers, most specific first.
    pub compose: &'static [ComposeMatcher],
}

pub const WHATSAPP: SelectorTable = SelectorTable {
    message_marker_attr: Some(WHATSAPP_MARKER_ATTR),
    outgoing_class_token: Some(WHATSAPP_OUTGOING_TOKEN),
    message_role: None,
    compose: &[
        // The footer compose box carries a data-tab index.
        ComposeMatcher {
            tag: None,
            role: None,
            requires_editable: true,
            attr_present: Some("data-tab"),
        },
        ComposeMatcher {
            tag: None,
            role: Some("textbox"),
            requires_editable: true,
            attr_present: None,
        },
    ],
};

pub const INSTAGRAM: SelectorTable = SelectorTable {
    message_marker_attr: None,
    outgoing_class_token: None,
    message_role: Some(INSTAGRAM_MESSAGE_ROLE),
    compose: &[
        ComposeMatcher {
            tag: None,
            role: Some("textbox"),
            requires_editable: true,
            attr_present: None,
        },
        ComposeMatcher {
            tag: Some("textarea"),
            role: None,
            requires_editable: false,
            attr_present: Some("placeholder"),
        },
    ],
};

pub const MESSENGER: SelectorTable = SelectorTable {
    message_marker_attr: None,
    outgoing_class_token: None,
    message_role: Some(MESSENGER_MESSAGE_ROLE),
    compose: &[
        ComposeMatcher {
            tag: None,
            role: Some("textbox"),
            requires_editable: true,
            attr_present: Some("aria-label"),
        },
        ComposeMatcher {
            tag: None,
            role: Some("textbox"),
            requires_editable: true,
            attr_present: None,
        },
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::PageNode;

    #[test]
    fn whatsapp_compose_matcher_requires_editable_with_data_tab() {
        let matcher = WHATSAPP.compose[0];

        let mut node = PageNode::new("div");
        node.attributes
            .data
            .insert("data-tab".to_string(), "10".to_string());
        assert!(!matcher.matches(&node), "not editable yet");

        node.attributes.content_editable = Some("true".to_string());
        assert!(matcher.matches(&node));
    }

    #[test]
    fn role_matcher_rejects_other_roles() {
        let matcher = MESSENGER.compose[1];
        let mut node = PageNode::new("div");
        node.attributes.content_editable = Some("true".to_string());
        node.attributes.role = Some("search".to_string());
        assert!(!matcher.matches(&node));
        node.attributes.role = Some("textbox".to_string());
        assert!(matcher.matches(&node));
    }

    #[test]
    fn tag_matcher_checks_tag_and_attr() {
        let matcher = INSTAGRAM.compose[1];
        let mut node = PageNode::new("textarea");
        assert!(!matcher.matches(&node), "placeholder required");
        node.attributes.placeholder = Some("Message...".to_string());
        assert!(matcher.matches(&node));
    }
}
