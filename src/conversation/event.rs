//! Inbound events from the chat transport

use bytes::Bytes;

use crate::models::{Category, ControlAction};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    PhotoReceived { bytes: Bytes },
    ChoiceSelected { category: Category, value: String },
    ControlAction(ControlAction),
    FreeText(String),
    Command(String),
    /// Anything the transport cannot classify: stickers, documents, stale buttons.
    Unsupported,
}

impl Event {
    /// Decodes a button payload such as `tone:Luxury` or `control:skip_context`.
    pub fn from_callback_data(data: &str) -> Option<Self> {
        let (prefix, value) = data.split_once(':')?;
        if prefix == "control" {
            return ControlAction::from_key(value).map(Event::ControlAction);
        }
        let category = Category::from_prefix(prefix)?;
        Some(Event::ChoiceSelected {
            category,
            value: value.to_string(),
        })
    }

    /// Classifies a text message as a `/command` or free text.
    pub fn from_text(text: &str) -> Self {
        match text.strip_prefix('/') {
            Some(rest) if !rest.is_empty() && !rest.starts_with(char::is_whitespace) => {
                let word = rest.split_whitespace().next().unwrap_or_default();
                // Group chats address commands as /cancel@SomeBot
                let name = word.split('@').next().unwrap_or_default();
                Event::Command(name.to_lowercase())
            }
            _ => Event::FreeText(text.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_callback_choice() {
        assert_eq!(
            Event::from_callback_data("platform:Instagram"),
            Some(Event::ChoiceSelected {
                category: Category::Platform,
                value: "Instagram".into()
            })
        );
        assert_eq!(
            Event::from_callback_data("service:Fabric"),
            Some(Event::ChoiceSelected {
                category: Category::Service,
                value: "Fabric".into()
            })
        );
    }

    #[test]
    fn test_callback_control() {
        assert_eq!(
            Event::from_callback_data("control:done_services"),
            Some(Event::ControlAction(ControlAction::DoneServices))
        );
        assert_eq!(
            Event::from_callback_data("control:skip_context"),
            Some(Event::ControlAction(ControlAction::SkipContext))
        );
        assert_eq!(Event::from_callback_data("control:explode"), None);
    }

    #[test]
    fn test_callback_garbage() {
        assert_eq!(Event::from_callback_data("nonsense"), None);
        assert_eq!(Event::from_callback_data("color:red"), None);
    }

    #[test]
    fn test_text_commands() {
        assert_eq!(Event::from_text("/cancel"), Event::Command("cancel".into()));
        assert_eq!(Event::from_text("/Start now"), Event::Command("start".into()));
        assert_eq!(
            Event::from_text("/cancel@ContentBot"),
            Event::Command("cancel".into())
        );
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(
            Event::from_text("New winter line"),
            Event::FreeText("New winter line".into())
        );
        assert_eq!(Event::from_text("/"), Event::FreeText("/".into()));
        assert_eq!(Event::from_text("/ spaced"), Event::FreeText("/ spaced".into()));
    }
}
