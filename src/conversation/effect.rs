//! Effects produced by state transitions

use super::Menu;
use crate::models::{GenerationJob, MessageRef};

/// Work the runtime performs after a transition has been committed
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Send a new interactive prompt and remember it as the pending prompt
    ShowPrompt { text: String, menu: Menu },

    /// Edit the pending prompt in place; falls back to a new prompt when there is none
    ReplacePrompt {
        prompt: Option<MessageRef>,
        text: String,
        menu: Menu,
    },

    /// Strip the buttons from a prompt that is no longer current
    ClearPrompt { prompt: MessageRef },

    SendText { text: String },

    /// Run both generation calls for the collected brief
    Generate(GenerationJob),
}

impl Effect {
    pub fn send_text(text: impl Into<String>) -> Self {
        Effect::SendText { text: text.into() }
    }

    pub fn show_prompt(text: impl Into<String>, menu: Menu) -> Self {
        Effect::ShowPrompt {
            text: text.into(),
            menu,
        }
    }

    pub fn replace_prompt(prompt: Option<MessageRef>, text: impl Into<String>, menu: Menu) -> Self {
        Effect::ReplacePrompt {
            prompt,
            text: text.into(),
            menu,
        }
    }
}
