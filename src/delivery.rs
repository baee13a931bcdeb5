//! Outbound side of the chat transport

use async_trait::async_trait;
use thiserror::Error;

use crate::conversation::Menu;
use crate::models::{MessageRef, UserId};

#[derive(Debug, Error)]
#[error("delivery failed: {0}")]
pub struct DeliveryError(pub String);

/// Renders prompts and text for a user. Implemented by the chat adapter.
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn show_prompt(&self, user: UserId, text: &str, menu: &Menu) -> Result<MessageRef, DeliveryError>;

    async fn replace_prompt(
        &self,
        user: UserId,
        prompt: MessageRef,
        text: &str,
        menu: &Menu,
    ) -> Result<(), DeliveryError>;

    /// Removes the buttons of a prompt, leaving its text in place.
    async fn clear_prompt(&self, user: UserId, prompt: MessageRef) -> Result<(), DeliveryError>;

    async fn send_text(&self, user: UserId, text: &str) -> Result<MessageRef, DeliveryError>;

    async fn delete_message(&self, user: UserId, message: MessageRef) -> Result<(), DeliveryError>;
}
