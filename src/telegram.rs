//! Telegram transport: turns updates into conversation events and renders effects.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{
    ChatId, InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode, PhotoSize, User,
};
use teloxide::{ApiError, RequestError};
use tracing::{error, info, warn};

use crate::bot::ContentBot;
use crate::conversation::{messages, Event, Menu};
use crate::delivery::{Delivery, DeliveryError};
use crate::models::{MessageRef, UserId};

fn chat(user: UserId) -> ChatId {
    ChatId(user.0)
}

// State is keyed on the sender so messages and button presses land in the same record.
fn sender(user: &User) -> UserId {
    UserId(user.id.0 as i64)
}

fn keyboard(menu: &Menu) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(menu.rows.iter().map(|row| {
        row.iter()
            .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.data.clone()))
            .collect::<Vec<_>>()
    }))
}

fn delivery_error(e: RequestError) -> DeliveryError {
    DeliveryError(e.to_string())
}

pub struct TelegramDelivery {
    bot: Bot,
}

impl TelegramDelivery {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Delivery for TelegramDelivery {
    async fn show_prompt(&self, user: UserId, text: &str, menu: &Menu) -> Result<MessageRef, DeliveryError> {
        let request = self
            .bot
            .send_message(chat(user), text)
            .parse_mode(ParseMode::Markdown);
        let request = if menu.is_empty() {
            request
        } else {
            request.reply_markup(keyboard(menu))
        };
        let sent = request.await.map_err(delivery_error)?;
        Ok(MessageRef(sent.id.0))
    }

    async fn replace_prompt(
        &self,
        user: UserId,
        prompt: MessageRef,
        text: &str,
        menu: &Menu,
    ) -> Result<(), DeliveryError> {
        self.bot
            .edit_message_text(chat(user), MessageId(prompt.0), text)
            .parse_mode(ParseMode::Markdown)
            .reply_markup(keyboard(menu))
            .await
            .map_err(delivery_error)?;
        Ok(())
    }

    async fn clear_prompt(&self, user: UserId, prompt: MessageRef) -> Result<(), DeliveryError> {
        self.bot
            .edit_message_reply_markup(chat(user), MessageId(prompt.0))
            .await
            .map_err(delivery_error)?;
        Ok(())
    }

    async fn send_text(&self, user: UserId, text: &str) -> Result<MessageRef, DeliveryError> {
        let sent = match self
            .bot
            .send_message(chat(user), text)
            .parse_mode(ParseMode::Markdown)
            .await
        {
            Err(RequestError::Api(ApiError::CantParseEntities(reason))) => {
                warn!(user = user.0, "Markdown rejected ({}), resending as plain text", reason);
                self.bot.send_message(chat(user), text).await
            }
            other => other,
        };
        Ok(MessageRef(sent.map_err(delivery_error)?.id.0))
    }

    async fn delete_message(&self, user: UserId, message: MessageRef) -> Result<(), DeliveryError> {
        self.bot
            .delete_message(chat(user), MessageId(message.0))
            .await
            .map_err(delivery_error)?;
        Ok(())
    }
}

/// Long-polls Telegram until the process is interrupted.
pub async fn run(bot: Bot, app: Arc<ContentBot>) {
    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(on_message))
        .branch(Update::filter_callback_query().endpoint(on_callback));

    info!("📡 Listening for Telegram updates");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![app])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn on_message(bot: Bot, msg: Message, app: Arc<ContentBot>) -> ResponseResult<()> {
    let Some(from) = msg.from.as_ref() else {
        return Ok(());
    };
    let user = sender(from);

    if let Some(largest) = msg.photo().and_then(|sizes| sizes.last()) {
        match download_photo(&bot, largest).await {
            Ok(bytes) => {
                app.handle(user, Event::PhotoReceived { bytes }).await;
            }
            Err(e) => {
                error!(user = user.0, "Error downloading file: {:#}", e);
                app.notify(user, messages::DOWNLOAD_FAILED).await;
            }
        }
    } else if let Some(text) = msg.text() {
        app.handle(user, Event::from_text(text)).await;
    } else {
        app.handle(user, Event::Unsupported).await;
    }
    Ok(())
}

async fn on_callback(bot: Bot, query: CallbackQuery, app: Arc<ContentBot>) -> ResponseResult<()> {
    // Stops the loading spinner on the pressed button
    if let Err(e) = bot.answer_callback_query(query.id.clone()).await {
        warn!("Error answering callback: {}", e);
    }

    let user = sender(&query.from);
    let event = query
        .data
        .as_deref()
        .and_then(Event::from_callback_data)
        .unwrap_or_else(|| {
            warn!(user = user.0, data = ?query.data, "Unrecognized callback payload");
            Event::Unsupported
        });
    app.handle(user, event).await;
    Ok(())
}

async fn download_photo(bot: &Bot, photo: &PhotoSize) -> anyhow::Result<Bytes> {
    let file = bot.get_file(photo.file.id.clone()).await?;
    let mut buf: Vec<u8> = Vec::new();
    bot.download_file(&file.path, &mut buf).await?;
    Ok(Bytes::from(buf))
}
