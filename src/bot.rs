use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::conversation::{messages, transition, Effect, Event, Menu, TransitionError};
use crate::delivery::Delivery;
use crate::gemini::{ContentGenerator, GeminiError};
use crate::models::{GenerationJob, MessageRef, UserId};
use crate::store::StateStore;

/// Drives conversations: applies events to the store and carries out the resulting effects.
#[derive(Clone)]
pub struct ContentBot {
    store: Arc<StateStore>,
    delivery: Arc<dyn Delivery>,
    generator: Arc<dyn ContentGenerator>,
}

impl ContentBot {
    pub fn new(delivery: Arc<dyn Delivery>, generator: Arc<dyn ContentGenerator>) -> Self {
        Self {
            store: Arc::new(StateStore::new()),
            delivery,
            generator,
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Applies one inbound event. Returns the generation task when the event started one.
    pub async fn handle(&self, user: UserId, event: Event) -> Option<JoinHandle<()>> {
        let outcome = self.store.update(user, |state| {
            let result = transition(state, event)?;
            debug!(
                user = user.0,
                from = state.step.as_str(),
                to = result.new_state.step.as_str(),
                "transition"
            );
            *state = result.new_state;
            Ok::<_, TransitionError>(result.effects)
        });

        match outcome {
            Ok(effects) => {
                let mut generation = None;
                for effect in effects {
                    if let Some(task) = self.execute(user, effect).await {
                        generation = Some(task);
                    }
                }
                generation
            }
            Err(err @ TransitionError::Incomplete(_)) => {
                error!(user = user.0, "{}", err);
                self.store.reset(user);
                self.notify(user, err.guidance()).await;
                None
            }
            Err(err) => {
                debug!(user = user.0, "rejected event: {}", err);
                self.notify(user, err.guidance()).await;
                None
            }
        }
    }

    /// Sends a plain message, logging instead of failing.
    pub async fn notify(&self, user: UserId, text: &str) {
        if let Err(e) = self.delivery.send_text(user, text).await {
            error!(user = user.0, "Error sending message: {}", e);
        }
    }

    async fn execute(&self, user: UserId, effect: Effect) -> Option<JoinHandle<()>> {
        match effect {
            Effect::ShowPrompt { text, menu } => self.show_prompt(user, &text, &menu).await,
            Effect::ReplacePrompt {
                prompt: Some(prompt),
                text,
                menu,
            } => {
                if let Err(e) = self.delivery.replace_prompt(user, prompt, &text, &menu).await {
                    warn!(user = user.0, "Error editing message, might be unchanged: {}", e);
                }
            }
            Effect::ReplacePrompt {
                prompt: None,
                text,
                menu,
            } => {
                warn!(user = user.0, "No prompt to edit, sending a new one");
                self.show_prompt(user, &text, &menu).await;
            }
            Effect::ClearPrompt { prompt } => {
                if let Err(e) = self.delivery.clear_prompt(user, prompt).await {
                    warn!(user = user.0, "Error removing keyboard: {}", e);
                }
            }
            Effect::SendText { text } => self.notify(user, &text).await,
            Effect::Generate(job) => return Some(self.spawn_generation(user, job)),
        }
        None
    }

    // The chat transport handles one update per chat at a time, so the
    // provider calls must not hold up a later /cancel from the same user.
    fn spawn_generation(&self, user: UserId, job: GenerationJob) -> JoinHandle<()> {
        let bot = self.clone();
        tokio::spawn(async move { bot.run_generation(user, job).await })
    }

    async fn show_prompt(&self, user: UserId, text: &str, menu: &Menu) {
        match self.delivery.show_prompt(user, text, menu).await {
            Ok(prompt) => self.store.set_pending_prompt(user, prompt),
            Err(e) => error!(user = user.0, "Error sending prompt: {}", e),
        }
    }

    async fn run_generation(&self, user: UserId, job: GenerationJob) {
        info!(
            user = user.0,
            platform = %job.brief.platform,
            tone = %job.brief.tone,
            services = job.brief.services.len(),
            "🚀 Generating content"
        );

        let notice: Option<MessageRef> = match self.delivery.send_text(user, messages::THINKING).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(user = user.0, "Error sending progress notice: {}", e);
                None
            }
        };

        let outcome = self.generator.generate_content(&job).await;

        if let Some(id) = notice {
            if let Err(e) = self.delivery.delete_message(user, id).await {
                warn!(user = user.0, "Error deleting progress notice: {}", e);
            }
        }

        if !self.store.finish_generation(user, job.ticket) {
            info!(user = user.0, "🗑️ Conversation was reset during generation, discarding result");
            return;
        }

        match outcome {
            Ok(result) => {
                info!(user = user.0, hashtags = result.hashtags.len(), "✅ Content generated");
                for text in messages::render_result(&result) {
                    self.notify(user, &text).await;
                }
            }
            Err(e) => {
                error!(user = user.0, "❌ Error generating content: {}", e);
                self.notify(user, &failure_text(&e)).await;
            }
        }
    }
}

/// What the user sees when a generation attempt fails.
fn failure_text(err: &GeminiError) -> String {
    match err {
        GeminiError::Blocked(reason) => messages::generation_failed(&format!(
            "the request was blocked ({}).",
            messages::escape_markdown(reason)
        )),
        _ => messages::generation_failed("I couldn't generate content for this photo right now."),
    }
}
