//! Pure state transition function

use thiserror::Error;

use super::menu::{context_menu, platform_menu, services_menu, tone_menu};
use super::messages;
use super::{Effect, Event};
use crate::models::{
    Category, ControlAction, GenerationJob, GenerationTicket, ImageData, ImageError, Step,
    UserState,
};

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: UserState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: UserState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Rejected events. The user's state is left untouched for every variant.
#[derive(Debug, Error, PartialEq)]
pub enum TransitionError {
    #[error("event not accepted while {}", .0.as_str())]
    Unexpected(Step),
    #[error("{category:?} choice {value:?} is not offered")]
    InvalidChoice { category: Category, value: String },
    #[error("invalid image: {0}")]
    InvalidImage(#[from] ImageError),
    #[error("a generation is still running")]
    GenerationInFlight,
    #[error("unknown command /{0}")]
    UnknownCommand(String),
    #[error("collected answers missing while {}", .0.as_str())]
    Incomplete(Step),
}

impl TransitionError {
    /// Message telling the user what the bot expects instead.
    pub fn guidance(&self) -> &'static str {
        match self {
            TransitionError::Unexpected(step) => messages::guidance(*step),
            TransitionError::InvalidChoice { .. } => messages::INVALID_CHOICE,
            TransitionError::InvalidImage(_) => messages::INVALID_IMAGE,
            TransitionError::GenerationInFlight => messages::STILL_WORKING,
            TransitionError::UnknownCommand(_) => messages::UNKNOWN_COMMAND,
            TransitionError::Incomplete(_) => messages::INCOMPLETE,
        }
    }
}

/// Applies `event` to `state`.
///
/// Commands are accepted from every step. Everything else must match the
/// trigger set of the current step; any other pairing is rejected.
pub fn transition(state: &UserState, event: Event) -> Result<TransitionResult, TransitionError> {
    match (state.step, event) {
        (_, Event::Command(name)) => command(state, &name),

        // Idle + photo -> AwaitingPlatform
        (Step::Idle, Event::PhotoReceived { bytes }) => {
            if state.in_flight.is_some() {
                return Err(TransitionError::GenerationInFlight);
            }
            let image = ImageData::detect(bytes)?;
            let next = UserState {
                step: Step::AwaitingPlatform,
                image: Some(image),
                ..UserState::default()
            };
            Ok(TransitionResult::new(next)
                .with_effects(clear_pending(state))
                .with_effect(Effect::show_prompt(messages::ASK_PLATFORM, platform_menu())))
        }

        // AwaitingPlatform + platform -> AwaitingTone
        (Step::AwaitingPlatform, Event::ChoiceSelected { category: Category::Platform, value }) => {
            ensure_offered(Category::Platform, &value)?;
            let mut next = state.clone();
            next.platform = Some(value);
            next.step = Step::AwaitingTone;
            Ok(TransitionResult::new(next).with_effect(Effect::replace_prompt(
                state.pending_prompt,
                messages::ASK_TONE,
                tone_menu(),
            )))
        }

        // AwaitingTone + tone -> AwaitingServices
        (Step::AwaitingTone, Event::ChoiceSelected { category: Category::Tone, value }) => {
            ensure_offered(Category::Tone, &value)?;
            let mut next = state.clone();
            next.tone = Some(value);
            next.step = Step::AwaitingServices;
            let menu = services_menu(&next.services);
            Ok(TransitionResult::new(next).with_effect(Effect::replace_prompt(
                state.pending_prompt,
                messages::ASK_SERVICES,
                menu,
            )))
        }

        // AwaitingServices + toggle -> AwaitingServices
        (Step::AwaitingServices, Event::ChoiceSelected { category: Category::Service, value }) => {
            let mut next = state.clone();
            // Unknown keys leave the selection alone but still redraw the menu
            if Category::Service.contains(&value) {
                next.toggle_service(&value);
            } else {
                tracing::debug!(service = %value, "ignoring toggle for unknown service");
            }
            let menu = services_menu(&next.services);
            Ok(TransitionResult::new(next).with_effect(Effect::replace_prompt(
                state.pending_prompt,
                messages::ASK_SERVICES,
                menu,
            )))
        }

        // AwaitingServices + done -> AwaitingContext
        (Step::AwaitingServices, Event::ControlAction(ControlAction::DoneServices)) => {
            let mut next = state.clone();
            next.step = Step::AwaitingContext;
            Ok(TransitionResult::new(next).with_effect(Effect::replace_prompt(
                state.pending_prompt,
                messages::ASK_CONTEXT,
                context_menu(),
            )))
        }

        // AwaitingContext + text/skip -> Idle, generation starts
        (Step::AwaitingContext, Event::FreeText(text)) => begin_generation(state, text),
        (Step::AwaitingContext, Event::ControlAction(ControlAction::SkipContext)) => {
            begin_generation(state, String::new())
        }

        (step, _) => Err(TransitionError::Unexpected(step)),
    }
}

fn command(state: &UserState, name: &str) -> Result<TransitionResult, TransitionError> {
    let reply = match name {
        "start" => messages::WELCOME,
        "cancel" => messages::CANCELLED,
        other => return Err(TransitionError::UnknownCommand(other.to_string())),
    };
    Ok(TransitionResult::new(UserState::default())
        .with_effects(clear_pending(state))
        .with_effect(Effect::send_text(reply)))
}

fn begin_generation(state: &UserState, context: String) -> Result<TransitionResult, TransitionError> {
    let image = state
        .image
        .clone()
        .ok_or(TransitionError::Incomplete(state.step))?;

    let mut next = state.clone();
    next.freeform_context = context;
    let brief = next.brief().ok_or(TransitionError::Incomplete(state.step))?;

    let ticket = GenerationTicket::next();
    next.step = Step::Idle;
    next.pending_prompt = None;
    next.in_flight = Some(ticket);

    Ok(TransitionResult::new(next)
        .with_effects(clear_pending(state))
        .with_effect(Effect::Generate(GenerationJob {
            ticket,
            image,
            brief,
        })))
}

fn ensure_offered(category: Category, value: &str) -> Result<(), TransitionError> {
    if category.contains(value) {
        Ok(())
    } else {
        Err(TransitionError::InvalidChoice {
            category,
            value: value.to_string(),
        })
    }
}

fn clear_pending(state: &UserState) -> Option<Effect> {
    state
        .pending_prompt
        .map(|prompt| Effect::ClearPrompt { prompt })
}
