//! Guided conversation state machine
//!
//! Transitions are pure: they read a user's state and an inbound event and
//! return the next state plus the effects the runtime should carry out.

mod effect;
mod event;
pub mod menu;
pub mod messages;
mod transition;

pub use effect::Effect;
pub use event::Event;
pub use menu::Menu;
pub use transition::{transition, TransitionError};
