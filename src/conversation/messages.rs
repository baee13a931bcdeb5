//! User-facing text

use crate::models::{GenerationResult, Step};

pub const WELCOME: &str = "Welcome to the ARSourcingBD Content Bot! 👋\n\n\
    Please send me a **photo** of your product to get started. I will then guide you through a few questions to generate the perfect social media post.";
pub const CANCELLED: &str = "Your previous operation has been cancelled. Send a photo to start over.";
pub const UNKNOWN_COMMAND: &str = "I don't know that command. Send /start or a photo.";

pub const ASK_PLATFORM: &str = "Great photo! 📸 Now, which platform is this for?";
pub const ASK_TONE: &str = "Got it. And what's the **tone** you're going for?";
pub const ASK_SERVICES: &str =
    "Perfect. Which **services** should I highlight? (Select all that apply, then 'Done')";
pub const ASK_CONTEXT: &str = "Last step! Any **additional context**? (e.g., 'This is for our new sustainable line.')\n\n\
    Type your answer or press 'Skip'.";

pub const THINKING: &str = "Got it! ✨ Analyzing image and your requirements... This might take a moment.";
pub const STILL_WORKING: &str = "I'm still working on your last photo. ✨ Please wait for the results, or /cancel to start over.";
pub const DOWNLOAD_FAILED: &str = "Sorry, I had trouble downloading your photo. Please try again.";
pub const INVALID_IMAGE: &str = "I couldn't read that image. 🤔 Please send a JPEG or PNG photo.";
pub const INVALID_CHOICE: &str = "That option isn't available. Please use the buttons above.";
pub const INCOMPLETE: &str = "Something went wrong with this session. Please send a photo to start over.";

/// Hint for an event the current step does not accept.
pub fn guidance(step: Step) -> &'static str {
    match step {
        Step::Idle => {
            "I'm not sure what to do with that. 🤔\n\n\
             Please send me a **photo** to start generating content, or /cancel to restart."
        }
        Step::AwaitingPlatform => "Please choose a **platform** using the buttons above, or /cancel to restart.",
        Step::AwaitingTone => "Please choose a **tone** using the buttons above, or /cancel to restart.",
        Step::AwaitingServices => {
            "Please toggle the **services** above and press 'Done' when finished, or /cancel to restart."
        }
        Step::AwaitingContext => "Please type your **additional context** or press 'Skip', or /cancel to restart.",
    }
}

pub fn generation_failed(detail: &str) -> String {
    format!("Oh no! I ran into an error: {detail}\n\nPlease send your photo again. /cancel")
}

/// Escapes the characters legacy Telegram Markdown treats as entity markers.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Messages presenting a finished generation, in send order.
///
/// Model output is escaped; the hashtags sit in a code span where only a
/// backtick would end the entity.
pub fn render_result(result: &GenerationResult) -> Vec<String> {
    let mut out: Vec<String> = result
        .captions
        .iter()
        .enumerate()
        .map(|(i, caption)| format!("--- **Option {}** ---\n\n{}", i + 1, escape_markdown(caption)))
        .collect();

    let hashtags = result.hashtags.join(" ").replace('`', "");
    out.push(format!(
        "👇 **Suggested Hashtags** 👇\n`{}`\n\n💡 **AI Image Feedback**\n{}",
        hashtags,
        escape_markdown(&result.feedback)
    ));
    out
}
