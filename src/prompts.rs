//! Request builders for the two generation calls

use serde_json::{json, Value};
use std::sync::LazyLock;

use crate::gemini::{Content, GenerateRequest, GenerationConfig, InlineData, Part, SystemInstruction};
use crate::models::ContentBrief;

pub const NO_SERVICES: &str = "our full range of manufacturing services";
pub const NO_CONTEXT: &str = "None provided.";

const CAPTION_INSTRUCTION: &str =
    "Analyze this image and generate the B2B content as requested in the system prompt.";
const FEEDBACK_INSTRUCTION: &str = "What's your feedback on this product photo for B2B marketing?";

const FEEDBACK_SYSTEM_PROMPT: &str = "You are a helpful B2B marketing assistant. Analyze the user's product image and provide a single, concise sentence of constructive feedback for its use on social media. Focus on lighting, angle, or professionalism. Be polite.";

/// Output shape of the structured call.
pub static CAPTION_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "type": "OBJECT",
        "properties": {
            "caption1": { "type": "STRING" },
            "caption2": { "type": "STRING" },
            "caption3": { "type": "STRING" },
            "hashtags": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["caption1", "caption2", "caption3", "hashtags"]
    })
});

pub fn platform_guidance(platform: &str) -> &'static str {
    match platform {
        "Facebook" => "Optimize for Facebook: Engaging, slightly longer, encourage comments. Emojis are good.",
        "Instagram" => "Optimize for Instagram: Visually descriptive, strong hook. 3-5 relevant emojis.",
        "X" => "Optimize for X (Twitter): Concise and punchy (under 280 chars). 2-3 key hashtags.",
        "LinkedIn" => "Optimize for LinkedIn: Professional, formal, focus on business value. Minimal/no emojis.",
        _ => "Optimize for general social media.",
    }
}

pub fn services_phrase(services: &[String]) -> String {
    if services.is_empty() {
        NO_SERVICES.to_string()
    } else {
        services.join(", ")
    }
}

pub fn context_phrase(context: &str) -> &str {
    if context.is_empty() {
        NO_CONTEXT
    } else {
        context
    }
}

pub fn caption_system_prompt(brief: &ContentBrief) -> String {
    format!(
        r#"You are a professional B2B (business-to-business) marketing copywriter for **AR Sourcing Bangladesh (arsourcingbd)**, a high-quality clothing manufacturer. Your task is to analyze the provided image of a clothing product and generate compelling social media content.

**Business Identity:** AR Sourcing Bangladesh (arsourcingbd)
**Target Platform:** {platform} ({guidance})
**Desired Tone:** {tone}
**Services to Highlight:** {services}
**Additional Context:** {context}

**Gold-Standard Example (Use for tone/style):**
---
Custom-Made for Global Brands
At AR Sourcing Bangladesh, we specialize in manufacturing high-quality women’s shorts...
🧵 What We Offer:
✅ Premium fabric & professional stitching
✅ OEM & Private Label production
...
🌍 From Bangladesh to the world...
📩 Partner with us for your next clothing collection.
#ApparelManufacturer ... #ARsourcingBangladesh ...
---

**Your Task:**
Based on all the above, generate a JSON object with three (3) unique captions and a list of 15 relevant hashtags.
- The captions must follow the style of the example, be tailored to the product image, and incorporate the specified platform, tone, and services.
- Mention "AR Sourcing Bangladesh" or "arsourcingbd" in the captions.
- The hashtags should be a mix of general (#ApparelManufacturer), specific (#WomensShorts), and branded (#ARsourcingBangladesh).
"#,
        platform = brief.platform,
        guidance = platform_guidance(&brief.platform),
        tone = brief.tone,
        services = services_phrase(&brief.services),
        context = context_phrase(&brief.context),
    )
}

fn user_content(instruction: &str, image: &InlineData) -> Vec<Content> {
    vec![Content {
        role: Some("user".to_string()),
        parts: vec![
            Part::text(instruction),
            Part::Inline {
                inline_data: image.clone(),
            },
        ],
    }]
}

/// Captions + hashtags, constrained to [`CAPTION_SCHEMA`].
pub fn caption_request(brief: &ContentBrief, image: &InlineData) -> GenerateRequest {
    GenerateRequest {
        contents: user_content(CAPTION_INSTRUCTION, image),
        system_instruction: SystemInstruction {
            parts: vec![Part::text(caption_system_prompt(brief))],
        },
        generation_config: Some(GenerationConfig {
            response_mime_type: "application/json",
            response_schema: &CAPTION_SCHEMA,
        }),
    }
}

pub fn feedback_request(image: &InlineData) -> GenerateRequest {
    GenerateRequest {
        contents: user_content(FEEDBACK_INSTRUCTION, image),
        system_instruction: SystemInstruction {
            parts: vec![Part::text(FEEDBACK_SYSTEM_PROMPT)],
        },
        generation_config: None,
    }
}
