//! Message templates for each generative task.
//!
//! Every task asks for a single JSON object so the answer can be parsed into the
//! task's fixed result type.

use super::{AudienceLevel, CorrectionInput};
use crate::provider::ChatMessage;

/// Scene skeleton every generated artifact should follow.
pub const SCENE_SKELETON: &str = include_str!("../../templates/scene_skeleton.py");

/// Complete scene shown to the model as a worked example.
pub const REFERENCE_EXAMPLE: &str = include_str!("../../templates/reference_example.py");

const DURATION_INSTRUCTION: &str =
    "The video should be 1-2 minutes long, so focus on the most important aspects of the concept.";

const SCENE_RULES: &str = "\
Rules the code must follow:
- Start with `from manim import *` and `from leap.templates.base_scene import ManimVoiceoverBase`.
- Define exactly one scene class deriving from ManimVoiceoverBase with a `def construct(self):` method.
- Wrap every animation in `with self.voiceover(text=\"...\") as tracker:` blocks.
- Use MathTex for mathematical notation, never Tex.
- Use color constants (BLUE, RED) rather than quoted color names.
- Never create a background; the base scene provides one. Never call self.clear(); use self.fade_out_scene().
- Use Create instead of ShowCreation.";

/// A (system, user) message pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

impl PromptPair {
    pub fn into_messages(self) -> Vec<ChatMessage> {
        vec![ChatMessage::system(self.system), ChatMessage::user(self.user)]
    }
}

pub fn level_instruction(level: AudienceLevel) -> &'static str {
    match level {
        AudienceLevel::Simplified => {
            "Explain this concept as if to a 5 year old. Use very simple words, fun stories and \
             colorful examples. Compare ideas to things children know, like toys, animals or family activities."
        }
        AudienceLevel::Standard => {
            "Explain this concept at a high school or early college level. Use appropriate \
             terminology but keep it accessible."
        }
        AudienceLevel::Advanced => {
            "Explain this concept at an advanced level. Use precise terminology and go into technical details."
        }
    }
}

pub fn classification(prompt: &str) -> PromptPair {
    PromptPair {
        system: "You evaluate whether a user's input is suitable for generating an educational \
                 animation. Answer with a single JSON object."
            .to_string(),
        user: format!(
            "User input: \"{prompt}\"\n\n\
             Classify the input as one of:\n\
             - VALID: a clear, specific question or topic that can be visually explained\n\
             - NEEDS_CLARIFICATION: potentially valid but vague or ambiguous\n\
             - INVALID: offensive, impossible to animate, or not a question or topic\n\n\
             Always provide a clearer reformulation that keeps the original intent. For \
             NEEDS_CLARIFICATION or INVALID, also give a positive suggestion with one or two \
             better ways to ask.\n\n\
             JSON fields: \"classification\" (\"VALID\" | \"NEEDS_CLARIFICATION\" | \"INVALID\"), \
             \"explanation\" (string), \"suggestion\" (string or null), \
             \"reformulated_question\" (string)."
        ),
    }
}

pub fn planning(prompt: &str, level: AudienceLevel) -> PromptPair {
    PromptPair {
        system: format!(
            "You are a manim expert and a great teacher. Plan an animation video that explains \
             the concept in 4-5 scenes: introduction, step-by-step explanation, practical example \
             and summary. For each scene give the visual elements, exact narration text, \
             transitions and color notes.\n\n{}\n\n{}\n\n\
             Answer with a JSON object with fields \"plan\" (string) and \"reasoning\" (string or null).",
            level_instruction(level),
            DURATION_INSTRUCTION
        ),
        user: prompt.to_string(),
    }
}

pub fn generation(prompt: &str, plan: &str, level: AudienceLevel) -> PromptPair {
    PromptPair {
        system: format!(
            "You write complete, runnable manim scene code from an animation plan.\n\n{}\n\n{}\n\n{}\n\n\
             Follow this skeleton:\n```python\n{}```\n\n\
             Here is a complete example of a good scene:\n```python\n{}```\n\n\
             Answer with a JSON object with fields \"code\" (string, the whole file) and \
             \"explanation\" (string or null).",
            level_instruction(level),
            DURATION_INSTRUCTION,
            SCENE_RULES,
            SCENE_SKELETON,
            REFERENCE_EXAMPLE
        ),
        user: format!("Topic: {prompt}\n\nPlan:\n{plan}"),
    }
}

pub fn correction(input: &CorrectionInput<'_>) -> PromptPair {
    PromptPair {
        system: format!(
            "You fix manim scene code that failed validation or rendering. Return the whole \
             corrected file, not a patch.\n\n{}\n\n{}\n\n\
             Answer with a JSON object with fields \"code\" (string, the whole file), \
             \"explanation\" (string or null) and \"error_fixes\" (list of strings).",
            level_instruction(input.level),
            SCENE_RULES
        ),
        user: format!(
            "Topic: {}\n\nPlan:\n{}\n\nCorrection attempt {}.\n\nError:\n{}\n\nCode:\n```python\n{}\n```",
            input.prompt, input.plan, input.attempt, input.failure, input.artifact
        ),
    }
}
