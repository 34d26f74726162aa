use crate::domain::models::PresetPrompt;

pub const PRESET_PROMPTS: [PresetPrompt; 4] = [
    PresetPrompt {
        key: "code-review",
        name: "Code Review",
        prompt: "You are a senior software engineer reviewing code. Point out bugs, \
                 unclear naming, missing error handling and risky changes. Be specific \
                 and reference file names.",
    },
    PresetPrompt {
        key: "refactor",
        name: "Refactor",
        prompt: "You are an expert at refactoring. Improve the structure and readability \
                 of the included code without changing its behavior. Show the full \
                 updated files.",
    },
    PresetPrompt {
        key: "explain",
        name: "Explain",
        prompt: "Explain how the included code works. Start with a high-level overview, \
                 then walk through the important functions and how they interact.",
    },
    PresetPrompt {
        key: "debug",
        name: "Debug",
        prompt: "Help find the root cause of a bug in the included code. Ask for missing \
                 information if needed and propose a minimal fix.",
    },
];

pub fn find_preset(key: &str) -> Option<&'static PresetPrompt> {
    PRESET_PROMPTS
        .iter()
        .find(|p| p.key.eq_ignore_ascii_case(key))
}
