const MAX_SUGGESTIONS: usize = 3;

const SUGGESTION_RULES: [(&str, &str); 5] = [
    ("constraints", "Add bullet points for constraints"),
    ("example", "Provide concrete examples"),
    ("context", "Add more context about the problem"),
    ("steps", "Break down into clear steps"),
    ("format", "Specify desired output format"),
];

pub fn suggest(prompt_text: &str) -> Vec<String> {
    let lower = prompt_text.to_lowercase();

    SUGGESTION_RULES
        .iter()
        .filter(|(keyword, _)| !lower.contains(keyword))
        .map(|(_, suggestion)| suggestion.to_string())
        .take(MAX_SUGGESTIONS)
        .collect()
}
