use crate::domain::models::SelectedFile;

/// Rough token estimate for free text: one token per four characters, rounded up.
pub fn estimate_text_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

pub fn estimate_tokens(files: &[SelectedFile], system_prompt: &str, main_prompt: &str) -> usize {
    let file_tokens: usize = files.iter().map(|f| f.token_count.unwrap_or(0)).sum();
    file_tokens + estimate_text_tokens(system_prompt) + estimate_text_tokens(main_prompt)
}

pub fn format_token_count(count: usize) -> String {
    match count {
        0 => "~0".to_string(),
        1..=99 => format!("~{}", count),
        100..=999 => format!("~{}", ((count as f64 / 10.0).round() as usize) * 10),
        _ => format!("~{:.1}k", (count as f64 / 100.0).round() / 10.0),
    }
}
