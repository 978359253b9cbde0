use crate::error::{AppError, Result};
use std::path::Path;

/// Line that separates prompts in a plain-text prompt file.
pub const PROMPT_SEPARATOR: &str = "---";

pub fn load_prompts(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        AppError::InvalidInput(format!("Failed to read prompt file {}: {}", path.display(), e))
    })?;
    parse_prompts(&contents)
}

/// A JSON array of strings, or plain text with prompts separated by `---`
/// lines. Blank prompts are dropped.
pub fn parse_prompts(contents: &str) -> Result<Vec<String>> {
    let trimmed = contents.trim_start();
    let prompts: Vec<String> = if trimmed.starts_with('[') {
        let list: Vec<String> = serde_json::from_str(trimmed)
            .map_err(|e| AppError::InvalidInput(format!("Prompt file is not a JSON string array: {}", e)))?;
        list.into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect()
    } else {
        let mut prompts = Vec::new();
        let mut current = Vec::new();
        for line in contents.lines() {
            if line.trim() == PROMPT_SEPARATOR {
                prompts.push(current.join("\n"));
                current.clear();
            } else {
                current.push(line);
            }
        }
        prompts.push(current.join("\n"));
        prompts
            .into_iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect()
    };

    if prompts.is_empty() {
        return Err(AppError::InvalidInput("No prompts given".into()));
    }
    Ok(prompts)
}
