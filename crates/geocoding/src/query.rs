use std::sync::OnceLock;

use regex::Regex;

/// What the user typed into the search box, split into street and an
/// optional trailing house number ("Rua ABC, 123" or "Rua ABC 123").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub street: String,
    pub house_number: Option<String>,
}

fn house_number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[,\s]+(\d+)\s*$").unwrap())
}

impl SearchQuery {
    /// `None` for blank input.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let Some(caps) = house_number_pattern().captures(text) else {
            return Some(Self {
                street: text.to_string(),
                house_number: None,
            });
        };
        let (Some(whole), Some(number)) = (caps.get(0), caps.get(1)) else {
            return None;
        };
        Some(Self {
            street: text[..whole.start()].trim().to_string(),
            house_number: Some(number.as_str().to_string()),
        })
    }

    /// Free-form street parameter: number first, then the street name.
    pub fn street_param(&self) -> String {
        match &self.house_number {
            Some(n) => format!("{n} {}", self.street).trim().to_string(),
            None => self.street.clone(),
        }
    }
}
