use serde::Serialize;

/// Sidebar presets: key, label, symptom text.
pub const EXAMPLES: &[(&str, &str, &str)] = &[
    ("sore-throat", "Sore throat", "sore throat, mild fever for 2 days"),
    (
        "cough-fever",
        "Cough & fever",
        "persistent dry cough, fever 38.5C, 4 days",
    ),
    ("headache", "Headache", "severe headache, nausea, blurred vision"),
];

pub const QUICK_TIPS: &[&str] = &[
    "Include duration and severity",
    "Note existing conditions or medications",
    "Short, comma-separated items work best",
];

pub const MAX_AGE: u32 = 120;

#[derive(Debug, Clone, Serialize)]
pub struct ExampleView {
    pub key: &'static str,
    pub label: &'static str,
}

pub fn example_views() -> Vec<ExampleView> {
    EXAMPLES
        .iter()
        .map(|&(key, label, _)| ExampleView { key, label })
        .collect()
}

pub fn example_text(key: &str) -> Option<&'static str> {
    EXAMPLES
        .iter()
        .find(|(k, _, _)| *k == key)
        .map(|(_, _, text)| *text)
}

/// Folds the optional modifiers into the free text sent for diagnosis.
/// An age of zero counts as not given.
pub fn compose_query(symptoms: &str, age: u32, chronic: &str) -> String {
    let mut text = symptoms.to_string();
    if age > 0 {
        text.push_str(&format!("; age:{}", age));
    }
    let chronic = chronic.trim();
    if !chronic.is_empty() {
        text.push_str(&format!("; chronic:{}", chronic));
    }
    text
}

/// Lenient age parsing for the form field: blanks and garbage become 0, values clamp to `MAX_AGE`.
pub fn parse_age(raw: &str) -> u32 {
    raw.trim().parse::<u32>().map(|a| a.min(MAX_AGE)).unwrap_or(0)
}

/// Keeps the first `max` characters.
pub fn clip(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
