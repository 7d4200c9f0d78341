//! Extraction of numbers and candidate entities

use regex::Regex;
use serde_json::Value;

/// Compiled extraction patterns
pub struct Extractor {
    number_regex: Regex,
    name_regex: Regex,
    email_regex: Regex,
}

impl Extractor {
    pub fn new() -> Result<Self, regex::Error> {
        // Integers and decimals; '.' and ',' both act as the decimal separator
        let number_regex = Regex::new(r"\b[0-9]+(?:[.,][0-9]+)?\b")?;

        // Runs of capitalized words, French accents allowed in the tail
        let name_regex = Regex::new(
            r"\b[A-Z][a-zàéèêëïîôùûç]+(?:\s+[A-Z][a-zàéèêëïîôùûç]+)*\b",
        )?;

        let email_regex = Regex::new(r"\b[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}\b")?;

        Ok(Self {
            number_regex,
            name_regex,
            email_regex,
        })
    }

    /// Every numeric literal in `text`, in order of appearance
    pub fn numbers(&self, text: &str) -> Vec<f64> {
        self.number_regex
            .find_iter(text)
            .filter_map(|m| m.as_str().replacen(',', ".", 1).parse::<f64>().ok())
            .collect()
    }

    /// Capitalized word runs followed by email addresses
    pub fn entities(&self, text: &str) -> Vec<String> {
        self.name_regex
            .find_iter(text)
            .chain(self.email_regex.find_iter(text))
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

/// Numeric leaves of the tool results, walking objects and arrays
pub fn data_numbers(results: &[Value]) -> Vec<f64> {
    fn walk(value: &Value, out: &mut Vec<f64>) {
        match value {
            Value::Number(n) => {
                if let Some(f) = n.as_f64() {
                    out.push(f);
                }
            }
            Value::Array(items) => items.iter().for_each(|v| walk(v, out)),
            Value::Object(map) => map.values().for_each(|v| walk(v, out)),
            _ => {}
        }
    }

    let mut out = Vec::new();
    for result in results {
        walk(result, &mut out);
    }
    out
}

/// The tool results serialized as one lowercase string
pub fn searchable_text(results: &[Value]) -> String {
    serde_json::to_string(results)
        .unwrap_or_default()
        .to_lowercase()
}
