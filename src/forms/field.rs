//! Form field model shared by detection, the fill session and export

use serde::{Deserialize, Serialize};

/// One detected or user-entered blank on a scanned form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    /// Human-readable field name, capitalized
    pub label: String,
    /// Current value (empty = unset)
    pub value: String,
    /// True when no value was found in the source text
    pub required: bool,
    /// Suggested fill position (x) on the source image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    /// Suggested fill position (y) on the source image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
}

impl FormField {
    /// Create a field from a label and its extracted value.
    ///
    /// The field is required exactly when `value` is empty.
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: capitalize(&label.into()),
            required: value.is_empty(),
            value,
            x: None,
            y: None,
        }
    }

    /// Attach a fill position
    pub fn with_position(mut self, position: Option<(f32, f32)>) -> Self {
        if let Some((x, y)) = position {
            self.x = Some(x);
            self.y = Some(y);
        }
        self
    }

    /// Recorded fill position, if both coordinates are known
    pub fn position(&self) -> Option<(f32, f32)> {
        match (self.x, self.y) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        }
    }

    /// Whether this field blocks submission
    pub fn is_missing(&self) -> bool {
        self.required && self.value.is_empty()
    }
}

/// Uppercase the first character, leave the rest untouched.
///
/// Characters whose uppercase form is longer than one char (`ß` -> `SS`) are
/// kept, so capitalizing never changes the label length.
pub fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };

    let mut upper = first.to_uppercase();
    let first = match (upper.next(), upper.next()) {
        (Some(single), None) => single,
        _ => first,
    };
    std::iter::once(first).chain(chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_follows_value() {
        assert!(FormField::new("name", "").required);
        assert!(!FormField::new("age", "25").required);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("date of birth"), "Date of birth");
        assert_eq!(capitalize("éclair"), "Éclair");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_capitalize_keeps_expanding_characters() {
        assert_eq!(capitalize("ßtraße"), "ßtraße");
        assert_eq!(capitalize("ŉ value").chars().count(), 7);
    }

    #[test]
    fn test_position_needs_both_coordinates() {
        let field = FormField::new("Name", "").with_position(Some((10.0, 30.0)));
        assert_eq!(field.position(), Some((10.0, 30.0)));

        let mut partial = FormField::new("Name", "");
        partial.x = Some(5.0);
        assert_eq!(partial.position(), None);
    }

    #[test]
    fn test_missing_only_when_required_and_empty() {
        let mut field = FormField::new("Phone", "");
        assert!(field.is_missing());
        field.value = "555-0100".to_string();
        assert!(!field.is_missing());
    }

    #[test]
    fn test_serialization_skips_absent_position() {
        let json = serde_json::to_string(&FormField::new("Age", "25")).unwrap();
        assert!(!json.contains("\"x\""));
        let parsed: FormField = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.value, "25");
    }
}
