//! Form field detection
//!
//! Heuristic classifier that turns recognized text into candidate form fields.
//! Each line is run through an ordered list of label patterns (`Label:`,
//! `Label [___]`, `Label .....`, ...). Accepted labels are cleaned, filtered
//! against structural phrases and deduplicated case-insensitively, then paired
//! with any value found after the first colon.
//!
//! This is a text-pattern matcher, not layout analysis: garbled OCR output
//! simply yields fewer fields.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

use super::field::FormField;
use crate::vision::OcrWord;

/// Minimum label length in characters
pub const MIN_LABEL_LEN: usize = 2;
/// Maximum label length in characters
pub const MAX_LABEL_LEN: usize = 60;
/// Vertical offset from a label word to its fill position
const FILL_OFFSET_Y: f32 = 20.0;

/// Line shapes recognized as a field boundary, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPattern {
    /// `Label: ____` or `Label: [ ]`
    BlankAfterColon,
    /// `Label |___|`, `Label [___]`, `Label (...)`
    BracketedBlank,
    /// `Label:`
    TrailingColon,
    /// `Label ______` or `Label ......`
    Leader,
    /// `Label (    )`
    ParenthesizedGroup,
    /// `Label [    ]`
    BracketedGroup,
    /// `Label: value`
    InlineValue,
}

impl FieldPattern {
    /// All patterns in the order they are tried
    pub const ALL: [FieldPattern; 7] = [
        FieldPattern::BlankAfterColon,
        FieldPattern::BracketedBlank,
        FieldPattern::TrailingColon,
        FieldPattern::Leader,
        FieldPattern::ParenthesizedGroup,
        FieldPattern::BracketedGroup,
        FieldPattern::InlineValue,
    ];

    fn regex(&self) -> &'static Regex {
        match self {
            FieldPattern::BlankAfterColon => &BLANK_AFTER_COLON,
            FieldPattern::BracketedBlank => &BRACKETED_BLANK,
            FieldPattern::TrailingColon => &TRAILING_COLON,
            FieldPattern::Leader => &LEADER,
            FieldPattern::ParenthesizedGroup => &PARENTHESIZED_GROUP,
            FieldPattern::BracketedGroup => &BRACKETED_GROUP,
            FieldPattern::InlineValue => &INLINE_VALUE,
        }
    }

    /// Raw label captured from `line`, if this pattern matches
    pub fn capture<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.regex()
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

static BLANK_AFTER_COLON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^:]+?):\s*[_\s\[\]().]*$").unwrap());
static BRACKETED_BLANK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^:]+?)\s*[|\[(][\s_.]+[\]|)]").unwrap());
static TRAILING_COLON: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([^:]+?):\s*$").unwrap());
static LEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([^:]+?)\s+[_.]{3,}").unwrap());
static PARENTHESIZED_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^:]+?)\s*\([^)]*\)\s*$").unwrap());
static BRACKETED_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^:]+?)\s*\[[^\]]*\]\s*$").unwrap());
static INLINE_VALUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([^:]+?):\s*\S").unwrap());

static TRAILING_SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[:|\[\]().]+$").unwrap());
static LEADING_BULLETS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[_\-*]+").unwrap());
static PLACEHOLDER_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[_\s\[\]().]+$").unwrap());
static TRAILING_PLACEHOLDERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[_\[\]().]+$").unwrap());

/// Structural or instructional text that is never a field
static DENYLIST: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)^(page|section|form|application|document|title|heading)").unwrap(),
        Regex::new(r"(?i)^(instructions?|note|please|important|attention)").unwrap(),
        Regex::new(r"^\d+\.?\s").unwrap(),
    ]
});

/// Common personal-data labels that stand alone on a line
static STANDALONE_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(name|address|city|state|country|zip|postal|phone|mobile|email|date|age|gender|occupation|income|signature)$",
    )
    .unwrap()
});

/// Detect candidate form fields in recognized text.
///
/// `words` are optional OCR word boxes used to place filled values back on
/// the image. Output order is detection order: labeled lines first, then
/// standalone dictionary labels. When no labeled line is found, every
/// `label: value` line is taken as-is (before the dictionary pass) so the
/// user still has something to review.
pub fn detect_fields(text: &str, words: Option<&[OcrWord]>) -> Vec<FormField> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let mut seen = HashSet::new();
    let mut fields = Vec::new();

    for line in &lines {
        for pattern in FieldPattern::ALL {
            let Some(raw) = pattern.capture(line) else {
                continue;
            };

            let label = clean_label(raw);
            if !is_valid_label(&label) || seen.contains(&label.to_lowercase()) {
                continue;
            }

            let value = extract_value(line);
            let position = words.and_then(|w| locate_label(&label, w));

            debug!("{:?} matched {:?} (value: {:?})", pattern, label, value);
            seen.insert(label.to_lowercase());
            fields.push(FormField::new(label, value).with_position(position));
        }
    }

    if fields.is_empty() {
        fields = colon_fallback(&lines);
        seen.extend(fields.iter().map(|f| f.label.to_lowercase()));
        if !fields.is_empty() {
            debug!("No labeled fields found, colon fallback produced {}", fields.len());
        }
    }

    for line in &lines {
        if STANDALONE_LABEL.is_match(line) && seen.insert(line.to_lowercase()) {
            fields.push(FormField::new(*line, ""));
        }
    }

    fields
}

/// Trim separators and bullet markers from a captured label
fn clean_label(raw: &str) -> String {
    let label = TRAILING_SEPARATORS.replace(raw.trim(), "");
    let label = LEADING_BULLETS.replace(label.trim(), "");
    label.trim().to_string()
}

fn is_valid_label(label: &str) -> bool {
    let len = label.chars().count();
    (MIN_LABEL_LEN..=MAX_LABEL_LEN).contains(&len) && !DENYLIST.iter().any(|p| p.is_match(label))
}

/// Value written after the first colon, or empty if only placeholders follow
fn extract_value(line: &str) -> String {
    let Some((_, after)) = line.split_once(':') else {
        return String::new();
    };

    let after = after.trim();
    if after.is_empty() || PLACEHOLDER_ONLY.is_match(after) {
        return String::new();
    }

    TRAILING_PLACEHOLDERS.replace(after, "").trim().to_string()
}

/// Fill position just past the bottom-right corner of the first word
/// overlapping any label token
fn locate_label(label: &str, words: &[OcrWord]) -> Option<(f32, f32)> {
    let tokens: Vec<String> = label.split_whitespace().map(str::to_lowercase).collect();

    words
        .iter()
        .find(|word| {
            let text = word.text.to_lowercase();
            tokens.iter().any(|token| text.contains(token.as_str()))
        })
        .map(|word| (word.bbox.x1, word.bbox.y1 + FILL_OFFSET_Y))
}

/// Every `label: value` line, ignoring the denylist
fn colon_fallback(lines: &[&str]) -> Vec<FormField> {
    let mut seen = HashSet::new();

    lines
        .iter()
        .filter_map(|line| line.split_once(':'))
        .filter_map(|(label, value)| {
            let label: String = label.trim().chars().take(MAX_LABEL_LEN).collect();
            let label = label.trim_end().to_string();
            if label.chars().count() < MIN_LABEL_LEN || !seen.insert(label.to_lowercase()) {
                return None;
            }
            Some(FormField::new(label, value.trim()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::BoundingBox;

    fn word(text: &str, x: f32, y: f32) -> OcrWord {
        OcrWord {
            text: text.to_string(),
            bbox: BoundingBox::from_ltwh(x, y, 40.0, 12.0),
            confidence: 90.0,
        }
    }

    fn labels(fields: &[FormField]) -> Vec<&str> {
        fields.iter().map(|f| f.label.as_str()).collect()
    }

    #[test]
    fn test_mixed_form_in_scan_order() {
        let fields = detect_fields("Name: \nAge: 25\nSignature", None);

        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0], FormField::new("Name", ""));
        assert!(fields[0].required);
        assert_eq!(fields[1].label, "Age");
        assert_eq!(fields[1].value, "25");
        assert!(!fields[1].required);
        assert_eq!(fields[2].label, "Signature");
        assert!(fields[2].required);
        assert!(fields.iter().all(|f| f.position().is_none()));
    }

    #[test]
    fn test_placeholder_shapes() {
        let text = "Full name: ________\n\
                    Father's name [______]\n\
                    Mobile number (....)\n\
                    Occupation ..........\n\
                    Nationality (   )\n\
                    Blood group [   ]";
        let fields = detect_fields(text, None);

        assert_eq!(
            labels(&fields),
            vec!["Full name", "Father's name", "Mobile number", "Occupation", "Nationality", "Blood group"]
        );
        assert!(fields.iter().all(|f| f.required && f.value.is_empty()));
    }

    #[test]
    fn test_value_strips_trailing_placeholders() {
        let fields = detect_fields("Amount: 1500__\nCity: Pune.", None);
        assert_eq!(fields[0].value, "1500");
        assert_eq!(fields[1].value, "Pune");
    }

    #[test]
    fn test_label_cleanup() {
        let fields = detect_fields("- Email address: [ ]\n**District: ____", None);
        assert_eq!(labels(&fields), vec!["Email address", "District"]);
    }

    #[test]
    fn test_lowercase_label_is_capitalized() {
        let fields = detect_fields("date of birth: ____", None);
        assert_eq!(fields[0].label, "Date of birth");
    }

    #[test]
    fn test_denylisted_labels_rejected() {
        let text = "Page 1 of 2 ______\n\
                    Section A: Personal\n\
                    Instructions: read carefully\n\
                    Please sign below ____\n\
                    1. Applicant name: ____\n\
                    Surname: ____";
        let fields = detect_fields(text, None);
        assert_eq!(labels(&fields), vec!["Surname"]);
    }

    #[test]
    fn test_duplicate_labels_suppressed_case_insensitively() {
        let fields = detect_fields("Name: ____\nNAME: John\nname", None);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].label, "Name");
        assert!(fields[0].required);
    }

    #[test]
    fn test_label_length_bounds() {
        let long = "x".repeat(61);
        let text = format!("A: ____\n{}: ____\nOk: ____", long);
        let fields = detect_fields(&text, None);
        assert_eq!(labels(&fields), vec!["Ok"]);
    }

    #[test]
    fn test_capitalized_labels_stay_within_bounds() {
        let label = format!("\u{00df}{}", "a".repeat(59));
        let text = format!("{}: ____\n{}: kept", label, "\u{00df}b".repeat(30));
        let fields = detect_fields(&text, None);
        assert_eq!(fields[0].label, label);
        assert_eq!(fields[0].label.chars().count(), MAX_LABEL_LEN);

        let fallback = detect_fields(&format!("{}: x", "\u{00df}".repeat(70)), None);
        assert_eq!(fallback[0].label.chars().count(), MAX_LABEL_LEN);
    }

    #[test]
    fn test_standalone_labels_follow_labeled_fields() {
        let fields = detect_fields("email\nPhone: 555-0100\nGender", None);
        assert_eq!(labels(&fields), vec!["Phone", "Email", "Gender"]);
        assert!(!fields[0].required);
        assert!(fields[1].required && fields[2].required);
    }

    #[test]
    fn test_position_from_word_boxes() {
        let words = vec![word("Applicant", 5.0, 5.0), word("Phone:", 40.0, 100.0)];
        let fields = detect_fields("Phone: ____\nWebsite: ____", Some(&words));

        assert_eq!(fields[0].position(), Some((80.0, 132.0)));
        assert_eq!(fields[1].position(), None);
    }

    #[test]
    fn test_position_clears_tall_label_box() {
        let words = vec![OcrWord {
            text: "Address".to_string(),
            bbox: BoundingBox::from_ltwh(40.0, 100.0, 90.0, 30.0),
            confidence: 88.0,
        }];
        let fields = detect_fields("Address: ____", Some(&words));

        let (x, y) = fields[0].position().unwrap();
        assert_eq!((x, y), (130.0, 150.0));
        assert!(y > words[0].bbox.y1);
    }

    #[test]
    fn test_position_takes_first_overlapping_word() {
        let words = vec![word("Nameplate", 1.0, 2.0), word("Name:", 50.0, 60.0)];
        let fields = detect_fields("Name: ____", Some(&words));
        assert_eq!(fields[0].position(), Some((41.0, 34.0)));
    }

    #[test]
    fn test_colon_fallback_when_nothing_matches() {
        let fields = detect_fields("Page: 3\nNote: keep a copy\nTitle of form", None);
        assert_eq!(labels(&fields), vec!["Page", "Note"]);
        assert_eq!(fields[0].value, "3");
        assert_eq!(fields[1].value, "keep a copy");
        assert!(fields.iter().all(|f| !f.required));
    }

    #[test]
    fn test_colon_fallback_runs_alongside_standalone_labels() {
        let fields = detect_fields("Signature\nPage: 3\nNote: keep", None);
        assert_eq!(labels(&fields), vec!["Page", "Note", "Signature"]);
        assert_eq!(fields[0].value, "3");
        assert!(fields[2].required);
    }

    #[test]
    fn test_no_colons_and_no_patterns_is_empty() {
        assert!(detect_fields("Welcome to the office\nThank you", None).is_empty());
        assert!(detect_fields("", None).is_empty());
        assert!(detect_fields("\n  \n\t", None).is_empty());
    }

    #[test]
    fn test_required_iff_value_empty() {
        let text = "Name: Asha\nAge:\nCity [___]\nState: ____\nPhone: 98765";
        for field in detect_fields(text, None) {
            assert_eq!(field.required, field.value.is_empty(), "{:?}", field);
        }
    }

    #[test]
    fn test_detection_is_deterministic() {
        let text = "Name: \nAge: 25\nAddress ______\nSignature\ncity";
        let words = vec![word("Address", 10.0, 200.0)];
        assert_eq!(detect_fields(text, Some(&words)), detect_fields(text, Some(&words)));
    }

    #[test]
    fn test_labels_bounded_and_unique_on_noisy_input() {
        let text = "::::\n:value\nx: y\n[](){}\n__ : __\nName:Name:Name\n Name : again\n\u{00e9}tat civil: ____";
        let fields = detect_fields(text, None);

        let mut seen = HashSet::new();
        for field in &fields {
            let len = field.label.chars().count();
            assert!((MIN_LABEL_LEN..=MAX_LABEL_LEN).contains(&len), "{:?}", field);
            assert!(seen.insert(field.label.to_lowercase()), "duplicate {:?}", field);
        }
    }

    #[test]
    fn test_pattern_capture() {
        assert_eq!(FieldPattern::TrailingColon.capture("Name:"), Some("Name"));
        assert_eq!(FieldPattern::Leader.capture("Name ....."), Some("Name"));
        assert_eq!(FieldPattern::InlineValue.capture("Age: 25"), Some("Age"));
        assert_eq!(FieldPattern::InlineValue.capture("Age:"), None);
        assert_eq!(FieldPattern::BracketedBlank.capture("Age: [__]"), None);
    }
}
