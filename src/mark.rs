use serde::{Serialize, Serializer};
use std::fmt;

/// Literal the API uses for a participant who was not given a mark.
pub const NOT_ASSESSED: &str = "Not Assessed";

/// Denominator implied by a percentage mark.
pub const PERCENT_OUT_OF: &str = "100";

const PERCENT_SUFFIX: &str = " %";
const FRACTION_SEPARATOR: &str = " / ";

/// A participant's mark, parsed once from the display string the API sends.
///
/// The API encodes every mark as text in one of three forms:
/// - `"43 / 55"` for a raw score out of a total,
/// - `"86.42 %"` for a percentage,
/// - `"Not Assessed"` when the student was not marked.
///
/// The achieved and total figures are kept as upstream text so that exported
/// figures match the source byte for byte. `Display` rebuilds the canonical
/// form: a third fraction segment, or text after the percent sign, is not
/// reproduced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Mark {
    Fraction { achieved: String, total: String },
    Percentage { value: String },
    NotAssessed,
    /// Any other text; formatters skip these rows.
    Unrecognised(String),
}

impl Mark {
    /// Parses a display mark. Percentage wins over fraction when both
    /// separators appear.
    pub fn parse(text: &str) -> Mark {
        if let Some((value, _)) = text.split_once(PERCENT_SUFFIX) {
            return Mark::Percentage {
                value: value.to_string(),
            };
        }
        if let Some((achieved, rest)) = text.split_once(FRACTION_SEPARATOR) {
            // "a / b / c" keeps only the second segment as the total
            let total = rest.split(FRACTION_SEPARATOR).next().unwrap_or(rest);
            return Mark::Fraction {
                achieved: achieved.to_string(),
                total: total.to_string(),
            };
        }
        if text == NOT_ASSESSED {
            return Mark::NotAssessed;
        }
        Mark::Unrecognised(text.to_string())
    }

    /// The score the student achieved, for scored marks.
    pub fn achieved(&self) -> Option<&str> {
        match self {
            Mark::Fraction { achieved, .. } => Some(achieved),
            Mark::Percentage { value } => Some(value),
            Mark::NotAssessed | Mark::Unrecognised(_) => None,
        }
    }

    /// What the mark is out of: the fraction's total, or 100 for percentages.
    pub fn out_of(&self) -> Option<&str> {
        match self {
            Mark::Fraction { total, .. } => Some(total),
            Mark::Percentage { .. } => Some(PERCENT_OUT_OF),
            Mark::NotAssessed | Mark::Unrecognised(_) => None,
        }
    }

    pub fn is_scored(&self) -> bool {
        matches!(self, Mark::Fraction { .. } | Mark::Percentage { .. })
    }
}

impl Default for Mark {
    fn default() -> Self {
        Mark::NotAssessed
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mark::Fraction { achieved, total } => {
                write!(f, "{}{}{}", achieved, FRACTION_SEPARATOR, total)
            }
            Mark::Percentage { value } => write!(f, "{}{}", value, PERCENT_SUFFIX),
            Mark::NotAssessed => f.write_str(NOT_ASSESSED),
            Mark::Unrecognised(text) => f.write_str(text),
        }
    }
}

// Serialized in the upstream display form so a dumped model reads like the API.
impl Serialize for Mark {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_splits_on_separator() {
        let mark = Mark::parse("43 / 55");
        assert_eq!(mark.achieved(), Some("43"));
        assert_eq!(mark.out_of(), Some("55"));
        assert!(mark.is_scored());
    }

    #[test]
    fn percentage_is_out_of_one_hundred() {
        let mark = Mark::parse("86.42 %");
        assert_eq!(mark.achieved(), Some("86.42"));
        assert_eq!(mark.out_of(), Some("100"));
    }

    #[test]
    fn not_assessed_has_no_score() {
        let mark = Mark::parse("Not Assessed");
        assert_eq!(mark, Mark::NotAssessed);
        assert_eq!(mark.achieved(), None);
        assert_eq!(mark.out_of(), None);
        assert!(!mark.is_scored());
    }

    #[test]
    fn other_text_is_unrecognised() {
        assert_eq!(Mark::parse("A+"), Mark::Unrecognised("A+".to_string()));
        assert_eq!(Mark::parse(""), Mark::Unrecognised(String::new()));
        // no spaces around the slash is not the fraction encoding
        assert!(!Mark::parse("43/55").is_scored());
    }

    #[test]
    fn display_matches_upstream_text() {
        for text in ["43 / 55", "86.42 %", "Not Assessed", "Excellent"] {
            assert_eq!(Mark::parse(text).to_string(), text);
        }
    }

    #[test]
    fn display_drops_trailing_segments() {
        assert_eq!(Mark::parse("a / b / c").to_string(), "a / b");
        assert_eq!(Mark::parse("86 % extra").to_string(), "86 %");
    }

    #[test]
    fn serializes_as_display_string() {
        let json = serde_json::to_string(&Mark::parse("7 / 10")).unwrap();
        assert_eq!(json, "\"7 / 10\"");
    }
}
