use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The label format the expense service uses for months, e.g. `Dec 2025`.
const LABEL_FORMAT: &str = "%b %Y";

/// A calendar month token used to scope queries, e.g. `Dec 2025`.
///
/// The service owns the label format, so the token is kept as the exact text it sent. `first_day`
/// understands both the service's `%b %Y` labels and `YYYY-MM` tokens for ordering purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MonthSelector(String);

impl MonthSelector {
    /// Creates a selector from `label`. Returns `None` for blank text, which means "no month".
    pub fn new(label: impl Into<String>) -> Option<Self> {
        let label = label.into();
        let trimmed = label.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// The service-style label for the month containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.format(LABEL_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The first day of the month this token names, if it is in a recognized format.
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&format!("1 {}", self.0), "%d %b %Y")
            .or_else(|_| NaiveDate::parse_from_str(&format!("{}-01", self.0), "%Y-%m-%d"))
            .ok()
    }

    /// Chronological comparison. Tokens that cannot be parsed sort after every parsable one.
    pub fn chronological(&self, other: &Self) -> Ordering {
        match (self.first_day(), other.first_day()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl Display for MonthSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MonthSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MonthSelector::new(s).ok_or_else(|| "empty month label".to_string())
    }
}

impl<'de> Deserialize<'de> for MonthSelector {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        MonthSelector::new(s).ok_or_else(|| serde::de::Error::custom("empty month label"))
    }
}

/// Deserializes an optional month where `null` and `""` both mean absent.
pub(crate) fn optional<'de, D>(deserializer: D) -> Result<Option<MonthSelector>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.and_then(MonthSelector::new))
}

/// Deserializes a list of months, skipping blank entries.
pub(crate) fn list<'de, D>(deserializer: D) -> Result<Vec<MonthSelector>, D::Error>
where
    D: Deserializer<'de>,
{
    let labels: Option<Vec<Option<String>>> = Option::deserialize(deserializer)?;
    Ok(labels
        .unwrap_or_default()
        .into_iter()
        .flatten()
        .filter_map(MonthSelector::new)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn month(s: &str) -> MonthSelector {
        MonthSelector::new(s).unwrap()
    }

    #[test]
    fn blank_is_absent() {
        assert!(MonthSelector::new("").is_none());
        assert!(MonthSelector::new("   ").is_none());
    }

    #[test]
    fn from_date_uses_service_label() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 14).unwrap();
        assert_eq!(MonthSelector::from_date(date).as_str(), "Dec 2025");
    }

    #[test]
    fn parses_both_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        assert_eq!(month("Dec 2025").first_day(), Some(expected));
        assert_eq!(month("2025-12").first_day(), Some(expected));
        assert_eq!(month("someday").first_day(), None);
    }

    #[test]
    fn chronological_order() {
        assert_eq!(month("Nov 2025").chronological(&month("Dec 2025")), Ordering::Less);
        assert_eq!(month("Jan 2026").chronological(&month("Dec 2025")), Ordering::Greater);
        assert_eq!(month("2025-12").chronological(&month("Dec 2025")), Ordering::Equal);
        assert_eq!(month("someday").chronological(&month("Dec 2025")), Ordering::Greater);
    }

    #[derive(Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "optional")]
        month: Option<MonthSelector>,
        #[serde(default, deserialize_with = "list")]
        months: Vec<MonthSelector>,
    }

    #[test]
    fn wire_blank_and_null_are_absent() {
        let h: Holder = serde_json::from_str(r#"{"month": "", "months": ["Dec 2025", "", null]}"#)
            .unwrap();
        assert!(h.month.is_none());
        assert_eq!(h.months, vec![month("Dec 2025")]);

        let h: Holder = serde_json::from_str(r#"{"month": null}"#).unwrap();
        assert!(h.month.is_none());
        assert!(h.months.is_empty());
    }
}
