// Interactive collection of the run parameters.
use crate::decode::Mode;
use crate::error::{ExportError, Result};
use chrono::NaiveDate;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};
use std::ops::RangeInclusive;

pub const YEAR_GROUPS: RangeInclusive<u32> = 7..=13;

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ExportError::InvalidDate(value.to_string()))
}

/// Parses both ends of a date range; the start must be strictly earlier.
pub fn parse_date_range(start: &str, end: &str) -> Result<(NaiveDate, NaiveDate)> {
    let start_date = parse_date(start)?;
    let end_date = parse_date(end)?;
    if start_date >= end_date {
        return Err(ExportError::InvalidDateRange {
            start: start_date.to_string(),
            end: end_date.to_string(),
        });
    }
    Ok((start_date, end_date))
}

pub fn parse_year_group(value: &str) -> Result<u32> {
    value
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|year| YEAR_GROUPS.contains(year))
        .ok_or_else(|| ExportError::InvalidYearGroup(value.to_string()))
}

fn validate_date(input: &String) -> std::result::Result<(), String> {
    parse_date(input).map(|_| ()).map_err(|e| e.to_string())
}

/// Asks for start and end dates until a valid range is entered.
pub fn prompt_date_range() -> Result<(NaiveDate, NaiveDate)> {
    let theme = ColorfulTheme::default();
    loop {
        let start: String = Input::with_theme(&theme)
            .with_prompt("Start date (YYYY-MM-DD)")
            .validate_with(validate_date)
            .interact_text()?;
        let end: String = Input::with_theme(&theme)
            .with_prompt("End date (YYYY-MM-DD)")
            .validate_with(validate_date)
            .interact_text()?;

        match parse_date_range(&start, &end) {
            Ok(range) => return Ok(range),
            Err(e) => eprintln!("{}", e),
        }
    }
}

pub fn prompt_year_group() -> Result<u32> {
    let input: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Year group (7-13)")
        .validate_with(|input: &String| {
            parse_year_group(input)
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .interact_text()?;
    parse_year_group(&input)
}

pub fn prompt_mode() -> Result<Mode> {
    let labels: Vec<&str> = Mode::ALL.iter().map(|mode| mode.label()).collect();
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Choose an export")
        .items(&labels)
        .default(0)
        .interact()?;
    Ok(Mode::ALL[selection])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordered_range() {
        let (start, end) = parse_date_range("2023-01-01", " 2023-06-30 ").unwrap();
        assert_eq!(start.to_string(), "2023-01-01");
        assert_eq!(end.to_string(), "2023-06-30");
    }

    #[test]
    fn rejects_reversed_or_empty_range() {
        assert!(matches!(
            parse_date_range("2023-06-30", "2023-01-01"),
            Err(ExportError::InvalidDateRange { .. })
        ));
        assert!(parse_date_range("2023-01-01", "2023-01-01").is_err());
    }

    #[test]
    fn rejects_malformed_dates() {
        assert!(matches!(parse_date("01/02/2023"), Err(ExportError::InvalidDate(_))));
        assert!(parse_date("2023-02-30").is_err());
    }

    #[test]
    fn year_group_must_be_in_school_range() {
        assert_eq!(parse_year_group("7").unwrap(), 7);
        assert_eq!(parse_year_group(" 13 ").unwrap(), 13);
        assert!(parse_year_group("6").is_err());
        assert!(parse_year_group("14").is_err());
        assert!(parse_year_group("twelve").is_err());
    }
}
