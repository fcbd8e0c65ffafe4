//! Student attributes and roster display helpers

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Masculino,
    Femenino,
    Otro,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Masculino => "masculino",
            Gender::Femenino => "femenino",
            Gender::Otro => "otro",
        }
    }

    /// Single-letter form used in roster tables
    pub fn short(&self) -> &'static str {
        match self {
            Gender::Masculino => "M",
            Gender::Femenino => "F",
            Gender::Otro => "O",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "masculino" => Ok(Gender::Masculino),
            "femenino" => Ok(Gender::Femenino),
            "otro" => Ok(Gender::Otro),
            other => Err(Error::InvalidGender(other.to_string())),
        }
    }
}

/// Whole years between `birth` and `today`, e.g. `"17 años"`; `"-"` when unknown
pub fn format_age(birth: Option<NaiveDate>, today: NaiveDate) -> String {
    let Some(birth) = birth else {
        return "-".to_string();
    };
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    format!("{} años", age)
}

/// Time since the first class in days, 30-day months, or years and months
pub fn format_seniority(first_class: Option<NaiveDate>, today: NaiveDate) -> String {
    let Some(start) = first_class else {
        return "-".to_string();
    };
    let days = (today - start).num_days().abs();
    if days < 30 {
        return format!("{} días", days);
    }

    let months = days / 30;
    if months < 12 {
        return plural_months(months);
    }

    let years = months / 12;
    let remaining = months % 12;
    let years_label = format!("{} año{}", years, if years > 1 { "s" } else { "" });
    if remaining == 0 {
        years_label
    } else {
        format!("{} {}", years_label, plural_months(remaining))
    }
}

fn plural_months(months: i64) -> String {
    format!("{} mes{}", months, if months > 1 { "es" } else { "" })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_age_before_and_after_birthday() {
        let birth = Some(date(2008, 6, 15));
        assert_eq!(format_age(birth, date(2026, 6, 14)), "17 años");
        assert_eq!(format_age(birth, date(2026, 6, 15)), "18 años");
        assert_eq!(format_age(birth, date(2026, 12, 1)), "18 años");
    }

    #[test]
    fn test_age_unknown() {
        assert_eq!(format_age(None, date(2026, 1, 1)), "-");
    }

    #[test]
    fn test_seniority_days() {
        let today = date(2026, 3, 10);
        assert_eq!(format_seniority(Some(date(2026, 3, 10)), today), "0 días");
        assert_eq!(format_seniority(Some(date(2026, 2, 20)), today), "18 días");
    }

    #[test]
    fn test_seniority_months() {
        let today = date(2026, 3, 10);
        assert_eq!(format_seniority(Some(date(2026, 2, 8)), today), "1 mes");
        assert_eq!(format_seniority(Some(date(2025, 12, 1)), today), "3 meses");
    }

    #[test]
    fn test_seniority_years() {
        let today = date(2026, 3, 10);
        // 365 days -> 12 months -> 1 year
        assert_eq!(format_seniority(Some(date(2025, 3, 10)), today), "1 año");
        // 800 days -> 26 months -> 2 years 2 months
        assert_eq!(format_seniority(Some(date(2024, 1, 1)), today), "2 años 2 meses");
        // 400 days -> 13 months
        assert_eq!(format_seniority(Some(date(2025, 2, 3)), today), "1 año 1 mes");
    }

    #[test]
    fn test_seniority_unknown() {
        assert_eq!(format_seniority(None, date(2026, 1, 1)), "-");
    }

    #[test]
    fn test_gender_short_and_parse() {
        assert_eq!(Gender::Masculino.short(), "M");
        assert_eq!(Gender::Femenino.short(), "F");
        assert_eq!(Gender::Otro.short(), "O");
        assert_eq!("femenino".parse::<Gender>().unwrap(), Gender::Femenino);
        assert!("x".parse::<Gender>().is_err());
        assert_eq!(Gender::default(), Gender::Masculino);
    }
}
