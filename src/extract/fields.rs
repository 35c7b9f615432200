//! Parsers for the numeric and date fields of a listing page.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

static TITLE_PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*PLN").expect("valid title price pattern"));
static TITLE_SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*m2").expect("valid title size pattern"));

const POLISH_MONTHS: [&str; 12] = [
    "stycznia",
    "lutego",
    "marca",
    "kwietnia",
    "maja",
    "czerwca",
    "lipca",
    "sierpnia",
    "września",
    "października",
    "listopada",
    "grudnia",
];

/// Parses an amount such as `2 900 zł` or `1 250,50 zł`.
pub fn parse_price(text: &str) -> Option<f64> {
    let amount = text.split("zł").next()?;
    parse_decimal(amount)
}

/// Parses a number with a decimal comma, ignoring grouping whitespace.
pub fn parse_decimal(text: &str) -> Option<f64> {
    let compact: String = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if compact.is_empty() {
        return None;
    }
    compact.parse().ok()
}

/// Price written in a listing title, e.g. `Pokój 1200 PLN`.
pub fn price_from_title(title: &str) -> Option<f64> {
    TITLE_PRICE
        .captures(title)
        .and_then(|caps| caps[1].parse().ok())
}

/// Size written in a listing title, e.g. `Kawalerka 28 m2`.
pub fn size_from_title(title: &str) -> Option<f64> {
    TITLE_SIZE
        .captures(title)
        .and_then(|caps| caps[1].parse().ok())
}

/// Parses the posted-at label: `Dzisiaj o 12:30` or `12 lutego 2025`.
///
/// `now` anchors the "today" form.
pub fn parse_polish_date(text: &str, now: NaiveDateTime) -> Option<NaiveDateTime> {
    let text = text.trim();

    if let Some(rest) = text.strip_prefix("Dzisiaj") {
        let clock = rest.trim().trim_start_matches('o').trim();
        let time = NaiveTime::parse_from_str(clock, "%H:%M").ok()?;
        return Some(now.date().and_time(time));
    }

    let mut parts = text.split_whitespace();
    let (Some(day), Some(month), Some(year), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };

    let month = month.to_lowercase();
    let month = POLISH_MONTHS.iter().position(|name| *name == month)? as u32 + 1;
    let date = NaiveDate::from_ymd_opt(year.parse().ok()?, month, day.parse().ok()?)?;
    date.and_hms_opt(0, 0, 0)
}

/// Values from the labelled parameter list of a listing page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingDetails {
    pub rooms: Option<u32>,
    pub size: Option<f64>,
    pub rent: Option<f64>,
    pub floor: Option<i32>,
    pub building_type: Option<String>,
    pub has_elevator: Option<bool>,
    pub parking: Option<String>,
}

impl ListingDetails {
    pub fn from_parameters<'a>(parameters: impl IntoIterator<Item = &'a str>) -> Self {
        let mut details = Self::default();
        for parameter in parameters {
            details.apply(parameter);
        }
        details
    }

    /// Records one `Label: value` parameter. Unknown labels and values that
    /// do not parse are ignored.
    pub fn apply(&mut self, parameter: &str) {
        let parameter = parameter.trim();

        if let Some(value) = value_after(parameter, "Liczba pokoi:") {
            self.rooms = first_token(value).and_then(|t| t.parse().ok());
        } else if let Some(value) = value_after(parameter, "Powierzchnia:") {
            self.size = first_token(value).and_then(parse_decimal);
        } else if let Some(value) = value_after(parameter, "Czynsz (dodatkowo):") {
            self.rent = parse_price(value);
        } else if let Some(value) = value_after(parameter, "Poziom:") {
            self.floor = first_token(value).and_then(|t| {
                if t.eq_ignore_ascii_case("parter") {
                    Some(0)
                } else {
                    t.parse().ok()
                }
            });
        } else if let Some(value) = value_after(parameter, "Rodzaj zabudowy:") {
            self.building_type = Some(value.to_string());
        } else if let Some(value) = value_after(parameter, "Winda:") {
            self.has_elevator = Some(value.eq_ignore_ascii_case("tak"));
        } else if let Some(value) = value_after(parameter, "Parking:") {
            self.parking = Some(value.to_string());
        }
    }
}

fn value_after<'a>(parameter: &'a str, label: &str) -> Option<&'a str> {
    parameter
        .split_once(label)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

fn first_token(value: &str) -> Option<&str> {
    value.split_whitespace().next()
}
