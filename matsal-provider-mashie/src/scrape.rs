//! Extracting days and meals from Mashie menu pages.

use std::sync::LazyLock;

use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};

use matsal_core::{
    model::{Day, Meal},
    normalize::dedup_meals,
    ports::PortError,
};

/// Swedish month abbreviations as printed in day headings, January first.
pub const MONTH_LITERALS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "maj", "jun", "jul", "aug", "sep", "okt", "nov", "dec",
];

const DAY_SELECTOR: &str = ".panel-group > .panel";
const DATE_SELECTOR: &str = ".panel-heading .pull-right";
const MEAL_SELECTOR: &str = ".app-daymenu-name";

struct Selectors {
    day: Selector,
    date: Selector,
    meal: Selector,
}

impl Selectors {
    fn new() -> Result<Self, String> {
        Ok(Self {
            day: selector(DAY_SELECTOR)?,
            date: selector(DATE_SELECTOR)?,
            meal: selector(MEAL_SELECTOR)?,
        })
    }

    fn get() -> Result<&'static Self, PortError> {
        SELECTORS
            .as_ref()
            .map_err(|err| PortError::Internal(err.clone()))
    }
}

static SELECTORS: LazyLock<Result<Selectors, String>> = LazyLock::new(Selectors::new);

fn selector(css: &'static str) -> Result<Selector, String> {
    Selector::parse(css).map_err(|err| format!("selector `{css}`: {err}"))
}

/// Parse a day heading such as `17 maj` or `29 feb 2020`.
///
/// Headings without a year fall in `fallback_year`.
///
/// # Errors
///
/// Returns [`PortError::Parse`] for headings with more than three words, an
/// unknown month, a non-numeric day or year, or a date that does not exist.
pub fn parse_date_text(input: &str, fallback_year: i32) -> Result<NaiveDate, PortError> {
    let segments: Vec<&str> = input.split_whitespace().collect();

    let [day_literal, month_literal, rest @ ..] = segments.as_slice() else {
        return Err(PortError::Parse(format!("`{input}` is not a day heading")));
    };

    let year = match rest {
        [] => fallback_year,
        [year_literal] => year_literal
            .parse::<i32>()
            .map_err(|_err| PortError::Parse(format!("`{year_literal}` is not a year")))?,
        _ => {
            return Err(PortError::Parse(format!("too many whitespaces in `{input}`")));
        }
    };

    let day = day_literal
        .parse::<u32>()
        .map_err(|_err| PortError::Parse(format!("`{day_literal}` is not a day of month")))?;

    let month = MONTH_LITERALS
        .iter()
        .position(|literal| literal == month_literal)
        .and_then(|index| u32::try_from(index + 1).ok())
        .ok_or_else(|| {
            PortError::Parse(format!("`{month_literal}` is not a valid month literal"))
        })?;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| PortError::Parse(format!("`{input}` is not a calendar date")))
}

fn parse_meal(element: ElementRef<'_>) -> Result<Meal, PortError> {
    let value: String = element.text().collect();

    if value.trim().is_empty() {
        return Err(PortError::Parse("unable to parse meal node".to_owned()));
    }

    Ok(Meal { value })
}

fn parse_day(
    element: ElementRef<'_>,
    selectors: &Selectors,
    fallback_year: i32,
) -> Result<Day, PortError> {
    let heading = element
        .select(&selectors.date)
        .next()
        .ok_or_else(|| PortError::Parse("day panel without a date heading".to_owned()))?;
    let date = parse_date_text(&heading.text().collect::<String>(), fallback_year)?;

    let meals = element
        .select(&selectors.meal)
        .map(parse_meal)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Day {
        date,
        meals: dedup_meals(meals),
    })
}

/// Scrape every day panel of a Mashie menu page.
///
/// Days without meals are left out.
///
/// # Errors
///
/// Returns [`PortError::Parse`] if any panel has a malformed heading or an empty meal.
pub fn scrape_days(html: &str, fallback_year: i32) -> Result<Vec<Day>, PortError> {
    let selectors = Selectors::get()?;
    let document = Html::parse_document(html);

    let days = document
        .select(&selectors.day)
        .map(|element| parse_day(element, selectors, fallback_year))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(days.into_iter().filter(|day| !day.meals.is_empty()).collect())
}
