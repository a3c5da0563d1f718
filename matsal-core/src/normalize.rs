//! Normalization shared by every adapter.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::model::{Day, Meal};

/// Characters treated as blank: Unicode whitespace (including NBSP) and the BOM.
fn is_blank(ch: char) -> bool {
    ch.is_whitespace() || ch == '\u{feff}'
}

/// Trim blanks and periods from both ends and collapse inner blank runs to one space.
///
/// ```
/// use matsal_core::normalize::polish_text;
///
/// assert_eq!(polish_text("\n\nVeg. Potatisbullar.\n"), "Veg. Potatisbullar");
/// assert_eq!(polish_text("  Konstig      Skola\t"), "Konstig Skola");
/// ```
#[must_use]
pub fn polish_text(input: &str) -> String {
    input
        .trim_matches(|ch: char| is_blank(ch) || ch == '.')
        .split(is_blank)
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

impl Meal {
    /// Build a meal from raw upstream text.
    ///
    /// Returns `None` when nothing remains after polishing.
    #[must_use]
    pub fn from_value(value: &str) -> Option<Self> {
        let value = polish_text(value);
        (!value.is_empty()).then_some(Self { value })
    }
}

/// Polish meal values and drop case-insensitive duplicates, keeping the first occurrence.
#[must_use]
pub fn dedup_meals(meals: Vec<Meal>) -> Vec<Meal> {
    let mut seen = HashSet::new();

    meals
        .into_iter()
        .filter_map(|meal| Meal::from_value(&meal.value))
        .filter(|meal| seen.insert(meal.value.to_lowercase()))
        .collect()
}

/// Sort days by date and keep only the first day seen for each date.
#[must_use]
pub fn dedup_days(mut days: Vec<Day>) -> Vec<Day> {
    let mut seen = HashSet::<NaiveDate>::new();
    days.retain(|day| seen.insert(day.date));
    days.sort_by_key(|day| day.date);
    days
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meals(values: &[&str]) -> Vec<Meal> {
        values
            .iter()
            .map(|value| Meal {
                value: (*value).to_owned(),
            })
            .collect()
    }

    #[test]
    fn polish() {
        for (input, expected) in [
            ("\t    Fisk Björkeby                   \n", "Fisk Björkeby"),
            ("\n\n\nVeg. Potatisbullar.\n\n", "Veg. Potatisbullar"),
            ("A     \n..............              ", "A"),
            ("Tacos", "Tacos"),
            ("    Konstig                  Skola\t\t", "Konstig Skola"),
            ("\u{feff}\u{a0}Pannkaka\u{a0}med\u{a0} sylt.\u{feff}", "Pannkaka med sylt"),
        ] {
            assert_eq!(polish_text(input), expected, "polishing {input:?}");
        }
    }

    #[test]
    fn meal_from_blank_value() {
        assert!(Meal::from_value("\n\n\n").is_none(), "blank");
        assert!(Meal::from_value(" ... ").is_none(), "only periods");
        assert_eq!(
            Meal::from_value("\t  Fisk Björkeby   \n").map(|meal| meal.value),
            Some("Fisk Björkeby".to_owned()),
            "trimmed"
        );
    }

    #[test]
    fn dedup() {
        assert_eq!(
            dedup_meals(meals(&[
                "Fisk Björkeby",
                "\n  fisk bJÖRKEBY",
                "Tacobuffé",
                " \tPannkaka",
                "                   Pannkaka",
            ])),
            meals(&["Fisk Björkeby", "Tacobuffé", "Pannkaka"]),
            "case and whitespace insensitive"
        );

        assert_eq!(
            dedup_meals(meals(&["Fisk", "  fisk  ", "FISK."])),
            meals(&["Fisk"]),
            "punctuation insensitive"
        );
    }

    #[test]
    fn dedup_is_idempotent() {
        let input = meals(&["  Soppa.", "soppa", "Bröd ", "", "Mjölk  och   vatten"]);
        let once = dedup_meals(input);
        assert_eq!(dedup_meals(once.clone()), once, "second pass changes nothing");
        assert_eq!(once, meals(&["Soppa", "Bröd", "Mjölk och vatten"]), "first pass");
    }

    #[test]
    fn days_are_sorted_and_unique() {
        let day = |year, month, dom, value: &str| Day {
            date: NaiveDate::from_ymd_opt(year, month, dom).expect("valid test date"),
            meals: meals(&[value]),
        };

        assert_eq!(
            dedup_days(vec![
                day(1790, 7, 14, "Pizza"),
                day(1789, 7, 14, "Tacos"),
                day(1789, 7, 14, "Sushi"),
            ]),
            vec![day(1789, 7, 14, "Tacos"), day(1790, 7, 14, "Pizza")],
            "first occurrence wins"
        );
    }
}
