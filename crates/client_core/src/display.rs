//! Display values derived from API records: prices, stars, promotions,
//! category filters and the rating chart.

use chrono::{DateTime, Utc};
use shared::protocol::{Dish, ScoreOverview};

pub const ALL_CATEGORIES: &str = "All";
const VND_SYMBOL: &str = "₫";

/// Formats an amount as Vietnamese dong: no decimals, `.` between thousands.
pub fn format_vnd(amount: f64) -> String {
    let amount = if amount.is_finite() { amount.round() } else { 0.0 };
    let digits = format!("{:.0}", amount.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}{grouped} {VND_SYMBOL}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StarRating {
    pub full: u32,
    pub half: bool,
}

impl StarRating {
    /// Unrated items still show a single star. The half star appears when
    /// `avg % round(avg)` exceeds one half, with `round` rounding .5 up.
    pub fn from_average(average: f64) -> Self {
        let full = if average > 0.0 {
            average.floor() as u32
        } else {
            1
        };
        let rounded = (average + 0.5).floor();
        Self {
            full,
            half: average % rounded > 0.5,
        }
    }
}

/// Lowest promotional price among promotions still running at `now`.
pub fn active_promotional_price(dish: &Dish, now: DateTime<Utc>) -> Option<f64> {
    dish.promotions
        .iter()
        .filter(|promotion| promotion.ends_at > now)
        .map(|promotion| promotion.promotional_price)
        .reduce(f64::min)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceTag {
    pub regular: String,
    /// Present while a promotion runs; the regular price is then shown struck.
    pub promotional: Option<String>,
}

pub fn price_tag(dish: &Dish, now: DateTime<Utc>) -> PriceTag {
    PriceTag {
        regular: format_vnd(dish.price),
        promotional: active_promotional_price(dish, now).map(format_vnd),
    }
}

pub fn filter_by_category<'a>(dishes: &'a [Dish], selection: &str) -> Vec<&'a Dish> {
    dishes
        .iter()
        .filter(|dish| {
            selection == ALL_CATEGORIES || dish.categories.iter().any(|c| c == selection)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingBucket {
    pub label: &'static str,
    pub stars: u8,
    pub count: u64,
}

/// Star counts summed over many restaurants, five stars first.
pub fn rating_distribution<'a>(
    scores: impl IntoIterator<Item = &'a ScoreOverview>,
) -> [RatingBucket; 5] {
    let mut buckets = [
        RatingBucket { label: "5 Stars", stars: 5, count: 0 },
        RatingBucket { label: "4 Stars", stars: 4, count: 0 },
        RatingBucket { label: "3 Stars", stars: 3, count: 0 },
        RatingBucket { label: "2 Stars", stars: 2, count: 0 },
        RatingBucket { label: "1 Star", stars: 1, count: 0 },
    ];
    for score in scores {
        let counts = [
            score.five_stars,
            score.four_stars,
            score.three_stars,
            score.two_stars,
            score.one_star,
        ];
        for (bucket, count) in buckets.iter_mut().zip(counts) {
            bucket.count += u64::from(count);
        }
    }
    buckets
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
#[path = "tests/display_tests.rs"]
mod tests;
