//! Recommendation filter pipeline
//!
//! Pure functions: the current time is passed in as `HH:MM`, the input list
//! is never mutated.

use shared::models::Restaurant;
use std::collections::BTreeMap;

/// Filter parameters as received (query string merged with body)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterParams {
    pub style: Option<String>,
    pub vegetarian: Option<String>,
    pub deliveries: Option<String>,
    pub price_range: Option<String>,
    pub open_now: Option<String>,
}

impl FilterParams {
    pub fn from_map(params: &BTreeMap<String, String>) -> Self {
        let get = |key: &str| params.get(key).cloned();
        Self {
            style: get("style"),
            vegetarian: get("vegetarian"),
            deliveries: get("deliveries"),
            price_range: get("priceRange"),
            open_now: get("openNow"),
        }
    }

    /// `openNow=false` turns off the open-now gate
    pub fn ignores_opening_hours(&self) -> bool {
        self.open_now
            .as_deref()
            .is_some_and(|v| v.to_lowercase() == "false")
    }
}

/// Whether `now` falls inside the opening window
///
/// All three values are zero-padded 24h `HH:MM` strings and are compared
/// lexicographically. A window whose close is earlier than its open runs
/// past midnight. `open == close` is open only at that exact minute.
pub fn is_open(open: &str, close: &str, now: &str) -> bool {
    if close < open {
        now >= open || now <= close
    } else {
        open <= now && now <= close
    }
}

/// "true" in any case is true, everything else false
pub fn parse_flag(value: &str) -> bool {
    value.to_lowercase() == "true"
}

/// Run the full pipeline
///
/// The open-now gate always runs first and the attribute filters narrow its
/// output. With `openNow=false` that result is discarded and the attribute
/// filters are re-applied to the whole input instead.
pub fn filter_restaurants(
    params: &FilterParams,
    restaurants: &[Restaurant],
    now: &str,
) -> Vec<Restaurant> {
    let open: Vec<&Restaurant> = restaurants
        .iter()
        .filter(|r| is_open(&r.open_hour, &r.close_hour, now))
        .collect();
    tracing::debug!(open = open.len(), now, "Open-now gate applied");

    let mut matches = narrow(params, open);

    if params.ignores_opening_hours() {
        matches = narrow(params, restaurants.iter().collect());
        tracing::debug!("openNow=false, matching regardless of opening hours");
    }

    matches.into_iter().cloned().collect()
}

fn narrow<'a>(params: &FilterParams, mut working: Vec<&'a Restaurant>) -> Vec<&'a Restaurant> {
    if let Some(style) = &params.style {
        let style = style.to_lowercase();
        working.retain(|r| r.style.to_lowercase() == style);
    }
    if let Some(vegetarian) = &params.vegetarian {
        let wanted = parse_flag(vegetarian);
        working.retain(|r| r.vegetarian == Some(wanted));
    }
    if let Some(deliveries) = &params.deliveries {
        let wanted = parse_flag(deliveries);
        working.retain(|r| r.deliveries == Some(wanted));
    }
    if let Some(price_range) = &params.price_range {
        working.retain(|r| &r.price_range == price_range);
    }
    working
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{restaurant, restaurant_open};

    fn params(pairs: &[(&str, &str)]) -> FilterParams {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        FilterParams::from_map(&map)
    }

    fn ids(list: &[Restaurant]) -> Vec<&str> {
        list.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn window_bounds_are_inclusive() {
        assert!(is_open("09:00", "17:00", "09:00"));
        assert!(is_open("09:00", "17:00", "17:00"));
        assert!(is_open("09:00", "17:00", "12:30"));
        assert!(!is_open("09:00", "17:00", "08:59"));
        assert!(!is_open("09:00", "17:00", "17:01"));
    }

    #[test]
    fn window_wraps_past_midnight() {
        assert!(is_open("22:00", "02:00", "23:30"));
        assert!(is_open("22:00", "02:00", "00:15"));
        assert!(is_open("22:00", "02:00", "02:00"));
        assert!(!is_open("22:00", "02:00", "12:00"));
        assert!(!is_open("22:00", "02:00", "02:01"));
    }

    #[test]
    fn degenerate_window_is_a_single_minute() {
        assert!(is_open("09:00", "09:00", "09:00"));
        assert!(!is_open("09:00", "09:00", "09:01"));
        assert!(!is_open("09:00", "09:00", "08:59"));
    }

    #[test]
    fn flags_parse_case_insensitively() {
        assert!(parse_flag("true"));
        assert!(parse_flag("TRUE"));
        assert!(!parse_flag("yes"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn default_pipeline_keeps_only_open_records() {
        let list = vec![
            restaurant_open("day", "Italian", "09:00", "17:00"),
            restaurant_open("night", "Italian", "20:00", "02:00"),
        ];
        let out = filter_restaurants(&FilterParams::default(), &list, "12:00");
        assert_eq!(ids(&out), vec!["day"]);

        let out = filter_restaurants(&FilterParams::default(), &list, "01:00");
        assert_eq!(ids(&out), vec!["night"]);
    }

    #[test]
    fn open_now_false_ignores_opening_hours() {
        let list = vec![
            restaurant_open("open", "Italian", "09:00", "17:00"),
            restaurant_open("closed", "Italian", "18:00", "19:00"),
            restaurant_open("other", "Thai", "09:00", "17:00"),
        ];
        let out = filter_restaurants(
            &params(&[("style", "italian"), ("openNow", "False")]),
            &list,
            "12:00",
        );
        assert_eq!(ids(&out), vec!["open", "closed"]);
    }

    #[test]
    fn open_now_true_or_garbage_keeps_gate() {
        let list = vec![
            restaurant_open("open", "Italian", "09:00", "17:00"),
            restaurant_open("closed", "Italian", "18:00", "19:00"),
        ];
        for value in ["true", "no", ""] {
            let out = filter_restaurants(&params(&[("openNow", value)]), &list, "12:00");
            assert_eq!(ids(&out), vec!["open"], "openNow={value}");
        }
    }

    #[test]
    fn attribute_filters_narrow_in_sequence() {
        let mut veg_delivery = restaurant("a", "Italian");
        veg_delivery.vegetarian = Some(true);
        veg_delivery.deliveries = Some(true);
        veg_delivery.price_range = "$$".into();

        let mut veg_only = restaurant("b", "ITALIAN");
        veg_only.vegetarian = Some(true);
        veg_only.deliveries = Some(false);

        let mut unknown = restaurant("c", "Italian");
        unknown.price_range = "$$".into();

        let list = vec![veg_delivery, veg_only, unknown];

        let out = filter_restaurants(&params(&[("style", "Italian")]), &list, "12:00");
        assert_eq!(ids(&out), vec!["a", "b", "c"]);

        let out = filter_restaurants(&params(&[("vegetarian", "TRUE")]), &list, "12:00");
        assert_eq!(ids(&out), vec!["a", "b"]);

        let out = filter_restaurants(&params(&[("deliveries", "false")]), &list, "12:00");
        assert_eq!(ids(&out), vec!["b"]);

        let out = filter_restaurants(&params(&[("priceRange", "$$")]), &list, "12:00");
        assert_eq!(ids(&out), vec!["a", "c"]);

        let out = filter_restaurants(
            &params(&[("vegetarian", "true"), ("priceRange", "$$")]),
            &list,
            "12:00",
        );
        assert_eq!(ids(&out), vec!["a"]);
    }

    #[test]
    fn price_range_is_exact_match() {
        let mut cheap = restaurant("a", "Thai");
        cheap.price_range = "$".into();
        let list = vec![cheap];
        let out = filter_restaurants(&params(&[("priceRange", "$ ")]), &list, "12:00");
        assert!(out.is_empty());
    }

    #[test]
    fn pipeline_is_idempotent_and_leaves_input_alone() {
        let list = vec![
            restaurant_open("a", "Italian", "09:00", "17:00"),
            restaurant_open("b", "Thai", "09:00", "17:00"),
            restaurant_open("c", "Italian", "20:00", "23:00"),
        ];
        let snapshot = list.clone();
        let p = params(&[("style", "italian")]);

        let first = filter_restaurants(&p, &list, "10:00");
        let second = filter_restaurants(&p, &list, "10:00");
        assert_eq!(first, second);
        assert_eq!(list, snapshot);

        let again = filter_restaurants(&p, &first, "10:00");
        assert_eq!(again, first);
    }
}
