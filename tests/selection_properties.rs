//! Selection Property Tests
//!
//! Algebraic properties of comparators and scanning:
//! - integer ordering predicates are total and never panic
//! - AFTER and BEFORE split every instant except the operand itself
//! - selection keeps a subset in input order
//! - chunked scans select exactly what an unchunked scan selects

use std::num::NonZeroUsize;

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use regex::Regex;
use token_janitor::actions::Action;
use token_janitor::criteria::{Comparator, Criterion, Domain, Operator};
use token_janitor::pipeline::{select_serials, PipelineConfig};
use token_janitor::selection::{SelectionCriteria, Selector};
use token_janitor::store::{FieldValue, JsonStore, StoreDocument, TokenRecord};

fn comparator(field: &str, operator: Operator, operand: &str, domain: Domain) -> Comparator {
    Comparator::make(&Criterion::new(field, operator, operand, domain)).unwrap()
}

fn store(tokens: Vec<TokenRecord>) -> JsonStore {
    JsonStore::in_memory(StoreDocument {
        tokens,
        ..Default::default()
    })
    .unwrap()
}

/// Tokens with unique serials and a mix of descriptions
fn tokens() -> impl Strategy<Value = Vec<TokenRecord>> {
    prop::collection::btree_map(0u16..500, any::<bool>(), 0..40).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(n, temp)| {
                let description = if temp { "temp" } else { "perm" };
                TokenRecord::new(format!("S{:04}", n), "hotp").with_description(description)
            })
            .collect()
    })
}

fn field_value() -> impl Strategy<Value = FieldValue> {
    prop_oneof![
        any::<i64>().prop_map(FieldValue::Int),
        any::<i64>().prop_map(|n| FieldValue::Str(n.to_string())),
        "\\PC{0,12}".prop_map(FieldValue::Str),
        any::<bool>().prop_map(FieldValue::Bool),
    ]
}

proptest! {
    #[test]
    fn greater_than_is_total(operand in any::<i64>(), value in field_value()) {
        let gt = comparator("count_auth", Operator::Gt, &operand.to_string(), Domain::Integer);
        let expected = value.as_integer().map(|x| x > operand).unwrap_or(false);
        prop_assert_eq!(gt.evaluate(&value), expected);
    }

    #[test]
    fn less_than_is_total(operand in any::<i64>(), value in field_value()) {
        let lt = comparator("count_auth", Operator::Lt, &operand.to_string(), Domain::Integer);
        let expected = value.as_integer().map(|x| x < operand).unwrap_or(false);
        prop_assert_eq!(lt.evaluate(&value), expected);
    }

    #[test]
    fn after_and_before_split_instants(offset in -10_000_000i64..10_000_000) {
        let operand = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let stored = (operand + Duration::seconds(offset)).to_rfc3339();
        let value = FieldValue::Str(stored);

        let after = comparator("validity_period_end", Operator::After, &operand.to_rfc3339(), Domain::Datetime);
        let before = comparator("validity_period_end", Operator::Before, &operand.to_rfc3339(), Domain::Datetime);

        if offset == 0 {
            prop_assert!(!after.evaluate(&value) && !before.evaluate(&value));
        } else {
            prop_assert!(after.evaluate(&value) ^ before.evaluate(&value));
        }
    }

    #[test]
    fn unparseable_instants_match_nothing(text in "[a-z ]{0,12}") {
        let value = FieldValue::Str(text);
        let after = comparator("last_auth", Operator::After, "2020-01-01", Domain::Datetime);
        let before = comparator("last_auth", Operator::Before, "2020-01-01", Domain::Datetime);
        prop_assert!(!after.evaluate(&value));
        prop_assert!(!before.evaluate(&value));
    }

    #[test]
    fn selection_is_ordered_subset(batch in tokens()) {
        let criteria = SelectionCriteria {
            description: Some(Regex::new("^temp").unwrap()),
            ..Default::default()
        };
        let identity = store(Vec::new());
        let selected: Vec<String> = Selector::new(&criteria)
            .select(batch.clone(), &identity)
            .tokens
            .into_iter()
            .map(|t| t.serial)
            .collect();

        let expected: Vec<String> = batch
            .into_iter()
            .filter(|t| t.description.starts_with("temp"))
            .map(|t| t.serial)
            .collect();
        prop_assert_eq!(selected, expected);
    }

    #[test]
    fn chunked_scan_matches_unchunked(batch in tokens(), chunk in 1usize..12) {
        let store = store(batch);
        let mut config = PipelineConfig::new(Action::Delete);
        config.selection.description = Some(Regex::new("^temp").unwrap());

        let unchunked = select_serials(&config, &store).unwrap();
        config.chunk_size = NonZeroUsize::new(chunk);
        let chunked = select_serials(&config, &store).unwrap();

        prop_assert_eq!(chunked, unchunked);
    }
}
