//! Property-based tests for ordering and labeling invariants.

use nwb2bids::metadata::{Events, TabularData, PARTICIPANT_COLUMNS};
use nwb2bids::notifications::catalog::DEFINITIONS;
use nwb2bids::notifications::{sort_notifications, Notification};
use nwb2bids::nwb::{IntervalColumn, IntervalTable};
use nwb2bids::sanitization::{is_valid_label, sanitize, SanitizationLevel};
use proptest::prelude::*;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

fn notification_strategy() -> impl Strategy<Value = Notification> {
    (
        0..DEFINITIONS.len(),
        prop::collection::vec("[a-c]{1,3}\\.nwb", 0..3),
        "[a-z ]{0,12}",
    )
        .prop_map(|(index, sources, detail)| {
            Notification::from_definition(
                DEFINITIONS[index].identifier,
                sources.into_iter().map(PathBuf::from),
                Vec::<PathBuf>::new(),
            )
            .unwrap()
            .with_detail(detail)
        })
}

proptest! {
    /// Critical sanitization is a fixed point and yields a BIDS label
    #[test]
    fn test_sanitize_idempotent(label in "\\PC{0,40}") {
        let once = sanitize(&label, SanitizationLevel::Critical);
        let twice = sanitize(&once, SanitizationLevel::Critical);
        prop_assert_eq!(&once, &twice);
        prop_assert!(!once.starts_with('+') && !once.ends_with('+'));
        prop_assert!(!once.contains("++"));
        prop_assert!(once
            .split('+')
            .all(|part| part.is_empty() || is_valid_label(part)));
    }

    /// No sanitization leaves labels untouched
    #[test]
    fn test_sanitize_none_is_identity(label in "\\PC{0,40}") {
        prop_assert_eq!(sanitize(&label, SanitizationLevel::None), label);
    }

    /// Canonical order does not depend on the input order
    #[test]
    fn test_notification_order_is_stable(
        notifications in prop::collection::vec(notification_strategy(), 0..12),
        rotation in 0usize..12,
    ) {
        let mut forward = notifications.clone();
        sort_notifications(&mut forward);

        let mut reversed: Vec<Notification> = notifications.iter().rev().cloned().collect();
        sort_notifications(&mut reversed);

        let mut rotated = notifications.clone();
        if !rotated.is_empty() {
            let by = rotation % rotated.len();
            rotated.rotate_left(by);
        }
        sort_notifications(&mut rotated);

        prop_assert_eq!(&forward, &reversed);
        prop_assert_eq!(&forward, &rotated);
        for pair in forward.windows(2) {
            prop_assert!(pair[0].canonical_cmp(&pair[1]) != Ordering::Greater);
            prop_assert!(pair[0].severity() >= pair[1].severity()
                || pair[0].category().precedence() > pair[1].category().precedence());
        }
    }

    /// Merged events are sorted by onset, longest first on ties
    #[test]
    fn test_events_sorted(
        first in prop::collection::vec((0.0f64..100.0, 0.0f64..10.0), 0..30),
        second in prop::collection::vec((0.0f64..100.0, 0.0f64..10.0), 1..30),
    ) {
        let table = |name: &str, intervals: &[(f64, f64)]| {
            let starts: Vec<f64> = intervals.iter().map(|(s, _)| *s).collect();
            let stops: Vec<f64> = intervals.iter().map(|(s, d)| s + d).collect();
            IntervalTable::new(name)
                .with_description("generated")
                .with_column(IntervalColumn::from_f64("start_time", &starts))
                .with_column(IntervalColumn::from_f64("stop_time", &stops))
        };
        let trials = table("trials", &first);
        let epochs = table("epochs", &second);

        let events = Events::from_tables(&[&trials, &epochs], Path::new("generated.nwb"))
            .unwrap()
            .unwrap();
        prop_assert_eq!(events.len(), first.len() + second.len());
        for pair in events.rows.windows(2) {
            prop_assert!(pair[0].sort_cmp(&pair[1]) != Ordering::Greater);
            prop_assert!(pair[0].onset <= pair[1].onset);
        }
    }

    /// Known participant columns come first, in their fixed order
    #[test]
    fn test_participant_columns_prefix(
        rows in prop::collection::vec(
            (
                "[a-z0-9]{1,6}",
                prop::option::of("[A-Z][a-z]{2,8} [a-z]{2,8}"),
                prop::option::of(prop::sample::select(vec!["male", "female", "other"])),
                prop::option::of("[A-Z0-9/]{2,8}"),
                prop::option::of("[a-z]{1,8}"),
            ),
            1..10,
        ),
    ) {
        let records: Vec<Map<String, Value>> = rows
            .iter()
            .map(|(id, species, sex, strain, weight)| {
                let mut record = Map::new();
                record.insert("participant_id".into(), Value::from(format!("sub-{}", id)));
                if let Some(species) = species {
                    record.insert("species".into(), Value::from(species.as_str()));
                }
                if let Some(sex) = sex {
                    record.insert("sex".into(), Value::from(*sex));
                }
                if let Some(weight) = weight {
                    record.insert("weight".into(), Value::from(weight.as_str()));
                }
                if let Some(strain) = strain {
                    record.insert("strain".into(), Value::from(strain.as_str()));
                }
                record
            })
            .collect();

        let table = TabularData::from_records(&records, &["participant_id"], &PARTICIPANT_COLUMNS);
        let expected: Vec<&str> = PARTICIPANT_COLUMNS
            .iter()
            .copied()
            .filter(|column| {
                *column == "participant_id"
                    || records.iter().any(|r| r.get(*column).is_some())
            })
            .collect();

        prop_assert_eq!(&table.columns[..expected.len()], expected.as_slice());
        prop_assert_eq!(
            table.columns.iter().any(|c| c == "weight"),
            rows.iter().any(|r| r.4.is_some())
        );
        prop_assert_eq!(table.rows.len(), records.len());
        for row in &table.rows {
            prop_assert_eq!(row.len(), table.columns.len());
        }
    }
}
