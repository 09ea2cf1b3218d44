//! Unit tests for pagination and cached intake.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use mockall::Sequence;
use rstest::{fixture, rstest};

use super::models::test_support::ChangeBuilder;
use super::{
    CacheMode, Change, ChangeIntake, MockQueryExecutor, Paginator, QueryError, QueryKey,
    QueryPage, RecordSet, ReviewQuery,
};
use crate::persistence::{PersistenceError, ResultCache};
use crate::telemetry::TelemetryEvent;
use crate::telemetry::test_support::RecordingSink;

/// Cache held in memory that counts writes.
#[derive(Debug, Default)]
struct MemoryCache {
    entries: RefCell<HashMap<QueryKey, RecordSet>>,
    stores: Cell<usize>,
}

impl MemoryCache {
    fn seeded(key: &QueryKey, records: RecordSet) -> Self {
        let cache = Self::default();
        cache.entries.borrow_mut().insert(key.clone(), records);
        cache
    }
}

impl ResultCache for MemoryCache {
    fn load(&self, key: &QueryKey) -> Result<Option<RecordSet>, PersistenceError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn store(&self, key: &QueryKey, records: &RecordSet) -> Result<(), PersistenceError> {
        self.entries.borrow_mut().insert(key.clone(), records.clone());
        self.stores.set(self.stores.get() + 1);
        Ok(())
    }
}

/// Builds `count` changes whose creation times run backwards from `newest`.
fn descending_changes(prefix: &str, newest: i64, count: usize) -> Vec<Change> {
    (0..count)
        .map(|index| {
            let age = i64::try_from(index).expect("test index fits in i64");
            ChangeBuilder::new(format!("{prefix}{index}"), newest - age).build()
        })
        .collect()
}

fn expect_page(
    executor: &mut MockQueryExecutor,
    sequence: &mut Sequence,
    expected_offset: usize,
    page: QueryPage,
) {
    executor
        .expect_fetch_page()
        .withf(move |_, offset| *offset == expected_offset)
        .times(1)
        .in_sequence(sequence)
        .return_once(move |_, _| Ok(page));
}

#[fixture]
fn query() -> String {
    ReviewQuery::new("master").to_string()
}

#[rstest]
fn fetches_every_page_in_creation_order(query: String) {
    let mut executor = MockQueryExecutor::new();
    let mut sequence = Sequence::new();
    expect_page(
        &mut executor,
        &mut sequence,
        0,
        QueryPage {
            records: descending_changes("a", 3_000, 100),
            has_more: true,
        },
    );
    expect_page(
        &mut executor,
        &mut sequence,
        100,
        QueryPage {
            records: descending_changes("b", 2_000, 100),
            has_more: true,
        },
    );
    expect_page(
        &mut executor,
        &mut sequence,
        200,
        QueryPage {
            records: descending_changes("c", 1_000, 37),
            has_more: false,
        },
    );
    let telemetry = RecordingSink::default();

    let records = Paginator::new(&executor)
        .with_telemetry(&telemetry)
        .fetch_all(&query)
        .expect("pagination should succeed");

    assert_eq!(records.len(), 237, "record count mismatch");
    assert!(
        records.is_sorted_by_key(|change| change.created_on),
        "records must ascend by creation time"
    );
    let offsets: Vec<usize> = telemetry
        .take()
        .into_iter()
        .filter_map(|event| match event {
            TelemetryEvent::PageFetched { offset, .. } => Some(offset),
            _ => None,
        })
        .collect();
    assert_eq!(offsets, vec![0, 100, 200], "offset sequence mismatch");
}

#[rstest]
fn equal_creation_times_keep_fetch_order(query: String) {
    let mut executor = MockQueryExecutor::new();
    executor.expect_fetch_page().times(1).return_once(|_, _| {
        Ok(QueryPage {
            records: vec![
                ChangeBuilder::new("late", 20).build(),
                ChangeBuilder::new("tie-first", 10).build(),
                ChangeBuilder::new("tie-second", 10).build(),
            ],
            has_more: false,
        })
    });

    let records = Paginator::new(&executor)
        .fetch_all(&query)
        .expect("pagination should succeed");

    let ids: Vec<&str> = records.iter().map(|change| change.id.as_str()).collect();
    assert_eq!(ids, vec!["tie-first", "tie-second", "late"]);
}

#[rstest]
fn empty_first_page_is_an_empty_result(query: String) {
    let mut executor = MockQueryExecutor::new();
    executor
        .expect_fetch_page()
        .times(1)
        .return_once(|_, _| Ok(QueryPage::default()));

    let result = Paginator::new(&executor).fetch_all(&query);

    assert!(
        matches!(result, Err(QueryError::EmptyResult { .. })),
        "expected EmptyResult, got {result:?}"
    );
}

#[rstest]
fn empty_later_page_claiming_more_is_a_protocol_error(query: String) {
    let mut executor = MockQueryExecutor::new();
    let mut sequence = Sequence::new();
    expect_page(
        &mut executor,
        &mut sequence,
        0,
        QueryPage {
            records: descending_changes("a", 100, 2),
            has_more: true,
        },
    );
    expect_page(
        &mut executor,
        &mut sequence,
        2,
        QueryPage {
            records: Vec::new(),
            has_more: true,
        },
    );

    let result = Paginator::new(&executor).fetch_all(&query);

    assert!(
        matches!(result, Err(QueryError::Protocol { .. })),
        "expected Protocol, got {result:?}"
    );
}

#[rstest]
fn empty_result_leaves_the_cache_untouched(query: String) {
    let mut executor = MockQueryExecutor::new();
    executor
        .expect_fetch_page()
        .times(1)
        .return_once(|_, _| Ok(QueryPage::default()));
    let cache = MemoryCache::default();

    let result = ChangeIntake::new(&executor, &cache).load(&query, CacheMode::UseCache);

    assert!(
        matches!(result, Err(QueryError::EmptyResult { .. })),
        "expected EmptyResult, got {result:?}"
    );
    assert_eq!(cache.stores.get(), 0, "nothing should be cached");
}

#[rstest]
fn transport_failure_midway_discards_partial_results(query: String) {
    let mut executor = MockQueryExecutor::new();
    let mut sequence = Sequence::new();
    expect_page(
        &mut executor,
        &mut sequence,
        0,
        QueryPage {
            records: descending_changes("a", 100, 3),
            has_more: true,
        },
    );
    executor
        .expect_fetch_page()
        .withf(|_, offset| *offset == 3)
        .times(1)
        .in_sequence(&mut sequence)
        .return_once(|_, _| {
            Err(QueryError::Transport {
                message: "connection reset".to_owned(),
            })
        });
    let cache = MemoryCache::default();

    let result = ChangeIntake::new(&executor, &cache).load(&query, CacheMode::UseCache);

    assert_eq!(
        result,
        Err(QueryError::Transport {
            message: "connection reset".to_owned()
        })
    );
    assert_eq!(cache.stores.get(), 0, "partial results must not be cached");
}

#[rstest]
fn cache_hit_skips_the_executor(query: String) {
    let mut executor = MockQueryExecutor::new();
    executor.expect_fetch_page().never();
    let key = QueryKey::from_query(&query).expect("query key");
    let cached = descending_changes("cached", 500, 4);
    let cache = MemoryCache::seeded(&key, cached.clone());
    let telemetry = RecordingSink::default();

    let records = ChangeIntake::new(&executor, &cache)
        .with_telemetry(&telemetry)
        .load(&query, CacheMode::UseCache)
        .expect("cached load should succeed");

    assert_eq!(records, cached);
    assert_eq!(
        telemetry.take(),
        vec![TelemetryEvent::CacheHit {
            query_key: key.as_str().to_owned(),
            record_count: 4,
        }]
    );
}

#[rstest]
fn empty_cached_set_counts_as_a_miss(query: String) {
    let mut executor = MockQueryExecutor::new();
    executor.expect_fetch_page().times(1).return_once(|_, _| {
        Ok(QueryPage {
            records: descending_changes("fresh", 100, 1),
            has_more: false,
        })
    });
    let key = QueryKey::from_query(&query).expect("query key");
    let cache = MemoryCache::seeded(&key, RecordSet::new());

    let records = ChangeIntake::new(&executor, &cache)
        .load(&query, CacheMode::UseCache)
        .expect("load should succeed");

    assert_eq!(records.len(), 1);
    assert_eq!(cache.stores.get(), 1);
}

#[rstest]
fn refresh_bypasses_and_replaces_the_cache(query: String) {
    let fresh = descending_changes("fresh", 900, 2);
    let returned = fresh.clone();
    let mut executor = MockQueryExecutor::new();
    executor.expect_fetch_page().times(1).return_once(move |_, _| {
        Ok(QueryPage {
            records: returned,
            has_more: false,
        })
    });
    let key = QueryKey::from_query(&query).expect("query key");
    let cache = MemoryCache::seeded(&key, descending_changes("stale", 100, 5));
    let telemetry = RecordingSink::default();

    let records = ChangeIntake::new(&executor, &cache)
        .with_telemetry(&telemetry)
        .load(&query, CacheMode::Refresh)
        .expect("refresh should succeed");

    let mut expected = fresh;
    expected.sort_by_key(|change| change.created_on);
    assert_eq!(records, expected);
    assert_eq!(
        cache.load(&key).expect("cache readable"),
        Some(expected),
        "refresh should overwrite the entry"
    );
    let events = telemetry.take();
    assert!(
        events.contains(&TelemetryEvent::CacheStored {
            query_key: key.as_str().to_owned(),
            record_count: 2,
        }),
        "expected CacheStored in {events:?}"
    );
}

#[rstest]
fn blank_query_is_rejected_before_any_fetch() {
    let mut executor = MockQueryExecutor::new();
    executor.expect_fetch_page().never();
    let cache = MemoryCache::default();

    let result = ChangeIntake::new(&executor, &cache).load("   ", CacheMode::UseCache);

    assert_eq!(result, Err(QueryError::BlankQuery));
}
