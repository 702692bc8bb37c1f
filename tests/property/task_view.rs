//! Property tests for the dashboard view-model.
//!
//! Uses proptest to verify, for arbitrary task lists, filters and queries:
//! 1. The visible list is an order-preserving subsequence of the input.
//! 2. Every visible task passes both the filter and the query.
//! 3. Stats ignore the filter and the query, and their buckets sum to the total.
//! 4. `All` with an empty (or blank) query shows everything.
//! 5. Query matching is case-insensitive and ignores surrounding whitespace.
//! 6. The completion rate stays within 0..=100.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::NaiveDate;
use proptest::prelude::*;
use taskflow::tasks::{StatusFilter, TaskStats, derive_view, visible_tasks};
use taskflow_proto::auth::UserId;
use taskflow_proto::task::{Priority, Task, TaskId, TaskStatus};
use uuid::Uuid;

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Todo),
        Just(TaskStatus::InProgress),
        Just(TaskStatus::Completed),
    ]
}

fn arb_filter() -> impl Strategy<Value = StatusFilter> {
    prop_oneof![
        Just(StatusFilter::All),
        Just(StatusFilter::Todo),
        Just(StatusFilter::InProgress),
        Just(StatusFilter::Completed),
    ]
}

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![Just(Priority::Low), Just(Priority::Medium), Just(Priority::High)]
}

/// Short words from a small alphabet so queries actually hit.
fn arb_text() -> impl Strategy<Value = String> {
    "[a-dA-D ]{0,12}"
}

fn arb_task() -> impl Strategy<Value = Task> {
    (
        arb_text(),
        arb_text(),
        prop::option::of("[a-dA-D]{1,6}"),
        arb_priority(),
        arb_status(),
        prop::option::of(0u32..400),
        any::<u128>(),
    )
        .prop_map(
            |(title, description, category, priority, status, due, owner)| Task {
                id: TaskId::new("0"),
                title,
                description,
                priority,
                status,
                due_date: due.and_then(|d| {
                    NaiveDate::from_ymd_opt(2025, 1, 1)?
                        .checked_add_days(chrono::Days::new(u64::from(d)))
                }),
                category,
                user_id: UserId::from_uuid(Uuid::from_u128(owner)),
                created_at: None,
            },
        )
}

/// Task lists with unique ids assigned by position.
fn arb_tasks() -> impl Strategy<Value = Vec<Task>> {
    prop::collection::vec(arb_task(), 0..24).prop_map(|mut tasks| {
        for (i, task) in tasks.iter_mut().enumerate() {
            task.id = TaskId::new(i.to_string());
        }
        tasks
    })
}

fn haystack(task: &Task) -> String {
    format!(
        "{} {} {}",
        task.title,
        task.description,
        task.category.as_deref().unwrap_or("")
    )
    .to_lowercase()
}

proptest! {
    /// Visible tasks appear in the same relative order as the input.
    #[test]
    fn visible_is_ordered_subsequence(
        tasks in arb_tasks(),
        filter in arb_filter(),
        query in arb_text(),
    ) {
        let view = derive_view(&tasks, filter, &query);
        let positions: Vec<usize> = view
            .visible
            .iter()
            .map(|v| tasks.iter().position(|t| t.id == v.id).expect("visible task comes from input"))
            .collect();
        prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    /// Every visible task passes the filter and contains the query; every
    /// hidden task fails one of them.
    #[test]
    fn visibility_matches_predicate(
        tasks in arb_tasks(),
        filter in arb_filter(),
        query in arb_text(),
    ) {
        let needle = query.trim().to_lowercase();
        let visible = visible_tasks(&tasks, filter, &query);
        for task in &tasks {
            let expected = filter.matches(task.status)
                && (needle.is_empty() || haystack(task).contains(&needle));
            let shown = visible.iter().any(|v| v.id == task.id);
            prop_assert_eq!(shown, expected, "task {:?}", task.title);
        }
    }

    /// Stats are computed over the full list, whatever the filter and query.
    #[test]
    fn stats_ignore_filter_and_query(
        tasks in arb_tasks(),
        filter in arb_filter(),
        query in arb_text(),
    ) {
        let view = derive_view(&tasks, filter, &query);
        prop_assert_eq!(view.stats, TaskStats::from_tasks(&tasks));
        prop_assert_eq!(view.stats.total, tasks.len());
        prop_assert_eq!(
            view.stats.todo + view.stats.in_progress + view.stats.completed,
            view.stats.total
        );
        prop_assert!(view.visible.len() <= view.stats.total);
    }

    /// `All` with a blank query is the identity.
    #[test]
    fn all_with_blank_query_shows_everything(tasks in arb_tasks(), blank in "[ \t]{0,4}") {
        let visible = visible_tasks(&tasks, StatusFilter::All, &blank);
        prop_assert_eq!(visible.len(), tasks.len());
    }

    /// Changing the query's case or padding does not change the result.
    #[test]
    fn query_case_and_padding_insensitive(
        tasks in arb_tasks(),
        filter in arb_filter(),
        query in arb_text(),
    ) {
        let lower = visible_tasks(&tasks, filter, &query.to_lowercase());
        let upper = visible_tasks(&tasks, filter, &format!("  {}  ", query.to_uppercase()));
        prop_assert_eq!(lower, upper);
    }

    /// Completion rate is a percentage and zero for an empty list.
    #[test]
    fn completion_rate_is_a_percentage(tasks in arb_tasks()) {
        let stats = TaskStats::from_tasks(&tasks);
        let rate = stats.completion_rate();
        prop_assert!(rate <= 100);
        if tasks.is_empty() {
            prop_assert_eq!(rate, 0);
        }
        if stats.total > 0 && stats.completed == stats.total {
            prop_assert_eq!(rate, 100);
        }
    }
}

#[test]
fn completion_rate_rounds_half_up() {
    let stats = TaskStats {
        total: 8,
        completed: 1,
        in_progress: 0,
        todo: 7,
    };
    // 12.5% rounds to 13.
    assert_eq!(stats.completion_rate(), 13);

    let stats = TaskStats {
        total: 3,
        completed: 1,
        in_progress: 1,
        todo: 1,
    };
    assert_eq!(stats.completion_rate(), 33);
}
