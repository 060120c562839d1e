//! crates/study_planner_core/src/stats.rs
//!
//! Study statistics: totals, the last seven days, and breakdowns by category
//! and priority. Only completed sessions count towards studied minutes.

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::{Priority, StudyPlanItem};

const CATEGORY_PALETTE: [&str; 7] = [
    "#2196F3", "#FF5722", "#4CAF50", "#9C27B0", "#FF9800", "#00BCD4", "#E91E63",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStatistic {
    pub date: NaiveDate,
    pub day_name: String,
    pub total_minutes: u64,
    pub plan_count: usize,
    pub completed_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStatistic {
    pub category_name: String,
    pub total_minutes: u64,
    pub plan_count: usize,
    pub completed_count: usize,
    pub color: String,
}

impl CategoryStatistic {
    pub fn hours(&self) -> f64 {
        self.total_minutes as f64 / 60.0
    }

    pub fn completion_rate(&self) -> f64 {
        rate(self.completed_count, self.plan_count)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityStatistic {
    pub priority: Priority,
    pub total_minutes: u64,
    pub plan_count: usize,
    pub completed_count: usize,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanStatistics {
    pub total_plans: usize,
    pub completed_plans: usize,
    /// Percentage in `0.0..=100.0`.
    pub completion_rate: f64,
    pub total_study_minutes: u64,
    pub weekly: Vec<DailyStatistic>,
    pub categories: Vec<CategoryStatistic>,
    pub priorities: Vec<PriorityStatistic>,
    pub most_studied_category: String,
}

impl PlanStatistics {
    /// Computes every figure shown on the statistics screen. `today` closes the
    /// seven-day window.
    pub fn compute(items: &[StudyPlanItem], today: NaiveDate) -> Self {
        let completed: Vec<&StudyPlanItem> = items.iter().filter(|i| i.is_completed).collect();
        let categories = category_stats(items);
        let most_studied_category = categories
            .first()
            .map(|c| c.category_name.clone())
            .unwrap_or_else(|| "None".to_string());

        Self {
            total_plans: items.len(),
            completed_plans: completed.len(),
            completion_rate: rate(completed.len(), items.len()),
            total_study_minutes: completed_minutes(completed.iter().copied()),
            weekly: weekly_stats(items, today),
            categories,
            priorities: priority_stats(items),
            most_studied_category,
        }
    }

    pub fn total_study_hours(&self) -> f64 {
        self.total_study_minutes as f64 / 60.0
    }
}

fn rate(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Summed as `u64`: individual durations may be anything up to `u32::MAX`.
fn completed_minutes<'a>(items: impl IntoIterator<Item = &'a StudyPlanItem>) -> u64 {
    items
        .into_iter()
        .filter(|i| i.is_completed)
        .map(|i| u64::from(i.duration_minutes))
        .sum()
}

fn weekly_stats(items: &[StudyPlanItem], today: NaiveDate) -> Vec<DailyStatistic> {
    (0..7)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            let day: Vec<&StudyPlanItem> =
                items.iter().filter(|i| i.date.date() == date).collect();
            DailyStatistic {
                date,
                day_name: date.format("%a").to_string(),
                total_minutes: completed_minutes(day.iter().copied()),
                plan_count: day.len(),
                completed_count: day.iter().filter(|i| i.is_completed).count(),
            }
        })
        .collect()
}

/// Ordered by completed minutes, highest first. Uncategorised items are skipped.
fn category_stats(items: &[StudyPlanItem]) -> Vec<CategoryStatistic> {
    let mut groups: BTreeMap<&str, Vec<&StudyPlanItem>> = BTreeMap::new();
    for item in items.iter().filter(|i| !i.category.trim().is_empty()) {
        groups.entry(item.category.as_str()).or_default().push(item);
    }

    let mut stats: Vec<CategoryStatistic> = groups
        .into_iter()
        .map(|(name, group)| CategoryStatistic {
            category_name: name.to_string(),
            total_minutes: completed_minutes(group.iter().copied()),
            plan_count: group.len(),
            completed_count: group.iter().filter(|i| i.is_completed).count(),
            color: category_color(name).to_string(),
        })
        .collect();
    stats.sort_by(|a, b| b.total_minutes.cmp(&a.total_minutes));
    stats
}

fn priority_stats(items: &[StudyPlanItem]) -> Vec<PriorityStatistic> {
    Priority::ALL
        .iter()
        .filter_map(|&priority| {
            let group: Vec<&StudyPlanItem> =
                items.iter().filter(|i| i.priority == priority).collect();
            if group.is_empty() {
                return None;
            }
            Some(PriorityStatistic {
                priority,
                total_minutes: completed_minutes(group.iter().copied()),
                plan_count: group.len(),
                completed_count: group.iter().filter(|i| i.is_completed).count(),
                color: priority_color(priority).to_string(),
            })
        })
        .collect()
}

pub fn priority_color(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "#4CAF50",
        Priority::Medium => "#FF9800",
        Priority::High => "#F44336",
        Priority::Critical => "#9C27B0",
    }
}

/// Stable palette slot for a category name.
pub fn category_color(name: &str) -> &'static str {
    let hash = name
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
    CATEGORY_PALETTE[hash as usize % CATEGORY_PALETTE.len()]
}
