use crate::models::{
    AppData, DailyPoint, Insight, InsightKind, MoodEntry, StatsResponse, WeeklyAveragePoint,
};
use chrono::{Datelike, Duration, Local, NaiveDate};
use std::collections::BTreeMap;

const WEEK_COUNT: usize = 8;
const TREND_WINDOW_DAYS: i64 = 7;
const PATTERN_WINDOW_DAYS: i64 = 30;
const SHORT_SLEEP_HOURS: f32 = 6.0;
const MIN_MOOD_DIFFERENCE: f64 = 1.0;
const MIN_GROUP_DAYS: usize = 2;

pub fn build_stats(data: &AppData) -> StatsResponse {
    build_stats_at(Local::now().date_naive(), data)
}

pub fn build_stats_at(today: NaiveDate, data: &AppData) -> StatsResponse {
    let mut last_7_days = Vec::with_capacity(7);
    for offset in (0..7).rev() {
        let date = today - Duration::days(offset);
        let entry = entry_on(data, date);
        last_7_days.push(DailyPoint {
            date: date.to_string(),
            mood_score: entry.map(|entry| entry.form.mood_score),
            sleep_hours: entry.map(|entry| entry.form.sleep_hours),
        });
    }

    let current_week_start = week_start(today);
    let mut weekly_averages = Vec::with_capacity(WEEK_COUNT);

    for offset in (0..WEEK_COUNT).rev() {
        let start = current_week_start - Duration::weeks(offset as i64);
        let end = start + Duration::days(6);

        let entries: Vec<&MoodEntry> = (0..7)
            .filter_map(|day_offset| entry_on(data, start + Duration::days(day_offset)))
            .collect();

        weekly_averages.push(WeeklyAveragePoint {
            week: week_label(start),
            start_date: start.to_string(),
            end_date: end.to_string(),
            days_logged: entries.len() as u8,
            avg_mood: mean(entries.iter().map(|entry| f64::from(entry.form.mood_score))),
            avg_sleep: mean(entries.iter().map(|entry| f64::from(entry.form.sleep_hours))),
        });
    }

    StatsResponse {
        last_7_days,
        weekly_averages,
        insights: build_insights(today, data),
    }
}

fn build_insights(today: NaiveDate, data: &AppData) -> Vec<Insight> {
    let mut insights = Vec::new();

    let recent = entries_between(data, today - Duration::days(TREND_WINDOW_DAYS - 1), today);
    let previous_end = today - Duration::days(TREND_WINDOW_DAYS);
    let previous = entries_between(
        data,
        previous_end - Duration::days(TREND_WINDOW_DAYS - 1),
        previous_end,
    );
    if let (Some(recent_avg), Some(previous_avg)) = (mood_average(&recent), mood_average(&previous))
    {
        let change = recent_avg - previous_avg;
        if change >= MIN_MOOD_DIFFERENCE {
            insights.push(Insight {
                kind: InsightKind::MoodImproving,
                message: format!(
                    "Average mood is up {change:.1} points on the previous week ({previous_avg:.1} to {recent_avg:.1})."
                ),
            });
        } else if change <= -MIN_MOOD_DIFFERENCE {
            insights.push(Insight {
                kind: InsightKind::MoodDeclining,
                message: format!(
                    "Average mood is down {:.1} points on the previous week ({previous_avg:.1} to {recent_avg:.1}).",
                    -change
                ),
            });
        }
    }

    let window = entries_between(data, today - Duration::days(PATTERN_WINDOW_DAYS - 1), today);
    let (short, rested): (Vec<&MoodEntry>, Vec<&MoodEntry>) = window
        .iter()
        .copied()
        .partition(|entry| entry.form.sleep_hours < SHORT_SLEEP_HOURS);
    if short.len() >= MIN_GROUP_DAYS && rested.len() >= MIN_GROUP_DAYS {
        if let (Some(short_avg), Some(rested_avg)) = (mood_average(&short), mood_average(&rested)) {
            if rested_avg - short_avg >= MIN_MOOD_DIFFERENCE {
                insights.push(Insight {
                    kind: InsightKind::ShortSleepLowersMood,
                    message: format!(
                        "Mood averages {short_avg:.1} after less than {SHORT_SLEEP_HOURS} hours of sleep, versus {rested_avg:.1} otherwise."
                    ),
                });
            }
        }
    }

    let mut skill_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for entry in &window {
        for skill in entry.form.skills.iter().filter(|skill| skill.completed) {
            *skill_counts.entry(skill.name.as_str()).or_default() += 1;
        }
    }
    // Ties resolve to the alphabetically first name.
    if let Some((name, count)) = skill_counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
    {
        insights.push(Insight {
            kind: InsightKind::TopSkill,
            message: format!(
                "Most used skill in the last {PATTERN_WINDOW_DAYS} days: {name} ({count} days)."
            ),
        });
    }

    insights
}

fn entry_on(data: &AppData, date: NaiveDate) -> Option<&MoodEntry> {
    data.entries.get(&date_key(date))
}

fn entries_between(data: &AppData, start: NaiveDate, end: NaiveDate) -> Vec<&MoodEntry> {
    data.entries
        .range(date_key(start)..=date_key(end))
        .map(|(_, entry)| entry)
        .collect()
}

fn mood_average(entries: &[&MoodEntry]) -> Option<f64> {
    mean(entries.iter().map(|entry| f64::from(entry.form.mood_score)))
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0u32), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / f64::from(count))
    }
}

fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn week_label(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}
