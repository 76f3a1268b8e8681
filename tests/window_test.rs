/// Property tests for heatmap window derivation
use chat_timeline::models::{DailyCount, YearContribution};
use chat_timeline::timeline::window::WEEK_ROWS;
use chat_timeline::timeline::{ContributionCache, bucket_level, compute_window, rolling_bounds};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use proptest::prelude::*;

fn year_of_counts(year: i32, counts: &[u32]) -> YearContribution {
    let days = NaiveDate::from_ymd_opt(year, 1, 1)
        .unwrap()
        .iter_days()
        .take_while(|d| d.year() == year)
        .zip(counts.iter().cycle())
        .map(|(date, &count)| DailyCount { date, count })
        .collect();
    YearContribution::from_days(year, days)
}

proptest! {
    #[test]
    fn bucket_level_is_monotonic(a in 0u32..10_000, b in 0u32..10_000) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(bucket_level(lo) <= bucket_level(hi));
        prop_assert!(bucket_level(hi) <= 4);
    }

    #[test]
    fn rolling_total_matches_days_in_range(
        counts in proptest::collection::vec(0u32..20, 1..40),
        offset in 0i64..730,
    ) {
        let first = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let today = first + Duration::days(offset);
        let now = today.and_time(NaiveTime::from_hms_opt(9, 30, 0).unwrap());

        let mut cache = ContributionCache::new();
        for year in [2023, 2024] {
            cache.insert(year_of_counts(year, &counts));
        }

        let window = compute_window(&cache, None, now);
        let (start, end) = rolling_bounds(now);
        let expected: u64 = [2023, 2024]
            .iter()
            .filter_map(|&y| cache.get(y))
            .flat_map(|c| c.days.iter())
            .filter(|d| d.date >= start.date() && d.date <= end.date())
            .map(|d| u64::from(d.count))
            .sum();

        prop_assert_eq!(window.total(), expected);
        prop_assert!(window.cells.windows(2).all(|w| w[0].date < w[1].date));
        for (idx, cell) in window.cells.iter().enumerate() {
            prop_assert_eq!(cell.column, idx / WEEK_ROWS);
            prop_assert_eq!(cell.row, idx % WEEK_ROWS);
            prop_assert_eq!(cell.level, bucket_level(cell.count));
        }
    }

    #[test]
    fn year_window_covers_whole_year(year in 2000i32..2100) {
        let mut cache = ContributionCache::new();
        cache.insert(year_of_counts(year, &[1]));
        let now = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap().and_hms_opt(0, 0, 0).unwrap();

        let window = compute_window(&cache, Some(year), now);
        let days_in_year = NaiveDate::from_ymd_opt(year, 12, 31).unwrap().ordinal() as usize;
        prop_assert_eq!(window.cells.len(), days_in_year);
        prop_assert_eq!(window.total(), days_in_year as u64);
        prop_assert_eq!(window.month_labels.len(), 12);
        prop_assert_eq!(window.month_labels[0].column, 0);
    }
}
