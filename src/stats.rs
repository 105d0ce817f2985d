use chrono::{DateTime, Days, Utc};

use crate::dream_entry::DreamEntry;

const WEEK_SECONDS: f64 = 7.0 * 24.0 * 60.0 * 60.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DreamStats {
    pub total: usize,
    pub this_week: usize,
    pub average_per_week: f64,
}

/// Summary figures for the journal header. `entries` must be in creation
/// order: the average is measured from the first entry's date.
pub fn stats(entries: &[DreamEntry], now: DateTime<Utc>) -> DreamStats {
    let Some(first) = entries.first() else {
        return DreamStats {
            total: 0,
            this_week: 0,
            average_per_week: 0.0,
        };
    };

    let today = now.date_naive();
    let week_start = today.checked_sub_days(Days::new(7)).unwrap_or(today);
    let this_week = entries.iter().filter(|e| e.date >= week_start).count();

    let oldest = first.date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
    let elapsed = (now - oldest).num_seconds() as f64;
    let weeks = (elapsed / WEEK_SECONDS).ceil().max(1.0);

    DreamStats {
        total: entries.len(),
        this_week,
        average_per_week: entries.len() as f64 / weeks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dream_entry::Mood;
    use chrono::{NaiveDate, TimeZone};

    fn dated(id: u64, y: i32, m: u32, d: u32) -> DreamEntry {
        DreamEntry {
            id,
            title: "t".into(),
            description: "d".into(),
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            mood: Mood::Neutral,
            tags: Vec::new(),
        }
    }

    fn noon(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn empty_journal_is_all_zero() {
        let s = stats(&[], noon(2024, 1, 8));
        assert_eq!(
            s,
            DreamStats {
                total: 0,
                this_week: 0,
                average_per_week: 0.0
            }
        );
    }

    #[test]
    fn seven_days_ago_counts_eight_does_not() {
        let entries = [dated(1, 2023, 12, 31), dated(2, 2024, 1, 1), dated(3, 2024, 1, 8)];
        let s = stats(&entries, noon(2024, 1, 8));
        assert_eq!(s.total, 3);
        assert_eq!(s.this_week, 2);
    }

    #[test]
    fn average_uses_whole_weeks_since_first_entry() {
        // 15.5 days after the first entry rounds up to three weeks.
        let entries = [
            dated(1, 2024, 1, 1),
            dated(2, 2024, 1, 5),
            dated(3, 2024, 1, 10),
        ];
        let s = stats(&entries, noon(2024, 1, 16));
        assert!((s.average_per_week - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn average_never_divides_by_less_than_one_week() {
        let entries = [dated(1, 2024, 1, 8), dated(2, 2024, 1, 8)];
        let s = stats(&entries, noon(2024, 1, 8));
        assert!((s.average_per_week - 2.0).abs() < f64::EPSILON);

        // first entry dated in the future
        let entries = [dated(1, 2024, 2, 1)];
        let s = stats(&entries, noon(2024, 1, 8));
        assert!((s.average_per_week - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn average_follows_storage_order_not_oldest_date() {
        let entries = [dated(1, 2024, 1, 8), dated(2, 2023, 1, 1)];
        let s = stats(&entries, noon(2024, 1, 8));
        assert!((s.average_per_week - 2.0).abs() < f64::EPSILON);
    }
}
