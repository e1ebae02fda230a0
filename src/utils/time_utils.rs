use chrono::NaiveDate;

/// Returns every calendar day between `start` and `end`, inclusive.
pub fn get_days_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    if start > end {
        return Vec::new();
    }
    let mut days = Vec::new();
    let mut current = start;
    while current <= end {
        days.push(current);
        if let Some(next) = current.succ_opt() {
            current = next;
        } else {
            // Should not happen for typical date ranges
            break;
        }
    }
    days
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_days_between_inclusive() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let days = get_days_between(start, end);
        assert_eq!(days.len(), 5);
        assert_eq!(days[0], start);
        assert_eq!(days[4], end);
    }

    #[test]
    fn test_get_days_between_reversed_range_is_empty() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(get_days_between(start, end).is_empty());
    }
}
