//! SQL templates for the weekly engagement aggregates.
//!
//! Each metric has one template; the institution filter is the only
//! varying part. Filter values are integers taken from configuration, so
//! nothing user-supplied reaches the query text.

use crate::models::Group;
use std::fmt;

/// Institution membership clause applied to the `user` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstitutionFilter {
    /// No restriction.
    Any,
    /// Users outside the institution.
    Excluding(u32),
    /// Users of the institution.
    Only(u32),
}

impl InstitutionFilter {
    pub fn for_group(group: Group, institution_id: u32) -> Self {
        match group {
            Group::All => InstitutionFilter::Any,
            Group::GroupA => InstitutionFilter::Excluding(institution_id),
            Group::GroupB => InstitutionFilter::Only(institution_id),
        }
    }

    /// `AND ...` line, or an empty string when unfiltered.
    fn and_clause(&self) -> String {
        match self {
            InstitutionFilter::Any => String::new(),
            other => format!("\n  AND {}", other),
        }
    }

    /// Join that makes `u.institution_id` reachable from a fact table.
    fn user_join(&self, user_key: &str) -> String {
        match self {
            InstitutionFilter::Any => String::new(),
            _ => format!("\nLEFT JOIN user u ON {} = u.id", user_key),
        }
    }
}

impl fmt::Display for InstitutionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstitutionFilter::Any => write!(f, "TRUE"),
            InstitutionFilter::Excluding(id) => write!(f, "u.institution_id <> {}", id),
            InstitutionFilter::Only(id) => write!(f, "u.institution_id = {}", id),
        }
    }
}

/// Average number of distinct active days per user, per week.
pub fn days_query(filter: InstitutionFilter, lookback_days: u32) -> String {
    format!(
        "SELECT week, SUM(num_days) / COUNT(*) * 1.0E0 AS avg_num_days
FROM (
SELECT u.id, WEEK(ecm.date_created) + 1 AS week, COUNT(DISTINCT DATE(ecm.date_created)) AS num_days
FROM user u
LEFT JOIN education_completed_module ecm ON u.id = ecm.user_id
WHERE ecm.date_created >= NOW() - INTERVAL {lookback} DAY{filter}
GROUP BY u.id, WEEK(ecm.date_created)
) AS num_days_tab
GROUP BY week
ORDER BY week",
        lookback = lookback_days,
        filter = filter.and_clause(),
    )
}

/// Completed modules per week.
pub fn modules_query(filter: InstitutionFilter, lookback_days: u32) -> String {
    format!(
        "SELECT WEEK(ecm.date_created) + 1 AS week, COUNT(ecm.id) AS num_modules
FROM education_completed_module ecm{join}
WHERE ecm.date_created >= NOW() - INTERVAL {lookback} DAY{filter}
GROUP BY WEEK(ecm.date_created)
ORDER BY week",
        join = filter.user_join("ecm.user_id"),
        lookback = lookback_days,
        filter = filter.and_clause(),
    )
}

/// Executed referrals per week, attributed to the referred user.
pub fn referrals_query(filter: InstitutionFilter, lookback_days: u32) -> String {
    format!(
        "SELECT WEEK(rr.date_executed) + 1 AS week, COUNT(rr.referred_id) AS num_refer
FROM referral_relationship rr{join}
WHERE rr.date_executed >= NOW() - INTERVAL {lookback} DAY{filter}
GROUP BY WEEK(rr.date_executed)
ORDER BY week",
        join = filter.user_join("rr.referred_id"),
        lookback = lookback_days,
        filter = filter.and_clause(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_for_group() {
        assert_eq!(
            InstitutionFilter::for_group(Group::All, 90),
            InstitutionFilter::Any
        );
        assert_eq!(
            InstitutionFilter::for_group(Group::GroupA, 90),
            InstitutionFilter::Excluding(90)
        );
        assert_eq!(
            InstitutionFilter::for_group(Group::GroupB, 90),
            InstitutionFilter::Only(90)
        );
    }

    #[test]
    fn test_unfiltered_queries_have_no_institution_clause() {
        for sql in [
            days_query(InstitutionFilter::Any, 49),
            modules_query(InstitutionFilter::Any, 49),
            referrals_query(InstitutionFilter::Any, 49),
        ] {
            assert!(!sql.contains("institution_id"));
            assert!(sql.contains("INTERVAL 49 DAY"));
        }

        assert!(!modules_query(InstitutionFilter::Any, 49).contains("JOIN user"));
        assert!(!referrals_query(InstitutionFilter::Any, 49).contains("JOIN user"));
    }

    #[test]
    fn test_excluding_filter() {
        let filter = InstitutionFilter::Excluding(90);

        let days = days_query(filter, 49);
        assert!(days.contains("AND u.institution_id <> 90"));

        let modules = modules_query(filter, 49);
        assert!(modules.contains("LEFT JOIN user u ON ecm.user_id = u.id"));
        assert!(modules.contains("AND u.institution_id <> 90"));

        let referrals = referrals_query(filter, 49);
        assert!(referrals.contains("LEFT JOIN user u ON rr.referred_id = u.id"));
        assert!(referrals.contains("AND u.institution_id <> 90"));
    }

    #[test]
    fn test_only_filter() {
        let filter = InstitutionFilter::Only(7);
        for sql in [
            days_query(filter, 14),
            modules_query(filter, 14),
            referrals_query(filter, 14),
        ] {
            assert!(sql.contains("AND u.institution_id = 7"));
            assert!(sql.contains("INTERVAL 14 DAY"));
        }
    }

    #[test]
    fn test_days_query_shape() {
        let sql = days_query(InstitutionFilter::Any, 49);
        assert!(sql.starts_with("SELECT week, SUM(num_days) / COUNT(*) * 1.0E0 AS avg_num_days"));
        assert!(!sql.contains("CAST("));
        assert!(sql.contains("COUNT(DISTINCT DATE(ecm.date_created))"));
        assert!(sql.contains("GROUP BY u.id, WEEK(ecm.date_created)"));
    }
}
