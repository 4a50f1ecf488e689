//! Read-only projections for staff triage: status buckets and
//! customer lookup.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strsim::jaro_winkler;

use crate::models::{Consultation, ConsultationStatus};

/// Coarse status bucket for the triage list.
///
/// `Pending` is the staff-facing "waiting" bucket and covers both
/// `pending` and `scheduled` records.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Scheduled,
    InProgress,
    Completed,
    Declined,
}

impl StatusFilter {
    /// Statuses in this bucket; empty means no restriction.
    pub fn statuses(&self) -> Vec<ConsultationStatus> {
        match self {
            StatusFilter::All => Vec::new(),
            StatusFilter::Pending => {
                vec![ConsultationStatus::Pending, ConsultationStatus::Scheduled]
            }
            StatusFilter::Scheduled => vec![ConsultationStatus::Scheduled],
            StatusFilter::InProgress => vec![ConsultationStatus::InProgress],
            StatusFilter::Completed => vec![ConsultationStatus::Completed],
            StatusFilter::Declined => vec![ConsultationStatus::Declined],
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "" | "all" => Some(StatusFilter::All),
            "pending" => Some(StatusFilter::Pending),
            "scheduled" => Some(StatusFilter::Scheduled),
            "in_progress" => Some(StatusFilter::InProgress),
            "completed" => Some(StatusFilter::Completed),
            "declined" => Some(StatusFilter::Declined),
            _ => None,
        }
    }

    pub fn matches(&self, status: ConsultationStatus) -> bool {
        let statuses = self.statuses();
        statuses.is_empty() || statuses.contains(&status)
    }
}

/// Customer lookup: free text over name/email/phone and an exact DOB.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub dob: Option<NaiveDate>,
}

impl SearchQuery {
    pub fn text(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

/// Order search hits by how closely the full name matches the query.
/// Ties keep their incoming (newest-first) order.
pub fn rank_by_name(query: &str, mut hits: Vec<Consultation>) -> Vec<Consultation> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return hits;
    }
    let score = |c: &Consultation| {
        let full = c.full_name().to_lowercase();
        jaro_winkler(&query, &full)
            .max(jaro_winkler(&query, &c.first_name.to_lowercase()))
            .max(jaro_winkler(&query, &c.last_name.to_lowercase()))
    };
    hits.sort_by(|a, b| {
        score(b)
            .partial_cmp(&score(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::sample_consultation;
    use crate::models::LeaveType;

    #[test]
    fn test_pending_bucket_includes_scheduled() {
        let filter = StatusFilter::Pending;
        assert!(filter.matches(ConsultationStatus::Pending));
        assert!(filter.matches(ConsultationStatus::Scheduled));
        assert!(!filter.matches(ConsultationStatus::InProgress));
    }

    #[test]
    fn test_all_matches_everything() {
        assert!(StatusFilter::All.matches(ConsultationStatus::Declined));
        assert_eq!(StatusFilter::parse(""), Some(StatusFilter::All));
        assert_eq!(StatusFilter::parse("refunded"), None);
    }

    #[test]
    fn test_blank_query_text_is_none() {
        let query = SearchQuery {
            q: Some("   ".into()),
            dob: None,
        };
        assert!(query.text().is_none());
    }

    #[test]
    fn test_rank_prefers_closest_name() {
        let hits = vec![
            sample_consultation("Annabel", "Stone", LeaveType::Personal),
            sample_consultation("Ann", "Lee", LeaveType::Personal),
        ];
        let ranked = rank_by_name("ann lee", hits);
        assert_eq!(ranked[0].first_name, "Ann");
    }
}
