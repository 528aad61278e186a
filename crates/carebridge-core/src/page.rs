//! Pagination envelope for windowed list results.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Metadata describing one window of a paginated list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PageMeta {
    /// Computes the envelope for a 1-based page over `total` items.
    ///
    /// # Errors
    ///
    /// Returns a validation error when `page` or `limit` is zero.
    pub fn compute(page: u32, limit: u32, total: u64) -> Result<Self, CoreError> {
        if page == 0 {
            return Err(CoreError::invalid_page("page must be >= 1"));
        }
        if limit == 0 {
            return Err(CoreError::invalid_page("limit must be >= 1"));
        }
        let total_pages = total.div_ceil(u64::from(limit));
        Ok(Self {
            page,
            limit,
            total,
            total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
            has_next: u64::from(page) * u64::from(limit) < total,
            has_prev: page > 1,
        })
    }

    /// The zero-based offset of this window.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

/// Explicit ordering for message history reads.
///
/// Full-history views read oldest-first; inbox-style views read the newest
/// window first. Both windows are returned in chronological order; the
/// ordering only decides which end of the history the window is cut from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MessageOrder {
    #[default]
    #[serde(rename = "asc")]
    ChronologicalAsc,
    #[serde(rename = "newest")]
    NewestFirst,
}

impl std::str::FromStr for MessageOrder {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::ChronologicalAsc),
            "newest" => Ok(Self::NewestFirst),
            other => Err(CoreError::InvalidOrder(other.to_string())),
        }
    }
}

impl std::fmt::Display for MessageOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ChronologicalAsc => write!(f, "asc"),
            Self::NewestFirst => write!(f, "newest"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_middle_page() {
        let meta = PageMeta::compute(2, 10, 25).unwrap();
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next);
        assert!(meta.has_prev);
        assert_eq!(meta.offset(), 10);
    }

    #[test]
    fn test_meta_first_and_last_page() {
        let first = PageMeta::compute(1, 10, 25).unwrap();
        assert!(first.has_next);
        assert!(!first.has_prev);

        let last = PageMeta::compute(3, 10, 25).unwrap();
        assert!(!last.has_next);
        assert!(last.has_prev);
    }

    #[test]
    fn test_meta_exact_multiple() {
        let meta = PageMeta::compute(2, 10, 20).unwrap();
        assert_eq!(meta.total_pages, 2);
        assert!(!meta.has_next);
    }

    #[test]
    fn test_meta_empty_list() {
        let meta = PageMeta::compute(1, 10, 0).unwrap();
        assert_eq!(meta.total_pages, 0);
        assert!(!meta.has_next);
        assert!(!meta.has_prev);
    }

    #[test]
    fn test_meta_rejects_zero() {
        assert!(PageMeta::compute(0, 10, 25).is_err());
        assert!(PageMeta::compute(1, 0, 25).is_err());
    }

    #[test]
    fn test_order_parse() {
        assert_eq!(
            "asc".parse::<MessageOrder>().unwrap(),
            MessageOrder::ChronologicalAsc
        );
        assert_eq!(
            "NEWEST".parse::<MessageOrder>().unwrap(),
            MessageOrder::NewestFirst
        );
        assert!("random".parse::<MessageOrder>().is_err());
    }
}
