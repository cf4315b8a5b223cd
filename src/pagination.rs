/// Keyset pagination cursors shared by every listing endpoint
///
/// A cursor is the last key of the previous page: `after_id` for id-ordered
/// listings, `after_date` for date-grouped ones. Nothing else about server
/// state is encoded.
use crate::error::{ApiError, ApiResult};
use chrono::NaiveDate;
use serde::Deserialize;

pub const DEFAULT_LIMIT: i64 = 30;

/// Earliest date the store accepts comfortably; stands in for "no cursor"
pub fn beginning_of_time() -> NaiveDate {
    NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or_default()
}

/// Raw query parameters as sent by the client
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<String>,
    pub after_id: Option<String>,
    pub after_date: Option<String>,
}

/// Parsed cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub after_id: Option<String>,
    pub after_date: Option<NaiveDate>,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            after_id: None,
            after_date: None,
        }
    }
}

impl Pagination {
    pub fn after_id(after_id: impl Into<String>, limit: i64) -> Self {
        Self {
            limit,
            after_id: Some(after_id.into()),
            after_date: None,
        }
    }

    pub fn after_date(after_date: NaiveDate, limit: i64) -> Self {
        Self {
            limit,
            after_id: None,
            after_date: Some(after_date),
        }
    }

    /// Build a cursor from query parameters.
    ///
    /// Non-numeric or negative limits fall back to the default; a malformed
    /// `after_date` is rejected.
    pub fn from_query(query: &PaginationQuery) -> ApiResult<Self> {
        let limit = query
            .limit
            .as_deref()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|v| *v >= 0)
            .unwrap_or(DEFAULT_LIMIT);

        let after_id = query
            .after_id
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        let after_date = match query.after_date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|_| ApiError::FailedToParseQueryParams)?,
            ),
        };

        Ok(Self {
            limit,
            after_id,
            after_date,
        })
    }

    /// Key to compare ids against; the empty string sorts before every id
    pub fn after_id_or_start(&self) -> &str {
        self.after_id.as_deref().unwrap_or("")
    }

    /// Date to compare against; missing means the beginning of time
    pub fn after_date_or_start(&self) -> NaiveDate {
        self.after_date.unwrap_or_else(beginning_of_time)
    }

    pub fn is_empty_page(&self) -> bool {
        self.limit == 0
    }
}
