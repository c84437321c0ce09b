//! Transaction history models and history query types.
//!
//! Every change to a balance appends exactly one `HistoryEntry`. Rows are
//! never updated or deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of history rows per page.
pub const PAGE_SIZE: i64 = 10;

/// Kind of balance-affecting event.
///
/// Stored as `transaction_type_id SMALLINT` so that rows written by other
/// tools with unknown ids can still be listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Credit,
    Reserve,
    PaidService,
    Refund,
}

impl TransactionKind {
    pub fn id(&self) -> i16 {
        match self {
            TransactionKind::Credit => 1,
            TransactionKind::Reserve => 2,
            TransactionKind::PaidService => 3,
            TransactionKind::Refund => 4,
        }
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            1 => Some(TransactionKind::Credit),
            2 => Some(TransactionKind::Reserve),
            3 => Some(TransactionKind::PaidService),
            4 => Some(TransactionKind::Refund),
            _ => None,
        }
    }
}

/// A row of the `transaction_history` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct HistoryEntry {
    pub id: i64,
    pub balance_id: i64,
    pub transaction_type_id: i16,

    /// Absent for credits
    pub service_id: Option<i64>,

    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn kind(&self) -> Option<TransactionKind> {
        TransactionKind::from_id(self.transaction_type_id)
    }

    /// Human-readable description of the event.
    pub fn label(&self) -> String {
        let service = self
            .service_id
            .map(|id| id.to_string())
            .unwrap_or_default();

        match self.kind() {
            Some(TransactionKind::Credit) => "funds credited".to_string(),
            Some(TransactionKind::Reserve) => {
                format!("funds reserved for service {service}")
            }
            Some(TransactionKind::PaidService) => {
                format!("funds debited for service {service}")
            }
            Some(TransactionKind::Refund) => {
                format!("funds returned for service {service}")
            }
            None => "unknown type".to_string(),
        }
    }
}

/// Data needed to append a history row.
#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
    pub balance_id: i64,
    pub kind: TransactionKind,
    pub service_id: Option<i64>,
    pub amount: i64,
}

/// Column used to order history rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    Amount,
}

impl SortField {
    /// Unsupported values fall back to `created_at`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("amount") => SortField::Amount,
            _ => SortField::CreatedAt,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::Amount => "amount",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Unsupported values fall back to `desc`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Raw query-string parameters of the history endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    /// Kept as text so that empty, negative or malformed values select the
    /// first page instead of rejecting the request.
    pub page: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

/// Normalized history query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryQuery {
    pub page: u32,
    pub sort: SortField,
    pub order: SortOrder,
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self {
            page: 1,
            sort: SortField::default(),
            order: SortOrder::default(),
        }
    }
}

impl HistoryQuery {
    pub fn new(page: u32, sort: SortField, order: SortOrder) -> Self {
        Self {
            page: page.max(1),
            sort,
            order,
        }
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.page.max(1)) - 1) * PAGE_SIZE
    }

    pub fn limit(&self) -> i64 {
        PAGE_SIZE
    }
}

impl From<HistoryParams> for HistoryQuery {
    fn from(params: HistoryParams) -> Self {
        HistoryQuery::new(
            parse_page(params.page.as_deref()),
            SortField::parse(params.sort.as_deref()),
            SortOrder::parse(params.order.as_deref()),
        )
    }
}

/// Page number from raw query text. Anything that is not an integer above 1
/// selects the first page.
fn parse_page(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .map(|page| page.clamp(1, i64::from(u32::MAX)) as u32)
        .unwrap_or(1)
}

/// History row as returned to API clients.
///
/// ```json
/// {
///   "transaction_type": "funds reserved for service 3",
///   "amount": 40,
///   "date": "2025-12-21"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub transaction_type: String,
    pub amount: i64,
    pub date: String,
}

impl From<&HistoryEntry> for HistoryItem {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            transaction_type: entry.label(),
            amount: entry.amount,
            date: entry.created_at.format("%Y-%m-%d").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(type_id: i16, service_id: Option<i64>) -> HistoryEntry {
        HistoryEntry {
            id: 1,
            balance_id: 1,
            transaction_type_id: type_id,
            service_id,
            amount: 40,
            created_at: Utc.with_ymd_and_hms(2025, 12, 21, 16, 30, 0).unwrap(),
        }
    }

    #[test]
    fn labels_per_kind() {
        assert_eq!(entry(1, None).label(), "funds credited");
        assert_eq!(entry(2, Some(3)).label(), "funds reserved for service 3");
        assert_eq!(entry(3, Some(3)).label(), "funds debited for service 3");
        assert_eq!(entry(4, Some(3)).label(), "funds returned for service 3");
        assert_eq!(entry(42, Some(3)).label(), "unknown type");
    }

    #[test]
    fn item_renders_date_only() {
        let item = HistoryItem::from(&entry(1, None));
        assert_eq!(item.date, "2025-12-21");
        assert_eq!(item.amount, 40);
    }

    #[test]
    fn page_one_and_below_start_at_zero() {
        assert_eq!(HistoryQuery::new(0, SortField::CreatedAt, SortOrder::Desc).offset(), 0);
        assert_eq!(HistoryQuery::new(1, SortField::CreatedAt, SortOrder::Desc).offset(), 0);
        assert_eq!(HistoryQuery::new(2, SortField::CreatedAt, SortOrder::Desc).offset(), 10);
        assert_eq!(HistoryQuery::new(5, SortField::Amount, SortOrder::Asc).offset(), 40);
    }

    #[test]
    fn unsupported_sort_and_order_fall_back() {
        let query = HistoryQuery::from(HistoryParams {
            page: None,
            sort: Some("id; DROP TABLE balances".to_string()),
            order: Some("sideways".to_string()),
        });

        assert_eq!(query, HistoryQuery::default());
    }

    #[test]
    fn empty_negative_and_malformed_pages_select_first_page() {
        for raw in ["", "0", "-1", "-500", "abc"] {
            let query = HistoryQuery::from(HistoryParams {
                page: Some(raw.to_string()),
                ..HistoryParams::default()
            });
            assert_eq!(query.page, 1, "page={raw:?}");
            assert_eq!(query.offset(), 0);
        }
    }

    #[test]
    fn supported_sort_and_order_are_kept() {
        let query = HistoryQuery::from(HistoryParams {
            page: Some("3".to_string()),
            sort: Some("amount".to_string()),
            order: Some("asc".to_string()),
        });

        assert_eq!(query.page, 3);
        assert_eq!(query.sort, SortField::Amount);
        assert_eq!(query.order, SortOrder::Asc);
    }
}
