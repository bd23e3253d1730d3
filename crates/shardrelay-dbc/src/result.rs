//! Query result model shared by all client implementations.

/// Result of one `execute` call.
///
/// Row values are rendered as text the way the server would print
/// them; `None` is SQL NULL. `fields` is populated only when the
/// caller asked for field names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    /// Column names, in select order.
    pub fields: Vec<String>,
    /// Rows changed by a DML statement.
    pub rows_affected: u64,
    /// Auto-increment id assigned by an INSERT, zero otherwise.
    pub insert_id: u64,
    /// Result rows.
    pub rows: Vec<Vec<Option<String>>>,
}

impl QueryResult {
    /// The synthetic one-row result the dry-run client reports for
    /// every statement.
    pub fn synthetic() -> Self {
        Self {
            rows_affected: 1,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_result() {
        let qr = QueryResult::synthetic();
        assert_eq!(qr.rows_affected, 1);
        assert_eq!(qr.insert_id, 0);
        assert!(qr.rows.is_empty());
        assert!(qr.fields.is_empty());
    }
}
