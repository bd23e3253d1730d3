//! DML table filtering via embedded stream comments.
//!
//! The upstream enforces the key range; table membership is decided
//! locally from a `/* _stream <table> ... */` comment embedded in
//! each streamed DML statement.

/// Marker preceding the table name in a streamed DML statement.
pub const STREAM_COMMENT_START: &str = "/* _stream ";

const DML_KEYWORDS: [&str; 3] = ["insert", "update", "delete"];

/// Decides whether a DML event belongs to this consumer.
#[derive(Debug, Clone, Default)]
pub struct TableFilter {
    tables: Vec<String>,
}

impl TableFilter {
    /// Filter for the given table list. An empty list matches every
    /// event.
    pub fn new(tables: Vec<String>) -> Self {
        Self { tables }
    }

    /// Match one DML event's statements against the configured
    /// tables.
    ///
    /// Statements whose first token is not a DML keyword are ignored.
    /// A recognized statement without a stream comment rejects the
    /// event: its target table cannot be established.
    pub fn matches(&self, sqls: &[String]) -> bool {
        if self.tables.is_empty() {
            return true;
        }
        for sql in sqls {
            let first_kw = sql.split(' ').next().unwrap_or("").trim();
            if !DML_KEYWORDS.contains(&first_kw) {
                continue;
            }
            let comment_index = match sql.find(STREAM_COMMENT_START) {
                Some(i) => i,
                None => return false,
            };
            let rest = &sql[comment_index + STREAM_COMMENT_START.len()..];
            let table_name = rest.split(' ').next().unwrap_or("").trim();
            if self.tables.iter().any(|t| t == table_name) {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(tables: &[&str]) -> TableFilter {
        TableFilter::new(tables.iter().map(|t| t.to_string()).collect())
    }

    fn sqls(stmts: &[&str]) -> Vec<String> {
        stmts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_table_list_matches_all() {
        let f = TableFilter::default();
        assert!(f.matches(&sqls(&["insert into anything (a) values (1)"])));
        assert!(f.matches(&[]));
    }

    #[test]
    fn test_stream_comment_match() {
        let f = filter(&["t"]);
        assert!(f.matches(&sqls(&[
            "insert into t (id) values (1) /* _stream t (id ) (1 ); */"
        ])));
        assert!(f.matches(&sqls(&[
            "update t set a=2 where id=1 /* _stream t (id ) (1 ); */"
        ])));
        assert!(f.matches(&sqls(&[
            "delete from t where id=1 /* _stream t (id ) (1 ); */"
        ])));
    }

    #[test]
    fn test_other_table_rejected() {
        let f = filter(&["t"]);
        assert!(!f.matches(&sqls(&[
            "insert into u (id) values (1) /* _stream u (id ) (1 ); */"
        ])));
    }

    #[test]
    fn test_missing_stream_comment_rejects() {
        // A recognized verb without the marker rejects the whole
        // event, even if a later statement would match.
        let f = filter(&["t"]);
        assert!(!f.matches(&sqls(&["insert into t (id) values (1)"])));
        assert!(!f.matches(&sqls(&[
            "insert into t (id) values (1)",
            "insert into t (id) values (2) /* _stream t (id ) (2 ); */",
        ])));
    }

    #[test]
    fn test_unrecognized_verbs_skipped() {
        let f = filter(&["t"]);
        assert!(!f.matches(&sqls(&["set timestamp=1700000000"])));
        assert!(!f.matches(&sqls(&[
            "set timestamp=1700000000",
            "flush logs",
        ])));
        // A skipped statement does not prevent a later match.
        assert!(f.matches(&sqls(&[
            "set timestamp=1700000000",
            "insert into t (id) values (1) /* _stream t (id ) (1 ); */",
        ])));
    }

    #[test]
    fn test_first_match_wins_across_tables() {
        let f = filter(&["a", "b"]);
        assert!(f.matches(&sqls(&[
            "insert into b (id) values (9) /* _stream b (id ) (9 ); */"
        ])));
    }

    #[test]
    fn test_reorder_does_not_change_outcome() {
        // With at most one matching statement, order is irrelevant.
        let f = filter(&["t"]);
        let forward = sqls(&[
            "set timestamp=1700000000",
            "insert into t (id) values (1) /* _stream t (id ) (1 ); */",
        ]);
        let reversed: Vec<String> = forward.iter().rev().cloned().collect();
        assert_eq!(f.matches(&forward), f.matches(&reversed));
    }
}
