//! SQL text assembly for the `SELECT` statements issued by [`Database`](crate::Database)
//! and [`Model`](crate::Model).

use std::{fmt, str::FromStr};

use crate::Error;

/// Comparison operators accepted by [`Model::select_where`](crate::Model::select_where).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    NotLike,
    ILike,
}

impl Op {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "<>",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Like => "LIKE",
            Op::NotLike => "NOT LIKE",
            Op::ILike => "ILIKE",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for Op {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_uppercase();
        match normalized.as_str() {
            "=" | "==" => Ok(Op::Eq),
            "<>" | "!=" => Ok(Op::Ne),
            "<" => Ok(Op::Lt),
            "<=" => Ok(Op::Le),
            ">" => Ok(Op::Gt),
            ">=" => Ok(Op::Ge),
            "LIKE" => Ok(Op::Like),
            "NOT LIKE" => Ok(Op::NotLike),
            "ILIKE" => Ok(Op::ILike),
            _ => Err(Error::InvalidOperator(s.to_string())),
        }
    }
}

/// Builds `SELECT <columns> FROM <table>[ WHERE <filter>][ ORDER BY <order_by>]`.
///
/// An empty column list selects `*`. Empty `filter` and `order_by` fragments
/// are treated like `None`. Every part is interpolated verbatim.
pub fn select_sql(table: &str, columns: &[&str], filter: Option<&str>, order_by: Option<&str>) -> String {
    let columns = if columns.is_empty() { "*".to_string() } else { columns.join(", ") };
    let mut sql = format!("SELECT {} FROM {}", columns, table);

    if let Some(filter) = filter.filter(|f| !f.trim().is_empty()) {
        sql.push_str(" WHERE ");
        sql.push_str(filter);
    }

    if let Some(order_by) = order_by.filter(|o| !o.trim().is_empty()) {
        sql.push_str(" ORDER BY ");
        sql.push_str(order_by);
    }

    sql
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_defaults_to_all_columns() {
        assert_eq!(select_sql("option", &[], None, None), "SELECT * FROM option");
    }

    #[test]
    fn select_with_columns_and_order() {
        assert_eq!(
            select_sql("option", &["code", "value"], None, Some("code")),
            "SELECT code, value FROM option ORDER BY code"
        );
    }

    #[test]
    fn select_with_filter() {
        assert_eq!(
            select_sql("unms.ucrm.option", &[], Some("code = 'SITE_NAME'"), None),
            "SELECT * FROM unms.ucrm.option WHERE code = 'SITE_NAME'"
        );
        assert_eq!(
            select_sql("option", &["code"], Some("code = 'A'"), Some("code DESC")),
            "SELECT code FROM option WHERE code = 'A' ORDER BY code DESC"
        );
    }

    #[test]
    fn blank_fragments_are_omitted() {
        assert_eq!(select_sql("option", &[], Some(""), Some("  ")), "SELECT * FROM option");
    }

    #[test]
    fn operators_parse_from_sql_text() {
        assert_eq!("=".parse::<Op>().unwrap(), Op::Eq);
        assert_eq!("!=".parse::<Op>().unwrap(), Op::Ne);
        assert_eq!(">=".parse::<Op>().unwrap(), Op::Ge);
        assert_eq!("not  like".parse::<Op>().unwrap(), Op::NotLike);
        assert_eq!("ilike".parse::<Op>().unwrap(), Op::ILike);
        assert!(matches!("; DROP".parse::<Op>(), Err(Error::InvalidOperator(op)) if op == "; DROP"));
    }

    #[test]
    fn operators_render_as_sql() {
        assert_eq!(Op::Ne.to_string(), "<>");
        assert_eq!(Op::NotLike.as_sql(), "NOT LIKE");
    }
}
