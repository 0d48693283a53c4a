use crate::db;
use rusqlite::{params_from_iter, types::Value as SqlValue, Connection};
use serde_json::{Map, Number, Value};

/// Adapter-level failure. Handlers surface the code and message verbatim in
/// the response envelope; `not_found` is distinct so optional single-row
/// lookups can treat it as "absent" instead of an error.
#[derive(Debug, Clone)]
pub struct StorageError {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl StorageError {
    pub fn query(e: impl ToString) -> Self {
        StorageError {
            code: "db_query_failed",
            message: e.to_string(),
            details: None,
        }
    }

    pub fn write(table: &str, e: impl ToString) -> Self {
        StorageError {
            code: "db_update_failed",
            message: e.to_string(),
            details: Some(serde_json::json!({ "table": table })),
        }
    }

    pub fn not_found(table: &str) -> Self {
        StorageError {
            code: "not_found",
            message: format!("no matching row in {}", table),
            details: None,
        }
    }
}

type Row = Map<String, Value>;

enum Filter {
    Eq(String, Value),
    OrIlike(Vec<String>, String),
    Contains(String, Value),
    Gte(String, Value),
    Lte(String, Value),
}

struct JoinOne {
    table: String,
    fk_col: String,
    col: String,
}

/// Row-oriented query builder over the workspace database. Compiles the
/// filter surface the repositories use (eq / or-ilike / contains / gte /
/// lte / order / range / count / one-column join) to a single SQL statement
/// and materializes rows as snake_case JSON maps, decoding JSON-text and
/// integer-boolean columns per the schema registry in `db`.
pub struct Query {
    table: String,
    cols: Option<Vec<String>>,
    filters: Vec<Filter>,
    order: Vec<(String, bool)>,
    range: Option<(u64, u64)>,
    join: Option<JoinOne>,
}

impl Query {
    pub fn table(name: &str) -> Self {
        Query {
            table: name.to_string(),
            cols: None,
            filters: Vec::new(),
            order: Vec::new(),
            range: None,
            join: None,
        }
    }

    pub fn select(mut self, cols: &[&str]) -> Self {
        self.cols = Some(cols.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn eq(mut self, col: &str, val: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(col.to_string(), val.into()));
        self
    }

    /// Case-insensitive substring match over several columns, OR semantics.
    pub fn or_ilike(mut self, cols: &[&str], term: &str) -> Self {
        self.filters.push(Filter::OrIlike(
            cols.iter().map(|c| c.to_string()).collect(),
            term.to_string(),
        ));
        self
    }

    /// Membership test against a JSON-array column.
    pub fn contains(mut self, col: &str, val: impl Into<Value>) -> Self {
        self.filters
            .push(Filter::Contains(col.to_string(), val.into()));
        self
    }

    pub fn gte(mut self, col: &str, val: impl Into<Value>) -> Self {
        self.filters.push(Filter::Gte(col.to_string(), val.into()));
        self
    }

    pub fn lte(mut self, col: &str, val: impl Into<Value>) -> Self {
        self.filters.push(Filter::Lte(col.to_string(), val.into()));
        self
    }

    pub fn order(mut self, col: &str, ascending: bool) -> Self {
        self.order.push((col.to_string(), ascending));
        self
    }

    /// Zero-based inclusive row window for stateless paging.
    pub fn range(mut self, from: u64, to: u64) -> Self {
        self.range = Some((from, to));
        self
    }

    /// LEFT JOIN a single column from a related table, nested in the result
    /// row under the related table's name (`row["students"]["name"]`).
    pub fn join_one(mut self, table: &str, fk_col: &str, col: &str) -> Self {
        self.join = Some(JoinOne {
            table: table.to_string(),
            fk_col: fk_col.to_string(),
            col: col.to_string(),
        });
        self
    }

    fn where_clause(&self, params: &mut Vec<SqlValue>) -> String {
        let mut parts: Vec<String> = Vec::new();
        for f in &self.filters {
            match f {
                Filter::Eq(col, val) => {
                    parts.push(format!("{}.{} = ?", self.table, col));
                    params.push(bind_value(val));
                }
                Filter::OrIlike(cols, term) => {
                    let pattern = format!("%{}%", term.to_lowercase());
                    let clauses: Vec<String> = cols
                        .iter()
                        .map(|c| {
                            params.push(SqlValue::Text(pattern.clone()));
                            format!("LOWER({}.{}) LIKE ?", self.table, c)
                        })
                        .collect();
                    parts.push(format!("({})", clauses.join(" OR ")));
                }
                Filter::Contains(col, val) => {
                    parts.push(format!(
                        "EXISTS (SELECT 1 FROM json_each({}.{}) WHERE json_each.value = ?)",
                        self.table, col
                    ));
                    params.push(bind_value(val));
                }
                Filter::Gte(col, val) => {
                    parts.push(format!("{}.{} >= ?", self.table, col));
                    params.push(bind_value(val));
                }
                Filter::Lte(col, val) => {
                    parts.push(format!("{}.{} <= ?", self.table, col));
                    params.push(bind_value(val));
                }
            }
        }
        if parts.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", parts.join(" AND "))
        }
    }

    fn select_sql(&self, params: &mut Vec<SqlValue>) -> String {
        let projection = match &self.cols {
            Some(cols) => cols
                .iter()
                .map(|c| format!("{}.{}", self.table, c))
                .collect::<Vec<_>>()
                .join(", "),
            None => format!("{}.*", self.table),
        };
        let mut sql = format!("SELECT {}", projection);
        if let Some(j) = &self.join {
            sql.push_str(&format!(", {}.{} AS \"{}.{}\"", j.table, j.col, j.table, j.col));
        }
        sql.push_str(&format!(" FROM {}", self.table));
        if let Some(j) = &self.join {
            sql.push_str(&format!(
                " LEFT JOIN {} ON {}.{} = {}.id",
                j.table, self.table, j.fk_col, j.table
            ));
        }
        sql.push_str(&self.where_clause(params));
        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|(col, asc)| {
                    format!("{}.{} {}", self.table, col, if *asc { "ASC" } else { "DESC" })
                })
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(" ORDER BY {}", order));
        }
        if let Some((from, to)) = self.range {
            sql.push_str(&format!(" LIMIT {} OFFSET {}", to.saturating_sub(from) + 1, from));
        }
        sql
    }

    pub fn fetch(&self, conn: &Connection) -> Result<Vec<Row>, StorageError> {
        let mut params: Vec<SqlValue> = Vec::new();
        let sql = self.select_sql(&mut params);
        let mut stmt = conn.prepare(&sql).map_err(StorageError::query)?;
        let col_names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        let mut rows = stmt
            .query(params_from_iter(params))
            .map_err(StorageError::query)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(StorageError::query)? {
            out.push(materialize_row(&self.table, &col_names, row)?);
        }
        Ok(out)
    }

    pub fn fetch_optional(&self, conn: &Connection) -> Result<Option<Row>, StorageError> {
        Ok(self.fetch(conn)?.into_iter().next())
    }

    /// Coerce a one-row expectation; zero rows is a distinct `not_found`.
    pub fn fetch_one(&self, conn: &Connection) -> Result<Row, StorageError> {
        self.fetch_optional(conn)?
            .ok_or_else(|| StorageError::not_found(&self.table))
    }

    /// Exact row count under the same filters, ignoring order and range.
    pub fn count(&self, conn: &Connection) -> Result<u64, StorageError> {
        let mut params: Vec<SqlValue> = Vec::new();
        let where_sql = self.where_clause(&mut params);
        let sql = format!("SELECT COUNT(*) FROM {}{}", self.table, where_sql);
        conn.query_row(&sql, params_from_iter(params), |r| r.get::<_, i64>(0))
            .map(|n| n as u64)
            .map_err(StorageError::query)
    }
}

fn materialize_row(
    table: &str,
    col_names: &[String],
    row: &rusqlite::Row<'_>,
) -> Result<Row, StorageError> {
    let json_cols = db::json_columns(table);
    let bool_cols = db::bool_columns(table);
    let mut out = Row::new();
    for (i, name) in col_names.iter().enumerate() {
        let raw = row.get_ref(i).map_err(StorageError::query)?;
        let value = match raw {
            rusqlite::types::ValueRef::Null => Value::Null,
            rusqlite::types::ValueRef::Integer(n) => {
                if bool_cols.contains(&name.as_str()) {
                    Value::Bool(n != 0)
                } else {
                    Value::Number(Number::from(n))
                }
            }
            rusqlite::types::ValueRef::Real(f) => Number::from_f64(f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            rusqlite::types::ValueRef::Text(bytes) => {
                let text = std::str::from_utf8(bytes)
                    .map_err(StorageError::query)?
                    .to_string();
                if json_cols.contains(&name.as_str()) {
                    serde_json::from_str(&text).unwrap_or(Value::String(text))
                } else {
                    Value::String(text)
                }
            }
            rusqlite::types::ValueRef::Blob(_) => Value::Null,
        };
        // Joined columns come back qualified ("students.name") and nest
        // under the related table's name.
        if let Some((rel, col)) = name.split_once('.') {
            let entry = out
                .entry(rel.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(nested) = entry {
                nested.insert(col.to_string(), value);
            }
        } else {
            out.insert(name.clone(), value);
        }
    }
    Ok(out)
}

fn bind_value(val: &Value) -> SqlValue {
    match val {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(*b as i64),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Integer(i)
            } else {
                SqlValue::Real(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

pub fn insert(conn: &Connection, table: &str, row: Row) -> Result<Row, StorageError> {
    let id = row
        .get("id")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| StorageError::write(table, "insert row must carry an id"))?;
    let cols: Vec<&String> = row.keys().collect();
    let placeholders = vec!["?"; cols.len()].join(", ");
    let sql = format!(
        "INSERT INTO {}({}) VALUES({})",
        table,
        cols.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", "),
        placeholders
    );
    let params: Vec<SqlValue> = row.values().map(bind_value).collect();
    conn.execute(&sql, params_from_iter(params))
        .map_err(|e| StorageError::write(table, e))?;
    Query::table(table).eq("id", id).fetch_one(conn)
}

pub fn update(conn: &Connection, table: &str, id: &str, patch: Row) -> Result<Row, StorageError> {
    if patch.is_empty() {
        return Query::table(table).eq("id", id).fetch_one(conn);
    }
    let assignments = patch
        .keys()
        .map(|c| format!("{} = ?", c))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("UPDATE {} SET {} WHERE id = ?", table, assignments);
    let mut params: Vec<SqlValue> = patch.values().map(bind_value).collect();
    params.push(SqlValue::Text(id.to_string()));
    let affected = conn
        .execute(&sql, params_from_iter(params))
        .map_err(|e| StorageError::write(table, e))?;
    if affected == 0 {
        return Err(StorageError::not_found(table));
    }
    Query::table(table).eq("id", id).fetch_one(conn)
}

pub fn delete(conn: &Connection, table: &str, id: &str) -> Result<(), StorageError> {
    let sql = format!("DELETE FROM {} WHERE id = ?", table);
    conn.execute(&sql, [id])
        .map(|_| ())
        .map_err(|e| StorageError::write(table, e))
}

/// Composite-key upsert: insert each row, replacing the non-key columns when
/// the conflict target matches. All rows commit in one transaction, so the
/// batch is all-or-nothing from the caller's perspective.
pub fn upsert(
    conn: &Connection,
    table: &str,
    rows: Vec<Row>,
    on_conflict: &[&str],
) -> Result<Vec<Row>, StorageError> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| StorageError::write(table, e))?;
    let mut stored = Vec::with_capacity(rows.len());
    for row in rows {
        let cols: Vec<String> = row.keys().cloned().collect();
        let placeholders = vec!["?"; cols.len()].join(", ");
        let updates = cols
            .iter()
            .filter(|c| !on_conflict.contains(&c.as_str()) && *c != "id")
            .map(|c| format!("{} = excluded.{}", c, c))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {}({}) VALUES({}) ON CONFLICT({}) DO UPDATE SET {}",
            table,
            cols.join(", "),
            placeholders,
            on_conflict.join(", "),
            updates
        );
        let params: Vec<SqlValue> = row.values().map(bind_value).collect();
        tx.execute(&sql, params_from_iter(params))
            .map_err(|e| StorageError::write(table, e))?;

        let mut lookup = Query::table(table);
        for key in on_conflict {
            lookup = lookup.eq(key, row.get(*key).cloned().unwrap_or(Value::Null));
        }
        stored.push(lookup.fetch_one(&tx)?);
    }
    tx.commit().map_err(|e| StorageError::write(table, e))?;
    Ok(stored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_sql_composes_filters_order_and_range() {
        let mut params = Vec::new();
        let sql = Query::table("students")
            .or_ilike(&["name", "email"], "Ann")
            .contains("batch_ids", "b1")
            .order("name", true)
            .range(10, 19)
            .select_sql(&mut params);
        assert!(sql.starts_with("SELECT students.* FROM students WHERE"));
        assert!(sql.contains("LOWER(students.name) LIKE ?"));
        assert!(sql.contains("json_each(students.batch_ids)"));
        assert!(sql.contains("ORDER BY students.name ASC"));
        assert!(sql.ends_with("LIMIT 10 OFFSET 10"));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn join_one_nests_under_related_table() {
        let mut params = Vec::new();
        let sql = Query::table("attendance")
            .eq("batch_id", "b1")
            .join_one("students", "student_id", "name")
            .select_sql(&mut params);
        assert!(sql.contains("students.name AS \"students.name\""));
        assert!(sql.contains("LEFT JOIN students ON attendance.student_id = students.id"));
    }
}
