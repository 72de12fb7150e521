use sqlx::MySqlPool;

use crate::error::LeaveError;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    Bool(bool),
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
///
/// Column names must come from code, never from request payloads.
pub fn build_update_sql(
    table: &str,
    assignments: Vec<(&'static str, SqlValue)>,
    id_column: &str,
    id_value: &str,
) -> Result<SqlUpdate, LeaveError> {
    if assignments.is_empty() {
        return Err(LeaveError::validation("No fields provided for update"));
    }

    let set_clause = assignments
        .iter()
        .map(|(column, _)| format!("{} = ?", column))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!("UPDATE {} SET {} WHERE {} = ?", table, set_clause, id_column);

    let mut values: Vec<SqlValue> = assignments.into_iter().map(|(_, v)| v).collect();

    // WHERE id = ?
    values.push(SqlValue::String(id_value.to_string()));

    Ok(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_set_clause_in_order() {
        let update = build_update_sql(
            "profiles",
            vec![
                ("full_name", SqlValue::String("Jane".into())),
                ("is_active", SqlValue::Bool(false)),
            ],
            "id",
            "e1",
        )
        .unwrap();

        assert_eq!(update.sql, "UPDATE profiles SET full_name = ?, is_active = ? WHERE id = ?");
        assert_eq!(update.values.last(), Some(&SqlValue::String("e1".into())));
        assert_eq!(update.values.len(), 3);
    }

    #[test]
    fn rejects_empty_updates() {
        assert!(build_update_sql("profiles", Vec::new(), "id", "e1").is_err());
    }
}
