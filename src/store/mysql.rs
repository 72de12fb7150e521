use chrono::Days;
use sqlx::{MySql, MySqlConnection, MySqlPool, QueryBuilder};
use tracing::{debug, error};

use crate::error::LeaveError;
use crate::leave::ledger::deduct;
use crate::model::balance::{
    AdjustmentKind, BalanceAdjustment, BalanceAdjustmentRow, BalanceDebit, BalancePool,
};
use crate::model::leave_request::{LeaveFilter, LeaveRecord, LeaveRecordRow, LeaveRequest};
use crate::model::profile::{Profile, ProfileFilter, ProfilePatch, ProfileRow};
use crate::store::RecordStore;
use crate::utils::db_utils::{SqlValue, build_update_sql, execute_update};

const PROFILE_COLUMNS: &str = "id, email, full_name, department, role, is_active, \
     annual_leave_balance, sick_leave_balance, created_at";

const RECORD_SELECT: &str = r#"
    SELECT
        lr.id, lr.employee_id, lr.leave_type, lr.start_date, lr.end_date, lr.duration,
        lr.reason, lr.status, lr.manager_comments, lr.approved_by, lr.approved_at,
        lr.created_at, p.full_name, p.department
    FROM leave_requests lr
    LEFT JOIN profiles p ON p.id = lr.employee_id
"#;

const ADJUSTMENT_COLUMNS: &str = "id, employee_id, pool, kind, delta, balance_after, \
     request_id, actor_id, created_at";

/// MySQL-backed record store.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

fn is_duplicate_key(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23000"))
}

fn push_leave_filter(qb: &mut QueryBuilder<'_, MySql>, filter: &LeaveFilter) {
    qb.push(" WHERE 1=1");

    if let Some(employee_id) = &filter.employee_id {
        qb.push(" AND lr.employee_id = ").push_bind(employee_id.clone());
    }
    if let Some(status) = filter.status {
        qb.push(" AND lr.status = ").push_bind(status.as_ref().to_string());
    }
    if let Some(from) = filter.created_from {
        qb.push(" AND lr.created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.created_to.and_then(|to| to.checked_add_days(Days::new(1))) {
        qb.push(" AND lr.created_at < ").push_bind(to);
    }
}

fn push_profile_filter(qb: &mut QueryBuilder<'_, MySql>, filter: &ProfileFilter) {
    qb.push(" WHERE 1=1");

    if let Some(role) = filter.role {
        qb.push(" AND role = ").push_bind(role.as_ref().to_string());
    }
    if let Some(department) = &filter.department {
        qb.push(" AND department = ").push_bind(department.clone());
    }
    if let Some(active) = filter.is_active {
        qb.push(" AND is_active = ").push_bind(active);
    }
    if let Some(search) = &filter.search {
        let like = format!("%{}%", search.to_lowercase());
        qb.push(" AND (LOWER(full_name) LIKE ")
            .push_bind(like.clone())
            .push(" OR LOWER(email) LIKE ")
            .push_bind(like)
            .push(")");
    }
}

fn push_page(qb: &mut QueryBuilder<'_, MySql>, limit: Option<u64>, offset: u64) {
    if let Some(limit) = limit {
        qb.push(" LIMIT ").push_bind(limit).push(" OFFSET ").push_bind(offset);
    }
}

#[allow(clippy::too_many_arguments)]
async fn insert_adjustment(
    conn: &mut MySqlConnection,
    employee_id: &str,
    pool: BalancePool,
    kind: AdjustmentKind,
    delta: f64,
    balance_after: f64,
    request_id: Option<&str>,
    actor_id: Option<&str>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO balance_adjustments
            (employee_id, pool, kind, delta, balance_after, request_id, actor_id)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(pool.as_ref())
    .bind(kind.as_ref())
    .bind(delta)
    .bind(balance_after)
    .bind(request_id)
    .bind(actor_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_id())
}

/// Locks the profile row and returns the current value of one pool.
async fn lock_balance(
    conn: &mut MySqlConnection,
    employee_id: &str,
    pool: BalancePool,
) -> Result<f64, LeaveError> {
    let sql = format!(
        "SELECT {} FROM profiles WHERE id = ? FOR UPDATE",
        pool.column()
    );
    sqlx::query_scalar::<_, f64>(&sql)
        .bind(employee_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| LeaveError::not_found("profile", employee_id))
}

async fn write_balance(
    conn: &mut MySqlConnection,
    employee_id: &str,
    pool: BalancePool,
    value: f64,
) -> Result<(), sqlx::Error> {
    let sql = format!("UPDATE profiles SET {} = ? WHERE id = ?", pool.column());
    sqlx::query(&sql)
        .bind(value)
        .bind(employee_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn debit_locked(conn: &mut MySqlConnection, debit: &BalanceDebit) -> Result<f64, LeaveError> {
    let available = lock_balance(conn, &debit.employee_id, debit.pool).await?;
    let remaining = deduct(debit.pool, available, debit.amount)?;

    write_balance(conn, &debit.employee_id, debit.pool, remaining).await?;
    insert_adjustment(
        conn,
        &debit.employee_id,
        debit.pool,
        AdjustmentKind::LeaveApproved,
        -debit.amount,
        remaining,
        debit.request_id.as_deref(),
        debit.actor_id.as_deref(),
    )
    .await?;

    Ok(remaining)
}

async fn fetch_adjustment(conn: &mut MySqlConnection, id: u64) -> Result<BalanceAdjustment, LeaveError> {
    let sql = format!("SELECT {} FROM balance_adjustments WHERE id = ?", ADJUSTMENT_COLUMNS);
    let row = sqlx::query_as::<_, BalanceAdjustmentRow>(&sql)
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    row.try_into()
}

fn patch_assignments(patch: &ProfilePatch) -> Vec<(&'static str, SqlValue)> {
    let mut assignments = Vec::new();
    if let Some(name) = &patch.full_name {
        assignments.push(("full_name", SqlValue::String(name.clone())));
    }
    if let Some(department) = &patch.department {
        assignments.push(("department", SqlValue::String(department.clone())));
    }
    if let Some(role) = patch.role {
        assignments.push(("role", SqlValue::String(role.as_ref().to_string())));
    }
    if let Some(active) = patch.is_active {
        assignments.push(("is_active", SqlValue::Bool(active)));
    }
    assignments
}

impl RecordStore for MySqlStore {
    async fn insert_profile(&self, profile: &Profile) -> Result<Profile, LeaveError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO profiles
                (id, email, full_name, department, role, is_active,
                 annual_leave_balance, sick_leave_balance, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&profile.id)
        .bind(&profile.email)
        .bind(&profile.full_name)
        .bind(&profile.department)
        .bind(profile.role.as_ref())
        .bind(profile.is_active)
        .bind(profile.annual_leave_balance)
        .bind(profile.sick_leave_balance)
        .bind(profile.created_at)
        .execute(&mut *tx)
        .await;

        if let Err(e) = inserted {
            if is_duplicate_key(&e) {
                return Err(LeaveError::validation(format!(
                    "profile {} already exists",
                    profile.email
                )));
            }
            error!(error = %e, profile_id = %profile.id, "Failed to insert profile");
            return Err(e.into());
        }

        for pool in [BalancePool::Annual, BalancePool::Sick] {
            let opening = profile.balance(pool);
            insert_adjustment(&mut tx, &profile.id, pool, AdjustmentKind::Opening, opening, opening, None, None)
                .await?;
        }

        tx.commit().await?;
        Ok(profile.clone())
    }

    async fn fetch_profile(&self, id: &str) -> Result<Option<Profile>, LeaveError> {
        let sql = format!("SELECT {} FROM profiles WHERE id = ?", PROFILE_COLUMNS);
        sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Profile::try_from)
            .transpose()
    }

    async fn update_profile(&self, id: &str, patch: &ProfilePatch) -> Result<Option<Profile>, LeaveError> {
        let update = build_update_sql("profiles", patch_assignments(patch), "id", id)?;
        debug!(sql = %update.sql, profile_id = id, "Updating profile");

        execute_update(&self.pool, update).await.map_err(|e| {
            error!(error = %e, profile_id = id, "Failed to update profile");
            LeaveError::from(e)
        })?;

        self.fetch_profile(id).await
    }

    async fn query_profiles(&self, filter: &ProfileFilter) -> Result<Vec<Profile>, LeaveError> {
        let mut qb = QueryBuilder::<MySql>::new(format!("SELECT {} FROM profiles", PROFILE_COLUMNS));
        push_profile_filter(&mut qb, filter);
        // seq keeps insertion order among equal timestamps
        qb.push(" ORDER BY created_at DESC, seq DESC");
        push_page(&mut qb, filter.limit, filter.offset);

        qb.build_query_as::<ProfileRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Profile::try_from)
            .collect()
    }

    async fn count_profiles(&self, filter: &ProfileFilter) -> Result<i64, LeaveError> {
        let mut qb = QueryBuilder::<MySql>::new("SELECT COUNT(*) FROM profiles");
        push_profile_filter(&mut qb, filter);

        let (total,) = qb.build_query_as::<(i64,)>().fetch_one(&self.pool).await?;
        Ok(total)
    }

    async fn insert_request(&self, request: &LeaveRequest) -> Result<LeaveRequest, LeaveError> {
        sqlx::query(
            r#"
            INSERT INTO leave_requests
                (id, employee_id, leave_type, start_date, end_date, duration, reason,
                 status, manager_comments, approved_by, approved_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&request.id)
        .bind(&request.employee_id)
        .bind(request.leave_type.as_ref())
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.duration.as_ref())
        .bind(&request.reason)
        .bind(request.status.as_ref())
        .bind(&request.manager_comments)
        .bind(&request.approved_by)
        .bind(request.approved_at)
        .bind(request.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(error = %e, employee_id = %request.employee_id, "Failed to create leave request");
            LeaveError::from(e)
        })?;

        Ok(request.clone())
    }

    async fn fetch_request(&self, id: &str) -> Result<Option<LeaveRecord>, LeaveError> {
        let sql = format!("{} WHERE lr.id = ?", RECORD_SELECT);
        sqlx::query_as::<_, LeaveRecordRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(LeaveRecord::try_from)
            .transpose()
    }

    async fn query_requests(&self, filter: &LeaveFilter) -> Result<Vec<LeaveRecord>, LeaveError> {
        let mut qb = QueryBuilder::<MySql>::new(RECORD_SELECT);
        push_leave_filter(&mut qb, filter);
        qb.push(" ORDER BY lr.created_at DESC, lr.seq DESC");
        push_page(&mut qb, filter.limit, filter.offset);

        qb.build_query_as::<LeaveRecordRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(LeaveRecord::try_from)
            .collect()
    }

    async fn count_requests(&self, filter: &LeaveFilter) -> Result<i64, LeaveError> {
        let mut qb = QueryBuilder::<MySql>::new("SELECT COUNT(*) FROM leave_requests lr");
        push_leave_filter(&mut qb, filter);

        let (total,) = qb.build_query_as::<(i64,)>().fetch_one(&self.pool).await?;
        Ok(total)
    }

    async fn commit_decision(
        &self,
        decided: &LeaveRequest,
        debit: Option<&BalanceDebit>,
    ) -> Result<LeaveRequest, LeaveError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?, manager_comments = ?, approved_by = ?, approved_at = ?
            WHERE id = ?
            AND status = 'pending'
            "#,
        )
        .bind(decided.status.as_ref())
        .bind(&decided.manager_comments)
        .bind(&decided.approved_by)
        .bind(decided.approved_at)
        .bind(&decided.id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(LeaveError::invalid_transition(format!(
                "Leave request {} not found or already processed",
                decided.id
            )));
        }

        // An early return drops `tx`, which rolls the status change back.
        if let Some(debit) = debit {
            debit_locked(&mut tx, debit).await?;
        }

        tx.commit().await?;
        Ok(decided.clone())
    }

    async fn apply_debit(&self, debit: &BalanceDebit) -> Result<f64, LeaveError> {
        let mut tx = self.pool.begin().await?;
        let remaining = debit_locked(&mut tx, debit).await?;
        tx.commit().await?;
        Ok(remaining)
    }

    async fn set_balance(
        &self,
        employee_id: &str,
        pool: BalancePool,
        value: f64,
        actor_id: Option<&str>,
    ) -> Result<BalanceAdjustment, LeaveError> {
        let mut tx = self.pool.begin().await?;

        let previous = lock_balance(&mut tx, employee_id, pool).await?;
        write_balance(&mut tx, employee_id, pool, value).await?;
        let id = insert_adjustment(
            &mut tx,
            employee_id,
            pool,
            AdjustmentKind::AdminOverride,
            value - previous,
            value,
            None,
            actor_id,
        )
        .await?;
        let adjustment = fetch_adjustment(&mut tx, id).await?;

        tx.commit().await?;
        Ok(adjustment)
    }

    async fn adjustments(&self, employee_id: &str) -> Result<Vec<BalanceAdjustment>, LeaveError> {
        let sql = format!(
            "SELECT {} FROM balance_adjustments WHERE employee_id = ? ORDER BY id ASC",
            ADJUSTMENT_COLUMNS
        );
        sqlx::query_as::<_, BalanceAdjustmentRow>(&sql)
            .bind(employee_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(BalanceAdjustment::try_from)
            .collect()
    }
}
