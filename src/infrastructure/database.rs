use crate::config::DatabaseSettings;
use crate::domain::{seed_rows, AccountName, AccountVersion, IsolationLevel, Version};
use crate::{Error, Result};
use sqlx::postgres::{PgConnection, PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};

const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS public.account_versions (
        account VARCHAR(100) PRIMARY KEY,
        version BIGINT
    )
"#;

const CLEAR_TABLE_SQL: &str = "DELETE FROM public.account_versions";

const SEED_SQL: &str = r#"
    INSERT INTO public.account_versions (account, version)
    SELECT * FROM UNNEST($1::VARCHAR[], $2::BIGINT[])
"#;

const LOCK_ROWS_SQL: &str = r#"
    SELECT account, version FROM public.account_versions
    WHERE account = ANY($1)
    ORDER BY account ASC
    FOR UPDATE
"#;

const UPDATE_VERSIONS_SQL: &str =
    "UPDATE public.account_versions SET version = $1 WHERE account = ANY($2)";

const LIST_SQL: &str =
    "SELECT account, version FROM public.account_versions ORDER BY account ASC";

/// Handle to the store backed by its own connection pool
///
/// The scenario opens two of these so each worker's transaction sits on a
/// connection nobody else is queued behind.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool and make sure the server answers
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout())
            .connect(settings.url.as_ref())
            .await?;

        let db = Self::new(pool);
        db.health_check().await?;
        Ok(db)
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<()> {
        let row = sqlx::query("SELECT 1 as health_check")
            .fetch_one(&self.pool)
            .await?;

        let health_check: i32 = row.try_get("health_check")?;

        if health_check == 1 {
            Ok(())
        } else {
            Err(Error::application("Database health check failed"))
        }
    }

    /// Create the table if needed and reset it to the seed rows
    ///
    /// Runs in one transaction so a failure never leaves a partial seed.
    pub async fn reset_account_versions(&self) -> Result<()> {
        let seed = seed_rows();
        let accounts: Vec<String> = seed.iter().map(|row| row.account.to_string()).collect();
        let versions: Vec<i64> = seed.iter().map(|row| row.version.into_inner()).collect();

        let mut tx = self.pool.begin().await?;

        sqlx::query(CREATE_TABLE_SQL).execute(&mut *tx).await?;
        sqlx::query(CLEAR_TABLE_SQL).execute(&mut *tx).await?;
        sqlx::query(SEED_SQL)
            .bind(accounts)
            .bind(versions)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Begin a transaction at `level`
    pub async fn begin(
        &self,
        level: IsolationLevel,
    ) -> std::result::Result<Transaction<'static, Postgres>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        if let Some(sql) = level.set_transaction_sql() {
            sqlx::query(sql).execute(&mut *tx).await?;
        }
        Ok(tx)
    }

    /// Every row ordered by account ascending
    pub async fn list_account_versions(&self) -> Result<Vec<AccountVersion>> {
        let rows = sqlx::query(LIST_SQL).fetch_all(&self.pool).await?;
        rows.iter().map(decode_account_version).collect()
    }
}

/// Locking read: `SELECT ... FOR UPDATE` over `accounts`
///
/// Blocks while another transaction holds a lock on any of the rows. Returns
/// the number of rows locked.
pub async fn lock_account_versions(
    conn: &mut PgConnection,
    accounts: &[AccountName],
) -> std::result::Result<usize, sqlx::Error> {
    let rows = sqlx::query(LOCK_ROWS_SQL)
        .bind(account_strings(accounts))
        .fetch_all(conn)
        .await?;
    Ok(rows.len())
}

/// Overwrite the version of every account in `accounts`; returns rows affected
pub async fn update_account_versions(
    conn: &mut PgConnection,
    accounts: &[AccountName],
    version: Version,
) -> std::result::Result<u64, sqlx::Error> {
    let result = sqlx::query(UPDATE_VERSIONS_SQL)
        .bind(version.into_inner())
        .bind(account_strings(accounts))
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

fn account_strings(accounts: &[AccountName]) -> Vec<String> {
    accounts.iter().map(ToString::to_string).collect()
}

fn decode_account_version(row: &PgRow) -> Result<AccountVersion> {
    let account: String = row.try_get("account")?;
    let version: i64 = row.try_get("version")?;

    let account = AccountName::try_new(account)
        .map_err(|e| Error::invalid_row(format!("account name: {e}")))?;
    let version = Version::try_new(version)
        .map_err(|e| Error::invalid_row(format!("version for {account}: {e}")))?;

    Ok(AccountVersion::new(account, version))
}
