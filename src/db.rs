use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager};

pub type DbPool = r2d2::Pool<ConnectionManager<MysqlConnection>>;

const SCHEMA_SQL: &str = include_str!("../schema.sql");

pub fn build_pool(database_url: &str) -> Result<DbPool, r2d2::PoolError> {
    let manager = ConnectionManager::<MysqlConnection>::new(database_url);
    r2d2::Pool::builder().build(manager)
}

fn schema_statements() -> impl Iterator<Item = &'static str> {
    SCHEMA_SQL
        .split(';')
        .map(str::trim)
        .filter(|stmt| !stmt.is_empty())
}

/// Drops and recreates every table. Existing rows are lost.
pub fn init_db(conn: &MysqlConnection) -> QueryResult<()> {
    for stmt in schema_statements() {
        log::debug!("executing: {}", stmt.lines().next().unwrap_or(stmt));
        diesel::sql_query(stmt).execute(conn)?;
    }
    log::info!("initialized database");
    Ok(())
}
