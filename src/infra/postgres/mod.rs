pub mod account_repo;
pub mod audit_repo;
pub mod marketplace_repo;
pub mod suspension_repo;

/// SQLSTATE codes the repositories react to.
pub mod codes {
    pub const UNIQUE_VIOLATION: &str = "23505";
    pub const INSUFFICIENT_PRIVILEGE: &str = "42501";
    pub const UNDEFINED_TABLE: &str = "42P01";
    pub const DUPLICATE_TABLE: &str = "42P07";
    pub const DUPLICATE_OBJECT: &str = "42710";
}

pub(crate) fn db_error_code(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
        _ => None,
    }
}
