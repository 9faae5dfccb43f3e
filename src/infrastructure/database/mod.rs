//! `MySQL` persistence: connection pool, migrations and the ops count
//! repository.

pub mod connection;
pub mod errors;
pub mod ops_count_repo;

pub use connection::DatabaseConnection;
pub use errors::DatabaseError;
pub use ops_count_repo::MySqlOpsCountRepository;
