/// Database models for TaskDesk
///
/// # Models
///
/// - `user`: registered accounts
/// - `task`: personal tasks owned by a user
///
/// Both expose their SQL as associated functions over a `&mut PgConnection`,
/// which is how [`crate::store::postgres::PgStore`] runs several of them in one
/// transaction.

pub mod task;
pub mod user;
