//! SeaORM entity definitions for the mirror schema.

pub mod author_commit_count;
pub mod commit;
pub mod prelude;
pub mod repository;
pub mod user;
