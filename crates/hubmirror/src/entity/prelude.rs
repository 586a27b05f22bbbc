//! Common re-exports for convenient entity usage.

pub use super::author_commit_count::{
    ActiveModel as AuthorCommitCountActiveModel, Column as AuthorCommitCountColumn,
    Entity as AuthorCommitCount, Model as AuthorCommitCountModel,
};
pub use super::commit::{
    ActiveModel as CommitActiveModel, Column as CommitColumn, Entity as Commit,
    Model as CommitModel,
};
pub use super::repository::{
    ActiveModel as RepositoryActiveModel, Column as RepositoryColumn, Entity as Repository,
    Model as RepositoryModel,
};
pub use super::user::{
    ActiveModel as UserActiveModel, Column as UserColumn, Entity as User, Model as UserModel,
};
