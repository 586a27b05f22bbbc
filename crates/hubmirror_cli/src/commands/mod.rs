pub(crate) mod discover;
pub(crate) mod migrate;
pub(crate) mod serve;
mod shared;
