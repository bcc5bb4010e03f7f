pub(crate) mod cache;
pub(crate) mod engine;
pub(crate) mod errors;
pub(crate) mod sampling;
pub(crate) mod stores;
