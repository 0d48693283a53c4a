pub mod api;
pub mod convert;
pub mod db;
pub mod query;
pub mod rollup;
pub mod session;
