pub mod connection;
pub mod entities;
pub mod migrations;
pub mod test_utils;
pub mod transaction;

pub use connection::*;
pub use transaction::begin_scope;
