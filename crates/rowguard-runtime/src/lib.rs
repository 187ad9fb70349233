//! # rowguard-runtime
//!
//! Reference integration of the rowguard fortifier with a database
//! connection. Backends implement [`StatementExecutor`]; the
//! [`FortifiedConnection`] wrapper fortifies statements, applies session
//! variables once per connection and retries a failed rewritten statement
//! with its original text.

pub mod adapter;
pub mod connection;

pub use adapter::StatementExecutor;
pub use connection::FortifiedConnection;
