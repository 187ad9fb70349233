//! # rowguard-rewrite
//!
//! MySQL-aware SQL fortification.
//!
//! Statements that reference configured tables are rewritten to use their
//! replacement (typically a row-filtered view), and the session variables
//! the views depend on are prepended as a `/* SET ... */` comment.
//!
//! ```ignore
//! use rowguard_core::{Configuration, SessionVariables};
//! use rowguard_rewrite::{fortify, recover_original};
//!
//! let mut config = Configuration::new();
//! config.set_tables(["posts"])?;
//! config.set_replacement("my_{table}_view")?;
//! config.set_session_variables(SessionVariables::new().with("tenant_id", 42))?;
//!
//! let sql = fortify("SELECT * FROM posts", &config, |_| {});
//! assert_eq!(sql, "/* SET @tenant_id := 42 */ SELECT * FROM my_posts_view");
//! assert_eq!(recover_original(&sql), Some("SELECT * FROM posts"));
//! ```
//!
//! Components:
//! - [`scanner`]: splits SQL into quoted, word and other spans
//! - [`rewriter`]: substitutes table names in word spans
//! - [`policy`]: decides whether a statement may be rewritten
//! - [`fortifier`]: orchestration, stamping and the back-reference
//! - [`anonymizer`]: strips literals for logging

pub mod anonymizer;
pub mod error;
pub mod fortifier;
pub mod policy;
pub mod rewriter;
pub mod scanner;
pub mod stamp;

pub use anonymizer::anonymize;
pub use error::{Result, RewriteError};
pub use fortifier::{Fortifier, fortify, load_configuration};
pub use policy::{RewritePolicy, SkipReason, Verdict};
pub use rewriter::{IdentifierRewriter, Rewrite};
pub use scanner::{Scanner, Span, SpanKind, scan};
pub use stamp::{Sql, Stamp, is_stamped, recover_original};
