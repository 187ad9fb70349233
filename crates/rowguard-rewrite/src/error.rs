use rowguard_core::ConfigError;

/// Errors raised while setting up a fortifier.
///
/// Fortification itself never fails: ineligible or malformed statements are
/// returned unchanged.
#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, RewriteError>;
