//! Environment helpers: centralized dotenv loading and ergonomic getters.
//! Call `init_env()` once early in each binary (or rely on lazy Once).
use std::sync::Once;
use tracing::{info, warn};

static INIT: Once = Once::new();

pub const SOURCE_DATABASE_URL: &str = "SOURCE_DATABASE_URL";
pub const POOLED_DATABASE_URL: &str = "DATABASE_URL";
pub const DIRECT_DATABASE_URL: &str = "DIRECT_URL";
pub const SUPABASE_URL: &str = "SUPABASE_URL";
pub const SUPABASE_SERVICE_ROLE_KEY: &str = "SUPABASE_SERVICE_ROLE_KEY";
pub const PUBLIC_ASSETS_DIR: &str = "PUBLIC_ASSETS_DIR";

const DEFAULT_SOURCE_URL: &str = "sqlite:prisma/dev.db";
const DEFAULT_PUBLIC_DIR: &str = "public";

/// Load .env exactly once. Safe to call many times.
pub fn init_env() {
    INIT.call_once(|| {
        let _ = dotenv::dotenv();
    });
}

/// Get required env var; error if missing.
pub fn env_req(key: &str) -> anyhow::Result<String> {
    env_opt(key).ok_or_else(|| anyhow::anyhow!("missing env var {key}"))
}

/// Get optional env var (None if unset or empty).
pub fn env_opt(key: &str) -> Option<String> {
    init_env();
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Which destination endpoint a resolved DSN points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Transaction-mode pooler (PgBouncer / Supavisor :6543).
    Pooled,
    Direct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationUrl {
    pub url: String,
    pub endpoint: Endpoint,
}

/// Pick the destination DSN. Pooled wins when both are present.
pub fn choose_destination_url(
    pooled: Option<String>,
    direct: Option<String>,
) -> Option<DestinationUrl> {
    match (pooled, direct) {
        (Some(url), Some(_)) => {
            warn!(
                target = "env",
                "both {POOLED_DATABASE_URL} and {DIRECT_DATABASE_URL} are set; using the pooled endpoint"
            );
            Some(DestinationUrl {
                url,
                endpoint: Endpoint::Pooled,
            })
        }
        (Some(url), None) => Some(DestinationUrl {
            url,
            endpoint: Endpoint::Pooled,
        }),
        (None, Some(url)) => Some(DestinationUrl {
            url,
            endpoint: Endpoint::Direct,
        }),
        (None, None) => None,
    }
}

/// Destination Postgres DSN resolved from DATABASE_URL / DIRECT_URL.
pub fn destination_db_url() -> anyhow::Result<DestinationUrl> {
    let resolved = choose_destination_url(
        env_opt(POOLED_DATABASE_URL),
        env_opt(DIRECT_DATABASE_URL),
    )
    .ok_or_else(|| {
        anyhow::anyhow!(
            "no destination database URL set ({POOLED_DATABASE_URL} | {DIRECT_DATABASE_URL})"
        )
    })?;
    info!(target = "env", endpoint = ?resolved.endpoint, "resolved destination database URL");
    Ok(resolved)
}

/// Source SQLite DSN, defaulting to the legacy Prisma dev database.
pub fn source_db_url() -> String {
    env_opt(SOURCE_DATABASE_URL).unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string())
}

pub fn public_assets_dir() -> std::path::PathBuf {
    env_opt(PUBLIC_ASSETS_DIR)
        .unwrap_or_else(|| DEFAULT_PUBLIC_DIR.to_string())
        .into()
}

fn redact_value(key: &str, val: &str) -> String {
    let k = key.to_ascii_uppercase();
    if k.contains("PASSWORD") || k.contains("SECRET") || k.contains("KEY") || k.contains("TOKEN")
    {
        return "***".to_string();
    }

    // Trim so pasted values with trailing newlines don't leak credentials on a second line.
    let val_trim = val.trim();

    if let Ok(mut u) = url::Url::parse(val_trim) {
        let scheme = u.scheme().to_ascii_lowercase();
        if (scheme == "postgres" || scheme == "postgresql") && !u.username().is_empty() {
            let _ = u.set_username("***");
            let _ = u.set_password(Some("***"));
            return u.to_string();
        }
    }

    val_trim.to_string()
}

/// Validate required keys and log a consolidated, redacted snapshot of configuration.
/// Returns error if any required key is missing.
pub fn preflight_check(title: &str, required: &[&str], also_log: &[&str]) -> anyhow::Result<()> {
    init_env();
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|k| env_opt(k).is_none())
        .collect();
    let snapshot: Vec<(String, String)> = also_log
        .iter()
        .map(|&k| {
            let v = env_opt(k).unwrap_or_default();
            (k.to_string(), redact_value(k, &v))
        })
        .collect();
    info!(target = "preflight", title, snapshot = ?snapshot, "configuration snapshot");
    if !missing.is_empty() {
        return Err(anyhow::anyhow!("missing required env: {:?}", missing));
    }
    Ok(())
}
