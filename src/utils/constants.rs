//! Shared constants and invariants

pub const DEFAULT_ACCESS_MARGIN_SECS: u64 = 30;
pub const DEFAULT_REFRESH_MARGIN_SECS: u64 = 60;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 2800;

pub const DEFAULT_PSN_CACHE_TTL_SECS: u64 = 60;
pub const DEFAULT_SUBJECT_CACHE_TTL_SECS: u64 = 600;
pub const DEFAULT_ENRICHMENT_CONCURRENCY: usize = 6;

/// Longest diagnostic string ever handed back to a client.
pub const DIAGNOSTIC_MAX_CHARS: usize = 500;

pub const PSN_AUTH_BASE_URL: &str = "https://ca.account.sony.com/api/authz/v3/oauth";
pub const PSN_API_BASE_URL: &str = "https://m.np.playstation.com/api";
pub const BANGUMI_API_BASE_URL: &str = "https://api.bgm.tv/v0";

// Upstream labels used in logs and metrics
pub const UPSTREAM_PSN: &str = "psn";
pub const UPSTREAM_PSN_AUTH: &str = "psn_auth";
pub const UPSTREAM_BANGUMI: &str = "bangumi";

pub fn truncate_diagnostic(input: &str) -> String {
    input.chars().take(DIAGNOSTIC_MAX_CHARS).collect()
}

// PSN mobile app client used for the npsso -> code -> token exchange
pub const PSN_CLIENT_ID: &str = "09515159-7237-4370-9b40-3806e67c0891";
pub const PSN_REDIRECT_URI: &str = "com.scee.psxandroid.scecompcall://redirect";
pub const PSN_SCOPE: &str = "psn:mobile.v2.core psn:clientapp";
pub const PSN_CLIENT_BASIC_AUTH: &str =
    "Basic MDk1MTUxNTktNzIzNy00MzcwLTliNDAtMzgwNmU2N2MwODkxOnVjUGprYTV0bnRCMktxc1A=";
