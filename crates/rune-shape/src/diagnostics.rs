use std::collections::HashSet;
use std::sync::OnceLock;

/// Environment variable holding a comma-separated list of diagnostic categories.
pub const DIAGNOSTICS_ENV: &str = "RUNE_DIAGNOSTICS";

static SET: OnceLock<HashSet<String>> = OnceLock::new();

fn parse_diagnostics_env() -> &'static HashSet<String> {
    SET.get_or_init(|| parse_categories(&std::env::var(DIAGNOSTICS_ENV).unwrap_or_default()))
}

/// Fixes the diagnostic categories from a configured value instead of the environment.
/// Returns false when the set was already initialized.
pub fn init_diagnostics(raw: &str) -> bool {
    SET.set(parse_categories(raw)).is_ok()
}

fn parse_categories(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// True when verbose diagnostics are requested for `category` (`layout`, `codegen`,
/// `pack`, `fidelity`) or for `all`.
pub fn diagnostics_enabled(category: &str) -> bool {
    let set = parse_diagnostics_env();
    set.contains("all") || set.contains(&category.to_ascii_lowercase())
}
