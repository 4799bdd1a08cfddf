use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

/// True when `CODESCHOOL_QUIET` asks the CLI to skip banners and tables.
pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| {
        std::env::var("CODESCHOOL_QUIET")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}
