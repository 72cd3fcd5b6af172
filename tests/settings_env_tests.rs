//! Environment overrides for settings.
//!
//! Kept in its own test binary with a single test, since it mutates the
//! process environment.

use std::io::Write;

use hubsig::settings::Settings;
use hubsig::Comparison;

#[test]
fn test_environment_overrides_settings_file() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        "[receiver]\nport = 8080\nsecret = \"from file\"\n\n[sender]\nurl = \"http://127.0.0.1:8080/webhook\""
    )
    .unwrap();

    std::env::set_var("HUBSIG_RECEIVER__PORT", "9000");
    std::env::set_var("HUBSIG_RECEIVER__COMPARISON", "constant_time");
    std::env::set_var("HUBSIG_SENDER__SECRET", "from env");

    let settings = Settings::load(Some(file.path())).unwrap();

    std::env::remove_var("HUBSIG_RECEIVER__PORT");
    std::env::remove_var("HUBSIG_RECEIVER__COMPARISON");
    std::env::remove_var("HUBSIG_SENDER__SECRET");

    assert_eq!(settings.receiver.port, 9000);
    assert_eq!(settings.receiver.comparison, Comparison::ConstantTime);
    assert_eq!(settings.receiver.secret.as_deref(), Some("from file"));
    assert_eq!(settings.sender.secret.as_deref(), Some("from env"));
    assert_eq!(
        settings.sender.url.as_deref(),
        Some("http://127.0.0.1:8080/webhook")
    );
}
