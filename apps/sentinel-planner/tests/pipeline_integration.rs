//! End-to-end integration tests: fixture JSON -> context -> full pipeline ->
//! audit trail, exercising the library surface the binary drives.

use sentinel_core::select_plan;
use sentinel_planner::audit::{self, AuditLog};
use sentinel_planner::config::CliConfig;
use sentinel_planner::fixture::Fixture;
use sentinel_planner::planner_config;

fn write_fixture(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("fixture.json");
    std::fs::write(
        &path,
        r#"{
            "securities": [
                { "isin": "US0378331005", "symbol": "AAPL", "name": "Apple", "currency": "EUR",
                  "geography": "US", "industry": "Tech", "exchange": "NASDAQ", "min_lot": 1,
                  "allow_buy": true, "allow_sell": true, "active": true,
                  "priority_multiplier": 1.0, "min_portfolio_target": 0.0, "max_portfolio_target": 1.0 },
                { "isin": "US5949181045", "symbol": "MSFT", "name": "Microsoft", "currency": "EUR",
                  "geography": "US", "industry": "Tech", "exchange": "NASDAQ", "min_lot": 1,
                  "allow_buy": true, "allow_sell": true, "active": true,
                  "priority_multiplier": 1.0, "min_portfolio_target": 0.0, "max_portfolio_target": 1.0 }
            ],
            "positions": [
                { "isin": "US0378331005", "quantity": 100, "average_cost_eur": 120.0,
                  "first_bought_at": "2024-01-01T00:00:00Z" }
            ],
            "cash_eur": 10000.0,
            "prices": { "US0378331005": 190.0, "US5949181045": 300.0 },
            "scores": {
                "US0378331005": { "security_score": 0.9, "cagr": 0.3, "long_term_score": 0.9, "opportunity_score": 0.9, "kelly_size": 0.2 },
                "US5949181045": { "security_score": 0.9, "cagr": 0.3, "long_term_score": 0.9, "opportunity_score": 0.9, "kelly_size": 0.2 }
            },
            "settings": { "regime_score": 0.0 }
        }"#,
    )
    .unwrap();
    path
}

fn write_config(dir: &std::path::Path, fixture_path: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(
        &path,
        format!(
            "[fixture]\npath = \"{}\"\n\n[logging]\ndir = \"{}\"\naudit_file = \"audit.jsonl\"\n",
            fixture_path.display(),
            dir.display(),
        ),
    )
    .unwrap();
    path
}

#[test]
fn fixture_to_plan_to_audit_trail() {
    let dir = tempfile::tempdir().unwrap();
    let fixture_path = write_fixture(dir.path());
    let config_path = write_config(dir.path(), &fixture_path);

    let config = CliConfig::load(&config_path).unwrap();
    let fixture = Fixture::load(&config.fixture.path).unwrap();
    let ctx = fixture.into_context_builder().unwrap().build().unwrap();
    let planner_config = planner_config::load(config.planner_config_path.as_deref()).unwrap();

    let result = select_plan(&ctx, &planner_config);
    assert_eq!(result.portfolio_hash.0.len(), 32);

    let mut audit_log = AuditLog::open(&config.audit_path()).unwrap();
    audit::log_run_started(&mut audit_log, &fixture_path.display().to_string()).unwrap();
    audit::log_context_summary(
        &mut audit_log,
        ctx.securities().len(),
        ctx.enriched_positions.len(),
        ctx.total_portfolio_value_eur.as_eur(),
        ctx.available_cash_eur.as_eur(),
    )
    .unwrap();
    audit::log_run_completed(&mut audit_log, &result).unwrap();
    drop(audit_log);

    let contents = std::fs::read_to_string(config.audit_path()).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    for line in &lines {
        let _: serde_json::Value = serde_json::from_str(line).unwrap();
    }
    assert!(lines[0].contains("run_started"));
    assert!(lines[2].contains("run_completed"));
}

#[test]
fn missing_fixture_file_is_a_clean_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("does-not-exist.json");
    let err = Fixture::load(&missing).unwrap_err();
    assert!(matches!(err, sentinel_planner::Error::FixtureRead { .. }));
}
