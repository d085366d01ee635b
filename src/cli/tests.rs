//! Tests for the CLI surface

use super::*;
use crate::config::DataportConfig;
use clap::Parser;
use std::io::Cursor;
use std::path::Path;
use test_case::test_case;

// ============================================================================
// Argument parsing
// ============================================================================

#[test]
fn test_no_subcommand_runs_migration() {
    let cli = Cli::parse_from(["dataport"]);
    assert_eq!(cli.command(), Commands::Migrate);
    assert!(cli.config.is_none());
}

#[test]
fn test_serve_with_port_and_config() {
    let cli = Cli::parse_from(["dataport", "serve", "--port", "9000", "-c", "prod.yaml"]);
    assert_eq!(cli.command(), Commands::Serve { port: Some(9000) });
    assert_eq!(cli.config.as_deref(), Some(Path::new("prod.yaml")));
}

#[test]
fn test_server_config_port_override() {
    let mut config = DataportConfig::default();
    config.server.admin_token = Some("secret".to_string());

    let server = ServerConfig::from_config(&config, None);
    assert_eq!(server.port, config.server.port);
    assert_eq!(server.admin_token.as_deref(), Some("secret"));
    assert_eq!(server.database, config.target.database);

    let server = ServerConfig::from_config(&config, Some(9100));
    assert_eq!(server.port, 9100);
}

// ============================================================================
// Reset prompt
// ============================================================================

#[test_case("y\n", true ; "lowercase y")]
#[test_case("Y\n", true ; "uppercase y")]
#[test_case("  y  \n", true ; "padded y")]
#[test_case("yes\n", false ; "yes is not y")]
#[test_case("n\n", false ; "n")]
#[test_case("\n", false ; "empty line")]
#[test_case("", false ; "closed input")]
fn test_confirm_reset(answer: &str, expected: bool) {
    let mut input = Cursor::new(answer.as_bytes().to_vec());
    let mut output = Vec::new();

    let confirmed =
        confirm_reset(&mut input, &mut output, Path::new("instance/target.duckdb"), 12).unwrap();
    assert_eq!(confirmed, expected);

    let prompt = String::from_utf8(output).unwrap();
    assert!(prompt.contains("instance/target.duckdb holds 12 table(s)"));
    assert!(prompt.contains("(y/n)"));
}
