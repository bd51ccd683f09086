//! CLI argument parsing tests.

use std::time::Duration;

use cesapi::cli::{resolve_options, Cli, Command};
use clap::Parser;

#[test]
fn test_cli_parses_kinds_subcommand() {
    let cli = Cli::parse_from(["cesapi", "kinds"]);

    assert!(!cli.json);
    assert!(matches!(cli.command, Command::Kinds));
}

#[test]
fn test_cli_parses_list_with_params_and_filters() {
    let cli = Cli::parse_from([
        "cesapi",
        "list",
        "Project",
        "--param",
        "projectStatus=2",
        "--filter",
        "title=Fall*",
        "--filter",
        "id=>10",
        "--json",
    ]);

    assert!(cli.json);
    match cli.command {
        Command::List { kind, selection } => {
            assert_eq!(kind, "Project");
            assert_eq!(
                selection.query().get("projectStatus").map(String::as_str),
                Some("2")
            );
            assert_eq!(selection.filters, vec!["title=Fall*", "id=>10"]);
            assert!(selection.filter_set().is_ok());
        }
        _ => panic!("Expected List command"),
    }
}

#[test]
fn test_cli_rejects_malformed_param() {
    let result = Cli::try_parse_from(["cesapi", "list", "Course", "--param", "nokey"]);
    assert!(result.is_err());
}

#[test]
fn test_cli_parses_traverse_subcommand() {
    let cli = Cli::parse_from([
        "cesapi",
        "traverse",
        "Course",
        "projects",
        "surveys",
        "--concurrency",
        "4",
        "--tag-source-rows",
        "--deadline",
        "30",
    ]);

    match cli.command {
        Command::Traverse {
            kind,
            names,
            concurrency,
            tag_source_rows,
            deadline,
            ..
        } => {
            assert_eq!(kind, "Course");
            assert_eq!(names, vec!["projects", "surveys"]);

            let options = resolve_options(concurrency, tag_source_rows, deadline);
            assert_eq!(options.concurrency, 4);
            assert!(options.tag_source_rows);
            assert_eq!(options.deadline, Some(Duration::from_secs(30)));
        }
        _ => panic!("Expected Traverse command"),
    }
}

#[test]
fn test_cli_traverse_requires_a_name() {
    let result = Cli::try_parse_from(["cesapi", "traverse", "Course"]);
    assert!(result.is_err());
}

#[test]
fn test_cli_credentials_from_flags() {
    let cli = Cli::parse_from([
        "cesapi",
        "--url",
        "https://ces.example.edu",
        "--token",
        "abc",
        "kinds",
    ]);

    let (url, token) = cli.credentials().unwrap();
    assert_eq!(url, "https://ces.example.edu");
    assert_eq!(token, "abc");
}

#[test]
fn test_cli_bad_filter_is_reported() {
    let cli = Cli::parse_from(["cesapi", "list", "Course", "--filter", "noequals"]);
    match cli.command {
        Command::List { selection, .. } => {
            assert!(matches!(
                selection.filter_set(),
                Err(cesapi::CesError::InvalidFilter(_))
            ));
        }
        _ => panic!("Expected List command"),
    }
}
