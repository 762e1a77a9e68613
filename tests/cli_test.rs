use anyhow::Result;
use clap::Parser;
use rsmachine::cli::{Cli, Commands, LogLevel};

#[test]
fn test_parse_provision_command() -> Result<()> {
    let args = Cli::parse_from(["rsmachine", "provision", "--file", "test.yaml"]);

    match args.command {
        Commands::Provision(opts) => {
            assert_eq!(opts.file, "test.yaml");
            assert_eq!(opts.log_level, LogLevel::Info);
            assert!(!opts.dry_run);
        }
        _ => panic!("Expected Provision command"),
    }

    Ok(())
}

#[test]
fn test_parse_provision_command_with_flags() -> Result<()> {
    let args = Cli::parse_from([
        "rsmachine",
        "provision",
        "--file",
        "test.yaml",
        "--log-level",
        "debug",
        "--dry-run",
    ]);

    match args.command {
        Commands::Provision(opts) => {
            assert_eq!(opts.file, "test.yaml");
            assert_eq!(opts.log_level, LogLevel::Debug);
            assert!(opts.dry_run);
        }
        _ => panic!("Expected Provision command"),
    }

    Ok(())
}

#[test]
fn test_parse_provision_default_file() -> Result<()> {
    let args = Cli::parse_from(["rsmachine", "provision"]);

    match args.command {
        Commands::Provision(opts) => {
            assert_eq!(opts.file, "machine.yaml");
        }
        _ => panic!("Expected Provision command"),
    }

    Ok(())
}

#[test]
fn test_parse_validate_command() -> Result<()> {
    let args = Cli::parse_from(["rsmachine", "validate", "--file", "test.yaml"]);

    match args.command {
        Commands::Validate(opts) => {
            assert_eq!(opts.file, "test.yaml");
        }
        _ => panic!("Expected Validate command"),
    }

    Ok(())
}
