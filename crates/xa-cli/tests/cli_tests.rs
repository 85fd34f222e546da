// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap::error::ErrorKind;
use plist::{Dictionary, Value};
use xa_alias::tags;
use xa_cli::commands::{CheckVersionArgs, CurrentArgs, DecodeArgs, EntryArg, ResolveArgs};
use xa_cli::config::CliConfig;
use xa_cli::launch_services::{ARCHITECTURES_KEY, LaunchServicesError, XCODE_BUNDLE_ID};
use xa_cli::probe::FsProbe;
use xa_cli::xcode::{self, ShellRunner, XcodeError};
use xa_cli::{Cli, Commands, Context, Parser};
use xa_domain_types::Version;
use xa_logging::CliLogLevel;
use xa_test_utils::fixtures::HEADER_LEN;
use xa_test_utils::{AliasBlobBuilder, logged_assert, logged_assert_eq, logged_test};

/// Replays canned command output and records every invocation
#[derive(Default)]
struct MockShellRunner {
    outputs: HashMap<String, String>,
    received: RefCell<Vec<String>>,
}

impl MockShellRunner {
    fn register(mut self, command: &str, output: &str) -> Self {
        self.outputs.insert(command.to_string(), output.to_string());
        self
    }

    fn received(&self) -> Vec<String> {
        self.received.borrow().clone()
    }
}

impl ShellRunner for MockShellRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, XcodeError> {
        let command = xcode::command_line(program, args);
        self.received.borrow_mut().push(command.clone());
        self.outputs.get(&command).cloned().ok_or(XcodeError::CommandFailed {
            command,
            status: "exit status: 1".to_string(),
        })
    }
}

/// Run one subcommand against the real filesystem, capturing stdout
fn run_with<T>(
    shell: &MockShellRunner,
    config: &CliConfig,
    command: impl FnOnce(&Context<'_>, &mut Vec<u8>) -> anyhow::Result<T>,
) -> (anyhow::Result<T>, String) {
    let ctx = Context {
        config,
        shell,
        probe: &FsProbe,
    };
    let mut out = Vec::new();
    let result = command(&ctx, &mut out);
    (result, String::from_utf8(out).unwrap())
}

fn write_alias(dir: &Path, name: &str, blob: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, blob).unwrap();
    path
}

/// Write a LaunchServices plist holding `items` for Xcode
fn write_launch_services(dir: &Path, items: Vec<Value>) -> PathBuf {
    let mut bundles = Dictionary::new();
    bundles.insert(XCODE_BUNDLE_ID.to_string(), Value::Array(items));
    let mut root = Dictionary::new();
    root.insert(ARCHITECTURES_KEY.to_string(), Value::Dictionary(bundles));

    let path = dir.join("com.apple.LaunchServices.plist");
    Value::Dictionary(root).to_file_xml(&path).unwrap();
    path
}

fn current_args(app: Option<&Path>) -> CurrentArgs {
    CurrentArgs {
        app: app.map(Path::to_path_buf),
        plist: None,
        entries: Vec::new(),
        lenient: false,
        no_verify: true,
    }
}

#[logged_test]
fn test_cli_parsing_resolve() {
    let cli = Cli::try_parse_from([
        "xcode-arch",
        "--log-level",
        "debug",
        "resolve",
        "xcode.alias",
        "--no-verify",
        "--volumes-root",
        "/mnt",
    ])
    .unwrap();

    logged_assert_eq!(logger, cli.logging.log_level, Some(CliLogLevel::Debug));
    logged_assert_eq!(
        logger,
        cli.command,
        Commands::Resolve(ResolveArgs {
            file: PathBuf::from("xcode.alias"),
            lenient: false,
            no_verify: true,
            volumes_root: Some(PathBuf::from("/mnt")),
        })
    );
}

#[logged_test]
fn test_cli_parsing_current_entries() {
    let cli = Cli::try_parse_from([
        "xcode-arch",
        "current",
        "--entry",
        "x86_64=/tmp/a.alias",
        "--entry",
        "arm64=/tmp/b.alias",
        "--app",
        "/Applications/Xcode.app",
    ])
    .unwrap();

    let Commands::Current(args) = cli.command else {
        panic!("expected current command");
    };
    assert_eq!(args.app, Some(PathBuf::from("/Applications/Xcode.app")));
    assert_eq!(
        args.entries,
        vec![
            EntryArg {
                architecture: "x86_64".to_string(),
                file: PathBuf::from("/tmp/a.alias"),
            },
            EntryArg {
                architecture: "arm64".to_string(),
                file: PathBuf::from("/tmp/b.alias"),
            },
        ]
    );
}

#[logged_test]
fn test_cli_parsing_rejects_malformed_values() {
    assert!(Cli::try_parse_from(["xcode-arch", "current", "--entry", "x86_64"]).is_err());
    assert!(Cli::try_parse_from(["xcode-arch", "check-version", "--version", "fourteen"]).is_err());
    assert!(Cli::try_parse_from(["xcode-arch", "decode"]).is_err());
    assert!(
        Cli::try_parse_from([
            "xcode-arch",
            "current",
            "--plist",
            "/tmp/ls.plist",
            "--entry",
            "x86_64=/tmp/a.alias",
        ])
        .is_err()
    );
}

#[logged_test]
fn test_check_version_owns_version_option() {
    Cli::command().debug_assert();

    let cli = Cli::try_parse_from(["xcode-arch", "check-version", "--version", "v14.2"]).unwrap();
    logged_assert_eq!(
        logger,
        cli.command,
        Commands::CheckVersion(CheckVersionArgs {
            version: Some(Version::new(14, 2, 0)),
        })
    );

    let err = Cli::try_parse_from(["xcode-arch", "--version"]).unwrap_err();
    logged_assert_eq!(logger, err.kind(), ErrorKind::DisplayVersion);
}

#[logged_test]
fn test_help_shows_tool_description() {
    let help = Cli::command().render_long_help().to_string();
    logger.log(&help).unwrap();

    logged_assert!(logger, help.contains("Inspect alias records and the launch architecture"));
    logged_assert!(logger, !help.contains("flatten"));
    logged_assert!(logger, help.contains("--log-level"));
}

#[logged_test]
fn test_decode_prints_json() {
    let dir = tempfile::tempdir().unwrap();
    let blob = AliasBlobBuilder::new()
        .target_name("Xcode.app")
        .target_id(4242)
        .entry(tags::POSIX_PATH, "/Applications/Xcode.app")
        .build();
    let file = write_alias(dir.path(), "xcode.alias", &blob);

    let (result, output) = run_with(
        &MockShellRunner::default(),
        &CliConfig::default(),
        |ctx, out| {
            DecodeArgs {
                file,
                lenient: false,
            }
            .run(ctx, out)
        },
    );
    logger.log(&output).unwrap();

    assert!(result.is_ok());
    let json: serde_json::Value = serde_json::from_str(&output).unwrap();
    logged_assert_eq!(logger, json["target_name"], "Xcode.app");
    logged_assert_eq!(logger, json["target_id"], 4242);
}

#[logged_test]
fn test_decode_honors_lenient_config() {
    let dir = tempfile::tempdir().unwrap();
    let mut blob = AliasBlobBuilder::new()
        .entry(tags::POSIX_PATH, "/Applications/Xcode.app")
        .build();
    blob[HEADER_LEN + 5] ^= 0x20;
    let file = write_alias(dir.path(), "corrupt.alias", &blob);

    let strict = run_with(
        &MockShellRunner::default(),
        &CliConfig::default(),
        |ctx, out| {
            DecodeArgs {
                file: file.clone(),
                lenient: false,
            }
            .run(ctx, out)
        },
    );
    let err = strict.0.unwrap_err();
    logged_assert!(logger, format!("{err:#}").contains("checksum"));

    let mut config = CliConfig::default();
    config.decode.lenient_checksum = true;
    let lenient = run_with(
        &MockShellRunner::default(),
        &config,
        |ctx, out| {
            DecodeArgs {
                file,
                lenient: false,
            }
            .run(ctx, out)
        },
    );
    assert!(lenient.0.is_ok());
}

#[logged_test]
fn test_resolve_without_verification_prints_recorded_path() {
    let dir = tempfile::tempdir().unwrap();
    let blob = AliasBlobBuilder::new()
        .entry(tags::POSIX_PATH, "/Applications/Missing.app")
        .build();
    let file = write_alias(dir.path(), "missing.alias", &blob);

    let (result, output) = run_with(
        &MockShellRunner::default(),
        &CliConfig::default(),
        |ctx, out| {
            ResolveArgs {
                file,
                lenient: false,
                no_verify: true,
                volumes_root: None,
            }
            .run(ctx, out)
        },
    );

    assert!(result.is_ok());
    logged_assert_eq!(logger, output, "/Applications/Missing.app\n".to_string());
}

#[logged_test]
fn test_resolve_verifies_against_filesystem() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("Target.app");
    std::fs::create_dir(&target).unwrap();
    let target_text = target.to_str().unwrap();

    let present = AliasBlobBuilder::new().entry(tags::POSIX_PATH, target_text).build();
    let present_file = write_alias(dir.path(), "present.alias", &present);
    let (result, output) = run_with(
        &MockShellRunner::default(),
        &CliConfig::default(),
        |ctx, out| {
            ResolveArgs {
                file: present_file,
                lenient: false,
                no_verify: false,
                volumes_root: None,
            }
            .run(ctx, out)
        },
    );
    assert!(result.is_ok());
    assert_eq!(output, format!("{}\n", target_text));

    let gone = AliasBlobBuilder::new()
        .entry(tags::POSIX_PATH, dir.path().join("Gone.app").to_str().unwrap())
        .build();
    let gone_file = write_alias(dir.path(), "gone.alias", &gone);
    let (result, output) = run_with(
        &MockShellRunner::default(),
        &CliConfig::default(),
        |ctx, out| {
            ResolveArgs {
                file: gone_file,
                lenient: false,
                no_verify: false,
                volumes_root: None,
            }
            .run(ctx, out)
        },
    );
    let err = result.unwrap_err();
    logger.log(&format!("{err:#}")).unwrap();
    assert!(output.is_empty());
    assert!(err.chain().any(|cause| cause.to_string().contains("not found")));
}

#[logged_test]
fn test_resolve_uses_volumes_root_from_flag() {
    let dir = tempfile::tempdir().unwrap();
    let blob = AliasBlobBuilder::new()
        .volume_name("Ext")
        .entry(tags::HFS_PATH, "Ext:Projects:report.txt")
        .build();
    let file = write_alias(dir.path(), "report.alias", &blob);

    let (result, output) = run_with(
        &MockShellRunner::default(),
        &CliConfig::default(),
        |ctx, out| {
            ResolveArgs {
                file,
                lenient: false,
                no_verify: true,
                volumes_root: Some(PathBuf::from("/mnt")),
            }
            .run(ctx, out)
        },
    );

    assert!(result.is_ok());
    assert_eq!(output, "/mnt/Ext/Projects/report.txt\n");
}

#[logged_test]
fn test_current_reads_xcode_select_and_skips_removed_apps() {
    let dir = tempfile::tempdir().unwrap();
    let xcode = AliasBlobBuilder::new()
        .entry(tags::POSIX_PATH, "/Applications/Xcode.app")
        .build();
    let removed = AliasBlobBuilder::new().build();
    let entries = vec![
        EntryArg {
            architecture: "arm64".to_string(),
            file: write_alias(dir.path(), "removed.alias", &removed),
        },
        EntryArg {
            architecture: "x86_64".to_string(),
            file: write_alias(dir.path(), "xcode.alias", &xcode),
        },
        EntryArg {
            architecture: "arm64".to_string(),
            file: write_alias(dir.path(), "garbage.alias", b"not an alias"),
        },
    ];
    let shell = MockShellRunner::default()
        .register("/usr/bin/xcode-select -p", "/Applications/Xcode.app/Contents/Developer");

    let (result, output) = run_with(
        &shell,
        &CliConfig::default(),
        |ctx, out| {
            CurrentArgs {
                entries,
                ..current_args(None)
            }
            .run(ctx, out)
        },
    );

    assert!(result.is_ok());
    logged_assert_eq!(logger, shell.received(), vec!["/usr/bin/xcode-select -p".to_string()]);
    logged_assert_eq!(
        logger,
        output,
        "`/Applications/Xcode.app` is running with x86_64\n".to_string()
    );
}

#[logged_test]
fn test_current_defaults_to_arm64() {
    let dir = tempfile::tempdir().unwrap();
    let plist = write_launch_services(dir.path(), Vec::new());

    let (result, output) = run_with(
        &MockShellRunner::default(),
        &CliConfig::default(),
        |ctx, out| {
            CurrentArgs {
                plist: Some(plist),
                ..current_args(Some(Path::new("/Applications/Xcode-beta.app")))
            }
            .run(ctx, out)
        },
    );

    assert!(result.is_ok());
    assert_eq!(output, "`/Applications/Xcode-beta.app` is running with arm64\n");
}

#[logged_test]
fn test_current_reads_launch_services_plist() {
    let dir = tempfile::tempdir().unwrap();
    let xcode = AliasBlobBuilder::new()
        .entry(tags::POSIX_PATH, "/Applications/Xcode.app")
        .build();
    let beta = AliasBlobBuilder::new()
        .entry(tags::POSIX_PATH, "/Applications/Xcode-beta.app")
        .build();
    let removed = AliasBlobBuilder::new().build();
    let plist = write_launch_services(
        dir.path(),
        vec![
            Value::Data(removed),
            Value::String("arm64".to_string()),
            Value::Data(beta),
            Value::String("arm64".to_string()),
            Value::Data(xcode),
            Value::String("x86_64".to_string()),
        ],
    );
    let shell = MockShellRunner::default()
        .register("/usr/bin/xcode-select -p", "/Applications/Xcode.app/Contents/Developer");

    let (result, output) = run_with(
        &shell,
        &CliConfig::default(),
        |ctx, out| {
            CurrentArgs {
                plist: Some(plist),
                ..current_args(None)
            }
            .run(ctx, out)
        },
    );
    logger.log(&output).unwrap();

    assert!(result.is_ok());
    logged_assert_eq!(
        logger,
        output,
        "`/Applications/Xcode.app` is running with x86_64\n".to_string()
    );
}

#[logged_test]
fn test_current_reports_unusable_plist() {
    let dir = tempfile::tempdir().unwrap();
    let app = Path::new("/Applications/Xcode.app");

    let missing = dir.path().join("absent.plist");
    let (result, output) = run_with(
        &MockShellRunner::default(),
        &CliConfig::default(),
        |ctx, out| {
            CurrentArgs {
                plist: Some(missing.clone()),
                ..current_args(Some(app))
            }
            .run(ctx, out)
        },
    );
    let err = result.unwrap_err();
    logger.log(&format!("{err:#}")).unwrap();
    assert!(output.is_empty());
    assert!(matches!(
        err.downcast_ref::<LaunchServicesError>(),
        Some(LaunchServicesError::PlistNotFound(path)) if *path == missing
    ));
    assert!(err.to_string().ends_with("absent.plist not found."));

    let odd = write_launch_services(dir.path(), vec![Value::Data(vec![0; 4])]);
    let (result, _) = run_with(
        &MockShellRunner::default(),
        &CliConfig::default(),
        |ctx, out| {
            CurrentArgs {
                plist: Some(odd),
                ..current_args(Some(app))
            }
            .run(ctx, out)
        },
    );
    let invalid = matches!(
        result.unwrap_err().downcast_ref::<LaunchServicesError>(),
        Some(LaunchServicesError::InvalidPlist(_))
    );
    logged_assert!(logger, invalid);
}

#[cfg(unix)]
#[logged_test]
fn test_current_matches_app_reached_through_volume_mount() {
    let dir = tempfile::tempdir().unwrap();
    let app = dir.path().join("Applications").join("Xcode.app");
    std::fs::create_dir_all(&app).unwrap();
    let volumes = dir.path().join("Volumes");
    std::fs::create_dir(&volumes).unwrap();
    std::os::unix::fs::symlink(dir.path(), volumes.join("Macintosh HD")).unwrap();

    let xcode = AliasBlobBuilder::new()
        .target_name("Xcode.app")
        .entry(tags::HFS_PATH, "Macintosh HD:Applications:Xcode.app")
        .build();
    let plist = write_launch_services(
        dir.path(),
        vec![Value::Data(xcode), Value::String("x86_64".to_string())],
    );
    let mut config = CliConfig::default();
    config.resolve.volumes_root = volumes.clone();

    let (result, output) = run_with(&MockShellRunner::default(), &config, |ctx, out| {
        CurrentArgs {
            plist: Some(plist),
            no_verify: false,
            ..current_args(Some(&app))
        }
        .run(ctx, out)
    });
    logger.log(&output).unwrap();

    assert!(result.is_ok());
    logged_assert_eq!(
        logger,
        output,
        format!("`{}` is running with x86_64\n", app.display())
    );
}

#[logged_test]
fn test_current_path_requires_developer_dir() {
    let shell = MockShellRunner::default()
        .register("/usr/bin/xcode-select -p", "/Library/Developer/CommandLineTools");

    let err = xcode::current_xcode_path(&shell).unwrap_err();

    logged_assert!(logger, matches!(err, XcodeError::UnknownXcodePath));
}

#[logged_test]
fn test_xcode_version_from_xcodebuild() {
    let shell = MockShellRunner::default()
        .register("/usr/bin/xcodebuild -version", "Xcode 14.2\nBuild version 14C18");

    let version = xcode::current_xcode_version(&shell).unwrap();

    logged_assert_eq!(logger, version, Version::new(14, 2, 0));
    assert_eq!(shell.received(), vec!["/usr/bin/xcodebuild -version".to_string()]);

    let garbled = MockShellRunner::default().register("/usr/bin/xcodebuild -version", "Xcode");
    assert!(matches!(
        xcode::current_xcode_version(&garbled),
        Err(XcodeError::UnknownXcodeVersion(_))
    ));
}

#[logged_test]
fn test_check_version_warns_from_14_3() {
    let shell = MockShellRunner::default()
        .register("/usr/bin/xcodebuild -version", "Xcode 15.0\nBuild version 15A240d");

    let (result, output) = run_with(
        &shell,
        &CliConfig::default(),
        |ctx, out| CheckVersionArgs { version: None }.run(ctx, out),
    );
    logger.log(&output).unwrap();

    assert!(!result.unwrap());
    assert!(output.starts_with(
        "[WARN] Xcode no longer supports Rosetta since 14.3 and current version is 15."
    ));

    let (result, output) = run_with(
        &MockShellRunner::default(),
        &CliConfig::default(),
        |ctx, out| {
            CheckVersionArgs {
                version: Some(Version::new(14, 2, 1)),
            }
            .run(ctx, out)
        },
    );
    assert!(result.unwrap());
    assert_eq!(output, "Xcode 14.2.1 supports Rosetta\n");
}

#[logged_test]
fn test_config_file_layers_over_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[decode]
lenient_checksum = true

[resolve]
volumes_root = "/mnt"

[logging]
log_level = "debug"
"#,
    )
    .unwrap();

    let config = CliConfig::load_from(Some((path.as_path(), true)), false).unwrap();

    logged_assert!(logger, config.decode.lenient_checksum);
    logged_assert!(logger, config.resolve.verify);
    logged_assert_eq!(logger, config.resolve.volumes_root, PathBuf::from("/mnt"));
    logged_assert_eq!(logger, config.logging.log_level, Some(CliLogLevel::Debug));
}

#[logged_test]
fn test_config_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    assert!(CliConfig::load_from(Some((path.as_path(), true)), false).is_err());
    assert_eq!(
        CliConfig::load_from(Some((path.as_path(), false)), false).unwrap(),
        CliConfig::default()
    );
}
