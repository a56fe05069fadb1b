//! End-to-end build tests against a mock connector and mock tools.
//!
//! Nothing here needs dpkg, gpg or openssl installed: [`MockRunner`] fakes
//! their side effects and records what would have run.

mod helpers;

use std::fs;
use std::path::{Path, PathBuf};

use connector_deb::error::BuildError;
use connector_deb::orchestrator::{run_build, sha256_file};
use connector_deb::progress::SilentProgress;
use connector_deb::sign::{SignOutcome, PASSWORD_ENV};
use helpers::{assert_file_contains, assert_file_exists, MockRunner, RecordingProgress, TestEnv};

// =============================================================================
// Unsigned builds
// =============================================================================

#[test]
fn test_unsigned_build_produces_package() {
    let env = TestEnv::new();
    let runner = MockRunner::new();
    let mut progress = RecordingProgress::default();

    let report = run_build(&env.config(), &runner, &mut progress).unwrap();

    assert_eq!(report.package, env.package());
    assert_file_exists(&report.package);
    assert_eq!(report.signing, SignOutcome::Skipped);
    assert_eq!(report.sha256, sha256_file(&env.package()).unwrap());
    assert_eq!(runner.programs(), ["dpkg"]);
    assert!(!env.staging().exists(), "staging tree must be removed");

    let position = |needle: &str| {
        progress
            .lines
            .iter()
            .position(|l| l == needle)
            .unwrap_or_else(|| panic!("missing status '{}': {:?}", needle, progress.lines))
    };
    assert!(position("Processing templates") < position("Copying pkg assets"));
    assert!(position("Copying pkg assets") < position("Building package"));
}

#[test]
fn test_staged_tree_layout() {
    let env = TestEnv::new();
    let runner = MockRunner::new();

    run_build(&env.config(), &runner, &mut SilentProgress).unwrap();

    assert_eq!(
        runner.staged_files(),
        [
            PathBuf::from("DEBIAN/control"),
            PathBuf::from("usr/share/hello/connectors/hello/hello"),
            PathBuf::from("usr/share/hello/connectors/hello/lib/addon.node"),
        ]
    );
    assert_eq!(
        runner.staged_control().unwrap(),
        "Package: hello\nVersion: 1.0.0-1\nArchitecture: amd64\nDescription: Says hello\n"
    );
}

#[test]
fn test_package_command_runs_in_installers_dir() {
    let env = TestEnv::new();
    let runner = MockRunner::new();

    run_build(&env.config(), &runner, &mut SilentProgress).unwrap();

    let calls = runner.calls();
    assert_eq!(calls[0].to_string(), "dpkg --build hello_1.0.0-1_amd64");
    assert_eq!(calls[0].current_dir(), Some(env.installers().as_path()));
}

#[test]
fn test_destination_path_override() {
    let env = TestEnv::new();
    let runner = MockRunner::new();
    let mut config = env.config();
    config.destination_path = Some("/opt/hello".to_string());

    run_build(&config, &runner, &mut SilentProgress).unwrap();

    let staged = runner.staged_files();
    assert!(staged.contains(&PathBuf::from("opt/hello/hello")), "{:?}", staged);
    assert!(!staged.iter().any(|p| p.starts_with("usr")));
}

#[test]
fn test_stale_staging_tree_discarded() {
    let env = TestEnv::new();
    fs::create_dir_all(env.staging().join("DEBIAN")).unwrap();
    fs::write(env.staging().join("DEBIAN/postinst"), "stale").unwrap();
    let runner = MockRunner::new();

    run_build(&env.config(), &runner, &mut SilentProgress).unwrap();

    assert!(!runner
        .staged_files()
        .contains(&PathBuf::from("DEBIAN/postinst")));
}

#[test]
fn test_unsupported_arch_still_builds() {
    let env = TestEnv::new();
    let bin = env.connector.join("deploy/node8-linux-arm64/bin");
    fs::create_dir_all(&bin).unwrap();
    fs::write(bin.join("hello"), "x").unwrap();
    let runner = MockRunner::new();
    let mut config = env.config();
    config.host = config.host.with_arch("arm64");

    let report = run_build(&config, &runner, &mut SilentProgress).unwrap();

    assert!(report
        .package
        .ends_with("deploy/node8-linux-arm64/installers/hello_1.0.0-1_unsupported.deb"));
    assert!(runner
        .staged_control()
        .unwrap()
        .contains("Architecture: unsupported"));
}

// =============================================================================
// Templates
// =============================================================================

#[test]
fn test_override_template_wins() {
    let env = TestEnv::new();
    env.write_override_template("DEBIAN/_control", "Package: custom-{{ name }}\n");
    let runner = MockRunner::new();

    run_build(&env.config(), &runner, &mut SilentProgress).unwrap();

    assert_eq!(runner.staged_control().unwrap(), "Package: custom-hello\n");
}

#[test]
fn test_override_adds_files_and_keeps_defaults() {
    let env = TestEnv::new();
    env.write_override_template("DEBIAN/_postinst", "#!/bin/sh\necho {{ name }}\n");
    env.write_override_template("etc/hello/static.conf", "port={{ port }}\n");
    let runner = MockRunner::new();

    run_build(&env.config(), &runner, &mut SilentProgress).unwrap();

    let staged = runner.staged_files();
    assert!(staged.contains(&PathBuf::from("DEBIAN/control")));
    assert!(staged.contains(&PathBuf::from("DEBIAN/postinst")));
    assert!(staged.contains(&PathBuf::from("etc/hello/static.conf")));
}

#[test]
fn test_file_and_directory_collision_reports_cause() {
    let env = TestEnv::new();
    env.write_default_template("etc/x", "plain");
    env.write_override_template("etc/x/_y", "{{ name }}");
    let runner = MockRunner::new();

    let err = run_build(&env.config(), &runner, &mut SilentProgress).unwrap_err();

    assert_eq!(err.phase(), "templates");
    assert!(matches!(err, BuildError::Render { .. }));
    let line = err.failure_line();
    assert!(
        line.starts_with("Build failed during templates: cannot render "),
        "{}",
        line
    );
    assert!(line.contains("(os error "), "cause missing: {}", line);
    assert!(runner.calls().is_empty());
    assert!(!env.staging().exists());
}

#[test]
fn test_missing_default_templates_fail_before_packaging() {
    let env = TestEnv::new();
    fs::remove_dir_all(env.tool_dir.join("templates")).unwrap();
    let runner = MockRunner::new();

    let err = run_build(&env.config(), &runner, &mut SilentProgress).unwrap_err();

    assert_eq!(err.phase(), "templates");
    assert!(runner.calls().is_empty());
    assert!(!env.staging().exists());
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_missing_binaries_fail_without_packaging() {
    let env = TestEnv::new();
    fs::remove_dir_all(env.binaries()).unwrap();
    let runner = MockRunner::new();

    let err = run_build(&env.config(), &runner, &mut SilentProgress).unwrap_err();

    match &err {
        BuildError::MissingArtifact(path) => assert_eq!(path, &env.binaries()),
        other => panic!("expected MissingArtifact, got {:?}", other),
    }
    assert!(err.to_string().contains("source path does not exist"));
    assert!(runner.calls().is_empty());
    assert!(!env.staging().exists());
    assert!(!env.package().exists());
}

#[test]
fn test_missing_descriptor() {
    let env = TestEnv::new();
    fs::remove_file(env.connector.join("package.json")).unwrap();
    let runner = MockRunner::new();

    let err = run_build(&env.config(), &runner, &mut SilentProgress).unwrap_err();

    assert_eq!(err.phase(), "descriptor");
    assert!(runner.calls().is_empty());
}

#[test]
fn test_package_failure_skips_signing() {
    let env = TestEnv::new();
    let runner = MockRunner::failing("dpkg");

    let err = run_build(&env.signing_config(), &runner, &mut SilentProgress).unwrap_err();

    assert_eq!(err.phase(), "package");
    assert!(err.to_string().contains("mock failure"));
    assert_eq!(runner.programs(), ["dpkg"]);
    assert!(!env.staging().exists());
}

// =============================================================================
// Signing
// =============================================================================

#[test]
fn test_signed_build_runs_decrypt_import_sign() {
    let env = TestEnv::new();
    let runner = MockRunner::new();

    let report = run_build(&env.signing_config(), &runner, &mut SilentProgress).unwrap();

    assert_eq!(report.signing, SignOutcome::Signed);
    assert_eq!(runner.programs(), ["dpkg", "openssl", "gpg", "dpkg-sig"]);

    let calls = runner.calls();
    let decrypted = Path::new(calls[1].flag_value("-out").unwrap()).to_path_buf();
    assert_eq!(calls[2].arg_list().last().map(String::as_str), decrypted.to_str());
    assert_eq!(
        calls[3].arg_list().last().map(String::as_str),
        env.package().to_str()
    );
    assert!(!decrypted.exists(), "decrypted key must be removed");
}

#[test]
fn test_passwords_never_in_arguments() {
    let env = TestEnv::new();
    let runner = MockRunner::new();

    run_build(&env.signing_config(), &runner, &mut SilentProgress).unwrap();

    for cmd in runner.calls() {
        for arg in cmd.arg_list() {
            assert!(!arg.contains("decrypt-secret"), "{}", cmd);
            assert!(!arg.contains("sign-secret"), "{}", cmd);
        }
    }
    let decrypt = &runner.calls()[1];
    assert_eq!(decrypt.env_value(PASSWORD_ENV), Some("decrypt-secret"));
}

#[test]
fn test_sign_failure_keeps_unsigned_package() {
    let env = TestEnv::new();
    let runner = MockRunner::failing("dpkg-sig");

    let err = run_build(&env.signing_config(), &runner, &mut SilentProgress).unwrap_err();

    assert_eq!(err.phase(), "sign");
    assert!(err.command_failure().is_some());
    assert_file_contains(&env.package(), "deb-archive");
    assert!(!env.staging().exists());

    let decrypted = runner.calls()[1].flag_value("-out").unwrap().to_string();
    assert!(!Path::new(&decrypted).exists());
}

#[test]
fn test_decrypt_failure_stops_pipeline() {
    let env = TestEnv::new();
    let runner = MockRunner::failing("openssl");

    let err = run_build(&env.signing_config(), &runner, &mut SilentProgress).unwrap_err();

    assert_eq!(err.phase(), "decrypt");
    assert_eq!(runner.programs(), ["dpkg", "openssl"]);
    assert_file_exists(&env.package());
}

#[test]
fn test_import_failure_stops_pipeline() {
    let env = TestEnv::new();
    let runner = MockRunner::failing("gpg");

    let err = run_build(&env.signing_config(), &runner, &mut SilentProgress).unwrap_err();

    assert_eq!(err.phase(), "import");
    assert_eq!(runner.programs(), ["dpkg", "openssl", "gpg"]);
}
