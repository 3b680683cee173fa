use assert_cmd::Command;

fn bookshelf() -> Command {
    let mut cmd = Command::cargo_bin("bookshelf-cli").expect("binary should be built");
    cmd.env_remove("RUST_LOG")
        .env_remove("DATABASE_URL")
        .env("BOOKSHELF_CONFIG_DIR", std::env::temp_dir().join("bookshelf-cli-no-config"));
    cmd
}

#[test]
fn help_lists_subcommands() {
    let output = bookshelf().arg("--help").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("serve"));
    assert!(stdout.contains("migrate"));
    assert!(stdout.contains("check-config"));
}

#[test]
fn check_config_reflects_environment_and_hides_password() {
    let output = bookshelf()
        .arg("check-config")
        .env("PORT", "9191")
        .env("POSTGRES_USER", "librarian")
        .env("POSTGRES_PASSWORD", "hunter2")
        .env("POSTGRES_HOST", "db")
        .env("POSTGRES_DB", "library")
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("0.0.0.0:9191"));
    assert!(stdout.contains("librarian@db:5432/library"));
    assert!(!stdout.contains("hunter2"));
}

#[test]
fn unknown_environment_fails() {
    let output = bookshelf()
        .arg("check-config")
        .env("BOOKSHELF_ENV", "qa")
        .output()
        .unwrap();
    assert!(!output.status.success());

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("unsupported environment"));
}

#[test]
fn migrate_exits_non_zero_when_database_is_unreachable() {
    let output = bookshelf()
        .arg("migrate")
        .env("POSTGRES_HOST", "127.0.0.1")
        .env("BOOKSHELF_DATABASE__PORT", "1")
        .env("BOOKSHELF_DATABASE__CONNECT_TIMEOUT_MS", "500")
        .output()
        .unwrap();
    assert!(!output.status.success());

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("failed to connect to database"));
}
