use std::path::Path;
use std::process::{Command, Output};

const WORKSPACE: &str = "6f1c2d3e-4b5a-4c6d-8e7f-0123456789ab";

fn envseal(home: &Path, store: &str, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_envseal"))
        .args(args)
        .env("HOME", home)
        .env("ENVSEAL_CONFIG", home.join("config.json"))
        .env("ENVSEAL_STORE", store)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run envseal")
}

fn ok(home: &Path, store: &str, args: &[&str]) -> String {
    let out = envseal(home, store, args);
    assert!(
        out.status.success(),
        "envseal {:?} failed: {}",
        args,
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8(out.stdout).unwrap()
}

fn field<'a>(output: &'a str, label: &str) -> &'a str {
    output
        .lines()
        .find_map(|l| l.trim().strip_prefix(label))
        .map(str::trim)
        .unwrap_or_else(|| panic!("no '{}' in output:\n{}", label, output))
}

#[test]
fn demo() {
    let dir = tempfile::tempdir().unwrap();
    let alice = dir.path().join("alice");
    let bob = dir.path().join("bob");
    std::fs::create_dir_all(&alice).unwrap();
    std::fs::create_dir_all(&bob).unwrap();
    let store = format!("sqlite://{}", dir.path().join("store.db").display());
    let dotenv = dir.path().join("deploy").join(".env");

    ok(&alice, &store, &["init", "--name", "alice"]);
    let bob_init = ok(&bob, &store, &["init", "--name", "bob"]);
    let bob_id = field(&bob_init, "ID:").to_string();

    ok(&alice, &store, &["workspace", "create", "--id", WORKSPACE]);
    ok(
        &alice,
        &store,
        &["secret", "set", "-w", WORKSPACE, "-e", "dev", "DB_PASSWORD", "s3cr3t"],
    );

    // bob has no wrapped key yet
    assert!(!envseal(&bob, &store, &["workspace", "check", "-w", WORKSPACE])
        .status
        .success());
    assert!(
        !envseal(&bob, &store, &["secret", "get", "-w", WORKSPACE, "-e", "dev", "DB_PASSWORD"])
            .status
            .success()
    );

    ok(&alice, &store, &["member", "add", "-w", WORKSPACE, &bob_id]);
    ok(&bob, &store, &["workspace", "check", "-w", WORKSPACE]);
    let value = ok(
        &bob,
        &store,
        &["secret", "get", "-w", WORKSPACE, "-e", "dev", "DB_PASSWORD"],
    );
    assert_eq!(value.trim_end(), "s3cr3t");

    // bob's personal override is invisible to alice
    ok(
        &bob,
        &store,
        &["secret", "set", "-w", WORKSPACE, "-e", "dev", "--personal", "DB_PASSWORD", "mine"],
    );
    let alice_view = ok(
        &alice,
        &store,
        &["secret", "get", "-w", WORKSPACE, "-e", "dev", "DB_PASSWORD"],
    );
    assert_eq!(alice_view.trim_end(), "s3cr3t");

    let target = dotenv.to_str().unwrap();
    let added = ok(
        &bob,
        &store,
        &[
            "integration", "add", "-w", WORKSPACE, "-e", "dev", "--provider", "dotenv", "--target",
            target,
        ],
    );
    let integration_id = field(&added, "✓ Integration")
        .split_whitespace()
        .next()
        .unwrap()
        .to_string();

    ok(&bob, &store, &["integration", "disable", "-w", WORKSPACE, &integration_id]);
    let paused = ok(&bob, &store, &["push", "-w", WORKSPACE, "-e", "dev"]);
    assert!(paused.contains("No active integrations"));
    assert!(!dotenv.exists());

    ok(&bob, &store, &["integration", "enable", "-w", WORKSPACE, &integration_id]);
    ok(&bob, &store, &["push", "-w", WORKSPACE, "-e", "dev"]);
    assert_eq!(
        std::fs::read_to_string(&dotenv).unwrap(),
        "DB_PASSWORD=\"mine\"\n"
    );

    ok(&alice, &store, &["member", "remove", "-w", WORKSPACE, &bob_id]);
    assert!(!envseal(&bob, &store, &["workspace", "check", "-w", WORKSPACE])
        .status
        .success());
}

#[test]
fn whoami_without_init_fails() {
    let dir = tempfile::tempdir().unwrap();
    let store = format!("sqlite://{}", dir.path().join("store.db").display());
    let out = envseal(dir.path(), &store, &["whoami"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("NotFound"));
}
