//! CLI integration tests using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn testmate() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("testmate").unwrap()
}

/// A scratch directory holding the database and the question bank.
struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn seeded() -> Self {
        let ws = Self::new();
        ws.cmd().arg("seed").assert().success();
        ws
    }

    fn bare(&self) -> Command {
        let mut cmd = testmate();
        cmd.current_dir(self.dir.path())
            .env_remove("TESTMATE_DB_URL")
            .env_remove("TESTMATE_BANK_DIR")
            .env_remove("TESTMATE_PROFILE")
            .env_remove("RUST_LOG");
        cmd
    }

    fn cmd(&self) -> Command {
        let mut cmd = self.bare();
        cmd.arg("--db")
            .arg(self.dir.path().join("data/testmate.db"))
            .arg("--bank")
            .arg(self.dir.path().join("bank"));
        cmd
    }
}

#[test]
fn empty_bank_suggests_seeding() {
    Workspace::new()
        .cmd()
        .arg("structure")
        .assert()
        .success()
        .stdout(predicate::str::contains("Run `testmate seed`"));
}

#[test]
fn seed_creates_bank_once() {
    let ws = Workspace::new();
    ws.cmd()
        .arg("seed")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created Math / Arithmetic / Basics (4 questions)"))
        .stdout(predicate::str::contains("Created Geography / Europe / Capitals (3 questions)"));

    assert!(ws.dir.path().join("bank/Math/Arithmetic/Basics.json").exists());
    assert!(ws.dir.path().join("data/testmate.db").exists());

    ws.cmd()
        .arg("seed")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists, skipping"));

    ws.cmd()
        .arg("structure")
        .assert()
        .success()
        .stdout(predicate::str::contains("Capitals"))
        .stdout(predicate::str::contains("2 repositories"));
}

#[test]
fn questions_and_search() {
    let ws = Workspace::seeded();
    ws.cmd()
        .args(["questions", "Geography/Europe/Capitals", "--answers"])
        .assert()
        .success()
        .stdout(predicate::str::contains("capital of Spain"))
        .stdout(predicate::str::contains("Paris"));

    ws.cmd()
        .args(["search", "Geography/Europe/Capitals", "PARIS"])
        .assert()
        .success()
        .stdout(predicate::str::contains("capital of France"))
        .stdout(predicate::str::contains("1 match(es)"));

    ws.cmd()
        .args(["search", "Geography/Europe/Capitals", "Berlin"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No questions"));
}

#[test]
fn invalid_repository_argument_is_rejected() {
    Workspace::seeded()
        .cmd()
        .args(["questions", "Math/Arithmetic"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("DOMAIN/TOPIC/REPOSITORY"));
}

#[test]
fn missing_repository_reports_error() {
    Workspace::seeded()
        .cmd()
        .args(["questions", "Math/Arithmetic/Nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn take_test_from_stdin_saves_result() {
    let ws = Workspace::seeded();
    ws.cmd()
        .args(["take", "Math/Arithmetic/Basics"])
        .write_stdin("2\n1,3\n7\n12.0\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Question 4/4"))
        .stdout(predicate::str::contains("Score: 100% (4 correct"))
        .stdout(predicate::str::contains("Saved result test_"));

    ws.cmd()
        .arg("results")
        .assert()
        .success()
        .stdout(predicate::str::contains("Basics - "))
        .stdout(predicate::str::contains("100%"));
}

#[test]
fn take_range_is_clamped_not_rejected() {
    let ws = Workspace::seeded();
    ws.cmd()
        .args(["take", "Math/Arithmetic/Basics", "--start", "0", "--end", "2"])
        .write_stdin("2\n1,3\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Question 2/2"))
        .stdout(predicate::str::contains("Score: 100% (2 correct"));

    ws.cmd()
        .args(["take", "Math/Arithmetic/Basics", "--start", "3", "--end", "2"])
        .write_stdin("1,3\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Question 1/1"))
        .stdout(predicate::str::contains("Which numbers are even?"))
        .stdout(predicate::str::contains("Score: 100% (1 correct"));

    ws.cmd()
        .args(["take", "Math/Arithmetic/Basics", "--start", "3", "--end", "99"])
        .write_stdin("7\n12\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Question 2/2"))
        .stdout(predicate::str::contains("Score: 100% (2 correct"));
}

#[test]
fn retake_incorrect_after_finishing() {
    let ws = Workspace::seeded();
    ws.cmd()
        .args(["take", "Geography/Europe/Capitals"])
        .write_stdin("2\n:n\nLyon\n:n\nRome\n:f\ni\n3\n:n\nParis\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Score: 33%"))
        .stdout(predicate::str::contains("Retake? [i] incorrect (2)"))
        .stdout(predicate::str::contains("Question 1/2 [incorrectPreviousAttempt]"))
        .stdout(predicate::str::contains("Score: 50%"));

    ws.cmd()
        .arg("results")
        .assert()
        .success()
        .stdout(predicate::str::contains("Capitals - Incorrect Only"));
}

#[test]
fn configurations_track_attempts() {
    let ws = Workspace::seeded();
    ws.cmd()
        .args([
            "config",
            "create",
            "Math/Arithmetic/Basics",
            "--name",
            "Warmup",
            "--end",
            "2",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created configuration 1: Warmup"));

    ws.cmd()
        .args(["config", "list", "Math/Arithmetic/Basics"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Warmup"));

    ws.cmd()
        .args(["take", "--config-id", "1"])
        .write_stdin("2\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Score: 50%"))
        .stdout(predicate::str::contains("Saved attempt #1 (Full Test)."));

    ws.cmd()
        .args(["config", "attempts", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Full Test"))
        .stdout(predicate::str::contains("50%"));

    ws.cmd()
        .args(["config", "delete", "1"])
        .assert()
        .success();
    ws.cmd()
        .args(["config", "attempts", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no configuration with id 1"));
}

#[test]
fn practice_progress_is_reported_and_cleared() {
    let ws = Workspace::seeded();
    ws.cmd()
        .args(["take", "Math/Arithmetic/Basics", "--practice"])
        .write_stdin("2\n1\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Practice progress saved."));

    ws.cmd()
        .args(["practice", "stats", "Math/Arithmetic/Basics"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Answered:  2"))
        .stdout(predicate::str::contains("Accuracy:  50.00%"));

    ws.cmd()
        .args(["practice", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Math / Arithmetic / Basics"));

    ws.cmd()
        .args(["practice", "clear", "Math/Arithmetic/Basics"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared practice progress"));

    ws.cmd()
        .args(["practice", "stats", "Math/Arithmetic/Basics"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No practice progress"));
}

#[test]
fn statuses_are_per_profile() {
    let ws = Workspace::seeded();
    ws.cmd()
        .env("TESTMATE_PROFILE", "alice")
        .args(["status", "set", "Math/Arithmetic/Basics", " Learning "])
        .assert()
        .success()
        .stdout(predicate::str::contains("Learning"));

    ws.cmd()
        .args(["status", "list", "--profile", "alice"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Learning"));

    ws.cmd()
        .args(["status", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No repository statuses"));

    ws.cmd()
        .args(["status", "set", "Math/Arithmetic/Basics", "  "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("status must not be empty"));
}

#[test]
fn move_and_delete_questions() {
    let ws = Workspace::seeded();
    ws.cmd()
        .args(["move-questions", "Geography/Europe/Capitals", "--to", "Italy", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Moved 1 question(s)"));

    ws.cmd()
        .args(["questions", "Geography/Europe/Italy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("capital of Italy"));

    ws.cmd()
        .args(["delete-question", "Geography/Europe/Capitals", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted question 1"));

    ws.cmd()
        .args(["questions", "Geography/Europe/Capitals"])
        .assert()
        .success()
        .stdout(predicate::str::contains("capital of France"))
        .stdout(predicate::str::contains("Spain").not())
        .stdout(predicate::str::contains("Italy").not());

    ws.cmd()
        .args(["delete-question", "Geography/Europe/Capitals", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("question numbers start at 1"));
}

#[test]
fn config_file_supplies_defaults() {
    let ws = Workspace::new();
    std::fs::write(
        ws.dir.path().join("testmate.toml"),
        "database_url = \"sqlite:store/app.db\"\nbank_dir = \"questions\"\nprofile = \"bob\"\n",
    )
    .unwrap();

    ws.bare().arg("seed").assert().success();
    assert!(ws.dir.path().join("store/app.db").exists());
    assert!(ws.dir.path().join("questions/Geography/Europe/Capitals.json").exists());

    ws.bare()
        .args(["status", "set", "Geography/Europe/Capitals", "Done"])
        .assert()
        .success();
    ws.bare()
        .args(["status", "list", "--profile", "bob"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Done"));
}

#[test]
fn broken_config_file_is_an_error() {
    let ws = Workspace::new();
    let path = ws.dir.path().join("custom.toml");
    std::fs::write(&path, "unknown_key = 1\n").unwrap();

    ws.bare()
        .arg("--config")
        .arg(&path)
        .arg("structure")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse config"));
}
