//! Black-box CLI tests driven through the compiled binary. These only
//! exercise the configuration-validation path (fatal at construction, per
//! spec.md §7) since a real reconcile tick needs live cloud/control-plane
//! credentials.

use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn reconcile_fails_fast_when_required_env_is_missing() {
    Command::cargo_bin("runnerscaler")
        .unwrap()
        .env_clear()
        .env("RUST_LOG", "error")
        .args(["--provider", "aws", "reconcile"])
        .assert()
        .failure()
        .stderr(contains("missing required env var"));
}

#[test]
fn reconcile_reports_unparseable_integer_config() {
    Command::cargo_bin("runnerscaler")
        .unwrap()
        .env_clear()
        .env("RUST_LOG", "error")
        .env("SG_BASE_URI", "https://example.invalid")
        .env("SG_API_KEY", "test-key")
        .env("SG_ORG", "test-org")
        .env("SG_RUNNER_GROUP", "test-group")
        .env("SCALE_OUT_THRESHOLD", "not-a-number")
        .env("SCALE_IN_THRESHOLD", "0")
        .env("SCALE_OUT_STEP", "1")
        .env("SCALE_IN_STEP", "1")
        .env("SCALE_OUT_COOLDOWN_DURATION", "5")
        .env("SCALE_IN_COOLDOWN_DURATION", "5")
        .env("SCALE_IN_TIMESTAMP_BLOB_NAME", "scale_in.txt")
        .env("SCALE_OUT_TIMESTAMP_BLOB_NAME", "scale_out.txt")
        .env("AWS_ASG_NAME", "test-asg")
        .env("AWS_BUCKET_NAME", "test-bucket")
        .args(["--provider", "aws", "reconcile"])
        .assert()
        .failure()
        .stderr(contains("not a valid integer"));
}

#[test]
fn reconcile_rejects_an_azure_only_config_under_the_aws_provider() {
    Command::cargo_bin("runnerscaler")
        .unwrap()
        .env_clear()
        .env("RUST_LOG", "error")
        .env("SG_BASE_URI", "https://example.invalid")
        .env("SG_API_KEY", "test-key")
        .env("SG_ORG", "test-org")
        .env("SG_RUNNER_GROUP", "test-group")
        .env("SCALE_OUT_THRESHOLD", "5")
        .env("SCALE_IN_THRESHOLD", "0")
        .env("SCALE_OUT_STEP", "1")
        .env("SCALE_IN_STEP", "1")
        .env("SCALE_OUT_COOLDOWN_DURATION", "5")
        .env("SCALE_IN_COOLDOWN_DURATION", "5")
        .env("SCALE_IN_TIMESTAMP_BLOB_NAME", "scale_in.txt")
        .env("SCALE_OUT_TIMESTAMP_BLOB_NAME", "scale_out.txt")
        .args(["--provider", "aws", "reconcile"])
        .assert()
        .failure()
        .stderr(contains("missing required env var AWS_"));
}
