#![allow(deprecated)] // TODO: move from Command::cargo_bin to cargo_bin_cmd!

mod common;

use assert_cmd::Command;
use common::{ARN, TestCloud};
use predicates::prelude::*;

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("apgate").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("options"))
        .stdout(predicate::str::contains("reconcile"))
        .stdout(predicate::str::contains("provision"))
        .stdout(predicate::str::contains("verify-agent"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("apgate").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("apgate"));
}

#[test]
fn test_provision_help_lists_cascade_flags() {
    let mut cmd = Command::cargo_bin("apgate").unwrap();
    cmd.args(["provision", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--security-group"))
        .stdout(predicate::str::contains("--units"))
        .stdout(predicate::str::contains("--edit"));
}

#[test]
fn test_unknown_provider_is_rejected() {
    let cloud = TestCloud::new();
    cloud
        .cmd()
        .args(["options", "--provider", "oracle", "--account", "ca-1"])
        .assert()
        .failure();
}

#[test]
fn test_options_follow_region_selection() {
    let cloud = TestCloud::new();
    cloud
        .cmd()
        .args(["options", "-p", "aws", "-a", "ca-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("us-west-2"))
        .stdout(predicate::str::contains("waiting for upstream selection"))
        .stdout(predicate::str::contains("vpc-east").not());

    cloud
        .cmd()
        .args(["options", "-p", "aws", "-a", "ca-1", "--set", "region=us-east-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vpc-east"))
        .stdout(predicate::str::contains("vpc-west").not());
}

#[test]
fn test_options_follow_typed_region() {
    let cloud = TestCloud::new();
    cloud.write_config("debounce_ms: 50\n");
    cloud
        .cmd()
        .args(["options", "-p", "aws", "-a", "ca-1", "--follow", "region"])
        .write_stdin("us-\nus-east-1\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("vpc-east"))
        .stdout(predicate::str::contains("vpc-west").not());
}

#[test]
fn test_options_reject_unavailable_value() {
    let cloud = TestCloud::new();
    cloud
        .cmd()
        .args(["options", "-p", "aws", "-a", "ca-1", "--set", "region=mars-1"])
        .assert()
        .failure();
}

#[test]
fn test_cores_mark_errored_access_point() {
    let cloud = TestCloud::new();
    cloud
        .cmd()
        .args(["cores", "-p", "aws", "-a", "ca-1", "-r", "us-east-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("edge"))
        .stdout(predicate::str::contains("ap-9"))
        .stdout(predicate::str::contains("errored access point"));
}

#[test]
fn test_reconcile_verdicts() {
    let cloud = TestCloud::new();
    cloud
        .cmd()
        .args(["reconcile", "-p", "aws", "-a", "ca-1", "-r", "us-east-1", "--core", ARN])
        .assert()
        .success()
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("vpc-east"));

    cloud
        .cmd()
        .args([
            "reconcile", "-p", "aws", "-a", "ca-1", "-r", "us-east-1", "--core", "arn:broken",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("errored access point"))
        .stderr(predicate::str::contains("running the command again").not());

    cloud
        .cmd()
        .args([
            "reconcile", "-p", "aws", "-a", "ca-1", "-r", "us-east-1", "--core", "arn:missing",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown core resource"));
}

#[test]
fn test_provision_then_reuse() {
    let cloud = TestCloud::new();
    cloud
        .cmd()
        .args([
            "provision",
            "-p",
            "aws",
            "-a",
            "ca-1",
            "-n",
            "edge",
            "-r",
            "us-east-1",
            "--vpc",
            "vpc-east",
            "--security-group",
            "sg-1",
            "--core",
            ARN,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("ap-1"))
        .stdout(predicate::str::contains("Access point is ready"));

    let fixture = cloud.read_fixture();
    let created = fixture["access_points"]
        .as_array()
        .unwrap()
        .iter()
        .find(|ap| ap["id"] == "ap-1")
        .unwrap();
    assert_eq!(created["status"], "created");
    assert_eq!(created["metadata"]["albArn"], ARN);

    cloud
        .cmd()
        .args(["reconcile", "-p", "aws", "-a", "ca-1", "-r", "us-east-1", "--core", ARN])
        .assert()
        .success()
        .stdout(predicate::str::contains("reuse"))
        .stdout(predicate::str::contains("ap-1"));
}

#[test]
fn test_provision_rejects_value_outside_cascade() {
    let cloud = TestCloud::new();
    cloud
        .cmd()
        .args([
            "provision", "-p", "aws", "-a", "ca-1", "-n", "edge", "-r", "us-east-1", "--vpc",
            "vpc-west",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("vpc-west"));

    let fixture = cloud.read_fixture();
    assert_eq!(fixture["access_points"].as_array().unwrap().len(), 1);
}

#[test]
fn test_verify_agent() {
    let cloud = TestCloud::new();
    cloud
        .cmd()
        .args(["verify-agent", "-p", "aws", "-a", "ca-1", "--rule", "nightly", "--units", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("All agents reported in"));

    cloud
        .cmd()
        .args(["verify-agent", "-p", "aws", "-a", "ca-1", "--rule", "nightly", "--units", "3"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("timed out"))
        .stderr(predicate::str::contains("running the command again"));
}
