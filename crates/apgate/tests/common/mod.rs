#![allow(deprecated)]

use assert_cmd::Command;
use serde_json::{Value, json};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const ARN: &str = "arn:aws:elasticloadbalancing:us-east-1:1:loadbalancer/app/edge/1";

/// Fixture cloud and config file in a temporary directory
pub struct TestCloud {
    pub root: TempDir,
}

impl TestCloud {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let cloud = Self { root };
        cloud.write_config(
            "poll:\n  interval_ms: 10\n  max_interval_ms: 10\n  access_point_timeout_ms: 2000\n  agent_timeout_ms: 100\n",
        );
        cloud.write_fixture(&default_fixture());
        cloud
    }

    pub fn write_config(&self, content: &str) {
        fs::write(self.config_path(), content).unwrap();
    }

    pub fn write_fixture(&self, fixture: &Value) {
        let content = serde_json::to_string_pretty(fixture).unwrap();
        fs::write(self.fixture_path(), content).unwrap();
    }

    pub fn read_fixture(&self) -> Value {
        let content = fs::read_to_string(self.fixture_path()).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.path().join("apgate.yaml")
    }

    pub fn fixture_path(&self) -> PathBuf {
        self.root.path().join("cloud.json")
    }

    /// `apgate` bound to this fixture and config
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("apgate").unwrap();
        cmd.current_dir(self.root.path())
            .env("APGATE_CONFIG_PATH", self.config_path())
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .arg("--fixture")
            .arg(self.fixture_path());
        cmd
    }
}

fn options(account: &str, field: &str, parents: Value, values: &[&str]) -> Value {
    let options: Vec<Value> = values
        .iter()
        .map(|v| json!({"label": v, "value": v}))
        .collect();
    json!({"account": account, "field": field, "parents": parents, "options": options})
}

/// AWS account `ca-1` with one VPC in us-east-1, three load balancers and
/// an errored access point wrapping one of them
pub fn default_fixture() -> Value {
    json!({
        "version": 1,
        "options": [
            options("ca-1", "region", json!({}), &["us-east-1", "us-west-2"]),
            options("ca-1", "vpc", json!({"region": "us-east-1"}), &["vpc-east"]),
            options("ca-1", "vpc", json!({"region": "us-west-2"}), &["vpc-west"]),
            options("ca-1", "certificate", json!({}), &["cert-1"]),
            options("ca-1", "subnet", json!({"vpc": "vpc-east"}), &["subnet-a", "subnet-b"]),
            options("ca-1", "security_group", json!({"vpc": "vpc-east"}), &["sg-1"]),
            options("ca-1", "public_ip", json!({}), &[]),
            options("ca-1", "hosted_zone", json!({}), &["Z1"]),
        ],
        "cores": [
            {"account": "ca-1", "region": "us-east-1",
             "resource": {"arn": ARN, "name": "edge", "vpc_id": "vpc-east"}},
            {"account": "ca-1", "region": "us-east-1",
             "resource": {"arn": "arn:broken", "name": "broken", "vpc_id": "vpc-east"}},
        ],
        "access_points": [
            {"id": "ap-9", "name": "broken", "cloud_account_id": "ca-1", "type": "aws",
             "status": "errored", "region": "us-east-1", "vpc": "vpc-east",
             "metadata": {"albArn": "arn:broken"}}
        ],
        "heartbeats": {"nightly": 2},
        "next_id": 0
    })
}
