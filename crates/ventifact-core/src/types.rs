//! Core domain types for the Blueprints storage engine.
//! Pure value types — no sqlx, no DB dependencies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A 64-bit content digest, big-endian SHAKE256 truncation interpreted as a
/// signed integer for storage.
pub type BlueprintId = i64;

/// External CI source a `TestRun` was observed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CiSource {
    Appveyor,
    Circleci,
}

impl CiSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Appveyor => "appveyor",
            Self::Circleci => "circleci",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "appveyor" => Some(Self::Appveyor),
            "circleci" => Some(Self::Circleci),
            _ => None,
        }
    }
}

/// Merge outcome for a peripheral `PR` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrStatus {
    Success,
    Failure,
    Neutral,
    Unknown,
}

impl PrStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Neutral => "neutral",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "failure" => Some(Self::Failure),
            "neutral" => Some(Self::Neutral),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

/// The canonical record of a single test, identified by its title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestBlueprint {
    pub id: BlueprintId,
    pub title: String,
}

/// The canonical record of a *set* of tests (a "shape" of test run).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRunBlueprint {
    pub id: BlueprintId,
    /// Sorted ascending by raw digest bytes.
    pub members: Vec<BlueprintId>,
}

/// Composite primary key for a `TestRun`: `(source, ext_id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestRunId {
    pub source: CiSource,
    pub ext_id: i64,
}

/// An actual execution instance from an external CI source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRun {
    pub id: TestRunId,
    pub blueprint_id: BlueprintId,
    pub timestamp: DateTime<Utc>,
    pub branch: Option<String>,
    pub commit_id: Vec<u8>,
    /// `None` means absent (all tests passed). See C2.
    pub result_spec: Option<Vec<u8>>,
}

/// A marker recording that a specific test in a specific run flipped outcome
/// versus a prior run on the same commit with the same shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestFlake {
    pub test_run_id: TestRunId,
    pub test_blueprint_id: BlueprintId,
}

/// Peripheral entity — included because it shares retention semantics with
/// `TestRun` but is not part of the dedup graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pr {
    pub number: i64,
    pub merged_at: DateTime<Utc>,
    pub status: PrStatus,
}

/// One `(title, passed)` observation in an ingested run, in the order the
/// collector reported it. Input to C1 + C2 via `insert_test_run`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub title: String,
    pub passed: bool,
}

/// Input to `insert_test_run`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTestRun {
    pub id: TestRunId,
    pub results: Vec<TestResult>,
    pub timestamp: DateTime<Utc>,
    pub branch: Option<String>,
    pub commit_id: Vec<u8>,
}

/// A row in the public read model, as exposed to the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentTestRun {
    pub id: TestRunId,
    pub timestamp: DateTime<Utc>,
    pub commit_id: Vec<u8>,
    pub succeeded: bool,
}

/// A row in the public flake read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentTestFlake {
    pub test_run_id: TestRunId,
    pub test_title: String,
    pub timestamp: DateTime<Utc>,
}

/// Per-UTC-date PR status bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrStatusBucket {
    pub date: chrono::NaiveDate,
    pub status: PrStatus,
    pub count: i64,
}
