#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use apgw_core::domain::{
    Assignment, AssignmentId, FixturePaths, GradingStore, OwnershipCheck, StoreError, StudentId,
    SubjectId, Submission, SubmissionId, TeacherId,
};
use apgw_grader::sandbox::CONTAINER_NAME_PREFIX;
use apgw_grader::{
    CancellationToken, ContainerInvocation, ExecutionError, GraderConfig, ProcessRunner, RawOutput,
};
use async_trait::async_trait;

#[derive(Default)]
pub struct InMemoryStore {
    assignments: Mutex<HashMap<AssignmentId, Assignment>>,
    submissions: Mutex<Vec<Submission>>,
    failing_saves: Mutex<HashSet<SubmissionId>>,
    reads: AtomicUsize,
    saves: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_assignment(&self, assignment: Assignment) {
        self.assignments
            .lock()
            .expect("assignments lock")
            .insert(assignment.id, assignment);
    }

    pub fn insert_submission(&self, submission: Submission) {
        self.submissions
            .lock()
            .expect("submissions lock")
            .push(submission);
    }

    pub fn fail_saves_for(&self, submission_id: SubmissionId) {
        self.failing_saves
            .lock()
            .expect("failing saves lock")
            .insert(submission_id);
    }

    pub fn submission(&self, submission_id: SubmissionId) -> Submission {
        self.submissions
            .lock()
            .expect("submissions lock")
            .iter()
            .find(|submission| submission.id == submission_id)
            .cloned()
            .expect("submission should exist")
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GradingStore for InMemoryStore {
    async fn find_assignment(&self, id: AssignmentId) -> Result<Option<Assignment>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .assignments
            .lock()
            .expect("assignments lock")
            .get(&id)
            .cloned())
    }

    async fn find_submissions_for_assignment(
        &self,
        id: AssignmentId,
    ) -> Result<Vec<Submission>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .submissions
            .lock()
            .expect("submissions lock")
            .iter()
            .filter(|submission| submission.assignment_id == id)
            .cloned()
            .collect())
    }

    async fn save_submission(&self, submission: &Submission) -> Result<(), StoreError> {
        if self
            .failing_saves
            .lock()
            .expect("failing saves lock")
            .contains(&submission.id)
        {
            return Err(StoreError::Backend("database is read-only".to_string()));
        }

        self.saves.fetch_add(1, Ordering::SeqCst);
        let mut submissions = self.submissions.lock().expect("submissions lock");
        if let Some(stored) = submissions
            .iter_mut()
            .find(|stored| stored.id == submission.id)
        {
            *stored = submission.clone();
        }
        Ok(())
    }
}

pub struct StaticOwnership {
    owner: TeacherId,
}

impl StaticOwnership {
    pub fn new(owner: TeacherId) -> Self {
        Self { owner }
    }
}

#[async_trait]
impl OwnershipCheck for StaticOwnership {
    async fn is_owner(
        &self,
        teacher: TeacherId,
        _assignment: AssignmentId,
    ) -> Result<bool, StoreError> {
        Ok(teacher == self.owner)
    }
}

#[derive(Debug, Clone)]
pub enum FakeResponse {
    Stdout(String),
    LaunchFailure,
    /// Never finishes on its own; ends by timeout or cancellation.
    Hang,
}

/// What the fake runner observed for one container run.
#[derive(Debug, Clone)]
pub struct ObservedRun {
    pub submission_id: SubmissionId,
    pub invocation: ContainerInvocation,
    pub workspace: PathBuf,
    pub staged_files: Vec<String>,
}

pub struct FakeRunner {
    responses: Mutex<HashMap<SubmissionId, FakeResponse>>,
    runs: Mutex<Vec<ObservedRun>>,
    delay: Duration,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            runs: Mutex::new(Vec::new()),
            delay,
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    pub fn respond(&self, submission_id: SubmissionId, response: FakeResponse) {
        self.responses
            .lock()
            .expect("responses lock")
            .insert(submission_id, response);
    }

    pub fn runs(&self) -> Vec<ObservedRun> {
        self.runs.lock().expect("runs lock").clone()
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

fn mounted_workspace(invocation: &ContainerInvocation) -> PathBuf {
    let mount = invocation
        .args
        .iter()
        .position(|arg| arg == "-v")
        .and_then(|index| invocation.args.get(index + 1))
        .expect("invocation should mount the workspace");
    let (host, _) = mount
        .rsplit_once(':')
        .expect("mount should be host:container");
    PathBuf::from(host)
}

fn list_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(
        &self,
        invocation: &ContainerInvocation,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<RawOutput, ExecutionError> {
        let submission_id: SubmissionId = invocation
            .container_name
            .strip_prefix(CONTAINER_NAME_PREFIX)
            .and_then(|id| id.parse().ok())
            .expect("container name should carry the submission id");
        let workspace = mounted_workspace(invocation);

        self.runs.lock().expect("runs lock").push(ObservedRun {
            submission_id,
            invocation: invocation.clone(),
            staged_files: list_files(&workspace),
            workspace,
        });

        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let response = self
            .responses
            .lock()
            .expect("responses lock")
            .get(&submission_id)
            .cloned()
            .unwrap_or_else(|| FakeResponse::Stdout("0\n".to_string()));

        let result = match response {
            FakeResponse::Stdout(stdout) => Ok(RawOutput {
                stdout,
                stderr: String::new(),
                exit_code: Some(0),
            }),
            FakeResponse::LaunchFailure => Err(ExecutionError::Launch(
                "docker: command not found".to_string(),
            )),
            FakeResponse::Hang => {
                tokio::select! {
                    _ = tokio::time::sleep(timeout) => Err(ExecutionError::Timeout(timeout)),
                    _ = cancel.cancelled() => Err(ExecutionError::Cancelled),
                }
            }
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Temporary directory tree with fixtures, scripts and uploads.
pub struct TestEnv {
    pub dir: tempfile::TempDir,
    pub assignment: Assignment,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let base = dir.path();

        let fixtures = base.join("assi");
        std::fs::create_dir_all(&fixtures).expect("create fixtures dir");
        std::fs::write(fixtures.join("input"), "1 2\n3 4\n").expect("write input");
        std::fs::write(fixtures.join("output"), "3\n7\n").expect("write output");
        std::fs::write(fixtures.join("question"), "Add two numbers.\n").expect("write question");

        let scripts = base.join("scripts");
        std::fs::create_dir_all(&scripts).expect("create scripts dir");
        std::fs::write(scripts.join("c-script.sh"), "#!/bin/sh\n").expect("write c script");
        std::fs::write(scripts.join("cpp-script.sh"), "#!/bin/sh\n").expect("write cpp script");

        std::fs::create_dir_all(base.join("uploads")).expect("create uploads dir");

        let assignment = Assignment {
            id: AssignmentId::new(),
            subject_id: SubjectId::new(),
            title: "A+B".to_string(),
            fixtures: FixturePaths {
                input: fixtures.join("input"),
                output: fixtures.join("output"),
                question: fixtures.join("question"),
            },
        };

        Self { dir, assignment }
    }

    pub fn workspace_root(&self) -> PathBuf {
        self.dir.path().join("temp")
    }

    pub fn config(&self) -> GraderConfig {
        GraderConfig::new(self.workspace_root(), self.dir.path().join("scripts"))
    }

    /// Writes an uploaded source file and returns a pending submission for it.
    pub fn submission(&self, file_name: &str) -> Submission {
        let id = SubmissionId::new();
        let dir = self.dir.path().join("uploads").join(id.to_string());
        std::fs::create_dir_all(&dir).expect("create upload dir");
        let path = dir.join(file_name);
        std::fs::write(&path, "int main() { return 0; }\n").expect("write upload");

        let mut submission = Submission::new(self.assignment.id, StudentId::new(), path);
        submission.id = id;
        submission
    }

    pub fn leftover_workspaces(&self) -> Vec<String> {
        list_files(&self.workspace_root())
    }
}
