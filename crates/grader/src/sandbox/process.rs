use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{ContainerInvocation, ExecutionError, ProcessRunner, RawOutput};

/// 基于 `tokio::process` 的容器运行器。
#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

/// 强制删除容器。
///
/// 杀死运行时客户端进程并不会停止已启动的容器，因此超时或取消后
/// 需要按名称删除；容器不存在时运行时会返回错误，这里只记录日志。
async fn force_remove(program: &str, container_name: &str) {
    let result = Command::new(program)
        .args(["rm", "-f", container_name])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    match result {
        Ok(output) if output.status.success() => {
            info!(container = %container_name, "container force-removed");
        }
        Ok(output) => {
            debug!(
                container = %container_name,
                stderr = %String::from_utf8_lossy(&output.stderr).trim_end(),
                "container force-remove reported failure"
            );
        }
        Err(err) => {
            warn!(container = %container_name, error = %err, "failed to force-remove container");
        }
    }
}

/// 运行中的容器。`run` 的 future 在容器结束前被丢弃时，在后台删除该容器。
struct RunningContainer {
    program: String,
    container_name: String,
    armed: bool,
}

impl RunningContainer {
    fn new(invocation: &ContainerInvocation) -> Self {
        Self {
            program: invocation.program.clone(),
            container_name: invocation.container_name.clone(),
            armed: true,
        }
    }

    fn finish(&mut self) {
        self.armed = false;
    }
}

impl Drop for RunningContainer {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        warn!(container = %self.container_name, "container run abandoned, removing in background");
        let program = std::mem::take(&mut self.program);
        let container_name = std::mem::take(&mut self.container_name);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { force_remove(&program, &container_name).await });
            }
            Err(_) => {
                let spawned = std::process::Command::new(&program)
                    .args(["rm", "-f", container_name.as_str()])
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .spawn();
                if let Err(err) = spawned {
                    warn!(container = %container_name, error = %err, "failed to force-remove container");
                }
            }
        }
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        invocation: &ContainerInvocation,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<RawOutput, ExecutionError> {
        debug!(
            program = %invocation.program,
            args = ?invocation.args,
            "spawning container process"
        );

        let child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| ExecutionError::Launch(format!("{}: {err}", invocation.program)))?;
        let mut container = RunningContainer::new(invocation);

        // 分支落败时 `wait_with_output` 的 future 连同子进程一起被丢弃，
        // kill_on_drop 会终止运行时客户端。
        let outcome = tokio::select! {
            output = child.wait_with_output() => {
                output.map_err(|err| ExecutionError::Io(err.to_string()))
            }
            _ = tokio::time::sleep(timeout) => Err(ExecutionError::Timeout(timeout)),
            _ = cancel.cancelled() => Err(ExecutionError::Cancelled),
        };

        match outcome {
            Ok(output) => {
                container.finish();
                Ok(RawOutput {
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    exit_code: output.status.code(),
                })
            }
            Err(err @ (ExecutionError::Timeout(_) | ExecutionError::Cancelled)) => {
                warn!(container = %invocation.container_name, error = %err, "terminating container");
                container.finish();
                force_remove(&invocation.program, &invocation.container_name).await;
                Err(err)
            }
            Err(err) => {
                container.finish();
                Err(err)
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    use super::*;

    const CONTAINER: &str = "apgw-grade-test";

    fn shell(script: &str) -> ContainerInvocation {
        ContainerInvocation {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
            container_name: CONTAINER.to_string(),
        }
    }

    /// 记录每次调用参数的假容器运行时；`run` 子命令会一直挂起。
    struct RecordingRuntime {
        _dir: tempfile::TempDir,
        log: PathBuf,
        invocation: ContainerInvocation,
    }

    impl RecordingRuntime {
        fn new() -> Self {
            let dir = tempfile::tempdir().expect("tempdir should be created");
            let log = dir.path().join("calls.log");
            let program = dir.path().join("runtime.sh");
            let script = format!(
                "#!/bin/sh\necho \"$@\" >> '{}'\nif [ \"$1\" = run ]; then exec sleep 30; fi\n",
                log.display()
            );
            std::fs::write(&program, script).expect("write runtime script");
            std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755))
                .expect("make runtime executable");

            let invocation = ContainerInvocation {
                program: program.display().to_string(),
                args: vec!["run".to_string(), "--name".to_string(), CONTAINER.to_string()],
                container_name: CONTAINER.to_string(),
            };
            Self {
                _dir: dir,
                log,
                invocation,
            }
        }

        fn calls(&self) -> Vec<String> {
            read_calls(&self.log)
        }

        async fn wait_for_removal(&self) -> bool {
            for _ in 0..100 {
                if self.removed() {
                    return true;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            false
        }

        fn removed(&self) -> bool {
            self.calls()
                .iter()
                .any(|call| call == &format!("rm -f {CONTAINER}"))
        }
    }

    fn read_calls(log: &Path) -> Vec<String> {
        std::fs::read_to_string(log)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn captures_stdout_and_exit_code() {
        let runner = TokioProcessRunner::new();

        let output = runner
            .run(
                &shell("echo building; echo 17; exit 3"),
                Duration::from_secs(10),
                &CancellationToken::new(),
            )
            .await
            .expect("process should run");

        assert_eq!(output.last_line(), "17");
        assert_eq!(output.exit_code, Some(3));
    }

    #[tokio::test]
    async fn missing_program_is_a_launch_error() {
        let runner = TokioProcessRunner::new();
        let invocation = ContainerInvocation {
            program: "apgw-no-such-runtime".to_string(),
            args: Vec::new(),
            container_name: CONTAINER.to_string(),
        };

        let err = runner
            .run(&invocation, Duration::from_secs(1), &CancellationToken::new())
            .await
            .expect_err("spawn should fail");

        assert!(matches!(err, ExecutionError::Launch(_)));
    }

    #[tokio::test]
    async fn finished_run_does_not_remove_container() {
        let runtime = RecordingRuntime::new();
        let invocation = ContainerInvocation {
            args: vec!["ps".to_string()],
            ..runtime.invocation.clone()
        };

        TokioProcessRunner::new()
            .run(&invocation, Duration::from_secs(10), &CancellationToken::new())
            .await
            .expect("process should run");
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(runtime.calls(), vec!["ps".to_string()]);
    }

    #[tokio::test]
    async fn slow_process_times_out_and_removes_container() {
        let runtime = RecordingRuntime::new();

        let err = TokioProcessRunner::new()
            .run(
                &runtime.invocation,
                Duration::from_millis(200),
                &CancellationToken::new(),
            )
            .await
            .expect_err("process should time out");

        assert_eq!(err, ExecutionError::Timeout(Duration::from_millis(200)));
        assert!(runtime.removed(), "calls: {:?}", runtime.calls());
    }

    #[tokio::test]
    async fn cancellation_stops_process_and_removes_container() {
        let runtime = RecordingRuntime::new();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let err = TokioProcessRunner::new()
            .run(&runtime.invocation, Duration::from_secs(30), &cancel)
            .await
            .expect_err("process should be cancelled");

        assert_eq!(err, ExecutionError::Cancelled);
        assert!(runtime.removed(), "calls: {:?}", runtime.calls());
    }

    #[tokio::test]
    async fn abandoned_run_removes_container() {
        let runtime = RecordingRuntime::new();
        let runner = TokioProcessRunner::new();
        let cancel = CancellationToken::new();

        let abandoned = tokio::time::timeout(
            Duration::from_millis(300),
            runner.run(&runtime.invocation, Duration::from_secs(30), &cancel),
        )
        .await;

        assert!(abandoned.is_err(), "run should still be in flight");
        assert!(
            runtime.wait_for_removal().await,
            "calls: {:?}",
            runtime.calls()
        );
    }
}
