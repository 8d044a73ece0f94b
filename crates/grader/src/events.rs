use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// 评分过程中对外广播的事件类型。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GradingEvent {
    /// 作业评分开始事件。
    GradingStarted {
        /// 作业 ID。
        assignment_id: Uuid,
        /// 待评分提交数量。
        submission_count: usize,
    },
    /// 单个提交评分完成事件。
    SubmissionGraded {
        assignment_id: Uuid,
        submission_id: Uuid,
        score: u32,
        /// 输出无法解析、按 0 分计。
        parse_failure: bool,
    },
    /// 单个提交评分失败事件。
    SubmissionFailed {
        assignment_id: Uuid,
        submission_id: Uuid,
        /// 失败错误码。
        code: String,
        /// 失败描述。
        reason: String,
    },
    /// 作业评分结束事件。
    GradingFinished {
        assignment_id: Uuid,
        graded: usize,
        failed: usize,
    },
}

/// 基于 `tokio::broadcast` 的事件广播器。
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<GradingEvent>,
}

impl EventBroadcaster {
    /// 创建事件广播器。
    ///
    /// `capacity` 表示内部广播队列容量。
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// 广播一个事件，没有订阅者时直接丢弃。
    pub fn emit(&self, event: GradingEvent) {
        let _ = self.sender.send(event);
    }

    /// 订阅事件流。
    pub fn subscribe(&self) -> EventStream {
        EventStream {
            receiver: self.sender.subscribe(),
        }
    }
}

/// 事件接收流包装器。
#[derive(Debug)]
pub struct EventStream {
    receiver: broadcast::Receiver<GradingEvent>,
}

impl EventStream {
    /// 异步接收下一条事件。
    pub async fn recv(&mut self) -> Result<GradingEvent> {
        Ok(self.receiver.recv().await?)
    }

    /// 非阻塞尝试接收一条事件。
    pub fn try_recv(&mut self) -> Result<GradingEvent> {
        Ok(self.receiver.try_recv()?)
    }
}
