//! AI 分析（消费者）- 出队、模型回退、限流重试、触发通知
//!
//! 每个条目按优先级列表逐个模型尝试：
//! - 成功 → 产出结果并通知，该条目结束
//! - 瞬时限流（配额未耗尽）→ 指数退避后重试同一模型，退避可被 shutdown 中断
//! - 配额耗尽 / 模型不存在 / 未知错误 → 换下一个模型，不重试
//! - 所有模型失败 → 丢弃条目并发失败通知，继续下一个条目
//!
//! 条目之间完全隔离：单条失败不影响后续处理。

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::ai::{AnalysisResult, ClassifyBackend, ClassifyError, ModelPriorityList};
use crate::backoff::RetryPolicy;
use crate::notify::NotificationSink;
use crate::signals::Signals;
use crate::watcher::ClipboardItem;

/// 出队等待超时：保证 shutdown 轮询延迟有界
pub const RECV_TIMEOUT: Duration = Duration::from_secs(1);

/// shutdown 后排空队列的默认时限
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// 单个模型上的尝试结果
enum ModelOutcome {
    Success(AnalysisResult),
    NextModel,
    Shutdown,
}

/// AI 分析器
pub struct Analyzer<B: ClassifyBackend, N: NotificationSink> {
    backend: B,
    sink: N,
    models: ModelPriorityList,
    policy: RetryPolicy,
    rx: Receiver<ClipboardItem>,
    signals: Arc<Signals>,
    drain_timeout: Duration,
}

impl<B: ClassifyBackend, N: NotificationSink> Analyzer<B, N> {
    pub fn new(
        backend: B,
        sink: N,
        models: ModelPriorityList,
        rx: Receiver<ClipboardItem>,
        signals: Arc<Signals>,
    ) -> Self {
        Self {
            backend,
            sink,
            models,
            policy: RetryPolicy::default(),
            rx,
            signals,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// 消费主循环：shutdown 置位后先排空队列再返回
    pub fn run(&mut self) {
        info!(models = ?self.models.as_slice(), "Analyzer started");
        loop {
            if self.signals.is_shutdown() {
                self.drain();
                break;
            }
            match self.rx.recv_timeout(RECV_TIMEOUT) {
                Ok(item) => self.process(item),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!("Analyzer stopped");
    }

    /// 排空阶段：处理剩余条目，超出时限的直接丢弃
    fn drain(&mut self) {
        let deadline = Instant::now() + self.drain_timeout;
        let mut discarded = 0usize;
        while let Ok(item) = self.rx.try_recv() {
            if Instant::now() >= deadline {
                discarded += 1;
                continue;
            }
            self.process(item);
        }
        if discarded > 0 {
            warn!(discarded, "Drain deadline reached, pending items discarded");
        }
    }

    /// 处理单个条目
    fn process(&self, item: ClipboardItem) {
        debug!(
            captured_at = %item.captured_at.format("%H:%M:%S"),
            len = item.text.len(),
            "Analyzing clipboard item"
        );

        for model in self.models.iter() {
            match self.try_model(model, &item.text) {
                ModelOutcome::Success(result) => {
                    info!(
                        model = %result.model,
                        classification = %result.classification,
                        "Analysis complete"
                    );
                    // 通知是 fire-and-forget，失败仅记录
                    if let Err(e) = self.sink.deliver(&result) {
                        warn!(error = %e, "Notification delivery failed");
                    }
                    return;
                }
                ModelOutcome::NextModel => continue,
                ModelOutcome::Shutdown => return,
            }
        }

        error!("All models failed, clipboard item dropped");
        if let Err(e) = self
            .sink
            .deliver_failure("All AI models failed. Check API key & billing.")
        {
            warn!(error = %e, "Failure notification not delivered");
        }
    }

    /// 在单个模型上尝试，含瞬时限流的退避重试
    fn try_model(&self, model: &str, text: &str) -> ModelOutcome {
        let mut attempt = 1u32;
        loop {
            match self.backend.classify(model, text) {
                Ok(result) => return ModelOutcome::Success(result),
                Err(ClassifyError::RateLimited {
                    quota_exhausted: true,
                }) => {
                    // 配额为零：本次运行内该模型不可用，不重试
                    warn!(model, "Quota exhausted for model, skipping");
                    return ModelOutcome::NextModel;
                }
                Err(ClassifyError::RateLimited {
                    quota_exhausted: false,
                }) => {
                    if !self.policy.allows_retry(attempt) {
                        warn!(model, attempts = attempt, "Rate limit retries exhausted");
                        return ModelOutcome::NextModel;
                    }
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        model,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Rate limited, backing off"
                    );
                    if self.signals.wait_shutdown(delay) {
                        return ModelOutcome::Shutdown;
                    }
                    attempt += 1;
                }
                Err(ClassifyError::ModelNotFound) => {
                    warn!(model, "Model not found, skipping");
                    return ModelOutcome::NextModel;
                }
                Err(ClassifyError::Other(message)) => {
                    error!(model, %message, "Classification failed");
                    return ModelOutcome::NextModel;
                }
            }
        }
    }
}
