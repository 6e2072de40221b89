//! Notification emitter: turns a created task into delivery requests.
//! Delivery itself is external; the router only records and logs.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use carecall_core::config::NotifyConfig;
use carecall_core::traits::{NotificationRequest, NotificationSink, NotifyChannel};
use carecall_core::{CareTask, Result};

/// In-process sink: keeps the last `limit` requests in a ring buffer.
pub struct NotifyRouter {
    history: Mutex<VecDeque<NotificationRequest>>,
    limit: usize,
}

impl NotifyRouter {
    pub fn new(limit: usize) -> Self {
        Self {
            history: Mutex::new(VecDeque::with_capacity(limit.min(1024))),
            limit,
        }
    }

    /// Snapshot of recorded requests, oldest first.
    pub async fn history(&self) -> Vec<NotificationRequest> {
        self.history.lock().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.history.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.history.lock().await.is_empty()
    }
}

impl Default for NotifyRouter {
    fn default() -> Self {
        Self::new(100)
    }
}

#[async_trait]
impl NotificationSink for NotifyRouter {
    async fn emit(&self, request: NotificationRequest) -> Result<()> {
        tracing::info!(
            "📣 [{:?}] {} → student {}",
            request.channel,
            request.template_code,
            request.recipient_id
        );
        let mut history = self.history.lock().await;
        history.push_back(request);
        // Ring buffer
        while history.len() > self.limit {
            history.pop_front();
        }
        Ok(())
    }
}

/// Builds one request per configured channel and hands them to the sink.
#[derive(Clone)]
pub struct NotificationEmitter {
    sink: Arc<dyn NotificationSink>,
    channels: Vec<NotifyChannel>,
    template_code: String,
}

impl NotificationEmitter {
    pub fn new(sink: Arc<dyn NotificationSink>, channels: Vec<NotifyChannel>, template_code: &str) -> Self {
        Self {
            sink,
            channels,
            template_code: template_code.to_string(),
        }
    }

    /// Parse channel names from config. Unknown names are a config error.
    pub fn from_config(config: &NotifyConfig, sink: Arc<dyn NotificationSink>) -> Result<Self> {
        let channels = config
            .channels
            .iter()
            .map(|c| c.parse::<NotifyChannel>())
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(sink, channels, &config.upcoming_test_template))
    }

    pub fn requests_for(&self, task: &CareTask) -> Vec<NotificationRequest> {
        let payload = serde_json::json!({
            "task_id": task.id,
            "code": task.code,
            "task_type": task.task_type,
            "lesson_index": task.lesson_index,
            "course_id": task.course_id,
            "deadline": task.deadline,
            "student_name": task.student_name,
        });
        self.channels
            .iter()
            .map(|channel| NotificationRequest {
                channel: *channel,
                template_code: self.template_code.clone(),
                recipient_id: task.student_id,
                payload: payload.clone(),
            })
            .collect()
    }

    /// Emit every request for `task`. Sink failures are logged, never returned.
    pub async fn emit_for(&self, task: &CareTask) -> usize {
        let mut sent = 0;
        for request in self.requests_for(task) {
            let channel = request.channel;
            match self.sink.emit(request).await {
                Ok(()) => sent += 1,
                Err(e) => tracing::warn!("⚠️ Notification for task {} on {channel:?} failed: {e}", task.id),
            }
        }
        sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carecall_core::{CareError, NewCareTask, TaskDetail, TaskKey, TaskStatus, TaskType};

    struct FailingSink;

    #[async_trait]
    impl NotificationSink for FailingSink {
        async fn emit(&self, _request: NotificationRequest) -> Result<()> {
            Err(CareError::storage("queue offline"))
        }
    }

    fn task() -> CareTask {
        let new = NewCareTask {
            key: TaskKey {
                student_id: 42,
                enrollment_id: 10,
                task_type: TaskType::UpcomingTest,
                lesson_index: 12,
            },
            code: 7,
            status: TaskStatus::NotDone,
            deadline: Some(1_000),
            priority: None,
            sub_type: None,
            booking_id: Some(500),
            course_id: Some(3),
            staff_id: None,
            reporter_id: None,
            student_name: "Lan".into(),
            student_phone: String::new(),
            student_email: String::new(),
            detail: TaskDetail::UpcomingTest {
                course_id: 3,
                test_lesson: 12,
            },
        };
        CareTask::from_new(1, new, 0)
    }

    #[tokio::test]
    async fn test_one_request_per_channel() {
        let router = Arc::new(NotifyRouter::new(10));
        let emitter = NotificationEmitter::from_config(&NotifyConfig::default(), router.clone()).unwrap();
        assert_eq!(emitter.emit_for(&task()).await, 2);

        let history = router.history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].channel, NotifyChannel::Email);
        assert_eq!(history[1].channel, NotifyChannel::Chat);
        assert!(history.iter().all(|r| r.recipient_id == 42));
        assert_eq!(history[0].template_code, "UPCOMING_TEST_REMINDER");
        assert_eq!(history[0].payload["lesson_index"], 12);
    }

    #[tokio::test]
    async fn test_ring_buffer_limit() {
        let router = NotifyRouter::new(3);
        for recipient_id in 0..5 {
            router
                .emit(NotificationRequest {
                    channel: NotifyChannel::Chat,
                    template_code: "T".into(),
                    recipient_id,
                    payload: serde_json::Value::Null,
                })
                .await
                .unwrap();
        }
        let ids: Vec<i64> = router.history().await.iter().map(|r| r.recipient_id).collect();
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn test_sink_failure_is_swallowed() {
        let emitter = NotificationEmitter::new(Arc::new(FailingSink), vec![NotifyChannel::Email], "T");
        assert_eq!(emitter.emit_for(&task()).await, 0);
    }

    #[test]
    fn test_unknown_channel_rejected() {
        let config = NotifyConfig {
            channels: vec!["pigeon".into()],
            ..Default::default()
        };
        let result = NotificationEmitter::from_config(&config, Arc::new(NotifyRouter::default()));
        assert!(matches!(result, Err(CareError::Config(_))));
    }
}
