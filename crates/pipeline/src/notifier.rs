//! 알림 디스패처 -- 영속화 우선, 수신자별 best-effort 전달
//!
//! 알림은 전달 시도 전에 반드시 저장됩니다. 모든 채널이 실패해도
//! 저장된 알림은 유지되고 롤백되지 않습니다.

use std::sync::Arc;

use logwarden_core::metrics::{LABEL_RESULT, NOTIFY_DELIVERIES_TOTAL};
use logwarden_core::notify::NotificationChannel;
use logwarden_core::storage::EventStorage;
use logwarden_core::types::Alert;

use crate::error::PipelineError;

/// 알림 디스패처
pub struct Notifier {
    storage: Arc<dyn EventStorage>,
    channel: Arc<dyn NotificationChannel>,
    recipients: Vec<String>,
}

impl Notifier {
    /// 저장소, 채널, 수신자 목록으로 디스패처를 생성합니다.
    pub fn new(
        storage: Arc<dyn EventStorage>,
        channel: Arc<dyn NotificationChannel>,
        recipients: Vec<String>,
    ) -> Self {
        Self {
            storage,
            channel,
            recipients,
        }
    }

    /// 알림 본문을 포맷합니다. 태그가 없으면 `none`으로 표시합니다.
    pub fn format_message(alert: &Alert) -> String {
        let tags = if alert.tags.is_empty() {
            "none".to_owned()
        } else {
            alert.tags.join(", ")
        };
        format!(
            "[level {}] {}\n{}\ntags: {}",
            alert.level, alert.title, alert.description, tags
        )
    }

    /// 알림을 저장한 뒤 수신자들에게 전달을 시도합니다.
    ///
    /// 저장 실패는 전파합니다. 전달 실패는 수신자 단위로 격리되어
    /// 로그 후 흡수되며, 다음 수신자 전달을 막지 않습니다.
    ///
    /// # Errors
    /// 알림 저장이 실패한 경우에만 실패합니다.
    pub async fn persist_and_notify(&self, alert: Alert) -> Result<Alert, PipelineError> {
        let stored = self.storage.store_alert(alert).await?;

        for recipient in &self.recipients {
            match self.channel.send(recipient, &stored).await {
                Ok(()) => {
                    metrics::counter!(NOTIFY_DELIVERIES_TOTAL, LABEL_RESULT => "success")
                        .increment(1);
                }
                Err(e) => {
                    metrics::counter!(NOTIFY_DELIVERIES_TOTAL, LABEL_RESULT => "failure")
                        .increment(1);
                    tracing::warn!(
                        recipient = %recipient,
                        alert_id = stored.id.unwrap_or(-1),
                        error = %e,
                        "alert delivery failed, continuing with remaining recipients"
                    );
                }
            }
        }

        Ok(stored)
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("recipients", &self.recipients)
            .finish_non_exhaustive()
    }
}
