//! 알림 채널 추상화
//!
//! [`NotificationChannel`]은 알림을 외부로 전달하는 인터페이스입니다.
//! 전송 실패는 [`NotifyError`]로 반환되며, 호출부(notifier)는
//! 수신자 단위로 로그 후 흡수합니다.

use async_trait::async_trait;

use crate::error::NotifyError;
use crate::types::Alert;

/// 알림 채널 trait
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// 알림을 한 수신자에게 전달합니다.
    async fn send(&self, recipient: &str, alert: &Alert) -> Result<(), NotifyError>;
}

/// 로그 출력 알림 채널
///
/// 외부 연동 없이 알림을 구조화 로그로 남깁니다. 데몬 기본 채널입니다.
#[derive(Debug, Clone, Default)]
pub struct TracingChannel;

impl TracingChannel {
    /// 새 채널을 생성합니다.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationChannel for TracingChannel {
    async fn send(&self, recipient: &str, alert: &Alert) -> Result<(), NotifyError> {
        tracing::info!(
            recipient,
            rule_id = alert.rule_id.as_deref().unwrap_or("-"),
            level = alert.level,
            title = %alert.title,
            "alert notification"
        );
        Ok(())
    }
}
