//! 수집 큐 — 업로드와 처리의 분리
//!
//! 업로드 수신부는 [`IngestQueue`]에 작업을 넣고 즉시 응답하며,
//! 별도 워커가 큐를 소비해 수집 처리를 수행합니다.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::QueueError;

/// 수집 작업
///
/// 검증을 통과한 페이로드 하나를 나타냅니다.
#[derive(Debug, Clone)]
pub struct IngestJob {
    /// 수신 소스 (업로드 채널, 파일명 등)
    pub source: String,
    /// 페이로드 본문
    pub content: String,
}

/// 수집 큐 trait
#[async_trait]
pub trait IngestQueue: Send + Sync {
    /// 작업을 큐에 넣습니다.
    ///
    /// 큐가 가득 찼거나 닫혔으면 [`QueueError`]를 반환합니다.
    async fn enqueue(&self, job: IngestJob) -> Result<(), QueueError>;
}

/// 인메모리 수집 큐
///
/// bounded mpsc 채널 기반으로, 수신 측은 [`MemoryQueue::channel`]이
/// 돌려주는 receiver를 워커에서 소비합니다.
#[derive(Debug, Clone)]
pub struct MemoryQueue {
    tx: mpsc::Sender<IngestJob>,
    capacity: usize,
}

impl MemoryQueue {
    /// 지정한 용량의 큐와 소비용 receiver를 생성합니다.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<IngestJob>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx, capacity }, rx)
    }
}

#[async_trait]
impl IngestQueue for MemoryQueue {
    async fn enqueue(&self, job: IngestJob) -> Result<(), QueueError> {
        match self.tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(QueueError::Full {
                capacity: self.capacity,
            }),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(QueueError::Closed),
        }
    }
}
