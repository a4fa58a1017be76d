//! FrameSink 传输层抽象

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::SinkExt;
use futures::stream::SplitSink;
use parking_lot::Mutex;
use shared::frame::LiveFrame;

use crate::utils::{AppError, AppResult};

/// 推送帧写出端
///
/// 所有 live channel 的写路径都走这个特征，生产环境是 WebSocket，
/// 测试用内存实现。写失败一律映射为 [`AppError::ChannelWriteFailure`]，
/// 由连接任务处理为断连。
#[async_trait]
pub trait FrameSink: Send {
    /// 写出一帧
    async fn write_frame(&mut self, frame: &LiveFrame) -> AppResult<()>;

    /// 关闭连接
    async fn close(&mut self) -> AppResult<()>;
}

/// WebSocket 写出端 (axum)
pub struct WsSink {
    sink: SplitSink<WebSocket, Message>,
}

impl WsSink {
    pub fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl FrameSink for WsSink {
    async fn write_frame(&mut self, frame: &LiveFrame) -> AppResult<()> {
        self.sink
            .send(Message::Text(frame.to_json().into()))
            .await
            .map_err(|e| AppError::ChannelWriteFailure(e.to_string()))
    }

    async fn close(&mut self) -> AppResult<()> {
        // 关闭失败说明对端已不在，无需区别对待
        let _ = self.sink.send(Message::Close(None)).await;
        Ok(())
    }
}

/// 内存写出端 - 测试或同进程消费用
///
/// 记录所有写出的帧；`fail_after` 用于模拟传输层写入失败。
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    frames: Arc<Mutex<Vec<LiveFrame>>>,
    fail_after: Option<usize>,
    closed: Arc<Mutex<bool>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 前 `n` 帧写入成功，之后每次写入都失败
    pub fn failing_after(n: usize) -> Self {
        Self {
            fail_after: Some(n),
            ..Self::default()
        }
    }

    /// 到目前为止写出的所有帧
    pub fn frames(&self) -> Vec<LiveFrame> {
        self.frames.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock()
    }
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn write_frame(&mut self, frame: &LiveFrame) -> AppResult<()> {
        let mut frames = self.frames.lock();
        if let Some(limit) = self.fail_after
            && frames.len() >= limit
        {
            return Err(AppError::ChannelWriteFailure("simulated write failure".into()));
        }
        frames.push(frame.clone());
        Ok(())
    }

    async fn close(&mut self) -> AppResult<()> {
        *self.closed.lock() = true;
        Ok(())
    }
}
