//! 安装包下载
//!
//! 两种传输方式:
//! - `Buffered`: 流式读取响应体，逐块回调进度，最终合并为一个缓冲区
//! - `Delegated`: 宿主环境不允许直接写文件时，把下载地址交给系统浏览器

use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::launcher::{LaunchTarget, Launcher};
use super::release::UpdateInfo;
use crate::network::{with_limits, TimeoutOrAbortError};

/// 下载错误
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("download failed with HTTP {status}")]
    Status { status: u16 },

    #[error("download transfer failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// 无法交给外部程序下载
    #[error("failed to hand download to an external agent: {0}")]
    Handoff(String),

    #[error("download stalled: no data within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("download cancelled")]
    Cancelled,
}

impl From<TimeoutOrAbortError> for DownloadError {
    fn from(err: TimeoutOrAbortError) -> Self {
        match err {
            TimeoutOrAbortError::Timeout(t) => DownloadError::Timeout {
                timeout_ms: t.timeout_ms,
            },
            TimeoutOrAbortError::Abort(_) => DownloadError::Cancelled,
        }
    }
}

/// 传输方式，由调用方按部署环境选择
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadMode {
    #[default]
    Buffered,
    Delegated,
}

/// 下载进度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadProgress {
    /// round(bytes_received / total_bytes * 100)，上限 100
    pub percent: u8,
    pub bytes_received: u64,
    pub total_bytes: u64,
}

impl DownloadProgress {
    pub fn new(bytes_received: u64, total_bytes: u64) -> Self {
        let percent = if total_bytes == 0 {
            100
        } else {
            ((bytes_received as f64 / total_bytes as f64) * 100.0)
                .round()
                .min(100.0) as u8
        };
        Self {
            percent,
            bytes_received,
            total_bytes,
        }
    }

    /// 100% 进度
    pub fn complete(total_bytes: u64) -> Self {
        Self {
            percent: 100,
            bytes_received: total_bytes,
            total_bytes,
        }
    }
}

/// 下载结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// 完整的安装包内容
    Buffered(Bytes),
    /// 已交给外部程序下载，进程内没有安装包内容
    Delegated { url: String },
}

impl DownloadOutcome {
    pub fn bytes(&self) -> Option<&Bytes> {
        match self {
            DownloadOutcome::Buffered(bytes) => Some(bytes),
            DownloadOutcome::Delegated { .. } => None,
        }
    }

    pub fn is_delegated(&self) -> bool {
        matches!(self, DownloadOutcome::Delegated { .. })
    }
}

/// 取消与超时扩展点；默认都不启用
#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    pub cancel: Option<CancellationToken>,
    /// 两次数据块之间允许的最长等待
    pub chunk_timeout: Option<Duration>,
}

/// 拉取式的数据块流
///
/// `next_chunk` 返回 `Some(Ok(_))` 表示一块数据，`Some(Err(_))` 表示出错，
/// `None` 表示读取完毕
pub struct PackageStream {
    inner: BoxStream<'static, Result<Bytes, DownloadError>>,
    content_length: Option<u64>,
    options: DownloadOptions,
}

impl PackageStream {
    pub fn new<S>(inner: S, content_length: Option<u64>) -> Self
    where
        S: Stream<Item = Result<Bytes, DownloadError>> + Send + 'static,
    {
        Self {
            inner: inner.boxed(),
            // 声明长度为 0 等同于未声明
            content_length: content_length.filter(|len| *len > 0),
            options: DownloadOptions::default(),
        }
    }

    pub fn from_response(response: reqwest::Response) -> Self {
        let content_length = response.content_length();
        let inner = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(DownloadError::from));
        Self::new(inner, content_length)
    }

    pub fn with_options(mut self, options: DownloadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// 读取下一块数据
    pub async fn next_chunk(&mut self) -> Option<Result<Bytes, DownloadError>> {
        let next = with_limits(
            self.inner.next(),
            self.options.chunk_timeout,
            self.options.cancel.as_ref(),
        )
        .await;

        match next {
            Ok(item) => item,
            Err(e) => Some(Err(e.into())),
        }
    }

    /// 读完整个流并在途中回调进度
    ///
    /// 声明了总长度时每块回调一次；否则在读完后回调一次 100%
    pub async fn collect_with_progress<P>(
        mut self,
        mut on_progress: P,
    ) -> Result<Bytes, DownloadError>
    where
        P: FnMut(DownloadProgress),
    {
        let total = self.content_length;
        let capacity = total.unwrap_or(0).min(64 * 1024 * 1024) as usize;
        let mut buffer = BytesMut::with_capacity(capacity);
        let mut received: u64 = 0;

        while let Some(chunk) = self.next_chunk().await {
            let chunk = chunk?;
            received += chunk.len() as u64;
            buffer.extend_from_slice(&chunk);

            if let Some(total) = total {
                on_progress(DownloadProgress::new(received, total));
            }
        }

        if total.is_none() {
            on_progress(DownloadProgress::complete(received));
        }

        Ok(buffer.freeze())
    }
}

impl std::fmt::Debug for PackageStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageStream")
            .field("content_length", &self.content_length)
            .field("options", &self.options)
            .finish()
    }
}

/// 安装包下载器
#[derive(Clone)]
pub struct PackageDownloader {
    client: reqwest::Client,
    mode: DownloadMode,
    launcher: Arc<dyn Launcher>,
    options: DownloadOptions,
}

impl PackageDownloader {
    pub fn new(client: reqwest::Client, mode: DownloadMode, launcher: Arc<dyn Launcher>) -> Self {
        Self {
            client,
            mode,
            launcher,
            options: DownloadOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DownloadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn mode(&self) -> DownloadMode {
        self.mode
    }

    /// 下载更新包
    pub async fn download<P>(
        &self,
        info: &UpdateInfo,
        on_progress: P,
    ) -> Result<DownloadOutcome, DownloadError>
    where
        P: FnMut(DownloadProgress),
    {
        self.download_with(info, &self.options, on_progress).await
    }

    /// 使用单次调用的取消/超时设置下载
    pub async fn download_with<P>(
        &self,
        info: &UpdateInfo,
        options: &DownloadOptions,
        mut on_progress: P,
    ) -> Result<DownloadOutcome, DownloadError>
    where
        P: FnMut(DownloadProgress),
    {
        match self.mode {
            DownloadMode::Buffered => {
                tracing::info!("下载更新包: {}", info.download_url);
                let bytes = self
                    .fetch_buffered(&info.download_url, options, on_progress)
                    .await?;
                tracing::info!("下载完成: {} ({} 字节)", info.file_name, bytes.len());
                Ok(DownloadOutcome::Buffered(bytes))
            }
            DownloadMode::Delegated => {
                // 无法获得细粒度进度，直接报告完成
                on_progress(DownloadProgress::complete(info.file_size));
                self.delegate(&info.download_url)?;
                Ok(DownloadOutcome::Delegated {
                    url: info.download_url.clone(),
                })
            }
        }
    }

    /// 发起请求并返回数据块流
    pub async fn open_stream(
        &self,
        url: &str,
        options: &DownloadOptions,
    ) -> Result<PackageStream, DownloadError> {
        let response = with_limits(
            self.client.get(url).send(),
            options.chunk_timeout,
            options.cancel.as_ref(),
        )
        .await??;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                status: status.as_u16(),
            });
        }

        Ok(PackageStream::from_response(response).with_options(options.clone()))
    }

    async fn fetch_buffered<P>(
        &self,
        url: &str,
        options: &DownloadOptions,
        on_progress: P,
    ) -> Result<Bytes, DownloadError>
    where
        P: FnMut(DownloadProgress),
    {
        let stream = self.open_stream(url, options).await?;
        if stream.content_length().is_none() {
            tracing::debug!("响应未声明 Content-Length，读取完成后再报告进度");
        }
        stream.collect_with_progress(on_progress).await
    }

    fn delegate(&self, url: &str) -> Result<(), DownloadError> {
        tracing::info!("交给系统浏览器下载: {}", url);
        self.launcher
            .open(url, LaunchTarget::Browser)
            .map_err(|e| DownloadError::Handoff(e.to_string()))
    }
}

impl std::fmt::Debug for PackageDownloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageDownloader")
            .field("mode", &self.mode)
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunks(parts: Vec<Vec<u8>>) -> impl Stream<Item = Result<Bytes, DownloadError>> {
        stream::iter(parts.into_iter().map(|p| Ok(Bytes::from(p))))
    }

    fn pending_stream() -> impl Stream<Item = Result<Bytes, DownloadError>> {
        stream::pending()
    }

    #[tokio::test]
    async fn test_progress_per_chunk_with_content_length() {
        let stream = PackageStream::new(chunks(vec![vec![1u8; 50], vec![2u8; 50]]), Some(100));
        let mut reports = Vec::new();

        let bytes = stream
            .collect_with_progress(|p| reports.push((p.percent, p.bytes_received, p.total_bytes)))
            .await
            .unwrap();

        assert_eq!(reports, vec![(50, 50, 100), (100, 100, 100)]);
        assert_eq!(bytes.len(), 100);
        assert_eq!(bytes[0], 1);
        assert_eq!(bytes[99], 2);
    }

    #[tokio::test]
    async fn test_single_report_without_content_length() {
        let stream = PackageStream::new(chunks(vec![vec![0u8; 30], vec![0u8; 12]]), None);
        let mut reports = Vec::new();

        let bytes = stream.collect_with_progress(|p| reports.push(p)).await.unwrap();

        assert_eq!(bytes.len(), 42);
        assert_eq!(reports, vec![DownloadProgress::complete(42)]);
    }

    #[tokio::test]
    async fn test_zero_content_length_treated_as_undeclared() {
        let stream = PackageStream::new(chunks(vec![vec![0u8; 5]]), Some(0));
        assert!(stream.content_length().is_none());
    }

    #[tokio::test]
    async fn test_percent_rounding() {
        assert_eq!(DownloadProgress::new(1, 3).percent, 33);
        assert_eq!(DownloadProgress::new(2, 3).percent, 67);
        assert_eq!(DownloadProgress::new(0, 100).percent, 0);
    }

    #[tokio::test]
    async fn test_stream_error_propagates() {
        let parts: Vec<Result<Bytes, DownloadError>> = vec![
            Ok(Bytes::from_static(b"abc")),
            Err(DownloadError::Status { status: 500 }),
        ];
        let stream = PackageStream::new(stream::iter(parts), Some(10));
        let result = stream.collect_with_progress(|_| {}).await;
        assert!(matches!(result, Err(DownloadError::Status { status: 500 })));
    }

    #[tokio::test]
    async fn test_cancelled_stream() {
        let token = CancellationToken::new();
        token.cancel();

        let mut stream = PackageStream::new(pending_stream(), Some(10)).with_options(DownloadOptions {
            cancel: Some(token),
            chunk_timeout: None,
        });

        assert!(matches!(
            stream.next_chunk().await,
            Some(Err(DownloadError::Cancelled))
        ));
    }

    #[tokio::test]
    async fn test_stalled_stream_times_out() {
        let stream = PackageStream::new(pending_stream(), Some(10)).with_options(DownloadOptions {
            cancel: None,
            chunk_timeout: Some(Duration::from_millis(10)),
        });

        let result = stream.collect_with_progress(|_| {}).await;
        assert!(matches!(result, Err(DownloadError::Timeout { timeout_ms: 10 })));
    }
}
