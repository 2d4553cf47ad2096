//! 语音预取与缓存

use std::collections::{HashMap, HashSet};
use std::mem;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{StreamExt, stream};
use tokio::time::timeout;

use crate::constant::*;
use crate::error::*;
use crate::models::Action;

/// 语音获取器
///
/// - 播放开始前由预取阶段调用, 播放期间不会调用
#[async_trait]
pub trait VoiceFetcher: Send + Sync {
    async fn fetch(&self, path: &str) -> std::result::Result<Bytes, VoiceError>;
}

/// 从本地目录读取语音
#[derive(Debug, Clone)]
pub struct FsVoiceFetcher {
    root: PathBuf,
}

impl FsVoiceFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl VoiceFetcher for FsVoiceFetcher {
    async fn fetch(&self, path: &str) -> std::result::Result<Bytes, VoiceError> {
        let bytes = tokio::fs::read(self.root.join(path)).await?;
        if bytes.is_empty() {
            Err(VoiceErrorKind::Empty)?
        }
        Ok(bytes.into())
    }
}

/// 语音缓存
///
/// 解释器只查询已预取的语音; 缺失的语音退化为固定停留时长.
#[derive(Debug, Default)]
pub struct VoiceCache {
    blobs: RwLock<HashMap<String, Bytes>>,
    error: Mutex<Vec<VoiceError>>,
}

impl VoiceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<Bytes> {
        self.blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
    }

    pub fn insert(&self, path: &str, blob: Bytes) {
        self.blobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), blob);
    }

    pub fn contains(&self, path: &str) -> bool {
        self.blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.blobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 预取动作列表中的全部语音
    ///
    /// - 同一路径只获取一次, 已缓存的跳过
    /// - 并发数与单次超时见 VOICE_FETCH_LIMIT, VOICE_FETCH_TIMEOUT_SECS
    /// - 失败记录在缓存中, 通过 take_error 取出
    ///
    /// 返回新缓存的语音数量.
    pub async fn prefetch<F>(&self, actions: &[Action], fetcher: &F) -> usize
    where
        F: VoiceFetcher + ?Sized,
    {
        let mut seen = HashSet::new();
        let paths: Vec<String> = actions
            .iter()
            .flat_map(Action::voice_paths)
            .filter(|path| seen.insert(*path) && !self.contains(path))
            .map(String::from)
            .collect();

        let results: Vec<_> = stream::iter(paths)
            .map(|path| async move {
                let fut = fetcher.fetch(&path);
                let result = match timeout(Duration::from_secs(VOICE_FETCH_TIMEOUT_SECS), fut).await
                {
                    Ok(inner) => inner,
                    Err(_) => Err(VoiceErrorKind::Timeout.into()),
                };
                (path, result)
            })
            .buffer_unordered(VOICE_FETCH_LIMIT)
            .collect()
            .await;

        let mut count = 0;
        for (path, result) in results {
            match result {
                Ok(blob) => {
                    self.insert(&path, blob);
                    count += 1;
                }
                Err(mut err) => {
                    if err.path.is_none() {
                        err.path = Some(path);
                    }
                    log::warn!("failed to prefetch voice, {err}");
                    self.error
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(err);
                }
            }
        }

        log::debug!("prefetched {count} voices");
        count
    }

    /// 返回已记录的预取错误
    pub fn take_error(&self) -> Vec<VoiceError> {
        mem::take(&mut *self.error.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::models::TalkData;

    struct CountingFetcher(AtomicUsize);

    #[async_trait]
    impl VoiceFetcher for CountingFetcher {
        async fn fetch(&self, path: &str) -> std::result::Result<Bytes, VoiceError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            match path {
                "missing" => Err(VoiceErrorKind::Empty.into()),
                _ => Ok(Bytes::from(path.to_string())),
            }
        }
    }

    fn talk(voice: &str) -> Action {
        Action::Talk(TalkData::new("", [1], ["A"], Some(voice)))
    }

    #[tokio::test]
    async fn test_prefetch() {
        let cache = VoiceCache::new();
        let fetcher = CountingFetcher(AtomicUsize::new(0));
        let actions = vec![
            talk("v1"),
            Action::Blocking {
                actions: vec![talk("v2"), talk("v1")],
            },
            talk("missing"),
        ];

        assert_eq!(cache.prefetch(&actions, &fetcher).await, 2);
        assert_eq!(fetcher.0.load(Ordering::SeqCst), 3);
        assert_eq!(cache.get("v2").as_deref(), Some(&b"v2"[..]));
        assert!(!cache.contains("missing"));

        let errors = cache.take_error();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path.as_deref(), Some("missing"));
        assert!(cache.take_error().is_empty());

        // 已缓存的不再获取
        assert_eq!(cache.prefetch(&actions, &fetcher).await, 0);
        assert_eq!(fetcher.0.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_fs_fetcher() {
        let root = std::env::temp_dir().join(format!("greatdori-voice-{}", std::process::id()));
        tokio::fs::create_dir_all(root.join("scenario")).await.unwrap();
        tokio::fs::write(root.join("scenario/001.mp3"), b"voice").await.unwrap();

        let fetcher = FsVoiceFetcher::new(&root);
        assert_eq!(&fetcher.fetch("scenario/001.mp3").await.unwrap()[..], b"voice");
        assert!(matches!(
            fetcher.fetch("scenario/002.mp3").await,
            Err(VoiceError { kind: VoiceErrorKind::Io(_), .. })
        ));

        tokio::fs::remove_dir_all(root).await.unwrap();
    }
}
