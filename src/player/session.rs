//! 播放会话
//!
//! 一次播放对应一个会话. 会话持有协作者, 画面状态, 点击续体队列,
//! 以及由它派生的全部作用域屏障; 子时间线通过显式传入的会话与屏障工作.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use bytes::Bytes;
use strum::IntoEnumIterator;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinSet;
use tokio::time;

use super::barrier::Barrier;
use super::definition::*;
use super::voice::VoiceCache;
use crate::config::PlayerConfig;
use crate::models::{Presentation, TalkData};

static SESSION_KEY: AtomicU64 = AtomicU64::new(0);

/// 秒数转时长, 负数与 NaN 视为 0, 过大视为无限
pub fn seconds(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.)).unwrap_or(Duration::MAX)
}

/// 等待标志变为指定值, 发送端关闭时返回 false
pub(crate) async fn wait_flag(rx: &mut watch::Receiver<bool>, on: bool) -> bool {
    rx.wait_for(|value| *value == on).await.is_ok()
}

macro_rules! lock {
    ($self:expr, $var:ident) => {
        $self.$var.lock().unwrap_or_else(PoisonError::into_inner)
    };
}

/// 为 watch 标志生成读写方法
macro_rules! watch_flag {
    ($($flag:ident),* $(,)?) => {
        paste::paste! {
            $(
                pub fn [<set_ $flag>](&self, on: bool) {
                    if self.is_cancelled() {
                        return;
                    }
                    self.$flag.send_replace(on);
                    log::debug!("session {} {}: {on}", self.key, stringify!($flag));
                }

                pub fn [<is_ $flag>](&self) -> bool {
                    *self.$flag.borrow()
                }

                pub fn [<watch_ $flag>](&self) -> watch::Receiver<bool> {
                    self.$flag.subscribe()
                }
            )*
        }
    };
}

type TapQueue = VecDeque<(u64, oneshot::Sender<()>)>;

/// 播放会话
pub struct Session {
    key: u64,
    config: PlayerConfig,
    audio: Arc<dyn AudioPlayer>,
    voices: Arc<VoiceCache>,
    state: watch::Sender<Presentation>,
    backlog: Mutex<Vec<TalkData>>,
    taps: Mutex<TapQueue>,
    scopes: Mutex<Vec<Weak<Barrier>>>,
    auto_play: watch::Sender<bool>,
    fast_forward: watch::Sender<bool>,
    skip: watch::Sender<u64>,
    cancel: watch::Sender<bool>,
    tasks: Mutex<JoinSet<()>>,
    serial: AtomicU64,
}

impl Session {
    pub fn new(
        config: PlayerConfig,
        audio: Arc<dyn AudioPlayer>,
        voices: Arc<VoiceCache>,
    ) -> Arc<Self> {
        Arc::new(Self {
            key: SESSION_KEY.fetch_add(1, Ordering::Relaxed),
            config,
            audio,
            voices,
            state: watch::Sender::new(Presentation::default()),
            backlog: Mutex::new(Vec::new()),
            taps: Mutex::new(VecDeque::new()),
            scopes: Mutex::new(Vec::new()),
            auto_play: watch::Sender::new(false),
            fast_forward: watch::Sender::new(false),
            skip: watch::Sender::new(0),
            cancel: watch::Sender::new(false),
            tasks: Mutex::new(JoinSet::new()),
            serial: AtomicU64::new(0),
        })
    }

    pub fn key(&self) -> u64 {
        self.key
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn audio(&self) -> &dyn AudioPlayer {
        self.audio.as_ref()
    }

    /// 会话内单调递增的序号
    pub fn serial(&self) -> u64 {
        self.serial.fetch_add(1, Ordering::Relaxed)
    }

    watch_flag!(auto_play, fast_forward);

    //////////////// 作用域 ////////////////

    /// 创建作用域屏障并登记到会话树
    pub fn scope(&self, parent: Option<&Arc<Barrier>>) -> Arc<Barrier> {
        let scope = Arc::new(Barrier::new(self.serial(), self.key, parent));
        let mut scopes = lock!(self, scopes);
        scopes.retain(|weak| weak.strong_count() > 0);
        scopes.push(Arc::downgrade(&scope));
        scope
    }

    /// 仍存活的作用域
    pub fn scopes(&self) -> Vec<Arc<Barrier>> {
        lock!(self, scopes)
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    /// 清零会话树中的全部计数
    pub fn reset_scopes(&self) {
        self.scopes().iter().for_each(|scope| scope.reset());
    }

    //////////////// 画面状态 ////////////////

    /// 修改画面状态 (会话结束后忽略)
    pub fn present<F>(&self, modify: F)
    where
        F: FnOnce(&mut Presentation),
    {
        if !self.is_cancelled() {
            self.state.send_modify(modify);
        }
    }

    /// 按条件修改画面状态, 返回是否修改
    pub fn present_if<F>(&self, modify: F) -> bool
    where
        F: FnOnce(&mut Presentation) -> bool,
    {
        !self.is_cancelled() && self.state.send_if_modified(modify)
    }

    pub fn presentation(&self) -> Presentation {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Presentation> {
        self.state.subscribe()
    }

    pub fn push_backlog(&self, talk: TalkData) {
        lock!(self, backlog).push(talk);
    }

    pub fn backlog(&self) -> Vec<TalkData> {
        lock!(self, backlog).clone()
    }

    //////////////// 音频 ////////////////

    pub fn voice(&self, path: &str) -> Option<Bytes> {
        self.voices.get(path)
    }

    /// 播放已预取的语音, 未缓存时返回 false
    pub fn play_voice(&self, path: &str) -> bool {
        match self.voice(path) {
            Some(blob) => {
                self.audio.stop(Channel::Voice);
                self.audio
                    .play(Channel::Voice, AudioSource::Blob(blob), false);
                true
            }
            None => {
                log::debug!("voice {path} is not cached, fall back to dwell timer");
                false
            }
        }
    }

    //////////////// 点击续体 ////////////////

    /// 挂起一个点击阻塞动作
    pub fn park(&self) -> (u64, oneshot::Receiver<()>) {
        let (sender, receiver) = oneshot::channel();
        let id = self.serial();
        lock!(self, taps).push_back((id, sender));
        (id, receiver)
    }

    /// 撤销挂起 (已由其他来源恢复)
    pub fn unpark(&self, id: u64) {
        lock!(self, taps).retain(|(tap, _)| *tap != id);
    }

    /// 恢复最近挂起的点击阻塞动作 (即画面上正在显示的对话或字幕),
    /// 没有时不做任何事
    pub fn next(&self) -> bool {
        let mut taps = lock!(self, taps);
        while let Some((id, sender)) = taps.pop_back() {
            if sender.send(()).is_ok() {
                log::trace!("session {} resume tap {id}", self.key);
                return true;
            }
        }
        false
    }

    pub fn pending_taps(&self) -> usize {
        lock!(self, taps).len()
    }

    //////////////// 时间与取消 ////////////////

    /// 通知进行中的定时挂起提前结束
    pub fn skip(&self) {
        self.skip.send_modify(|skip| *skip += 1);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    pub async fn cancelled(&self) {
        let mut cancel = self.cancel.subscribe();
        wait_flag(&mut cancel, true).await;
    }

    /// 等待给定时长
    ///
    /// - 会话结束时返回 false
    /// - 快进时提前返回 true
    pub async fn sleep(&self, duration: Duration) -> bool {
        let mut skip = self.skip.subscribe();
        tokio::select! {
            biased;
            _ = self.cancelled() => false,
            _ = time::sleep(duration) => true,
            _ = skip.changed() => true,
        }
    }

    /// 等待 future 完成, 会话结束时返回 None
    pub async fn until<F: Future>(&self, future: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancelled() => None,
            output = future => Some(output),
        }
    }

    /// 在会话内派生任务, 会话结束时一并中止
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.is_cancelled() {
            return;
        }
        let mut tasks = lock!(self, tasks);
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task);
    }

    /// 结束会话
    ///
    /// 恢复全部挂起的续体 (不产生副作用), 清零屏障, 停止音频并中止派生任务.
    pub fn shutdown(&self) {
        if self.cancel.send_replace(true) {
            return;
        }

        let taps = std::mem::take(&mut *lock!(self, taps));
        for (_, sender) in taps {
            let _ = sender.send(());
        }
        self.reset_scopes();
        Channel::iter().for_each(|channel| self.audio.stop(channel));
        lock!(self, tasks).abort_all();

        log::debug!("session {} shut down", self.key);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}
