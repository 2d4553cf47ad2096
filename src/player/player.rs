//! 剧情播放器

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::watch;

use super::autoplay::fast_forward;
use super::barrier::Barrier;
use super::definition::*;
use super::interpreter::Interpreter;
use super::session::Session;
use super::voice::VoiceCache;
use crate::config::PlayerConfig;
use crate::error::*;
use crate::models::{Action, Presentation, TalkData};

/// 播放状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
pub enum Status {
    NotStarted,
    Playing,
    Completed,
    Stopped,
}

/// 剧情播放器
///
/// - 播放在 tokio 运行时中进行, 不阻塞调用方
/// - 控制方法可从任意线程调用, 不合时宜的调用为空操作
pub trait Player {
    /// 开始播放, 只生效一次
    fn start(&mut self) -> Result<()>; // err: 不在 tokio 运行时中

    /// 恢复画面上正在显示的对话或字幕, 返回是否恢复
    fn next(&self) -> bool;

    /// 停止播放并释放全部挂起的任务
    fn stop(&mut self);

    fn set_auto_play(&self, on: bool);

    fn is_auto_play(&self) -> bool;

    fn set_fast_forward(&self, on: bool);

    fn is_fast_forward(&self) -> bool;

    fn status(&self) -> Status;

    /// 画面状态快照
    fn presentation(&self) -> Presentation;

    /// 订阅画面状态变化
    fn subscribe(&self) -> watch::Receiver<Presentation>;

    /// 已显示过的对话
    fn backlog(&self) -> Vec<TalkData>;

    fn actions(&self) -> &[Action];
}

/// 默认播放器实现
pub struct DefaultPlayer {
    actions: Arc<Vec<Action>>,
    session: Arc<Session>,
    root: Arc<Barrier>,
    status: Arc<watch::Sender<Status>>,
}

impl DefaultPlayer {
    pub fn new(
        actions: Vec<Action>,
        config: PlayerConfig,
        audio: Arc<dyn AudioPlayer>,
        voices: Arc<VoiceCache>,
    ) -> Self {
        let session = Session::new(config, audio, voices);
        let root = session.scope(None);
        Self {
            actions: Arc::new(actions),
            session,
            root,
            status: Arc::new(watch::Sender::new(Status::NotStarted)),
        }
    }

    /// 使用默认配置, 不输出音频
    pub fn from_actions(actions: Vec<Action>) -> Self {
        Self::new(
            actions,
            PlayerConfig::default(),
            Arc::new(NullAudio),
            Arc::new(VoiceCache::new()),
        )
    }

    /// 顶层作用域
    pub fn root(&self) -> &Arc<Barrier> {
        &self.root
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// 等待播放结束 (完成或停止)
    pub async fn finished(&self) -> Status {
        let mut status = self.status.subscribe();
        // sender 由 self 持有, 不会提前关闭
        let _ = status
            .wait_for(|status| matches!(status, Status::Completed | Status::Stopped))
            .await;
        *status.borrow()
    }

    /// 语音峰值功率 (用于口型)
    pub fn voice_level(&self) -> f32 {
        self.session.audio().peak_power(Channel::Voice)
    }
}

impl Player for DefaultPlayer {
    fn start(&mut self) -> Result<()> {
        if Handle::try_current().is_err() {
            Err(PlayerError::NoRuntime)?
        }
        let started = self.status.send_if_modified(|status| {
            let idle = *status == Status::NotStarted;
            if idle {
                *status = Status::Playing;
            }
            idle
        });
        if !started {
            log::debug!("player is {}, ignore start", self.status());
            return Ok(());
        }

        let session = self.session.clone();
        session.spawn(fast_forward(session.clone()));

        let interpreter = Interpreter::new(session.clone());
        let (actions, root, status) = (self.actions.clone(), self.root.clone(), self.status.clone());
        session.spawn(async move {
            let session = interpreter.session();
            interpreter.walk(&root, &actions, true).await;
            if session.until(root.drained()).await.is_some() {
                status.send_if_modified(|status| {
                    let playing = *status == Status::Playing;
                    if playing {
                        *status = Status::Completed;
                    }
                    playing
                });
                log::debug!("session {} completed", session.key());
            }
        });

        log::debug!(
            "session {} started with {} actions",
            self.session.key(),
            self.actions.len()
        );
        Ok(())
    }

    fn next(&self) -> bool {
        self.session.next()
    }

    fn stop(&mut self) {
        self.session.shutdown();
        self.status.send_if_modified(|status| {
            let running = matches!(status, Status::NotStarted | Status::Playing);
            if running {
                *status = Status::Stopped;
            }
            running
        });
    }

    fn set_auto_play(&self, on: bool) {
        self.session.set_auto_play(on);
    }

    fn is_auto_play(&self) -> bool {
        self.session.is_auto_play()
    }

    fn set_fast_forward(&self, on: bool) {
        self.session.set_fast_forward(on);
    }

    fn is_fast_forward(&self) -> bool {
        self.session.is_fast_forward()
    }

    fn status(&self) -> Status {
        *self.status.borrow()
    }

    fn presentation(&self) -> Presentation {
        self.session.presentation()
    }

    fn subscribe(&self) -> watch::Receiver<Presentation> {
        self.session.subscribe()
    }

    fn backlog(&self) -> Vec<TalkData> {
        self.session.backlog()
    }

    fn actions(&self) -> &[Action] {
        &self.actions
    }
}

impl Drop for DefaultPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}
