//! greatdori 互动剧情播放器
//!
//! 将剧情动作列表 (IR) 解释为时间线: 逐条执行动作, 驱动音频与画面状态,
//! 并提供点击推进, 自动播放与快进.

pub mod config;
pub mod models;
pub mod player;

pub mod constant {
    //! 播放器常量定义

    pub const PLAYER_CONFIG: &str = "./assets/player.json";

    /// 模型出现/隐藏/移动的过渡时长
    pub const LAYOUT_SETTLE_SECS: f64 = 0.3;
    /// 动作/表情的过渡时长 (尚无真实的动作完成检测)
    pub const MOTION_SETTLE_SECS: f64 = 0.5;

    pub const TALK_DWELL_SECS: f64 = 5.;
    pub const TELOP_DWELL_SECS: f64 = 2.;
    pub const VOICE_POLL_SECS: f64 = 0.5;
    pub const VOICE_TAIL_SECS: f64 = 1.;

    pub const FAST_FORWARD_SECS: f64 = 0.2;

    pub const SHAKE_FRAME_SECS: f64 = 1. / 30.;
    pub const SHAKE_MAGNITUDE: f32 = 8.;

    /// bestdori 脚本未给出时长的转场与震动
    pub const COVER_DURATION_SECS: f64 = 1.;
    pub const SHAKE_DURATION_SECS: f64 = 0.5;

    pub const VOICE_FETCH_LIMIT: usize = 32;
    pub const VOICE_FETCH_TIMEOUT_SECS: u64 = 24;
}

pub mod error {
    //! 播放器错误类型

    use std::fmt;

    /// 通用返回类型
    pub type Result<T> = std::result::Result<T, Error>;

    /// 通用错误类型
    #[derive(Debug, thiserror::Error)]
    pub enum Error {
        #[error("Serde failed to parse json: {0}")]
        Json(#[from] serde_json::Error),
        #[error("I/O error: {0}")]
        Io(#[from] std::io::Error),
        #[error("Script error: {0}")]
        Script(#[from] ScriptError),
        #[error("Voice error: {0}")]
        Voice(#[from] VoiceError),
        #[error("Player error: {0}")]
        Player(#[from] PlayerError),
    }

    /// 语音获取错误的具体种类 (不包含上下文)
    #[derive(Debug, thiserror::Error)]
    pub enum VoiceErrorKind {
        #[error("I/O error while reading voice: {0}")]
        Io(#[from] std::io::Error),
        #[error("Voice is empty")]
        Empty,
        #[error("Operation timed out")]
        Timeout,
    }

    /// 带有上下文的语音获取错误
    #[derive(Debug, thiserror::Error)]
    pub struct VoiceError {
        #[source]
        pub kind: VoiceErrorKind,
        pub path: Option<String>,
    }

    impl fmt::Display for VoiceError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match &self.path {
                Some(path) => write!(f, "kind: {}, path: {path}", self.kind),
                None => write!(f, "kind: {}", self.kind),
            }
        }
    }

    impl From<VoiceErrorKind> for VoiceError {
        fn from(kind: VoiceErrorKind) -> Self {
            VoiceError { kind, path: None }
        }
    }

    impl From<std::io::Error> for VoiceError {
        fn from(err: std::io::Error) -> Self {
            VoiceError::from(VoiceErrorKind::from(err))
        }
    }

    #[derive(Debug, thiserror::Error)]
    pub enum ScriptError {
        #[error("Story must be an action array or a bestdori script object")]
        Unsupported,
    }

    #[derive(Debug, thiserror::Error)]
    pub enum PlayerError {
        #[error("Start outside of a tokio runtime")]
        NoRuntime,
    }
}
