//! 播放器公共定义

use bytes::Bytes;

/// 音频通道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "camelCase")]
pub enum Channel {
    Voice,
    /// 循环播放
    Bgm,
    /// 单次播放
    Se,
}

/// 音频来源
#[derive(Debug, Clone, PartialEq)]
pub enum AudioSource {
    /// 由宿主解析的资源路径
    Path(String),
    /// 已预取的音频数据
    Blob(Bytes),
}

/// 宿主音频播放器
///
/// - 解码与输出由宿主负责
/// - 同一通道的 play 会替换正在播放的音频
pub trait AudioPlayer: Send + Sync {
    fn play(&self, channel: Channel, source: AudioSource, looping: bool);

    fn stop(&self, channel: Channel);

    fn is_playing(&self, channel: Channel) -> bool;

    /// 峰值功率 (用于口型)
    fn peak_power(&self, channel: Channel) -> f32 {
        let _ = channel;
        0.
    }
}

/// 只记录日志的播放器
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudio;

impl AudioPlayer for NullAudio {
    fn play(&self, channel: Channel, source: AudioSource, looping: bool) {
        match source {
            AudioSource::Path(path) => log::debug!("{channel} play {path} (looping: {looping})"),
            AudioSource::Blob(blob) => {
                log::debug!("{channel} play {} bytes (looping: {looping})", blob.len())
            }
        }
    }

    fn stop(&self, channel: Channel) {
        log::debug!("{channel} stop");
    }

    fn is_playing(&self, _channel: Channel) -> bool {
        false
    }
}
