//! 测试辅助

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use greatdori_story::config::PlayerConfig;
use greatdori_story::models::{Action, TalkData};
use greatdori_story::player::*;
use tokio::time::{self, Instant};

/// 记录调用的音频播放器, 语音播放固定时长
pub struct RecordingAudio {
    events: Mutex<Vec<String>>,
    voice_length: Duration,
    voice_until: Mutex<Option<Instant>>,
}

impl RecordingAudio {
    pub fn new(voice_length: Duration) -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            voice_length,
            voice_until: Mutex::new(None),
        })
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl AudioPlayer for RecordingAudio {
    fn play(&self, channel: Channel, source: AudioSource, looping: bool) {
        let source = match source {
            AudioSource::Path(path) => path,
            AudioSource::Blob(blob) => format!("{} bytes", blob.len()),
        };
        if channel == Channel::Voice {
            *self.voice_until.lock().unwrap() = Some(Instant::now() + self.voice_length);
        }
        self.record(format!("play {channel} {source} {looping}"));
    }

    fn stop(&self, channel: Channel) {
        if channel == Channel::Voice {
            *self.voice_until.lock().unwrap() = None;
        }
        self.record(format!("stop {channel}"));
    }

    fn is_playing(&self, channel: Channel) -> bool {
        channel == Channel::Voice
            && self
                .voice_until
                .lock()
                .unwrap()
                .is_some_and(|until| Instant::now() < until)
    }

    fn peak_power(&self, channel: Channel) -> f32 {
        match self.is_playing(channel) {
            true => 0.8,
            false => 0.,
        }
    }
}

pub fn player(actions: Vec<Action>) -> (DefaultPlayer, Arc<RecordingAudio>) {
    player_with(actions, Arc::new(VoiceCache::new()), Duration::ZERO)
}

pub fn player_with(
    actions: Vec<Action>,
    voices: Arc<VoiceCache>,
    voice_length: Duration,
) -> (DefaultPlayer, Arc<RecordingAudio>) {
    let audio = RecordingAudio::new(voice_length);
    let player = DefaultPlayer::new(actions, PlayerConfig::default(), audio.clone(), voices);
    (player, audio)
}

/// 让已就绪的任务运行到下一个挂起点
pub async fn idle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// 推进虚拟时间
pub async fn advance(secs: f64) {
    time::sleep(Duration::from_secs_f64(secs)).await;
    idle().await;
}

pub fn talk(text: &str) -> Action {
    Action::Talk(TalkData::new(text, [1], ["Alice"], None))
}

pub fn delay(seconds: f64) -> Action {
    Action::Delay { seconds }
}

pub fn background(path: &str) -> Action {
    Action::ChangeBackground {
        path: path.to_string(),
    }
}

pub fn talk_text(player: &DefaultPlayer) -> Option<String> {
    player.presentation().talk.map(|talk| talk.text)
}
