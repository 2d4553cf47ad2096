//! 播放器配置

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{DurationSecondsWithFrac, serde_as};

use crate::constant::*;
use crate::error::*;

/// 播放器配置
///
/// 所有字段均可缺省, json 中以秒为单位.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerConfig {
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub layout_settle: Duration,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub motion_settle: Duration,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub talk_dwell: Duration,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub telop_dwell: Duration,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub voice_poll: Duration,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub voice_tail: Duration,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub fast_forward_interval: Duration,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub shake_frame: Duration,
    pub shake_magnitude: f32,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub cover_duration: Duration,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    pub shake_duration: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            layout_settle: Duration::from_secs_f64(LAYOUT_SETTLE_SECS),
            motion_settle: Duration::from_secs_f64(MOTION_SETTLE_SECS),
            talk_dwell: Duration::from_secs_f64(TALK_DWELL_SECS),
            telop_dwell: Duration::from_secs_f64(TELOP_DWELL_SECS),
            voice_poll: Duration::from_secs_f64(VOICE_POLL_SECS),
            voice_tail: Duration::from_secs_f64(VOICE_TAIL_SECS),
            fast_forward_interval: Duration::from_secs_f64(FAST_FORWARD_SECS),
            shake_frame: Duration::from_secs_f64(SHAKE_FRAME_SECS),
            shake_magnitude: SHAKE_MAGNITUDE,
            cover_duration: Duration::from_secs_f64(COVER_DURATION_SECS),
            shake_duration: Duration::from_secs_f64(SHAKE_DURATION_SECS),
        }
    }
}

impl PlayerConfig {
    pub fn from_file(fp: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(fp)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// 读取配置, 失败时使用默认值
    pub fn load_or_default(fp: &Path) -> Self {
        match Self::from_file(fp) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("use default player config, {}: {err}", fp.display());
                Self::default()
            }
        }
    }
}
