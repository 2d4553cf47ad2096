//! 剧情资源加载
//!
//! 把 bestdori 剧情脚本转换为动作列表 (IR).

use std::time::Duration;

use crate::config::PlayerConfig;
use crate::error::*;
use crate::models::bestdori::{self, *};
use crate::models::{Action, Position, TalkData};

/// 剧情加载器
///
/// - 在播放开始前一次性产出完整的动作列表
pub trait StoryLoader {
    fn load(&self, bytes: &[u8]) -> Result<Vec<Action>>;
}

/// 读取剧情
///
/// 顶层为数组时按 IR 解析, 为对象时交给加载器.
pub fn load_story<L>(bytes: &[u8], loader: &L) -> Result<Vec<Action>>
where
    L: StoryLoader + ?Sized,
{
    let value: serde_json::Value = serde_json::from_slice(bytes)?;
    match value {
        serde_json::Value::Array(_) => Ok(serde_json::from_value(value)?),
        serde_json::Value::Object(_) => loader.load(bytes),
        _ => Err(ScriptError::Unsupported.into()),
    }
}

/// bestdori 剧情加载器
///
/// - wait 为 false 的步骤放入 ForkTask, 不阻塞后续动作 (对话与字幕除外)
/// - delay 转换为步骤开头的 Delay
/// - 未知动作跳过
#[derive(Debug, Clone)]
pub struct BestdoriLoader {
    cover_duration: f64,
    shake_duration: f64,
}

impl Default for BestdoriLoader {
    fn default() -> Self {
        Self::from_config(&PlayerConfig::default())
    }
}

impl StoryLoader for BestdoriLoader {
    fn load(&self, bytes: &[u8]) -> Result<Vec<Action>> {
        let Story(script) = Story::from_bytes(bytes)?;
        let actions: Vec<_> = script
            .into_iter()
            .flat_map(|action| self.convert(action))
            .collect();
        log::debug!("loaded {} actions from bestdori script", actions.len());
        Ok(actions)
    }
}

impl BestdoriLoader {
    pub fn new(cover_duration: Duration, shake_duration: Duration) -> Self {
        Self {
            cover_duration: cover_duration.as_secs_f64(),
            shake_duration: shake_duration.as_secs_f64(),
        }
    }

    pub fn from_config(config: &PlayerConfig) -> Self {
        Self::new(config.cover_duration, config.shake_duration)
    }

    /// 转换单个动作
    fn convert(&self, action: bestdori::Action) -> Vec<Action> {
        match action {
            bestdori::Action::Talk(talk) => self.convert_talk(talk),
            bestdori::Action::Sound(sound) => self.convert_sound(sound),
            bestdori::Action::Effect(effect) => self.convert_effect(effect),
            bestdori::Action::Layout(layout) => self.convert_layout(layout),
            bestdori::Action::Motion(MotionAction { wait, motion }) => {
                let delay = motion.delay;
                Self::step(wait, delay, motion_steps(&motion))
            }
            bestdori::Action::Unknown => {
                log::warn!("skip unknown bestdori action");
                Vec::new()
            }
        }
    }

    // helper: 按 wait 与 delay 组织步骤
    fn step(wait: bool, delay: f64, body: Vec<Action>) -> Vec<Action> {
        if body.is_empty() {
            return body;
        }
        let mut actions = Vec::with_capacity(body.len() + 1);
        if delay > 0. {
            actions.push(Action::Delay { seconds: delay });
        }
        actions.extend(body);

        match wait {
            true => actions,
            false => vec![Action::ForkTask { actions }],
        }
    }

    // TALK
    fn convert_talk(&self, talk: TalkAction) -> Vec<Action> {
        let mut actions = Vec::new();
        if talk.delay > 0. {
            actions.push(Action::Delay {
                seconds: talk.delay,
            });
        }

        // 对话中的动作与对话同时开始
        for motion in &talk.motions {
            actions.extend(Self::step(false, motion.delay, motion_steps(motion)));
        }

        let name = talk.name.trim();
        let names = match name.is_empty() {
            true => Vec::new(),
            false => vec![name],
        };
        let voice = talk.voices.first().map(|voice| voice.voice.as_str());
        actions.push(Action::Talk(TalkData::new(
            talk.text.trim(),
            talk.characters,
            names,
            voice,
        )));

        actions
    }

    // BGM / SE
    fn convert_sound(&self, sound: SoundAction) -> Vec<Action> {
        let mut body = Vec::new();
        if let Some(bgm) = &sound.bgm {
            body.push(Action::ChangeBgm { path: bgm.path() });
        }
        if let Some(se) = &sound.se {
            body.push(Action::ChangeSe { path: se.path() });
        }
        Self::step(sound.wait, sound.delay, body)
    }

    // EFFECT
    fn convert_effect(&self, effect: EffectAction) -> Vec<Action> {
        let cover = self.cover_duration;
        let shake = self.shake_duration;

        let action = match effect.effect {
            EffectDetail::ChangeBackground { image } | EffectDetail::ChangeCardStill { image } => {
                Action::ChangeBackground { path: image.path() }
            }
            EffectDetail::Telop { text } => {
                let mut actions = Vec::new();
                if effect.delay > 0. {
                    actions.push(Action::Delay {
                        seconds: effect.delay,
                    });
                }
                actions.push(Action::Telop { text });
                return actions;
            }
            EffectDetail::BlackIn => Action::HideBlackCover { duration: cover },
            EffectDetail::BlackOut => Action::ShowBlackCover { duration: cover },
            EffectDetail::WhiteIn => Action::HideWhiteCover { duration: cover },
            EffectDetail::WhiteOut => Action::ShowWhiteCover { duration: cover },
            EffectDetail::ShakeScreen => Action::ShakeScreen { duration: shake },
            EffectDetail::ShakeWindow => Action::ShakeDialogBox { duration: shake },
            EffectDetail::Unknown => {
                log::warn!("skip unknown bestdori effect");
                return Vec::new();
            }
        };

        Self::step(effect.wait, effect.delay, vec![action])
    }

    // LAYOUT
    fn convert_layout(&self, layout: LayoutAction) -> Vec<Action> {
        let character_id = layout.motion.character;
        let position = position(layout.side.to);

        let mut body = match layout.kind {
            LayoutType::Appear => vec![Action::ShowModel {
                character_id,
                model_path: layout.model.clone(),
                position,
            }],
            LayoutType::Hide => vec![Action::HideModel { character_id }],
            LayoutType::Move => vec![Action::MoveModel {
                character_id,
                position,
            }],
        };
        if !matches!(layout.kind, LayoutType::Hide) {
            body.extend(motion_steps(&layout.motion));
        }

        Self::step(layout.wait, layout.motion.delay, body)
    }
}

/// 站位映射, 未知站位居中
fn position(side: LayoutSideType) -> Position {
    match side {
        LayoutSideType::LeftInside => Position::LeftInside,
        LayoutSideType::LeftOver => Position::LeftOutside,
        LayoutSideType::Center => Position::Center,
        LayoutSideType::RightInside => Position::RightInside,
        LayoutSideType::RightOver => Position::RightOutside,
        LayoutSideType::Unknown => {
            log::warn!("unknown layout side, fall back to center");
            Position::Center
        }
    }
}

/// 动作与表情 (空名称跳过)
fn motion_steps(motion: &Motion) -> Vec<Action> {
    let mut actions = Vec::new();
    if !motion.motion.is_empty() {
        actions.push(Action::Act {
            character_id: motion.character,
            motion_name: motion.motion.clone(),
        });
    }
    if !motion.expression.is_empty() {
        actions.push(Action::Express {
            character_id: motion.character,
            expression_name: motion.expression.clone(),
        });
    }
    actions
}
