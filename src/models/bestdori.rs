//! bestdori 脚本数据模型

use std::collections::VecDeque;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::*;

/// bestdori 脚本
#[derive(Debug)]
pub struct Story(pub VecDeque<Action>);

#[derive(Deserialize)]
struct ScriptHelper {
    bgm: Option<Address>,
    background: Option<Address>,
    #[serde(rename = "actions")]
    script: VecDeque<Action>,
}

/// 初始背景与 bgm 作为开头的同步动作
impl From<ScriptHelper> for Story {
    fn from(val: ScriptHelper) -> Self {
        let ScriptHelper {
            bgm,
            background,
            mut script,
        } = val;
        if let Some(bgm) = bgm {
            script.push_front(Action::Sound(SoundAction {
                wait: true,
                delay: 0.,
                bgm: Some(bgm),
                se: None,
            }));
        }
        if let Some(background) = background {
            script.push_front(Action::Effect(EffectAction {
                wait: true,
                delay: 0.,
                effect: EffectDetail::ChangeBackground { image: background },
            }));
        }
        Story(script)
    }
}

impl Story {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let script: ScriptHelper = serde_json::from_slice(bytes)?;
        Ok(script.into())
    }
}

impl FromStr for Story {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let script: ScriptHelper = serde_json::from_str(s)?;
        Ok(script.into())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    Talk(TalkAction),
    Sound(SoundAction),
    Effect(EffectAction),
    Layout(LayoutAction),
    Motion(MotionAction),
    #[serde(other)]
    Unknown,
}

/// Live2D 动作
#[derive(Debug, Clone, Deserialize)]
pub struct Motion {
    #[serde(default)]
    pub delay: f64,
    pub character: u16,
    #[serde(default)]
    pub motion: String,
    #[serde(default)]
    pub expression: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AddressType {
    #[default]
    Bandori,
    Custom,
    Common,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(untagged)]
pub enum AddressPath {
    Url {
        url: String,
    },
    File {
        #[serde(alias = "se")]
        file: String,
        bundle: Option<String>,
    },
}

/// 资源路径
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct Address {
    #[serde(rename = "type", default)]
    pub kind: AddressType,
    #[serde(flatten)]
    pub address: AddressPath,
}

impl Address {
    /// 交给宿主解析的资源路径
    pub fn path(&self) -> String {
        match &self.address {
            AddressPath::Url { url } => url.clone(),
            AddressPath::File {
                file,
                bundle: Some(bundle),
            } => format!("{bundle}/{file}"),
            AddressPath::File { file, bundle: None } => file.clone(),
        }
    }
}

/// 语音
#[derive(Debug, Clone, Deserialize)]
pub struct Voice {
    pub character: u16,
    #[serde(rename = "voiceId")]
    pub voice: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TalkAction {
    #[serde(default)]
    pub wait: bool,
    #[serde(default)]
    pub delay: f64,
    pub name: String,
    #[serde(rename = "body")]
    pub text: String,
    #[serde(default)]
    pub motions: Vec<Motion>,
    #[serde(default)]
    pub characters: Vec<u16>,
    #[serde(default)]
    pub voices: Vec<Voice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SoundAction {
    #[serde(default)]
    pub wait: bool,
    #[serde(default)]
    pub delay: f64,
    pub bgm: Option<Address>,
    pub se: Option<Address>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "effectType", rename_all = "camelCase")]
pub enum EffectDetail {
    ChangeBackground {
        #[serde(rename = "background")]
        image: Address,
    },
    ChangeCardStill {
        #[serde(rename = "cardStill")]
        image: Address,
    },
    Telop {
        text: String,
    },
    BlackIn,
    BlackOut,
    WhiteIn,
    WhiteOut,
    ShakeScreen,
    ShakeWindow,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EffectAction {
    #[serde(default)]
    pub wait: bool,
    #[serde(default)]
    pub delay: f64,
    #[serde(flatten)]
    pub effect: EffectDetail,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayoutType {
    Appear,
    Hide,
    Move,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayoutSideType {
    LeftInside,
    LeftOver,
    Center,
    RightInside,
    RightOver,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LayoutSide {
    #[serde(rename = "sideFrom")]
    pub from: LayoutSideType,
    #[serde(rename = "sideTo")]
    pub to: LayoutSideType,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LayoutAction {
    #[serde(default)]
    pub wait: bool,
    #[serde(rename = "layoutType")]
    pub kind: LayoutType,
    #[serde(rename = "costume", default)]
    pub model: String,
    #[serde(flatten)]
    pub motion: Motion,
    #[serde(flatten)]
    pub side: LayoutSide,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MotionAction {
    #[serde(default)]
    pub wait: bool,
    #[serde(flatten)]
    pub motion: Motion,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bestdori_deserialize() {
        let story: Story = r#"{
            "bgm": { "type": "bandori", "file": "bgm01", "bundle": "sound/scenario/bgm" },
            "background": { "type": "common", "file": "bg00001" },
            "actions": [
                { "type": "talk", "wait": true, "delay": 0, "name": "香澄", "body": "Hi",
                  "motions": [ { "character": 1, "motion": "smile01", "expression": "", "delay": 0.5 } ],
                  "characters": [1], "voices": [ { "character": 1, "voiceId": "scenario0/001", "volume": 1 } ] },
                { "type": "layout", "wait": true, "delay": 0, "layoutType": "appear", "character": 1,
                  "costume": "001_casual", "motion": "", "expression": "",
                  "sideFrom": "center", "sideFromOffsetX": 0, "sideTo": "leftInside", "sideToOffsetX": 0 },
                { "type": "effect", "wait": false, "delay": 1, "effectType": "blackOut" },
                { "type": "input" }
            ]
        }"#
        .parse()
        .unwrap();

        assert_eq!(story.0.len(), 6);
        assert!(matches!(
            &story.0[0],
            Action::Effect(EffectAction { effect: EffectDetail::ChangeBackground { image }, .. })
                if image.path() == "bg00001"
        ));
        assert!(matches!(
            &story.0[1],
            Action::Sound(SoundAction { wait: true, bgm: Some(bgm), .. }) if bgm.path() == "sound/scenario/bgm/bgm01"
        ));
        assert!(matches!(&story.0[2], Action::Talk(talk) if talk.voices[0].voice == "scenario0/001"));
        assert!(matches!(&story.0[3], Action::Layout(layout) if layout.model == "001_casual"));
        assert!(matches!(
            &story.0[4],
            Action::Effect(EffectAction { wait: false, effect: EffectDetail::BlackOut, .. })
        ));
        assert!(matches!(&story.0[5], Action::Unknown));
    }
}
