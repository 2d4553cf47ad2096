//! 剧情动作 (IR)

use serde::{Deserialize, Serialize};

/// 角色 id
pub type CharacterId = u16;

/// 对话数据, 同时用于对话框与历史记录
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TalkData {
    pub text: String,
    #[serde(default)]
    pub character_ids: Vec<CharacterId>,
    #[serde(default)]
    pub character_names: Vec<String>,
    #[serde(default)]
    pub voice_path: Option<String>,
}

impl TalkData {
    pub fn new<T, N>(text: &str, character_ids: T, character_names: N, voice_path: Option<&str>) -> Self
    where
        T: IntoIterator<Item = CharacterId>,
        N: IntoIterator,
        N::Item: Into<String>,
    {
        Self {
            text: text.to_string(),
            character_ids: character_ids.into_iter().collect(),
            character_names: character_names.into_iter().map(Into::into).collect(),
            voice_path: voice_path.map(String::from),
        }
    }
}

/// 模型站位
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Position {
    Left,
    LeftOutside,
    LeftInside,
    #[default]
    Center,
    CenterBottom,
    Right,
    RightOutside,
    RightInside,
    LeftBottom,
    LeftInsideBottom,
    RightBottom,
    RightInsideBottom,
}

/// 底部站位的纵向下沉比例
const BOTTOM_SINK: f32 = 0.2;

impl Position {
    /// 归一化的屏幕锚点 (x, y)
    ///
    /// x 以屏幕宽度为 1, 屏幕外的站位超出 [0, 1]; y 为向下的偏移比例.
    pub fn anchor(&self) -> (f32, f32) {
        use Position::*;

        let x = match self {
            LeftOutside => -0.25,
            Left | LeftBottom => 0.25,
            LeftInside | LeftInsideBottom => 0.35,
            Center | CenterBottom => 0.5,
            RightInside | RightInsideBottom => 0.65,
            Right | RightBottom => 0.75,
            RightOutside => 1.25,
        };
        let y = match self {
            CenterBottom | LeftBottom | LeftInsideBottom | RightBottom | RightInsideBottom => {
                BOTTOM_SINK
            }
            _ => 0.,
        };

        (x, y)
    }
}

/// 剧情动作
///
/// - Talk 与 Telop 会阻塞时间线, 直到外部推进
/// - 其余动作在固定或计算出的时长后自行完成
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, strum::IntoStaticStr)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum Action {
    Talk(TalkData),
    Telop {
        text: String,
    },
    ShowModel {
        character_id: CharacterId,
        model_path: String,
        #[serde(default)]
        position: Position,
    },
    HideModel {
        character_id: CharacterId,
    },
    MoveModel {
        character_id: CharacterId,
        position: Position,
    },
    Act {
        character_id: CharacterId,
        motion_name: String,
    },
    Express {
        character_id: CharacterId,
        expression_name: String,
    },
    HorizontalShake {
        character_id: CharacterId,
    },
    VerticalShake {
        character_id: CharacterId,
    },
    ShowBlackCover {
        duration: f64,
    },
    HideBlackCover {
        duration: f64,
    },
    ShowWhiteCover {
        duration: f64,
    },
    HideWhiteCover {
        duration: f64,
    },
    ShakeScreen {
        duration: f64,
    },
    ShakeDialogBox {
        duration: f64,
    },
    ChangeBackground {
        path: String,
    },
    ChangeBgm {
        path: String,
    },
    ChangeSe {
        path: String,
    },
    /// 并发执行全部子动作, 全部完成后才继续
    Blocking {
        actions: Vec<Action>,
    },
    Delay {
        seconds: f64,
    },
    /// 在独立的时间线上顺序执行子动作, 不阻塞当前时间线
    ForkTask {
        actions: Vec<Action>,
    },
    WaitForAll,
    WaitForTap,
}

impl Action {
    /// 是否等待外部推进
    pub fn is_tap_blocking(&self) -> bool {
        matches!(self, Action::Talk(_) | Action::Telop { .. })
    }

    pub fn kind(&self) -> &'static str {
        self.into()
    }

    /// 子动作 (仅 Blocking 与 ForkTask 非空)
    pub fn children(&self) -> &[Action] {
        match self {
            Action::Blocking { actions } | Action::ForkTask { actions } => actions,
            _ => &[],
        }
    }

    /// 递归收集语音路径 (按文档顺序, 可能重复)
    pub fn voice_paths(&self) -> Vec<&str> {
        let mut paths = Vec::new();
        self.collect_voice_paths(&mut paths);
        paths
    }

    fn collect_voice_paths<'a>(&'a self, paths: &mut Vec<&'a str>) {
        if let Action::Talk(TalkData {
            voice_path: Some(path),
            ..
        }) = self
        {
            paths.push(path);
        }
        self.children()
            .iter()
            .for_each(|child| child.collect_voice_paths(paths));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tap_blocking() {
        assert!(Action::Talk(TalkData::default()).is_tap_blocking());
        assert!(
            Action::Telop {
                text: String::new()
            }
            .is_tap_blocking()
        );
        assert!(!Action::Delay { seconds: 1. }.is_tap_blocking());
        assert!(!Action::Blocking { actions: vec![] }.is_tap_blocking());
        assert!(!Action::WaitForTap.is_tap_blocking());
    }

    #[test]
    fn test_deserialize_ir() {
        let json = r#"[
            { "type": "talk", "text": "Hi", "characterIds": [1], "characterNames": ["Kasumi"] },
            { "type": "showModel", "characterId": 1, "modelPath": "001_casual", "position": "leftInside" },
            { "type": "blocking", "actions": [ { "type": "delay", "seconds": 1.5 }, { "type": "waitForTap" } ] }
        ]"#;
        let actions: Vec<Action> = serde_json::from_str(json).unwrap();

        assert_eq!(
            actions[0],
            Action::Talk(TalkData::new("Hi", [1], ["Kasumi"], None))
        );
        assert_eq!(
            actions[1],
            Action::ShowModel {
                character_id: 1,
                model_path: "001_casual".to_string(),
                position: Position::LeftInside,
            }
        );
        assert_eq!(actions[2].children().len(), 2);
        assert_eq!(actions[2].kind(), "blocking");
    }

    #[test]
    fn test_voice_paths() {
        let action = Action::ForkTask {
            actions: vec![
                Action::Talk(TalkData::new("a", [1], ["A"], Some("v/a"))),
                Action::Blocking {
                    actions: vec![
                        Action::Talk(TalkData::new("b", [2], ["B"], None)),
                        Action::Talk(TalkData::new("c", [3], ["C"], Some("v/c"))),
                    ],
                },
            ],
        };
        assert_eq!(action.voice_paths(), vec!["v/a", "v/c"]);
    }

    #[test]
    fn test_anchor() {
        assert_eq!(Position::Center.anchor(), (0.5, 0.));
        assert_eq!(Position::RightInsideBottom.anchor(), (0.65, BOTTOM_SINK));
        assert!(Position::LeftOutside.anchor().0 < 0.);
        assert_eq!("rightOutside".parse::<Position>().unwrap(), Position::RightOutside);
    }
}
