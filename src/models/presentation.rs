//! 画面状态投影
//!
//! 只由解释器写入, 渲染层只读观察.

use std::time::Duration;

use serde::Serialize;

use super::action::{CharacterId, Position, TalkData};

/// 单个角色槽位
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutState {
    pub character_id: CharacterId,
    pub model_path: String,
    pub position: Position,
    pub motion: Option<String>,
    pub expression: Option<String>,
}

impl LayoutState {
    /// 按屏幕尺寸计算模型中心的像素偏移
    pub fn offset(&self, width: f32, height: f32) -> (f32, f32) {
        let (x, y) = self.position.anchor();
        (x * width, y * height)
    }
}

/// 全屏遮罩
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverState {
    pub visible: bool,
    /// 透明度动画时长
    pub transition: Duration,
    /// 最近一次显示的派发序号, 用于黑白遮罩互斥
    pub stamp: u64,
}

/// 震动
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShakeState {
    /// 剩余震动时长, 为 0 表示静止
    pub duration: Duration,
    pub offset: (f32, f32),
    pub stamp: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Cover {
    Black,
    White,
}

impl Cover {
    pub fn other(self) -> Self {
        match self {
            Cover::Black => Cover::White,
            Cover::White => Cover::Black,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Shake {
    Screen,
    DialogBox,
}

/// 画面状态
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    /// 顶层时间线当前执行到的动作序号
    pub step: Option<usize>,
    pub background: Option<String>,
    pub bgm: Option<String>,
    pub se: Option<String>,
    pub layouts: Vec<LayoutState>,
    pub talk: Option<TalkData>,
    pub telop: Option<String>,
    pub black_cover: CoverState,
    pub white_cover: CoverState,
    pub screen_shake: ShakeState,
    pub dialog_shake: ShakeState,
}

impl Presentation {
    pub fn layout(&self, character_id: CharacterId) -> Option<&LayoutState> {
        self.layouts
            .iter()
            .find(|layout| layout.character_id == character_id)
    }

    fn layout_mut(&mut self, character_id: CharacterId) -> Option<&mut LayoutState> {
        self.layouts
            .iter_mut()
            .find(|layout| layout.character_id == character_id)
    }

    /// 显示模型
    ///
    /// 同一角色已在场时替换模型并移动, 保留动作与表情 (模型相同时).
    pub fn show_model(&mut self, character_id: CharacterId, model_path: &str, position: Position) {
        match self.layout_mut(character_id) {
            Some(layout) => {
                if layout.model_path != model_path {
                    layout.model_path = model_path.to_string();
                    layout.motion = None;
                    layout.expression = None;
                }
                layout.position = position;
            }
            None => self.layouts.push(LayoutState {
                character_id,
                model_path: model_path.to_string(),
                position,
                motion: None,
                expression: None,
            }),
        }
    }

    /// 返回是否存在该角色
    pub fn hide_model(&mut self, character_id: CharacterId) -> bool {
        let len = self.layouts.len();
        self.layouts
            .retain(|layout| layout.character_id != character_id);
        self.layouts.len() != len
    }

    pub fn move_model(&mut self, character_id: CharacterId, position: Position) -> bool {
        self.layout_mut(character_id)
            .map(|layout| layout.position = position)
            .is_some()
    }

    pub fn act(&mut self, character_id: CharacterId, motion: &str) -> bool {
        self.layout_mut(character_id)
            .map(|layout| layout.motion = Some(motion.to_string()))
            .is_some()
    }

    pub fn express(&mut self, character_id: CharacterId, expression: &str) -> bool {
        self.layout_mut(character_id)
            .map(|layout| layout.expression = Some(expression.to_string()))
            .is_some()
    }

    pub fn cover(&self, cover: Cover) -> &CoverState {
        match cover {
            Cover::Black => &self.black_cover,
            Cover::White => &self.white_cover,
        }
    }

    pub fn cover_mut(&mut self, cover: Cover) -> &mut CoverState {
        match cover {
            Cover::Black => &mut self.black_cover,
            Cover::White => &mut self.white_cover,
        }
    }

    pub fn shake(&self, shake: Shake) -> &ShakeState {
        match shake {
            Shake::Screen => &self.screen_shake,
            Shake::DialogBox => &self.dialog_shake,
        }
    }

    pub fn shake_mut(&mut self, shake: Shake) -> &mut ShakeState {
        match shake {
            Shake::Screen => &mut self.screen_shake,
            Shake::DialogBox => &mut self.dialog_shake,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_lifecycle() {
        let mut state = Presentation::default();

        state.show_model(1, "m1", Position::Center);
        assert!(state.act(1, "smile01"));
        assert!(state.express(1, "angry02"));
        assert!(state.move_model(1, Position::Left));

        let layout = state.layout(1).unwrap();
        assert_eq!(layout.position, Position::Left);
        assert_eq!(layout.motion.as_deref(), Some("smile01"));
        assert_eq!(layout.offset(1000., 500.), (250., 0.));

        // 同一模型再次出现只移动
        state.show_model(1, "m1", Position::Right);
        assert_eq!(state.layouts.len(), 1);
        assert_eq!(state.layout(1).unwrap().expression.as_deref(), Some("angry02"));

        // 换装则重置动作
        state.show_model(1, "m2", Position::Right);
        assert_eq!(state.layout(1).unwrap().motion, None);

        assert!(state.hide_model(1));
        assert!(!state.hide_model(1));
        assert!(!state.act(1, "smile01"));
        assert!(state.layouts.is_empty());
    }
}
