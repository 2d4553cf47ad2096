//! 时间线解释器
//!
//! 顶层时间线严格按文档顺序执行: 前一个动作的 perform 返回后才派发下一个.
//! 并发只存在于 Blocking 与 ForkTask 内部, 每个嵌套派发拥有独立的作用域屏障.

use std::iter;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, join_all};
use rand::Rng;
use tokio::time::{self, Instant};

use super::autoplay::{Dwell, MIN_PERIOD, auto_advance};
use super::barrier::{Barrier, Ticket};
use super::definition::*;
use super::session::{Session, seconds};
use crate::models::{Action, Cover, Shake};

/// 时间线解释器
///
/// 持有会话句柄, 可廉价克隆到派生的子时间线中.
#[derive(Clone)]
pub struct Interpreter {
    session: Arc<Session>,
}

impl Interpreter {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// 在给定作用域内按顺序执行动作列表
    ///
    /// indexed 为真时把动作序号发布到画面状态 (仅顶层时间线).
    pub async fn walk(&self, scope: &Arc<Barrier>, actions: &[Action], indexed: bool) {
        for (index, action) in actions.iter().enumerate() {
            if self.session.is_cancelled() {
                break;
            }
            self.perform(action, scope, indexed.then_some(index)).await;
        }
    }

    /// 执行单个动作
    ///
    /// 返回时动作已派发; 对于会挂起的动作, 返回时已完成.
    pub fn perform<'a>(
        &'a self,
        action: &'a Action,
        scope: &'a Arc<Barrier>,
        index: Option<usize>,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let session = &self.session;
            if session.is_cancelled() {
                return;
            }
            if let Some(step) = index {
                session.present(|state| state.step = Some(step));
            }

            let ticket = scope.enter(action.is_tap_blocking());
            log::trace!(
                "session {} scope {} perform {} (step: {index:?})",
                session.key(),
                scope.id(),
                action.kind()
            );
            let config = session.config();

            match action {
                Action::Talk(talk) => {
                    session.present(|state| state.talk = Some(talk.clone()));
                    session.push_backlog(talk.clone());

                    let voiced = talk
                        .voice_path
                        .as_deref()
                        .is_some_and(|path| session.play_voice(path));
                    let dwell = match voiced {
                        true => Dwell::Voice,
                        false => Dwell::Fixed(config.talk_dwell),
                    };
                    if self.block(dwell).await {
                        ticket.release();
                    }
                }
                Action::Telop { text } => {
                    session.present(|state| state.telop = Some(text.clone()));
                    if self.block(Dwell::Fixed(config.telop_dwell)).await {
                        session.present_if(|state| {
                            let current = state.telop.as_ref() == Some(text);
                            if current {
                                state.telop = None;
                            }
                            current
                        });
                        ticket.release();
                    }
                }

                Action::ShowModel {
                    character_id,
                    model_path,
                    position,
                } => {
                    session.present(|state| state.show_model(*character_id, model_path, *position));
                    self.settle(ticket, config.layout_settle);
                }
                Action::HideModel { character_id } => {
                    if !session.present_if(|state| state.hide_model(*character_id)) {
                        log::warn!("hide model: character {character_id} is not on stage");
                    }
                    self.settle(ticket, config.layout_settle);
                }
                Action::MoveModel {
                    character_id,
                    position,
                } => {
                    if !session.present_if(|state| state.move_model(*character_id, *position)) {
                        log::warn!("move model: character {character_id} is not on stage");
                    }
                    self.settle(ticket, config.layout_settle);
                }
                Action::Act {
                    character_id,
                    motion_name,
                } => {
                    if !session.present_if(|state| state.act(*character_id, motion_name)) {
                        log::warn!("act {motion_name}: character {character_id} is not on stage");
                    }
                    self.settle(ticket, config.motion_settle);
                }
                Action::Express {
                    character_id,
                    expression_name,
                } => {
                    if !session.present_if(|state| state.express(*character_id, expression_name)) {
                        log::warn!(
                            "express {expression_name}: character {character_id} is not on stage"
                        );
                    }
                    self.settle(ticket, config.motion_settle);
                }
                Action::HorizontalShake { character_id } | Action::VerticalShake { character_id } => {
                    // 角色震动暂无画面效果
                    log::debug!("{} of character {character_id} is ignored", action.kind());
                    ticket.release();
                }

                Action::ShowBlackCover { duration } => {
                    self.cover(ticket, Cover::Black, true, *duration).await
                }
                Action::HideBlackCover { duration } => {
                    self.cover(ticket, Cover::Black, false, *duration).await
                }
                Action::ShowWhiteCover { duration } => {
                    self.cover(ticket, Cover::White, true, *duration).await
                }
                Action::HideWhiteCover { duration } => {
                    self.cover(ticket, Cover::White, false, *duration).await
                }
                Action::ShakeScreen { duration } => {
                    self.shake(ticket, Shake::Screen, *duration).await
                }
                Action::ShakeDialogBox { duration } => {
                    self.shake(ticket, Shake::DialogBox, *duration).await
                }

                Action::ChangeBackground { path } => {
                    session.present(|state| state.background = Some(path.clone()));
                    ticket.release();
                }
                Action::ChangeBgm { path } => {
                    let audio = session.audio();
                    audio.stop(Channel::Bgm);
                    audio.play(Channel::Bgm, AudioSource::Path(path.clone()), true);
                    session.present(|state| state.bgm = Some(path.clone()));
                    ticket.release();
                }
                Action::ChangeSe { path } => {
                    session
                        .audio()
                        .play(Channel::Se, AudioSource::Path(path.clone()), false);
                    session.present(|state| state.se = Some(path.clone()));
                    ticket.release();
                }

                Action::Delay { seconds: secs } => {
                    if session.sleep(seconds(*secs)).await {
                        ticket.release();
                    }
                }
                Action::Blocking { actions } => {
                    ticket.release();
                    let nested = session.scope(Some(scope));
                    let nested = &nested;
                    let wait = Action::WaitForAll;
                    let children = actions
                        .iter()
                        .chain(iter::once(&wait))
                        .map(|child| self.perform(child, nested, None));
                    join_all(children).await;
                }
                Action::ForkTask { actions } => {
                    ticket.release();
                    let nested = session.scope(Some(scope));
                    let fork = self.clone();
                    let actions = actions.clone();
                    session.spawn(async move { fork.walk(&nested, &actions, false).await });
                }
                Action::WaitForAll => {
                    ticket.release();
                    session.until(scope.drained()).await;
                }
                Action::WaitForTap => {
                    ticket.release();
                    session.until(scope.taps_drained()).await;
                }
            }
        })
    }

    /// 挂起点击阻塞动作, 直到点击, 自动播放或会话结束
    ///
    /// 返回是否正常恢复 (会话结束导致的恢复返回 false).
    async fn block(&self, dwell: Dwell) -> bool {
        let session = &self.session;
        let (id, tap) = session.park();
        let resumed = tokio::select! {
            biased;
            _ = session.cancelled() => false,
            _ = tap => true,
            _ = auto_advance(session, dwell) => {
                session.unpark(id);
                true
            }
        };
        resumed && !session.is_cancelled()
    }

    /// 延迟释放凭据, 不阻塞当前时间线
    fn settle(&self, ticket: Ticket, delay: Duration) {
        let session = self.session.clone();
        self.session.spawn(async move {
            if session.sleep(delay).await {
                ticket.release();
            }
        });
    }

    async fn cover(&self, ticket: Ticket, cover: Cover, visible: bool, duration: f64) {
        let session = &self.session;
        let transition = seconds(duration);
        let stamp = session.serial();
        session.present(|state| {
            let target = state.cover_mut(cover);
            target.visible = visible;
            target.transition = transition;
            if visible {
                target.stamp = stamp;
            }
        });

        if !session.sleep(transition).await {
            return;
        }
        // 黑白遮罩互斥: 后派发的显示生效
        if visible {
            session.present_if(|state| {
                let other = state.cover_mut(cover.other());
                let earlier = other.visible && other.stamp < stamp;
                if earlier {
                    other.visible = false;
                }
                earlier
            });
        }
        ticket.release();
    }

    async fn shake(&self, ticket: Ticket, shake: Shake, duration: f64) {
        let session = &self.session;
        let duration = seconds(duration);
        let stamp = session.serial();
        session.present(|state| {
            let target = state.shake_mut(shake);
            target.duration = duration;
            target.stamp = stamp;
        });
        session.spawn(jitter(session.clone(), shake, stamp, duration));

        if session.sleep(duration).await {
            ticket.release();
        }
    }
}

/// 震动动画, 超过时长后把时长置 0 并停止
///
/// 同一目标被新的震动覆盖时提前停止.
async fn jitter(session: Arc<Session>, shake: Shake, stamp: u64, duration: Duration) {
    let config = session.config();
    let magnitude = config.shake_magnitude.abs();
    let start = Instant::now();
    let mut ticker = time::interval(config.shake_frame.max(MIN_PERIOD));

    loop {
        ticker.tick().await;
        let finished = start.elapsed() >= duration;
        let offset = match finished || !(magnitude.is_finite() && magnitude > 0.) {
            true => (0., 0.),
            false => {
                let mut rng = rand::rng();
                (
                    rng.random_range(-magnitude..=magnitude),
                    rng.random_range(-magnitude..=magnitude),
                )
            }
        };

        let current = session.present_if(|state| {
            let target = state.shake_mut(shake);
            if target.stamp != stamp {
                return false;
            }
            target.offset = offset;
            if finished {
                target.duration = Duration::ZERO;
            }
            true
        });
        if finished || !current {
            break;
        }
    }
}
