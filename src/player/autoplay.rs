//! 自动播放与快进

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant};

use super::definition::Channel;
use super::session::{Session, wait_flag};

/// 定时器的最小周期
pub(crate) const MIN_PERIOD: Duration = Duration::from_millis(1);

/// 自动播放的停留方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dwell {
    /// 固定时长
    Fixed(Duration),
    /// 等待语音播放结束后再停留片刻
    Voice,
}

/// 自动推进一个点击阻塞动作
///
/// 只在自动播放开启时计时; 计时中途关闭自动播放会作废本次计时,
/// 重新开启后从头计时. 自动播放始终未开启时永不完成.
pub(crate) async fn auto_advance(session: &Session, dwell: Dwell) {
    let mut flag = session.watch_auto_play();
    loop {
        if !wait_flag(&mut flag, true).await {
            return std::future::pending().await;
        }
        tokio::select! {
            _ = linger(session, dwell) => return,
            _ = wait_flag(&mut flag, false) => {
                log::trace!("session {} auto play timer dropped", session.key());
            }
        }
    }
}

async fn linger(session: &Session, dwell: Dwell) {
    match dwell {
        Dwell::Fixed(duration) => time::sleep(duration).await,
        Dwell::Voice => {
            let config = session.config();
            let poll = config.voice_poll.max(MIN_PERIOD);
            let mut ticker = time::interval_at(Instant::now() + poll, poll);
            loop {
                ticker.tick().await;
                if !session.audio().is_playing(Channel::Voice) {
                    break;
                }
            }
            time::sleep(config.voice_tail).await;
        }
    }
}

/// 快进计时器
///
/// 快进开启期间周期性地清零会话树中的全部计数, 提前结束定时挂起,
/// 并恢复最近挂起的点击阻塞动作. 由播放器在开始时派生, 随会话一同中止.
pub(crate) async fn fast_forward(session: Arc<Session>) {
    let mut flag = session.watch_fast_forward();
    let period = session.config().fast_forward_interval.max(MIN_PERIOD);

    while wait_flag(&mut flag, true).await {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    session.reset_scopes();
                    session.skip();
                    session.next();
                }
                _ = wait_flag(&mut flag, false) => break,
            }
        }
        log::trace!("session {} fast forward paused", session.key());
    }
}
