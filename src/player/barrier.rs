//! 引用计数屏障
//!
//! 每个会话作用域一个屏障, 记录未完成的动作与未完成的点击阻塞动作.

use std::sync::{Arc, Weak};

use tokio::sync::watch;

/// 计数快照
#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    pending: usize,
    /// 每次重置后递增, 重置前发放的凭据随之失效
    epoch: u64,
}

/// 可等待归零的计数器
#[derive(Debug)]
struct Counter {
    name: &'static str,
    tally: watch::Sender<Tally>,
}

impl Counter {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            tally: watch::Sender::new(Tally::default()),
        }
    }

    fn acquire(&self) -> u64 {
        let mut epoch = 0;
        self.tally.send_modify(|tally| {
            tally.pending += 1;
            epoch = tally.epoch;
        });
        epoch
    }

    fn release(&self, epoch: u64) {
        self.tally.send_if_modified(|tally| {
            if tally.epoch != epoch {
                return false;
            }
            debug_assert!(tally.pending > 0, "{} counter released below zero", self.name);
            if tally.pending == 0 {
                log::error!("{} counter released below zero", self.name);
                return false;
            }
            tally.pending -= 1;
            true
        });
    }

    fn reset(&self) {
        self.tally.send_modify(|tally| {
            tally.pending = 0;
            tally.epoch += 1;
        });
    }

    fn get(&self) -> usize {
        self.tally.borrow().pending
    }

    async fn drained(&self) {
        let mut rx = self.tally.subscribe();
        // sender 由 self 持有, 不会提前关闭
        let _ = rx.wait_for(|tally| tally.pending == 0).await;
    }
}

/// 引用计数屏障
#[derive(Debug)]
pub struct Barrier {
    id: u64,
    session: u64,
    parent: Option<Weak<Barrier>>,
    actions: Counter,
    taps: Counter,
}

impl Barrier {
    pub(crate) fn new(id: u64, session: u64, parent: Option<&Arc<Barrier>>) -> Self {
        Self {
            id,
            session,
            parent: parent.map(Arc::downgrade),
            actions: Counter::new("action"),
            taps: Counter::new("tap"),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// 所属会话
    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn parent(&self) -> Option<Arc<Barrier>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// 未完成的动作数
    pub fn outstanding(&self) -> usize {
        self.actions.get()
    }

    /// 未完成的点击阻塞动作数
    pub fn outstanding_taps(&self) -> usize {
        self.taps.get()
    }

    /// 登记一个动作
    pub fn enter(self: &Arc<Self>, tap_blocking: bool) -> Ticket {
        Ticket {
            barrier: self.clone(),
            epoch: self.actions.acquire(),
            tap_epoch: tap_blocking.then(|| self.taps.acquire()),
        }
    }

    /// 清零全部计数, 已发放的凭据失效
    pub fn reset(&self) {
        self.actions.reset();
        self.taps.reset();
    }

    /// 等待动作计数归零
    pub async fn drained(&self) {
        self.actions.drained().await
    }

    /// 等待点击阻塞计数归零
    pub async fn taps_drained(&self) {
        self.taps.drained().await
    }
}

/// 动作登记凭据, 释放时消耗
#[derive(Debug)]
#[must_use = "a ticket must be released once its action completes"]
pub struct Ticket {
    barrier: Arc<Barrier>,
    epoch: u64,
    tap_epoch: Option<u64>,
}

impl Ticket {
    pub fn release(self) {
        if let Some(epoch) = self.tap_epoch {
            self.barrier.taps.release(epoch);
        }
        self.barrier.actions.release(self.epoch);
    }
}
