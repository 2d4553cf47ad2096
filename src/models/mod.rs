//! 数据模型

pub mod action;
pub mod bestdori;
pub mod presentation;

pub use action::*;
pub use presentation::*;
