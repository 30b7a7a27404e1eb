//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **EventBus**: EventKind ごとの observer 登録
//! - **ChannelEventSink**: broadcast channel でイベントを配送
//! - **SimulateProcessor** / **CopyProcessor**: デモ・テスト用の processor

pub mod channel_sink;
pub mod copy;
pub mod event_bus;
pub mod simulate;

pub use self::channel_sink::ChannelEventSink;
pub use self::copy::CopyProcessor;
pub use self::event_bus::EventBus;
pub use self::simulate::SimulateProcessor;
