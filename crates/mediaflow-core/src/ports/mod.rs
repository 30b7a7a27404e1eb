//! Ports - 抽象化レイヤー
//!
//! Queue が依存する外部コラボレーター（時刻、ID、イベント配送、処理本体）を
//! trait として定義します。

pub mod clock;
pub mod event_sink;
pub mod id_generator;
pub mod processor;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::event_sink::{EventSink, NoopEventSink};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::processor::{Processor, ProcessorError};
