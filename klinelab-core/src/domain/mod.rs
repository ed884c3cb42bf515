//! Domain types shared by every layer.

pub mod bar;
pub mod interval;
pub mod order;
pub mod position;
pub mod series;
pub mod trade;

pub use bar::{format_micros, Bar};
pub use interval::{Interval, ParseIntervalError, MICROS_PER_DAY, MICROS_PER_MINUTE};
pub use order::{Execution, ExitReason, Order, OrderId, OrderSide, OrderState};
pub use position::Position;
pub use series::{day_start_us, Series};
pub use trade::Trade;
