pub mod battery;
pub mod horizon;
pub mod schedule;

pub use battery::*;
pub use horizon::*;
pub use schedule::*;
