pub mod alert;
pub mod change;

pub use alert::{format_usd, VolumeAlert};
pub use change::{exceeds_threshold, windowed_change_percent};
