/// Capacity of the broadcast channel carrying app notifications
pub const BROADCAST_CHANNEL_CAPACITY: usize = 256;

/// Base period (seconds) of the interval subscription clock
pub const INTERVAL_TICK_SECS: u64 = 60;
