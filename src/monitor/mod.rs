pub mod monitor;

pub use monitor::BackgroundMonitor;
