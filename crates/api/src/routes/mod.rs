pub mod calibration;
pub mod reports;
pub mod sessions;
