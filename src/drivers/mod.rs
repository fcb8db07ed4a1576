pub mod ambient;
pub mod imu;
pub mod pulse_ox;
