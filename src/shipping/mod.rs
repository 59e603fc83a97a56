mod log_shipper;
mod manager;
mod retry_timer;
mod shipper_actor;

#[cfg(test)]
mod test_utils;

pub use manager::LogShippingManager;
pub use manager::ShipCommand;
