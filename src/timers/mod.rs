mod shared_option;
mod time;

pub(crate) use shared_option::SharedOption;
pub(crate) use time::Clock;
pub(crate) use time::RealClock;

#[cfg(test)]
pub(crate) use time::mocked_clock;
