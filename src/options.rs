use std::convert::TryFrom;
use tokio::time::Duration;

/// Tunables for log shipping and membership catch-up. Unset fields take their defaults.
#[derive(Clone, Default)]
pub struct ReplicationOptions {
    /// Max entries in flight while a follower is catching up.
    pub catchup_batch_size: Option<u64>,
    /// Max entries a follower may trail by before the shipper stops pipelining to it.
    pub max_allowed_shipping_lag: Option<u64>,
    /// How long the shipper waits for a response before resending.
    pub retry_timeout: Option<Duration>,
    /// Consecutive timeouts in catchup mode before the shipper falls back to probing.
    pub timeouts_before_mismatch: Option<u32>,
    /// Period of the membership catch-up evaluation.
    pub max_catchup_lag: Option<Duration>,
    /// How many evaluation rounds old the leader commit is that a joining member is compared to.
    pub catchup_rounds_behind: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct ReplicationOptionsValidated {
    pub catchup_batch_size: u64,
    pub max_allowed_shipping_lag: u64,
    pub retry_timeout: Duration,
    pub timeouts_before_mismatch: u32,
    pub max_catchup_lag: Duration,
    pub catchup_rounds_behind: usize,
}

impl ReplicationOptionsValidated {
    fn validate(&self) -> Result<(), &'static str> {
        if self.catchup_batch_size == 0 {
            return Err("Catchup batch size must be at least 1");
        }
        if self.max_allowed_shipping_lag == 0 {
            return Err("Max allowed shipping lag must be at least 1");
        }
        if self.retry_timeout == Duration::from_millis(0) {
            return Err("Retry timeout must be non-zero");
        }
        if self.timeouts_before_mismatch == 0 {
            return Err("Timeouts before mismatch must be at least 1");
        }
        if self.max_catchup_lag == Duration::from_millis(0) {
            return Err("Max catchup lag must be non-zero");
        }
        if self.catchup_rounds_behind == 0 {
            return Err("Catchup rounds behind must be at least 1");
        }

        Ok(())
    }
}

impl Default for ReplicationOptionsValidated {
    fn default() -> Self {
        ReplicationOptionsValidated {
            catchup_batch_size: 64,
            max_allowed_shipping_lag: 256,
            retry_timeout: Duration::from_millis(500),
            timeouts_before_mismatch: 2,
            max_catchup_lag: Duration::from_secs(1),
            catchup_rounds_behind: 1,
        }
    }
}

impl TryFrom<ReplicationOptions> for ReplicationOptionsValidated {
    type Error = &'static str;

    fn try_from(options: ReplicationOptions) -> Result<Self, Self::Error> {
        let defaults = ReplicationOptionsValidated::default();
        let values = ReplicationOptionsValidated {
            catchup_batch_size: options.catchup_batch_size.unwrap_or(defaults.catchup_batch_size),
            max_allowed_shipping_lag: options
                .max_allowed_shipping_lag
                .unwrap_or(defaults.max_allowed_shipping_lag),
            retry_timeout: options.retry_timeout.unwrap_or(defaults.retry_timeout),
            timeouts_before_mismatch: options
                .timeouts_before_mismatch
                .unwrap_or(defaults.timeouts_before_mismatch),
            max_catchup_lag: options.max_catchup_lag.unwrap_or(defaults.max_catchup_lag),
            catchup_rounds_behind: options.catchup_rounds_behind.unwrap_or(defaults.catchup_rounds_behind),
        };

        values.validate()?;
        Ok(values)
    }
}

#[derive(Clone, Default)]
pub struct TransportOptions {
    pub connect_backoff_min: Option<Duration>,
    pub connect_backoff_max: Option<Duration>,
    /// Messages buffered per peer while it is unreachable. Overflow is dropped.
    pub send_queue_size: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct TransportOptionsValidated {
    pub connect_backoff_min: Duration,
    pub connect_backoff_max: Duration,
    pub send_queue_size: usize,
}

impl TransportOptionsValidated {
    fn validate(&self) -> Result<(), &'static str> {
        if self.connect_backoff_min > self.connect_backoff_max {
            return Err("Minimum connect backoff must not exceed maximum connect backoff");
        }
        if self.send_queue_size == 0 {
            return Err("Send queue size must be at least 1");
        }

        Ok(())
    }
}

impl TryFrom<TransportOptions> for TransportOptionsValidated {
    type Error = &'static str;

    fn try_from(options: TransportOptions) -> Result<Self, Self::Error> {
        let values = TransportOptionsValidated {
            connect_backoff_min: options.connect_backoff_min.unwrap_or(Duration::from_millis(50)),
            connect_backoff_max: options.connect_backoff_max.unwrap_or(Duration::from_secs(2)),
            send_queue_size: options.send_queue_size.unwrap_or(128),
        };

        values.validate()?;
        Ok(values)
    }
}
