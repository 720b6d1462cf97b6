use dashmap::DashMap;

/// The shared set of drivers currently accepting rides.
///
/// `claim` is the one hard concurrency guarantee of the service: no two
/// concurrent claimers may receive the same driver id. Everything else is
/// plain set membership. Selection is deliberately unspecified — a
/// location-aware pool can implement this trait without touching callers.
pub trait DriverPool: Send + Sync + 'static {
    /// Atomically removes and returns an arbitrary available driver, or
    /// `None` if the pool is empty.
    fn claim(&self) -> Option<String>;

    /// Returns a driver to the pool. Releasing an already-present driver is
    /// a no-op, so compensation can be retried safely.
    fn release(&self, driver_id: &str);

    /// Driver-initiated go-online / go-offline toggle. Bypasses the
    /// assignment flow entirely and never touches the ledger.
    fn set_availability(&self, driver_id: &str, available: bool);

    fn available(&self) -> usize;

    fn is_available(&self, driver_id: &str) -> bool;
}

/// Pool backed by a concurrent map keyed by driver id.
#[derive(Default)]
pub struct InMemoryDriverPool {
    drivers: DashMap<String, ()>,
}

impl InMemoryDriverPool {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DriverPool for InMemoryDriverPool {
    fn claim(&self) -> Option<String> {
        // `remove` returns `Some` to exactly one caller; if another claimer
        // got there first, pick again.
        loop {
            let candidate = self.drivers.iter().next().map(|entry| entry.key().clone())?;
            if self.drivers.remove(&candidate).is_some() {
                return Some(candidate);
            }
        }
    }

    fn release(&self, driver_id: &str) {
        self.drivers.insert(driver_id.to_string(), ());
    }

    fn set_availability(&self, driver_id: &str, available: bool) {
        if available {
            self.drivers.insert(driver_id.to_string(), ());
        } else {
            self.drivers.remove(driver_id);
        }
    }

    fn available(&self) -> usize {
        self.drivers.len()
    }

    fn is_available(&self, driver_id: &str) -> bool {
        self.drivers.contains_key(driver_id)
    }
}
