/// Timestamp on the host's monotonic clock, in milliseconds.
///
/// The browser hands these out from `performance.now()`; native drivers use
/// an `Instant` captured at startup.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Default)]
pub struct Millis(pub f64);

impl Millis {
    pub fn since(self, earlier: Millis) -> f64 {
        (self.0 - earlier.0).max(0.0)
    }

    pub fn after(self, duration_ms: f64) -> Millis {
        Millis(self.0 + duration_ms.max(0.0))
    }
}
