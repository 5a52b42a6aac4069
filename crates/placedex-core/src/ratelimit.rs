// crates/placedex-core/src/ratelimit.rs
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

/// Async token bucket shared by every in-flight request.
///
/// Holds at most `capacity` tokens and refills continuously at `rate`
/// tokens per second. This is only a soft throttle: the upstream enforces
/// its own limit and the client still has to handle its rejections.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    rate: f64,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// A full bucket of `per_second` tokens refilling at `per_second`/s.
    pub fn per_second(per_second: u32) -> Self {
        let rate = f64::from(per_second.max(1));
        TokenBucket {
            capacity: rate,
            rate,
            state: Mutex::new(BucketState {
                tokens: rate,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Wait until a token is available and take it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(state.last_refill).as_secs_f64();
                state.tokens = (state.tokens + elapsed * self.rate).min(self.capacity);
                state.last_refill = now;

                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
                Duration::from_secs_f64((1.0 - state.tokens) / self.rate)
            };
            sleep(wait).await;
        }
    }

    /// Tokens currently available, for diagnostics.
    pub async fn available(&self) -> f64 {
        let state = self.state.lock().await;
        let elapsed = Instant::now().duration_since(state.last_refill).as_secs_f64();
        (state.tokens + elapsed * self.rate).min(self.capacity)
    }
}
