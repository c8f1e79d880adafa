use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

/// Fixed one-second window shared across the whole surface. Coarse on
/// purpose: the staff and student surfaces each get their own limiter so
/// a polling storm from students cannot starve the control surface.
#[derive(Debug)]
struct Window {
    start: Instant,
    count: u32,
}

#[derive(Clone, Debug)]
pub struct SurfaceLimiter {
    surface: &'static str,
    rps: u32,
    window: Arc<Mutex<Window>>,
}

impl SurfaceLimiter {
    pub fn new(surface: &'static str, rps: u32) -> Self {
        Self {
            surface,
            rps: rps.max(1),
            window: Arc::new(Mutex::new(Window {
                start: Instant::now(),
                count: 0,
            })),
        }
    }

    fn allow(&self) -> bool {
        let mut guard = self.window.lock().expect("rate limiter mutex poisoned");
        let now = Instant::now();
        if now.duration_since(guard.start) >= Duration::from_secs(1) {
            guard.start = now;
            guard.count = 0;
        }
        if guard.count < self.rps {
            guard.count += 1;
            true
        } else {
            false
        }
    }
}

pub async fn rps_middleware(
    State(limiter): State<SurfaceLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !limiter.allow() {
        tracing::warn!(surface = limiter.surface, "Rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"error": "rate_limit_exceeded"})),
        )
            .into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_rps_within_window() {
        let limiter = SurfaceLimiter::new("test", 3);
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(!limiter.allow());
    }

    #[test]
    fn zero_rps_clamps_to_one() {
        let limiter = SurfaceLimiter::new("test", 0);
        assert!(limiter.allow());
        assert!(!limiter.allow());
    }
}
