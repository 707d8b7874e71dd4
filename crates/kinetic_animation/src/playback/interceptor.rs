//! Interceptor chain around the lifecycle channel
//!
//! Interceptors run in registration order. Each one receives the event the
//! previous one produced and may pass it on, replace it, or return `None`
//! to stop it before it reaches listeners.

use super::events::LifecycleEvent;

/// A stage in the lifecycle interceptor chain
pub trait EventInterceptor: Send {
    fn intercept(&mut self, event: LifecycleEvent) -> Option<LifecycleEvent>;
}

impl<F> EventInterceptor for F
where
    F: FnMut(LifecycleEvent) -> Option<LifecycleEvent> + Send,
{
    fn intercept(&mut self, event: LifecycleEvent) -> Option<LifecycleEvent> {
        self(event)
    }
}

/// Logs every event that reaches it at `debug` level
#[derive(Clone, Debug)]
pub struct LoggingInterceptor {
    label: String,
}

impl LoggingInterceptor {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl EventInterceptor for LoggingInterceptor {
    fn intercept(&mut self, event: LifecycleEvent) -> Option<LifecycleEvent> {
        tracing::debug!("[{}] {:?}", self.label, event);
        Some(event)
    }
}

/// Drops `Update` events that arrive within `min_interval_ms` of playback
/// time of the last one let through
#[derive(Clone, Debug)]
pub struct ThrottleUpdates {
    min_interval_ms: f32,
    last_ms: Option<f32>,
}

impl ThrottleUpdates {
    pub fn new(min_interval_ms: f32) -> Self {
        Self {
            min_interval_ms,
            last_ms: None,
        }
    }
}

impl EventInterceptor for ThrottleUpdates {
    fn intercept(&mut self, event: LifecycleEvent) -> Option<LifecycleEvent> {
        match event {
            LifecycleEvent::Update { elapsed_ms, .. } => {
                if let Some(last) = self.last_ms {
                    if (elapsed_ms - last).abs() < self.min_interval_ms {
                        return None;
                    }
                }
                self.last_ms = Some(elapsed_ms);
                Some(event)
            }
            // A jump in playback time restarts the throttle window
            LifecycleEvent::Seeked { .. } | LifecycleEvent::Stopped | LifecycleEvent::Started => {
                self.last_ms = None;
                Some(event)
            }
            other => Some(other),
        }
    }
}

/// Ordered list of interceptors
#[derive(Default)]
pub struct InterceptorChain {
    interceptors: Vec<Box<dyn EventInterceptor>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<I: EventInterceptor + 'static>(&mut self, interceptor: I) {
        self.interceptors.push(Box::new(interceptor));
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Pass an event through every interceptor
    pub fn run(&mut self, event: LifecycleEvent) -> Option<LifecycleEvent> {
        self.interceptors
            .iter_mut()
            .try_fold(event, |event, interceptor| interceptor.intercept(event))
    }
}

impl std::fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("len", &self.interceptors.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_runs_in_order_and_short_circuits() {
        let mut chain = InterceptorChain::new();
        chain.push(|event: LifecycleEvent| match event {
            LifecycleEvent::Paused => Some(LifecycleEvent::Stopped),
            other => Some(other),
        });
        chain.push(|event: LifecycleEvent| match event {
            LifecycleEvent::Stopped => None,
            other => Some(other),
        });

        assert_eq!(chain.len(), 2);
        assert_eq!(chain.run(LifecycleEvent::Paused), None);
        assert_eq!(chain.run(LifecycleEvent::Started), Some(LifecycleEvent::Started));
    }

    #[test]
    fn test_throttle_updates() {
        let mut throttle = ThrottleUpdates::new(100.0);
        let update = |elapsed_ms: f32| LifecycleEvent::Update {
            progress: 0.0,
            elapsed_ms,
        };

        assert!(throttle.intercept(update(0.0)).is_some());
        assert!(throttle.intercept(update(50.0)).is_none());
        assert!(throttle.intercept(update(100.0)).is_some());
        assert!(throttle.intercept(LifecycleEvent::Completed).is_some());

        throttle.intercept(LifecycleEvent::Seeked { to_ms: 0.0 });
        assert!(throttle.intercept(update(10.0)).is_some());
    }

    #[test]
    fn test_logging_passes_through() {
        let mut logging = LoggingInterceptor::new("intro");
        assert_eq!(
            logging.intercept(LifecycleEvent::Resumed),
            Some(LifecycleEvent::Resumed)
        );
    }
}
