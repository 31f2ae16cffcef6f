use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

pub const MIN_INTERVAL_MINUTES: u32 = 1;

/// Interval for an operator-chosen minute count; zero falls back to the default.
pub fn interval_from_minutes(minutes: u32) -> Duration {
    let minutes = if minutes < MIN_INTERVAL_MINUTES {
        crate::config::DEFAULT_AUTO_SCAN_MINUTES
    } else {
        minutes
    };
    Duration::from_secs(u64::from(minutes) * 60)
}

/// Background thread that calls `on_tick` every interval until stopped or dropped.
pub struct AutoScanTimer {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl AutoScanTimer {
    pub fn start<F>(interval: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (stop, stopped) = mpsc::channel::<()>();
        let handle = std::thread::spawn(move || loop {
            match stopped.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => on_tick(),
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });
        log::info!("auto-scan timer started interval_secs={}", interval.as_secs());

        Self {
            stop: Some(stop),
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            log::info!("auto-scan timer stopped");
        }
    }
}

impl Drop for AutoScanTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::{interval_from_minutes, AutoScanTimer};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn zero_minutes_falls_back_to_default_interval() {
        assert_eq!(interval_from_minutes(0), Duration::from_secs(300));
        assert_eq!(interval_from_minutes(2), Duration::from_secs(120));
    }

    #[test]
    fn ticks_until_stopped() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let mut timer = AutoScanTimer::start(Duration::from_millis(20), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        std::thread::sleep(Duration::from_millis(150));
        timer.stop();
        let after_stop = ticks.load(Ordering::SeqCst);
        assert!(after_stop >= 2, "expected several ticks, got {after_stop}");
        assert!(!timer.is_running());

        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(ticks.load(Ordering::SeqCst), after_stop);
    }
}
