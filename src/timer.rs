//! Performance measurement tools.

use std::{
    fmt, mem,
    sync::Mutex,
    time::{Duration, Instant},
};

/// Smoothing factor of the exponentially-weighted moving average.
const EMA_ALPHA: f32 = 0.3;

/// A timer that can measure and average the time an operation takes.
///
/// Collected timings are smoothed with an exponentially-weighted moving average and reset when
/// the timer is displayed using `{}` ([`std::fmt::Display`]).
pub struct Timer {
    name: &'static str,
    state: Mutex<State>,
}

struct State {
    /// The current average time in seconds, or `None` before the first measurement.
    avg: Option<f32>,
    /// The number of time measurements that contributed to the current `avg`.
    count: usize,
}

impl Timer {
    /// Creates a new timer.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(State {
                avg: None,
                count: 0,
            }),
        }
    }

    /// Invokes a closure, measuring and recording the time it takes.
    pub fn time<T>(&self, timee: impl FnOnce() -> T) -> T {
        let _guard = self.start();
        timee()
    }

    /// Starts timing an operation using a drop guard.
    ///
    /// When the returned [`TimerGuard`] is dropped, the time between the call to `start` and the
    /// drop is measured and recorded.
    pub fn start(&self) -> TimerGuard<'_> {
        TimerGuard {
            start: Instant::now(),
            timer: self,
        }
    }

    fn stop(&self, start: Instant) {
        let secs = start.elapsed().as_secs_f32();
        let mut state = self.state.lock().unwrap();
        state.avg = Some(match state.avg {
            Some(avg) => avg + EMA_ALPHA * (secs - avg),
            None => secs,
        });
        state.count += 1;
    }
}

/// Displays the average recorded time and resets it.
impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut state = self.state.lock().unwrap();
        let avg = state.avg.take().unwrap_or(0.0);
        let len = mem::replace(&mut state.count, 0);
        let avg_ms = avg * 1000.0;

        write!(f, "{}: {len}x{avg_ms:.01}ms", self.name)
    }
}

/// Cloning a timer resets its collected timings.
impl Clone for Timer {
    fn clone(&self) -> Self {
        Self::new(self.name)
    }
}

/// Guard returned by [`Timer::start`]. Stops timing the operation when dropped.
pub struct TimerGuard<'a> {
    start: Instant,
    timer: &'a Timer,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.timer.stop(self.start);
    }
}

/// Counts frames per second and logs them once per second.
pub struct FpsCounter {
    name: String,
    frames: u32,
    window_start: Instant,
    last_tick: Option<Instant>,
}

impl FpsCounter {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            name: name.into(),
            frames: 0,
            window_start: Instant::now(),
            last_tick: None,
        }
    }

    /// Advances the frame counter by 1 and logs FPS if one second has passed.
    ///
    /// Returns the *instantaneous* frame rate computed from the wall-clock delta to the previous
    /// `tick` call (0.0 on the first call), suitable for overlaying on the frame itself.
    pub fn tick(&mut self) -> f32 {
        self.tick_with::<&Timer, _>([])
    }

    /// Like [`FpsCounter::tick`], but includes `extra` data in the once-per-second log line.
    pub fn tick_with<D: fmt::Display, I: IntoIterator<Item = D>>(&mut self, extra: I) -> f32 {
        let now = Instant::now();
        let instantaneous = match self.last_tick {
            Some(last) => {
                let delta = now.duration_since(last).as_secs_f32();
                if delta > 0.0 {
                    1.0 / delta
                } else {
                    0.0
                }
            }
            None => 0.0,
        };
        self.last_tick = Some(now);

        self.frames += 1;
        if self.window_start.elapsed() > Duration::from_secs(1) {
            let extra = extra.into_iter().map(|e| e.to_string()).collect::<Vec<_>>();
            if extra.is_empty() {
                log::debug!("{}: {} FPS", self.name, self.frames);
            } else {
                log::debug!("{}: {} FPS ({})", self.name, self.frames, extra.join(", "));
            }

            self.frames = 0;
            self.window_start = now;
        }

        instantaneous
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_records_and_resets() {
        let timer = Timer::new("op");
        timer.time(|| std::thread::sleep(Duration::from_millis(1)));
        timer.time(|| ());

        let display = timer.to_string();
        assert!(display.starts_with("op: 2x"), "{display}");
        // Displaying drained the measurements.
        assert!(timer.to_string().starts_with("op: 0x"));
    }

    #[test]
    fn fps_counter_reports_instantaneous_rate() {
        let mut fps = FpsCounter::new("test");
        assert_eq!(fps.tick(), 0.0);
        std::thread::sleep(Duration::from_millis(5));
        assert!(fps.tick() > 0.0);
    }
}
