use std::thread;
use std::time::{Duration, Instant};

/// Game-time counter: whole seconds plus the frame within the current second.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrameTimer {
    frame_rate: f32,
    frames_per_sec: u32,
    sec: u32,
    frame: u32,
}

impl FrameTimer {
    pub fn new(frame_rate: f32) -> Self {
        FrameTimer {
            frame_rate,
            frames_per_sec: (frame_rate.round() as u32).max(1),
            sec: 0,
            frame: 1,
        }
    }

    pub fn update_time(&mut self) {
        self.frame += 1;
        if self.frame >= self.frames_per_sec {
            self.frame = 0;
            self.sec += 1;
        }
    }

    pub fn seconds(&self) -> u32 {
        self.sec
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn frame_rate(&self) -> f32 {
        self.frame_rate
    }
}

/// Sleeps out the rest of each frame so the loop runs at wall-clock speed.
#[derive(Debug)]
pub struct FramePacer {
    frame_duration: Duration,
    next_frame: Instant,
}

impl FramePacer {
    pub fn new(frame_rate: f32) -> Self {
        FramePacer {
            frame_duration: Duration::from_secs_f32(1.0 / frame_rate),
            next_frame: Instant::now(),
        }
    }

    pub fn wait(&mut self) {
        self.next_frame += self.frame_duration;
        let now = Instant::now();
        if self.next_frame > now {
            thread::sleep(self.next_frame - now);
        } else {
            // Fell behind; don't try to catch up with a burst of frames.
            self.next_frame = now;
        }
    }
}

pub struct FPSCounter {
    last_update_time: Instant,
    frames_since_last_update: u32,
}

impl FPSCounter {
    pub fn new() -> Self {
        FPSCounter {
            last_update_time: Instant::now(),
            frames_since_last_update: 0,
        }
    }

    /// Returns `Some(fps)` roughly once per second. Call once per frame.
    pub fn update(&mut self) -> Option<u32> {
        self.frames_since_last_update += 1;
        let now = Instant::now();
        if now.duration_since(self.last_update_time) < Duration::from_secs(1) {
            return None;
        }
        let fps = self.frames_since_last_update;
        self.frames_since_last_update = 0;
        self.last_update_time += Duration::from_secs(1);
        if self.last_update_time < now - Duration::from_secs(1) {
            self.last_update_time = now;
        }
        Some(fps)
    }
}

impl Default for FPSCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_roll_over_at_frame_rate() {
        let mut t = FrameTimer::new(10.0);
        // Starts on frame 1, so the first second takes nine updates.
        for _ in 0..8 {
            t.update_time();
        }
        assert_eq!((t.seconds(), t.frame()), (0, 9));
        t.update_time();
        assert_eq!((t.seconds(), t.frame()), (1, 0));
        for _ in 0..10 {
            t.update_time();
        }
        assert_eq!((t.seconds(), t.frame()), (2, 0));
    }

    #[test]
    fn fractional_rate_rounds() {
        let mut t = FrameTimer::new(0.2);
        t.update_time();
        assert_eq!(t.seconds(), 1);
    }

    #[test]
    fn counter_reports_nothing_within_a_second() {
        let mut c = FPSCounter::new();
        assert_eq!(c.update(), None);
    }
}
