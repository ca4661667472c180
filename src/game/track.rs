use log::warn;

/// Transient flag shown over a key after a judgment; clears itself after a
/// number of frames and never affects scoring.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Perform {
    #[default]
    None,
    Perfect,
    Good,
    Bad,
    Miss,
}

/// One lane. Every occupied slot holds the distance its circle has travelled
/// from the top of the track; the key sits at `height`.
#[derive(Clone, Debug)]
pub struct Track {
    pub width: f32,
    pub height: f32,
    pub position: (f32, f32),
    circles: Vec<Option<f32>>,
    perform: Perform,
    perform_count: u32,
}

impl Track {
    pub fn new(width: f32, height: f32, position: (f32, f32), capacity: usize) -> Self {
        Self {
            width,
            height,
            position,
            circles: vec![None; capacity],
            perform: Perform::None,
            perform_count: 0,
        }
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.circles.len()
    }

    pub fn circle_count(&self) -> usize {
        self.circles.iter().flatten().count()
    }

    /// Moves every circle on the track `velocity` pixels towards the key.
    pub fn update_circles(&mut self, velocity: f32) {
        for distance in self.circles.iter_mut().flatten() {
            *distance += velocity;
        }
    }

    /// Spawns a circle at the top of the track. A full track keeps its
    /// circles and drops the new one.
    pub fn add_circle(&mut self) -> bool {
        match self.circles.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(0.0);
                true
            }
            None => {
                warn!(
                    "Track at x={} is full ({} circles); dropping new circle.",
                    self.position.0,
                    self.capacity()
                );
                false
            }
        }
    }

    /// Removes the circle closest to the key and returns its distance.
    pub fn remove_circle(&mut self) -> Option<f32> {
        let front = self
            .circles
            .iter_mut()
            .filter(|slot| slot.is_some())
            .max_by(|a, b| a.unwrap_or(0.0).total_cmp(&b.unwrap_or(0.0)))?;
        front.take()
    }

    /// Distance travelled by the circle closest to the key, if any.
    pub fn get_front_circle(&self) -> Option<f32> {
        self.circles.iter().flatten().copied().reduce(f32::max)
    }

    /// Screen positions of all circles on the track.
    pub fn get_circles(&self) -> Vec<(f32, f32)> {
        self.circles
            .iter()
            .flatten()
            .map(|distance| (self.position.0, self.position.1 + distance))
            .collect()
    }

    pub fn get_key_position(&self) -> (f32, f32) {
        (self.position.0, self.position.1 + self.height)
    }

    // --- perform flag ---

    pub fn perform(&self) -> Perform {
        self.perform
    }

    pub fn set_perform(&mut self, perform: Perform) {
        self.perform = perform;
        self.perform_count = 0;
    }

    pub fn set_perfect(&mut self) {
        self.set_perform(Perform::Perfect);
    }

    pub fn set_good(&mut self) {
        self.set_perform(Perform::Good);
    }

    pub fn set_bad(&mut self) {
        self.set_perform(Perform::Bad);
    }

    pub fn set_miss(&mut self) {
        self.set_perform(Perform::Miss);
    }

    /// Ages the perform flag by one frame, clearing it once it has been up
    /// for more than `duration_count` frames.
    pub fn update_perform(&mut self, duration_count: f32) {
        if self.perform == Perform::None {
            return;
        }
        self.perform_count += 1;
        if self.perform_count as f32 > duration_count {
            self.perform = Perform::None;
            self.perform_count = 0;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::MAX_CIRCLE_NUM;

    pub(crate) fn track(height: f32) -> Track {
        Track::new(0.0, height, (0.0, 0.0), MAX_CIRCLE_NUM)
    }

    pub(crate) fn add_update_circle(track: &mut Track, velocity: f32) {
        track.add_circle();
        track.update_circles(velocity);
    }

    #[test]
    fn counts_added_circles() {
        let mut t = track(1000.0);
        add_update_circle(&mut t, 20.0);
        add_update_circle(&mut t, 50.0);
        assert_eq!(t.get_circles().len(), 2);
        assert_eq!(t.circle_count(), 2);
    }

    #[test]
    fn circle_positions_follow_distance() {
        let mut t = track(1000.0);
        add_update_circle(&mut t, 20.0);
        add_update_circle(&mut t, 50.0);
        let circles = t.get_circles();
        assert!(circles.contains(&(0.0, 70.0)));
        assert!(circles.contains(&(0.0, 50.0)));
    }

    #[test]
    fn fresh_circle_is_present_at_zero() {
        let mut t = track(1000.0);
        t.add_circle();
        assert_eq!(t.get_front_circle(), Some(0.0));
        assert_eq!(t.get_circles(), vec![(0.0, 0.0)]);
    }

    #[test]
    fn front_circle_after_repeated_updates() {
        let mut t = track(1000.0);
        t.add_circle();
        for _ in 0..7 {
            t.update_circles(12.5);
        }
        assert_eq!(t.get_front_circle(), Some(87.5));
    }

    #[test]
    fn empty_slots_do_not_drift() {
        let mut t = track(1000.0);
        t.update_circles(100.0);
        assert_eq!(t.get_front_circle(), None);
        assert!(t.get_circles().is_empty());
    }

    #[test]
    fn remove_takes_the_front_circle() {
        let mut t = track(1000.0);
        add_update_circle(&mut t, 50.0);
        add_update_circle(&mut t, 30.0);
        assert_eq!(t.remove_circle(), Some(80.0));
        assert_eq!(t.get_circles(), vec![(0.0, 30.0)]);
        assert_eq!(t.remove_circle(), Some(30.0));
        assert!(t.get_circles().is_empty());
        assert_eq!(t.remove_circle(), None);
    }

    #[test]
    fn full_track_drops_new_circle() {
        let mut t = Track::new(0.0, 1000.0, (0.0, 0.0), 2);
        add_update_circle(&mut t, 10.0);
        add_update_circle(&mut t, 10.0);
        assert!(!t.add_circle());
        assert_eq!(t.circle_count(), 2);
        assert_eq!(t.get_front_circle(), Some(20.0));
    }

    #[test]
    fn key_position_sits_at_height() {
        let t = Track::new(40.0, 900.0, (20.0, -40.0), MAX_CIRCLE_NUM);
        assert_eq!(t.get_key_position(), (20.0, 860.0));
    }

    #[test]
    fn perform_flag_clears_after_duration() {
        let mut t = track(1000.0);
        t.set_miss();
        t.update_perform(1.0);
        assert_eq!(t.perform(), Perform::Miss);
        t.update_perform(1.0);
        assert_eq!(t.perform(), Perform::None);
    }

    #[test]
    fn setting_a_flag_restarts_its_timer() {
        let mut t = track(1000.0);
        t.set_miss();
        t.update_perform(1.0);
        assert_eq!(t.perform(), Perform::Miss);
        t.set_good();
        t.update_perform(1.0);
        assert_eq!(t.perform(), Perform::Good);
        t.update_perform(1.0);
        assert_eq!(t.perform(), Perform::None);
    }

    #[test]
    fn idle_flag_stays_idle() {
        let mut t = track(1000.0);
        for _ in 0..5 {
            t.update_perform(0.0);
        }
        assert_eq!(t.perform(), Perform::None);
    }
}
