use std::collections::VecDeque;

use eframe::egui::Context;

use super::super::ViewModel;

const SAMPLE_WINDOW: usize = 180;

/// Rolling window of per-frame rates.
#[derive(Default)]
pub(in crate::app) struct FrameRate {
    samples: VecDeque<f32>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct FrameStats {
    pub(in crate::app) current: f32,
    pub(in crate::app) average: f32,
    pub(in crate::app) low: f32,
    pub(in crate::app) high: f32,
}

impl FrameStats {
    pub(in crate::app) fn frame_ms(&self) -> f32 {
        1000.0 / self.current.max(f32::EPSILON)
    }
}

impl FrameRate {
    pub(in crate::app) fn record(&mut self, dt: f32) {
        if dt <= f32::EPSILON {
            return;
        }
        self.samples.push_back((1.0 / dt).min(1000.0));
        while self.samples.len() > SAMPLE_WINDOW {
            self.samples.pop_front();
        }
    }

    pub(in crate::app) fn stats(&self) -> Option<FrameStats> {
        let current = *self.samples.back()?;
        let (low, high, sum) = self.samples.iter().fold(
            (f32::INFINITY, 0.0_f32, 0.0_f32),
            |(low, high, sum), sample| (low.min(*sample), high.max(*sample), sum + sample),
        );
        Some(FrameStats {
            current,
            average: sum / self.samples.len() as f32,
            low,
            high,
        })
    }
}

impl ViewModel {
    pub(in crate::app) fn update_fps_counter(&mut self, ctx: &Context) {
        let dt = ctx.input(|input| input.stable_dt);
        self.frame_rate.record(dt);
    }

    pub(in crate::app) fn fps_display_text(&self) -> Option<String> {
        if !self.show_fps_bar {
            return None;
        }
        self.frame_rate
            .stats()
            .map(|stats| format!("{:.0} fps  {:.1} ms", stats.current, stats.frame_ms()))
    }

    pub(in crate::app) fn drawn_primitives_text(&self) -> Option<String> {
        let cached = self.engine.cache().len();
        (cached > 0).then(|| format!("drawn: {} / {} cached", self.drawn_primitive_count, cached))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window_has_no_stats() {
        let mut rate = FrameRate::default();
        rate.record(0.0);
        assert!(rate.stats().is_none());
    }

    #[test]
    fn stats_track_the_window() {
        let mut rate = FrameRate::default();
        for dt in [0.02, 0.01, 0.04] {
            rate.record(dt);
        }

        let stats = rate.stats().expect("three samples");
        assert!((stats.current - 25.0).abs() < 1e-3);
        assert!((stats.low - 25.0).abs() < 1e-3);
        assert!((stats.high - 100.0).abs() < 1e-3);
        assert!((stats.average - 58.333).abs() < 1e-2);
        assert!((stats.frame_ms() - 40.0).abs() < 1e-2);
    }

    #[test]
    fn window_drops_oldest_samples() {
        let mut rate = FrameRate::default();
        rate.record(0.001);
        for _ in 0..SAMPLE_WINDOW {
            rate.record(0.02);
        }

        let stats = rate.stats().expect("full window");
        assert!((stats.high - 50.0).abs() < 1e-3);
    }
}
