//! Radial arc groups: per-arc state, the value delay line, and shared rotation.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use crate::color::Hsb;
use crate::config::{ArcGroupConfig, SpinConfig};

/// Linear map of `value` from `[start1, stop1]` to `[start2, stop2]`, unclamped.
pub fn map_range(value: f32, start1: f32, stop1: f32, start2: f32, stop2: f32) -> f32 {
    start2 + (stop2 - start2) * ((value - start1) / (stop1 - start1))
}

/// Rotation speed shared by every arc, plus the angle the title follows.
#[derive(Clone, Debug)]
pub struct Spin {
    speed: f32,
    increment: f32,
    max_speed: f32,
    title_angle: f32,
}

impl Spin {
    pub fn new(config: &SpinConfig) -> Self {
        Self {
            speed: 0.0,
            increment: config.increment,
            max_speed: config.max_speed,
            title_angle: 0.0,
        }
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn title_angle(&self) -> f32 {
        self.title_angle
    }

    /// Accelerate while playing, decelerate while paused. Called once per arc update.
    fn step(&mut self, playing: bool) -> f32 {
        if playing && self.speed <= self.max_speed {
            self.speed += self.increment;
        } else if !playing && self.speed > 0.0 {
            self.speed -= self.increment;
        }
        self.speed
    }
}

/// One arc stroke in canvas coordinates around the canvas center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArcStroke {
    pub diameter: f32,
    /// Radians, clockwise from +x (y grows downward).
    pub start: f32,
    pub end: f32,
    pub width: f32,
    pub color: [u8; 4],
}

#[derive(Clone, Debug)]
pub struct RadialArc {
    diameter: f32,
    value: f32,
    baseline: f32,
    start: f32,
    end: f32,
    max_stroke: f32,
    min_hue: f32,
    max_hue: f32,
}

impl RadialArc {
    fn new(id: usize, count: usize, min_diameter: f32, max_diameter: f32, group: &ArcGroupConfig) -> Self {
        let step = (max_diameter - min_diameter) / count as f32;
        Self {
            diameter: min_diameter + step * (id + 1) as f32,
            value: 0.0,
            baseline: group.baseline,
            start: group.baseline,
            end: group.baseline,
            max_stroke: group.max_stroke,
            min_hue: group.min_hue,
            max_hue: group.max_hue,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn diameter(&self) -> f32 {
        self.diameter
    }

    pub fn baseline(&self) -> f32 {
        self.baseline
    }

    /// Spin the baseline and recompute the swept angles from the current value.
    fn advance(&mut self, spin: &mut Spin, playing: bool) {
        self.baseline += spin.step(playing);
        spin.title_angle = self.baseline + FRAC_PI_2;

        let half_sweep = FRAC_PI_4 * self.value;
        self.start = self.baseline - half_sweep;
        self.end = self.baseline + half_sweep;
    }

    pub fn color(&self) -> Hsb {
        let v = self.value;
        Hsb::new(
            map_range(v, 0.0, 1.0, self.min_hue, self.max_hue),
            map_range(v, 0.0, 1.0, 50.0, 70.0),
            map_range(v, 0.0, 1.0, 80.0, 100.0),
        )
    }

    pub fn stroke_width(&self) -> f32 {
        map_range(self.value, 0.0, 1.0, 0.0, self.max_stroke)
    }

    /// The arc and its mirror half a turn away.
    pub fn strokes(&self) -> [ArcStroke; 2] {
        let stroke = ArcStroke {
            diameter: self.diameter,
            start: self.start,
            end: self.end,
            width: self.stroke_width(),
            color: self.color().to_rgba8(),
        };
        let mirrored = ArcStroke {
            start: self.start - PI,
            end: self.end - PI,
            ..stroke
        };
        [stroke, mirrored]
    }
}

/// Concentric arcs fed by one band; values travel outward one arc per update.
#[derive(Clone, Debug)]
pub struct RadialArcs {
    name: String,
    arcs: Vec<RadialArc>,
}

impl RadialArcs {
    pub fn new(group: &ArcGroupConfig, canvas_width: u32, canvas_height: u32) -> Self {
        let min_diameter = canvas_height as f32 * group.min_diameter_height_ratio;
        let max_diameter = canvas_width as f32 * group.max_diameter_width_ratio;
        let arcs = (0..group.arc_count)
            .map(|id| RadialArc::new(id, group.arc_count, min_diameter, max_diameter, group))
            .collect();
        Self {
            name: group.name.clone(),
            arcs,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arcs(&self) -> &[RadialArc] {
        &self.arcs
    }

    /// Shift every value one arc outward and put `value` into the innermost arc.
    pub fn update(&mut self, value: f32) {
        for i in (0..self.arcs.len()).rev() {
            self.arcs[i].value = if i > 0 { self.arcs[i - 1].value } else { value };
        }
    }

    /// Advance each arc's rotation and collect its strokes.
    pub fn advance(&mut self, spin: &mut Spin, playing: bool, out: &mut Vec<ArcStroke>) {
        for arc in &mut self.arcs {
            arc.advance(spin, playing);
            out.extend(arc.strokes());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    use super::{RadialArcs, Spin, map_range};
    use crate::config::{ArcGroupConfig, SpinConfig};

    fn group(count: usize) -> ArcGroupConfig {
        ArcGroupConfig {
            arc_count: count,
            ..ArcGroupConfig::bass()
        }
    }

    #[test]
    fn map_range_energy_scales() {
        assert_eq!(map_range(0.0, 0.0, 255.0, 0.0, 1.2), 0.0);
        assert!((map_range(255.0, 0.0, 255.0, 0.0, 1.2) - 1.2).abs() < 1e-6);
        assert!((map_range(255.0, 0.0, 255.0, 0.0, 7.0) - 7.0).abs() < 1e-6);
        assert!((map_range(127.5, 0.0, 255.0, 0.0, 7.0) - 3.5).abs() < 1e-6);
    }

    #[test]
    fn map_range_does_not_clamp() {
        assert!((map_range(2.0, 0.0, 1.0, 200.0, 275.0) - 350.0).abs() < 1e-4);
        assert!((map_range(-1.0, 0.0, 1.0, 0.0, 5.0) + 5.0).abs() < 1e-6);
    }

    #[test]
    fn update_shifts_values_outward() {
        let mut arcs = RadialArcs::new(&group(4), 800, 400);
        arcs.update(0.1);
        arcs.update(0.2);
        arcs.update(0.3);
        let values: Vec<f32> = arcs.arcs().iter().map(|a| a.value()).collect();
        assert_eq!(values, vec![0.3, 0.2, 0.1, 0.0]);

        arcs.update(0.4);
        arcs.update(0.5);
        let values: Vec<f32> = arcs.arcs().iter().map(|a| a.value()).collect();
        assert_eq!(values, vec![0.5, 0.4, 0.3, 0.2]);
    }

    #[test]
    fn diameters_increase_up_to_max() {
        let arcs = RadialArcs::new(&group(60), 800, 400);
        assert_eq!(arcs.name(), "bass");
        let d: Vec<f32> = arcs.arcs().iter().map(|a| a.diameter()).collect();
        assert!(d.windows(2).all(|w| w[1] > w[0]));
        // min = 400/4 = 100, max = 800*1.5 = 1200, step = 1100/60
        assert!((d[0] - (100.0 + 1100.0 / 60.0)).abs() < 1e-3);
        assert!((d[59] - 1200.0).abs() < 1e-3);
    }

    #[test]
    fn strokes_follow_value() {
        let mut arcs = RadialArcs::new(&group(1), 800, 400);
        arcs.update(1.0);
        let mut spin = Spin::new(&SpinConfig {
            increment: 0.0,
            max_speed: 0.0,
        });
        let mut out = Vec::new();
        arcs.advance(&mut spin, false, &mut out);

        assert_eq!(out.len(), 2);
        let [a, b] = [out[0], out[1]];
        assert!((a.start + FRAC_PI_4).abs() < 1e-6);
        assert!((a.end - FRAC_PI_4).abs() < 1e-6);
        assert!((b.start - (a.start - PI)).abs() < 1e-6);
        assert!((a.width - 3.0).abs() < 1e-6);
        assert_eq!(a.color, b.color);
        assert!((spin.title_angle() - FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn zero_value_has_no_sweep_or_width() {
        let mut arcs = RadialArcs::new(&group(3), 800, 400);
        let mut spin = Spin::new(&SpinConfig::default());
        let mut out = Vec::new();
        arcs.advance(&mut spin, true, &mut out);
        assert_eq!(out.len(), 6);
        for s in &out {
            assert_eq!(s.start, s.end);
            assert_eq!(s.width, 0.0);
        }
    }

    #[test]
    fn spin_accelerates_per_arc_while_playing() {
        let config = SpinConfig::default();
        let mut arcs = RadialArcs::new(&group(10), 800, 400);
        let mut spin = Spin::new(&config);
        let mut out = Vec::new();
        arcs.advance(&mut spin, true, &mut out);
        assert!((spin.speed() - 10.0 * config.increment).abs() < 1e-9);
        // Each arc picked up the speed at its own update.
        let first = arcs.arcs()[0].baseline();
        let last = arcs.arcs()[9].baseline();
        assert!(last > first);
        assert!((spin.title_angle() - (last + FRAC_PI_2)).abs() < 1e-6);
    }

    #[test]
    fn spin_caps_and_decays() {
        let config = SpinConfig {
            increment: 0.01,
            max_speed: 0.05,
        };
        let mut arcs = RadialArcs::new(&group(1), 800, 400);
        let mut spin = Spin::new(&config);
        let mut out = Vec::new();
        for _ in 0..100 {
            arcs.advance(&mut spin, true, &mut out);
        }
        assert!(spin.speed() <= 0.05 + 0.01 + 1e-6);
        assert!(spin.speed() > 0.05);

        for _ in 0..100 {
            arcs.advance(&mut spin, false, &mut out);
        }
        assert!(spin.speed() <= 0.0);
        assert!(spin.speed() > -0.01 - 1e-6);
    }
}
