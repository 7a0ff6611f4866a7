// Beat position to elapsed time under a linearly ramping tempo.
//
// Tempo moves linearly in BPM from `start_tempo` at beat 0 to `end_tempo` at
// beat `total`. Elapsed seconds at beat `p` is the integral of 60 / v(x) over
// [0, p]:
//
//   v(p)       = v0 + (v1 - v0) * p / T
//   seconds(p) = 60 * T / (v1 - v0) * ln(v(p) / v0)     when v1 != v0
//   seconds(p) = 60 * p / v0                             when v1 == v0
//
// Each segment ends at the tempo the next one starts from, so chaining
// segments by duration leaves no tempo step at the seam.

use crate::error::CraftError;

/// Below this BPM difference the ramp is treated as constant tempo.
const FLAT_TEMPO_EPSILON: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeComputer {
    total: f64,
    start_tempo: f64,
    end_tempo: f64,
}

impl TimeComputer {
    pub fn new(total: f64, start_tempo: f64, end_tempo: f64) -> Result<Self, CraftError> {
        for tempo in [start_tempo, end_tempo] {
            if !(tempo.is_finite() && tempo > 0.0) {
                return Err(CraftError::invalid(format!("tempo {tempo} is not a positive BPM")));
            }
        }
        if !(total.is_finite() && total > 0.0) {
            return Err(CraftError::invalid(format!("segment length {total} beats")));
        }
        Ok(Self {
            total,
            start_tempo,
            end_tempo,
        })
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn tempo_at_position(&self, position: f64) -> f64 {
        self.start_tempo + (self.end_tempo - self.start_tempo) * position / self.total
    }

    pub fn seconds_at_position(&self, position: f64) -> f64 {
        let slope = self.end_tempo - self.start_tempo;
        if slope.abs() < FLAT_TEMPO_EPSILON {
            return 60.0 * position / self.start_tempo;
        }
        let growth = slope * position / (self.total * self.start_tempo);
        60.0 * self.total / slope * growth.ln_1p()
    }

    pub fn micros_at_position(&self, position: f64) -> u64 {
        (self.seconds_at_position(position) * 1_000_000.0).round().max(0.0) as u64
    }

    /// Duration of the whole segment in microseconds.
    pub fn duration_micros(&self) -> u64 {
        self.micros_at_position(self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_position_is_zero_seconds() {
        let tc = TimeComputer::new(16.0, 120.0, 140.0).unwrap();
        assert_eq!(tc.seconds_at_position(0.0), 0.0);
    }

    #[test]
    fn constant_tempo_is_linear() {
        let tc = TimeComputer::new(16.0, 120.0, 120.0).unwrap();
        assert!((tc.seconds_at_position(16.0) - 8.0).abs() < 1e-9);
        assert_eq!(tc.duration_micros(), 8_000_000);
    }

    #[test]
    fn ramp_matches_closed_form() {
        let tc = TimeComputer::new(32.0, 100.0, 140.0).unwrap();
        let expected = 60.0 * 32.0 / 40.0 * (140.0f64 / 100.0).ln();
        assert!((tc.seconds_at_position(32.0) - expected).abs() < 1e-9);
    }

    #[test]
    fn ramp_lies_between_its_constant_bounds() {
        let tc = TimeComputer::new(16.0, 100.0, 200.0).unwrap();
        let seconds = tc.seconds_at_position(16.0);
        assert!(seconds < 60.0 * 16.0 / 100.0);
        assert!(seconds > 60.0 * 16.0 / 200.0);
    }

    #[test]
    fn chained_segments_meet_at_the_seam() {
        let first = TimeComputer::new(16.0, 100.0, 120.0).unwrap();
        let second = TimeComputer::new(16.0, first.tempo_at_position(16.0), 90.0).unwrap();
        assert_eq!(first.tempo_at_position(first.total()), second.tempo_at_position(0.0));
        assert_eq!(second.seconds_at_position(0.0), 0.0);
    }

    #[test]
    fn non_positive_tempo_is_invalid() {
        assert!(matches!(
            TimeComputer::new(16.0, 0.0, 120.0),
            Err(CraftError::InvalidContent { .. })
        ));
        assert!(TimeComputer::new(16.0, 120.0, f64::NAN).is_err());
        assert!(TimeComputer::new(-1.0, 120.0, 120.0).is_err());
    }

    #[test]
    fn zero_beat_segment_is_invalid() {
        assert!(matches!(
            TimeComputer::new(0.0, 120.0, 120.0),
            Err(CraftError::InvalidContent { .. })
        ));
    }

    proptest! {
        #[test]
        fn seconds_strictly_increase(
            total in 1.0f64..512.0,
            v0 in 20.0f64..300.0,
            v1 in 20.0f64..300.0,
            a in 0.0f64..1.0,
            b in 0.0f64..1.0,
        ) {
            let tc = TimeComputer::new(total, v0, v1).unwrap();
            let (lo, hi) = if a < b { (a, b) } else { (b, a) };
            prop_assume!(hi - lo > 1e-4);
            prop_assert!(tc.seconds_at_position(hi * total) > tc.seconds_at_position(lo * total));
            prop_assert!(tc.seconds_at_position(hi * total) > 0.0);
        }
    }
}
