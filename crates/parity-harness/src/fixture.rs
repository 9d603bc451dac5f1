use chrono::{Duration, TimeZone, Utc};
use stream_core::{Bar, Timeframe};

/// Benchmark/fixture sizing profile, read from `QUANTPULSE_PROFILE`.
/// Selects how much data the sweeps chew through; has no effect on
/// correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerfProfile {
    Short,
    Full,
}

impl PerfProfile {
    pub fn from_env() -> Self {
        match std::env::var("QUANTPULSE_PROFILE").as_deref() {
            Ok("full") | Ok("FULL") => PerfProfile::Full,
            _ => PerfProfile::Short,
        }
    }

    pub fn fixture_len(&self) -> usize {
        match self {
            PerfProfile::Short => 256,
            PerfProfile::Full => 2048,
        }
    }
}

/// Splitmix-style deterministic generator; good enough spread for fixture
/// data and reproducible across platforms.
struct FixtureRng {
    state: u64,
}

impl FixtureRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in [0, 1).
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Deterministic closed daily bars: a seeded random walk with intrabar range
/// and varying volume.
pub fn fixture_bars(len: usize) -> Vec<Bar> {
    fixture_bars_seeded(len, 0x5EED_CAFE)
}

pub fn fixture_bars_seeded(len: usize, seed: u64) -> Vec<Bar> {
    let mut rng = FixtureRng::new(seed);
    let t0 = Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap();
    let mut close = 100.0;
    let mut bars = Vec::with_capacity(len);
    for i in 0..len {
        let open = close;
        close = (close + (rng.next_f64() - 0.5) * 2.0).max(1.0);
        let high = open.max(close) + rng.next_f64();
        let low = (open.min(close) - rng.next_f64()).max(0.5);
        let volume = 1_000.0 + (rng.next_f64() * 9_000.0).floor();
        bars.push(Bar {
            symbol: "FIXTURE".to_string(),
            timeframe: Timeframe::Days(1),
            start_time: t0 + Duration::days(i as i64),
            end_time: t0 + Duration::days(i as i64 + 1),
            open,
            high,
            low,
            close,
            volume,
            is_final: true,
        });
    }
    bars
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_is_deterministic() {
        let a = fixture_bars(64);
        let b = fixture_bars(64);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.close, y.close);
            assert_eq!(x.volume, y.volume);
        }
    }

    #[test]
    fn test_fixture_bars_are_well_formed() {
        for bar in fixture_bars(128) {
            assert!(bar.low <= bar.open && bar.open <= bar.high);
            assert!(bar.low <= bar.close && bar.close <= bar.high);
            assert!(bar.start_time < bar.end_time);
            assert!(bar.is_final);
            assert!(bar.volume > 0.0);
        }
    }

    #[test]
    fn test_distinct_seeds_differ() {
        let a = fixture_bars_seeded(32, 1);
        let b = fixture_bars_seeded(32, 2);
        assert!(a.iter().zip(&b).any(|(x, y)| x.close != y.close));
    }

    #[test]
    fn test_profile_defaults_to_short() {
        // Unset in the test environment
        assert_eq!(PerfProfile::from_env(), PerfProfile::Short);
        assert!(PerfProfile::Short.fixture_len() < PerfProfile::Full.fixture_len());
    }
}
