//! "Freshness" state drawn on by persona producers: a process-wide uptime
//! baseline plus per-render randomness.
//!
//! The baseline is fixed once at startup and only read afterwards. Jitter is
//! computed per call from the render context's own RNG, so shared state is
//! never mutated.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Vendor OUI prefixes used for fabricated TP-Link MAC addresses
pub const TPLINK_OUI_PREFIXES: &[&str] = &["14:CC:20", "50:C7:BF", "C4:6E:1F", "EC:08:6B"];

/// Fake server start instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UptimeClock {
    started_at: DateTime<Utc>,
}

impl UptimeClock {
    /// Pick a start instant 30-180 days before `now`
    pub fn new<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> Self {
        let offset_days = rng.gen_range(30..=180);
        Self {
            started_at: now - Duration::days(offset_days),
        }
    }

    pub fn starting_at(started_at: DateTime<Utc>) -> Self {
        Self { started_at }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Elapsed days with ±5 days of jitter, never below 1
    pub fn uptime_days<R: Rng + ?Sized>(&self, now: DateTime<Utc>, rng: &mut R) -> i64 {
        let base = (now - self.started_at).num_days();
        let jitter: i64 = rng.gen_range(-5..=5);
        (base + jitter).max(1)
    }
}

/// Everything a producer may draw on while rendering one artifact
pub struct RenderContext {
    pub now: DateTime<Utc>,
    pub rng: StdRng,
    uptime: UptimeClock,
}

impl RenderContext {
    /// Live context: wall clock and an entropy-seeded RNG
    pub fn new(uptime: UptimeClock) -> Self {
        Self {
            now: Utc::now(),
            rng: StdRng::from_entropy(),
            uptime,
        }
    }

    /// Deterministic context for tests and benchmarks
    pub fn frozen(uptime: UptimeClock, now: DateTime<Utc>, seed: u64) -> Self {
        Self {
            now,
            rng: StdRng::seed_from_u64(seed),
            uptime,
        }
    }

    pub fn uptime_days(&mut self) -> i64 {
        self.uptime.uptime_days(self.now, &mut self.rng)
    }

    /// Short session identifier (8 hex chars)
    pub fn session_id(&mut self) -> String {
        format!("{:08x}", self.rng.gen::<u32>())
    }

    pub fn request_id(&mut self) -> String {
        let bytes: [u8; 16] = self.rng.gen();
        format!("req_{}", hex::encode(bytes))
    }

    /// "Last update" date 2-30 days in the past, `YYYY/MM/DD`
    pub fn last_update_date(&mut self) -> String {
        let days_ago = self.rng.gen_range(2..=30);
        (self.now - Duration::days(days_ago))
            .format("%Y/%m/%d")
            .to_string()
    }

    /// security.txt `Expires` value, 180 days ahead
    pub fn security_txt_expiry(&self) -> String {
        (self.now + Duration::days(180))
            .format("%Y-%m-%dT%H:%M:%S.000Z")
            .to_string()
    }

    pub fn timestamp(&self) -> String {
        self.now.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    pub fn load_average(&mut self) -> String {
        let one: f64 = self.rng.gen_range(0.05..0.50);
        let five: f64 = self.rng.gen_range(0.10..0.60);
        let fifteen: f64 = self.rng.gen_range(0.08..0.45);
        format!("{:.2}, {:.2}, {:.2}", one, five, fifteen)
    }

    /// MAC address with a TP-Link OUI and three random octets
    pub fn tplink_mac(&mut self) -> String {
        let oui = TPLINK_OUI_PREFIXES
            .choose(&mut self.rng)
            .copied()
            .unwrap_or(TPLINK_OUI_PREFIXES[0]);
        let octets: [u8; 3] = self.rng.gen();
        format!("{}:{:02X}:{:02X}:{:02X}", oui, octets[0], octets[1], octets[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_uptime_clock_offset_range() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let clock = UptimeClock::new(fixed_now(), &mut rng);
            let days = (fixed_now() - clock.started_at()).num_days();
            assert!((30..=180).contains(&days), "offset out of range: {}", days);
        }
    }

    #[test]
    fn test_uptime_jitter_bounds() {
        let clock = UptimeClock::starting_at(fixed_now() - Duration::days(100));
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let days = clock.uptime_days(fixed_now(), &mut rng);
            assert!((95..=105).contains(&days));
        }
    }

    #[test]
    fn test_uptime_never_below_one() {
        let clock = UptimeClock::starting_at(fixed_now());
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            assert!(clock.uptime_days(fixed_now(), &mut rng) >= 1);
        }
    }

    #[test]
    fn test_uptime_does_not_mutate_baseline() {
        let clock = UptimeClock::starting_at(fixed_now() - Duration::days(60));
        let mut ctx = RenderContext::frozen(clock, fixed_now(), 11);
        for _ in 0..10 {
            ctx.uptime_days();
        }
        assert_eq!(clock.started_at(), fixed_now() - Duration::days(60));
    }

    #[test]
    fn test_frozen_context_is_deterministic() {
        let clock = UptimeClock::starting_at(fixed_now() - Duration::days(42));
        let mut a = RenderContext::frozen(clock, fixed_now(), 99);
        let mut b = RenderContext::frozen(clock, fixed_now(), 99);
        assert_eq!(a.session_id(), b.session_id());
        assert_eq!(a.tplink_mac(), b.tplink_mac());
        assert_eq!(a.uptime_days(), b.uptime_days());
    }

    #[test]
    fn test_tplink_mac_format() {
        let clock = UptimeClock::starting_at(fixed_now());
        let mut ctx = RenderContext::frozen(clock, fixed_now(), 5);
        for _ in 0..20 {
            let mac = ctx.tplink_mac();
            assert_eq!(mac.len(), 17);
            assert!(TPLINK_OUI_PREFIXES.iter().any(|oui| mac.starts_with(oui)));
            assert_eq!(mac, mac.to_uppercase());
        }
    }

    #[test]
    fn test_identifier_formats() {
        let clock = UptimeClock::starting_at(fixed_now());
        let mut ctx = RenderContext::frozen(clock, fixed_now(), 5);
        assert_eq!(ctx.session_id().len(), 8);
        let request_id = ctx.request_id();
        assert!(request_id.starts_with("req_"));
        assert_eq!(request_id.len(), 36);
        assert_eq!(ctx.security_txt_expiry(), "2024-11-28T12:00:00.000Z");
        assert_eq!(ctx.timestamp(), "2024-06-01 12:00:00");
    }
}
