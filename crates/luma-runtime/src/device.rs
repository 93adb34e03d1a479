//! In-memory LED strip device.

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use luma_eval::{Device, DeviceError, PinMode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Led {
    level: u8,
    mode: PinMode,
}

impl Default for Led {
    fn default() -> Self {
        Self {
            level: 0,
            mode: PinMode::Output,
        }
    }
}

/// Summary of the strip at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StripStats {
    pub pins: usize,
    /// Pins with a level above 0.
    pub lit: usize,
    /// Mean level as a rounded percentage of full brightness.
    pub average_brightness: u32,
}

impl fmt::Display for StripStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} lit, average brightness {}%",
            self.lit, self.pins, self.average_brightness
        )
    }
}

/// A strip of `pin_count` single-channel LEDs, all OUTPUT and off.
pub struct LedStrip {
    leds: Mutex<Vec<Led>>,
    epoch: Mutex<Instant>,
    rng: Mutex<StdRng>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl LedStrip {
    pub fn new(pin_count: usize) -> Self {
        Self::with_rng(pin_count, StdRng::from_os_rng())
    }

    /// A strip whose `random` sequence is reproducible.
    pub fn seeded(pin_count: usize, seed: u64) -> Self {
        Self::with_rng(pin_count, StdRng::seed_from_u64(seed))
    }

    fn with_rng(pin_count: usize, rng: StdRng) -> Self {
        Self {
            leds: Mutex::new(vec![Led::default(); pin_count]),
            epoch: Mutex::new(Instant::now()),
            rng: Mutex::new(rng),
        }
    }

    pub fn levels(&self) -> Vec<u8> {
        lock(&self.leds).iter().map(|led| led.level).collect()
    }

    pub fn modes(&self) -> Vec<PinMode> {
        lock(&self.leds).iter().map(|led| led.mode).collect()
    }

    pub fn stats(&self) -> StripStats {
        let leds = lock(&self.leds);
        let total: u64 = leds.iter().map(|led| u64::from(led.level)).sum();
        let full = leds.len().max(1) as f64 * 255.0;
        StripStats {
            pins: leds.len(),
            lit: leds.iter().filter(|led| led.level > 0).count(),
            average_brightness: (total as f64 / full * 100.0).round() as u32,
        }
    }

    /// Turn every LED off without touching modes.
    pub fn clear(&self) {
        for led in lock(&self.leds).iter_mut() {
            led.level = 0;
        }
    }

    fn with_led<R>(&self, pin: usize, f: impl FnOnce(&mut Led) -> Result<R, DeviceError>) -> Result<R, DeviceError> {
        let mut leds = lock(&self.leds);
        let count = leds.len();
        match leds.get_mut(pin) {
            Some(led) => f(led),
            None => Err(DeviceError::pin_range(pin, count)),
        }
    }

    fn write(&self, pin: usize, level: u8) -> Result<(), DeviceError> {
        self.with_led(pin, |led| {
            if led.mode != PinMode::Output {
                return Err(DeviceError::NotOutput { pin });
            }
            led.level = level;
            Ok(())
        })
    }
}

impl fmt::Debug for LedStrip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedStrip")
            .field("levels", &self.levels())
            .finish()
    }
}

impl Device for LedStrip {
    fn pin_count(&self) -> usize {
        lock(&self.leds).len()
    }

    fn configure_pin(&self, pin: usize, mode: PinMode) -> Result<(), DeviceError> {
        self.with_led(pin, |led| {
            led.mode = mode;
            Ok(())
        })
    }

    fn write_digital(&self, pin: usize, high: bool) -> Result<(), DeviceError> {
        self.write(pin, if high { u8::MAX } else { 0 })
    }

    fn write_pwm(&self, pin: usize, level: u8) -> Result<(), DeviceError> {
        self.write(pin, level)
    }

    fn read_state(&self, pin: usize) -> Result<u8, DeviceError> {
        self.with_led(pin, |led| Ok(led.level))
    }

    fn toggle(&self, pin: usize) -> Result<(), DeviceError> {
        self.with_led(pin, |led| {
            led.level = if led.level > 0 { 0 } else { u8::MAX };
            Ok(())
        })
    }

    fn set_all(&self, level: u8) {
        for led in lock(&self.leds).iter_mut() {
            led.level = level;
        }
    }

    fn shift_left(&self) {
        let mut leds = lock(&self.leds);
        let levels: Vec<u8> = leds.iter().map(|led| led.level).collect();
        for (i, led) in leds.iter_mut().enumerate() {
            led.level = levels.get(i + 1).copied().unwrap_or(0);
        }
    }

    fn shift_right(&self) {
        let mut leds = lock(&self.leds);
        let levels: Vec<u8> = leds.iter().map(|led| led.level).collect();
        for (i, led) in leds.iter_mut().enumerate() {
            led.level = i.checked_sub(1).map_or(0, |prev| levels[prev]);
        }
    }

    fn elapsed_millis(&self) -> u64 {
        lock(&self.epoch).elapsed().as_millis() as u64
    }

    fn random_int(&self, min: i64, max: i64) -> i64 {
        if min >= max {
            return min;
        }
        lock(&self.rng).random_range(min..max)
    }

    fn reset_clock(&self) {
        *lock(&self.epoch) = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_dark_and_output() {
        let strip = LedStrip::new(3);
        assert_eq!(strip.levels(), vec![0, 0, 0]);
        assert!(strip.modes().iter().all(|m| *m == PinMode::Output));
    }

    #[test]
    fn test_out_of_range_pin() {
        let strip = LedStrip::new(2);
        assert_eq!(
            strip.write_digital(2, true),
            Err(DeviceError::pin_range(2, 2))
        );
    }

    #[test]
    fn test_input_pin_rejects_writes_but_toggles() {
        let strip = LedStrip::new(1);
        strip.configure_pin(0, PinMode::Input).unwrap();
        assert_eq!(strip.write_pwm(0, 9), Err(DeviceError::NotOutput { pin: 0 }));
        strip.toggle(0).unwrap();
        assert_eq!(strip.read_state(0), Ok(255));
    }

    #[test]
    fn test_shift_left_and_right() {
        let strip = LedStrip::new(4);
        strip.write_pwm(0, 10).unwrap();
        strip.write_pwm(3, 40).unwrap();
        strip.shift_right();
        assert_eq!(strip.levels(), vec![0, 10, 0, 0]);
        strip.shift_left();
        strip.shift_left();
        assert_eq!(strip.levels(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_stats() {
        let strip = LedStrip::new(4);
        strip.write_digital(0, true).unwrap();
        strip.write_pwm(1, 255).unwrap();
        let stats = strip.stats();
        assert_eq!(stats.lit, 2);
        assert_eq!(stats.average_brightness, 50);
        assert_eq!(stats.to_string(), "2/4 lit, average brightness 50%");
    }

    #[test]
    fn test_seeded_random_is_reproducible_and_in_range() {
        let a = LedStrip::seeded(1, 7);
        let b = LedStrip::seeded(1, 7);
        for _ in 0..100 {
            let n = a.random_int(3, 9);
            assert_eq!(n, b.random_int(3, 9));
            assert!((3..9).contains(&n));
        }
        assert_eq!(a.random_int(5, 5), 5);
    }
}
