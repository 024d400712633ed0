/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Time-dependent control amplitudes that drive gate inputs.

use core::f64::consts::TAU;

use crate::error::{ensure_finite, ensure_positive, Error, Result};

/// An amplitude as a function of time.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ControlSignal {
    /// The same amplitude at every step.
    Constant(f64),
    /// `high` while ((t + offset) mod period)/period < duty, otherwise `low`.
    Pulse {
        /// Level during the first part of each period.
        high: f64,
        /// Level for the rest of the period.
        low: f64,
        /// Period length.
        period: f64,
        /// Fraction of the period spent high, in (0, 1].
        duty: f64,
        /// Time shift applied before taking the phase.
        offset: f64,
    },
    /// `high` while ⌊t + shift⌋ mod repeat < width, otherwise `low`.
    ///
    /// Switches on whole seconds only.
    WholeSecondPulse {
        /// Level inside the pulse.
        high: f64,
        /// Level outside the pulse.
        low: f64,
        /// Cycle length in whole seconds.
        repeat: i64,
        /// Pulse width in whole seconds.
        width: i64,
        /// Time shift applied before truncation.
        shift: f64,
    },
    /// `base` plus `high − base` while sin(2πt/period) > 0.
    SquareWave {
        /// Level in the negative half-cycle.
        base: f64,
        /// Level in the positive half-cycle.
        high: f64,
        /// Period length.
        period: f64,
    },
    /// Watch, write and lock levels for the first quarter, second quarter and
    /// second half of each period.
    WatchWriteLock {
        /// Level while the register only observes.
        watch: f64,
        /// Level while a bit is written.
        write: f64,
        /// Level while the written bit is held.
        lock: f64,
        /// Period length.
        period: f64,
    },
    /// `level` before `until`, zero afterwards.
    StepOff {
        /// Level before the cut-off.
        level: f64,
        /// Cut-off time.
        until: f64,
    },
    /// base + amplitude·sin(2π·frequency·t). May go negative.
    Sinusoid {
        /// Offset.
        base: f64,
        /// Swing.
        amplitude: f64,
        /// Frequency in cycles per unit time.
        frequency: f64,
    },
}

impl ControlSignal {
    /// Amplitude at time `t`.
    pub fn at(&self, t: f64) -> f64 {
        match *self {
            ControlSignal::Constant(level) => level,
            ControlSignal::Pulse {
                high,
                low,
                period,
                duty,
                offset,
            } => {
                if (t + offset).rem_euclid(period) / period < duty {
                    high
                } else {
                    low
                }
            }
            ControlSignal::WholeSecondPulse {
                high,
                low,
                repeat,
                width,
                shift,
            } => {
                let second = (t + shift).floor() as i64;
                if second.rem_euclid(repeat) < width {
                    high
                } else {
                    low
                }
            }
            ControlSignal::SquareWave { base, high, period } => {
                if (TAU * t / period).sin() > 0.0 {
                    high
                } else {
                    base
                }
            }
            ControlSignal::WatchWriteLock {
                watch,
                write,
                lock,
                period,
            } => {
                let phase = t.rem_euclid(period) / period;
                if phase < 0.25 {
                    watch
                } else if phase < 0.5 {
                    write
                } else {
                    lock
                }
            }
            ControlSignal::StepOff { level, until } => {
                if t < until {
                    level
                } else {
                    0.0
                }
            }
            ControlSignal::Sinusoid {
                base,
                amplitude,
                frequency,
            } => base + amplitude * (TAU * frequency * t).sin(),
        }
    }

    /// Periods must be positive and levels finite.
    pub fn validate(&self) -> Result<()> {
        match *self {
            ControlSignal::Constant(level) => ensure_finite("level", level),
            ControlSignal::Pulse {
                high,
                low,
                period,
                duty,
                offset,
            } => {
                ensure_finite("high", high)?;
                ensure_finite("low", low)?;
                ensure_positive("period", period)?;
                ensure_finite("offset", offset)?;
                if duty > 0.0 && duty <= 1.0 {
                    Ok(())
                } else {
                    Err(Error::invalid("duty", format!("must be in (0, 1], got {duty}")))
                }
            }
            ControlSignal::WholeSecondPulse {
                high,
                low,
                repeat,
                width,
                shift,
            } => {
                ensure_finite("high", high)?;
                ensure_finite("low", low)?;
                ensure_finite("shift", shift)?;
                if repeat <= 0 {
                    return Err(Error::invalid("repeat", format!("must be > 0, got {repeat}")));
                }
                if width < 0 {
                    return Err(Error::invalid("width", format!("must be >= 0, got {width}")));
                }
                Ok(())
            }
            ControlSignal::SquareWave { base, high, period } => {
                ensure_finite("base", base)?;
                ensure_finite("high", high)?;
                ensure_positive("period", period)
            }
            ControlSignal::WatchWriteLock {
                watch,
                write,
                lock,
                period,
            } => {
                ensure_finite("watch", watch)?;
                ensure_finite("write", write)?;
                ensure_finite("lock", lock)?;
                ensure_positive("period", period)
            }
            ControlSignal::StepOff { level, until } => {
                ensure_finite("level", level)?;
                ensure_finite("until", until)
            }
            ControlSignal::Sinusoid {
                base,
                amplitude,
                frequency,
            } => {
                ensure_finite("base", base)?;
                ensure_finite("amplitude", amplitude)?;
                ensure_finite("frequency", frequency)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pulse_with_offset() {
        let a = ControlSignal::Pulse {
            high: 0.75,
            low: 0.45,
            period: 80.0,
            duty: 0.5,
            offset: 0.0,
        };
        let b = ControlSignal::Pulse {
            high: 0.75,
            low: 0.45,
            period: 80.0,
            duty: 0.5,
            offset: 20.0,
        };
        assert_eq!(a.at(10.0), 0.75);
        assert_eq!(a.at(40.0), 0.45);
        assert_eq!(b.at(10.0), 0.75);
        assert_eq!(b.at(25.0), 0.45);
        assert_eq!(b.at(70.0), 0.75);
    }

    #[test]
    fn test_whole_second_pulse_truncates() {
        let s = ControlSignal::WholeSecondPulse {
            high: 0.65,
            low: 0.20,
            repeat: 80,
            width: 40,
            shift: 0.0,
        };
        assert_eq!(s.at(39.9), 0.65);
        assert_eq!(s.at(40.0), 0.20);
        assert_eq!(s.at(80.5), 0.65);
    }

    #[test]
    fn test_square_wave_is_low_at_zero_crossing() {
        let s = ControlSignal::SquareWave {
            base: 0.45,
            high: 0.72,
            period: 60.0,
        };
        assert_eq!(s.at(0.0), 0.45);
        assert_eq!(s.at(15.0), 0.72);
        assert_eq!(s.at(45.0), 0.45);
    }

    #[test]
    fn test_watch_write_lock_cycle() {
        let s = ControlSignal::WatchWriteLock {
            watch: 0.45,
            write: 0.70,
            lock: 0.85,
            period: 80.0,
        };
        assert_eq!(s.at(0.0), 0.45);
        assert_eq!(s.at(20.0), 0.70);
        assert_eq!(s.at(79.0), 0.85);
        assert_eq!(s.at(81.0), 0.45);
    }

    #[test]
    fn test_step_off() {
        let s = ControlSignal::StepOff { level: 0.65, until: 60.0 };
        assert_eq!(s.at(59.5), 0.65);
        assert_eq!(s.at(60.0), 0.0);
    }

    #[test]
    fn test_validate() {
        assert!(ControlSignal::SquareWave {
            base: 0.45,
            high: 0.72,
            period: 0.0
        }
        .validate()
        .is_err());
        assert!(ControlSignal::WholeSecondPulse {
            high: 1.0,
            low: 0.0,
            repeat: 0,
            width: 1,
            shift: 0.0
        }
        .validate()
        .is_err());
        assert!(ControlSignal::Constant(0.5).validate().is_ok());
    }
}
