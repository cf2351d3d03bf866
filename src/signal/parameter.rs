use simplelog::warn;
use thiserror::Error;

/// Microseconds in one second. Chirp periods are stored in seconds and the timestamps
/// fed to the generators are in microseconds.
pub const MICROS_PER_SECOND: u64 = 1_000_000;

/// Default start and stop angular frequency of the chirp, in rad/s.
pub const DEFAULT_ANGULAR_FREQUENCY: f64 = 1.0;

/// Default chirp period in seconds, kept exactly as the hardware firmware wrote it.
///
/// `^` is a bitwise XOR, not a power, so this is `-1 + 13 = 12` rather than `32767`.
pub const DEFAULT_CHIRP_PERIOD: i32 = -1 + (2 ^ 15);

#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum ParameterError {
    #[error("Chirp period must be positive, got {0} s")]
    NonPositivePeriod(i32),
    #[error("Chirp frequencies must be positive, got {start} rad/s -> {stop} rad/s")]
    NonPositiveFrequency { start: f64, stop: f64 },
    #[error("Chirp start and stop frequencies are both {0} rad/s, the sweep is flat")]
    FlatSweep(f64),
    #[error("Sine frequency must be finite, got {0} Hz")]
    NonFiniteFrequency(f64),
}

/// Parameters of the sinusoid. All three fields are always replaced together.
///
/// The amplitude and the offset are expressed in whatever unit the consumer of the
/// signal uses (pot counts, for instance). The frequency is in Hz.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct SineParameters {
    amplitude: i32,
    offset: i32,
    frequency: f64,
}

impl SineParameters {
    pub fn new(amplitude: i32, frequency: f64, offset: i32) -> Self {
        Self {
            amplitude,
            offset,
            frequency,
        }
    }

    pub fn get_amplitude(&self) -> i32 {
        self.amplitude
    }

    pub fn get_offset(&self) -> i32 {
        self.offset
    }

    pub fn get_frequency(&self) -> f64 {
        self.frequency
    }

    /// Checks the frequency is a real number. Zero and negative frequencies are fine.
    pub fn validate(&self) -> Result<(), ParameterError> {
        if !self.frequency.is_finite() {
            return Err(ParameterError::NonFiniteFrequency(self.frequency));
        }

        Ok(())
    }
}

/// Parameters of the logarithmic chirp.
///
/// The sweep rate `alpha` is derived from the period and both angular frequencies. It is
/// computed on construction and there is no way to set it on its own, so it can never go
/// out of sync with the rest of the fields.
///
/// # Degenerate values
/// Nothing here rejects a zero period, equal frequencies or non-positive frequencies. They
/// produce a zero, infinite or NaN `alpha` and, from there, meaningless output. Use
/// [validate](fn@ChirpParameters::validate) when that is not acceptable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChirpParameters {
    amplitude: i32,
    start_angular_freq: f64,
    stop_angular_freq: f64,
    period: i32,
    alpha: f64,
    offset: i32,
}

impl Default for ChirpParameters {
    fn default() -> Self {
        Self::new(
            0,
            DEFAULT_ANGULAR_FREQUENCY,
            DEFAULT_ANGULAR_FREQUENCY,
            DEFAULT_CHIRP_PERIOD,
            0,
        )
    }
}

impl ChirpParameters {
    pub fn new(
        amplitude: i32,
        start_angular_freq: f64,
        stop_angular_freq: f64,
        period: i32,
        offset: i32,
    ) -> Self {
        Self {
            amplitude,
            start_angular_freq,
            stop_angular_freq,
            period,
            alpha: sweep_rate(period, start_angular_freq, stop_angular_freq),
            offset,
        }
    }

    pub fn get_amplitude(&self) -> i32 {
        self.amplitude
    }

    pub fn get_start_freq(&self) -> f64 {
        self.start_angular_freq
    }

    pub fn get_stop_freq(&self) -> f64 {
        self.stop_angular_freq
    }

    pub fn get_period(&self) -> i32 {
        self.period
    }

    pub fn get_alpha(&self) -> f64 {
        self.alpha
    }

    pub fn get_offset(&self) -> i32 {
        self.offset
    }

    /// Length of one sweep in microseconds, `None` when the period is not positive.
    pub fn period_micros(&self) -> Option<u64> {
        match u64::try_from(self.period) {
            Ok(seconds) if seconds > 0 => Some(seconds * MICROS_PER_SECOND),
            _ => None,
        }
    }

    /// Checks the values give a finite, non-zero sweep rate.
    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.period <= 0 {
            return Err(ParameterError::NonPositivePeriod(self.period));
        }

        // NaN fails both comparisons, hence the negation
        if !(self.start_angular_freq > 0.0 && self.stop_angular_freq > 0.0) {
            return Err(ParameterError::NonPositiveFrequency {
                start: self.start_angular_freq,
                stop: self.stop_angular_freq,
            });
        }

        if self.start_angular_freq == self.stop_angular_freq {
            return Err(ParameterError::FlatSweep(self.start_angular_freq));
        }

        Ok(())
    }

    /// Logs a warning when the parameters would corrupt the output. Does not change them.
    pub(crate) fn warn_if_degenerate(&self) {
        if let Err(error) = self.validate() {
            warn!("<b>Chirp configured with <yellow>degenerate</> <b>parameters.</>");
            warn!("  |_ reason: {}", error);
            warn!("  |_ alpha: {}", self.alpha);
        }
    }
}

/// `alpha = (1 / period) * ln(w2 / w1)`
pub fn sweep_rate(period: i32, start_angular_freq: f64, stop_angular_freq: f64) -> f64 {
    1.0 / f64::from(period) * (stop_angular_freq / start_angular_freq).ln()
}
