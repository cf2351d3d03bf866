use crate::signal::{ChirpParameters, Mix, SineParameters, MICROS_PER_SECOND};
use simplelog::{error, info, warn};
use std::fs;
use std::path::Path;
use thiserror::Error;
use yaml_rust::{Yaml, YamlLoader};

const YAML_VERSION: f64 = 0.1;
const DEFAULT_BUFFER_SIZE: usize = 1024;
/// Longest segment whose duration still fits in microseconds.
const MAX_DURATION_MS: u64 = u64::MAX / 1000;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProfileError {
    #[error("Could not read profile {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Profile is not valid YAML")]
    Yaml(#[from] yaml_rust::ScanError),
    #[error("Profile is empty")]
    Empty,
    #[error("Unsupported profile version {0}, expected {}", YAML_VERSION)]
    Version(f64),
    #[error("Missing or invalid field '{0}'")]
    Field(String),
    #[error("Unknown mix '{0}', expected sine, chirp or sum")]
    UnknownMix(String),
    #[error("tick-us must be within 1..=1000000, got {0}")]
    TickOutOfRange(i64),
    #[error("buffer-size must be positive, got {0}")]
    BufferSize(i64),
    #[error("Profile has no segments")]
    NoSegments,
}

/// An injection profile: the timestep of the control loop and the sequence of signal
/// configurations to inject.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    /// Microseconds between two ticks.
    pub tick_us: u64,
    /// Capacity of the ring buffer between the injector and the recorder.
    pub buffer_size: usize,
    pub segments: Vec<Segment>,
}

impl Profile {
    /// Ticks per second, truncated.
    pub fn sample_rate(&self) -> u32 {
        (MICROS_PER_SECOND / self.tick_us) as u32
    }

    pub fn total_ticks(&self) -> u64 {
        self.segments
            .iter()
            .map(|segment| segment.ticks(self.tick_us))
            .fold(0, u64::saturating_add)
    }
}

/// A span of the injection with a fixed configuration. Generators left out keep whatever
/// configuration they had before the segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub duration_ms: u64,
    pub mix: Mix,
    pub sine: Option<SineParameters>,
    pub chirp: Option<ChirpParameters>,
}

impl Segment {
    /// Amount of ticks covering the segment, rounded up.
    pub fn ticks(&self, tick_us: u64) -> u64 {
        self.duration_ms.saturating_mul(1000).div_ceil(tick_us)
    }
}

pub fn load_profile<P: AsRef<Path>>(path: P) -> Result<Profile, ProfileError> {
    let path = path.as_ref();
    info!("<b>Loading profile from <red>{}</><b>.</>", path.display());

    let yaml = fs::read_to_string(path).map_err(|source| ProfileError::Io {
        path: path.display().to_string(),
        source,
    })?;

    parse_profile(&yaml)
}

pub fn parse_profile(yaml: &str) -> Result<Profile, ProfileError> {
    let docs = YamlLoader::load_from_str(yaml)?;
    let doc = docs.first().ok_or(ProfileError::Empty)?;

    let version = yaml_f64(&doc["version"]).unwrap_or(0.0);
    if version != YAML_VERSION {
        error!("<b>Please use the <red>latest YAML</> <b>version.</>");
        return Err(ProfileError::Version(version));
    }
    info!(
        "<b>Using <magenta>YAML parsing</> <b>version: <b><cyan>{}</>",
        version
    );

    let tick_us = required(doc["tick-us"].as_i64(), "tick-us")?;
    if !(1..=MICROS_PER_SECOND as i64).contains(&tick_us) {
        error!("<b>Timestep <red>out of range</><b>: {} us.</>", tick_us);
        return Err(ProfileError::TickOutOfRange(tick_us));
    }

    let buffer_size = match &doc["buffer-size"] {
        Yaml::BadValue => DEFAULT_BUFFER_SIZE,
        other => {
            let size = required(other.as_i64(), "buffer-size")?;
            usize::try_from(size)
                .ok()
                .filter(|size| *size > 0)
                .ok_or(ProfileError::BufferSize(size))?
        }
    };

    info!("<b>Creating segment list.</>");
    let mut segments = Vec::new();
    let mut sine_configured = false;
    let mut chirp_configured = false;

    for (index, segment) in doc["segments"].clone().into_iter().enumerate() {
        info!("> Processing <cyan>segment {}</>", index);
        let segment = parse_segment(&segment)?;

        sine_configured |= segment.sine.is_some();
        chirp_configured |= segment.chirp.is_some();
        let missing = match segment.mix {
            Mix::Sine => !sine_configured,
            Mix::Chirp => !chirp_configured,
            Mix::Sum => !(sine_configured && chirp_configured),
        };
        if missing {
            warn!("<b>Segment selects a generator that was <yellow>never configured</><b>.</>");
            warn!("  |_ segment: {}", index);
            warn!("  |_ mix: {:?}", segment.mix);
        }

        info!("  |_ duration: {} ms", segment.duration_ms);
        info!("  |_ mix: {:?}", segment.mix);
        segments.push(segment);
    }

    if segments.is_empty() {
        error!("<b>The profile has <red>no segments</><b>.</>");
        return Err(ProfileError::NoSegments);
    }

    Ok(Profile {
        tick_us: tick_us as u64,
        buffer_size,
        segments,
    })
}

fn parse_segment(segment: &Yaml) -> Result<Segment, ProfileError> {
    let duration_ms = required(segment["duration-ms"].as_i64(), "duration-ms")?;
    let duration_ms = u64::try_from(duration_ms)
        .ok()
        .filter(|duration| *duration <= MAX_DURATION_MS)
        .ok_or_else(|| {
            error!("<b>Duration <red>out of range</><b>: {} ms.</>", duration_ms);
            ProfileError::Field("duration-ms".to_string())
        })?;

    let mix = required(segment["mix"].as_str(), "mix")?;
    let mix = match mix {
        "sine" => Mix::Sine,
        "chirp" => Mix::Chirp,
        "sum" => Mix::Sum,
        _ => {
            error!("<b>Mix <red>not found</><b>: {}.</>", mix);
            return Err(ProfileError::UnknownMix(mix.to_string()));
        }
    };

    let sine = match &segment["sine"] {
        Yaml::BadValue => None,
        config => Some(SineParameters::new(
            required(yaml_i32(&config["amplitude"]), "sine.amplitude")?,
            required(yaml_f64(&config["frequency"]), "sine.frequency")?,
            optional_offset(&config["offset"], "sine.offset")?,
        )),
    };

    let chirp = match &segment["chirp"] {
        Yaml::BadValue => None,
        config => Some(ChirpParameters::new(
            required(yaml_i32(&config["amplitude"]), "chirp.amplitude")?,
            required(yaml_f64(&config["start-freq"]), "chirp.start-freq")?,
            required(yaml_f64(&config["stop-freq"]), "chirp.stop-freq")?,
            required(yaml_i32(&config["period"]), "chirp.period")?,
            optional_offset(&config["offset"], "chirp.offset")?,
        )),
    };

    Ok(Segment {
        duration_ms,
        mix,
        sine,
        chirp,
    })
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, ProfileError> {
    value.ok_or_else(|| {
        error!("<b>Missing or invalid <red>{}</> <b>field.</>", field);
        ProfileError::Field(field.to_string())
    })
}

fn optional_offset(yaml: &Yaml, field: &str) -> Result<i32, ProfileError> {
    match yaml {
        Yaml::BadValue => Ok(0), // not found
        other => required(yaml_i32(other), field),
    }
}

fn yaml_f64(yaml: &Yaml) -> Option<f64> {
    match yaml {
        Yaml::Real(_) => yaml.as_f64(),
        Yaml::Integer(value) => Some(*value as f64),
        _ => None,
    }
}

fn yaml_i32(yaml: &Yaml) -> Option<i32> {
    yaml.as_i64().and_then(|value| i32::try_from(value).ok())
}
