use crate::signal::SampleConsumer;
use crossbeam::channel::{Receiver, RecvTimeoutError};
use hound::{SampleFormat, WavSpec, WavWriter};
use simplelog::{debug, info};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// How often [Recorder::run_until] empties the ring buffer.
const DRAIN_INTERVAL: Duration = Duration::from_millis(2);

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RecorderError {
    #[error("Could not write the recording")]
    Wav(#[from] hound::Error),
    #[error("Invalid sample rate {0}")]
    SampleRate(u32),
}

/// Reads the consumer side of an injector's ring buffer and stores every sample in a mono
/// 32 bit integer WAV file, so an injection can be inspected offline.
pub struct Recorder {
    consumer: SampleConsumer,
    writer: WavWriter<BufWriter<File>>,
    written: u64,
}

impl Recorder {
    /// # Arguments
    /// * `sample_rate` - Ticks per second of the injector feeding `consumer`.
    pub fn create<P: AsRef<Path>>(
        consumer: SampleConsumer,
        path: P,
        sample_rate: u32,
    ) -> Result<Self, RecorderError> {
        if sample_rate == 0 {
            return Err(RecorderError::SampleRate(sample_rate));
        }

        let spec = WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Int,
        };
        let writer = WavWriter::create(path.as_ref(), spec)?;
        info!(
            "<b>Recording to <cyan>{}</> <b>at {} Hz.</>",
            path.as_ref().display(),
            sample_rate
        );

        Ok(Self {
            consumer,
            writer,
            written: 0,
        })
    }

    /// Writes every sample currently in the buffer. Returns how many were written.
    pub fn drain(&mut self) -> Result<usize, RecorderError> {
        let mut count = 0;
        while let Some(sample) = self.consumer.pop() {
            self.writer.write_sample(sample)?;
            count += 1;
        }

        self.written += count as u64;
        Ok(count)
    }

    /// Keeps draining until a message arrives on `stop` or its sender is dropped, then
    /// empties the buffer one last time and closes the file.
    ///
    /// Returns the total amount of recorded samples.
    pub fn run_until(mut self, stop: Receiver<()>) -> Result<u64, RecorderError> {
        loop {
            self.drain()?;
            match stop.recv_timeout(DRAIN_INTERVAL) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }
        }

        self.drain()?;
        self.finalize()
    }

    pub fn finalize(self) -> Result<u64, RecorderError> {
        self.writer.finalize()?;
        debug!("Recorder closed after {} samples", self.written);

        Ok(self.written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{Injector, Mix};
    use ringbuf::HeapRb;
    use std::path::PathBuf;

    fn temp_wav(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("sysid_signals_{}_{}.wav", name, std::process::id()))
    }

    fn read_back(path: &Path) -> (hound::WavSpec, Vec<i32>) {
        let mut reader = hound::WavReader::open(path).unwrap();
        let spec = reader.spec();
        let samples = reader.samples::<i32>().map(|s| s.unwrap()).collect();

        (spec, samples)
    }

    #[test]
    fn test_drain_and_finalize() {
        let path = temp_wav("drain");
        let (mut producer, consumer) = HeapRb::<i32>::new(16).split();
        let mut recorder = Recorder::create(consumer, &path, 1000).unwrap();

        producer.push_slice(&[1, -2, i32::MAX, i32::MIN]);
        assert_eq!(recorder.drain().unwrap(), 4);
        assert_eq!(recorder.drain().unwrap(), 0);
        assert_eq!(recorder.finalize().unwrap(), 4);

        let (spec, samples) = read_back(&path);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 1000);
        assert_eq!(spec.bits_per_sample, 32);
        assert_eq!(samples, vec![1, -2, i32::MAX, i32::MIN]);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_zero_sample_rate() {
        let (_, consumer) = HeapRb::<i32>::new(4).split();

        assert!(matches!(
            Recorder::create(consumer, temp_wav("zero"), 0),
            Err(RecorderError::SampleRate(0))
        ));
    }

    #[test]
    fn test_records_injection() {
        let path = temp_wav("injection");
        let (producer, consumer) = HeapRb::<i32>::new(64).split();
        let recorder = Recorder::create(consumer, &path, 8000).unwrap();
        let (stop_tx, stop_rx) = crossbeam::channel::bounded(1);

        let recording = std::thread::spawn(move || recorder.run_until(stop_rx));

        let (mut injector, handle) = Injector::new("Recorded", 125, producer);
        handle.configure_sine(100, 1.0, 0).unwrap();
        handle.select(Mix::Sine).unwrap();
        assert_eq!(injector.run(500).unwrap(), 500);

        stop_tx.send(()).unwrap();
        assert_eq!(recording.join().unwrap().unwrap(), 500);

        let (spec, samples) = read_back(&path);
        assert_eq!(spec.sample_rate, 8000);
        assert_eq!(samples.len(), 500);
        assert_eq!(&samples[..8], &[0, 70, 100, 70, 0, -70, -100, -70]);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_stops_when_sender_dropped() {
        let path = temp_wav("dropped");
        let (mut producer, consumer) = HeapRb::<i32>::new(8).split();
        let recorder = Recorder::create(consumer, &path, 100).unwrap();
        let (stop_tx, stop_rx) = crossbeam::channel::bounded::<()>(1);

        producer.push_slice(&[7, 8, 9]);
        drop(stop_tx);

        assert_eq!(recorder.run_until(stop_rx).unwrap(), 3);
        assert_eq!(read_back(&path).1, vec![7, 8, 9]);

        std::fs::remove_file(path).ok();
    }
}
