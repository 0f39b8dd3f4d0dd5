/// Microphone capture through cpal, as 44.1 kHz mono 16-bit PCM
use anyhow::{anyhow, Result};
use bytes::{BufMut, BytesMut};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use mediacast_core::{CaptureFormat, CaptureKind, CaptureSink, CaptureSource};
use parking_lot::Mutex;
use std::sync::mpsc;
use tracing::{error, info, warn};

pub const SAMPLE_RATE: u32 = 44100;
pub const CHANNELS: u16 = 1;
pub const BITS_PER_SAMPLE: u16 = 16;

pub struct MicrophoneSource {
    device: Option<String>,
    stop_tx: Mutex<Option<mpsc::Sender<()>>>,
}

impl MicrophoneSource {
    /// `device` is an input device name; `None` picks the default input
    pub fn new(device: Option<String>) -> Self {
        Self {
            device,
            stop_tx: Mutex::new(None),
        }
    }

    /// Names of the available input devices
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        Ok(host.input_devices()?.filter_map(|d| d.name().ok()).collect())
    }

    fn open_device(&self) -> Result<cpal::Device> {
        let host = cpal::default_host();
        match &self.device {
            Some(name) => host
                .input_devices()?
                .find(|d| d.name().map(|n| n == *name).unwrap_or(false))
                .ok_or_else(|| anyhow!("Input device '{}' not found", name)),
            None => host
                .default_input_device()
                .ok_or_else(|| anyhow!("No default input device available")),
        }
    }
}

fn build_stream<T>(device: &cpal::Device, config: &cpal::StreamConfig, sink: CaptureSink) -> Result<cpal::Stream>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    let channels = config.channels.max(1) as usize;
    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            // Downmix to mono, little-endian i16
            let mut out = BytesMut::with_capacity(data.len() / channels * 2);
            for frame in data.chunks(channels) {
                let sum: i32 = frame.iter().map(|s| i16::from_sample(*s) as i32).sum();
                out.put_i16_le((sum / frame.len() as i32) as i16);
            }
            sink.push(out.freeze());
        },
        move |err| {
            error!("Microphone stream error: {}", err);
        },
        None,
    )?;
    Ok(stream)
}

fn open_stream(device: &cpal::Device, sink: CaptureSink) -> Result<cpal::Stream> {
    let configs: Vec<_> = device.supported_input_configs()?.collect();
    let supported = configs
        .iter()
        .filter(|c| c.min_sample_rate().0 <= SAMPLE_RATE && c.max_sample_rate().0 >= SAMPLE_RATE)
        .min_by_key(|c| c.channels().abs_diff(CHANNELS))
        .cloned()
        .ok_or_else(|| anyhow!("Input device does not support {} Hz", SAMPLE_RATE))?
        .with_sample_rate(cpal::SampleRate(SAMPLE_RATE));

    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();
    info!(
        "Microphone capture: {} channels at {} Hz, {:?}",
        config.channels, SAMPLE_RATE, sample_format
    );

    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(device, &config, sink)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(device, &config, sink)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(device, &config, sink)?,
        other => return Err(anyhow!("Unsupported sample format for input: {:?}", other)),
    };
    stream.play()?;
    Ok(stream)
}

impl CaptureSource for MicrophoneSource {
    fn kind(&self) -> CaptureKind {
        CaptureKind::Microphone
    }

    fn format(&self) -> CaptureFormat {
        CaptureFormat::Pcm {
            sample_rate: SAMPLE_RATE,
            channels: CHANNELS,
            bits_per_sample: BITS_PER_SAMPLE,
        }
    }

    fn start(&self, sink: CaptureSink) -> Result<()> {
        let mut stop_tx = self.stop_tx.lock();
        if stop_tx.is_some() {
            return Ok(());
        }

        let device = self.open_device()?;
        info!("Using input device: {}", device.name().unwrap_or_default());

        // cpal streams are not Send; the stream lives and dies on its own thread
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();
        let (tx, rx) = mpsc::channel::<()>();
        std::thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || {
                let stream = match open_stream(&device, sink) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                let _ = rx.recv();
                drop(stream);
                info!("Microphone stream closed");
            })?;

        ready_rx
            .recv()
            .map_err(|_| anyhow!("Microphone thread exited during startup"))??;

        *stop_tx = Some(tx);
        Ok(())
    }

    fn stop(&self) {
        if let Some(tx) = self.stop_tx.lock().take() {
            if tx.send(()).is_err() {
                warn!("Microphone thread already gone");
            }
        }
    }
}
