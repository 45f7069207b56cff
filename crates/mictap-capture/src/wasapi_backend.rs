//! Event-driven WASAPI capture.
//!
//! Opens the default capture endpoint in shared mode, preferring the
//! communications role, and negotiates mono/f32 at the requested rate
//! with a fallback to the device mix format. Samples are drained on a
//! dedicated thread registered with MMCSS.

use std::time::Duration;

use windows::core::PCWSTR;
use windows::Win32::Foundation::{CloseHandle, HANDLE, WAIT_OBJECT_0};
use windows::Win32::Media::Audio::{
    eCapture, eCommunications, eMultimedia, IAudioCaptureClient, IAudioClient, IMMDevice,
    IMMDeviceEnumerator, MMDeviceEnumerator, AUDCLNT_BUFFERFLAGS_SILENT, AUDCLNT_SHAREMODE_SHARED,
    AUDCLNT_STREAMFLAGS_EVENTCALLBACK, WAVEFORMATEX,
};
use windows::Win32::Media::Multimedia::WAVE_FORMAT_IEEE_FLOAT;
use windows::Win32::System::Com::{
    CoCreateInstance, CoInitializeEx, CoTaskMemFree, CoUninitialize, CLSCTX_ALL,
    COINIT_MULTITHREADED,
};
use windows::Win32::System::Threading::{
    AvRevertMmThreadCharacteristics, AvSetMmThreadCharacteristicsW, CreateEventW,
    WaitForSingleObject,
};

use crate::backend::{CaptureBackend, Packet};
use crate::config::{CaptureConfig, NegotiatedFormat};
use mictap_foundation::CaptureError;

/// Buffer duration handed to IAudioClient::Initialize, in 100 ns units.
const BUFFER_DURATION_HNS: i64 = 20 * 10_000; // 20 ms

/// Event-driven capture session over WASAPI shared mode.
///
/// All COM objects are created and used on the capture thread only.
pub struct WasapiBackend {
    audio_client: IAudioClient,
    capture_client: IAudioCaptureClient,
    event: HANDLE,
    mmcss: Option<HANDLE>,
    format: NegotiatedFormat,
    _com: ComGuard,
}

impl WasapiBackend {
    /// Must be called on the thread that will read packets.
    pub fn open(config: &CaptureConfig) -> Result<Self, CaptureError> {
        unsafe {
            CoInitializeEx(None, COINIT_MULTITHREADED)
                .ok()
                .map_err(|e| CaptureError::ActivationFailed(format!("CoInitializeEx: {e}")))?;
            let com = ComGuard;

            let enumerator: IMMDeviceEnumerator =
                CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL).map_err(|e| {
                    CaptureError::ActivationFailed(format!("device enumerator: {e}"))
                })?;

            // Communications endpoint first, general multimedia second.
            let device: IMMDevice = enumerator
                .GetDefaultAudioEndpoint(eCapture, eCommunications)
                .or_else(|_| enumerator.GetDefaultAudioEndpoint(eCapture, eMultimedia))
                .map_err(|_| CaptureError::DeviceNotFound { name: None })?;

            let audio_client: IAudioClient = device.Activate(CLSCTX_ALL, None).map_err(|e| {
                CaptureError::ActivationFailed(format!("IAudioClient activation: {e}"))
            })?;

            let mix_ptr = audio_client
                .GetMixFormat()
                .map_err(|e| CaptureError::ActivationFailed(format!("GetMixFormat: {e}")))?;
            let mix = &*mix_ptr;

            let desired = WAVEFORMATEX {
                wFormatTag: WAVE_FORMAT_IEEE_FLOAT as u16,
                nChannels: 1,
                nSamplesPerSec: config.sample_rate_hz,
                nAvgBytesPerSec: config.sample_rate_hz * 4,
                nBlockAlign: 4,
                wBitsPerSample: 32,
                cbSize: 0,
            };

            let init = audio_client.Initialize(
                AUDCLNT_SHAREMODE_SHARED,
                AUDCLNT_STREAMFLAGS_EVENTCALLBACK,
                BUFFER_DURATION_HNS,
                0,
                &desired,
                None,
            );
            let format = match init {
                Ok(()) => NegotiatedFormat {
                    sample_rate_hz: config.sample_rate_hz,
                    channels: 1,
                },
                Err(_) => {
                    // The device rejected mono/f32 at the requested rate;
                    // capture proceeds degraded in its mix format.
                    tracing::warn!(
                        "Requested format rejected; falling back to mix format ({} Hz, {} ch)",
                        mix.nSamplesPerSec,
                        mix.nChannels
                    );
                    let fallback = audio_client.Initialize(
                        AUDCLNT_SHAREMODE_SHARED,
                        AUDCLNT_STREAMFLAGS_EVENTCALLBACK,
                        BUFFER_DURATION_HNS,
                        0,
                        mix_ptr,
                        None,
                    );
                    match fallback {
                        Ok(()) => NegotiatedFormat {
                            sample_rate_hz: mix.nSamplesPerSec,
                            channels: mix.nChannels,
                        },
                        Err(e) => {
                            CoTaskMemFree(Some(mix_ptr as *const _ as *const _));
                            return Err(CaptureError::FormatNotSupported {
                                format: format!("mix format rejected: {e}"),
                            });
                        }
                    }
                }
            };
            CoTaskMemFree(Some(mix_ptr as *const _ as *const _));

            let capture_client: IAudioCaptureClient = audio_client.GetService().map_err(|e| {
                CaptureError::ActivationFailed(format!("IAudioCaptureClient: {e}"))
            })?;

            let event = CreateEventW(None, false, false, None)
                .map_err(|e| CaptureError::ActivationFailed(format!("capture event: {e}")))?;

            if let Err(e) = audio_client
                .SetEventHandle(event)
                .and_then(|_| audio_client.Start())
            {
                let _ = CloseHandle(event);
                return Err(CaptureError::ActivationFailed(format!("stream start: {e}")));
            }

            // Real-time scheduling for the capture thread.
            let mut task_index = 0u32;
            let task_name: Vec<u16> = "Pro Audio\0".encode_utf16().collect();
            let mmcss =
                AvSetMmThreadCharacteristicsW(PCWSTR(task_name.as_ptr()), &mut task_index).ok();

            tracing::info!(
                "WASAPI capture initialized: {} Hz, {} ch",
                format.sample_rate_hz,
                format.channels
            );

            Ok(Self {
                audio_client,
                capture_client,
                event,
                mmcss,
                format,
                _com: com,
            })
        }
    }
}

impl CaptureBackend for WasapiBackend {
    fn format(&self) -> NegotiatedFormat {
        self.format
    }

    fn read_packet(&mut self, timeout: Duration) -> Result<Packet, CaptureError> {
        unsafe {
            let wait = WaitForSingleObject(self.event, timeout.as_millis() as u32);
            if wait != WAIT_OBJECT_0 {
                return Ok(Packet::TimedOut);
            }

            let channels = self.format.channels as usize;
            let mut samples: Vec<f32> = Vec::new();

            let mut packet_frames = 0u32;
            self.capture_client
                .GetNextPacketSize(&mut packet_frames)
                .map_err(|e| CaptureError::Stream(format!("GetNextPacketSize: {e}")))?;

            // Drain every packet the event covered before waiting again.
            while packet_frames > 0 {
                let mut data: *mut u8 = std::ptr::null_mut();
                let mut frames = 0u32;
                let mut flags = 0u32;

                self.capture_client
                    .GetBuffer(&mut data, &mut frames, &mut flags, None, None)
                    .map_err(|e| CaptureError::Stream(format!("GetBuffer: {e}")))?;

                if frames > 0 && !data.is_null() {
                    let count = frames as usize * channels;
                    if flags & (AUDCLNT_BUFFERFLAGS_SILENT.0 as u32) != 0 {
                        samples.extend(std::iter::repeat(0.0f32).take(count));
                    } else {
                        let floats = std::slice::from_raw_parts(data as *const f32, count);
                        samples.extend_from_slice(floats);
                    }
                }

                self.capture_client
                    .ReleaseBuffer(frames)
                    .map_err(|e| CaptureError::Stream(format!("ReleaseBuffer: {e}")))?;

                self.capture_client
                    .GetNextPacketSize(&mut packet_frames)
                    .map_err(|e| CaptureError::Stream(format!("GetNextPacketSize: {e}")))?;
            }

            if samples.is_empty() {
                return Ok(Packet::TimedOut);
            }
            Ok(Packet::Samples(samples))
        }
    }
}

impl Drop for WasapiBackend {
    fn drop(&mut self) {
        unsafe {
            let _ = self.audio_client.Stop();
            if let Some(mmcss) = self.mmcss.take() {
                let _ = AvRevertMmThreadCharacteristics(mmcss);
            }
            let _ = CloseHandle(self.event);
        }
    }
}

/// Pairs the thread's CoInitializeEx with CoUninitialize.
struct ComGuard;

impl Drop for ComGuard {
    fn drop(&mut self) {
        unsafe {
            CoUninitialize();
        }
    }
}
