//! Decoder thread that paces video frames against a shared clock and hands
//! them to a host surface.

use std::path::Path;
use std::sync::{Arc, Mutex, Once, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, unbounded};
use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling;
use image::RgbaImage;
use log::{debug, trace, warn};

use crate::error::BackendError;

use super::clock::PlaybackClock;
use super::types::VideoSurface;

pub(super) type SharedClock = Arc<Mutex<PlaybackClock>>;

// Longest single wait, so commands are noticed promptly even when the next
// frame is far away or the clock is stopped.
const MAX_WAIT: Duration = Duration::from_millis(20);

static FFMPEG_INIT: Once = Once::new();

/// Initialise FFmpeg once per process and keep its own logging quiet.
pub(crate) fn init_ffmpeg() {
    FFMPEG_INIT.call_once(|| {
        if let Err(e) = ffmpeg_next::init() {
            warn!("ffmpeg initialisation failed: {e}");
            return;
        }
        // SAFETY: av_log_set_level only touches FFmpeg's global log level.
        unsafe {
            ffmpeg_next::ffi::av_log_set_level(ffmpeg_next::ffi::AV_LOG_ERROR);
        }
    });
}

enum FeedCmd {
    Seek(Duration),
    Stop,
}

pub(super) enum FeedEvent {
    Finished,
    Failed(String),
}

pub(super) struct VideoFeed {
    cmd_tx: Sender<FeedCmd>,
    event_rx: Receiver<FeedEvent>,
    join: Option<JoinHandle<()>>,
}

/// Result of opening a file for video output.
pub(super) struct OpenedFeed {
    pub feed: Option<VideoFeed>,
    pub duration: Option<Duration>,
}

impl VideoFeed {
    /// Open `path` on the calling thread (so a bad file fails fast) and start
    /// the decoder thread. Files without a video stream yield no feed.
    pub fn open(
        path: &Path,
        surface: Arc<dyn VideoSurface>,
        clock: SharedClock,
    ) -> Result<OpenedFeed, BackendError> {
        init_ffmpeg();

        let ictx = ffmpeg_next::format::input(&path)
            .map_err(|e| BackendError::Open(format!("{}: {e}", path.display())))?;

        let duration = (ictx.duration() > 0).then(|| {
            Duration::from_secs_f64(
                ictx.duration() as f64 / f64::from(ffmpeg_next::ffi::AV_TIME_BASE),
            )
        });

        let Some(stream_index) = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .map(|s| s.index())
        else {
            return Ok(OpenedFeed {
                feed: None,
                duration,
            });
        };

        let (cmd_tx, cmd_rx) = unbounded();
        let (event_tx, event_rx) = unbounded();
        let name = format!("video-feed:{}", path.display());

        let join = thread::Builder::new()
            .name(name)
            .spawn(move || {
                if let Err(msg) = run(ictx, stream_index, surface, clock, cmd_rx, &event_tx) {
                    warn!("video feed stopped: {msg}");
                    let _ = event_tx.send(FeedEvent::Failed(msg));
                }
            })
            .map_err(|e| BackendError::Open(format!("cannot start video decoder: {e}")))?;

        Ok(OpenedFeed {
            feed: Some(Self {
                cmd_tx,
                event_rx,
                join: Some(join),
            }),
            duration,
        })
    }

    pub fn seek(&self, position: Duration) {
        let _ = self.cmd_tx.send(FeedCmd::Seek(position));
    }

    pub fn poll(&self) -> Option<FeedEvent> {
        self.event_rx.try_recv().ok()
    }
}

impl Drop for VideoFeed {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(FeedCmd::Stop);
        if let Some(h) = self.join.take() {
            let _ = h.join();
        }
    }
}

fn lock_clock(clock: &SharedClock) -> PlaybackClock {
    clock.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

fn seek_input(
    ictx: &mut ffmpeg_next::format::context::Input,
    decoder: &mut ffmpeg_next::decoder::Video,
    target: Duration,
) -> Result<(), String> {
    let ts = (target.as_secs_f64() * 1_000_000.0) as i64;
    ictx.seek(ts, ..ts).map_err(|e| format!("seek failed: {e}"))?;
    decoder.flush();
    trace!("video feed: seek to {target:?}");
    Ok(())
}

/// Decoder loop. Returns `Ok` once told to stop; running out of frames
/// reports `Finished` and idles until a seek or stop arrives.
fn run(
    mut ictx: ffmpeg_next::format::context::Input,
    stream_index: usize,
    surface: Arc<dyn VideoSurface>,
    clock: SharedClock,
    cmd_rx: Receiver<FeedCmd>,
    events: &Sender<FeedEvent>,
) -> Result<(), String> {
    let (mut decoder, time_base) = {
        let stream = ictx
            .stream(stream_index)
            .ok_or_else(|| "video stream vanished".to_string())?;
        let tb = stream.time_base();
        let ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| format!("codec context: {e}"))?;
        let decoder = ctx
            .decoder()
            .video()
            .map_err(|e| format!("video decoder: {e}"))?;
        (
            decoder,
            f64::from(tb.numerator()) / f64::from(tb.denominator()),
        )
    };

    let (width, height) = (decoder.width(), decoder.height());
    if width == 0 || height == 0 {
        return Err(format!("invalid video dimensions {width}x{height}"));
    }
    let mut scaler = scaling::Context::get(
        decoder.format(),
        width,
        height,
        Pixel::RGBA,
        width,
        height,
        scaling::Flags::BILINEAR,
    )
    .map_err(|e| format!("scaler: {e}"))?;

    let mut pending: Option<(Duration, ffmpeg_next::frame::Video)> = None;
    let mut drained = false;
    // Frames before this target are decoded but not shown (accurate seek).
    let mut skip_until: Option<Duration> = None;

    loop {
        let wait = if drained || !lock_clock(&clock).is_running() {
            Some(MAX_WAIT)
        } else {
            None
        };

        let cmd = match wait {
            Some(w) => match cmd_rx.recv_timeout(w) {
                Ok(cmd) => Some(cmd),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => return Ok(()),
            },
            None => match cmd_rx.try_recv() {
                Ok(cmd) => Some(cmd),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => return Ok(()),
            },
        };

        match cmd {
            Some(FeedCmd::Stop) => return Ok(()),
            Some(FeedCmd::Seek(target)) => {
                seek_input(&mut ictx, &mut decoder, target)?;
                pending = None;
                drained = false;
                skip_until = Some(target);
                continue;
            }
            None => {}
        }

        if drained {
            continue;
        }

        if pending.is_none() {
            match next_frame(&mut ictx, &mut decoder, stream_index)
                .map_err(|e| format!("decode failed: {e}"))?
            {
                Some(frame) => {
                    let pts = frame
                        .timestamp()
                        .map(|p| Duration::from_secs_f64((p as f64 * time_base).max(0.0)))
                        .unwrap_or_default();
                    if skip_until.is_some_and(|t| pts < t) {
                        continue;
                    }
                    skip_until = None;
                    pending = Some((pts, frame));
                }
                None => {
                    debug!("video feed: end of stream");
                    drained = true;
                    let _ = events.send(FeedEvent::Finished);
                    continue;
                }
            }
        }

        let Some((pts, _)) = pending.as_ref() else {
            continue;
        };
        let snapshot = lock_clock(&clock);
        let now = snapshot.position_at(Instant::now());
        if *pts > now {
            let ahead = (*pts - now).div_f64(snapshot.rate().max(f64::EPSILON));
            match cmd_rx.recv_timeout(ahead.min(MAX_WAIT)) {
                Ok(FeedCmd::Stop) | Err(RecvTimeoutError::Disconnected) => return Ok(()),
                Ok(FeedCmd::Seek(target)) => {
                    seek_input(&mut ictx, &mut decoder, target)?;
                    pending = None;
                    skip_until = Some(target);
                }
                Err(RecvTimeoutError::Timeout) => {}
            }
            continue;
        }

        if let Some((_, frame)) = pending.take() {
            let mut rgba = ffmpeg_next::frame::Video::empty();
            scaler
                .run(&frame, &mut rgba)
                .map_err(|e| format!("scale failed: {e}"))?;
            if let Some(img) = to_image(&rgba) {
                surface.present(Arc::new(img));
            }
        }
    }
}

pub(crate) fn next_frame(
    ictx: &mut ffmpeg_next::format::context::Input,
    decoder: &mut ffmpeg_next::decoder::Video,
    stream_index: usize,
) -> Result<Option<ffmpeg_next::frame::Video>, ffmpeg_next::Error> {
    let mut decoded = ffmpeg_next::frame::Video::empty();
    loop {
        if decoder.receive_frame(&mut decoded).is_ok() {
            return Ok(Some(decoded));
        }
        let mut packet = ffmpeg_next::Packet::empty();
        match packet.read(ictx) {
            Ok(()) => {
                if packet.stream() == stream_index {
                    decoder.send_packet(&packet)?;
                }
            }
            Err(ffmpeg_next::Error::Eof) => {
                let _ = decoder.send_eof();
                return Ok(decoder
                    .receive_frame(&mut decoded)
                    .is_ok()
                    .then_some(decoded));
            }
            Err(e) => return Err(e),
        }
    }
}

/// Copy an RGBA frame into an owned image, dropping row padding.
pub(crate) fn to_image(frame: &ffmpeg_next::frame::Video) -> Option<RgbaImage> {
    let width = frame.width();
    let height = frame.height();
    let data = frame.data(0);
    let stride = frame.stride(0);

    let mut bytes = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height as usize {
        let start = y * stride;
        let end = start + (width * 4) as usize;
        bytes.extend_from_slice(data.get(start..end)?);
    }
    RgbaImage::from_raw(width, height, bytes)
}
