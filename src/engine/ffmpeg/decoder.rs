//! FFmpeg stream decoder used by the player's decode thread
//!
//! Decodes the best video stream of a container and scales every frame to
//! the RGBA layout declared by the frame consumer.

use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling;

use crate::engine::{EngineError, VideoFormat};

/// Decoder for the best video stream of one media location
pub struct StreamDecoder {
    /// The input format context
    input: ffmpeg_next::format::context::Input,
    /// Index of the video stream
    video_stream_index: usize,
    decoder: ffmpeg_next::decoder::Video,
    /// Scaler into the output format
    scaler: scaling::Context,
    /// Last scaled frame
    scaled: ffmpeg_next::frame::Video,
    output: VideoFormat,
    /// Frame rate (fps)
    frame_rate: f64,
    /// Seconds per PTS tick
    time_base: f64,
    /// All packets have been sent to the decoder
    input_done: bool,
    codec_name: String,
}

impl StreamDecoder {
    /// Open `location` and prepare output in `format`.
    ///
    /// Without a declared format the stream's native size is used.
    pub fn open(location: &str, format: Option<VideoFormat>) -> Result<Self, EngineError> {
        let input = ffmpeg_next::format::input(&location).map_err(|e| EngineError::Open {
            source_location: location.to_string(),
            reason: e.to_string(),
        })?;

        let video_stream = input
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| EngineError::Playback(format!("No video stream in {}", location)))?;
        let video_stream_index = video_stream.index();

        let time_base = video_stream.time_base();
        let time_base_f64 = time_base.numerator() as f64 / time_base.denominator() as f64;

        let frame_rate = video_stream.avg_frame_rate();
        let frame_rate_f64 = if frame_rate.denominator() > 0 && frame_rate.numerator() > 0 {
            frame_rate.numerator() as f64 / frame_rate.denominator() as f64
        } else {
            30.0 // Default fallback
        };

        let context = ffmpeg_next::codec::context::Context::from_parameters(video_stream.parameters())?;
        let decoder = context.decoder().video()?;
        let codec_name = decoder
            .codec()
            .map(|c| c.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let output = format.unwrap_or_else(|| {
            VideoFormat::rgba(crate::video::Resolution::new(decoder.width(), decoder.height()))
        });
        if output.chroma != VideoFormat::RGBA {
            return Err(EngineError::Unsupported("only RGBA output is supported"));
        }
        if output.pitch < output.width * 4 {
            return Err(EngineError::Playback(format!(
                "Pitch {} too small for width {}",
                output.pitch, output.width
            )));
        }

        let scaler = Self::create_scaler(decoder.format(), decoder.width(), decoder.height(), &output)?;

        tracing::info!(
            "Opened video: {}x{} @ {:.2}fps, codec: {}, output: {}x{} {}",
            decoder.width(),
            decoder.height(),
            frame_rate_f64,
            codec_name,
            output.width,
            output.height,
            output.chroma_str()
        );

        Ok(Self {
            input,
            video_stream_index,
            decoder,
            scaler,
            scaled: ffmpeg_next::frame::Video::empty(),
            output,
            frame_rate: frame_rate_f64,
            time_base: time_base_f64,
            input_done: false,
            codec_name,
        })
    }

    fn create_scaler(
        input_format: Pixel,
        width: u32,
        height: u32,
        output: &VideoFormat,
    ) -> Result<scaling::Context, EngineError> {
        scaling::Context::get(
            input_format,
            width,
            height,
            Pixel::RGBA,
            output.width,
            output.height,
            scaling::Flags::BILINEAR,
        )
        .map_err(|e| EngineError::Playback(format!("Failed to create scaler: {}", e)))
    }

    /// Decode and scale the next frame.
    ///
    /// Returns its presentation time in microseconds, or `None` at end of stream.
    pub fn next_frame(&mut self) -> Result<Option<i64>, EngineError> {
        let mut decoded = ffmpeg_next::frame::Video::empty();

        loop {
            match self.decoder.receive_frame(&mut decoded) {
                Ok(()) => {
                    let pts = decoded.pts().unwrap_or(0) as f64 * self.time_base;

                    // Recreate scaler if the stream changed format mid-way
                    if decoded.format() != self.scaler.input().format
                        || decoded.width() != self.scaler.input().width
                        || decoded.height() != self.scaler.input().height
                    {
                        self.scaler =
                            Self::create_scaler(decoded.format(), decoded.width(), decoded.height(), &self.output)?;
                    }

                    self.scaler.run(&decoded, &mut self.scaled)?;
                    return Ok(Some((pts * 1_000_000.0) as i64));
                }
                Err(ffmpeg_next::Error::Other {
                    errno: ffmpeg_next::error::EAGAIN,
                }) => {
                    // Need more input
                    if self.input_done {
                        return Ok(None);
                    }
                }
                Err(ffmpeg_next::Error::Eof) => return Ok(None),
                Err(e) => return Err(e.into()),
            }

            self.send_next_packet()?;
        }
    }

    fn send_next_packet(&mut self) -> Result<(), EngineError> {
        for (stream, packet) in self.input.packets() {
            if stream.index() == self.video_stream_index {
                self.decoder.send_packet(&packet)?;
                return Ok(());
            }
        }

        self.decoder.send_eof()?;
        self.input_done = true;
        Ok(())
    }

    /// Copy the last scaled frame into `dst`, honouring the declared pitch.
    pub fn copy_into(&self, dst: &mut [u8]) {
        let src = self.scaled.data(0);
        let src_stride = self.scaled.stride(0);
        let row_len = self.output.width as usize * 4;
        let pitch = self.output.pitch as usize;
        if pitch == 0 {
            return;
        }

        let rows = (self.output.height as usize).min(dst.len() / pitch);
        for y in 0..rows {
            let src_row = &src[y * src_stride..y * src_stride + row_len];
            dst[y * pitch..y * pitch + row_len].copy_from_slice(src_row);
        }
    }

    /// Seek to the keyframe at or before `micros` from stream start.
    pub fn seek(&mut self, micros: i64) -> Result<(), EngineError> {
        let micros = micros.max(0);
        self.input.seek(micros, ..=micros)?;
        self.decoder.flush();
        self.input_done = false;
        Ok(())
    }

    pub fn output_format(&self) -> VideoFormat {
        self.output
    }

    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    pub fn codec_name(&self) -> &str {
        &self.codec_name
    }
}
