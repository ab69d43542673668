//! Capture configuration

use crate::media::mjpeg::DEFAULT_MAX_BUFFER;
use crate::media::pcm::{DEFAULT_CHUNK_SIZE, SAMPLE_RATE};
use crate::registry::StreamChannel;

/// Video read size (1 MiB)
pub const DEFAULT_VIDEO_READ_SIZE: usize = 1024 * 1024;

/// External program invocation for one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureCommand {
    /// Program name or path
    pub program: String,

    /// Fixed argument list
    pub args: Vec<String>,

    /// Maximum bytes per stdout read
    pub read_size: usize,
}

impl CaptureCommand {
    /// Create a command with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            read_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// `libcamera-vid` writing an endless MJPEG stream to stdout
    pub fn libcamera_mjpeg(width: u32, height: u32, framerate: u32) -> Self {
        let (width, height, framerate) =
            (width.to_string(), height.to_string(), framerate.to_string());

        Self::new("libcamera-vid")
            .args([
                "-t",
                "0",
                "--codec",
                "mjpeg",
                "--width",
                width.as_str(),
                "--height",
                height.as_str(),
                "--framerate",
                framerate.as_str(),
                "--nopreview",
                "-o",
                "-",
            ])
            .read_size(DEFAULT_VIDEO_READ_SIZE)
    }

    /// `arecord` writing raw S16LE mono 44.1 kHz PCM to stdout
    pub fn arecord_pcm(device: &str) -> Self {
        let rate = SAMPLE_RATE.to_string();

        Self::new("arecord")
            .args([
                "-f",
                "S16_LE",
                "-r",
                rate.as_str(),
                "-c",
                "1",
                "-t",
                "raw",
                "-D",
                device,
                "-",
            ])
            .read_size(DEFAULT_CHUNK_SIZE)
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the read size (minimum 1 byte)
    pub fn read_size(mut self, size: usize) -> Self {
        self.read_size = size.max(1);
        self
    }
}

/// Capture configuration for both channels
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Camera capture command
    pub video: CaptureCommand,

    /// Microphone capture command
    pub audio: CaptureCommand,

    /// MJPEG accumulation buffer cap
    pub max_frame_buffer: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            video: CaptureCommand::libcamera_mjpeg(640, 480, 15),
            audio: CaptureCommand::arecord_pcm("plughw:3,0"),
            max_frame_buffer: DEFAULT_MAX_BUFFER,
        }
    }
}

impl CaptureConfig {
    /// Command for a channel
    pub fn command(&self, channel: StreamChannel) -> &CaptureCommand {
        match channel {
            StreamChannel::Video => &self.video,
            StreamChannel::Audio => &self.audio,
        }
    }

    /// Set the video command
    pub fn video(mut self, command: CaptureCommand) -> Self {
        self.video = command;
        self
    }

    /// Set the audio command
    pub fn audio(mut self, command: CaptureCommand) -> Self {
        self.audio = command;
        self
    }

    /// Set the MJPEG buffer cap
    pub fn max_frame_buffer(mut self, size: usize) -> Self {
        self.max_frame_buffer = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CaptureConfig::default();

        assert_eq!(config.video.program, "libcamera-vid");
        assert_eq!(config.video.read_size, DEFAULT_VIDEO_READ_SIZE);
        assert_eq!(config.audio.program, "arecord");
        assert_eq!(config.audio.read_size, 4096);
        assert_eq!(config.max_frame_buffer, 2 * 1024 * 1024);
    }

    #[test]
    fn test_libcamera_args() {
        let cmd = CaptureCommand::libcamera_mjpeg(1280, 720, 30);

        assert_eq!(
            cmd.args,
            vec![
                "-t", "0", "--codec", "mjpeg", "--width", "1280", "--height", "720",
                "--framerate", "30", "--nopreview", "-o", "-",
            ]
        );
    }

    #[test]
    fn test_arecord_args() {
        let cmd = CaptureCommand::arecord_pcm("hw:1,0");

        assert_eq!(
            cmd.args,
            vec!["-f", "S16_LE", "-r", "44100", "-c", "1", "-t", "raw", "-D", "hw:1,0", "-"]
        );
    }

    #[test]
    fn test_command_lookup() {
        let config = CaptureConfig::default();
        assert_eq!(config.command(StreamChannel::Video), &config.video);
        assert_eq!(config.command(StreamChannel::Audio), &config.audio);
    }

    #[test]
    fn test_builder_chaining() {
        let config = CaptureConfig::default()
            .video(CaptureCommand::new("ffmpeg").arg("-i").arg("/dev/video0"))
            .audio(CaptureCommand::new("parec").read_size(0))
            .max_frame_buffer(1024);

        assert_eq!(config.video.args, vec!["-i", "/dev/video0"]);
        assert_eq!(config.audio.read_size, 1);
        assert_eq!(config.max_frame_buffer, 1024);
    }
}
