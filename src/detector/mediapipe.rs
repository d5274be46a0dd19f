//! MediaPipe-based hand predictor running in a Python helper process.
//!
//! The heavy lifting happens in MediaPipe's pretrained hand landmark model; this module only
//! ships frames to a small Python helper and parses its per-frame answers.
//!
//! # Protocol
//!
//! 1. On startup the helper receives one JSON line with the configuration values and answers with
//!    the line `READY` once the model is loaded.
//! 2. Per frame, its stdin receives a little-endian `u32` triple (width, height, channels)
//!    followed by the raw RGB pixel data; its stdout answers with one JSON line listing the
//!    detected hands.

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::detection::Handedness;
use crate::image::Image;
use crate::landmark::NUM_LANDMARKS;

use super::{DetectorConfig, HandPredictor, RawHand};

/// Helper script expected next to the current working directory by [`MediaPipeHands::new`].
const DEFAULT_SCRIPT: &str = "mediapipe_hands.py";

const ENV_VAR_PYTHON: &str = "HANDTRACK_PYTHON";

#[derive(Serialize)]
struct ConfigMsg {
    static_image_mode: bool,
    max_num_hands: usize,
    min_detection_confidence: f32,
    min_tracking_confidence: f32,
}

#[derive(Deserialize)]
struct FrameMsg {
    #[serde(default)]
    hands: Vec<HandMsg>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct HandMsg {
    handedness: String,
    score: f32,
    landmarks: Vec<PointMsg>,
}

#[derive(Deserialize)]
struct PointMsg {
    x: f32,
    y: f32,
    z: f32,
}

/// A [`HandPredictor`] backed by MediaPipe Hands running in a Python subprocess.
///
/// The helper process is killed when this value is dropped.
pub struct MediaPipeHands {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    line: String,
}

impl MediaPipeHands {
    /// Starts the helper script `mediapipe_hands.py` with the default configuration.
    pub fn new() -> anyhow::Result<Self> {
        Self::with_config(DetectorConfig::default())
    }

    /// Starts the helper script `mediapipe_hands.py` with the given configuration.
    pub fn with_config(config: DetectorConfig) -> anyhow::Result<Self> {
        Self::spawn(Path::new(DEFAULT_SCRIPT), config)
    }

    /// Starts `script` and performs the configuration/`READY` handshake.
    ///
    /// The interpreter defaults to `python3` and can be overridden with the `HANDTRACK_PYTHON`
    /// environment variable.
    pub fn spawn(script: &Path, config: DetectorConfig) -> anyhow::Result<Self> {
        if !script.exists() {
            bail!(
                "hand landmark helper script not found at '{}'",
                script.display()
            );
        }

        let python = std::env::var(ENV_VAR_PYTHON).unwrap_or_else(|_| "python3".into());
        log::info!(
            "starting hand landmark helper: {} {}",
            python,
            script.display()
        );

        let mut process = Command::new(python)
            .arg(script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .context("failed to start hand landmark helper process")?;

        let mut stdin = process
            .stdin
            .take()
            .context("failed to open helper stdin")?;
        let stdout = process
            .stdout
            .take()
            .context("failed to open helper stdout")?;
        let mut stdout = BufReader::new(stdout);

        serde_json::to_writer(
            &mut stdin,
            &ConfigMsg {
                static_image_mode: config.static_image_mode,
                max_num_hands: config.max_hands,
                min_detection_confidence: config.min_detection_confidence,
                min_tracking_confidence: config.min_tracking_confidence,
            },
        )?;
        stdin.write_all(b"\n")?;
        stdin.flush()?;

        let mut ready = String::new();
        stdout.read_line(&mut ready)?;
        if ready.trim() != "READY" {
            bail!("helper did not signal readiness (got {:?})", ready.trim());
        }
        log::info!("hand landmark helper ready");

        Ok(Self {
            process,
            stdin,
            stdout,
            line: String::new(),
        })
    }
}

impl HandPredictor for MediaPipeHands {
    fn predict(&mut self, image: &Image) -> anyhow::Result<Vec<RawHand>> {
        self.stdin.write_all(&image.width().to_le_bytes())?;
        self.stdin.write_all(&image.height().to_le_bytes())?;
        self.stdin.write_all(&3u32.to_le_bytes())?;

        // The internal buffer is RGBA; the helper wants packed RGB.
        let mut rgb = Vec::with_capacity(image.resolution().num_pixels() as usize * 3);
        for px in image.data().chunks_exact(4) {
            rgb.extend_from_slice(&px[..3]);
        }
        self.stdin.write_all(&rgb)?;
        self.stdin.flush()?;

        self.line.clear();
        self.stdout.read_line(&mut self.line)?;
        parse_response(&self.line)
    }
}

impl Drop for MediaPipeHands {
    fn drop(&mut self) {
        if let Err(e) = self.process.kill() {
            log::warn!("failed to kill hand landmark helper: {}", e);
        }
    }
}

fn parse_response(line: &str) -> anyhow::Result<Vec<RawHand>> {
    let msg: FrameMsg = serde_json::from_str(line)
        .with_context(|| format!("malformed helper response: {:?}", line.trim()))?;

    if let Some(error) = msg.error {
        bail!("helper error: {}", error);
    }

    let mut hands = Vec::with_capacity(msg.hands.len());
    for hand in msg.hands {
        if hand.landmarks.len() != NUM_LANDMARKS {
            bail!(
                "expected {} landmarks per hand, got {}",
                NUM_LANDMARKS,
                hand.landmarks.len()
            );
        }

        let mut landmarks = [[0.0; 3]; NUM_LANDMARKS];
        for (out, lm) in landmarks.iter_mut().zip(&hand.landmarks) {
            *out = [lm.x, lm.y, lm.z];
        }

        let handedness = match &*hand.handedness {
            "Left" => Handedness::Left,
            "Right" => Handedness::Right,
            other => bail!("unknown handedness label {:?}", other),
        };

        hands.push(RawHand {
            landmarks,
            handedness,
            confidence: hand.score,
        });
    }

    Ok(hands)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand_json(landmarks: usize) -> String {
        let point = r#"{"x":0.5,"y":0.5,"z":0.0}"#;
        let landmarks = vec![point; landmarks].join(",");
        format!(r#"{{"hands":[{{"handedness":"Right","score":0.9,"landmarks":[{landmarks}]}}]}}"#)
    }

    #[test]
    fn parses_hands() {
        let hands = parse_response(&hand_json(NUM_LANDMARKS)).unwrap();
        assert_eq!(hands.len(), 1);
        assert_eq!(hands[0].handedness, Handedness::Right);
        assert_eq!(hands[0].landmarks[20], [0.5, 0.5, 0.0]);
    }

    #[test]
    fn parses_empty_frame() {
        assert!(parse_response(r#"{"hands":[]}"#).unwrap().is_empty());
        assert!(parse_response(r#"{}"#).unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_responses() {
        assert!(parse_response("not json").is_err());
        assert!(parse_response(r#"{"error":"camera on fire"}"#).is_err());
        assert!(parse_response(&hand_json(7)).is_err());
        assert!(
            parse_response(
                r#"{"hands":[{"handedness":"Tentacle","score":0.9,"landmarks":[]}]}"#
            )
            .is_err()
        );
    }
}
