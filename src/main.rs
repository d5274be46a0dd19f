//! Webcam demo: detects hands, prints their pixel landmarks, and shows the annotated frames in a
//! window together with an FPS counter and a wall-clock timestamp.

use std::time::{SystemTime, UNIX_EPOCH};

use handtrack::detector::{mediapipe::MediaPipeHands, DetectorConfig, HandDetector};
use handtrack::gui;
use handtrack::image::{draw, Color, Rect};
use handtrack::timer::FpsCounter;
use handtrack::webcam::Webcam;

const OVERLAY_COLOR: Color = Color::from_rgb8(255, 140, 0);

fn main() -> anyhow::Result<()> {
    handtrack::init_logger!();

    let predictor = MediaPipeHands::with_config(DetectorConfig::default().max_hands(2))?;
    let mut detector = HandDetector::new(predictor);
    let mut webcam = Webcam::open()?;
    let mut fps = FpsCounter::new("demo");

    loop {
        let mut image = webcam.read()?;
        let detections = detector.detect(&image)?;

        for (i, hand) in detections.iter().enumerate() {
            let pixels = hand.pixel_landmarks();
            println!("hand {}: {:?}", i, pixels.points());
        }

        detections.draw(&mut image);
        for hand in detections.iter() {
            hand.pixel_landmarks().draw_bounding_rect(&mut image);
        }

        let instantaneous = fps.tick_with(webcam.timers().chain(detector.timers()));

        draw::fill_rect(&mut image, Rect::from_corners((20, 30), (200, 70)));
        draw::text(
            &mut image,
            30,
            50,
            &format!("FPS : {}", instantaneous as u32),
        )
        .color(OVERLAY_COLOR)
        .align_left();

        let (width, height) = (image.width() as i32, image.height() as i32);
        draw::fill_rect(
            &mut image,
            Rect::from_corners((width - 310, height - 30), (width - 1, height - 1)),
        );
        draw::text(&mut image, width - 305, height - 15, &timestamp())
            .color(OVERLAY_COLOR)
            .align_left();

        gui::show_image("hand tracking", &image);
    }
}

/// Formats the current wall-clock time of day (UTC) as `HH:MM:SS`.
fn timestamp() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!(
        "{:02}:{:02}:{:02} UTC",
        (secs / 3600) % 24,
        (secs / 60) % 60,
        secs % 60,
    )
}
