//! V4L2 webcam access.
//!
//! Currently, only V4L2 `VIDEO_CAPTURE` devices yielding JFIF JPEG or Motion JPEG frames are
//! supported.

use anyhow::bail;
use linuxvideo::{
    format::{PixFormat, PixelFormat},
    stream::ReadStream,
    BufType, CapabilityFlags, Device,
};

use crate::image::Image;
use crate::resolution::Resolution;
use crate::timer::Timer;
use crate::Error;

/// A webcam yielding a stream of [`Image`]s.
pub struct Webcam {
    stream: ReadStream,
    width: u32,
    height: u32,
    t_dequeue: Timer,
    t_decode: Timer,
}

impl Webcam {
    /// Opens the first supported webcam found.
    ///
    /// This function can block for a significant amount of time while the webcam initializes (on
    /// the order of hundreds of milliseconds).
    pub fn open() -> anyhow::Result<Self> {
        for res in linuxvideo::list()? {
            match res {
                Ok(dev) => match Self::open_impl(dev) {
                    Ok(Some(webcam)) => return Ok(webcam),
                    Ok(None) => {}
                    Err(e) => {
                        log::debug!("{}", e);
                    }
                },
                Err(e) => {
                    log::warn!("{}", e);
                }
            }
        }

        bail!("no supported webcam device found")
    }

    fn open_impl(dev: Device) -> anyhow::Result<Option<Self>> {
        let caps = dev.capabilities()?;
        let cap_flags = caps.device_capabilities();
        let path = dev.path()?;
        log::debug!(
            "device {} ({}) capabilities: {:?}",
            caps.card(),
            path.display(),
            cap_flags,
        );

        if !cap_flags.contains(CapabilityFlags::VIDEO_CAPTURE) {
            return Ok(None);
        }

        let mut pixel_format = None;
        for format in dev.formats(BufType::VIDEO_CAPTURE) {
            let format = format?;
            if format.pixel_format() == PixelFormat::JPEG || format.pixel_format() == PixelFormat::MJPG
            {
                pixel_format = Some(format.pixel_format());
                break;
            }
        }

        let Some(pixel_format) = pixel_format else {
            bail!("no supported pixel format found");
        };

        let capture = dev.video_capture(PixFormat::new(
            Resolution::RES_720P.width(),
            Resolution::RES_720P.height(),
            pixel_format,
        ))?;

        let format = capture.format();
        let width = format.width();
        let height = format.height();

        log::info!(
            "opened {} ({}), {}x{}",
            caps.card(),
            path.display(),
            width,
            height,
        );

        let stream = capture.into_stream()?;

        Ok(Some(Self {
            stream,
            width,
            height,
            t_dequeue: Timer::new("dequeue"),
            t_decode: Timer::new("decode"),
        }))
    }

    /// Returns the resolution of the frames this webcam delivers.
    #[inline]
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// Reads the next frame from the camera.
    ///
    /// If no frame is available, this method will block until one is. A failure of the capture
    /// device is reported as [`Error::Capture`].
    pub fn read(&mut self) -> Result<Image, Error> {
        let dequeue_guard = self.t_dequeue.start();
        self.stream
            .dequeue(|buf| {
                drop(dequeue_guard);
                let image = match self.t_decode.time(|| Image::decode_jpeg(&buf)) {
                    Ok(image) => image,
                    Err(e) => {
                        // Even high-quality webcams produce occasional corrupted MJPG frames.
                        // Hand back a blank image rather than skipping the frame, which would
                        // cause 2x latency spikes.
                        log::error!("webcam decode error: {}", e);
                        Image::new(self.width, self.height)
                    }
                };
                Ok(image)
            })
            .map_err(|e| Error::Capture(e.into()))
    }

    /// Returns a borrowing iterator over the frames produced by this webcam.
    pub fn iter_mut(&mut self) -> IterMut<'_> {
        IterMut { webcam: self }
    }

    /// Returns profiling timers for webcam access and decoding.
    pub fn timers(&self) -> impl Iterator<Item = &Timer> + '_ {
        [&self.t_dequeue, &self.t_decode].into_iter()
    }
}

impl IntoIterator for Webcam {
    type Item = Result<Image, Error>;
    type IntoIter = IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { webcam: self }
    }
}

impl<'a> IntoIterator for &'a mut Webcam {
    type Item = Result<Image, Error>;
    type IntoIter = IterMut<'a>;

    fn into_iter(self) -> Self::IntoIter {
        IterMut { webcam: self }
    }
}

/// An owned iterator over the frames captured by a [`Webcam`].
pub struct IntoIter {
    webcam: Webcam,
}

/// A borrowing iterator over the frames captured by a [`Webcam`].
pub struct IterMut<'a> {
    webcam: &'a mut Webcam,
}

impl Iterator for IntoIter {
    type Item = Result<Image, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.webcam.read())
    }
}

impl Iterator for IterMut<'_> {
    type Item = Result<Image, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.webcam.read())
    }
}
