// Voice capture
// A recording holds its device until stopped or dropped, and releases the tracks either way

use tracing::{debug, warn};

use crate::error::AssistResult;

/// A device that hands out media tracks, such as a microphone
pub trait MediaDevice: Send {
    /// Acquire the device and return the ids of the opened tracks
    fn acquire(&mut self) -> AssistResult<Vec<String>>;

    fn release(&mut self, tracks: &[String]);
}

impl<D: MediaDevice + ?Sized> MediaDevice for Box<D> {
    fn acquire(&mut self) -> AssistResult<Vec<String>> {
        (**self).acquire()
    }

    fn release(&mut self, tracks: &[String]) {
        (**self).release(tracks)
    }
}

pub struct Recording<D: MediaDevice> {
    device: D,
    tracks: Vec<String>,
    chunks: Vec<Vec<u8>>,
    released: bool,
}

impl<D: MediaDevice> Recording<D> {
    pub fn start(mut device: D) -> AssistResult<Self> {
        let tracks = device.acquire()?;
        debug!("recording started on {} track(s)", tracks.len());
        Ok(Recording {
            device,
            tracks,
            chunks: Vec::new(),
            released: false,
        })
    }

    pub fn push_chunk(&mut self, chunk: impl Into<Vec<u8>>) {
        self.chunks.push(chunk.into());
    }

    pub fn tracks(&self) -> &[String] {
        &self.tracks
    }

    /// Stop recording, release the device and return the captured audio
    pub fn stop(mut self) -> Vec<u8> {
        self.release();
        std::mem::take(&mut self.chunks).concat()
    }

    fn release(&mut self) {
        if !self.released {
            self.device.release(&self.tracks);
            self.released = true;
        }
    }
}

impl<D: MediaDevice> Drop for Recording<D> {
    fn drop(&mut self) {
        if !self.released {
            warn!("recording dropped without stop; releasing device");
            self.release();
        }
    }
}
