//! Destinations for rendered frames

use simreel_core::{Frame, Result};

/// Anything that accepts frames one at a time
pub trait FrameSink {
    /// Consume one frame
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Number of frames accepted so far
    fn frames_written(&self) -> usize;
}

/// Keeps every frame in memory
impl FrameSink for Vec<Frame> {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.push(frame.clone());
        Ok(())
    }

    fn frames_written(&self) -> usize {
        self.len()
    }
}

impl<S: FrameSink + ?Sized> FrameSink for &mut S {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        (**self).write_frame(frame)
    }

    fn frames_written(&self) -> usize {
        (**self).frames_written()
    }
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        (**self).write_frame(frame)
    }

    fn frames_written(&self) -> usize {
        (**self).frames_written()
    }
}
