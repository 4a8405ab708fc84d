//! Sample buffers handed to stream callbacks

use super::SampleFormat;

/// Borrowed view over one buffer of samples, tagged with its encoding
#[derive(Debug, Clone, Copy)]
pub enum Samples<'a> {
    U8(&'a [u8]),
    I16(&'a [i16]),
    F32(&'a [f32]),
}

impl<'a> Samples<'a> {
    pub fn format(&self) -> SampleFormat {
        match self {
            Samples::U8(_) => SampleFormat::IqUint8,
            Samples::I16(_) => SampleFormat::IqInt16,
            Samples::F32(_) => SampleFormat::IqFloat32,
        }
    }

    /// Number of elements (not bytes)
    pub fn len(&self) -> usize {
        match self {
            Samples::U8(s) => s.len(),
            Samples::I16(s) => s.len(),
            Samples::F32(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One batch of samples handed to the stream callback.
///
/// Only valid for the duration of the callback: the borrow ends when the
/// callback returns and the driver reuses the buffer.
#[derive(Debug, Clone, Copy)]
pub struct SdrTransfer<'a> {
    pub samples: Samples<'a>,
    /// Element count reported by the vendor for this buffer
    pub frame_size: usize,
    /// Samples the driver reports as dropped before this buffer
    pub dropped_samples: u64,
}

impl<'a> SdrTransfer<'a> {
    pub fn new(samples: Samples<'a>, frame_size: usize, dropped_samples: u64) -> Self {
        Self {
            samples,
            frame_size,
            dropped_samples,
        }
    }

    pub fn format(&self) -> SampleFormat {
        self.samples.format()
    }
}

/// Sample delivery callback, invoked on the acquisition thread
pub type SdrCallback = Box<dyn FnMut(&SdrTransfer<'_>) + Send + 'static>;
