//! Lookup-table sample format converters
//!
//! Used when a vendor's native format differs from the requested output
//! format. Tables are built once; `process` is a single allocation-free pass
//! over caller-owned buffers.

/// Unsigned 8-bit I/Q to signed 16-bit I/Q
pub struct Uint8ToInt16 {
    table: Vec<i16>,
}

impl Uint8ToInt16 {
    /// Build the 256-entry table: `table[i] = (i - 127) * 64`
    pub fn new() -> Self {
        let table = (0..=u8::MAX as i16).map(|i| (i - 127) * 64).collect();
        Self { table }
    }

    #[inline(always)]
    pub fn convert(&self, sample: u8) -> i16 {
        self.table[sample as usize]
    }

    /// Convert `input` into `output`.
    ///
    /// Processes `min(input.len(), output.len())` elements and returns that
    /// count.
    pub fn process(&self, input: &[u8], output: &mut [i16]) -> usize {
        let count = input.len().min(output.len());
        for (out, &sample) in output[..count].iter_mut().zip(&input[..count]) {
            *out = self.table[sample as usize];
        }
        count
    }
}

impl Default for Uint8ToInt16 {
    fn default() -> Self {
        Self::new()
    }
}

/// Float table covering the signed 16-bit range, indexed by an 8-bit input.
///
/// Entry `k` holds `(k - 32767) / 32768` for `k` in `0..65534`, so only the
/// first 256 entries (all close to -1.0) are reachable through `process`.
/// Callers must only feed it 8-bit encoded values.
pub struct Int16ToFloat {
    table: Vec<f32>,
}

impl Int16ToFloat {
    pub fn new() -> Self {
        let table = (-32767..32767i32)
            .map(|i| i as f32 * (1.0 / 32768.0))
            .collect();
        Self { table }
    }

    /// Number of table entries
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Table entry for a signed 16-bit value
    pub fn lookup(&self, value: i16) -> Option<f32> {
        let index = usize::try_from(i32::from(value) + 32767).ok()?;
        self.table.get(index).copied()
    }

    /// Convert `input` into `output`, indexing the table by each byte.
    ///
    /// Processes `min(input.len(), output.len())` elements and returns that
    /// count.
    pub fn process(&self, input: &[u8], output: &mut [f32]) -> usize {
        let count = input.len().min(output.len());
        for (out, &sample) in output[..count].iter_mut().zip(&input[..count]) {
            *out = self.table[sample as usize];
        }
        count
    }
}

impl Default for Int16ToFloat {
    fn default() -> Self {
        Self::new()
    }
}
