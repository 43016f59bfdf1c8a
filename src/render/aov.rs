use crate::foundation::ids::AovId;

/// Pixel format of an output buffer. `Invalid` marks an AOV the backend cannot produce.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Format {
    /// Not producible.
    #[default]
    Invalid,
    /// 8-bit normalized RGBA.
    UNorm8Vec4,
    /// Single 32-bit float (depth).
    Float32,
    /// 32-bit float RGBA.
    Float32Vec4,
    /// Single 32-bit signed integer (ids).
    Int32,
}

impl Format {
    /// Return `false` for [`Format::Invalid`].
    pub fn is_valid(self) -> bool {
        self != Self::Invalid
    }

    /// Components per pixel.
    pub fn components(self) -> usize {
        match self {
            Self::Invalid => 0,
            Self::Float32 | Self::Int32 => 1,
            Self::UNorm8Vec4 | Self::Float32Vec4 => 4,
        }
    }
}

/// Value a buffer is cleared to before accumulation starts.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum ClearValue {
    /// Leave contents untouched.
    #[default]
    None,
    /// RGBA color.
    Color([f32; 4]),
    /// Depth value.
    Depth(f32),
    /// Integer id.
    Id(i32),
}

/// Backend-declared description of how an AOV is stored.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OutputDescriptor {
    /// Pixel format.
    pub format: Format,
    /// Whether the buffer is multi-sampled.
    pub multi_sampled: bool,
    /// Clear value applied when accumulation restarts.
    pub clear_value: ClearValue,
}

impl OutputDescriptor {
    /// Descriptor for an AOV the backend does not support.
    pub fn invalid() -> Self {
        Self::default()
    }

    /// Single-sampled descriptor.
    pub fn new(format: Format, clear_value: ClearValue) -> Self {
        Self {
            format,
            multi_sampled: false,
            clear_value,
        }
    }
}

/// One requested output and the descriptor it is rendered with.
#[derive(Clone, Debug, PartialEq)]
pub struct AovBinding {
    /// Output name.
    pub aov: AovId,
    /// Storage and clear settings.
    pub descriptor: OutputDescriptor,
}

/// Typed pixel storage.
#[derive(Clone, Debug, PartialEq)]
pub enum BufferData {
    /// `UNorm8Vec4` pixels.
    U8(Vec<u8>),
    /// `Float32` / `Float32Vec4` pixels.
    F32(Vec<f32>),
    /// `Int32` pixels.
    I32(Vec<i32>),
}

/// CPU-visible output buffer for one AOV, sized to the render viewport.
#[derive(Clone, Debug)]
pub struct RenderBuffer {
    aov: AovId,
    width: u32,
    height: u32,
    format: Format,
    data: BufferData,
}

impl RenderBuffer {
    pub(crate) fn new(aov: AovId, format: Format) -> Self {
        Self {
            aov,
            width: 0,
            height: 0,
            format,
            data: empty_data(format),
        }
    }

    /// Output name.
    pub fn aov(&self) -> &AovId {
        &self.aov
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel format.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Borrow the pixel storage.
    pub fn data(&self) -> &BufferData {
        &self.data
    }

    /// Mutable pixel storage, for backends writing results.
    pub fn data_mut(&mut self) -> &mut BufferData {
        &mut self.data
    }

    /// Float samples, if this is a float buffer.
    pub fn as_f32(&self) -> Option<&[f32]> {
        match &self.data {
            BufferData::F32(v) => Some(v),
            _ => None,
        }
    }

    /// Integer samples, if this is an id buffer.
    pub fn as_i32(&self) -> Option<&[i32]> {
        match &self.data {
            BufferData::I32(v) => Some(v),
            _ => None,
        }
    }

    /// Byte samples, if this is an 8-bit buffer.
    pub fn as_u8(&self) -> Option<&[u8]> {
        match &self.data {
            BufferData::U8(v) => Some(v),
            _ => None,
        }
    }

    /// Reallocate for `(width, height)`; a no-op when the size is unchanged.
    ///
    /// Returns `true` when storage was reallocated.
    pub(crate) fn allocate(&mut self, width: u32, height: u32) -> bool {
        if self.width == width && self.height == height {
            return false;
        }
        self.width = width;
        self.height = height;
        let len = (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(self.format.components());
        self.data = match self.format {
            Format::UNorm8Vec4 => BufferData::U8(vec![0; len]),
            Format::Float32 | Format::Float32Vec4 => BufferData::F32(vec![0.0; len]),
            Format::Int32 => BufferData::I32(vec![0; len]),
            Format::Invalid => empty_data(Format::Invalid),
        };
        true
    }

    /// Fill every pixel with `value`. Mismatched clear kinds are ignored.
    pub fn clear(&mut self, value: ClearValue) {
        match (&mut self.data, value) {
            (BufferData::F32(v), ClearValue::Color(c)) if self.format == Format::Float32Vec4 => {
                for px in v.chunks_exact_mut(4) {
                    px.copy_from_slice(&c);
                }
            }
            (BufferData::U8(v), ClearValue::Color(c)) => {
                let c8 = c.map(|x| (x.clamp(0.0, 1.0) * 255.0).round() as u8);
                for px in v.chunks_exact_mut(4) {
                    px.copy_from_slice(&c8);
                }
            }
            (BufferData::F32(v), ClearValue::Depth(d)) if self.format == Format::Float32 => {
                v.fill(d);
            }
            (BufferData::I32(v), ClearValue::Id(id)) => v.fill(id),
            _ => {}
        }
    }
}

fn empty_data(format: Format) -> BufferData {
    match format {
        Format::UNorm8Vec4 => BufferData::U8(Vec::new()),
        Format::Int32 => BufferData::I32(Vec::new()),
        Format::Invalid | Format::Float32 | Format::Float32Vec4 => BufferData::F32(Vec::new()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/aov.rs"]
mod tests;
