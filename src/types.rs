// Core raster type shared by every stage of the frame pipeline.

/// RGBA raster, four bytes per pixel, row-major, origin top-left.
/// `data.len()` is always `width * height * 4`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Every byte starts at 0, i.e. black, fully transparent pixels.
    pub fn blank(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width * height * 4],
        }
    }

    /// Wrap existing RGBA bytes. Returns `None` when the length does not match the dimensions.
    pub fn from_rgba(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        if data.len() != width * height * 4 {
            return None;
        }
        Some(Self { width, height, data })
    }

    /// Expand packed RGB bytes (3 per pixel) to RGBA with opaque alpha.
    pub fn from_rgb(width: usize, height: usize, rgb: &[u8]) -> Option<Self> {
        if rgb.len() != width * height * 3 {
            return None;
        }
        let mut data = Vec::with_capacity(width * height * 4);
        for px in rgb.chunks_exact(3) {
            data.extend_from_slice(&[px[0], px[1], px[2], 255]);
        }
        Some(Self { width, height, data })
    }

    /// Keep `buffer` if it already has the requested dimensions, otherwise replace it
    /// with a blank one. Returns true when a reallocation happened.
    pub fn resize_if_needed(buffer: &mut Option<PixelBuffer>, width: usize, height: usize) -> bool {
        match buffer {
            Some(b) if b.width == width && b.height == height => false,
            _ => {
                *buffer = Some(PixelBuffer::blank(width, height));
                true
            }
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn same_size(&self, other: &PixelBuffer) -> bool {
        self.width == other.width && self.height == other.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    #[inline]
    fn offset(&self, col: usize, row: usize) -> Option<usize> {
        if col >= self.width || row >= self.height {
            return None;
        }
        Some((row * self.width + col) * 4)
    }

    /// `(r, g, b, a)` at the given raster position, `None` outside the buffer.
    pub fn pixel(&self, col: usize, row: usize) -> Option<[u8; 4]> {
        let i = self.offset(col, row)?;
        Some([self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]])
    }

    /// Write one pixel; writes outside the buffer are ignored.
    pub fn set_pixel(&mut self, col: usize, row: usize, rgba: [u8; 4]) {
        if let Some(i) = self.offset(col, row) {
            self.data[i..i + 4].copy_from_slice(&rgba);
        }
    }

    pub fn red(&self, col: usize, row: usize) -> Option<u8> {
        self.offset(col, row).map(|i| self.data[i])
    }

    pub fn green(&self, col: usize, row: usize) -> Option<u8> {
        self.offset(col, row).map(|i| self.data[i + 1])
    }

    pub fn blue(&self, col: usize, row: usize) -> Option<u8> {
        self.offset(col, row).map(|i| self.data[i + 2])
    }

    pub fn alpha(&self, col: usize, row: usize) -> Option<u8> {
        self.offset(col, row).map(|i| self.data[i + 3])
    }

    /// Pack into `0x00RRGGBB` words for minifb, reusing `out`.
    pub fn write_0rgb(&self, out: &mut Vec<u32>) {
        out.clear();
        out.extend(self.data.chunks_exact(4).map(|px| {
            ((px[0] as u32) << 16) | ((px[1] as u32) << 8) | px[2] as u32
        }));
    }
}

/// What the window shows: one `0x00RRGGBB` word per pixel, as minifb wants it.
#[derive(Clone, Debug, Default)]
pub struct FrameBuffer {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u32>,
}

impl FrameBuffer {
    /// Replace the contents with `src`, taking its dimensions.
    pub fn fill_from(&mut self, src: &PixelBuffer) {
        self.width = src.width();
        self.height = src.height();
        src.write_0rgb(&mut self.pixels);
    }
}
