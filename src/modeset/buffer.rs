use alloc::sync::Weak;
use core::slice;

use super::FramebufferId;

/// Pixel layouts this crate knows how to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 32 bits per pixel, 8 bits per channel, top byte unused.
    Xrgb8888,
}

impl PixelFormat {
    #[inline]
    pub const fn bpp(self) -> u32 {
        match self {
            PixelFormat::Xrgb8888 => 32,
        }
    }

    #[inline]
    pub const fn depth(self) -> u32 {
        match self {
            PixelFormat::Xrgb8888 => 24,
        }
    }

    /// Encode an opaque color as one pixel in this format.
    pub fn pixel(self, color: Rgb) -> [u8; 4] {
        match self {
            // Little-endian, so the bytes in memory are B, G, R, X.
            PixelFormat::Xrgb8888 => [color.b, color.g, color.r, 0xff],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const GREEN: Self = Self { r: 0, g: 0xff, b: 0 };
}

/// Anything that has been registered with the kernel as a framebuffer.
pub trait Framebuffer {
    fn framebuffer_id(&self) -> FramebufferId;
    fn width(&self) -> u32;
    fn height(&self) -> u32;
}

#[derive(Debug)]
pub struct DumbBufferRequest {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

/// A CPU-mapped "dumb buffer" with a framebuffer attached.
///
/// Dropping it unmaps the memory and, if the card is still open, removes
/// the framebuffer and frees the buffer.
#[derive(Debug)]
pub struct DumbBuffer {
    pub(crate) ptr: *mut u8,
    pub(crate) len: usize,
    pub(crate) file: Weak<linux_io::File<crate::ioctl::DrmCardDevice>>,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) format: PixelFormat,
    pub(crate) pitch: u32,
    pub(crate) fb_id: FramebufferId,
    pub(crate) buffer_handle: u32,
}

impl DumbBuffer {
    fn buffer_mut(&mut self) -> &mut [u8] {
        unsafe { slice::from_raw_parts_mut(self.ptr, self.len) }
    }

    /// Paint every visible pixel with the same color.
    pub fn fill(&mut self, color: Rgb) {
        let pixel = self.format.pixel(color);
        let row_len = self.width as usize * pixel.len();
        let pitch = self.pitch as usize;
        let rows = self.height as usize;
        let data = self.buffer_mut();
        for row in data.chunks_mut(pitch).take(rows) {
            let visible = core::cmp::min(row_len, row.len());
            for px in row[..visible].chunks_exact_mut(pixel.len()) {
                px.copy_from_slice(&pixel);
            }
        }
    }
}

impl Framebuffer for DumbBuffer {
    fn framebuffer_id(&self) -> FramebufferId {
        self.fb_id
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

impl Drop for DumbBuffer {
    fn drop(&mut self) {
        let _ = unsafe { linux_unsafe::munmap(self.ptr as *mut _, self.len) };

        // If the associated file is still open then we'll also free the framebuffer and
        // dumb buffer. Otherwise closing the file lets the kernel free them for us.
        let Some(f) = self.file.upgrade() else {
            return;
        };
        {
            let mut fb_id = self.fb_id.0;
            let _ = f.ioctl(crate::ioctl::DRM_IOCTL_MODE_RMFB, &mut fb_id);
        }
        {
            let mut msg = crate::ioctl::DrmModeDestroyDumb::zeroed();
            msg.handle = self.buffer_handle;
            let _ = f.ioctl(crate::ioctl::DRM_IOCTL_MODE_DESTROY_DUMB, &mut msg);
        }
    }
}
