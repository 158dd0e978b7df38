use alloc::vec::Vec;
use core::fmt;

mod blend;
mod blob;
mod buffer;
mod props;

pub use blend::*;
pub use blob::*;
pub use buffer::*;
pub use props::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct FramebufferId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct CrtcId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ConnectorId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PlaneId(pub u32);

/// Identifies a property. The kernel allocates these per device, so they
/// must be looked up by name every time the device is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct PropertyId(pub u32);

/// Identifies a property blob. Zero means "no blob".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct BlobId(pub u32);

impl BlobId {
    pub const NONE: Self = Self(0);

    #[inline(always)]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

/// The kinds of object whose properties this crate reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectKind {
    Connector,
    Crtc,
    Plane,
}

impl ObjectKind {
    pub const fn as_raw_type(self) -> u32 {
        use crate::ioctl;
        match self {
            ObjectKind::Connector => ioctl::DRM_MODE_OBJECT_CONNECTOR,
            ObjectKind::Crtc => ioctl::DRM_MODE_OBJECT_CRTC,
            ObjectKind::Plane => ioctl::DRM_MODE_OBJECT_PLANE,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ObjectKind::Connector => "connector",
            ObjectKind::Crtc => "CRTC",
            ObjectKind::Plane => "plane",
        })
    }
}

/// A property-bearing modesetting object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectId {
    Connector(ConnectorId),
    Crtc(CrtcId),
    Plane(PlaneId),
}

impl ObjectId {
    pub const fn kind(self) -> ObjectKind {
        match self {
            ObjectId::Connector(_) => ObjectKind::Connector,
            ObjectId::Crtc(_) => ObjectKind::Crtc,
            ObjectId::Plane(_) => ObjectKind::Plane,
        }
    }

    pub const fn raw_id(self) -> u32 {
        match self {
            ObjectId::Connector(id) => id.0,
            ObjectId::Crtc(id) => id.0,
            ObjectId::Plane(id) => id.0,
        }
    }

    pub const fn as_raw_type_and_id(self) -> (u32, u32) {
        (self.kind().as_raw_type(), self.raw_id())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.kind(), self.raw_id())
    }
}

impl From<ConnectorId> for ObjectId {
    fn from(value: ConnectorId) -> Self {
        Self::Connector(value)
    }
}

impl From<CrtcId> for ObjectId {
    fn from(value: CrtcId) -> Self {
        Self::Crtc(value)
    }
}

impl From<PlaneId> for ObjectId {
    fn from(value: PlaneId) -> Self {
        Self::Plane(value)
    }
}

/// One (property, value) pair as reported for an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeProp {
    pub prop_id: PropertyId,
    pub value: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardResources {
    pub crtc_ids: Vec<CrtcId>,
    pub connector_ids: Vec<ConnectorId>,
    pub plane_ids: Vec<PlaneId>,
}

/// Size of the kernel's mode record, which is also the only valid length of
/// a `MODE_ID` blob.
pub const MODE_INFO_LEN: usize = core::mem::size_of::<crate::ioctl::DrmModeInfo>();

/// A decoded display mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeInfo {
    pub name: Vec<u8>,
    pub clock: u32,
    pub hdisplay: u16,
    pub hsync_start: u16,
    pub hsync_end: u16,
    pub htotal: u16,
    pub hskew: u16,
    pub vdisplay: u16,
    pub vsync_start: u16,
    pub vsync_end: u16,
    pub vtotal: u16,
    pub vscan: u16,
    pub vrefresh: u32,
    pub flags: u32,
    pub typ: u32,
}

impl ModeInfo {
    /// Decode the payload of a `MODE_ID` blob, which must be exactly
    /// [`MODE_INFO_LEN`] bytes long.
    pub fn from_blob(data: &[u8]) -> Option<Self> {
        if data.len() != MODE_INFO_LEN {
            return None;
        }
        // Safety: the length matches and every bit pattern is a valid
        // DrmModeInfo, since it contains only integers.
        let raw = unsafe {
            core::ptr::read_unaligned(data.as_ptr() as *const crate::ioctl::DrmModeInfo)
        };
        Some(raw.into())
    }

    /// Encode this mode as the payload of a `MODE_ID` blob.
    pub fn to_blob(&self) -> Vec<u8> {
        let raw = crate::ioctl::DrmModeInfo::from(self);
        // Safety: DrmModeInfo is repr(C) with no padding, so all of its
        // MODE_INFO_LEN bytes are initialized.
        let bytes = unsafe {
            core::slice::from_raw_parts(&raw as *const _ as *const u8, MODE_INFO_LEN)
        };
        bytes.to_vec()
    }

    pub fn name_lossy(&self) -> &str {
        core::str::from_utf8(&self.name).unwrap_or("?")
    }
}

impl From<crate::ioctl::DrmModeInfo> for ModeInfo {
    fn from(value: crate::ioctl::DrmModeInfo) -> Self {
        let name = value.name.split(|c| *c == 0).next().unwrap_or(&[]);
        Self {
            name: name.to_vec(),
            clock: value.clock,
            hdisplay: value.hdisplay,
            hsync_start: value.hsync_start,
            hsync_end: value.hsync_end,
            htotal: value.htotal,
            hskew: value.hskew,
            vdisplay: value.vdisplay,
            vsync_start: value.vsync_start,
            vsync_end: value.vsync_end,
            vtotal: value.vtotal,
            vscan: value.vscan,
            vrefresh: value.vrefresh,
            flags: value.flags,
            typ: value.typ,
        }
    }
}

impl From<&ModeInfo> for crate::ioctl::DrmModeInfo {
    fn from(value: &ModeInfo) -> Self {
        let mut name = [0_u8; crate::ioctl::DRM_DISPLAY_MODE_LEN];
        // Always leave room for the terminating NUL.
        let name_len = core::cmp::min(name.len() - 1, value.name.len());
        name[..name_len].copy_from_slice(&value.name[..name_len]);
        Self {
            clock: value.clock,
            hdisplay: value.hdisplay,
            hsync_start: value.hsync_start,
            hsync_end: value.hsync_end,
            htotal: value.htotal,
            hskew: value.hskew,
            vdisplay: value.vdisplay,
            vsync_start: value.vsync_start,
            vsync_end: value.vsync_end,
            vtotal: value.vtotal,
            vscan: value.vscan,
            vrefresh: value.vrefresh,
            flags: value.flags,
            typ: value.typ,
            name,
        }
    }
}

impl fmt::Display for ModeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}x{}@{}Hz)",
            self.name_lossy(),
            self.hdisplay,
            self.vdisplay,
            self.vrefresh
        )
    }
}
