//! The set of device requests the rest of the crate is built on.
//!
//! [`crate::Card`] implements [`ModesetDevice`] with real DRM ioctl requests.
//! Everything above this layer only talks to the trait, so discovery and the
//! blend sweep can run against any implementation.

use alloc::vec::Vec;

use crate::ioctl::fixedu16_16;
use crate::modeset::{
    BlobId, CardResources, ConnectorId, CrtcId, Framebuffer, ModeProp, ObjectId, PixelFormat,
    PlaneId, PropertyId, PropertyMeta, Rgb,
};
use crate::result::Error;

/// Placement of a framebuffer on a plane, as used by [`ModesetDevice::set_plane`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneUpdate {
    pub plane_id: PlaneId,
    pub crtc_id: CrtcId,
    pub fb_id: crate::modeset::FramebufferId,
    pub dst: DestRect,
    pub src: SourceRect,
}

/// A rectangle in CRTC pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DestRect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

/// A rectangle in framebuffer pixels, in 16.16 fixed point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceRect {
    pub x: fixedu16_16,
    pub y: fixedu16_16,
    pub w: fixedu16_16,
    pub h: fixedu16_16,
}

impl SourceRect {
    /// The whole of a `width` by `height` framebuffer.
    pub fn full(width: u16, height: u16) -> Self {
        Self {
            x: fixedu16_16::from_u16(0),
            y: fixedu16_16::from_u16(0),
            w: fixedu16_16::from_u16(width),
            h: fixedu16_16::from_u16(height),
        }
    }
}

/// A DRM device that supports atomic modesetting properties.
///
/// Every method is a single blocking request.
pub trait ModesetDevice {
    type Framebuffer: Framebuffer;

    /// Ask the kernel to expose atomic properties and all plane types.
    fn enable_atomic(&self) -> Result<(), Error>;

    /// Connector, CRTC and plane ids, in the order the kernel reports them.
    fn resources(&self) -> Result<CardResources, Error>;

    /// Bitmask of CRTC indices the plane can be attached to.
    fn plane_possible_crtcs(&self, plane_id: PlaneId) -> Result<u32, Error>;

    /// Number of modes the connector advertises.
    fn connector_mode_count(&self, connector_id: ConnectorId) -> Result<u32, Error>;

    fn object_properties(&self, obj: ObjectId) -> Result<Vec<ModeProp>, Error>;

    fn property_meta(&self, prop_id: PropertyId) -> Result<PropertyMeta, Error>;

    fn property_blob(&self, blob_id: BlobId) -> Result<Vec<u8>, Error>;

    fn new_property_blob(&self, data: &[u8]) -> Result<BlobId, Error>;

    fn destroy_property_blob(&self, blob_id: BlobId) -> Result<(), Error>;

    fn set_object_property(
        &self,
        obj: ObjectId,
        prop_id: PropertyId,
        value: u64,
    ) -> Result<(), Error>;

    fn set_plane(&self, update: &PlaneUpdate) -> Result<(), Error>;

    /// Allocate a framebuffer filled with a single opaque color.
    fn create_color_framebuffer(
        &self,
        width: u32,
        height: u32,
        format: PixelFormat,
        color: Rgb,
    ) -> Result<Self::Framebuffer, Error>;
}
