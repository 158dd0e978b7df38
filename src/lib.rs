//! Plane blending diagnostics for Linux DRM devices.
//!
//! The interesting part is discovery: property ids are assigned by the
//! driver and have to be looked up by name on every run, mode blobs have to
//! be duplicated before the kernel can free them, and plane types are
//! enum-valued properties with their own name table. [`topology::Topology`]
//! does all of that and produces a snapshot of every connector, CRTC and
//! plane, which [`blend::BlendSweep`] then drives.
#![cfg_attr(not(test), no_std)]

extern crate alloc;

use alloc::sync::Arc;
use alloc::vec::Vec;

pub mod blend;
pub mod catalog;
pub mod device;
pub mod harness;
/// Low-level `ioctl`-based access to DRM devices.
pub mod ioctl;
pub mod mirror;
pub mod modeset;
pub mod report;
pub mod result;
pub mod topology;

#[cfg(test)]
pub(crate) mod fake;
mod util;

use device::{ModesetDevice, PlaneUpdate};
use modeset::{
    BlobId, CardResources, ConnectorId, CrtcId, DumbBuffer, DumbBufferRequest, FramebufferId,
    ModeProp, ObjectId, PixelFormat, PlaneId, PropertyId, PropertyMeta, PropertyType, Rgb,
};
use result::{Error, InitError};
use util::{vec_filled, Cleanup};

/// An open DRM card device.
pub struct Card {
    f: Arc<linux_io::File<ioctl::DrmCardDevice>>,
}

impl Card {
    pub fn open(path: &core::ffi::CStr) -> Result<Self, InitError> {
        let f = linux_io::File::open(path, linux_io::OpenOptions::read_write())?;
        Self::from_file(f)
    }

    pub fn from_file<D>(f: linux_io::File<D>) -> Result<Self, InitError> {
        // We'll use the VERSION ioctl to decide whether this file
        // seems to be a DRM card device. To do that we need to
        // first optimistically convert it to a DrmCardDevice,
        // so that our ioctl constant will be compatible.
        // Safety: We'll return this new f only if our ioctl
        // probe is successful, which therefore suggests that
        // this ought to be a DRM card device.
        let f: linux_io::File<ioctl::DrmCardDevice> = unsafe { f.to_device(ioctl::DrmCardDevice) };
        let mut v = ioctl::DrmVersion::zeroed();
        f.ioctl(ioctl::DRM_IOCTL_VERSION, &mut v)?;
        Ok(Self { f: Arc::new(f) })
    }

    /// Claim exclusive control of the device's modesetting state.
    pub fn become_master(&mut self) -> Result<(), Error> {
        self.f.ioctl(ioctl::DRM_IOCTL_SET_MASTER, ())?;
        Ok(())
    }

    pub fn driver_name(&self) -> Result<Vec<u8>, Error> {
        let mut v = ioctl::DrmVersion::zeroed();
        self.f.ioctl(ioctl::DRM_IOCTL_VERSION, &mut v)?;
        let len = v.name_len();
        let mut name = vec_filled(len, 0_u8)?;

        let mut v = ioctl::DrmVersion::zeroed();
        unsafe { v.set_name_ptr(name.as_mut_ptr() as *mut i8, len) };
        self.f.ioctl(ioctl::DRM_IOCTL_VERSION, &mut v)?;
        name.truncate(v.name_len());
        Ok(name)
    }

    pub fn set_client_cap(&self, capability: ioctl::DrmClientCap, value: u64) -> Result<(), Error> {
        let msg = ioctl::DrmSetClientCap { capability, value };
        self.f.ioctl(ioctl::DRM_IOCTL_SET_CLIENT_CAP, &msg)?;
        Ok(())
    }

    pub fn create_dumb_buffer(&self, req: DumbBufferRequest) -> Result<DumbBuffer, Error> {
        let mut buf_req = ioctl::DrmModeCreateDumb::zeroed();
        buf_req.width = req.width;
        buf_req.height = req.height;
        buf_req.bpp = req.format.bpp();
        self.f.ioctl(ioctl::DRM_IOCTL_MODE_CREATE_DUMB, &mut buf_req)?;
        let buffer_handle = buf_req.handle;

        let mut cleanup_db = Cleanup::new(|| {
            let mut msg = ioctl::DrmModeDestroyDumb::zeroed();
            msg.handle = buffer_handle;
            let _ = self.f.ioctl(ioctl::DRM_IOCTL_MODE_DESTROY_DUMB, &mut msg);
        });

        let mut fb_req = ioctl::DrmModeFbCmd::zeroed();
        fb_req.width = req.width;
        fb_req.height = req.height;
        fb_req.bpp = req.format.bpp();
        fb_req.depth = req.format.depth();
        fb_req.pitch = buf_req.pitch;
        fb_req.handle = buffer_handle;
        self.f.ioctl(ioctl::DRM_IOCTL_MODE_ADDFB, &mut fb_req)?;
        let fb_id = fb_req.fb_id;

        let mut cleanup_fb = Cleanup::new(|| {
            let mut fb_id = fb_id;
            let _ = self.f.ioctl(ioctl::DRM_IOCTL_MODE_RMFB, &mut fb_id);
        });

        let mut map_req = ioctl::DrmModeMapDumb::zeroed();
        map_req.handle = buffer_handle;
        self.f.ioctl(ioctl::DRM_IOCTL_MODE_MAP_DUMB, &mut map_req)?;

        let len = buf_req.size as usize;
        let ptr = unsafe {
            self.f.mmap_raw(
                map_req.offset as _,
                len,
                core::ptr::null_mut(),
                0b11, // PROT_READ | PROT_WRITE
                0x01, // MAP_SHARED
            )
        }? as *mut u8;

        // From here on the DumbBuffer's Drop takes care of everything.
        cleanup_fb.cancel();
        cleanup_db.cancel();
        Ok(DumbBuffer {
            ptr,
            len,
            file: Arc::downgrade(&self.f),
            width: req.width,
            height: req.height,
            format: req.format,
            pitch: buf_req.pitch,
            fb_id: FramebufferId(fb_id),
            buffer_handle,
        })
    }

    fn plane_ids(&self) -> Result<Vec<PlaneId>, Error> {
        loop {
            let mut tmp = ioctl::DrmModeGetPlaneRes::zeroed();
            self.f.ioctl(ioctl::DRM_IOCTL_MODE_GETPLANERESOURCES, &mut tmp)?;
            let count = tmp.count_planes() as usize;

            let mut ids = vec_filled(count, 0_u32)?;
            let mut tmp = ioctl::DrmModeGetPlaneRes::zeroed();
            unsafe { tmp.set_plane_id_ptr(ids.as_mut_ptr(), count as u32) };
            self.f.ioctl(ioctl::DRM_IOCTL_MODE_GETPLANERESOURCES, &mut tmp)?;
            if tmp.count_planes() as usize != count {
                // A plane appeared or vanished between the two requests.
                continue;
            }
            return Ok(ids.into_iter().map(PlaneId).collect());
        }
    }

    fn enum_members(
        &self,
        prop_id: PropertyId,
        mut count: usize,
    ) -> Result<Vec<modeset::EnumMember>, Error> {
        loop {
            let mut raw = vec_filled(count, ioctl::DrmModePropertyEnum::zeroed())?;

            let mut tmp = ioctl::DrmModeGetProperty::zeroed();
            tmp.prop_id = prop_id.0;
            unsafe { tmp.set_enum_blob_ptr(raw.as_mut_ptr(), count as u32) };
            self.f.ioctl(ioctl::DRM_IOCTL_MODE_GETPROPERTY, &mut tmp)?;

            let new_count = tmp.count_enum_blobs() as usize;
            if new_count != count {
                count = new_count;
                continue;
            }
            return Ok(raw
                .iter()
                .map(|e| modeset::EnumMember {
                    value: e.value,
                    name: modeset::name_from_raw(&e.name),
                })
                .collect());
        }
    }
}

impl ModesetDevice for Card {
    type Framebuffer = DumbBuffer;

    fn enable_atomic(&self) -> Result<(), Error> {
        self.set_client_cap(ioctl::DRM_CLIENT_CAP_UNIVERSAL_PLANES, 1)?;
        self.set_client_cap(ioctl::DRM_CLIENT_CAP_ATOMIC, 1)
    }

    fn resources(&self) -> Result<CardResources, Error> {
        loop {
            let mut tmp = ioctl::DrmModeCardRes::zeroed();
            self.f.ioctl(ioctl::DRM_IOCTL_MODE_GETRESOURCES, &mut tmp)?;
            let crtc_count = tmp.count_crtcs() as usize;
            let connector_count = tmp.count_connectors() as usize;

            let mut crtc_ids = vec_filled(crtc_count, 0_u32)?;
            let mut connector_ids = vec_filled(connector_count, 0_u32)?;
            let mut tmp = ioctl::DrmModeCardRes::zeroed();
            unsafe {
                tmp.set_crtc_id_ptr(crtc_ids.as_mut_ptr(), crtc_count as u32);
                tmp.set_connector_id_ptr(connector_ids.as_mut_ptr(), connector_count as u32);
            }
            self.f.ioctl(ioctl::DRM_IOCTL_MODE_GETRESOURCES, &mut tmp)?;
            if tmp.count_crtcs() as usize != crtc_count
                || tmp.count_connectors() as usize != connector_count
            {
                // Connectors can be hotplugged between the two requests.
                continue;
            }

            return Ok(CardResources {
                crtc_ids: crtc_ids.into_iter().map(CrtcId).collect(),
                connector_ids: connector_ids.into_iter().map(ConnectorId).collect(),
                plane_ids: self.plane_ids()?,
            });
        }
    }

    fn plane_possible_crtcs(&self, plane_id: PlaneId) -> Result<u32, Error> {
        let mut tmp = ioctl::DrmModeGetPlane::zeroed();
        tmp.plane_id = plane_id.0;
        self.f.ioctl(ioctl::DRM_IOCTL_MODE_GETPLANE, &mut tmp)?;
        Ok(tmp.possible_crtcs)
    }

    fn connector_mode_count(&self, connector_id: ConnectorId) -> Result<u32, Error> {
        let mut tmp = ioctl::DrmModeGetConnector::zeroed();
        tmp.connector_id = connector_id.0;
        self.f.ioctl(ioctl::DRM_IOCTL_MODE_GETCONNECTOR, &mut tmp)?;
        Ok(tmp.count_modes())
    }

    fn object_properties(&self, obj: ObjectId) -> Result<Vec<ModeProp>, Error> {
        let (obj_type, obj_id) = obj.as_raw_type_and_id();
        loop {
            let mut tmp = ioctl::DrmModeObjGetProperties::zeroed();
            tmp.obj_id = obj_id;
            tmp.obj_type = obj_type;
            self.f.ioctl(ioctl::DRM_IOCTL_MODE_OBJ_GETPROPERTIES, &mut tmp)?;
            let count = tmp.count_props() as usize;

            let mut ids = vec_filled(count, 0_u32)?;
            let mut values = vec_filled(count, 0_u64)?;
            let mut tmp = ioctl::DrmModeObjGetProperties::zeroed();
            tmp.obj_id = obj_id;
            tmp.obj_type = obj_type;
            unsafe { tmp.set_prop_ptrs(ids.as_mut_ptr(), values.as_mut_ptr(), count as u32) };
            self.f.ioctl(ioctl::DRM_IOCTL_MODE_OBJ_GETPROPERTIES, &mut tmp)?;
            if tmp.count_props() as usize != count {
                continue;
            }

            return Ok(core::iter::zip(ids, values)
                .map(|(id, value)| ModeProp {
                    prop_id: PropertyId(id),
                    value,
                })
                .collect());
        }
    }

    fn property_meta(&self, prop_id: PropertyId) -> Result<PropertyMeta, Error> {
        let mut tmp = ioctl::DrmModeGetProperty::zeroed();
        tmp.prop_id = prop_id.0;
        self.f.ioctl(ioctl::DRM_IOCTL_MODE_GETPROPERTY, &mut tmp)?;

        let (typ, immutable) = PropertyType::from_raw_flags(tmp.flags);
        let enum_members = if typ.is_enum_valued() {
            self.enum_members(prop_id, tmp.count_enum_blobs() as usize)?
        } else {
            Vec::new()
        };
        Ok(PropertyMeta {
            id: prop_id,
            name: modeset::name_from_raw(&tmp.name),
            typ,
            immutable,
            enum_members,
        })
    }

    fn property_blob(&self, blob_id: BlobId) -> Result<Vec<u8>, Error> {
        let mut tmp = ioctl::DrmModeGetBlob::zeroed();
        tmp.blob_id = blob_id.0;
        self.f.ioctl(ioctl::DRM_IOCTL_MODE_GETPROPBLOB, &mut tmp)?;
        let len = tmp.length() as usize;

        let mut data = vec_filled(len, 0_u8)?;
        let mut tmp = ioctl::DrmModeGetBlob::zeroed();
        tmp.blob_id = blob_id.0;
        unsafe { tmp.set_data(data.as_mut_ptr(), len as u32) };
        self.f.ioctl(ioctl::DRM_IOCTL_MODE_GETPROPBLOB, &mut tmp)?;
        if tmp.length() as usize != len {
            // Blobs are immutable, so this means the id was reused.
            return Err(Error::RemoteFailure);
        }
        Ok(data)
    }

    fn new_property_blob(&self, data: &[u8]) -> Result<BlobId, Error> {
        let mut tmp = ioctl::DrmModeCreateBlob::zeroed();
        unsafe { tmp.set_data(data.as_ptr(), data.len() as u32) };
        self.f.ioctl(ioctl::DRM_IOCTL_MODE_CREATEPROPBLOB, &mut tmp)?;
        Ok(BlobId(tmp.blob_id))
    }

    fn destroy_property_blob(&self, blob_id: BlobId) -> Result<(), Error> {
        let mut tmp = ioctl::DrmModeDestroyBlob { blob_id: blob_id.0 };
        self.f.ioctl(ioctl::DRM_IOCTL_MODE_DESTROYPROPBLOB, &mut tmp)?;
        Ok(())
    }

    fn set_object_property(
        &self,
        obj: ObjectId,
        prop_id: PropertyId,
        value: u64,
    ) -> Result<(), Error> {
        let (obj_type, obj_id) = obj.as_raw_type_and_id();
        let mut tmp = ioctl::DrmModeObjSetProperty {
            value,
            prop_id: prop_id.0,
            obj_id,
            obj_type,
        };
        self.f.ioctl(ioctl::DRM_IOCTL_MODE_OBJ_SETPROPERTY, &mut tmp)?;
        Ok(())
    }

    fn set_plane(&self, update: &PlaneUpdate) -> Result<(), Error> {
        let mut tmp = ioctl::DrmModeSetPlane::zeroed();
        tmp.plane_id = update.plane_id.0;
        tmp.crtc_id = update.crtc_id.0;
        tmp.fb_id = update.fb_id.0;
        tmp.crtc_x = update.dst.x;
        tmp.crtc_y = update.dst.y;
        tmp.crtc_w = update.dst.w;
        tmp.crtc_h = update.dst.h;
        tmp.src_x = update.src.x;
        tmp.src_y = update.src.y;
        tmp.src_w = update.src.w;
        tmp.src_h = update.src.h;
        self.f.ioctl(ioctl::DRM_IOCTL_MODE_SETPLANE, &mut tmp)?;
        Ok(())
    }

    fn create_color_framebuffer(
        &self,
        width: u32,
        height: u32,
        format: PixelFormat,
        color: Rgb,
    ) -> Result<DumbBuffer, Error> {
        let mut buf = self.create_dumb_buffer(DumbBufferRequest {
            width,
            height,
            format,
        })?;
        buf.fill(color);
        Ok(buf)
    }
}
