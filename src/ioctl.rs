use core::ffi::c_int as int;
use core::ffi::c_ulong as ulong;

use linux_io::fd::ioctl::{
    ioctl_no_arg, ioctl_write, ioctl_writeread, IoDevice, IoctlReqNoArgs, IoctlReqWrite,
    IoctlReqWriteRead,
};

/// Device type marker for DRM card files, so that only the ioctl requests
/// declared in this module can be issued against them.
pub struct DrmCardDevice;

impl IoDevice for DrmCardDevice {}

const DRM_IOCTL_BASE: ulong = 100;

#[allow(non_snake_case)]
const fn _IO(nr: ulong) -> ulong {
    linux_io::fd::ioctl::_IO(DRM_IOCTL_BASE, nr)
}

#[allow(non_snake_case)]
const fn _IOW<T>(nr: ulong) -> ulong {
    linux_io::fd::ioctl::_IOW(DRM_IOCTL_BASE, nr, core::mem::size_of::<T>() as _)
}

#[allow(non_snake_case)]
const fn _IOWR<T>(nr: ulong) -> ulong {
    linux_io::fd::ioctl::_IOWR(DRM_IOCTL_BASE, nr, core::mem::size_of::<T>() as _)
}

/// Fixed-point unsigned 16.16-bit number type, represented as [`u32`].
///
/// Plane source rectangles are expressed in this format.
#[allow(non_camel_case_types)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct fixedu16_16(u32);

impl fixedu16_16 {
    #[inline(always)]
    pub const fn from_u16(v: u16) -> Self {
        Self((v as u32) << 16)
    }

    #[inline(always)]
    pub const fn from_raw_u32(raw: u32) -> Self {
        Self(raw)
    }

    /// The integer part, discarding the fraction.
    #[inline(always)]
    pub const fn whole(self) -> u16 {
        (self.0 >> 16) as u16
    }
}

macro_rules! impl_zeroed {
    ($t:ty) => {
        impl $t {
            #[inline(always)]
            pub const fn zeroed() -> Self {
                // Safety: All of the field types in $t must
                // treat all-zeroes as a valid bit pattern.
                unsafe { ::core::mem::zeroed() }
            }
        }

        /// The default value is the result of [`Self::zeroed`].
        impl ::core::default::Default for $t {
            #[inline(always)]
            fn default() -> Self {
                Self::zeroed()
            }
        }
    };
}

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct DrmVersion {
    pub version_major: int,
    pub version_minor: int,
    pub version_patchlevel: int,
    name_len: usize,
    name: *mut i8,
    date_len: usize,
    date: *mut i8,
    desc_len: usize,
    desc: *mut i8,
}

impl_zeroed!(DrmVersion);

impl DrmVersion {
    /// # Safety
    ///
    /// `ptr` must point to at least `len` writable bytes that remain valid
    /// for any ioctl call using this object.
    #[inline(always)]
    pub unsafe fn set_name_ptr(&mut self, ptr: *mut i8, len: usize) {
        self.name = ptr;
        self.name_len = len;
    }

    #[inline(always)]
    pub fn name_len(&self) -> usize {
        self.name_len
    }
}

pub const DRM_IOCTL_VERSION: IoctlReqWriteRead<DrmCardDevice, DrmVersion, int> =
    unsafe { ioctl_writeread(_IOWR::<DrmVersion>(0x00)) };

pub const DRM_IOCTL_SET_MASTER: IoctlReqNoArgs<DrmCardDevice, int> =
    unsafe { ioctl_no_arg(_IO(0x1e)) };

#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct DrmSetClientCap {
    pub capability: DrmClientCap,
    pub value: u64,
}

impl_zeroed!(DrmSetClientCap);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct DrmClientCap(pub u64);

pub const DRM_IOCTL_SET_CLIENT_CAP: IoctlReqWrite<DrmCardDevice, DrmSetClientCap, int> =
    unsafe { ioctl_write(_IOW::<DrmSetClientCap>(0x0d)) };

/// Expose all planes (overlay, primary and cursor) to userspace.
pub const DRM_CLIENT_CAP_UNIVERSAL_PLANES: DrmClientCap = DrmClientCap(2);

/// Expose atomic properties to userspace. Implies universal planes.
pub const DRM_CLIENT_CAP_ATOMIC: DrmClientCap = DrmClientCap(3);

#[repr(C)]
#[derive(Debug)]
pub struct DrmModeCardRes {
    fb_id_ptr: u64,
    crtc_id_ptr: u64,
    connector_id_ptr: u64,
    encoder_id_ptr: u64,
    count_fbs: u32,
    count_crtcs: u32,
    count_connectors: u32,
    count_encoders: u32,
    pub min_width: u32,
    pub max_width: u32,
    pub min_height: u32,
    pub max_height: u32,
}

impl_zeroed!(DrmModeCardRes);

impl DrmModeCardRes {
    /// # Safety
    ///
    /// `ptr` must point to an array of at least `len` `u32` values.
    #[inline(always)]
    pub unsafe fn set_crtc_id_ptr(&mut self, ptr: *mut u32, len: u32) {
        self.crtc_id_ptr = ptr as u64;
        self.count_crtcs = len;
    }

    #[inline(always)]
    pub fn count_crtcs(&self) -> u32 {
        self.count_crtcs
    }

    /// # Safety
    ///
    /// `ptr` must point to an array of at least `len` `u32` values.
    #[inline(always)]
    pub unsafe fn set_connector_id_ptr(&mut self, ptr: *mut u32, len: u32) {
        self.connector_id_ptr = ptr as u64;
        self.count_connectors = len;
    }

    #[inline(always)]
    pub fn count_connectors(&self) -> u32 {
        self.count_connectors
    }
}

pub const DRM_IOCTL_MODE_GETRESOURCES: IoctlReqWriteRead<DrmCardDevice, DrmModeCardRes, int> =
    unsafe { ioctl_writeread(_IOWR::<DrmModeCardRes>(0xa0)) };

/// The kernel's `drm_mode_modeinfo`, which is also the exact payload of a
/// CRTC's `MODE_ID` blob.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct DrmModeInfo {
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
    pub name: [u8; DRM_DISPLAY_MODE_LEN],
}

impl_zeroed!(DrmModeInfo);

pub const DRM_DISPLAY_MODE_LEN: usize = 32;

#[repr(C)]
#[derive(Debug)]
pub struct DrmModeGetConnector {
    encoders_ptr: u64,
    modes_ptr: u64,
    props_ptr: u64,
    prop_values_ptr: u64,
    count_modes: u32,
    count_props: u32,
    count_encoders: u32,
    pub encoder_id: u32,
    pub connector_id: u32,
    pub connector_type: u32,
    pub connector_type_id: u32,
    pub connection: u32,
    pub mm_width: u32,
    pub mm_height: u32,
    pub subpixel: u32,
    #[doc(hidden)]
    pub _pad: u32,
}

impl_zeroed!(DrmModeGetConnector);

impl DrmModeGetConnector {
    #[inline(always)]
    pub fn count_modes(&self) -> u32 {
        self.count_modes
    }
}

pub const DRM_IOCTL_MODE_GETCONNECTOR: IoctlReqWriteRead<DrmCardDevice, DrmModeGetConnector, int> =
    unsafe { ioctl_writeread(_IOWR::<DrmModeGetConnector>(0xa7)) };

#[repr(C)]
#[derive(Debug)]
pub struct DrmModeCreateDumb {
    pub height: u32,
    pub width: u32,
    pub bpp: u32,
    pub flags: u32,
    pub handle: u32,
    pub pitch: u32,
    pub size: u64,
}

impl_zeroed!(DrmModeCreateDumb);

pub const DRM_IOCTL_MODE_CREATE_DUMB: IoctlReqWriteRead<DrmCardDevice, DrmModeCreateDumb, int> =
    unsafe { ioctl_writeread(_IOWR::<DrmModeCreateDumb>(0xb2)) };

#[repr(C)]
#[derive(Debug)]
pub struct DrmModeMapDumb {
    pub handle: u32,
    pub pad: u32,
    pub offset: u64,
}

impl_zeroed!(DrmModeMapDumb);

pub const DRM_IOCTL_MODE_MAP_DUMB: IoctlReqWriteRead<DrmCardDevice, DrmModeMapDumb, int> =
    unsafe { ioctl_writeread(_IOWR::<DrmModeMapDumb>(0xb3)) };

#[repr(C)]
#[derive(Debug)]
pub struct DrmModeDestroyDumb {
    pub handle: u32,
}

impl_zeroed!(DrmModeDestroyDumb);

pub const DRM_IOCTL_MODE_DESTROY_DUMB: IoctlReqWriteRead<DrmCardDevice, DrmModeDestroyDumb, int> =
    unsafe { ioctl_writeread(_IOWR::<DrmModeDestroyDumb>(0xb4)) };

#[repr(C)]
#[derive(Debug)]
pub struct DrmModeFbCmd {
    pub fb_id: u32,
    pub width: u32,
    pub height: u32,
    pub pitch: u32,
    pub bpp: u32,
    pub depth: u32,
    pub handle: u32,
}

impl_zeroed!(DrmModeFbCmd);

pub const DRM_IOCTL_MODE_ADDFB: IoctlReqWriteRead<DrmCardDevice, DrmModeFbCmd, int> =
    unsafe { ioctl_writeread(_IOWR::<DrmModeFbCmd>(0xae)) };

pub const DRM_IOCTL_MODE_RMFB: IoctlReqWriteRead<DrmCardDevice, linux_unsafe::uint, int> =
    unsafe { ioctl_writeread(_IOWR::<linux_unsafe::uint>(0xaf)) };

#[repr(C)]
#[derive(Debug)]
pub struct DrmModeObjGetProperties {
    props_ptr: u64,
    prop_values_ptr: u64,
    count_props: u32,
    pub obj_id: u32,
    pub obj_type: u32,
}

impl_zeroed!(DrmModeObjGetProperties);

impl DrmModeObjGetProperties {
    /// # Safety
    ///
    /// `ids_ptr` and `values_ptr` must each point to arrays of at least
    /// `len` elements that remain valid for any ioctl call using this object.
    pub unsafe fn set_prop_ptrs(&mut self, ids_ptr: *mut u32, values_ptr: *mut u64, len: u32) {
        self.props_ptr = ids_ptr as u64;
        self.prop_values_ptr = values_ptr as u64;
        self.count_props = len;
    }

    pub fn count_props(&self) -> u32 {
        self.count_props
    }
}

pub const DRM_IOCTL_MODE_OBJ_GETPROPERTIES: IoctlReqWriteRead<
    DrmCardDevice,
    DrmModeObjGetProperties,
    int,
> = unsafe { ioctl_writeread(_IOWR::<DrmModeObjGetProperties>(0xb9)) };

#[repr(C)]
#[derive(Debug)]
pub struct DrmModeObjSetProperty {
    pub value: u64,
    pub prop_id: u32,
    pub obj_id: u32,
    pub obj_type: u32,
}

impl_zeroed!(DrmModeObjSetProperty);

pub const DRM_IOCTL_MODE_OBJ_SETPROPERTY: IoctlReqWriteRead<
    DrmCardDevice,
    DrmModeObjSetProperty,
    int,
> = unsafe { ioctl_writeread(_IOWR::<DrmModeObjSetProperty>(0xba)) };

pub const DRM_MODE_OBJECT_CRTC: u32 = 0xcccccccc;
pub const DRM_MODE_OBJECT_CONNECTOR: u32 = 0xc0c0c0c0;
pub const DRM_MODE_OBJECT_PLANE: u32 = 0xeeeeeeee;

#[repr(C)]
#[derive(Debug)]
pub struct DrmModeGetPlaneRes {
    plane_id_ptr: u64,
    count_planes: u32,
}

impl_zeroed!(DrmModeGetPlaneRes);

impl DrmModeGetPlaneRes {
    /// # Safety
    ///
    /// `ptr` must point to an array of at least `len` `u32` values.
    #[inline(always)]
    pub unsafe fn set_plane_id_ptr(&mut self, ptr: *mut u32, len: u32) {
        self.plane_id_ptr = ptr as u64;
        self.count_planes = len;
    }

    #[inline(always)]
    pub fn count_planes(&self) -> u32 {
        self.count_planes
    }
}

pub const DRM_IOCTL_MODE_GETPLANERESOURCES: IoctlReqWriteRead<
    DrmCardDevice,
    DrmModeGetPlaneRes,
    int,
> = unsafe { ioctl_writeread(_IOWR::<DrmModeGetPlaneRes>(0xb5)) };

#[repr(C)]
#[derive(Debug)]
pub struct DrmModeGetPlane {
    pub plane_id: u32,
    pub crtc_id: u32,
    pub fb_id: u32,
    pub possible_crtcs: u32,
    pub gamma_size: u32,
    count_format_types: u32,
    format_type_ptr: u64,
}

impl_zeroed!(DrmModeGetPlane);

pub const DRM_IOCTL_MODE_GETPLANE: IoctlReqWriteRead<DrmCardDevice, DrmModeGetPlane, int> =
    unsafe { ioctl_writeread(_IOWR::<DrmModeGetPlane>(0xb6)) };

#[repr(C)]
#[derive(Debug)]
pub struct DrmModeSetPlane {
    pub plane_id: u32,
    pub crtc_id: u32,
    pub fb_id: u32,
    pub flags: u32,

    pub crtc_x: i32,
    pub crtc_y: i32,
    pub crtc_w: u32,
    pub crtc_h: u32,

    // The kernel orders these height-before-width.
    pub src_x: fixedu16_16,
    pub src_y: fixedu16_16,
    pub src_h: fixedu16_16,
    pub src_w: fixedu16_16,
}

impl_zeroed!(DrmModeSetPlane);

pub const DRM_IOCTL_MODE_SETPLANE: IoctlReqWriteRead<DrmCardDevice, DrmModeSetPlane, int> =
    unsafe { ioctl_writeread(_IOWR::<DrmModeSetPlane>(0xb7)) };

#[repr(C)]
#[derive(Debug, Clone)]
pub struct DrmModeGetProperty {
    values_ptr: u64,
    enum_blob_ptr: u64,
    pub prop_id: u32,
    pub flags: u32,
    pub name: [u8; DRM_PROP_NAME_LEN],
    count_values: u32,
    count_enum_blobs: u32,
}

impl_zeroed!(DrmModeGetProperty);

impl DrmModeGetProperty {
    /// Set the `enum_blob_ptr` and `count_enum_blobs` fields.
    ///
    /// # Safety
    ///
    /// `ptr` must point to an array of `DrmModePropertyEnum` with at least
    /// length `len`, and that pointer must remain valid throughout any
    /// subsequent ioctl calls using this object.
    #[inline(always)]
    pub unsafe fn set_enum_blob_ptr(&mut self, ptr: *mut DrmModePropertyEnum, len: u32) {
        self.enum_blob_ptr = ptr as u64;
        self.count_enum_blobs = len;
    }

    #[inline(always)]
    pub fn count_enum_blobs(&self) -> u32 {
        self.count_enum_blobs
    }
}

#[repr(C)]
#[derive(Debug, Clone)]
pub struct DrmModePropertyEnum {
    pub value: u64,
    pub name: [u8; DRM_PROP_NAME_LEN],
}

impl_zeroed!(DrmModePropertyEnum);

/// Userspace is expected to issue this request at least twice: once with
/// zero counts to learn how many enum members there are, and then again
/// with a buffer of that size.
pub const DRM_IOCTL_MODE_GETPROPERTY: IoctlReqWriteRead<DrmCardDevice, DrmModeGetProperty, int> =
    unsafe { ioctl_writeread(_IOWR::<DrmModeGetProperty>(0xaa)) };

pub const DRM_PROP_NAME_LEN: usize = 32;

pub const DRM_MODE_PROP_RANGE: u32 = 1 << 1;
pub const DRM_MODE_PROP_IMMUTABLE: u32 = 1 << 2;
pub const DRM_MODE_PROP_ENUM: u32 = 1 << 3;
pub const DRM_MODE_PROP_BLOB: u32 = 1 << 4;
pub const DRM_MODE_PROP_BITMASK: u32 = 1 << 5;
pub const DRM_MODE_PROP_LEGACY_TYPE: u32 =
    DRM_MODE_PROP_RANGE | DRM_MODE_PROP_ENUM | DRM_MODE_PROP_BLOB | DRM_MODE_PROP_BITMASK;
pub const DRM_MODE_PROP_EXTENDED_TYPE: u32 = 0x0000ffc0;
pub const DRM_MODE_PROP_OBJECT: u32 = DRM_MODE_PROP_TYPE(1);
pub const DRM_MODE_PROP_SIGNED_RANGE: u32 = DRM_MODE_PROP_TYPE(2);

#[allow(non_snake_case)]
#[inline(always)]
pub const fn DRM_MODE_PROP_TYPE(n: u32) -> u32 {
    n << 6
}

#[repr(C)]
#[derive(Debug)]
pub struct DrmModeGetBlob {
    pub blob_id: u32,
    length: u32,
    data: u64,
}

impl_zeroed!(DrmModeGetBlob);

impl DrmModeGetBlob {
    /// Set the `data` and `length` fields.
    ///
    /// # Safety
    ///
    /// `ptr` must point to at least `len` writable bytes, and that pointer
    /// must remain valid throughout any subsequent ioctl calls using this
    /// object.
    #[inline(always)]
    pub unsafe fn set_data(&mut self, ptr: *mut u8, len: u32) {
        self.data = ptr as u64;
        self.length = len;
    }

    /// After a request, the actual size of the blob in bytes.
    #[inline(always)]
    pub fn length(&self) -> u32 {
        self.length
    }
}

/// Like [`DRM_IOCTL_MODE_GETPROPERTY`], this is a two-step request: the
/// first call with a zero length reports the blob's size.
pub const DRM_IOCTL_MODE_GETPROPBLOB: IoctlReqWriteRead<DrmCardDevice, DrmModeGetBlob, int> =
    unsafe { ioctl_writeread(_IOWR::<DrmModeGetBlob>(0xac)) };

#[repr(C)]
#[derive(Debug)]
pub struct DrmModeCreateBlob {
    data: u64,
    length: u32,
    pub blob_id: u32,
}

impl_zeroed!(DrmModeCreateBlob);

impl DrmModeCreateBlob {
    /// Set the `data` and `length` fields.
    ///
    /// # Safety
    ///
    /// `ptr` must point to the start of an array of bytes of length `len`,
    /// and that pointer must remain valid throughout any subsequent ioctl
    /// calls using this object.
    pub unsafe fn set_data(&mut self, ptr: *const u8, len: u32) {
        self.data = ptr as u64;
        self.length = len;
    }
}

pub const DRM_IOCTL_MODE_CREATEPROPBLOB: IoctlReqWriteRead<DrmCardDevice, DrmModeCreateBlob, int> =
    unsafe { ioctl_writeread(_IOWR::<DrmModeCreateBlob>(0xbd)) };

#[repr(C)]
#[derive(Debug)]
pub struct DrmModeDestroyBlob {
    pub blob_id: u32,
}

impl_zeroed!(DrmModeDestroyBlob);

pub const DRM_IOCTL_MODE_DESTROYPROPBLOB: IoctlReqWriteRead<
    DrmCardDevice,
    DrmModeDestroyBlob,
    int,
> = unsafe { ioctl_writeread(_IOWR::<DrmModeDestroyBlob>(0xbe)) };
