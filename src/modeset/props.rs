use alloc::string::String;
use alloc::vec::Vec;

use super::PropertyId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
#[repr(u32)]
pub enum PropertyType {
    Unknown = 0,
    Range = crate::ioctl::DRM_MODE_PROP_RANGE,
    Enum = crate::ioctl::DRM_MODE_PROP_ENUM,
    Blob = crate::ioctl::DRM_MODE_PROP_BLOB,
    Bitmask = crate::ioctl::DRM_MODE_PROP_BITMASK,
    Object = crate::ioctl::DRM_MODE_PROP_OBJECT,
    SignedRange = crate::ioctl::DRM_MODE_PROP_SIGNED_RANGE,
}

impl PropertyType {
    pub fn from_raw_flags(flags: u32) -> (Self, bool) {
        let immutable = (flags & crate::ioctl::DRM_MODE_PROP_IMMUTABLE) != 0;
        let type_raw = flags
            & (crate::ioctl::DRM_MODE_PROP_LEGACY_TYPE | crate::ioctl::DRM_MODE_PROP_EXTENDED_TYPE);
        let typ = match type_raw {
            crate::ioctl::DRM_MODE_PROP_RANGE => Self::Range,
            crate::ioctl::DRM_MODE_PROP_ENUM => Self::Enum,
            crate::ioctl::DRM_MODE_PROP_BLOB => Self::Blob,
            crate::ioctl::DRM_MODE_PROP_BITMASK => Self::Bitmask,
            crate::ioctl::DRM_MODE_PROP_OBJECT => Self::Object,
            crate::ioctl::DRM_MODE_PROP_SIGNED_RANGE => Self::SignedRange,
            _ => Self::Unknown,
        };
        (typ, immutable)
    }

    #[inline]
    pub fn is_enum_valued(self) -> bool {
        matches!(self, Self::Enum | Self::Bitmask)
    }
}

/// Everything this crate needs to know about a property: its name, its
/// type, and for enum-typed properties the table of named values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyMeta {
    pub id: PropertyId,
    pub name: String,
    pub typ: PropertyType,
    pub immutable: bool,
    pub enum_members: Vec<EnumMember>,
}

impl PropertyMeta {
    /// Find the numeric value of the enum member with the given name.
    pub fn enum_value(&self, name: &str) -> Option<u64> {
        self.enum_members
            .iter()
            .find(|member| member.name == name)
            .map(|member| member.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    pub value: u64,
    pub name: String,
}

/// Decode a NUL-padded name field from a kernel struct.
///
/// The kernel only uses ASCII in property and enum names, so anything that
/// isn't valid UTF-8 is replaced rather than rejected.
pub(crate) fn name_from_raw(raw: &[u8]) -> String {
    let raw = raw.split(|c| *c == 0).next().unwrap_or(&[]);
    String::from_utf8_lossy(raw).into_owned()
}

/// Trait implemented by types that can be used as raw property values.
///
/// For types that represent references to other objects already known by
/// the kernel, such as property blobs, the caller must keep the original
/// object live for as long as the result is being used in requests to the
/// kernel.
pub trait AsRawPropertyValue {
    fn as_raw_property_value(&self) -> u64;
}

macro_rules! trivial_as_property_value {
    ($t:ty) => {
        impl AsRawPropertyValue for $t {
            #[inline(always)]
            fn as_raw_property_value(&self) -> u64 {
                *self as u64
            }
        }
    };
}

trivial_as_property_value!(u64);
trivial_as_property_value!(u32);
trivial_as_property_value!(u16);
trivial_as_property_value!(u8);
trivial_as_property_value!(bool);

impl AsRawPropertyValue for super::FramebufferId {
    #[inline(always)]
    fn as_raw_property_value(&self) -> u64 {
        self.0 as u64
    }
}

impl AsRawPropertyValue for super::CrtcId {
    #[inline(always)]
    fn as_raw_property_value(&self) -> u64 {
        self.0 as u64
    }
}
