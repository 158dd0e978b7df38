use core::fmt;

use crate::modeset::{BlobId, CrtcId, ObjectId, ObjectKind};

/// An error reported by the kernel for a single DRM request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    Invalid,
    NonExist,
    SystemMem,
    GraphicsMem,
    Permission,
    Disconnected,
    NotSupported,
    RemoteFailure,
    Died,
    Other(linux_io::result::Error),
}

impl From<linux_io::result::Error> for Error {
    fn from(value: linux_io::result::Error) -> Self {
        match value {
            linux_io::result::EINVAL => Self::Invalid,
            linux_io::result::ENOENT => Self::NonExist,
            linux_io::result::ENOMEM => Self::SystemMem,
            linux_io::result::ENOSPC => Self::SystemMem,
            linux_io::result::EPERM | linux_io::result::EACCES => Self::Permission,
            linux_io::result::ENODEV => Self::Disconnected,
            linux_io::result::EOPNOTSUPP => Self::NotSupported,
            linux_io::result::ENXIO => Self::RemoteFailure,
            linux_io::result::EIO => Self::Died,
            _ => Self::Other(value),
        }
    }
}

impl From<Error> for linux_io::result::Error {
    fn from(value: Error) -> Self {
        match value {
            Error::Invalid => linux_io::result::EINVAL,
            Error::NonExist => linux_io::result::ENOENT,
            Error::SystemMem => linux_io::result::ENOMEM,
            Error::GraphicsMem => linux_io::result::ENOSPC,
            Error::Permission => linux_io::result::EPERM,
            Error::Disconnected => linux_io::result::ENODEV,
            Error::NotSupported => linux_io::result::EOPNOTSUPP,
            Error::RemoteFailure => linux_io::result::ENXIO,
            Error::Died => linux_io::result::EIO,
            Error::Other(v) => v,
        }
    }
}

impl From<alloc::collections::TryReserveError> for Error {
    #[inline(always)]
    fn from(_: alloc::collections::TryReserveError) -> Self {
        Self::SystemMem
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Invalid => f.write_str("invalid argument"),
            Error::NonExist => f.write_str("no such object"),
            Error::SystemMem => f.write_str("out of system memory"),
            Error::GraphicsMem => f.write_str("out of graphics memory"),
            Error::Permission => f.write_str("permission denied"),
            Error::Disconnected => f.write_str("device disconnected"),
            Error::NotSupported => f.write_str("operation not supported"),
            Error::RemoteFailure => f.write_str("remote failure"),
            Error::Died => f.write_str("device died"),
            Error::Other(e) => write!(f, "errno {}", e.0),
        }
    }
}

impl core::error::Error for Error {}

#[derive(Debug)]
pub enum InitError {
    NotDrmCard,
    Other(linux_io::result::Error),
}

impl From<InitError> for linux_io::result::Error {
    fn from(value: InitError) -> Self {
        match value {
            InitError::NotDrmCard => linux_io::result::ENOTTY,
            InitError::Other(e) => e,
        }
    }
}

impl From<linux_io::result::Error> for InitError {
    fn from(value: linux_io::result::Error) -> Self {
        match value {
            // ENOTTY means the file doesn't support DRM ioctl requests at all.
            linux_io::result::ENOTTY => InitError::NotDrmCard,
            _ => InitError::Other(value),
        }
    }
}

/// A failure that stops topology discovery or a subtest.
///
/// Every variant is fatal for this tool; the binary turns any of them into
/// a non-zero exit status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fault {
    /// The device can't provide something the tool needs at all.
    ResourceUnavailable(Resource),
    /// The driver's property vocabulary or blob layout isn't what we expect.
    SchemaMismatch(Schema),
    /// The driver refused a property write or plane update.
    WriteRejected {
        object: ObjectId,
        property: &'static str,
        error: Error,
    },
    /// Any other device request failed.
    Device { op: DeviceOp, error: Error },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    AtomicModeset(Error),
    NoConnectors,
    NoCrtcs,
    NoPlanes,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Schema {
    MissingProperty {
        kind: ObjectKind,
        name: &'static str,
    },
    MissingEnumValue {
        kind: ObjectKind,
        property: &'static str,
        name: &'static str,
    },
    ModeBlobLength {
        crtc: CrtcId,
        blob: BlobId,
        len: usize,
        expected: usize,
    },
}

/// The device request that produced a [`Fault::Device`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceOp {
    GetResources,
    GetPlane,
    GetConnector,
    GetProperties,
    GetProperty,
    GetBlob,
    CreateBlob,
    DestroyBlob,
    CreateFramebuffer,
}

impl DeviceOp {
    /// Wrap a device error so it can be propagated with `?`.
    #[inline]
    pub fn fault(self) -> impl FnOnce(Error) -> Fault {
        move |error| Fault::Device { op: self, error }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::ResourceUnavailable(r) => match r {
                Resource::AtomicModeset(e) => {
                    write!(f, "driver does not support atomic modesetting: {e}")
                }
                Resource::NoConnectors => f.write_str("device has no connectors"),
                Resource::NoCrtcs => f.write_str("device has no CRTCs"),
                Resource::NoPlanes => f.write_str("device has no planes"),
            },
            Fault::SchemaMismatch(s) => match s {
                Schema::MissingProperty { kind, name } => {
                    write!(f, "{kind} has no property named {name:?}")
                }
                Schema::MissingEnumValue {
                    kind,
                    property,
                    name,
                } => write!(f, "{kind} property {property:?} has no value named {name:?}"),
                Schema::ModeBlobLength {
                    crtc,
                    blob,
                    len,
                    expected,
                } => write!(
                    f,
                    "mode blob #{} on CRTC #{} is {len} bytes, expected {expected}",
                    blob.0, crtc.0
                ),
            },
            Fault::WriteRejected {
                object,
                property,
                error,
            } => write!(f, "{object} rejected write to {property:?}: {error}"),
            Fault::Device { op, error } => write!(f, "{op:?} request failed: {error}"),
        }
    }
}

impl core::error::Error for Fault {}
