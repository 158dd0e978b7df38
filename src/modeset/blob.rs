//! Handles for property blobs, split by who is responsible for them.
//!
//! A blob read from another object's property is only borrowed, while one
//! this process created is owned and must be destroyed exactly once.

use alloc::vec::Vec;
use core::fmt;
use core::marker::PhantomData;

use crate::device::ModesetDevice;
use crate::result::{DeviceOp, Fault};

use super::BlobId;

/// A blob id just read from an object's property.
///
/// The kernel may free the blob as soon as anything replaces that property
/// value, so a borrowed blob lives only as long as the snapshot that
/// produced it. Call [`Self::duplicate`] to keep the contents around.
pub struct BorrowedBlob<'s, 'd, D: ModesetDevice + ?Sized> {
    device: &'d D,
    id: BlobId,
    _snapshot: PhantomData<&'s mut ()>,
}

impl<'s, 'd, D: ModesetDevice + ?Sized> BorrowedBlob<'s, 'd, D> {
    #[inline]
    pub(crate) fn new(device: &'d D, id: BlobId) -> Self {
        debug_assert!(!id.is_none());
        Self {
            device,
            id,
            _snapshot: PhantomData,
        }
    }

    #[inline(always)]
    pub fn id(&self) -> BlobId {
        self.id
    }

    pub fn read(&self) -> Result<Vec<u8>, Fault> {
        self.device
            .property_blob(self.id)
            .map_err(DeviceOp::GetBlob.fault())
    }

    /// Copy the blob's contents into a new blob owned by the caller.
    ///
    /// The new blob stays valid regardless of what happens to the source.
    pub fn duplicate(self) -> Result<OwnedBlob<'d, D>, Fault> {
        let data = self.read()?;
        let owned = OwnedBlob::create(self.device, &data)?;
        tracing::debug!(
            source = self.id.0,
            duplicate = owned.id().0,
            len = data.len(),
            "duplicated property blob"
        );
        Ok(owned)
    }
}

impl<'s, 'd, D: ModesetDevice + ?Sized> fmt::Debug for BorrowedBlob<'s, 'd, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BorrowedBlob").field(&self.id.0).finish()
    }
}

/// A handle for a property blob this process created.
///
/// The blob must be destroyed exactly once; use [`Self::release`] to do it
/// and observe failures. The [`Drop`] implementation destroys a blob that
/// was never released, logging a warning, so a handle can't leak the blob
/// even on early return.
pub struct OwnedBlob<'d, D: ModesetDevice + ?Sized> {
    device: &'d D,
    id: Option<BlobId>,
}

impl<'d, D: ModesetDevice + ?Sized> OwnedBlob<'d, D> {
    /// Create a new blob holding a copy of `data`.
    pub fn create(device: &'d D, data: &[u8]) -> Result<Self, Fault> {
        let id = device
            .new_property_blob(data)
            .map_err(DeviceOp::CreateBlob.fault())?;
        Ok(Self {
            device,
            id: Some(id),
        })
    }

    /// The blob's id, or [`BlobId::NONE`] once released.
    #[inline(always)]
    pub fn id(&self) -> BlobId {
        self.id.unwrap_or(BlobId::NONE)
    }

    pub fn read(&self) -> Result<Vec<u8>, Fault> {
        let Some(id) = self.id else {
            return Err(Fault::Device {
                op: DeviceOp::GetBlob,
                error: crate::result::Error::NonExist,
            });
        };
        self.device
            .property_blob(id)
            .map_err(DeviceOp::GetBlob.fault())
    }

    /// Consume the handle and destroy the underlying blob in the kernel.
    #[inline(always)]
    pub fn release(mut self) -> Result<(), Fault> {
        self.release_internal()
    }

    fn release_internal(&mut self) -> Result<(), Fault> {
        if let Some(id) = self.id.take() {
            self.device
                .destroy_property_blob(id)
                .map_err(DeviceOp::DestroyBlob.fault())?;
            tracing::debug!(blob = id.0, "released property blob");
        }
        Ok(())
    }
}

impl<'d, D: ModesetDevice + ?Sized> Drop for OwnedBlob<'d, D> {
    fn drop(&mut self) {
        if let Some(id) = self.id {
            tracing::warn!(blob = id.0, "property blob dropped without release");
        }
        if let Err(e) = self.release_internal() {
            tracing::warn!(error = %e, "failed to release property blob");
        }
    }
}

impl<'d, D: ModesetDevice + ?Sized> fmt::Debug for OwnedBlob<'d, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OwnedBlob").field(&self.id().0).finish()
    }
}
