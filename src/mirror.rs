//! Snapshots of individual connectors, CRTCs and planes.
//!
//! Each state borrows the device so it can re-read itself with `refresh`
//! or, for planes, apply changes. A refresh is a single property query
//! whose (id, value) pairs are matched through a [`PropertyCatalog`].

use alloc::vec::Vec;

use crate::catalog::{
    ConnectorProp, CrtcProp, EnumCatalog, PlaneProp, PlaneType, PropertyCatalog, PropertyName,
};
use crate::device::{DestRect, ModesetDevice, PlaneUpdate, SourceRect};
use crate::ioctl::fixedu16_16;
use crate::modeset::{
    AsRawPropertyValue, BlobId, BorrowedBlob, ConnectorId, CrtcId, Framebuffer, FramebufferId,
    ModeInfo, OwnedBlob, PlaneId, MODE_INFO_LEN,
};
use crate::result::{DeviceOp, Fault, Schema};

pub struct ConnectorState<'d, D: ModesetDevice + ?Sized> {
    device: &'d D,
    id: ConnectorId,
    crtc_id: CrtcId,
    mode_count: u32,
}

impl<'d, D: ModesetDevice + ?Sized> ConnectorState<'d, D> {
    pub fn snapshot(
        device: &'d D,
        id: ConnectorId,
        catalog: &PropertyCatalog<ConnectorProp>,
    ) -> Result<Self, Fault> {
        let mut ret = Self {
            device,
            id,
            crtc_id: CrtcId(0),
            mode_count: 0,
        };
        ret.refresh(catalog)?;
        ret.mode_count = device
            .connector_mode_count(id)
            .map_err(DeviceOp::GetConnector.fault())?;
        tracing::debug!(
            connector = id.0,
            crtc = ret.crtc_id.0,
            modes = ret.mode_count,
            "connector snapshot"
        );
        Ok(ret)
    }

    pub fn refresh(&mut self, catalog: &PropertyCatalog<ConnectorProp>) -> Result<(), Fault> {
        let props = self
            .device
            .object_properties(self.id.into())
            .map_err(DeviceOp::GetProperties.fault())?;
        for prop in props {
            match catalog.lookup(prop.prop_id) {
                Some(ConnectorProp::CrtcId) => self.crtc_id = CrtcId(prop.value as u32),
                None => {}
            }
        }
        Ok(())
    }

    #[inline(always)]
    pub fn id(&self) -> ConnectorId {
        self.id
    }

    /// The CRTC driving this connector, or id zero when nothing does.
    #[inline(always)]
    pub fn crtc_id(&self) -> CrtcId {
        self.crtc_id
    }

    #[inline(always)]
    pub fn is_routed(&self) -> bool {
        self.crtc_id.0 != 0
    }

    #[inline(always)]
    pub fn mode_count(&self) -> u32 {
        self.mode_count
    }
}

/// A CRTC along with its own copy of the mode it was showing.
pub struct CrtcState<'d, D: ModesetDevice + ?Sized> {
    device: &'d D,
    id: CrtcId,
    index: usize,
    active: bool,
    background_color: Option<u64>,
    mode: Option<OwnedBlob<'d, D>>,
    mode_data: Vec<u8>,
}

impl<'d, D: ModesetDevice + ?Sized> CrtcState<'d, D> {
    /// Read the CRTC's state and take ownership of a duplicate of its mode
    /// blob before anything else can replace it.
    pub fn snapshot(
        device: &'d D,
        id: CrtcId,
        index: usize,
        catalog: &PropertyCatalog<CrtcProp>,
    ) -> Result<Self, Fault> {
        let mut ret = Self {
            device,
            id,
            index,
            active: false,
            background_color: None,
            mode: None,
            mode_data: Vec::new(),
        };
        ret.sync_mode(catalog)?;
        tracing::debug!(
            crtc = id.0,
            index,
            active = ret.active,
            mode_blob = ret.mode_id().0,
            "CRTC snapshot"
        );
        Ok(ret)
    }

    /// Re-read the CRTC's properties.
    ///
    /// Returns the blob currently named by `MODE_ID` along with its
    /// validated contents. The blob is only guaranteed to exist until this
    /// state is touched again, and the cached mode is left alone so that it
    /// keeps matching the blob this state owns.
    pub(crate) fn refresh<'s>(
        &'s mut self,
        catalog: &PropertyCatalog<CrtcProp>,
    ) -> Result<Option<(BorrowedBlob<'s, 'd, D>, Vec<u8>)>, Fault> {
        let props = self
            .device
            .object_properties(self.id.into())
            .map_err(DeviceOp::GetProperties.fault())?;

        let mut mode_blob = BlobId::NONE;
        for prop in props {
            match catalog.lookup(prop.prop_id) {
                Some(CrtcProp::Active) => self.active = prop.value != 0,
                Some(CrtcProp::ModeId) => mode_blob = BlobId(prop.value as u32),
                Some(CrtcProp::BackgroundColor) => self.background_color = Some(prop.value),
                None => {}
            }
        }

        if mode_blob.is_none() {
            return Ok(None);
        }

        let data = self
            .device
            .property_blob(mode_blob)
            .map_err(DeviceOp::GetBlob.fault())?;
        if data.len() != MODE_INFO_LEN {
            return Err(Fault::SchemaMismatch(Schema::ModeBlobLength {
                crtc: self.id,
                blob: mode_blob,
                len: data.len(),
                expected: MODE_INFO_LEN,
            }));
        }
        Ok(Some((BorrowedBlob::new(self.device, mode_blob), data)))
    }

    /// Re-read the CRTC and replace the owned mode blob with a fresh
    /// duplicate of whatever `MODE_ID` names now.
    ///
    /// The cached mode record changes only together with the owned blob.
    pub fn sync_mode(&mut self, catalog: &PropertyCatalog<CrtcProp>) -> Result<(), Fault> {
        let (owned, data) = match self.refresh(catalog)? {
            Some((blob, data)) => (Some(blob.duplicate()?), data),
            None => (None, Vec::new()),
        };
        if data != self.mode_data {
            self.mode_data = data;
        }
        self.adopt_mode(owned)
    }

    /// Take ownership of `mode`, releasing any blob held before.
    fn adopt_mode(&mut self, mode: Option<OwnedBlob<'d, D>>) -> Result<(), Fault> {
        let previous = core::mem::replace(&mut self.mode, mode);
        match previous {
            Some(blob) => blob.release(),
            None => Ok(()),
        }
    }

    /// Destroy the owned mode blob, if any.
    pub fn release_mode(&mut self) -> Result<(), Fault> {
        self.mode_data.clear();
        self.adopt_mode(None)
    }

    #[inline(always)]
    pub fn id(&self) -> CrtcId {
        self.id
    }

    /// Position in the device's CRTC list, as used by plane CRTC masks.
    #[inline(always)]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline(always)]
    pub fn active(&self) -> bool {
        self.active
    }

    #[inline(always)]
    pub fn background_color(&self) -> Option<u64> {
        self.background_color
    }

    /// The id of the blob this state owns, or [`BlobId::NONE`].
    pub fn mode_id(&self) -> BlobId {
        self.mode.as_ref().map_or(BlobId::NONE, OwnedBlob::id)
    }

    pub fn owned_mode(&self) -> Option<&OwnedBlob<'d, D>> {
        self.mode.as_ref()
    }

    /// Raw mode record bytes; empty when no mode is set.
    #[inline(always)]
    pub fn mode_data(&self) -> &[u8] {
        &self.mode_data
    }

    pub fn mode_info(&self) -> Option<ModeInfo> {
        ModeInfo::from_blob(&self.mode_data)
    }
}

pub struct PlaneState<'d, D: ModesetDevice + ?Sized> {
    device: &'d D,
    id: PlaneId,
    plane_type: PlaneType,
    possible_crtcs: u32,
    crtc_id: CrtcId,
    fb_id: FramebufferId,
    src: SourceRect,
    dst: DestRect,
    blend_func: Option<u64>,
    blend_color: Option<u64>,
}

impl<'d, D: ModesetDevice + ?Sized> PlaneState<'d, D> {
    pub fn snapshot(
        device: &'d D,
        id: PlaneId,
        catalog: &PropertyCatalog<PlaneProp>,
        types: &EnumCatalog<PlaneType>,
    ) -> Result<Self, Fault> {
        let possible_crtcs = device
            .plane_possible_crtcs(id)
            .map_err(DeviceOp::GetPlane.fault())?;
        let mut ret = Self {
            device,
            id,
            plane_type: PlaneType::Unknown(0),
            possible_crtcs,
            crtc_id: CrtcId(0),
            fb_id: FramebufferId(0),
            src: SourceRect::default(),
            dst: DestRect::default(),
            blend_func: None,
            blend_color: None,
        };
        ret.refresh(catalog, types)?;
        tracing::debug!(
            plane = id.0,
            typ = %ret.plane_type,
            possible_crtcs,
            crtc = ret.crtc_id.0,
            fb = ret.fb_id.0,
            "plane snapshot"
        );
        Ok(ret)
    }

    pub fn refresh(
        &mut self,
        catalog: &PropertyCatalog<PlaneProp>,
        types: &EnumCatalog<PlaneType>,
    ) -> Result<(), Fault> {
        let props = self
            .device
            .object_properties(self.id.into())
            .map_err(DeviceOp::GetProperties.fault())?;
        for prop in props {
            let v = prop.value;
            let Some(key) = catalog.lookup(prop.prop_id) else {
                continue;
            };
            match key {
                PlaneProp::SrcX => self.src.x = fixedu16_16::from_raw_u32(v as u32),
                PlaneProp::SrcY => self.src.y = fixedu16_16::from_raw_u32(v as u32),
                PlaneProp::SrcW => self.src.w = fixedu16_16::from_raw_u32(v as u32),
                PlaneProp::SrcH => self.src.h = fixedu16_16::from_raw_u32(v as u32),
                // Signed range values arrive sign-extended to 64 bits.
                PlaneProp::CrtcX => self.dst.x = v as i64 as i32,
                PlaneProp::CrtcY => self.dst.y = v as i64 as i32,
                PlaneProp::CrtcW => self.dst.w = v as u32,
                PlaneProp::CrtcH => self.dst.h = v as u32,
                PlaneProp::FbId => self.fb_id = FramebufferId(v as u32),
                PlaneProp::CrtcId => self.crtc_id = CrtcId(v as u32),
                PlaneProp::Type => {
                    self.plane_type = types.decode(v).unwrap_or(PlaneType::Unknown(v))
                }
                PlaneProp::BlendFunc => self.blend_func = Some(v),
                PlaneProp::BlendColor => self.blend_color = Some(v),
            }
        }
        Ok(())
    }

    /// Write a single property of this plane.
    ///
    /// The snapshot isn't updated; call [`Self::refresh`] to observe the
    /// result.
    pub fn set_property(
        &self,
        catalog: &PropertyCatalog<PlaneProp>,
        key: PlaneProp,
        value: impl AsRawPropertyValue,
    ) -> Result<(), Fault> {
        let prop_id = catalog.require(key)?;
        let raw = value.as_raw_property_value();
        self.device
            .set_object_property(self.id.into(), prop_id, raw)
            .map_err(|error| Fault::WriteRejected {
                object: self.id.into(),
                property: key.name(),
                error,
            })?;
        tracing::debug!(plane = self.id.0, property = key.name(), value = raw, "set property");
        Ok(())
    }

    /// Show all of `fb` on `crtc` at `dst`.
    pub fn attach<F: Framebuffer + ?Sized>(
        &self,
        crtc: CrtcId,
        fb: &F,
        dst: DestRect,
    ) -> Result<(), Fault> {
        let src = SourceRect::full(
            u16::try_from(fb.width()).unwrap_or(u16::MAX),
            u16::try_from(fb.height()).unwrap_or(u16::MAX),
        );
        let update = PlaneUpdate {
            plane_id: self.id,
            crtc_id: crtc,
            fb_id: fb.framebuffer_id(),
            dst,
            src,
        };
        self.device
            .set_plane(&update)
            .map_err(|error| Fault::WriteRejected {
                object: self.id.into(),
                property: PlaneProp::FbId.name(),
                error,
            })?;
        tracing::debug!(
            plane = self.id.0,
            crtc = crtc.0,
            fb = update.fb_id.0,
            "attached framebuffer"
        );
        Ok(())
    }

    /// Whether this plane may be used with the CRTC at `crtc_index`.
    pub fn can_attach(&self, crtc_index: usize) -> bool {
        crtc_index < 32 && self.possible_crtcs & (1 << crtc_index) != 0
    }

    #[inline(always)]
    pub fn id(&self) -> PlaneId {
        self.id
    }

    #[inline(always)]
    pub fn plane_type(&self) -> PlaneType {
        self.plane_type
    }

    #[inline(always)]
    pub fn possible_crtcs(&self) -> u32 {
        self.possible_crtcs
    }

    #[inline(always)]
    pub fn crtc_id(&self) -> CrtcId {
        self.crtc_id
    }

    #[inline(always)]
    pub fn fb_id(&self) -> FramebufferId {
        self.fb_id
    }

    #[inline(always)]
    pub fn src(&self) -> SourceRect {
        self.src
    }

    #[inline(always)]
    pub fn dst(&self) -> DestRect {
        self.dst
    }

    #[inline(always)]
    pub fn blend_func(&self) -> Option<u64> {
        self.blend_func
    }

    #[inline(always)]
    pub fn blend_color(&self) -> Option<u64> {
        self.blend_color
    }
}
