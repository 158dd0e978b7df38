//! An in-memory [`ModesetDevice`] for tests, which records every request.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::cell::RefCell;

use crate::device::{ModesetDevice, PlaneUpdate};
use crate::modeset::{
    BlobId, CardResources, ConnectorId, CrtcId, EnumMember, Framebuffer, FramebufferId, ModeInfo,
    ModeProp, ObjectId, PixelFormat, PlaneId, PropertyId, PropertyMeta, PropertyType, Rgb,
};
use crate::result::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    EnableAtomic,
    Resources,
    PossibleCrtcs(PlaneId),
    ModeCount(ConnectorId),
    ObjectProperties(ObjectId),
    PropertyMeta(PropertyId),
    GetBlob(BlobId),
    CreateBlob(BlobId),
    DestroyBlob(BlobId),
    SetProperty {
        object: ObjectId,
        prop: PropertyId,
        value: u64,
    },
    SetPlane(PlaneUpdate),
    CreateFramebuffer(FramebufferId),
}

#[derive(Debug)]
pub(crate) struct FakeFramebuffer {
    id: FramebufferId,
    width: u32,
    height: u32,
}

impl Framebuffer for FakeFramebuffer {
    fn framebuffer_id(&self) -> FramebufferId {
        self.id
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}

#[derive(Default)]
struct State {
    resources: CardResources,
    possible_crtcs: BTreeMap<PlaneId, u32>,
    mode_counts: BTreeMap<ConnectorId, u32>,
    props: BTreeMap<ObjectId, Vec<ModeProp>>,
    metas: BTreeMap<PropertyId, PropertyMeta>,
    blobs: BTreeMap<BlobId, Vec<u8>>,
    next_blob: u32,
    next_fb: u32,
    calls: Vec<Call>,
    fail_atomic: bool,
    fail_blob_creation: bool,
    reject_writes: bool,
}

pub(crate) struct FakeCard {
    state: RefCell<State>,
}

impl FakeCard {
    pub(crate) fn new() -> Self {
        Self {
            state: RefCell::new(State {
                next_blob: 1000,
                next_fb: 500,
                ..Default::default()
            }),
        }
    }

    pub(crate) fn insert_blob(&self, data: Vec<u8>) -> BlobId {
        let mut state = self.state.borrow_mut();
        let id = BlobId(state.next_blob);
        state.next_blob += 1;
        state.blobs.insert(id, data);
        id
    }

    pub(crate) fn blob_count(&self) -> usize {
        self.state.borrow().blobs.len()
    }

    pub(crate) fn define_property(
        &self,
        id: PropertyId,
        name: &str,
        typ: PropertyType,
        members: &[(u64, &str)],
    ) {
        let meta = PropertyMeta {
            id,
            name: name.into(),
            typ,
            immutable: false,
            enum_members: members
                .iter()
                .map(|&(value, name)| EnumMember {
                    value,
                    name: name.into(),
                })
                .collect(),
        };
        self.state.borrow_mut().metas.insert(id, meta);
    }

    pub(crate) fn attach_property(&self, object: ObjectId, prop_id: PropertyId, value: u64) {
        self.state
            .borrow_mut()
            .props
            .entry(object)
            .or_default()
            .push(ModeProp { prop_id, value });
    }

    pub(crate) fn remove_property(&self, object: ObjectId, prop_id: PropertyId) {
        if let Some(props) = self.state.borrow_mut().props.get_mut(&object) {
            props.retain(|p| p.prop_id != prop_id);
        }
    }

    /// Make property queries for `object` fail as if it had vanished.
    pub(crate) fn remove_object(&self, object: ObjectId) {
        self.state.borrow_mut().props.remove(&object);
    }

    /// Change a property value without recording a request.
    pub(crate) fn set_value(&self, object: ObjectId, prop_id: PropertyId, value: u64) {
        let mut state = self.state.borrow_mut();
        let prop = state
            .props
            .get_mut(&object)
            .and_then(|props| props.iter_mut().find(|p| p.prop_id == prop_id));
        if let Some(prop) = prop {
            prop.value = value;
        }
    }

    pub(crate) fn value(&self, object: ObjectId, prop_id: PropertyId) -> Option<u64> {
        self.state
            .borrow()
            .props
            .get(&object)?
            .iter()
            .find(|p| p.prop_id == prop_id)
            .map(|p| p.value)
    }

    pub(crate) fn set_resources(&self, resources: CardResources) {
        self.state.borrow_mut().resources = resources;
    }

    pub(crate) fn set_possible_crtcs(&self, plane: PlaneId, mask: u32) {
        self.state.borrow_mut().possible_crtcs.insert(plane, mask);
    }

    pub(crate) fn set_mode_count(&self, connector: ConnectorId, count: u32) {
        self.state.borrow_mut().mode_counts.insert(connector, count);
    }

    pub(crate) fn fail_atomic(&self) {
        self.state.borrow_mut().fail_atomic = true;
    }

    pub(crate) fn fail_blob_creation(&self) {
        self.state.borrow_mut().fail_blob_creation = true;
    }

    pub(crate) fn reject_property_writes(&self) {
        self.state.borrow_mut().reject_writes = true;
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub(crate) fn count_calls(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state.borrow().calls.iter().filter(|c| pred(c)).count()
    }

    pub(crate) fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl ModesetDevice for FakeCard {
    type Framebuffer = FakeFramebuffer;

    fn enable_atomic(&self) -> Result<(), Error> {
        self.record(Call::EnableAtomic);
        if self.state.borrow().fail_atomic {
            return Err(Error::NotSupported);
        }
        Ok(())
    }

    fn resources(&self) -> Result<CardResources, Error> {
        self.record(Call::Resources);
        Ok(self.state.borrow().resources.clone())
    }

    fn plane_possible_crtcs(&self, plane_id: PlaneId) -> Result<u32, Error> {
        self.record(Call::PossibleCrtcs(plane_id));
        self.state
            .borrow()
            .possible_crtcs
            .get(&plane_id)
            .copied()
            .ok_or(Error::NonExist)
    }

    fn connector_mode_count(&self, connector_id: ConnectorId) -> Result<u32, Error> {
        self.record(Call::ModeCount(connector_id));
        self.state
            .borrow()
            .mode_counts
            .get(&connector_id)
            .copied()
            .ok_or(Error::NonExist)
    }

    fn object_properties(&self, obj: ObjectId) -> Result<Vec<ModeProp>, Error> {
        self.record(Call::ObjectProperties(obj));
        self.state
            .borrow()
            .props
            .get(&obj)
            .cloned()
            .ok_or(Error::NonExist)
    }

    fn property_meta(&self, prop_id: PropertyId) -> Result<PropertyMeta, Error> {
        self.record(Call::PropertyMeta(prop_id));
        self.state
            .borrow()
            .metas
            .get(&prop_id)
            .cloned()
            .ok_or(Error::NonExist)
    }

    fn property_blob(&self, blob_id: BlobId) -> Result<Vec<u8>, Error> {
        self.record(Call::GetBlob(blob_id));
        self.state
            .borrow()
            .blobs
            .get(&blob_id)
            .cloned()
            .ok_or(Error::NonExist)
    }

    fn new_property_blob(&self, data: &[u8]) -> Result<BlobId, Error> {
        if self.state.borrow().fail_blob_creation {
            return Err(Error::SystemMem);
        }
        let id = self.insert_blob(data.to_vec());
        self.record(Call::CreateBlob(id));
        Ok(id)
    }

    fn destroy_property_blob(&self, blob_id: BlobId) -> Result<(), Error> {
        self.record(Call::DestroyBlob(blob_id));
        match self.state.borrow_mut().blobs.remove(&blob_id) {
            Some(_) => Ok(()),
            None => Err(Error::NonExist),
        }
    }

    fn set_object_property(
        &self,
        obj: ObjectId,
        prop_id: PropertyId,
        value: u64,
    ) -> Result<(), Error> {
        self.record(Call::SetProperty {
            object: obj,
            prop: prop_id,
            value,
        });
        if self.state.borrow().reject_writes || self.value(obj, prop_id).is_none() {
            return Err(Error::Invalid);
        }
        self.set_value(obj, prop_id, value);
        Ok(())
    }

    fn set_plane(&self, update: &PlaneUpdate) -> Result<(), Error> {
        self.record(Call::SetPlane(*update));
        Ok(())
    }

    fn create_color_framebuffer(
        &self,
        width: u32,
        height: u32,
        _format: PixelFormat,
        _color: Rgb,
    ) -> Result<FakeFramebuffer, Error> {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = FramebufferId(state.next_fb);
            state.next_fb += 1;
            id
        };
        self.record(Call::CreateFramebuffer(id));
        Ok(FakeFramebuffer { id, width, height })
    }
}

pub(crate) const CONNECTOR: ConnectorId = ConnectorId(40);
pub(crate) const CRTC_A: CrtcId = CrtcId(50);
pub(crate) const CRTC_B: CrtcId = CrtcId(51);
pub(crate) const PRIMARY_PLANE: PlaneId = PlaneId(60);
pub(crate) const OVERLAY_PLANE: PlaneId = PlaneId(61);
pub(crate) const CURSOR_PLANE: PlaneId = PlaneId(62);
pub(crate) const PRIMARY_FB: FramebufferId = FramebufferId(70);

pub(crate) const PROP_DPMS: PropertyId = PropertyId(2);
pub(crate) const PROP_TYPE: PropertyId = PropertyId(9);
pub(crate) const PROP_SRC_X: PropertyId = PropertyId(10);
pub(crate) const PROP_SRC_Y: PropertyId = PropertyId(11);
pub(crate) const PROP_SRC_W: PropertyId = PropertyId(12);
pub(crate) const PROP_SRC_H: PropertyId = PropertyId(13);
pub(crate) const PROP_CRTC_X: PropertyId = PropertyId(14);
pub(crate) const PROP_CRTC_Y: PropertyId = PropertyId(15);
pub(crate) const PROP_CRTC_W: PropertyId = PropertyId(16);
pub(crate) const PROP_FB_ID: PropertyId = PropertyId(17);
pub(crate) const PROP_CRTC_H: PropertyId = PropertyId(18);
pub(crate) const PROP_CRTC_ID: PropertyId = PropertyId(20);
pub(crate) const PROP_ACTIVE: PropertyId = PropertyId(22);
pub(crate) const PROP_MODE_ID: PropertyId = PropertyId(23);
pub(crate) const PROP_BACKGROUND: PropertyId = PropertyId(24);
pub(crate) const PROP_BLEND_FUNC: PropertyId = PropertyId(30);
pub(crate) const PROP_BLEND_COLOR: PropertyId = PropertyId(31);
pub(crate) const PROP_ROTATION: PropertyId = PropertyId(33);

/// Kernel values for the plane `type` enum.
pub(crate) const TYPE_OVERLAY: u64 = 0;
pub(crate) const TYPE_PRIMARY: u64 = 1;
pub(crate) const TYPE_CURSOR: u64 = 2;

pub(crate) fn mode_1080p() -> ModeInfo {
    ModeInfo {
        name: b"1920x1080".to_vec(),
        clock: 148500,
        hdisplay: 1920,
        hsync_start: 2008,
        hsync_end: 2052,
        htotal: 2200,
        hskew: 0,
        vdisplay: 1080,
        vsync_start: 1084,
        vsync_end: 1089,
        vtotal: 1125,
        vscan: 0,
        vrefresh: 60,
        flags: 0x5,
        typ: 0x48,
    }
}

/// One connector driven by an active CRTC showing a 1080p mode, a second
/// idle CRTC, and a primary, overlay and cursor plane.
pub(crate) fn scenario() -> FakeCard {
    let card = FakeCard::new();

    card.define_property(PROP_DPMS, "DPMS", PropertyType::Enum, &[(0, "On"), (3, "Off")]);
    card.define_property(PROP_CRTC_ID, "CRTC_ID", PropertyType::Object, &[]);
    card.define_property(PROP_ACTIVE, "ACTIVE", PropertyType::Range, &[]);
    card.define_property(PROP_MODE_ID, "MODE_ID", PropertyType::Blob, &[]);
    card.define_property(PROP_BACKGROUND, "background_color", PropertyType::Range, &[]);
    card.define_property(
        PROP_TYPE,
        "type",
        PropertyType::Enum,
        &[
            (TYPE_OVERLAY, "Overlay"),
            (TYPE_PRIMARY, "Primary"),
            (TYPE_CURSOR, "Cursor"),
        ],
    );
    card.define_property(PROP_SRC_X, "SRC_X", PropertyType::Range, &[]);
    card.define_property(PROP_SRC_Y, "SRC_Y", PropertyType::Range, &[]);
    card.define_property(PROP_SRC_W, "SRC_W", PropertyType::Range, &[]);
    card.define_property(PROP_SRC_H, "SRC_H", PropertyType::Range, &[]);
    card.define_property(PROP_CRTC_X, "CRTC_X", PropertyType::SignedRange, &[]);
    card.define_property(PROP_CRTC_Y, "CRTC_Y", PropertyType::SignedRange, &[]);
    card.define_property(PROP_CRTC_W, "CRTC_W", PropertyType::Range, &[]);
    card.define_property(PROP_CRTC_H, "CRTC_H", PropertyType::Range, &[]);
    card.define_property(PROP_FB_ID, "FB_ID", PropertyType::Object, &[]);
    card.define_property(PROP_BLEND_FUNC, "blend_func", PropertyType::Range, &[]);
    card.define_property(PROP_BLEND_COLOR, "blend_color", PropertyType::Range, &[]);
    card.define_property(
        PROP_ROTATION,
        "rotation",
        PropertyType::Bitmask,
        &[(0, "rotate-0"), (2, "rotate-180")],
    );

    card.set_resources(CardResources {
        crtc_ids: alloc::vec![CRTC_A, CRTC_B],
        connector_ids: alloc::vec![CONNECTOR],
        plane_ids: alloc::vec![PRIMARY_PLANE, OVERLAY_PLANE, CURSOR_PLANE],
    });

    card.attach_property(CONNECTOR.into(), PROP_DPMS, 0);
    card.attach_property(CONNECTOR.into(), PROP_CRTC_ID, CRTC_A.0 as u64);
    card.set_mode_count(CONNECTOR, 3);

    let mode = card.insert_blob(mode_1080p().to_blob());
    card.attach_property(CRTC_A.into(), PROP_ACTIVE, 1);
    card.attach_property(CRTC_A.into(), PROP_MODE_ID, mode.0 as u64);
    card.attach_property(CRTC_A.into(), PROP_BACKGROUND, 0);
    card.attach_property(CRTC_B.into(), PROP_ACTIVE, 0);
    card.attach_property(CRTC_B.into(), PROP_MODE_ID, 0);
    card.attach_property(CRTC_B.into(), PROP_BACKGROUND, 0);

    let planes = [
        (PRIMARY_PLANE, TYPE_PRIMARY, 0b01),
        (OVERLAY_PLANE, TYPE_OVERLAY, 0b11),
        (CURSOR_PLANE, TYPE_CURSOR, 0b01),
    ];
    for (plane, typ, mask) in planes {
        let obj = ObjectId::from(plane);
        let on_screen = plane == PRIMARY_PLANE;
        let (w, h) = if on_screen { (1920, 1080) } else { (0, 0) };
        card.attach_property(obj, PROP_TYPE, typ);
        card.attach_property(obj, PROP_FB_ID, if on_screen { PRIMARY_FB.0 as u64 } else { 0 });
        card.attach_property(obj, PROP_CRTC_ID, if on_screen { CRTC_A.0 as u64 } else { 0 });
        card.attach_property(obj, PROP_SRC_X, 0);
        card.attach_property(obj, PROP_SRC_Y, 0);
        card.attach_property(obj, PROP_SRC_W, w << 16);
        card.attach_property(obj, PROP_SRC_H, h << 16);
        card.attach_property(obj, PROP_CRTC_X, 0);
        card.attach_property(obj, PROP_CRTC_Y, 0);
        card.attach_property(obj, PROP_CRTC_W, w);
        card.attach_property(obj, PROP_CRTC_H, h);
        card.attach_property(obj, PROP_ROTATION, 0);
        card.attach_property(obj, PROP_BLEND_FUNC, 0x0001_0000);
        card.attach_property(obj, PROP_BLEND_COLOR, 0);
        card.set_possible_crtcs(plane, mask);
    }

    card
}
