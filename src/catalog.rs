//! Name-to-id maps for the properties this crate uses.
//!
//! Drivers assign property ids freely, and the same name may carry a
//! different id on another device or another boot. Each catalog is built
//! once per object kind by asking the first object of that kind for its
//! properties and matching their names against a closed set of keys.

use alloc::collections::BTreeMap;
use core::fmt;

use crate::device::ModesetDevice;
use crate::modeset::{ConnectorId, CrtcId, ObjectId, ObjectKind, PlaneId, PropertyId};
use crate::result::{DeviceOp, Fault, Schema};

/// A closed set of property names for one kind of object.
pub trait PropertyName: Copy + Ord + fmt::Debug + 'static {
    const KIND: ObjectKind;

    /// Every key, in a fixed order.
    const ALL: &'static [Self];

    /// The id type of objects that carry these properties.
    type Object: Into<ObjectId> + Copy;

    /// The name the kernel uses for this property.
    fn name(self) -> &'static str;

    /// Whether resolution fails when the driver lacks this property.
    fn required(self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConnectorProp {
    CrtcId,
}

impl PropertyName for ConnectorProp {
    const KIND: ObjectKind = ObjectKind::Connector;
    const ALL: &'static [Self] = &[Self::CrtcId];
    type Object = ConnectorId;

    fn name(self) -> &'static str {
        match self {
            Self::CrtcId => "CRTC_ID",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CrtcProp {
    ModeId,
    Active,
    BackgroundColor,
}

impl PropertyName for CrtcProp {
    const KIND: ObjectKind = ObjectKind::Crtc;
    const ALL: &'static [Self] = &[Self::ModeId, Self::Active, Self::BackgroundColor];
    type Object = CrtcId;

    fn name(self) -> &'static str {
        match self {
            Self::ModeId => "MODE_ID",
            Self::Active => "ACTIVE",
            Self::BackgroundColor => "background_color",
        }
    }

    fn required(self) -> bool {
        !matches!(self, Self::BackgroundColor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PlaneProp {
    SrcX,
    SrcY,
    SrcW,
    SrcH,
    CrtcX,
    CrtcY,
    CrtcW,
    CrtcH,
    FbId,
    CrtcId,
    Type,
    BlendFunc,
    BlendColor,
}

impl PropertyName for PlaneProp {
    const KIND: ObjectKind = ObjectKind::Plane;
    const ALL: &'static [Self] = &[
        Self::SrcX,
        Self::SrcY,
        Self::SrcW,
        Self::SrcH,
        Self::CrtcX,
        Self::CrtcY,
        Self::CrtcW,
        Self::CrtcH,
        Self::FbId,
        Self::CrtcId,
        Self::Type,
        Self::BlendFunc,
        Self::BlendColor,
    ];
    type Object = PlaneId;

    fn name(self) -> &'static str {
        match self {
            Self::SrcX => "SRC_X",
            Self::SrcY => "SRC_Y",
            Self::SrcW => "SRC_W",
            Self::SrcH => "SRC_H",
            Self::CrtcX => "CRTC_X",
            Self::CrtcY => "CRTC_Y",
            Self::CrtcW => "CRTC_W",
            Self::CrtcH => "CRTC_H",
            Self::FbId => "FB_ID",
            Self::CrtcId => "CRTC_ID",
            Self::Type => "type",
            Self::BlendFunc => "blend_func",
            Self::BlendColor => "blend_color",
        }
    }

    // Only drivers with per-plane blending expose these. They're checked
    // when something actually writes them.
    fn required(self) -> bool {
        !matches!(self, Self::BlendFunc | Self::BlendColor)
    }
}

/// Property ids for one kind of object, keyed by [`PropertyName`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyCatalog<P: PropertyName> {
    ids: BTreeMap<P, PropertyId>,
    by_id: BTreeMap<PropertyId, P>,
}

impl<P: PropertyName> PropertyCatalog<P> {
    /// Discover the ids of `P`'s properties from the properties of `sample`.
    pub fn resolve<D: ModesetDevice + ?Sized>(
        device: &D,
        sample: P::Object,
    ) -> Result<Self, Fault> {
        let props = device
            .object_properties(sample.into())
            .map_err(DeviceOp::GetProperties.fault())?;

        let mut ids = BTreeMap::new();
        let mut by_id = BTreeMap::new();
        for prop in props {
            let meta = device
                .property_meta(prop.prop_id)
                .map_err(DeviceOp::GetProperty.fault())?;
            let Some(&key) = P::ALL.iter().find(|key| key.name() == meta.name) else {
                continue;
            };
            tracing::debug!(
                kind = %P::KIND,
                name = key.name(),
                id = prop.prop_id.0,
                "resolved property"
            );
            ids.insert(key, prop.prop_id);
            by_id.insert(prop.prop_id, key);
        }

        for &key in P::ALL {
            if key.required() && !ids.contains_key(&key) {
                return Err(Fault::SchemaMismatch(Schema::MissingProperty {
                    kind: P::KIND,
                    name: key.name(),
                }));
            }
        }
        Ok(Self { ids, by_id })
    }

    /// The property's id, if the driver has it.
    #[inline]
    pub fn id(&self, key: P) -> Option<PropertyId> {
        self.ids.get(&key).copied()
    }

    /// Like [`Self::id`], but treats an absent property as a schema mismatch.
    pub fn require(&self, key: P) -> Result<PropertyId, Fault> {
        self.id(key).ok_or(Fault::SchemaMismatch(Schema::MissingProperty {
            kind: P::KIND,
            name: key.name(),
        }))
    }

    /// Map a property id reported for an object back to its key.
    #[inline]
    pub fn lookup(&self, id: PropertyId) -> Option<P> {
        self.by_id.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// A closed set of value names for one enum-typed property.
pub trait EnumName: Copy + Ord + fmt::Debug + 'static {
    const ALL: &'static [Self];

    fn name(self) -> &'static str;
}

/// The role of a plane, from its `type` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PlaneType {
    Primary,
    Overlay,
    Cursor,
    /// A value the driver's `type` enum doesn't name.
    Unknown(u64),
}

impl EnumName for PlaneType {
    const ALL: &'static [Self] = &[Self::Primary, Self::Overlay, Self::Cursor];

    fn name(self) -> &'static str {
        match self {
            Self::Primary => "Primary",
            Self::Overlay => "Overlay",
            Self::Cursor => "Cursor",
            Self::Unknown(_) => "Unknown",
        }
    }
}

impl fmt::Display for PlaneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Numeric values of one enum-typed property, keyed by [`EnumName`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumCatalog<E: EnumName> {
    values: BTreeMap<E, u64>,
}

impl<E: EnumName> EnumCatalog<E> {
    /// Find `property` on `sample` and match its value names against `E`.
    ///
    /// Every name in `E::ALL` must be present.
    pub fn resolve<D, P>(device: &D, sample: P::Object, property: P) -> Result<Self, Fault>
    where
        D: ModesetDevice + ?Sized,
        P: PropertyName,
    {
        let props = device
            .object_properties(sample.into())
            .map_err(DeviceOp::GetProperties.fault())?;

        let mut found = None;
        for prop in props {
            let meta = device
                .property_meta(prop.prop_id)
                .map_err(DeviceOp::GetProperty.fault())?;
            if meta.name == property.name() {
                found = Some(meta);
                break;
            }
        }
        let Some(meta) = found else {
            return Err(Fault::SchemaMismatch(Schema::MissingProperty {
                kind: P::KIND,
                name: property.name(),
            }));
        };

        let mut values = BTreeMap::new();
        for &key in E::ALL {
            let Some(value) = meta.enum_value(key.name()) else {
                return Err(Fault::SchemaMismatch(Schema::MissingEnumValue {
                    kind: P::KIND,
                    property: property.name(),
                    name: key.name(),
                }));
            };
            tracing::debug!(
                property = property.name(),
                name = key.name(),
                value,
                "resolved enum value"
            );
            values.insert(key, value);
        }
        Ok(Self { values })
    }

    #[inline]
    pub fn value(&self, key: E) -> Option<u64> {
        self.values.get(&key).copied()
    }

    /// Map a raw property value back to its key.
    pub fn decode(&self, raw: u64) -> Option<E> {
        self.values
            .iter()
            .find(|&(_, &value)| value == raw)
            .map(|(&key, _)| key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{self, Call, FakeCard};
    use crate::modeset::PropertyType;
    use alloc::collections::BTreeSet;
    use proptest::prelude::*;
    use proptest::test_runner::TestCaseError;

    #[test]
    fn plane_catalog_resolves_scenario_ids() {
        let card = fake::scenario();
        let catalog = PropertyCatalog::<PlaneProp>::resolve(&card, fake::PRIMARY_PLANE).unwrap();

        assert_eq!(catalog.id(PlaneProp::Type), Some(fake::PROP_TYPE));
        assert_eq!(catalog.id(PlaneProp::BlendColor), Some(fake::PROP_BLEND_COLOR));
        assert_eq!(catalog.lookup(fake::PROP_FB_ID), Some(PlaneProp::FbId));
        // Properties outside the key set are ignored.
        assert_eq!(catalog.lookup(fake::PROP_ROTATION), None);
        assert_eq!(catalog.len(), PlaneProp::ALL.len());
    }

    #[test]
    fn missing_required_property_fails_fast() {
        let card = fake::scenario();
        card.remove_property(fake::CRTC_A.into(), fake::PROP_ACTIVE);

        let err = PropertyCatalog::<CrtcProp>::resolve(&card, fake::CRTC_A).unwrap_err();
        assert_eq!(
            err,
            Fault::SchemaMismatch(Schema::MissingProperty {
                kind: ObjectKind::Crtc,
                name: "ACTIVE",
            })
        );
    }

    #[test]
    fn optional_property_fails_only_when_required() {
        let card = fake::scenario();
        card.remove_property(fake::PRIMARY_PLANE.into(), fake::PROP_BLEND_FUNC);

        let catalog = PropertyCatalog::<PlaneProp>::resolve(&card, fake::PRIMARY_PLANE).unwrap();
        assert_eq!(catalog.id(PlaneProp::BlendFunc), None);
        assert!(matches!(
            catalog.require(PlaneProp::BlendFunc),
            Err(Fault::SchemaMismatch(Schema::MissingProperty {
                name: "blend_func",
                ..
            }))
        ));
    }

    #[test]
    fn plane_type_values_come_from_the_driver() {
        let card = fake::scenario();
        let types =
            EnumCatalog::<PlaneType>::resolve(&card, fake::PRIMARY_PLANE, PlaneProp::Type).unwrap();

        assert_eq!(types.value(PlaneType::Overlay), Some(0));
        assert_eq!(types.value(PlaneType::Primary), Some(1));
        assert_eq!(types.decode(2), Some(PlaneType::Cursor));
        assert_eq!(types.decode(7), None);
    }

    #[test]
    fn missing_enum_value_is_a_schema_mismatch() {
        let card = FakeCard::new();
        let plane = PlaneId(3);
        let prop = PropertyId(1);
        card.define_property(prop, "type", PropertyType::Enum, &[(0, "Overlay"), (1, "Primary")]);
        card.attach_property(plane.into(), prop, 1);

        let err = EnumCatalog::<PlaneType>::resolve(&card, plane, PlaneProp::Type).unwrap_err();
        assert_eq!(
            err,
            Fault::SchemaMismatch(Schema::MissingEnumValue {
                kind: ObjectKind::Plane,
                property: "type",
                name: "Cursor",
            })
        );
    }

    #[test]
    fn property_query_failure_is_a_device_fault() {
        let card = FakeCard::new();
        let err = PropertyCatalog::<ConnectorProp>::resolve(&card, ConnectorId(99)).unwrap_err();
        assert!(matches!(
            err,
            Fault::Device {
                op: DeviceOp::GetProperties,
                ..
            }
        ));
        assert_eq!(card.count_calls(|c| matches!(c, Call::PropertyMeta(_))), 0);
    }

    /// Give `sample` every key of `P` under the ids in `ids`, then resolve
    /// twice and check both catalogs agree with the assignment.
    fn resolves_deterministically<P: PropertyName>(
        sample: P::Object,
        ids: &BTreeSet<u32>,
    ) -> Result<(), TestCaseError> {
        let card = FakeCard::new();
        for (&key, &id) in P::ALL.iter().zip(ids.iter()) {
            card.define_property(PropertyId(id), key.name(), PropertyType::Range, &[]);
            card.attach_property(sample.into(), PropertyId(id), 0);
        }

        let first = PropertyCatalog::<P>::resolve(&card, sample).unwrap();
        let second = PropertyCatalog::<P>::resolve(&card, sample).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.len(), P::ALL.len());
        for (&key, &id) in P::ALL.iter().zip(ids.iter()) {
            prop_assert_eq!(first.id(key), Some(PropertyId(id)));
            prop_assert_eq!(first.lookup(PropertyId(id)), Some(key));
        }
        Ok(())
    }

    proptest! {
        #[test]
        fn connector_resolution_is_deterministic(
            ids in proptest::collection::btree_set(1_u32..10_000, ConnectorProp::ALL.len()),
        ) {
            resolves_deterministically::<ConnectorProp>(ConnectorId(7), &ids)?;
        }

        #[test]
        fn crtc_resolution_is_deterministic(
            ids in proptest::collection::btree_set(1_u32..10_000, CrtcProp::ALL.len()),
        ) {
            resolves_deterministically::<CrtcProp>(CrtcId(8), &ids)?;
        }

        #[test]
        fn plane_resolution_is_deterministic(
            ids in proptest::collection::btree_set(1_u32..10_000, PlaneProp::ALL.len()),
        ) {
            resolves_deterministically::<PlaneProp>(PlaneId(42), &ids)?;
        }
    }
}
