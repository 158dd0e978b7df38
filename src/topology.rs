//! Discovery of a device's whole modesetting topology.

use alloc::vec::Vec;

use crate::catalog::{ConnectorProp, CrtcProp, EnumCatalog, PlaneProp, PlaneType, PropertyCatalog};
use crate::device::ModesetDevice;
use crate::mirror::{ConnectorState, CrtcState, PlaneState};
use crate::modeset::CardResources;
use crate::result::{DeviceOp, Fault, Resource};

/// The property catalogs for every object kind, resolved once per device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalogs {
    pub connector: PropertyCatalog<ConnectorProp>,
    pub crtc: PropertyCatalog<CrtcProp>,
    pub plane: PropertyCatalog<PlaneProp>,
    pub plane_type: EnumCatalog<PlaneType>,
}

/// Snapshots of every connector, CRTC and plane on a device, in the order
/// the kernel lists them.
///
/// Each CRTC owns a duplicate of its mode blob. Call [`Self::release`] when
/// done to destroy them.
pub struct Topology<'d, D: ModesetDevice + ?Sized> {
    device: &'d D,
    connectors: Vec<ConnectorState<'d, D>>,
    crtcs: Vec<CrtcState<'d, D>>,
    planes: Vec<PlaneState<'d, D>>,
    catalogs: Catalogs,
}

impl<'d, D: ModesetDevice + ?Sized> Topology<'d, D> {
    pub fn build(device: &'d D) -> Result<Self, Fault> {
        device
            .enable_atomic()
            .map_err(|e| Fault::ResourceUnavailable(Resource::AtomicModeset(e)))?;

        let res = device
            .resources()
            .map_err(DeviceOp::GetResources.fault())?;
        let first_crtc = *res
            .crtc_ids
            .first()
            .ok_or(Fault::ResourceUnavailable(Resource::NoCrtcs))?;
        let first_plane = *res
            .plane_ids
            .first()
            .ok_or(Fault::ResourceUnavailable(Resource::NoPlanes))?;
        let first_connector = *res
            .connector_ids
            .first()
            .ok_or(Fault::ResourceUnavailable(Resource::NoConnectors))?;
        tracing::debug!(
            connectors = res.connector_ids.len(),
            crtcs = res.crtc_ids.len(),
            planes = res.plane_ids.len(),
            "enumerated resources"
        );

        let crtc = PropertyCatalog::<CrtcProp>::resolve(device, first_crtc)?;
        let plane = PropertyCatalog::<PlaneProp>::resolve(device, first_plane)?;
        let plane_type = EnumCatalog::<PlaneType>::resolve(device, first_plane, PlaneProp::Type)?;
        let connector = PropertyCatalog::<ConnectorProp>::resolve(device, first_connector)?;

        let mut topology = Self {
            device,
            connectors: Vec::new(),
            crtcs: Vec::new(),
            planes: Vec::new(),
            catalogs: Catalogs {
                connector,
                crtc,
                plane,
                plane_type,
            },
        };
        if let Err(e) = topology.populate(&res) {
            if let Err(release_err) = topology.release() {
                tracing::warn!(error = %release_err, "failed to release partial topology");
            }
            return Err(e);
        }
        Ok(topology)
    }

    fn populate(&mut self, res: &CardResources) -> Result<(), Fault> {
        let device = self.device;
        // Each CRTC duplicates its mode blob as part of its snapshot, before
        // any other object is queried.
        for (index, &id) in res.crtc_ids.iter().enumerate() {
            let crtc = CrtcState::snapshot(device, id, index, &self.catalogs.crtc)?;
            self.crtcs.push(crtc);
        }
        for &id in &res.plane_ids {
            let plane = PlaneState::snapshot(
                device,
                id,
                &self.catalogs.plane,
                &self.catalogs.plane_type,
            )?;
            self.planes.push(plane);
        }
        for &id in &res.connector_ids {
            let connector = ConnectorState::snapshot(device, id, &self.catalogs.connector)?;
            self.connectors.push(connector);
        }
        Ok(())
    }

    /// Destroy every owned mode blob.
    ///
    /// All of them are attempted even if one fails; the first failure is
    /// returned.
    pub fn release(mut self) -> Result<(), Fault> {
        let mut first_err = None;
        for crtc in &mut self.crtcs {
            if let Err(e) = crtc.release_mode() {
                tracing::warn!(crtc = crtc.id().0, error = %e, "failed to release mode blob");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    #[inline(always)]
    pub fn device(&self) -> &'d D {
        self.device
    }

    #[inline(always)]
    pub fn catalogs(&self) -> &Catalogs {
        &self.catalogs
    }

    #[inline(always)]
    pub fn connectors(&self) -> &[ConnectorState<'d, D>] {
        &self.connectors
    }

    #[inline(always)]
    pub fn crtcs(&self) -> &[CrtcState<'d, D>] {
        &self.crtcs
    }

    #[inline(always)]
    pub fn planes(&self) -> &[PlaneState<'d, D>] {
        &self.planes
    }

    pub fn overlay_planes(&self) -> impl Iterator<Item = &PlaneState<'d, D>> + '_ {
        self.planes
            .iter()
            .filter(|p| p.plane_type() == PlaneType::Overlay)
    }

    pub fn active_crtcs(&self) -> impl Iterator<Item = &CrtcState<'d, D>> + '_ {
        self.crtcs.iter().filter(|c| c.active())
    }

    pub fn plane_type_counts(&self) -> PlaneTypeCounts {
        let mut counts = PlaneTypeCounts::default();
        for plane in &self.planes {
            match plane.plane_type() {
                PlaneType::Primary => counts.primary += 1,
                PlaneType::Overlay => counts.overlay += 1,
                PlaneType::Cursor => counts.cursor += 1,
                PlaneType::Unknown(_) => counts.unknown += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaneTypeCounts {
    pub primary: usize,
    pub overlay: usize,
    pub cursor: usize,
    pub unknown: usize,
}

impl PlaneTypeCounts {
    pub fn total(&self) -> usize {
        self.primary + self.overlay + self.cursor + self.unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{self, Call};
    use crate::modeset::{BlobId, CardResources};
    use crate::result::{Error, Schema};

    #[test]
    fn scenario_builds() {
        let card = fake::scenario();
        let topology = Topology::build(&card).unwrap();

        assert_eq!(topology.connectors().len(), 1);
        assert_eq!(topology.crtcs().len(), 2);
        assert_eq!(topology.planes().len(), 3);
        assert_eq!(topology.crtcs()[1].index(), 1);
        assert_eq!(
            topology.active_crtcs().map(|c| c.id()).collect::<Vec<_>>(),
            [fake::CRTC_A]
        );
        assert_eq!(
            topology.overlay_planes().map(|p| p.id()).collect::<Vec<_>>(),
            [fake::OVERLAY_PLANE]
        );
        topology.release().unwrap();
    }

    #[test]
    fn plane_type_counts_cover_every_plane() {
        let card = fake::scenario();
        let topology = Topology::build(&card).unwrap();

        let counts = topology.plane_type_counts();
        assert_eq!(
            counts,
            PlaneTypeCounts {
                primary: 1,
                overlay: 1,
                cursor: 1,
                unknown: 0,
            }
        );
        assert_eq!(counts.total(), topology.planes().len());
        topology.release().unwrap();
    }

    #[test]
    fn cached_modes_match_owned_blobs() {
        let card = fake::scenario();
        let topology = Topology::build(&card).unwrap();

        for crtc in topology.crtcs() {
            match crtc.owned_mode() {
                Some(blob) => assert_eq!(blob.read().unwrap(), crtc.mode_data()),
                None => assert!(crtc.mode_data().is_empty()),
            }
        }
        topology.release().unwrap();
    }

    #[test]
    fn mode_blob_is_duplicated_before_other_objects_are_read() {
        let card = fake::scenario();
        let topology = Topology::build(&card).unwrap();

        let calls = card.calls();
        let created = calls
            .iter()
            .position(|c| matches!(c, Call::CreateBlob(_)))
            .unwrap();
        let first_plane_read = calls
            .iter()
            .position(|c| matches!(c, Call::PossibleCrtcs(_)))
            .unwrap();
        assert!(created < first_plane_read);
        topology.release().unwrap();
    }

    #[test]
    fn release_destroys_each_owned_blob_once() {
        let card = fake::scenario();
        // Give the second CRTC a mode too, so there are two owned blobs.
        let second = card.insert_blob(fake::mode_1080p().to_blob());
        card.set_value(fake::CRTC_B.into(), fake::PROP_MODE_ID, second.0 as u64);

        let topology = Topology::build(&card).unwrap();
        let owned: Vec<BlobId> = topology.crtcs().iter().map(|c| c.mode_id()).collect();
        assert!(owned.iter().all(|id| !id.is_none()));
        card.clear_calls();

        topology.release().unwrap();
        assert_eq!(card.count_calls(|c| matches!(c, Call::DestroyBlob(_))), owned.len());
        for id in owned {
            assert_eq!(card.count_calls(|c| *c == Call::DestroyBlob(id)), 1);
        }
    }

    #[test]
    fn zero_planes_fails_before_property_resolution() {
        let card = fake::scenario();
        card.set_resources(CardResources {
            crtc_ids: alloc::vec![fake::CRTC_A, fake::CRTC_B],
            connector_ids: alloc::vec![fake::CONNECTOR],
            plane_ids: Vec::new(),
        });

        let err = Topology::build(&card).err().unwrap();
        assert_eq!(err, Fault::ResourceUnavailable(Resource::NoPlanes));
        assert_eq!(
            card.count_calls(|c| matches!(
                c,
                Call::ObjectProperties(_) | Call::PropertyMeta(_)
            )),
            0
        );
    }

    #[test]
    fn missing_connectors_and_crtcs() {
        let card = fake::scenario();
        card.set_resources(CardResources::default());
        let err = Topology::build(&card).err().unwrap();
        assert_eq!(err, Fault::ResourceUnavailable(Resource::NoCrtcs));

        card.set_resources(CardResources {
            crtc_ids: alloc::vec![fake::CRTC_A],
            connector_ids: Vec::new(),
            plane_ids: alloc::vec![fake::PRIMARY_PLANE],
        });
        let err = Topology::build(&card).err().unwrap();
        assert_eq!(err, Fault::ResourceUnavailable(Resource::NoConnectors));
    }

    #[test]
    fn atomic_refusal_is_a_resource_fault() {
        let card = fake::scenario();
        card.fail_atomic();
        let err = Topology::build(&card).err().unwrap();
        assert_eq!(
            err,
            Fault::ResourceUnavailable(Resource::AtomicModeset(Error::NotSupported))
        );
        assert_eq!(card.calls(), [Call::EnableAtomic]);
    }

    #[test]
    fn bad_mode_length_fails_without_duplicating() {
        let card = fake::scenario();
        let bad = card.insert_blob(alloc::vec![0_u8; MODE_LEN_PLUS]);
        card.set_value(fake::CRTC_A.into(), fake::PROP_MODE_ID, bad.0 as u64);

        let err = Topology::build(&card).err().unwrap();
        assert!(matches!(
            err,
            Fault::SchemaMismatch(Schema::ModeBlobLength { crtc, .. }) if crtc == fake::CRTC_A
        ));
        assert_eq!(card.count_calls(|c| matches!(c, Call::CreateBlob(_))), 0);
    }

    #[test]
    fn failure_after_duplication_releases_owned_blobs() {
        let card = fake::scenario();
        // The overlay plane can't be queried, which fails after the CRTC
        // snapshots have already taken their copies.
        card.remove_object(fake::OVERLAY_PLANE.into());
        let blobs_before = card.blob_count();

        let err = Topology::build(&card).err().unwrap();
        assert!(matches!(
            err,
            Fault::Device {
                op: DeviceOp::GetProperties,
                ..
            }
        ));
        assert_eq!(card.count_calls(|c| matches!(c, Call::CreateBlob(_))), 1);
        assert_eq!(card.blob_count(), blobs_before);
    }

    const MODE_LEN_PLUS: usize = crate::modeset::MODE_INFO_LEN + 4;
}
