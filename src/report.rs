use core::fmt;

use crate::device::ModesetDevice;
use crate::topology::Topology;

/// Describe every object in `topology`, one line at a time.
pub fn enumeration_report<D, W>(topology: &Topology<'_, D>, out: &mut W) -> fmt::Result
where
    D: ModesetDevice + ?Sized,
    W: fmt::Write + ?Sized,
{
    writeln!(out, "Connectors: {}", topology.connectors().len())?;
    for conn in topology.connectors() {
        write!(out, "Connector id: {}", conn.id().0)?;
        if conn.is_routed() {
            write!(out, " on CRTC {}", conn.crtc_id().0)?;
        }
        writeln!(out, ", {} supported modes detected.", conn.mode_count())?;
    }

    writeln!(out, "Planes: {}", topology.planes().len())?;
    for plane in topology.planes() {
        writeln!(out, "Plane types: {}", plane.plane_type())?;
    }

    writeln!(out, "Crtcs: {}", topology.crtcs().len())?;
    for crtc in topology.crtcs() {
        write!(out, "CRTC id: {}", crtc.id().0)?;
        match crtc.mode_info() {
            Some(mode) => writeln!(out, " mode: {mode}")?,
            None => writeln!(out)?,
        }
    }
    Ok(())
}
