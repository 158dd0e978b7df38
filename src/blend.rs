//! The overlay blending exercise.

use alloc::vec::Vec;

use crate::catalog::PlaneProp;
use crate::device::{DestRect, ModesetDevice};
use crate::modeset::{BlendFunc, PixelFormat, Rgb, Rgba};
use crate::result::{DeviceOp, Fault};
use crate::topology::Topology;

/// Shows a solid framebuffer on every overlay plane of every active CRTC,
/// then fades it in over several iterations using the plane's constant
/// alpha.
#[derive(Debug, Clone)]
pub struct BlendSweep {
    pub iterations: u32,
    /// Added to the alpha value on each iteration. The result saturates at
    /// the largest value `blend_bpc` bits can hold.
    pub alpha_step: u16,
    pub fb_width: u32,
    pub fb_height: u32,
    pub color: Rgb,
    /// Precision of the components passed to the blend color.
    pub blend_bpc: u32,
}

impl Default for BlendSweep {
    fn default() -> Self {
        Self {
            iterations: 3,
            alpha_step: 128,
            fb_width: 500,
            fb_height: 500,
            color: Rgb::GREEN,
            blend_bpc: 8,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub property_writes: usize,
    pub attaches: usize,
}

impl BlendSweep {
    /// Alpha for the given zero-based iteration, before scaling to `blend_bpc`.
    pub fn alpha(&self, iteration: u32) -> u16 {
        let alpha = u32::from(self.alpha_step).saturating_mul(iteration);
        u16::try_from(alpha).unwrap_or(u16::MAX)
    }

    pub fn run<D: ModesetDevice + ?Sized>(
        &self,
        topology: &Topology<'_, D>,
    ) -> Result<SweepSummary, Fault> {
        let device = topology.device();
        let catalog = &topology.catalogs().plane;
        let mut summary = SweepSummary::default();
        // Keep every framebuffer alive until the sweep is over, so the
        // planes still have something to show.
        let mut framebuffers = Vec::new();

        for crtc in topology.active_crtcs() {
            tracing::info!(crtc = crtc.id().0, "blending overlay planes");
            for iteration in 0..self.iterations {
                let alpha = self.alpha(iteration);
                tracing::info!(iteration, alpha, "overlay alpha");

                for plane in topology.overlay_planes() {
                    if !plane.can_attach(crtc.index()) {
                        tracing::info!(
                            plane = plane.id().0,
                            crtc = crtc.id().0,
                            "overlay plane can't be used with this CRTC"
                        );
                        continue;
                    }
                    tracing::info!(plane = plane.id().0, "overlay plane");

                    plane.set_property(catalog, PlaneProp::BlendFunc, BlendFunc::OPAQUE)?;
                    summary.property_writes += 1;

                    let fb = device
                        .create_color_framebuffer(
                            self.fb_width,
                            self.fb_height,
                            PixelFormat::Xrgb8888,
                            self.color,
                        )
                        .map_err(DeviceOp::CreateFramebuffer.fault())?;
                    let dst = DestRect {
                        x: 0,
                        y: 0,
                        w: self.fb_width,
                        h: self.fb_height,
                    };
                    plane.attach(crtc.id(), &fb, dst)?;
                    framebuffers.push(fb);
                    summary.attaches += 1;

                    let color = Rgba::from_bpc(self.blend_bpc, 0, 128, 0, alpha);
                    plane.set_property(catalog, PlaneProp::BlendColor, color)?;
                    summary.property_writes += 1;

                    plane.set_property(catalog, PlaneProp::BlendFunc, BlendFunc::CONSTANT_ALPHA)?;
                    summary.property_writes += 1;
                }
            }
        }

        tracing::info!(
            writes = summary.property_writes,
            attaches = summary.attaches,
            "blend sweep finished"
        );
        drop(framebuffers);
        Ok(summary)
    }
}
