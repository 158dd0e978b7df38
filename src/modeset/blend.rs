use super::AsRawPropertyValue;

/// A factor in the plane blending equation
/// `out = src * src_factor + dst * dst_factor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum BlendFactor {
    Zero = 0,
    One = 1,
    SrcColor = 2,
    OneMinusSrcColor = 3,
    DstColor = 4,
    OneMinusDstColor = 5,
    SrcAlpha = 6,
    OneMinusSrcAlpha = 7,
    DstAlpha = 8,
    OneMinusDstAlpha = 9,
    ConstantColor = 10,
    OneMinusConstantColor = 11,
    ConstantAlpha = 12,
    OneMinusConstantAlpha = 13,
    SrcAlphaSaturate = 14,
}

/// The value of a plane's `blend_func` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendFunc {
    pub src: BlendFactor,
    pub dst: BlendFactor,
}

impl BlendFunc {
    /// Source replaces destination.
    pub const OPAQUE: Self = Self::new(BlendFactor::One, BlendFactor::Zero);

    /// Source is mixed over destination by the plane's constant alpha.
    pub const CONSTANT_ALPHA: Self = Self::new(
        BlendFactor::ConstantAlpha,
        BlendFactor::OneMinusConstantAlpha,
    );

    #[inline(always)]
    pub const fn new(src: BlendFactor, dst: BlendFactor) -> Self {
        Self { src, dst }
    }

    #[inline(always)]
    pub const fn as_raw(self) -> u64 {
        ((self.src as u64) << 16) | (self.dst as u64)
    }
}

impl AsRawPropertyValue for BlendFunc {
    #[inline(always)]
    fn as_raw_property_value(&self) -> u64 {
        self.as_raw()
    }
}

/// The value of a plane's `blend_color` property: four 16-bit channels
/// packed red-first from the most significant bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba(u64);

impl Rgba {
    /// Pack components that each use `bpc` bits of precision, scaling them
    /// up to 16 bits. Components wider than `bpc` bits saturate.
    pub fn from_bpc(bpc: u32, r: u16, g: u16, b: u16, a: u16) -> Self {
        let bpc = bpc.clamp(1, 16);
        let max = ((1_u32 << bpc) - 1) as u16;
        let shift = 16 - bpc;
        let scale = |c: u16| (core::cmp::min(c, max) as u64) << shift;
        Self((scale(r) << 48) | (scale(g) << 32) | (scale(b) << 16) | scale(a))
    }

    #[inline(always)]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline(always)]
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    /// The alpha channel at full 16-bit precision.
    #[inline(always)]
    pub const fn alpha(self) -> u16 {
        self.0 as u16
    }
}

impl AsRawPropertyValue for Rgba {
    #[inline(always)]
    fn as_raw_property_value(&self) -> u64 {
        self.0
    }
}
