// Gamma-correct blending through lookup tables instead of powf per pixel.
// Visual: DM fog darkens hidden terrain evenly, without the muddy mid-tones a
// plain sRGB mix gives.

pub struct GammaLut {
    // sRGB(0..255) -> linear (0..1)
    srgb_to_linear: [f32; 256],
    // linear(0..1) -> sRGB(0..255), index = (linear * 4095).round()
    linear_to_srgb: [u8; 4096],
}

impl Default for GammaLut {
    fn default() -> Self {
        Self::new()
    }
}

impl GammaLut {
    /// Build both tables once; the renderer keeps one around.
    pub fn new() -> Self {
        let mut s2l = [0.0f32; 256];
        for (v, slot) in s2l.iter_mut().enumerate() {
            let c = v as f32 / 255.0;
            *slot = if c <= 0.04045 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) };
        }

        let mut l2s = [0u8; 4096];
        for (i, slot) in l2s.iter_mut().enumerate() {
            let l = i as f32 / 4095.0;
            let s = if l <= 0.003_130_8 { 12.92 * l } else { 1.055 * l.powf(1.0 / 2.4) - 0.055 };
            *slot = (s * 255.0).round().clamp(0.0, 255.0) as u8;
        }

        Self { srgb_to_linear: s2l, linear_to_srgb: l2s }
    }

    #[inline]
    pub fn srgb_u8_to_linear(&self, v: u8) -> f32 {
        self.srgb_to_linear[v as usize]
    }

    #[inline]
    pub fn linear_to_srgb_u8(&self, l: f32) -> u8 {
        let idx = (l.clamp(0.0, 1.0) * 4095.0).round() as usize;
        self.linear_to_srgb[idx]
    }

    /// Mix `over` onto `base` (both 0x00RRGGBB) with opacity `alpha` in [0, 1].
    #[inline]
    pub fn blend(&self, base: u32, over: u32, alpha: f32) -> u32 {
        if alpha <= 0.0 {
            return base;
        }
        if alpha >= 1.0 {
            return over;
        }
        let inv = 1.0 - alpha;
        let mut out = 0u32;
        for shift in [16u32, 8, 0] {
            let b = self.srgb_u8_to_linear(((base >> shift) & 0xFF) as u8);
            let o = self.srgb_u8_to_linear(((over >> shift) & 0xFF) as u8);
            out |= (self.linear_to_srgb_u8(alpha * o + inv * b) as u32) << shift;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_round_trip_every_byte() {
        let lut = GammaLut::new();
        for v in 0..=255u8 {
            assert_eq!(lut.linear_to_srgb_u8(lut.srgb_u8_to_linear(v)), v);
        }
    }

    #[test]
    fn blend_endpoints_and_darkening() {
        let lut = GammaLut::new();
        let base = 0x00C0_8040;
        assert_eq!(lut.blend(base, 0, 0.0), base);
        assert_eq!(lut.blend(base, 0, 1.0), 0);
        let half = lut.blend(base, 0, 0.5);
        let red = (half >> 16) & 0xFF;
        assert!(red > 0 && red < 0xC0);
    }
}
