//! Explicit output-surface dimensions

/// Upper bound on the device pixel ratio used for the output surface.
pub const MAX_PIXEL_RATIO: f32 = 2.0;

/// Physical window size plus the window's scale factor.
///
/// The render target uses the scale factor capped at [`MAX_PIXEL_RATIO`], so
/// on denser displays the surface is smaller than the window and gets
/// stretched by the compositor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportConfig {
    pub width: u32,
    pub height: u32,
    pub scale_factor: f32,
}

impl ViewportConfig {
    pub fn new(width: u32, height: u32, scale_factor: f32) -> Self {
        Self {
            width,
            height,
            scale_factor: scale_factor.max(f32::MIN_POSITIVE),
        }
    }

    /// Effective pixel ratio of the render target.
    pub fn pixel_ratio(&self) -> f32 {
        self.scale_factor.min(MAX_PIXEL_RATIO)
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Physical size of the render target, never zero on either axis.
    ///
    /// Equal to the window size unless the scale factor exceeds the cap.
    pub fn surface_size(&self) -> (u32, u32) {
        if self.scale_factor <= MAX_PIXEL_RATIO {
            return (self.width.max(1), self.height.max(1));
        }
        let shrink = f64::from(MAX_PIXEL_RATIO) / f64::from(self.scale_factor);
        let scale = |v: u32| ((f64::from(v) * shrink).round() as u32).max(1);
        (scale(self.width), scale(self.height))
    }

    /// Same scale factor, new physical size.
    pub fn resized(&self, width: u32, height: u32) -> Self {
        Self::new(width, height, self.scale_factor)
    }
}
