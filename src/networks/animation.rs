//! Frame-driven transition driver.

use crate::contexts::NetworkContext;
use crate::transformers::TransformInterpolator;

/// A running transition, advanced by the caller's frame loop.
pub struct Animation {
    interpolator: Box<dyn TransformInterpolator>,
    duration: f32,
    elapsed: f32,
}

impl Animation {
    pub fn new(interpolator: Box<dyn TransformInterpolator>, duration: f32) -> Self {
        Self {
            interpolator,
            duration: duration.max(0.0),
            elapsed: 0.0,
        }
    }

    /// Fraction of the transition already shown.
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (self.elapsed / self.duration).min(1.0)
    }

    /// Advances by `dt` seconds and returns whether the transition finished.
    ///
    /// The last call always interpolates at exactly `1.0`.
    pub fn advance(&mut self, dt: f32, context: &mut NetworkContext) -> bool {
        self.elapsed += dt.max(0.0);
        if self.elapsed >= self.duration {
            self.interpolator.interpolate(1.0, context);
            return true;
        }
        self.interpolator.interpolate(self.elapsed / self.duration, context);
        false
    }
}

impl std::fmt::Debug for Animation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Animation")
            .field("duration", &self.duration)
            .field("elapsed", &self.elapsed)
            .finish_non_exhaustive()
    }
}
