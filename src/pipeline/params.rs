//! Live frame parameters written by a front end and read once per tick.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::CaptureVariant;
use crate::protocol::{Color, EffectSelection, FrameParams};

/// Provider of the current effect and color.
///
/// Polled by the control loop once per block, so a change is visible on the
/// next frame.
pub trait ParamSource: Send + Sync {
    fn effect(&self) -> EffectSelection;
    fn color(&self) -> Color;

    /// The parameter carried by frames of `variant`.
    fn frame_params(&self, variant: CaptureVariant) -> FrameParams {
        match variant {
            CaptureVariant::Computer => FrameParams::Effect(self.effect()),
            CaptureVariant::Mic => FrameParams::Color(self.color()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LiveParams {
    effect: EffectSelection,
    color: Color,
}

/// Lock-free [`ParamSource`] backed by an [`ArcSwap`].
#[derive(Debug)]
pub struct ParamCell {
    inner: ArcSwap<LiveParams>,
}

impl ParamCell {
    pub fn new(effect: EffectSelection, color: Color) -> Self {
        Self {
            inner: ArcSwap::from_pointee(LiveParams { effect, color }),
        }
    }

    pub fn set_effect(&self, effect: EffectSelection) {
        self.inner.rcu(|current| {
            Arc::new(LiveParams {
                effect,
                ..**current
            })
        });
    }

    pub fn set_color(&self, color: Color) {
        self.inner.rcu(|current| {
            Arc::new(LiveParams {
                color,
                ..**current
            })
        });
    }
}

impl Default for ParamCell {
    fn default() -> Self {
        Self::new(EffectSelection::default(), Color::default())
    }
}

impl ParamSource for ParamCell {
    fn effect(&self) -> EffectSelection {
        self.inner.load().effect
    }

    fn color(&self) -> Color {
        self.inner.load().color
    }
}
