//! Blend operators.
//!
//! An operator maps `(destination, source)` to the new destination pixel.
//! Operators are not commutative.

use common::color::Pixel;
use std::fmt;
use std::sync::Arc;

/// Source replaces destination.
#[inline]
pub fn replace<P: Pixel>(_dst: P, src: P) -> P {
    src
}

/// Source replaces destination wherever it has any coverage.
#[inline]
pub fn mask<P: Pixel>(dst: P, src: P) -> P {
    if src.has_coverage() {
        src
    } else {
        dst
    }
}

/// Interpolate towards the source by the source alpha.
#[inline]
pub fn alpha<P: Pixel>(dst: P, src: P) -> P {
    P::lerp_by(dst, src, src)
}

/// Keep the destination where the source is opaque, clear it elsewhere.
#[inline]
pub fn stencil_keep<P: Pixel>(dst: P, src: P) -> P {
    P::lerp_by(P::CLEAR, dst, src)
}

/// Erase the destination where the source is opaque.
#[inline]
pub fn stencil_cut<P: Pixel>(dst: P, src: P) -> P {
    P::lerp_by(dst, P::CLEAR, src)
}

/// A blend operator value.
#[derive(Clone)]
pub enum Blend<P> {
    Replace,
    Mask,
    Alpha,
    StencilKeep,
    StencilCut,
    Custom(Arc<dyn Fn(P, P) -> P + Send + Sync>),
}

impl<P: Pixel> Blend<P> {
    /// Wrap a user-supplied operator.
    pub fn custom(f: impl Fn(P, P) -> P + Send + Sync + 'static) -> Self {
        Blend::Custom(Arc::new(f))
    }

    #[inline]
    pub fn apply(&self, dst: P, src: P) -> P {
        match self {
            Blend::Replace => replace(dst, src),
            Blend::Mask => mask(dst, src),
            Blend::Alpha => alpha(dst, src),
            Blend::StencilKeep => stencil_keep(dst, src),
            Blend::StencilCut => stencil_cut(dst, src),
            Blend::Custom(f) => f(dst, src),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Blend::Replace => "replace",
            Blend::Mask => "mask",
            Blend::Alpha => "alpha",
            Blend::StencilKeep => "stencil-keep",
            Blend::StencilCut => "stencil-cut",
            Blend::Custom(_) => "custom",
        }
    }

    /// Look up one of the built-in operators by name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "replace" => Some(Blend::Replace),
            "mask" => Some(Blend::Mask),
            "alpha" | "normal" => Some(Blend::Alpha),
            "stencil-keep" | "keep" => Some(Blend::StencilKeep),
            "stencil-cut" | "cut" | "erase" => Some(Blend::StencilCut),
            _ => None,
        }
    }
}

impl<P> fmt::Debug for Blend<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Blend::Replace => "Replace",
            Blend::Mask => "Mask",
            Blend::Alpha => "Alpha",
            Blend::StencilKeep => "StencilKeep",
            Blend::StencilCut => "StencilCut",
            Blend::Custom(_) => "Custom",
        };
        f.write_str(name)
    }
}
