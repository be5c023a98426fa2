//! Crop rectangle math for pointer-driven image cropping.
//!
//! All coordinates are in display space (the image as rendered) until
//! [`CropRect::to_natural`] scales them to the image's natural pixels.

use serde::{Deserialize, Serialize};

/// Smallest crop edge, in display pixels.
pub const DEFAULT_MIN_SIZE: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Negative or NaN dimensions read as zero.
    fn sanitized(self) -> Self {
        Self::new(extent(self.width), extent(self.height))
    }
}

fn extent(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.max(0.0)
    }
}

/// `value` limited to `[low, high]`; an inverted range yields `low` and a NaN
/// value yields `low`. Unlike `f64::clamp` this never panics.
fn bound(value: f64, low: f64, high: f64) -> f64 {
    let value = if value.is_nan() { low } else { value };
    value.min(high).max(low)
}

/// Axis-aligned crop rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// What the pointer grabbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handle {
    Move,
    N,
    S,
    E,
    W,
    Ne,
    Nw,
    Se,
    Sw,
}

impl Handle {
    fn edges(self) -> (bool, bool, bool, bool) {
        // (north, south, east, west)
        match self {
            Self::Move => (false, false, false, false),
            Self::N => (true, false, false, false),
            Self::S => (false, true, false, false),
            Self::E => (false, false, true, false),
            Self::W => (false, false, false, true),
            Self::Ne => (true, false, true, false),
            Self::Nw => (true, false, false, true),
            Self::Se => (false, true, true, false),
            Self::Sw => (false, true, false, true),
        }
    }
}

impl CropRect {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Centered rectangle covering `fraction` of each image dimension.
    #[must_use]
    pub fn centered(image: Size, fraction: f64) -> Self {
        let image = image.sanitized();
        let fraction = bound(fraction, 0.0, 1.0);
        let width = image.width * fraction;
        let height = image.height * fraction;
        Self::new((image.width - width) / 2.0, (image.height - height) / 2.0, width, height)
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Applies a pointer drag of `(dx, dy)` on `handle`, starting from `self`.
    ///
    /// Moving keeps the size and stays inside the image. Resizing moves only the
    /// grabbed edges, never past the image bounds and never below `min_size`
    /// (or the image size, if that is smaller).
    #[must_use]
    pub fn drag(self, handle: Handle, dx: f64, dy: f64, image: Size, min_size: f64) -> Self {
        let image = image.sanitized();
        if handle == Handle::Move {
            return Self {
                x: bound(self.x + dx, 0.0, image.width - self.width),
                y: bound(self.y + dy, 0.0, image.height - self.height),
                ..self
            };
        }

        let min_size = extent(min_size);
        let min_w = min_size.min(image.width);
        let min_h = min_size.min(image.height);
        let (north, south, east, west) = handle.edges();
        let (mut left, mut top) = (self.x, self.y);
        let (mut right, mut bottom) = (self.right(), self.bottom());

        if west {
            left = bound(left + dx, 0.0, right - min_w);
        }
        if east {
            right = bound(right + dx, (left + min_w).min(image.width), image.width);
        }
        if north {
            top = bound(top + dy, 0.0, bottom - min_h);
        }
        if south {
            bottom = bound(bottom + dy, (top + min_h).min(image.height), image.height);
        }

        Self::new(left, top, right - left, bottom - top)
    }

    /// Clamps the rectangle inside `image`, shrinking it if it is larger.
    #[must_use]
    pub fn clamp_to(self, image: Size) -> Self {
        let image = image.sanitized();
        let width = bound(self.width, 0.0, image.width);
        let height = bound(self.height, 0.0, image.height);
        Self::new(
            bound(self.x, 0.0, image.width - width),
            bound(self.y, 0.0, image.height - height),
            width,
            height,
        )
    }

    /// Scales a display-space rectangle to natural image pixels, rounded.
    #[must_use]
    pub fn to_natural(self, display: Size, natural: Size) -> Self {
        let sx = if display.width > 0.0 { natural.width / display.width } else { 1.0 };
        let sy = if display.height > 0.0 { natural.height / display.height } else { 1.0 };
        Self::new(
            (self.x * sx).round(),
            (self.y * sy).round(),
            (self.width * sx).round(),
            (self.height * sy).round(),
        )
        .clamp_to(natural)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const IMAGE: Size = Size::new(400.0, 300.0);

    #[test]
    fn move_stays_inside_image() {
        let rect = CropRect::new(100.0, 100.0, 100.0, 100.0);
        let moved = rect.drag(Handle::Move, 500.0, -500.0, IMAGE, DEFAULT_MIN_SIZE);
        assert_eq!(moved, CropRect::new(300.0, 0.0, 100.0, 100.0));
    }

    #[test]
    fn east_handle_grows_width_only() {
        let rect = CropRect::new(100.0, 100.0, 100.0, 100.0);
        let resized = rect.drag(Handle::E, 50.0, 30.0, IMAGE, DEFAULT_MIN_SIZE);
        assert_eq!(resized, CropRect::new(100.0, 100.0, 150.0, 100.0));
    }

    #[test]
    fn north_west_handle_keeps_opposite_corner() {
        let rect = CropRect::new(100.0, 100.0, 100.0, 100.0);
        let resized = rect.drag(Handle::Nw, -40.0, -20.0, IMAGE, DEFAULT_MIN_SIZE);
        assert_eq!(resized, CropRect::new(60.0, 80.0, 140.0, 120.0));
        assert_eq!(resized.right(), rect.right());
        assert_eq!(resized.bottom(), rect.bottom());
    }

    #[test]
    fn resize_respects_min_size() {
        let rect = CropRect::new(100.0, 100.0, 100.0, 100.0);
        let resized = rect.drag(Handle::Sw, 500.0, -500.0, IMAGE, DEFAULT_MIN_SIZE);
        assert_eq!(resized.width, DEFAULT_MIN_SIZE);
        assert_eq!(resized.height, DEFAULT_MIN_SIZE);
        assert_eq!(resized.right(), 200.0);
    }

    #[test]
    fn natural_scaling_rounds() {
        let rect = CropRect::new(10.0, 20.0, 100.0, 50.0);
        let natural = rect.to_natural(Size::new(400.0, 300.0), Size::new(1200.0, 900.0));
        assert_eq!(natural, CropRect::new(30.0, 60.0, 300.0, 150.0));
    }

    #[test]
    fn centered_covers_fraction() {
        assert_eq!(
            CropRect::centered(IMAGE, 0.5),
            CropRect::new(100.0, 75.0, 200.0, 150.0)
        );
    }

    #[test]
    fn degenerate_sizes_do_not_panic() {
        let rect = CropRect::new(10.0, 10.0, 50.0, 50.0);

        let clamped = rect.clamp_to(Size::new(f64::NAN, -5.0));
        assert_eq!(clamped, CropRect::new(0.0, 0.0, 0.0, 0.0));

        let moved = rect.drag(Handle::Move, f64::NAN, 5.0, Size::new(20.0, 20.0), DEFAULT_MIN_SIZE);
        assert_eq!(moved, CropRect::new(0.0, 0.0, 50.0, 50.0));

        let resized = rect.drag(Handle::Nw, -5.0, -5.0, Size::new(-1.0, 30.0), f64::NAN);
        assert!(resized.x >= 0.0 && resized.y >= 0.0);
        assert!(!resized.width.is_nan() && !resized.height.is_nan());

        let natural = rect.to_natural(Size::new(f64::NAN, 0.0), Size::new(100.0, 100.0));
        assert_eq!(natural, CropRect::new(10.0, 10.0, 50.0, 50.0));
    }

    fn handle() -> impl Strategy<Value = Handle> {
        prop_oneof![
            Just(Handle::Move),
            Just(Handle::N),
            Just(Handle::S),
            Just(Handle::E),
            Just(Handle::W),
            Just(Handle::Ne),
            Just(Handle::Nw),
            Just(Handle::Se),
            Just(Handle::Sw),
        ]
    }

    proptest! {
        #[test]
        fn drags_stay_in_bounds(
            handle in handle(),
            dx in -1000.0f64..1000.0,
            dy in -1000.0f64..1000.0,
        ) {
            let start = CropRect::centered(IMAGE, 0.5);
            let rect = start.drag(handle, dx, dy, IMAGE, DEFAULT_MIN_SIZE);
            prop_assert!(rect.x >= 0.0 && rect.y >= 0.0);
            prop_assert!(rect.right() <= IMAGE.width + 1e-9);
            prop_assert!(rect.bottom() <= IMAGE.height + 1e-9);
            prop_assert!(rect.width >= DEFAULT_MIN_SIZE - 1e-9);
            prop_assert!(rect.height >= DEFAULT_MIN_SIZE - 1e-9);
        }

        #[test]
        fn any_image_size_is_accepted(
            handle in handle(),
            width in any::<f64>(),
            height in any::<f64>(),
            min_size in any::<f64>(),
        ) {
            let image = Size::new(width, height);
            let rect = CropRect::new(5.0, 5.0, 40.0, 40.0);
            let _ = rect.drag(handle, 3.0, -3.0, image, min_size);
            let clamped = rect.clamp_to(image);
            prop_assert!(clamped.x >= 0.0 && clamped.y >= 0.0);
        }
    }
}
