//! Geometric primitives for widget placement.
//!
//! Coordinates are PDF user-space units with the origin at the lower-left
//! corner of the page, so `y` grows upwards.

/// A rectangle in PDF user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    /// X coordinate of the lower-left corner
    pub x: f32,
    /// Y coordinate of the lower-left corner
    pub y: f32,
    /// Width of rectangle
    pub width: f32,
    /// Height of rectangle
    pub height: f32,
}

impl Rect {
    /// Create a new rectangle from position and dimensions.
    ///
    /// # Examples
    ///
    /// ```
    /// use fillable_pdf::geometry::Rect;
    ///
    /// let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
    /// assert_eq!(rect.width, 100.0);
    /// assert_eq!(rect.height, 50.0);
    /// ```
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from two opposite corners, in any order.
    ///
    /// PDF `/Rect` arrays are not required to list the lower-left corner
    /// first, so the corners are normalized.
    ///
    /// # Examples
    ///
    /// ```
    /// use fillable_pdf::geometry::Rect;
    ///
    /// let rect = Rect::from_points(110.0, 70.0, 10.0, 20.0);
    /// assert_eq!(rect.x, 10.0);
    /// assert_eq!(rect.y, 20.0);
    /// assert_eq!(rect.width, 100.0);
    /// assert_eq!(rect.height, 50.0);
    /// ```
    pub fn from_points(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x: x0.min(x1),
            y: y0.min(y1),
            width: (x1 - x0).abs(),
            height: (y1 - y0).abs(),
        }
    }

    /// Get the right edge x-coordinate.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Get the top edge y-coordinate.
    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    /// Aspect ratio (width / height). Zero-height rectangles report 0.
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0.0 {
            0.0
        } else {
            self.width / self.height
        }
    }

    /// True when the rectangle covers no area.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Shrink the rectangle by `margin` on every side.
    ///
    /// # Examples
    ///
    /// ```
    /// use fillable_pdf::geometry::Rect;
    ///
    /// let inner = Rect::new(0.0, 0.0, 100.0, 50.0).inset(2.0);
    /// assert_eq!(inner, Rect::new(2.0, 2.0, 96.0, 46.0));
    /// ```
    pub fn inset(&self, margin: f32) -> Rect {
        Rect {
            x: self.x + margin,
            y: self.y + margin,
            width: self.width - 2.0 * margin,
            height: self.height - 2.0 * margin,
        }
    }

    /// Largest rectangle with the aspect ratio of `content_width` x
    /// `content_height` that fits inside `self`, centered on both axes.
    ///
    /// The content is never cropped or distorted: it is scaled uniformly
    /// until one axis touches the bounds, and the leftover space on the
    /// other axis is split evenly.
    ///
    /// # Examples
    ///
    /// ```
    /// use fillable_pdf::geometry::Rect;
    ///
    /// // 2:1 content in a square box is constrained by width
    /// let placed = Rect::new(0.0, 0.0, 100.0, 100.0).fit_centered(200.0, 100.0);
    /// assert_eq!(placed, Rect::new(0.0, 25.0, 100.0, 50.0));
    /// ```
    pub fn fit_centered(&self, content_width: f32, content_height: f32) -> Rect {
        if content_width <= 0.0 || content_height <= 0.0 || self.is_empty() {
            return Rect::new(self.x, self.y, 0.0, 0.0);
        }

        let scale = (self.width / content_width).min(self.height / content_height);
        let width = content_width * scale;
        let height = content_height * scale;

        Rect {
            x: self.x + (self.width - width) / 2.0,
            y: self.y + (self.height - height) / 2.0,
            width,
            height,
        }
    }

    /// Bounding box of this rectangle after applying an affine matrix
    /// `[a b c d e f]`.
    pub fn transform(&self, m: &[f32; 6]) -> Rect {
        let corners = [
            (self.x, self.y),
            (self.right(), self.y),
            (self.x, self.top()),
            (self.right(), self.top()),
        ];

        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        for (x, y) in corners {
            let tx = m[0] * x + m[2] * y + m[4];
            let ty = m[1] * x + m[3] * y + m[5];
            min_x = min_x.min(tx);
            min_y = min_y.min(ty);
            max_x = max_x.max(tx);
            max_y = max_y.max(ty);
        }

        Rect::from_points(min_x, min_y, max_x, max_y)
    }
}

/// Identity transformation matrix.
pub const IDENTITY_MATRIX: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
