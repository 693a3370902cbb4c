//! Aspect ratio and window geometry for the borderless viewer.

/// Which side of the media is longer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DominantAxis {
    Width,
    Height,
    /// Square media
    None,
}

/// Long side divided by short side, plus which side is long
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AspectRatio {
    ratio: f64,
    dominant_axis: DominantAxis,
}

impl Default for AspectRatio {
    /// Used until the first file is opened
    fn default() -> Self {
        Self {
            ratio: 1.4,
            dominant_axis: DominantAxis::Width,
        }
    }
}

impl AspectRatio {
    /// Derive the ratio from pixel dimensions. Returns `None` for zero-sized media.
    pub fn from_dimensions(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }

        let (w, h) = (width as f64, height as f64);
        let aspect = match width.cmp(&height) {
            std::cmp::Ordering::Greater => Self {
                ratio: w / h,
                dominant_axis: DominantAxis::Width,
            },
            std::cmp::Ordering::Less => Self {
                ratio: h / w,
                dominant_axis: DominantAxis::Height,
            },
            std::cmp::Ordering::Equal => Self {
                ratio: 1.0,
                dominant_axis: DominantAxis::None,
            },
        };
        Some(aspect)
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn dominant_axis(&self) -> DominantAxis {
        self.dominant_axis
    }

    /// Size of the short side when the long side is `size`
    fn minor_side(&self, size: u32) -> u32 {
        (size as f64 / self.ratio).round() as u32
    }
}

/// Window position and size in points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowGeometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl WindowGeometry {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Same top-left corner, sized so the dominant side equals `size`
    pub fn resized(&self, size: u32, aspect: &AspectRatio) -> Self {
        let (width, height) = match aspect.dominant_axis() {
            DominantAxis::Width => (size, aspect.minor_side(size)),
            DominantAxis::Height => (aspect.minor_side(size), size),
            DominantAxis::None => (size, size),
        };
        Self {
            x: self.x,
            y: self.y,
            width,
            height,
        }
    }

    /// Same size, moved so that a pointer grabbed at window-local `anchor`
    /// and now at window-local `pointer` stays at the grab offset.
    pub fn dragged(&self, anchor: (f32, f32), pointer: (f32, f32)) -> Self {
        let dx = (pointer.0 - anchor.0).round() as i32;
        let dy = (pointer.1 - anchor.1).round() as i32;
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    pub fn position(&self) -> egui::Pos2 {
        egui::pos2(self.x as f32, self.y as f32)
    }

    pub fn size(&self) -> egui::Vec2 {
        egui::vec2(self.width as f32, self.height as f32)
    }
}
