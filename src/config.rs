//! Configuration for form editing and saving.

/// Appearance defaults used when a field's own `/DA` string is missing or
/// incomplete.
#[derive(Debug, Clone)]
pub struct FormOptions {
    /// Font resource name used when neither the field nor the form declares one.
    pub default_font: String,

    /// Font size used when `/DA` declares none. `0.0` means auto-size.
    pub default_font_size: f32,

    /// Smallest size picked by auto-sizing.
    pub min_auto_font_size: f32,

    /// Largest size picked by auto-sizing.
    pub max_auto_font_size: f32,

    /// Text color (RGB, 0.0-1.0) used when `/DA` declares none.
    pub text_color: (f32, f32, f32),
}

impl Default for FormOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl FormOptions {
    /// Create new options with defaults (Helvetica, auto-sized, black).
    pub fn new() -> Self {
        Self {
            default_font: "Helv".to_string(),
            default_font_size: 0.0,
            min_auto_font_size: 4.0,
            max_auto_font_size: 12.0,
            text_color: (0.0, 0.0, 0.0),
        }
    }

    /// Set the fallback font resource name (without the leading slash).
    pub fn with_default_font(mut self, name: impl Into<String>) -> Self {
        self.default_font = name.into();
        self
    }

    /// Set the fallback font size (`0.0` = auto).
    pub fn with_default_font_size(mut self, size: f32) -> Self {
        self.default_font_size = size.max(0.0);
        self
    }

    /// Set the range auto-sizing may pick from.
    pub fn with_auto_font_range(mut self, min: f32, max: f32) -> Self {
        self.min_auto_font_size = min.min(max);
        self.max_auto_font_size = max.max(min);
        self
    }

    /// Set the fallback text color.
    pub fn with_text_color(mut self, r: f32, g: f32, b: f32) -> Self {
        self.text_color = (r, g, b);
        self
    }
}

/// Options controlling how a document is written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    /// Merge widget appearances into page content and empty the form
    pub flatten: bool,
    /// Compress streams
    pub compress: bool,
    /// Remove unused objects
    pub garbage_collect: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self::full_rewrite()
    }
}

impl SaveOptions {
    /// Interactive output with compressed streams and unused objects dropped.
    pub fn full_rewrite() -> Self {
        Self {
            flatten: false,
            compress: true,
            garbage_collect: true,
        }
    }

    /// Flattened output: the form is no longer interactive.
    pub fn flattened() -> Self {
        Self {
            flatten: true,
            ..Self::full_rewrite()
        }
    }

    /// Set whether the form is flattened.
    pub fn with_flatten(mut self, flatten: bool) -> Self {
        self.flatten = flatten;
        self
    }

    /// Set whether streams are compressed.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
}
