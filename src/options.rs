pub const DEFAULT_LINE_WIDTH: usize = 64;
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Tunables shared by the codec and the inspector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    pub line_width: usize,
    pub max_depth: usize,
    pub accept_raw_hex: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            line_width: DEFAULT_LINE_WIDTH,
            max_depth: DEFAULT_MAX_DEPTH,
            accept_raw_hex: true,
        }
    }
}

impl Options {
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }

    /// Line width actually used by the PEM encoder.
    pub fn effective_line_width(&self) -> usize {
        match self.line_width {
            0 => DEFAULT_LINE_WIDTH,
            w => w,
        }
    }
}

#[derive(Default)]
pub struct OptionsBuilder {
    line_width: Option<usize>,
    max_depth: Option<usize>,
    accept_raw_hex: Option<bool>,
}

impl OptionsBuilder {
    pub fn line_width(mut self, width: usize) -> OptionsBuilder {
        self.line_width = Some(width);
        self
    }

    pub fn max_depth(mut self, depth: usize) -> OptionsBuilder {
        self.max_depth = Some(depth);
        self
    }

    pub fn accept_raw_hex(mut self, accept: bool) -> OptionsBuilder {
        self.accept_raw_hex = Some(accept);
        self
    }

    pub fn build(self) -> Options {
        let d = Options::default();

        Options {
            line_width: self.line_width.unwrap_or(d.line_width),
            max_depth: self.max_depth.unwrap_or(d.max_depth),
            accept_raw_hex: self.accept_raw_hex.unwrap_or(d.accept_raw_hex),
        }
    }
}
