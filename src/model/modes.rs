/// Which of the two height palettes the terrain is shaded with
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ColourMode {
    #[default]
    Natural,
    Contour,
}

impl ColourMode {
    pub fn toggled(self) -> Self {
        match self {
            ColourMode::Natural => ColourMode::Contour,
            ColourMode::Contour => ColourMode::Natural,
        }
    }

    /// value handed to shaders as the `colour_mode` uniform
    pub fn as_uniform(self) -> u32 {
        match self {
            ColourMode::Natural => 0,
            ColourMode::Contour => 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum DrawMode {
    #[default]
    Fill,
    Lines,
    Points,
}

impl DrawMode {
    /// Fill -> Lines -> Points -> Fill
    pub fn next(self) -> Self {
        match self {
            DrawMode::Fill => DrawMode::Lines,
            DrawMode::Lines => DrawMode::Points,
            DrawMode::Points => DrawMode::Fill,
        }
    }
}

/// Mode state owned by the input layer and handed to the scene once per frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderModes {
    pub height_scale: u32,
    pub colour_mode: ColourMode,
    pub draw_mode: DrawMode,
}

impl RenderModes {
    pub fn new(height_scale: u32) -> Self {
        Self {
            height_scale,
            colour_mode: ColourMode::default(),
            draw_mode: DrawMode::default(),
        }
    }

    /// Step the height scale by one, wrapping from `max` back to `min`
    pub fn cycle_height_scale(&mut self, min: u32, max: u32) {
        self.height_scale += 1;
        if self.height_scale > max {
            self.height_scale = min;
        }
    }

    pub fn toggle_colour_mode(&mut self) {
        self.colour_mode = self.colour_mode.toggled();
    }

    pub fn cycle_draw_mode(&mut self) {
        self.draw_mode = self.draw_mode.next();
    }
}
