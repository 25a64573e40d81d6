use glam::Vec3;

/// Cells per axis of the window
pub const GRID: usize = 3;
pub const N_CELLS: usize = GRID * GRID;

/// Address of a chunk inside the 3x3 window.
///
/// ```text
///          +X  <----  col  ---->  -X
///   +Z   (0,0)  (0,1)  (0,2)
///   row  (1,0)  (1,1)  (1,2)      (1,1) = center
///   -Z   (2,0)  (2,1)  (2,2)      (2,2) = reference
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
}

impl GridCell {
    /// the chunk the camera stands in
    pub const CENTER: GridCell = GridCell { row: 1, col: 1 };
    /// most negative corner, the boundary shift decisions are measured from
    pub const REFERENCE: GridCell = GridCell { row: 2, col: 2 };

    pub fn from_index(index: usize) -> Option<Self> {
        (index < N_CELLS).then(|| GridCell { row: index / GRID, col: index % GRID })
    }

    pub fn index(self) -> usize {
        self.row * GRID + self.col
    }

    /// All cells in draw order (row-major)
    pub fn all() -> impl Iterator<Item = GridCell> {
        (0..N_CELLS).filter_map(GridCell::from_index)
    }

    /// Offset of this cell's origin from the center origin
    pub fn offset(self, side: f32) -> Vec3 {
        let dx = 1 - self.col as i32;
        let dz = 1 - self.row as i32;
        Vec3::new(dx as f32 * side, 0.0, dz as f32 * side)
    }
}

/// Axis-aligned move of the whole window by one chunk
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shift {
    PosX,
    NegX,
    PosZ,
    NegZ,
}

impl Shift {
    pub fn direction(self, side: f32) -> Vec3 {
        match self {
            Shift::PosX => Vec3::new(side, 0.0, 0.0),
            Shift::NegX => Vec3::new(-side, 0.0, 0.0),
            Shift::PosZ => Vec3::new(0.0, 0.0, side),
            Shift::NegZ => Vec3::new(0.0, 0.0, -side),
        }
    }
}

/// Shifts decided for one frame, at most one per axis
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ShiftPlan {
    pub x: Option<Shift>,
    pub z: Option<Shift>,
}

impl ShiftPlan {
    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.z.is_none()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn iter(&self) -> impl Iterator<Item = Shift> {
        self.x.into_iter().chain(self.z)
    }
}

/// The "mega-chunk": nine chunk origins kept in a 3x3 lattice around the camera.
///
/// Created once from the camera position and from then on only shifted by one
/// chunk at a time. Shift decisions compare the camera against the reference
/// cell: past `reference + 2S` moves the window forward, below `reference + S`
/// moves it back, which keeps the camera within the center cell.
///
/// Known limitation: only one shift per axis is applied per frame, so a camera
/// moving more than one chunk per frame leaves the center cell and the window
/// catches up over the following frames.
#[derive(Clone, Debug)]
pub struct ChunkWindow {
    side: f32,
    half_side: f32,
    floor_y: f32,
    center: Vec3,
    origins: [Vec3; N_CELLS],
}

impl ChunkWindow {
    pub fn new(side: usize, floor_y: f32, camera: Vec3) -> Self {
        let mut window = Self {
            side: side as f32,
            // integer halving, as odd sides are measured in whole voxels
            half_side: (side / 2) as f32,
            floor_y,
            center: Vec3::ZERO,
            origins: [Vec3::ZERO; N_CELLS],
        };
        window.initialize(camera);
        window
    }

    /// Absolute placement: center the window on the camera, snapped to whole voxels
    /// so every later shift moves the lattice in exact integer steps
    pub fn initialize(&mut self, camera: Vec3) {
        self.center = Vec3::new(
            (camera.x - self.half_side).floor(),
            self.floor_y,
            (camera.z - self.half_side).floor(),
        );
        self.recompute();
        tracing::debug!("chunk window placed at {:?}", self.center);
    }

    /// Relative placement: move every cell by one chunk
    pub fn shift(&mut self, shift: Shift) {
        let direction = shift.direction(self.side);
        self.center = Vec3::new(self.center.x + direction.x, self.floor_y, self.center.z + direction.z);
        self.recompute();
        tracing::debug!("chunk window shifted {:?} to {:?}", shift, self.center);
    }

    pub fn should_shift(&self, camera: Vec3) -> ShiftPlan {
        let reference = self.reference();

        let x = if camera.x > reference.x + self.side * 2.0 {
            Some(Shift::PosX)
        } else if camera.x < reference.x + self.side {
            Some(Shift::NegX)
        } else {
            None
        };

        let z = if camera.z > reference.z + self.side * 2.0 {
            Some(Shift::PosZ)
        } else if camera.z < reference.z + self.side {
            Some(Shift::NegZ)
        } else {
            None
        };

        ShiftPlan { x, z }
    }

    /// Decide and apply this frame's shifts
    pub fn update(&mut self, camera: Vec3) -> ShiftPlan {
        let plan = self.should_shift(camera);
        for shift in plan.iter() {
            self.shift(shift);
        }
        plan
    }

    fn recompute(&mut self) {
        for cell in GridCell::all() {
            self.origins[cell.index()] = self.center + cell.offset(self.side);
        }
    }

    pub fn center(&self) -> Vec3 {
        self.origins[GridCell::CENTER.index()]
    }

    pub fn reference(&self) -> Vec3 {
        self.origins[GridCell::REFERENCE.index()]
    }

    pub fn cell(&self, cell: GridCell) -> Vec3 {
        self.origins[cell.index()]
    }

    /// Origins in draw order
    pub fn origins(&self) -> &[Vec3; N_CELLS] {
        &self.origins
    }

    pub fn cells(&self) -> impl Iterator<Item = (GridCell, Vec3)> + '_ {
        GridCell::all().map(move |cell| (cell, self.origins[cell.index()]))
    }

    /// Whether `origin` is one of the nine current cells
    pub fn contains_origin(&self, origin: Vec3) -> bool {
        self.origins.contains(&origin)
    }

    /// Whether the camera is horizontally inside the center cell
    pub fn center_contains(&self, camera: Vec3) -> bool {
        let c = self.center();
        (c.x..=c.x + self.side).contains(&camera.x) && (c.z..=c.z + self.side).contains(&camera.z)
    }

    pub fn side(&self) -> f32 {
        self.side
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn assert_lattice(window: &ChunkWindow) {
        let s = window.side();
        for (cell, origin) in window.cells() {
            assert_eq!(origin, window.center() + cell.offset(s));
            assert_eq!(origin.y, window.center().y);
        }
        // neighbours along a row/column are exactly one side apart
        for row in 0..GRID {
            for col in 0..GRID - 1 {
                let a = window.cell(GridCell { row, col });
                let b = window.cell(GridCell { row, col: col + 1 });
                assert_eq!(a - b, Vec3::new(s, 0.0, 0.0));
                let a = window.cell(GridCell { row: col, col: row });
                let b = window.cell(GridCell { row: col + 1, col: row });
                assert_eq!(a - b, Vec3::new(0.0, 0.0, s));
            }
        }
    }

    #[test]
    fn initialize_centers_on_camera() {
        let window = ChunkWindow::new(16, -20.0, Vec3::new(13.0, 0.0, 13.0));
        assert_eq!(window.center(), Vec3::new(5.0, -20.0, 5.0));
        assert_eq!(window.cell(GridCell { row: 0, col: 0 }), Vec3::new(21.0, -20.0, 21.0));
        assert_eq!(window.origins()[0], Vec3::new(21.0, -20.0, 21.0));
        assert_eq!(window.reference(), Vec3::new(-11.0, -20.0, -11.0));
        assert_lattice(&window);
    }

    #[test]
    fn offsets_follow_fixed_table() {
        let s = 16.0;
        let expected = [
            Vec3::new(s, 0.0, s),
            Vec3::new(0.0, 0.0, s),
            Vec3::new(-s, 0.0, s),
            Vec3::new(s, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(-s, 0.0, 0.0),
            Vec3::new(s, 0.0, -s),
            Vec3::new(0.0, 0.0, -s),
            Vec3::new(-s, 0.0, -s),
        ];
        let offsets: Vec<Vec3> = GridCell::all().map(|c| c.offset(s)).collect();
        assert_eq!(offsets, expected);
    }

    #[test]
    fn shift_translates_every_cell() {
        let mut window = ChunkWindow::new(16, -20.0, Vec3::new(13.0, 0.0, 13.0));
        let before = *window.origins();
        window.shift(Shift::PosX);

        assert_eq!(window.center(), Vec3::new(21.0, -20.0, 5.0));
        for (a, b) in before.iter().zip(window.origins()) {
            assert_eq!(*b - *a, Vec3::new(16.0, 0.0, 0.0));
        }
        assert_lattice(&window);
    }

    #[test]
    fn camera_at_spawn_needs_no_shift() {
        let window = ChunkWindow::new(16, -20.0, Vec3::new(13.0, 0.0, 13.0));
        assert!(window.should_shift(Vec3::new(13.0, 0.0, 13.0)).is_empty());
        // both edges of the center cell are still inside
        assert!(window.should_shift(Vec3::new(5.0, 0.0, 21.0)).is_empty());
    }

    #[test_case(Vec3::new(21.5, 0.0, 13.0), Some(Shift::PosX), None)]
    #[test_case(Vec3::new(4.5, 0.0, 13.0), Some(Shift::NegX), None)]
    #[test_case(Vec3::new(13.0, 0.0, 21.5), None, Some(Shift::PosZ))]
    #[test_case(Vec3::new(13.0, 0.0, 4.5), None, Some(Shift::NegZ))]
    #[test_case(Vec3::new(30.0, 7.0, -2.0), Some(Shift::PosX), Some(Shift::NegZ))]
    fn shift_decisions_per_axis(camera: Vec3, x: Option<Shift>, z: Option<Shift>) {
        let window = ChunkWindow::new(16, -20.0, Vec3::new(13.0, 0.0, 13.0));
        assert_eq!(window.should_shift(camera), ShiftPlan { x, z });
    }

    #[test]
    fn update_applies_both_axes() {
        let mut window = ChunkWindow::new(16, -20.0, Vec3::new(13.0, 0.0, 13.0));
        let plan = window.update(Vec3::new(22.0, 0.0, 3.0));
        assert_eq!(plan.len(), 2);
        assert_eq!(window.center(), Vec3::new(21.0, -20.0, -11.0));
        assert!(window.center_contains(Vec3::new(22.0, 0.0, 3.0)));
        assert_lattice(&window);
    }

    #[test]
    fn camera_stays_in_center_during_walk() {
        let side = 16.0;
        let mut camera = Vec3::new(13.0, 0.0, 13.0);
        let mut window = ChunkWindow::new(16, -20.0, camera);

        // deterministic pseudo-random walk, at most one chunk per axis per frame
        let mut state: u32 = 0x1234_5678;
        let mut next = || {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0
        };
        for _ in 0..2000 {
            camera.x += next() * side;
            camera.z += next() * side;
            window.update(camera);
            assert!(window.center_contains(camera), "camera {camera:?} left {:?}", window.center());
            assert_lattice(&window);
        }
    }

    #[test]
    fn fractional_camera_snaps_to_voxel_lattice() {
        let mut camera = Vec3::new(13.3, 0.0, 13.7);
        let mut window = ChunkWindow::new(16, -20.0, camera);
        assert_eq!(window.center(), Vec3::new(5.0, -20.0, 5.0));
        assert_lattice(&window);

        for _ in 0..400 {
            camera.x += 9.0;
            camera.z -= 7.5;
            window.update(camera);
            let c = window.center();
            assert_eq!((c.x.fract(), c.z.fract()), (0.0, 0.0), "center {c:?} off the voxel grid");
            assert_lattice(&window);
        }
        assert!(window.center_contains(camera));
    }

    #[test]
    fn fast_camera_lags_then_catches_up() {
        let mut window = ChunkWindow::new(16, -20.0, Vec3::new(13.0, 0.0, 13.0));
        let camera = Vec3::new(13.0 + 48.0, 0.0, 13.0);

        window.update(camera);
        assert!(!window.center_contains(camera));
        window.update(camera);
        window.update(camera);
        assert!(window.center_contains(camera));
        assert_eq!(window.center(), Vec3::new(53.0, -20.0, 5.0));
    }

    #[test]
    fn grid_cell_index_round_trips() {
        for cell in GridCell::all() {
            assert_eq!(GridCell::from_index(cell.index()), Some(cell));
        }
        assert_eq!(GridCell::from_index(9), None);
        assert_eq!(GridCell::CENTER.index(), 4);
    }

    #[test]
    fn contains_origin_tracks_shifts() {
        let mut window = ChunkWindow::new(16, -20.0, Vec3::new(13.0, 0.0, 13.0));
        let dropped = window.cell(GridCell { row: 0, col: 2 });
        window.shift(Shift::PosX);
        assert!(!window.contains_origin(dropped));
        assert!(window.contains_origin(Vec3::new(37.0, -20.0, 21.0)));
    }
}
