use glam::Vec2;

/// Maximum number of particle indices a single cell can hold.
pub const CELL_CAPACITY: usize = 8;

/// One bucket of the uniform spatial hash.
///
/// Overflow policy: once `count` reaches `CELL_CAPACITY - 1`, further inserts
/// keep landing on (and overwriting) that last slot rather than being
/// dropped outright — the `count` saturates instead of the write being
/// skipped. This mirrors the reference implementation's
/// `count += count < (CAPACITY - 1)` saturating-increment exactly; see
/// DESIGN.md for the alternative considered.
#[derive(Clone, Debug)]
pub struct Cell {
    count: u8,
    objects: [u32; CELL_CAPACITY],
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            count: 0,
            objects: [0; CELL_CAPACITY],
        }
    }
}

impl Cell {
    pub fn push(&mut self, id: u32) {
        let slot = self.count as usize;
        self.objects[slot] = id;
        if (self.count as usize) < CELL_CAPACITY - 1 {
            self.count += 1;
        }
    }

    pub fn clear(&mut self) {
        self.count = 0;
    }

    pub fn ids(&self) -> &[u32] {
        &self.objects[..self.count as usize]
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// A pure function of current particle positions, fully rebuilt every
/// substep. `cell_size` must be at least twice the largest particle radius,
/// so that any colliding pair lands in cells at most one apart on each axis
/// — the caller's responsibility, per spec.
#[derive(Clone, Debug)]
pub struct Grid {
    pub width: i32,
    pub height: i32,
    pub cell_size: f32,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(world_size: Vec2, cell_size: f32) -> Self {
        let width = (world_size.x / cell_size).ceil().max(1.0) as i32;
        let height = (world_size.y / cell_size).ceil().max(1.0) as i32;
        Self {
            width,
            height,
            cell_size,
            cells: vec![Cell::default(); (width * height) as usize],
        }
    }

    pub fn cell_index(&self, x: i32, y: i32) -> usize {
        (x * self.height + y) as usize
    }

    pub fn coords_of(&self, position: Vec2) -> (i32, i32) {
        (
            (position.x / self.cell_size) as i32,
            (position.y / self.cell_size) as i32,
        )
    }

    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.width && y >= 0 && y < self.height
    }

    /// Inserts a particle into the cell its position falls into. Out-of-
    /// bounds coordinates are silently ignored — the caller (the grid
    /// rebuild step) is expected to have already excluded near-boundary
    /// particles per spec.
    pub fn add_object(&mut self, position: Vec2, id: u32) {
        let (x, y) = self.coords_of(position);
        if self.in_bounds(x, y) {
            let idx = self.cell_index(x, y);
            self.cells[idx].push(id);
        }
    }

    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
    }

    pub fn cell(&self, idx: usize) -> &Cell {
        &self.cells[idx]
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The up-to-9 cell indices (self plus in-bounds neighbours) that a
    /// particle in cell `idx` must be checked against.
    pub fn neighbourhood(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        let idx = idx as i32;
        let height = self.height;
        let x = idx / height;
        let y = idx % height;
        let width = self.width;
        [
            (0, 0),
            (0, -1),
            (0, 1),
            (-1, 0),
            (-1, -1),
            (-1, 1),
            (1, 0),
            (1, -1),
            (1, 1),
        ]
        .into_iter()
        .filter_map(move |(dx, dy)| {
            let nx = x + dx;
            let ny = y + dy;
            if nx >= 0 && nx < width && ny >= 0 && ny < height {
                Some((nx * height + ny) as usize)
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_saturates_last_slot() {
        let mut cell = Cell::default();
        for id in 0..12u32 {
            cell.push(id);
        }
        assert_eq!(cell.ids().len(), CELL_CAPACITY - 1);
        // the last slot keeps getting overwritten by later inserts
        assert_eq!(cell.ids()[CELL_CAPACITY - 2], 11);
        assert_eq!(cell.ids()[0], 0);
    }

    #[test]
    fn rebuild_is_pure_function_of_positions() {
        let mut grid_a = Grid::new(Vec2::new(200.0, 200.0), 20.0);
        let mut grid_b = Grid::new(Vec2::new(200.0, 200.0), 20.0);
        let positions = [Vec2::new(50.0, 50.0), Vec2::new(52.0, 48.0), Vec2::new(150.0, 10.0)];
        for (i, p) in positions.iter().enumerate() {
            grid_a.add_object(*p, i as u32);
            grid_b.add_object(*p, i as u32);
        }
        for idx in 0..grid_a.len() {
            assert_eq!(grid_a.cell(idx).ids(), grid_b.cell(idx).ids());
        }
    }

    #[test]
    fn clear_empties_every_cell() {
        let mut grid = Grid::new(Vec2::new(100.0, 100.0), 20.0);
        grid.add_object(Vec2::new(10.0, 10.0), 0);
        grid.clear();
        for idx in 0..grid.len() {
            assert!(grid.cell(idx).is_empty());
        }
    }
}
