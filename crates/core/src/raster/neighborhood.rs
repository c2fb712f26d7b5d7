//! Cell adjacency used by region labelling

/// Which cells count as adjacent to a given cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighborhood {
    /// Edge-sharing neighbours only (N, E, S, W)
    Rook,
    /// Edge- and corner-sharing neighbours (8 cells)
    Queen,
}

const ROOK: [(isize, isize); 4] = [(-1, 0), (0, 1), (1, 0), (0, -1)];
const QUEEN: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
];

impl Neighborhood {
    /// Relative `(d_row, d_col)` offsets, centre excluded
    pub fn offsets(&self) -> &'static [(isize, isize)] {
        match self {
            Neighborhood::Rook => &ROOK,
            Neighborhood::Queen => &QUEEN,
        }
    }

    /// In-bounds neighbours of `(row, col)` in a `rows x cols` grid
    pub fn neighbors(
        &self,
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    ) -> impl Iterator<Item = (usize, usize)> {
        self.offsets().iter().filter_map(move |&(dr, dc)| {
            let r = row.checked_add_signed(dr)?;
            let c = col.checked_add_signed(dc)?;
            (r < rows && c < cols).then_some((r, c))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corner_neighbors() {
        let rook: Vec<_> = Neighborhood::Rook.neighbors(0, 0, 3, 3).collect();
        assert_eq!(rook, vec![(0, 1), (1, 0)]);

        let queen: Vec<_> = Neighborhood::Queen.neighbors(0, 0, 3, 3).collect();
        assert_eq!(queen.len(), 3);
        assert!(queen.contains(&(1, 1)));
    }

    #[test]
    fn test_interior_neighbors() {
        assert_eq!(Neighborhood::Rook.neighbors(1, 1, 3, 3).count(), 4);
        assert_eq!(Neighborhood::Queen.neighbors(1, 1, 3, 3).count(), 8);
    }
}
