use itertools::Itertools;
use rand::prelude::IndexedRandom;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeSet, HashSet};

/// Represents a 2D coordinate on the minesweeper board.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Point {
    pub x: usize,
    pub y: usize,
}

/// The visible state of a single cell on the board.
/// This is the only state the solver is ever shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Cell {
    Hidden,
    Revealed(u8), // The u8 is the number of adjacent mines.
}

/// Represents the current state of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum GameState {
    Playing,
    Won,
    Lost,
}

/// A logical statement about the board: exactly `count` of `cells` are mines.
///
/// The cell set is kept sorted so that two constraints built from the same
/// cells in any order compare equal, which is what deduplication relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    cells: BTreeSet<Point>,
    count: usize,
}

impl Constraint {
    pub fn new(cells: BTreeSet<Point>, count: usize) -> Self {
        assert!(
            count <= cells.len(),
            "constraint claims {} mines among {} cells",
            count,
            cells.len()
        );
        Constraint { cells, count }
    }

    pub fn cells(&self) -> &BTreeSet<Point> {
        &self.cells
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// All member cells, if every one of them must be a mine.
    pub fn known_mines(&self) -> Option<&BTreeSet<Point>> {
        if !self.cells.is_empty() && self.count == self.cells.len() {
            Some(&self.cells)
        } else {
            None
        }
    }

    /// All member cells, if none of them can be a mine.
    pub fn known_safes(&self) -> Option<&BTreeSet<Point>> {
        if !self.cells.is_empty() && self.count == 0 {
            Some(&self.cells)
        } else {
            None
        }
    }

    /// Removes a cell now known to be a mine, lowering the mine count with
    /// it. Does nothing if the cell is not a member.
    pub fn mark_mine(&mut self, cell: Point) {
        if self.cells.remove(&cell) {
            self.count -= 1;
        }
    }

    /// Removes a cell now known to be safe. The mine count is unaffected,
    /// since the remaining cells still account for all of it.
    pub fn mark_safe(&mut self, cell: Point) {
        self.cells.remove(&cell);
    }
}

/// Everything the solver has established about one game: the cells it has
/// probed, the cells it has resolved either way, and the constraints that
/// are still open.
///
/// `safes` and `mines` only ever grow, and stay disjoint. A cell never
/// appears both in a stored constraint and in one of the resolved sets:
/// resolving a cell strips it from every constraint immediately.
#[derive(Debug, Default)]
pub struct Knowledge {
    moves_made: HashSet<Point>,
    safes: HashSet<Point>,
    mines: HashSet<Point>,
    constraints: Vec<Constraint>,
}

impl Knowledge {
    pub fn moves_made(&self) -> &HashSet<Point> {
        &self.moves_made
    }

    pub fn safes(&self) -> &HashSet<Point> {
        &self.safes
    }

    pub fn mines(&self) -> &HashSet<Point> {
        &self.mines
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Records a cell as a mine and strips it from every stored constraint.
    /// Returns whether the cell was newly resolved.
    fn mark_mine(&mut self, cell: Point) -> bool {
        debug_assert!(
            !self.safes.contains(&cell),
            "cell ({}, {}) marked both safe and mine",
            cell.x,
            cell.y
        );
        let added = self.mines.insert(cell);
        if added {
            for constraint in &mut self.constraints {
                constraint.mark_mine(cell);
            }
        }
        added
    }

    /// Records a cell as safe and strips it from every stored constraint.
    /// Returns whether the cell was newly resolved.
    fn mark_safe(&mut self, cell: Point) -> bool {
        debug_assert!(
            !self.mines.contains(&cell),
            "cell ({}, {}) marked both safe and mine",
            cell.x,
            cell.y
        );
        let added = self.safes.insert(cell);
        if added {
            for constraint in &mut self.constraints {
                constraint.mark_safe(cell);
            }
        }
        added
    }

    /// Appends a constraint unless an equal one is already stored.
    /// Returns whether it was added.
    fn insert_constraint(&mut self, constraint: Constraint) -> bool {
        if self.constraints.contains(&constraint) {
            return false;
        }
        self.constraints.push(constraint);
        true
    }

    /// Drops later duplicates of constraints that marking has collapsed into
    /// equals. The first occurrence survives. Returns whether anything was
    /// dropped.
    fn dedup_constraints(&mut self) -> bool {
        let mut seen: Vec<Constraint> = Vec::with_capacity(self.constraints.len());
        let before = self.constraints.len();
        self.constraints.retain(|constraint| {
            if seen.contains(constraint) {
                false
            } else {
                seen.push(constraint.clone());
                true
            }
        });
        self.constraints.len() != before
    }
}

/// All in-bounds cells within one row and column of `at`, excluding `at`
/// itself. Handles board edges and corners.
pub fn neighbors(width: usize, height: usize, at: Point) -> impl Iterator<Item = Point> {
    (-1..=1).flat_map(move |dy: isize| {
        (-1..=1).filter_map(move |dx: isize| {
            if dx == 0 && dy == 0 {
                return None;
            }

            let nx = at.x as isize + dx;
            let ny = at.y as isize + dy;

            if nx >= 0 && nx < width as isize && ny >= 0 && ny < height as isize {
                Some(Point {
                    x: nx as usize,
                    y: ny as usize,
                })
            } else {
                None
            }
        })
    })
}

/// The deduction engine. Fed one `(cell, count)` observation per probed
/// cell, it derives which unprobed cells are certainly safe and which are
/// certainly mines, and offers the next cell to probe.
///
/// Inference is purely logical: each observation becomes a constraint, and
/// constraints are combined pairwise by subset subtraction until nothing new
/// can be concluded. A conclusion, once drawn, is never retracted.
pub struct Solver {
    width: usize,
    height: usize,
    knowledge: Knowledge,
    rng: StdRng,
}

impl Solver {
    pub fn new(width: usize, height: usize) -> Self {
        Self::with_rng(width, height, StdRng::from_os_rng())
    }

    /// A solver with a fixed seed, so that random fallback moves are
    /// reproducible.
    pub fn seeded(width: usize, height: usize, seed: u64) -> Self {
        Self::with_rng(width, height, StdRng::seed_from_u64(seed))
    }

    fn with_rng(width: usize, height: usize, rng: StdRng) -> Self {
        Solver {
            width,
            height,
            knowledge: Knowledge::default(),
            rng,
        }
    }

    pub fn knowledge(&self) -> &Knowledge {
        &self.knowledge
    }

    pub fn known_safes(&self) -> &HashSet<Point> {
        &self.knowledge.safes
    }

    pub fn known_mines(&self) -> &HashSet<Point> {
        &self.knowledge.mines
    }

    /// Accepts the environment's report that `cell` was probed, is not a
    /// mine, and has `count` mines among its in-bounds neighbors.
    ///
    /// The cell is recorded as a made move and marked safe. Its unresolved
    /// neighbors become a new constraint: neighbors already known to be
    /// mines lower the working count and are left out, neighbors already
    /// known safe are left out with the count untouched. The knowledge base
    /// is then saturated.
    ///
    /// Panics if `cell` was already observed or if `count` contradicts what
    /// is already known; both are caller contract violations.
    pub fn observe(&mut self, cell: Point, count: usize) {
        assert!(
            !self.knowledge.moves_made.contains(&cell),
            "cell ({}, {}) observed twice",
            cell.x,
            cell.y
        );
        self.knowledge.moves_made.insert(cell);
        self.knowledge.mark_safe(cell);

        let mut working = count;
        let mut cells = BTreeSet::new();
        for neighbor in neighbors(self.width, self.height, cell) {
            if self.knowledge.mines.contains(&neighbor) {
                working = working
                    .checked_sub(1)
                    .expect("observed count below known adjacent mines");
            } else if !self.knowledge.safes.contains(&neighbor) {
                cells.insert(neighbor);
            }
        }
        assert!(
            working <= cells.len(),
            "observed count {} exceeds the {} unresolved neighbors of ({}, {})",
            working,
            cells.len(),
            cell.x,
            cell.y
        );

        if !cells.is_empty() {
            self.knowledge
                .insert_constraint(Constraint::new(cells, working));
        }

        self.saturate();
    }

    /// Accepts authoritative external information that `cell` is a mine,
    /// without a count observation (e.g. a flag placed by the driver).
    pub fn mark_mine(&mut self, cell: Point) {
        self.knowledge.mark_mine(cell);
        self.saturate();
    }

    /// Runs subset inference and conclusion harvesting until a full pass
    /// marks no cell, adds no constraint, and discards no constraint.
    ///
    /// Termination: each pass that makes progress either resolves a cell
    /// (shrinking every constraint containing it), discards a constraint,
    /// or adds a constraint over a strict subset of an existing one, so the
    /// total work is bounded by the board size.
    fn saturate(&mut self) {
        loop {
            let mut progress = self.infer_subsets();
            progress |= self.harvest();
            if !progress {
                break;
            }
        }
    }

    /// One pass of the subset-inference rule over all ordered constraint
    /// pairs: if A's cells are a subset of B's, the cells of B outside A
    /// hold exactly `B.count - A.count` mines. A zero difference makes them
    /// all safe, a difference equal to their number makes them all mines,
    /// and anything in between is a new, smaller constraint.
    fn infer_subsets(&mut self) -> bool {
        let mut safes = BTreeSet::new();
        let mut mines = BTreeSet::new();
        let mut derived = Vec::new();

        let constraints = &self.knowledge.constraints;
        for (i, j) in (0..constraints.len()).cartesian_product(0..constraints.len()) {
            if i == j {
                continue;
            }
            let (a, b) = (&constraints[i], &constraints[j]);
            // Equal cell sets carry no new information either way.
            if a.cells == b.cells || !a.cells.is_subset(&b.cells) {
                continue;
            }

            let diff: BTreeSet<Point> = b.cells.difference(&a.cells).copied().collect();
            assert!(
                b.count >= a.count,
                "subset constraint claims more mines than its superset"
            );
            let delta = b.count - a.count;

            if delta == 0 {
                safes.extend(diff);
            } else if delta == diff.len() {
                mines.extend(diff);
            } else {
                derived.push(Constraint::new(diff, delta));
            }
        }

        let mut progress = false;
        // Insert before marking, so marking strips resolved cells out of the
        // freshly derived constraints too.
        for constraint in derived {
            progress |= self.knowledge.insert_constraint(constraint);
        }
        for cell in safes {
            progress |= self.knowledge.mark_safe(cell);
        }
        for cell in mines {
            progress |= self.knowledge.mark_mine(cell);
        }
        progress |= self.knowledge.dedup_constraints();
        progress
    }

    /// Extracts trivial conclusions from every stored constraint and
    /// discards the constraints that yielded one, along with any left empty.
    fn harvest(&mut self) -> bool {
        let mut safes = Vec::new();
        let mut mines = Vec::new();

        let before = self.knowledge.constraints.len();
        self.knowledge.constraints.retain(|constraint| {
            if constraint.is_empty() {
                return false;
            }
            if let Some(cells) = constraint.known_safes() {
                safes.extend(cells.iter().copied());
                return false;
            }
            if let Some(cells) = constraint.known_mines() {
                mines.extend(cells.iter().copied());
                return false;
            }
            true
        });

        let mut progress = self.knowledge.constraints.len() != before;
        for cell in safes {
            progress |= self.knowledge.mark_safe(cell);
        }
        for cell in mines {
            progress |= self.knowledge.mark_mine(cell);
        }
        progress
    }

    /// A cell known to be safe that has not been probed yet, if any.
    /// Which one is unspecified. Does not mutate anything.
    pub fn pick_safe_move(&self) -> Option<Point> {
        self.knowledge
            .safes
            .difference(&self.knowledge.moves_made)
            .next()
            .copied()
    }

    /// A uniformly random cell that has not been probed and is not a known
    /// mine, or `None` once no such cell remains.
    pub fn pick_random_move(&mut self) -> Option<Point> {
        let candidates: Vec<Point> = (0..self.height)
            .cartesian_product(0..self.width)
            .map(|(y, x)| Point { x, y })
            .filter(|p| {
                !self.knowledge.moves_made.contains(p) && !self.knowledge.mines.contains(p)
            })
            .collect();
        candidates.choose(&mut self.rng).copied()
    }
}

/// The board environment: the hidden mine layout plus the visible board.
/// It answers probes with neighbor mine counts and tracks the win
/// condition; it never reasons about anything.
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Game {
    pub width: usize,
    pub height: usize,
    /// The visible state of the board, one entry per cell.
    pub board: Vec<Vec<Cell>>,
    /// Cells flagged as mines by the player or driver.
    pub flagged: BTreeSet<Point>,
    /// Tracks the current status of the game (playing, won, lost).
    pub game_state: GameState,
    mines: BTreeSet<Point>,
}

impl Game {
    /// A fresh board with `total_mines` mines placed uniformly at random.
    pub fn new(width: usize, height: usize, total_mines: usize) -> Self {
        if total_mines >= width * height {
            panic!("Total mines must be less than the number of cells on the board.");
        }
        let mut rng = rand::rng();
        let mut mines = BTreeSet::new();
        while mines.len() != total_mines {
            mines.insert(Point {
                x: rng.random_range(0..width),
                y: rng.random_range(0..height),
            });
        }
        Self::with_mines(width, height, mines)
    }

    /// A board with a fixed mine layout.
    pub fn with_mines(width: usize, height: usize, mines: BTreeSet<Point>) -> Self {
        assert!(
            mines.iter().all(|p| p.x < width && p.y < height),
            "mine placed outside the board"
        );
        Game {
            width,
            height,
            board: vec![vec![Cell::Hidden; width]; height],
            flagged: BTreeSet::new(),
            game_state: GameState::Playing,
            mines,
        }
    }

    /// Deserializes a game state from bytes.
    pub fn deserialize(bts: &Vec<u8>) -> Self {
        bcs::from_bytes(bts).unwrap()
    }

    /// Serializes the game state to bytes.
    pub fn serialize(&self) -> Vec<u8> {
        bcs::to_bytes(self).unwrap()
    }

    pub fn is_mine(&self, at: Point) -> bool {
        self.mines.contains(&at)
    }

    pub fn total_mines(&self) -> usize {
        self.mines.len()
    }

    /// The number of mines within one row and column of `at`, not counting
    /// `at` itself.
    pub fn nearby_mines(&self, at: Point) -> u8 {
        neighbors(self.width, self.height, at)
            .filter(|p| self.mines.contains(p))
            .count() as u8
    }

    /// Probes a cell. Returns `Some(count)` with the cell's neighbor mine
    /// count if it was safe, or `None` if it was a mine (the game is then
    /// lost). Probing an already-revealed cell returns its count again.
    pub fn reveal_cell(&mut self, at: Point) -> anyhow::Result<Option<u8>> {
        if self.game_state != GameState::Playing {
            anyhow::bail!("game_ended");
        }
        if let Cell::Revealed(n) = self.board[at.y][at.x] {
            return Ok(Some(n));
        }

        if self.mines.contains(&at) {
            self.game_state = GameState::Lost;
            return Ok(None);
        }

        let count = self.nearby_mines(at);
        self.board[at.y][at.x] = Cell::Revealed(count);

        if self.won() {
            self.game_state = GameState::Won;
        }
        Ok(Some(count))
    }

    /// Flags a cell as a suspected mine. Flagging every actual mine wins
    /// the game.
    pub fn flag(&mut self, at: Point) {
        self.flagged.insert(at);
        if self.game_state == GameState::Playing && self.won() {
            self.game_state = GameState::Won;
        }
    }

    pub fn is_flagged(&self, at: Point) -> bool {
        self.flagged.contains(&at)
    }

    /// Whether the game is won: every safe cell revealed, or exactly the
    /// mines flagged.
    pub fn won(&self) -> bool {
        let all_safe_revealed = (0..self.height)
            .cartesian_product(0..self.width)
            .map(|(y, x)| Point { x, y })
            .all(|p| self.mines.contains(&p) || matches!(self.board[p.y][p.x], Cell::Revealed(_)));
        all_safe_revealed || self.flagged == self.mines
    }

    /// Every revealed cell with its neighbor mine count, in board order.
    /// This is enough to rebuild a solver's knowledge from scratch.
    pub fn revealed_counts(&self) -> impl Iterator<Item = (Point, u8)> + '_ {
        (0..self.height)
            .cartesian_product(0..self.width)
            .filter_map(move |(y, x)| match self.board[y][x] {
                Cell::Revealed(n) => Some((Point { x, y }, n)),
                Cell::Hidden => None,
            })
    }
}
