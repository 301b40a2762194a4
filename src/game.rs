use crate::pos::Pos;
use ahash::AHashSet;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

/// Heading of the snake. The discriminant order is the policy output order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dir {
    Up,
    Right,
    Down,
    Left,
}

impl Dir {
    pub const ALL: [Dir; 4] = [Dir::Up, Dir::Right, Dir::Down, Dir::Left];

    pub fn offset(self) -> (i32, i32) {
        match self {
            Dir::Up => (0, -1),
            Dir::Right => (1, 0),
            Dir::Down => (0, 1),
            Dir::Left => (-1, 0),
        }
    }

    pub fn opposite(self) -> Dir {
        match self {
            Dir::Up => Dir::Down,
            Dir::Down => Dir::Up,
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Dir> {
        Self::ALL.get(index).copied()
    }
}

// Draw order for the spawn heading.
const SPAWN_DIRS: [Dir; 4] = [Dir::Up, Dir::Down, Dir::Left, Dir::Right];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Collision {
    Wall,
    SelfCollision,
}

impl fmt::Display for Collision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collision::Wall => f.write_str("wall"),
            Collision::SelfCollision => f.write_str("self"),
        }
    }
}

/// `Terminal` is absorbing: nothing leaves it except `reset`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Active,
    Terminal(Collision),
}

impl Status {
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Terminal(_))
    }

    pub fn collision(self) -> Option<Collision> {
        match self {
            Status::Active => None,
            Status::Terminal(kind) => Some(kind),
        }
    }
}

/// Result of a single `step`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub score_delta: u32,
    pub status: Status,
}

impl StepOutcome {
    pub fn ate(&self) -> bool {
        self.score_delta > 0
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("grid must be at least 1x1, got {width}x{height}")]
    EmptyGrid { width: u16, height: u16 },
    #[error("snake needs at least one segment")]
    EmptySnake,
    #[error("cell ({x}, {y}) is outside the grid")]
    OutOfBounds { x: i32, y: i32 },
    #[error("segment ({x}, {y}) appears more than once")]
    DuplicateSegment { x: i32, y: i32 },
    #[error("food at ({x}, {y}) overlaps the snake")]
    FoodOnSnake { x: i32, y: i32 },
}

/// Read-only view of a game, consumed by the sensor encoder and renderers.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Snapshot<'a> {
    pub width: u16,
    pub height: u16,
    pub snake: &'a VecDeque<Pos>,
    pub direction: Dir,
    pub food: Option<Pos>,
    pub score: u32,
    pub status: Status,
}

impl Snapshot<'_> {
    pub fn head(&self) -> Pos {
        self.snake[0]
    }

    pub fn tail(&self) -> Pos {
        self.snake[self.snake.len() - 1]
    }

    pub fn max_dim(&self) -> u16 {
        self.width.max(self.height)
    }
}

/// Grid snake simulation. Owns its random source so episodes replay exactly
/// from a seed and can run side by side without shared state.
#[derive(Clone, Debug)]
pub struct Game {
    width: u16,
    height: u16,
    snake: VecDeque<Pos>,
    occupied: AHashSet<Pos>,
    dir: Dir,
    food: Option<Pos>,
    score: u32,
    status: Status,
    rng: StdRng,
}

impl Game {
    pub fn new(width: u16, height: u16, seed: u64) -> Result<Self, GameError> {
        if width == 0 || height == 0 {
            return Err(GameError::EmptyGrid { width, height });
        }
        let mut g = Self {
            width,
            height,
            snake: VecDeque::new(),
            occupied: AHashSet::default(),
            dir: Dir::Right,
            food: None,
            score: 0,
            status: Status::Active,
            rng: StdRng::seed_from_u64(seed),
        };
        g.reset(seed);
        Ok(g)
    }

    /// Single segment at the centre, random heading, random food.
    pub fn reset(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
        let start = Pos::new(i32::from(self.width / 2), i32::from(self.height / 2));
        self.snake.clear();
        self.occupied.clear();
        self.snake.push_back(start);
        self.occupied.insert(start);
        self.dir = SPAWN_DIRS[self.rng.gen_range(0..SPAWN_DIRS.len())];
        self.place_food();
        self.score = 0;
        self.status = Status::Active;
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn snake(&self) -> &VecDeque<Pos> {
        &self.snake
    }

    pub fn head(&self) -> Pos {
        self.snake[0]
    }

    pub fn snake_len(&self) -> usize {
        self.snake.len()
    }

    pub fn direction(&self) -> Dir {
        self.dir
    }

    pub fn food(&self) -> Option<Pos> {
        self.food
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn snake_contains(&self, p: Pos) -> bool {
        self.occupied.contains(&p)
    }

    pub fn in_bounds(&self, p: Pos) -> bool {
        p.x >= 0 && p.y >= 0 && p.x < i32::from(self.width) && p.y < i32::from(self.height)
    }

    /// Manhattan distance from head to food, 0 when there is no food.
    pub fn food_distance(&self) -> u32 {
        self.food.map_or(0, |f| self.head().manhattan(f))
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            width: self.width,
            height: self.height,
            snake: &self.snake,
            direction: self.dir,
            food: self.food,
            score: self.score,
            status: self.status,
        }
    }

    /// Reversal requests and requests on a finished game are ignored.
    pub fn request_direction(&mut self, new_dir: Dir) {
        if self.status.is_terminal() || new_dir == self.dir.opposite() {
            return;
        }
        self.dir = new_dir;
    }

    pub fn step(&mut self) -> StepOutcome {
        if self.status.is_terminal() {
            return StepOutcome { score_delta: 0, status: self.status };
        }

        let (dx, dy) = self.dir.offset();
        let new_head = self.head().offset(dx, dy);

        if !self.in_bounds(new_head) {
            log::debug!("game over: snake hit the wall at ({}, {})", new_head.x, new_head.y);
            return self.finish(Collision::Wall);
        }
        if self.occupied.contains(&new_head) {
            log::debug!("game over: snake collided with itself at ({}, {})", new_head.x, new_head.y);
            return self.finish(Collision::SelfCollision);
        }

        self.snake.push_front(new_head);
        self.occupied.insert(new_head);

        if self.food == Some(new_head) {
            self.score += 1;
            self.place_food();
            StepOutcome { score_delta: 1, status: self.status }
        } else {
            if let Some(tail) = self.snake.pop_back() {
                self.occupied.remove(&tail);
            }
            StepOutcome { score_delta: 0, status: self.status }
        }
    }

    /// Replace the body (head first) and heading. Score is kept; food that
    /// ends up under the new body is re-placed.
    pub fn set_layout(&mut self, segments: &[Pos], dir: Dir) -> Result<(), GameError> {
        if segments.is_empty() {
            return Err(GameError::EmptySnake);
        }
        let mut occupied = AHashSet::with_capacity(segments.len());
        for &p in segments {
            if !self.in_bounds(p) {
                return Err(GameError::OutOfBounds { x: p.x, y: p.y });
            }
            if !occupied.insert(p) {
                return Err(GameError::DuplicateSegment { x: p.x, y: p.y });
            }
        }
        self.snake = segments.iter().copied().collect();
        self.occupied = occupied;
        self.dir = dir;
        self.status = Status::Active;
        if self.food.is_none_or(|f| self.occupied.contains(&f)) {
            self.place_food();
        }
        Ok(())
    }

    pub fn set_food(&mut self, food: Option<Pos>) -> Result<(), GameError> {
        if let Some(p) = food {
            if !self.in_bounds(p) {
                return Err(GameError::OutOfBounds { x: p.x, y: p.y });
            }
            if self.occupied.contains(&p) {
                return Err(GameError::FoodOnSnake { x: p.x, y: p.y });
            }
        }
        self.food = food;
        Ok(())
    }

    fn finish(&mut self, kind: Collision) -> StepOutcome {
        self.status = Status::Terminal(kind);
        StepOutcome { score_delta: 0, status: self.status }
    }

    // Uniform over free cells, enumerated column by column.
    fn place_food(&mut self) {
        let cells = usize::from(self.width) * usize::from(self.height);
        let free = cells - self.snake.len();
        if free == 0 {
            self.food = None;
            return;
        }
        let pick = self.rng.gen_range(0..free);
        let (w, h) = (i32::from(self.width), i32::from(self.height));
        let food = (0..w)
            .flat_map(|x| (0..h).map(move |y| Pos::new(x, y)))
            .filter(|p| !self.occupied.contains(p))
            .nth(pick);
        self.food = food;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(w: u16, h: u16) -> Game {
        Game::new(w, h, 7).expect("valid grid")
    }

    #[test]
    fn dir_index_order() {
        for (i, d) in Dir::ALL.into_iter().enumerate() {
            assert_eq!(d.index(), i);
            assert_eq!(Dir::from_index(i), Some(d));
            assert_eq!(d.opposite().opposite(), d);
        }
        assert_eq!(Dir::from_index(4), None);
    }

    #[test]
    fn reset_starts_at_centre_with_food_off_snake() {
        let g = game(17, 17);
        assert_eq!(g.snake().len(), 1);
        assert_eq!(g.head(), Pos::new(8, 8));
        assert_eq!(g.score(), 0);
        assert_eq!(g.status(), Status::Active);
        let food = g.food().expect("food placed");
        assert!(g.in_bounds(food));
        assert!(!g.snake_contains(food));
    }

    #[test]
    fn large_board_does_not_preallocate_body() {
        let g = game(1000, 1000);
        assert_eq!(g.snake_len(), 1);
        assert!(g.snake().capacity() < 64);
    }

    #[test]
    fn reset_is_deterministic_per_seed() {
        let a = Game::new(17, 17, 99).unwrap();
        let b = Game::new(17, 17, 99).unwrap();
        assert_eq!(a.direction(), b.direction());
        assert_eq!(a.food(), b.food());

        let mut c = game(17, 17);
        c.reset(99);
        assert_eq!(c.direction(), a.direction());
        assert_eq!(c.food(), a.food());
    }

    #[test]
    fn zero_sized_grid_is_rejected() {
        assert_eq!(
            Game::new(0, 5, 1).unwrap_err(),
            GameError::EmptyGrid { width: 0, height: 5 }
        );
    }

    #[test]
    fn opposite_request_is_ignored() {
        let mut g = game(9, 9);
        for d in Dir::ALL {
            g.set_layout(&[Pos::new(4, 4)], d).unwrap();
            g.request_direction(d.opposite());
            assert_eq!(g.direction(), d);
        }
        g.set_layout(&[Pos::new(4, 4)], Dir::Up).unwrap();
        g.request_direction(Dir::Left);
        assert_eq!(g.direction(), Dir::Left);
    }

    #[test]
    fn wall_collision_keeps_score_and_body() {
        let mut g = game(5, 5);
        g.set_layout(&[Pos::new(0, 3)], Dir::Left).unwrap();
        let before: Vec<Pos> = g.snake().iter().copied().collect();
        let out = g.step();
        assert_eq!(out.status, Status::Terminal(Collision::Wall));
        assert_eq!(out.score_delta, 0);
        assert_eq!(g.score(), 0);
        assert_eq!(g.snake().iter().copied().collect::<Vec<_>>(), before);
    }

    #[test]
    fn turning_into_neck_is_self_collision() {
        let mut g = game(7, 7);
        g.set_layout(&[Pos::new(3, 3), Pos::new(3, 4), Pos::new(3, 5)], Dir::Down)
            .unwrap();
        assert_eq!(g.step().status, Status::Terminal(Collision::SelfCollision));
    }

    #[test]
    fn curling_into_body_is_self_collision() {
        let mut g = game(8, 8);
        g.set_layout(
            &[
                Pos::new(3, 4),
                Pos::new(3, 5),
                Pos::new(4, 5),
                Pos::new(5, 5),
                Pos::new(5, 4),
                Pos::new(4, 4),
            ],
            Dir::Left,
        )
        .unwrap();
        g.set_food(None).unwrap();
        g.request_direction(Dir::Down);
        assert_eq!(g.step().status, Status::Terminal(Collision::SelfCollision));
    }

    #[test]
    fn step_on_terminal_game_is_a_no_op() {
        let mut g = game(5, 5);
        g.set_layout(&[Pos::new(2, 0)], Dir::Up).unwrap();
        g.step();
        assert!(g.is_terminal());

        let snake: Vec<Pos> = g.snake().iter().copied().collect();
        let (food, score, dir) = (g.food(), g.score(), g.direction());
        for _ in 0..3 {
            let out = g.step();
            assert_eq!(out.status, Status::Terminal(Collision::Wall));
            assert_eq!(out.score_delta, 0);
        }
        g.request_direction(Dir::Left);
        assert_eq!(g.snake().iter().copied().collect::<Vec<_>>(), snake);
        assert_eq!((g.food(), g.score(), g.direction()), (food, score, dir));
    }

    #[test]
    fn eating_grows_by_one_and_relocates_food() {
        let mut g = game(7, 7);
        g.set_layout(&[Pos::new(3, 3), Pos::new(2, 3)], Dir::Right).unwrap();
        g.set_food(Some(Pos::new(4, 3))).unwrap();

        let out = g.step();
        assert!(out.ate());
        assert_eq!(g.score(), 1);
        assert_eq!(g.snake_len(), 3);
        assert_eq!(g.head(), Pos::new(4, 3));
        let food = g.food().expect("free cells remain");
        assert!(!g.snake_contains(food));
    }

    #[test]
    fn plain_move_keeps_length() {
        let mut g = game(7, 7);
        g.set_layout(&[Pos::new(3, 3), Pos::new(2, 3), Pos::new(1, 3)], Dir::Right)
            .unwrap();
        g.set_food(Some(Pos::new(0, 0))).unwrap();
        g.step();
        assert_eq!(
            g.snake().iter().copied().collect::<Vec<_>>(),
            vec![Pos::new(4, 3), Pos::new(3, 3), Pos::new(2, 3)]
        );
        assert!(!g.snake_contains(Pos::new(1, 3)));
    }

    #[test]
    fn filling_the_board_clears_food() {
        let mut g = game(1, 2);
        g.set_layout(&[Pos::new(0, 1)], Dir::Up).unwrap();
        g.set_food(Some(Pos::new(0, 0))).unwrap();
        assert!(g.step().ate());
        assert_eq!(g.food(), None);
        assert_eq!(g.food_distance(), 0);
        assert_eq!(g.step().status, Status::Terminal(Collision::Wall));
    }

    #[test]
    fn segments_stay_distinct_over_a_long_run() {
        let mut g = Game::new(6, 6, 3).unwrap();
        let turns = [Dir::Up, Dir::Right, Dir::Down, Dir::Right, Dir::Down, Dir::Left];
        for tick in 0..200 {
            g.request_direction(turns[tick % turns.len()]);
            g.step();
            let unique: AHashSet<Pos> = g.snake().iter().copied().collect();
            assert_eq!(unique.len(), g.snake_len());
            if let Some(f) = g.food() {
                assert!(!g.snake_contains(f));
            }
            if g.is_terminal() {
                break;
            }
        }
    }

    #[test]
    fn layout_validation() {
        let mut g = game(4, 4);
        assert_eq!(g.set_layout(&[], Dir::Up), Err(GameError::EmptySnake));
        assert_eq!(
            g.set_layout(&[Pos::new(4, 0)], Dir::Up),
            Err(GameError::OutOfBounds { x: 4, y: 0 })
        );
        assert_eq!(
            g.set_layout(&[Pos::new(1, 1), Pos::new(1, 1)], Dir::Up),
            Err(GameError::DuplicateSegment { x: 1, y: 1 })
        );
        g.set_layout(&[Pos::new(1, 1)], Dir::Up).unwrap();
        assert_eq!(
            g.set_food(Some(Pos::new(1, 1))),
            Err(GameError::FoodOnSnake { x: 1, y: 1 })
        );
    }
}
