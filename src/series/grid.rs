use crate::prelude::{Duration, Epoch, Error};

/// Regular time grid, shared by all series of a station once aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    step: Duration,
    epochs: Vec<Epoch>,
}

impl TimeGrid {
    /// Builds a new [TimeGrid] spanning [start, end] with constant step.
    /// `end` is included only when it falls on the grid.
    pub fn new(start: Epoch, end: Epoch, step: Duration) -> Result<Self, Error> {
        if step <= Duration::ZERO {
            return Err(Error::InvalidGrid(format!("non positive step {}", step)));
        }
        if end < start {
            return Err(Error::InvalidGrid(format!("{} is prior {}", end, start)));
        }

        let mut epochs = Vec::new();
        let mut t = start;
        while t <= end {
            epochs.push(t);
            t = t + step;
        }

        Ok(Self { step, epochs })
    }

    /// Builds a new [TimeGrid] spanning [start, end[ with constant step
    pub fn half_open(start: Epoch, end: Epoch, step: Duration) -> Result<Self, Error> {
        if end <= start {
            return Err(Error::InvalidGrid(format!("empty span [{}, {}[", start, end)));
        }
        let mut grid = Self::new(start, end, step)?;
        if grid.epochs.len() > 1 && grid.end() == end {
            grid.epochs.pop();
        }
        Ok(grid)
    }

    /// Builds a daily [TimeGrid]
    pub fn daily(start: Epoch, end: Epoch) -> Result<Self, Error> {
        Self::new(start, end, Duration::from_seconds(crate::constants::SECONDS_PER_DAY))
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    pub fn epochs(&self) -> &[Epoch] {
        &self.epochs
    }

    pub fn start(&self) -> Epoch {
        self.epochs[0]
    }

    pub fn end(&self) -> Epoch {
        self.epochs[self.epochs.len() - 1]
    }

    /// Index of this [Epoch] on the grid, if it is a grid node
    pub fn index_of(&self, t: Epoch) -> Option<usize> {
        let idx = self.epochs.partition_point(|e| *e < t);
        self.epochs.get(idx).filter(|e| **e == t).map(|_| idx)
    }
}
