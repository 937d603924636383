/// Running mean and variance (Welford)
#[derive(Debug, Clone, Default)]
pub struct Averager {
    pub mean: f64,
    pub count: u64,
    m2: f64,
}

impl Averager {
    /// Builds new Averager
    pub fn new() -> Self {
        Self::default()
    }

    /// Push new value into [Averager]
    pub fn add(&mut self, x: f64) {
        self.count += 1;
        let k = self.count as f64;
        let delta = x - self.mean;
        self.mean += delta / k;
        self.m2 += delta * (x - self.mean);
    }

    /// Unbiased variance, requires at least two values
    pub fn variance(&self) -> Option<f64> {
        if self.count < 2 {
            None
        } else {
            Some(self.m2 / (self.count - 1) as f64)
        }
    }

    /// Unbiased standard deviation, requires at least two values
    pub fn std_dev(&self) -> Option<f64> {
        self.variance().map(|v| v.sqrt())
    }

    /// Reset [Averager]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl FromIterator<f64> for Averager {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut avg = Self::new();
        for x in iter {
            avg.add(x);
        }
        avg
    }
}
