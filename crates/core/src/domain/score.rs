use super::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Score(u32);

impl Score {
    pub const ZERO: Score = Score(0);

    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for Score {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<Score> for u32 {
    fn from(value: Score) -> Self {
        value.value()
    }
}

impl TryFrom<i64> for Score {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value < 0 {
            return Err(DomainError::NegativeScore(value));
        }
        u32::try_from(value)
            .map(Self)
            .map_err(|_| DomainError::ScoreOverflow(value))
    }
}
