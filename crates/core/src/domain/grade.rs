use super::Score;

/// Terminal outcome of interpreting one grading attempt's output.
///
/// `ParseFailure` counts as zero points but stays distinguishable from a
/// toolchain that legitimately reported `0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GradeResult {
    Scored(Score),
    ParseFailure { raw_line: String },
}

impl GradeResult {
    pub fn score(&self) -> Score {
        match self {
            Self::Scored(score) => *score,
            Self::ParseFailure { .. } => Score::ZERO,
        }
    }

    pub fn is_parse_failure(&self) -> bool {
        matches!(self, Self::ParseFailure { .. })
    }
}
