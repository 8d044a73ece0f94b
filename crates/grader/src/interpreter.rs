use apgw_core::domain::{GradeResult, Score};

use crate::sandbox::RawOutput;

/// 将容器输出的分数信号解析为 [`GradeResult`]。
///
/// stdout 最后一行不是非负整数时记为 `ParseFailure`（按 0 分计），而不是错误。
pub fn interpret(output: &RawOutput) -> GradeResult {
    let line = output.last_line().trim();
    match line.parse::<u32>() {
        Ok(value) => GradeResult::Scored(Score::new(value)),
        Err(_) => GradeResult::ParseFailure {
            raw_line: line.to_string(),
        },
    }
}
