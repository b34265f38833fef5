//! JSON reporter

use crate::models::GradeResult;
use anyhow::Result;

/// Render a grade as pretty-printed JSON
pub fn render(grade: &GradeResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(grade)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::finalize::calculate_final_grade_default;
    use std::collections::HashMap;

    #[test]
    fn test_json_round_trips() {
        let grade = calculate_final_grade_default(&HashMap::new());
        let rendered = render(&grade).unwrap();
        let parsed: GradeResult = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed.score, grade.score);
        assert_eq!(parsed.letter_grade, grade.letter_grade);
        assert_eq!(parsed.breakdown.len(), 5);
    }
}
