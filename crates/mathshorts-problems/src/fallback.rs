//! Static fallback problems, one per known topic.
//!
//! When the generative provider is unreachable or returns garbage, the
//! run substitutes one of these instead of aborting — content never
//! blocks on provider availability.

use mathshorts_core::types::{Problem, ProblemMetadata};

/// Deterministic fallback for a topic. Unknown topics get the linear
/// equation problem so the caller always receives something well-formed.
pub fn fallback_problem(topic: &str) -> Problem {
    match topic {
        "이차방정식" => Problem {
            statement_text:
                "직사각형의 가로가 x미터, 세로가 (x+2)미터일 때, 넓이가 15제곱미터라면 가로의 길이는?"
                    .into(),
            equation_text: "x(x + 2) = 15".into(),
            solution_steps: vec![
                "x(x + 2) = 15".into(),
                "x² + 2x = 15".into(),
                "x² + 2x - 15 = 0".into(),
                "(x + 5)(x - 3) = 0".into(),
                "x = 3 (양수 해)".into(),
            ],
            final_answer: "x = 3미터".into(),
            metadata: template_metadata(topic),
        },
        // "일차방정식" and anything unrecognized
        _ => Problem {
            statement_text:
                "지민이가 피자를 3개 주문했습니다. 배송비 5원을 포함해서 총 20원을 지불했다면, 피자 한 개의 가격은?"
                    .into(),
            equation_text: "3x + 5 = 20".into(),
            solution_steps: vec![
                "3x + 5 = 20".into(),
                "3x = 20 - 5".into(),
                "3x = 15".into(),
                "x = 5".into(),
            ],
            final_answer: "x = 5원".into(),
            metadata: template_metadata(topic),
        },
    }
}

fn template_metadata(topic: &str) -> ProblemMetadata {
    ProblemMetadata {
        difficulty: "basic".into(),
        tags: vec![topic.to_string(), "fallback_template".into()],
    }
}
