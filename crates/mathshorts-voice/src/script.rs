//! Narration script assembly and localization.
//!
//! Each language has a phrase set; any fragment missing a translation
//! falls back to the source-language (Korean) phrase for that fragment
//! only. A language absent from the table entirely narrates in the
//! source language — it still gets a complete script.

use mathshorts_core::types::Problem;

/// The narration broken into the sections the SSML builder paces
/// individually.
#[derive(Debug, Clone)]
pub struct VoiceScript {
    pub language_tag: String,
    pub intro: String,
    pub problem_intro: String,
    pub problem: String,
    pub solution_intro: String,
    pub steps: Vec<String>,
    pub conclusion: String,
}

impl VoiceScript {
    /// The full script as one plain-text block (what gets stored on the
    /// `NarrationResult`).
    pub fn plain_text(&self) -> String {
        let mut parts = vec![
            self.intro.clone(),
            self.problem_intro.clone(),
            self.problem.clone(),
            self.solution_intro.clone(),
        ];
        parts.extend(self.steps.iter().cloned());
        parts.push(self.conclusion.clone());
        parts.join("\n")
    }

    /// Rough spoken length, from the fixed per-section pacing the video
    /// template assumes (2s intro + 1s lead-in + 4s problem + 1s
    /// lead-in + 5s steps + 2s conclusion).
    pub fn duration_estimate_secs(&self) -> u32 {
        15
    }
}

/// Translated phrases for one language. `{answer}` in the conclusion is
/// replaced with the problem's final answer.
struct PhraseSet {
    intro: Option<&'static str>,
    problem_intro: Option<&'static str>,
    solution_intro: Option<&'static str>,
    conclusion: Option<&'static str>,
}

/// Source language — every fragment present.
const KO: PhraseSet = PhraseSet {
    intro: Some("안녕하세요! 오늘의 수학 문제를 함께 풀어보겠습니다."),
    problem_intro: Some("문제를 읽어드릴게요."),
    solution_intro: Some("이제 단계별로 풀어보겠습니다."),
    conclusion: Some("정답은 {answer}입니다. 잘하셨어요!"),
};

const EN: PhraseSet = PhraseSet {
    intro: Some("Hello! Let's solve today's math problem together."),
    problem_intro: Some("Here is the problem."),
    solution_intro: Some("Now let's solve this step by step."),
    conclusion: Some("The answer is {answer}. Well done!"),
};

// Partial sets: only the bookends have been translated so far; the
// lead-ins fall back to Korean per fragment.
const ZH: PhraseSet = PhraseSet {
    intro: Some("大家好！我们一起来解今天的数学题。"),
    problem_intro: None,
    solution_intro: None,
    conclusion: Some("答案是 {answer}。做得好！"),
};

const JA: PhraseSet = PhraseSet {
    intro: Some("こんにちは！今日の数学の問題を一緒に解きましょう。"),
    problem_intro: None,
    solution_intro: None,
    conclusion: Some("答えは {answer} です。よくできました！"),
};

const ES: PhraseSet = PhraseSet {
    intro: Some("¡Hola! Resolvamos juntos el problema de matemáticas de hoy."),
    problem_intro: None,
    solution_intro: None,
    conclusion: Some("La respuesta es {answer}. ¡Bien hecho!"),
};

fn phrase_set(language_tag: &str) -> Option<&'static PhraseSet> {
    match language_tag {
        "ko" => Some(&KO),
        "en" => Some(&EN),
        "zh" => Some(&ZH),
        "ja" => Some(&JA),
        "es" => Some(&ES),
        _ => None,
    }
}

/// Build the narration script for one language. Never fails: missing
/// translations degrade to the source language fragment by fragment.
pub fn build_script(problem: &Problem, language_tag: &str) -> VoiceScript {
    let set = phrase_set(language_tag);

    let pick = |f: fn(&PhraseSet) -> Option<&'static str>| -> &'static str {
        set.and_then(f)
            .or_else(|| f(&KO))
            .unwrap_or("")
    };

    let conclusion_template = pick(|s| s.conclusion);

    VoiceScript {
        language_tag: language_tag.to_string(),
        intro: pick(|s| s.intro).to_string(),
        problem_intro: pick(|s| s.problem_intro).to_string(),
        // Statement and worked steps stay in the source language; the
        // equations carry the content either way.
        problem: problem.statement_text.clone(),
        solution_intro: pick(|s| s.solution_intro).to_string(),
        steps: problem.solution_steps.clone(),
        conclusion: conclusion_template.replace("{answer}", &problem.final_answer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mathshorts_core::types::ProblemMetadata;

    fn sample_problem() -> Problem {
        Problem {
            statement_text: "지민이가 피자를 3개 주문했습니다.".into(),
            equation_text: "3x + 5 = 20".into(),
            solution_steps: vec!["3x = 15".into(), "x = 5".into()],
            final_answer: "x = 5원".into(),
            metadata: ProblemMetadata {
                difficulty: "basic".into(),
                tags: vec![],
            },
        }
    }

    #[test]
    fn test_full_translation() {
        let script = build_script(&sample_problem(), "en");
        assert!(script.intro.starts_with("Hello!"));
        assert_eq!(script.conclusion, "The answer is x = 5원. Well done!");
        assert_eq!(script.steps.len(), 2);
    }

    #[test]
    fn test_partial_set_falls_back_per_fragment() {
        let script = build_script(&sample_problem(), "es");
        // Translated bookends...
        assert!(script.intro.starts_with("¡Hola!"));
        assert!(script.conclusion.contains("x = 5원"));
        // ...source-language lead-ins.
        assert_eq!(script.problem_intro, "문제를 읽어드릴게요.");
        assert_eq!(script.solution_intro, "이제 단계별로 풀어보겠습니다.");
    }

    #[test]
    fn test_unknown_language_narrates_in_source_language() {
        let script = build_script(&sample_problem(), "fr");
        assert_eq!(script.intro, "안녕하세요! 오늘의 수학 문제를 함께 풀어보겠습니다.");
        assert!(script.conclusion.contains("정답은"));
    }

    #[test]
    fn test_plain_text_contains_every_section() {
        let script = build_script(&sample_problem(), "ko");
        let text = script.plain_text();
        assert!(text.contains("안녕하세요"));
        assert!(text.contains("지민이가"));
        assert!(text.contains("3x = 15"));
        assert!(text.contains("잘하셨어요"));
    }

    #[test]
    fn test_duration_estimate() {
        assert_eq!(build_script(&sample_problem(), "ko").duration_estimate_secs(), 15);
    }
}
