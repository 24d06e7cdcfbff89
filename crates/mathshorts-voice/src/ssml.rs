//! SSML assembly — prosody-paced narration for the TTS provider.

use crate::script::VoiceScript;

/// Render a script as SSML: upbeat intro, slow deliberate problem and
/// steps with breaks between them, energetic conclusion.
pub fn render(script: &VoiceScript) -> String {
    let steps: String = script
        .steps
        .iter()
        .map(|step| {
            format!(
                "  <prosody rate=\"slow\">{}</prosody>\n  <break time=\"1s\"/>\n",
                escape(step)
            )
        })
        .collect();

    format!(
        r#"<speak>
  <prosody rate="medium" pitch="+2st">{intro}</prosody>
  <break time="1s"/>
  <prosody rate="slow" volume="loud">{problem_intro}</prosody>
  <break time="0.5s"/>
  <prosody rate="medium">{problem}</prosody>
  <break time="2s"/>
  <prosody rate="slow" pitch="+1st">{solution_intro}</prosody>
  <break time="0.5s"/>
{steps}  <break time="1s"/>
  <prosody rate="medium" pitch="+3st" volume="loud">{conclusion}</prosody>
</speak>"#,
        intro = escape(&script.intro),
        problem_intro = escape(&script.problem_intro),
        problem = escape(&script.problem),
        solution_intro = escape(&script.solution_intro),
        steps = steps,
        conclusion = escape(&script.conclusion),
    )
}

/// Minimal XML escaping — equations contain `<` and `&` occasionally.
fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
