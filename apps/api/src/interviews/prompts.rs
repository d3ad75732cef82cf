// Interview prompt templates.
// Placeholders are `{name}` and are filled in a single pass by `render`, so
// user-supplied text that happens to contain a placeholder is left untouched.

/// System prompt for the voice assistant that runs the call.
pub const INTERVIEWER_PROMPT_TEMPLATE: &str = r#"You are an AI hiring assistant named 'Eva'. Your goal is to conduct a friendly and professional screening interview.
- Greet the candidate, '{candidate_name}', by name.
- State that you are calling for the '{job_position}' role.
- Based on the job description and the key skills, ask 4-5 relevant questions.
- The key skills to focus on are: '{skills}'.
- Ask one question at a time and wait for their response.
- After the last question, thank the candidate and end the call gracefully.

Job Description: "{job_description}""#;

/// First sentence the assistant speaks when the candidate picks up.
pub const FIRST_MESSAGE_TEMPLATE: &str = "Hi {candidate_name}, this is Eva calling for your initial screening interview for the {job_position} role. Is now a good time?";

pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"Analyze the following phone screening interview for the '{job_position}' role.
The candidate was assessed on these skills: '{skills}'.

JOB DESCRIPTION:
{job_description}

INTERVIEW TRANSCRIPT:
{transcript}

OUTPUT SCHEMA (return exactly this structure):
{
  "summary": "A 2-3 sentence professional summary of the interview.",
  "strengths": "A bulleted list (as a single string using '\n- ' for new lines) of 2-3 key strengths, referencing the skills assessed.",
  "concerns": "A bulleted list (as a single string using '\n- ' for new lines) of any concerns or areas for follow-up.",
  "assessment": "A brief evaluation of whether the candidate's answers were correct, relevant, and demonstrated the required skills.",
  "score": "An overall score from 0 to 100, based on performance against the required skills.",
  "recommendation": "One of: 'Strong Hire', 'Hire', 'Maybe', 'No Hire'."
}

RULES:
1. Base every statement on the transcript. Do not invent answers the candidate did not give.
2. score must be a whole number between 0 and 100.
3. Return ONLY the JSON object — nothing else, no code fences."#;

const NO_SKILLS_PLACEHOLDER: &str = "(none specified; use the job description)";

/// Skills text as shown to a model. Blank skills fall back to the job description.
pub fn skills_or_default(skills: &str) -> &str {
    let skills = skills.trim();
    if skills.is_empty() {
        NO_SKILLS_PLACEHOLDER
    } else {
        skills
    }
}

/// Fills `{key}` placeholders in one left-to-right pass. Unknown placeholders
/// and substituted values are copied verbatim.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let matched = vars
            .iter()
            .find(|(key, _)| tail.starts_with(key) && tail[key.len()..].starts_with('}'));
        match matched {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}
