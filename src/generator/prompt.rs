//! Test-case prompt template.

/// Template with `{user_story}`, `{jira_id}` and `{acceptance_criteria}`
/// placeholders.
pub const TEST_CASE_PROMPT: &str = "\
You are a senior QA engineer. Write test cases for the user story below.

Story ID: {jira_id}

User story:
{user_story}

Acceptance criteria:
{acceptance_criteria}

For every test case give:
- Test case ID (prefix it with the story ID)
- Title
- Preconditions
- Steps
- Expected result
- Type (positive, negative or edge case)

Cover each acceptance criterion with at least one positive and one negative case.
If no acceptance criteria are given, derive them from the story.
Answer in Markdown only.";

/// Fill the template. An absent `acceptance_criteria` renders as empty.
///
/// Placeholders are substituted in a single pass, so braces inside the
/// caller's text are never treated as placeholders.
pub fn format_test_case_prompt(
    user_story: &str,
    jira_id: &str,
    acceptance_criteria: Option<&str>,
) -> String {
    let criteria = acceptance_criteria.unwrap_or_default();
    let mut out = String::with_capacity(TEST_CASE_PROMPT.len() + user_story.len() + criteria.len());
    let mut rest = TEST_CASE_PROMPT;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let Some(end) = tail.find('}') else {
            out.push_str(tail);
            return out;
        };
        match &tail[1..end] {
            "user_story" => out.push_str(user_story),
            "jira_id" => out.push_str(jira_id),
            "acceptance_criteria" => out.push_str(criteria),
            _ => out.push_str(&tail[..=end]),
        }
        rest = &tail[end + 1..];
    }
    out.push_str(rest);
    out
}
