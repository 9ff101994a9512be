pub struct ResearchPrompts;

impl ResearchPrompts {
    pub fn planner_system() -> &'static str {
        r#"You are an expert research planner AI.
Your job is to break a research query into a structured set of tasks.

Rules:
- RETURN ONLY VALID JSON. No explanation.
- JSON must be a list of task objects.
- Each task object must contain:
  - name: short task ID string
  - description: what this task does
  - required_inputs: list of inputs required
  - expected_outputs: list of outputs it produces
  - dependencies: list of task names this step depends on
- Use snake_case for "name".
- Do NOT include comments or text outside JSON."#
    }

    pub fn planner(query: &str, known_tasks: &[&str]) -> String {
        if known_tasks.is_empty() {
            format!(
                "Generate a complete task plan for this research query:\n\n{}",
                query
            )
        } else {
            format!(
                r#"Generate a complete task plan for this research query:

{query}

Prefer these task names, which have executors available:
{tasks}"#,
                query = query,
                tasks = known_tasks
                    .iter()
                    .map(|t| format!("- {}", t))
                    .collect::<Vec<_>>()
                    .join("\n")
            )
        }
    }

    pub fn review(task_name: &str, output: &str) -> String {
        format!(
            r#"You are an expert research reviewer.

Your job is to analyze the result of a task performed by a research agent.

TASK NAME: {task_name}

OUTPUT TO REVIEW:
"""
{output}
"""

Analyze the output carefully and identify:
1. Possible factual errors
2. Any hallucinations
3. Missing citations
4. Weak reasoning or unclear structure

Then produce an improved and corrected version.

Return ONLY valid JSON with this exact structure:

{{
  "revised_output": "Improved version here...",
  "issues_found": ["issue1", "issue2"],
  "quality_score": 0.0 to 1.0
}}"#,
            task_name = task_name,
            output = output
        )
    }

    pub fn summarize(text: &str) -> String {
        format!(
            r#"You are an expert academic summarizer.

Summarize the following text in a clear, structured, and factual way.
Avoid hallucinations. Preserve key arguments. Keep it concise.

TEXT:
{text}

SUMMARY:"#,
            text = text
        )
    }

    pub fn key_insights(text: &str) -> String {
        format!(
            r#"You are an expert academic analyst.

Extract the **key insights**, **findings**, and **important contributions**
from the following research text. Present the insights as a structured,
bullet-point list. Keep them factual and concise. Avoid hallucinations.

TEXT:
{text}

INSIGHTS:"#,
            text = text
        )
    }

    pub fn research_questions(text: &str) -> String {
        format!(
            r#"You are an expert academic researcher.

Based on the following text, generate **high-quality, non-trivial research questions**.
They should be:
- specific
- novel
- relevant
- technically meaningful
- grounded in the provided content

TEXT:
{text}

Generate 5-7 strong research questions.

QUESTIONS:"#,
            text = text
        )
    }
}
