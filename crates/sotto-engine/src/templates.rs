//! The three shipped workflow templates.
//!
//! Templates are data: keyword triggers, step order, and prompt text.  The
//! prompts lean hard on two rules that matter for a voice assistant --
//! include the current year in every search query (freshness), and trust
//! search results over training knowledge (staleness).

use crate::workflow::{StepKind, WorkflowDef, WorkflowStep, compile_trigger};

fn step(
    id: &str,
    name: &str,
    kind: StepKind,
    prompt_template: &str,
    tool_name: &str,
    next_step: &str,
    narration: &str,
) -> WorkflowStep {
    WorkflowStep {
        id: id.to_owned(),
        name: name.to_owned(),
        kind,
        prompt_template: prompt_template.to_owned(),
        tool_name: tool_name.to_owned(),
        next_step: next_step.to_owned(),
        narration: narration.to_owned(),
    }
}

fn def(
    id: &str,
    name: &str,
    description: &str,
    trigger_keywords: &[&str],
    min_query_words: usize,
    steps: Vec<WorkflowStep>,
) -> WorkflowDef {
    WorkflowDef {
        id: id.to_owned(),
        name: name.to_owned(),
        description: description.to_owned(),
        trigger_pattern: compile_trigger(trigger_keywords),
        trigger_keywords: trigger_keywords.iter().map(|k| (*k).to_owned()).collect(),
        min_query_words,
        steps,
    }
}

/// Build the shipped templates, trigger patterns precompiled.
pub fn builtin() -> Vec<WorkflowDef> {
    vec![research_compare(), deep_research(), fact_check()]
}

// ---------------------------------------------------------------------------
// Research & Compare
// ---------------------------------------------------------------------------

fn research_compare() -> WorkflowDef {
    def(
        "research_compare",
        "Research & Compare",
        "Establish ranking, decompose into per-entity lookups, synthesize",
        &[
            "compare",
            "comparison",
            "versus",
            "vs",
            r"top \d+",
            "top (three|four|five|six|seven|eight|nine|ten)",
            "each",
            "both",
            "market cap",
            "difference between",
            "which is better",
            "pros and cons",
            "biggest",
            "largest",
            "highest",
        ],
        6,
        vec![
            step(
                "initial_lookup",
                "Establishing ranking",
                StepKind::Llm,
                "Today is {{current_date}}.\n\
                 The user asked: {{user_query}}\n\n\
                 Generate a web search query to find the CURRENT, AUTHORITATIVE \
                 ranking with company/entity names listed. The query MUST include \
                 the year {{current_year}} so results are fresh.\n\n\
                 Good: 'top 5 S&P 500 companies by market cap list {{current_year}}'\n\
                 Bad:  'S&P 500 stocks'\n\n\
                 Return ONLY the search query string, nothing else.",
                "web_search",
                "decompose",
                "Searching for current ranking...",
            ),
            step(
                "decompose",
                "Decomposing query",
                StepKind::Llm,
                "Today is {{current_date}}.\n\
                 The user asked: {{user_query}}\n\n\
                 Here are current search results:\n\
                 ---BEGIN SEARCH RESULTS---\n{{initial_lookup}}\n---END SEARCH RESULTS---\n\n\
                 TASK: Identify the entities the user is asking about and create \
                 one search query per entity to look up current data.\n\n\
                 RULES:\n\
                 - FIRST check the search results for entity names\n\
                 - If the search results don't list specific entity names, use your \
                 knowledge to identify the most likely current entities and we will \
                 verify with search\n\
                 - If the user asked for 'top N', return EXACTLY N entities\n\
                 - Include ticker symbols when known\n\
                 - Include '{{current_year}}' in each query\n\n\
                 Return ONLY a JSON array of search queries. Example format:\n\
                 [\"Apple AAPL market cap {{current_year}}\", \
                 \"NVIDIA NVDA market cap {{current_year}}\", \
                 \"Microsoft MSFT market cap {{current_year}}\"]\n\n\
                 JSON array:",
                "",
                "search_each",
                "Decomposing into individual lookups...",
            ),
            step(
                "search_each",
                "Searching each entity",
                StepKind::Loop,
                "",
                "web_search",
                "synthesize",
                "Looking up each entity...",
            ),
            step(
                "synthesize",
                "Synthesizing",
                StepKind::Llm,
                "Today is {{current_date}}.\n\
                 The user asked: {{user_query}}\n\n\
                 Here are per-entity search results:\n{{search_results}}\n\n\
                 RULES:\n\
                 - Present the entities in RANKED ORDER (largest to smallest, \
                 best to worst, etc. — matching the user's question)\n\
                 - ONLY cite numbers that appear in the search results above\n\
                 - If your training knowledge contradicts the search results, \
                 TRUST THE SEARCH RESULTS — they are more recent\n\
                 - Include specific numbers/facts from the results\n\
                 - Keep it conversational — this will be spoken aloud by a voice \
                 assistant (2-4 sentences)",
                "",
                "",
                "Putting it all together...",
            ),
        ],
    )
}

// ---------------------------------------------------------------------------
// Deep Research
// ---------------------------------------------------------------------------

fn deep_research() -> WorkflowDef {
    def(
        "deep_research",
        "Deep Research",
        "Initial search, evaluate gaps, targeted follow-up, synthesize",
        &[
            "tell me about",
            "research",
            "explain in detail",
            "what's happening with",
            "deep dive",
            "comprehensive",
            "thorough",
        ],
        5,
        vec![
            step(
                "initial_search",
                "Initial search",
                StepKind::Llm,
                "Today is {{current_date}}.\n\
                 The user asked: {{user_query}}\n\n\
                 Generate a focused web search query to find the most relevant, \
                 current information. Include '{{current_year}}' in the query.\n\n\
                 Return ONLY the search query string, nothing else.",
                "web_search",
                "evaluate_gaps",
                "Searching for {{user_query_short}}...",
            ),
            step(
                "evaluate_gaps",
                "Evaluating gaps",
                StepKind::Llm,
                "Today is {{current_date}}.\n\
                 The user asked: {{user_query}}\n\n\
                 Initial search results:\n{{initial_search}}\n\n\
                 What key information is still missing to fully answer this \
                 question? Generate 1-2 follow-up search queries as a JSON \
                 array to fill the gaps. Include '{{current_year}}' in queries.\n\n\
                 Return ONLY the JSON array of search query strings.",
                "",
                "targeted_search",
                "Evaluating what else we need...",
            ),
            step(
                "targeted_search",
                "Targeted search",
                StepKind::Loop,
                "",
                "web_search",
                "synthesize",
                "Running follow-up searches...",
            ),
            step(
                "synthesize",
                "Synthesizing",
                StepKind::Llm,
                "Today is {{current_date}}.\n\
                 The user asked: {{user_query}}\n\n\
                 Initial findings:\n{{initial_search}}\n\n\
                 Follow-up findings:\n{{search_results}}\n\n\
                 RULES:\n\
                 - ONLY cite facts/numbers from the search results above\n\
                 - If your training knowledge contradicts the search results, \
                 TRUST THE SEARCH RESULTS\n\
                 - Include specific facts, dates, and numbers\n\
                 - Keep it conversational for a voice assistant (3-5 sentences)",
                "",
                "",
                "Putting it all together...",
            ),
        ],
    )
}

// ---------------------------------------------------------------------------
// Fact Check
// ---------------------------------------------------------------------------

fn fact_check() -> WorkflowDef {
    def(
        "fact_check",
        "Fact Check",
        "Extract claim, search evidence, search counter-evidence, verdict",
        &[
            "is it true",
            "fact check",
            "verify",
            "debunk",
            "is that correct",
            "true that",
            "really true",
            "actually true",
        ],
        6,
        vec![
            step(
                "extract_claim",
                "Extracting claim",
                StepKind::Llm,
                "Today is {{current_date}}.\n\
                 The user asked: {{user_query}}\n\n\
                 Extract the core factual claim being questioned. \
                 Then generate TWO search queries:\n\
                 1. A query to find evidence SUPPORTING the claim (include '{{current_year}}')\n\
                 2. A query to find evidence AGAINST the claim (include '{{current_year}}')\n\n\
                 Return JSON: {\"claim\": \"...\", \"support_query\": \"...\", \
                 \"counter_query\": \"...\"}",
                "",
                "search_evidence",
                "Extracting the claim to check...",
            ),
            step(
                "search_evidence",
                "Searching for evidence",
                StepKind::Direct,
                "",
                "web_search",
                "search_counter",
                "Searching for supporting evidence...",
            ),
            step(
                "search_counter",
                "Searching counter-evidence",
                StepKind::Direct,
                "",
                "web_search",
                "verdict",
                "Searching for counter-evidence...",
            ),
            step(
                "verdict",
                "Rendering verdict",
                StepKind::Llm,
                "Today is {{current_date}}.\n\
                 The user asked: {{user_query}}\n\n\
                 Claim: {{claims}}\n\n\
                 Supporting evidence:\n{{evidence}}\n\n\
                 Counter-evidence:\n{{counter_evidence}}\n\n\
                 RULES:\n\
                 - Base your verdict ONLY on the evidence above\n\
                 - Do NOT rely on training knowledge for factual claims\n\
                 - Render a fair verdict: true, false, partly true, or unverified\n\
                 - Cite specific evidence from the search results\n\
                 - Keep it conversational for a voice assistant (2-4 sentences)",
                "",
                "",
                "Rendering verdict...",
            ),
        ],
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
