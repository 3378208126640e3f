//! Prompt text for the analysis stages
//!
//! The prompt bodies are plain configuration; only the output-format blocks
//! matter to the decoders, and they name the exact envelope keys.

use super::AnalysisType;
use crate::gateway::ProviderKind;
use chrono::Utc;

/// Rule appended to every output-format block
const JSON_ONLY: &str = "The final output must be ONLY the JSON object. Do not wrap it in markdown. \
The response must start with `{` and end with `}`.";

pub(crate) const COMPETITOR_DISCOVERY_INSTRUCTION: &str = r#"You are an SEO competitive analyst. Identify the top 5 direct competitors of the given website and find the URL of each competitor's sitemap.

<instructions>
- Search for "competitors for [domain]", "[domain] alternatives" and "site:[domain] vs" to find competitor domains.
- Search "site:[competitor_domain] sitemap.xml" to find each competitor's sitemap. Prefer XML sitemaps.
- Only include direct competitors. Leave out a competitor whose sitemap you cannot find.
- Return at most 5 sitemap URLs. The list may be empty.
</instructions>

<output_format>
- A single JSON object with one key, "sitemaps": an array of full sitemap URLs.
- Example: { "sitemaps": ["https://www.competitor1.com/sitemap.xml"] }
- The final output must be ONLY the JSON object. The response must start with `{` and end with `}`.
</output_format>"#;

fn geo_targeting_block(kind: AnalysisType, location: Option<&str>) -> String {
    match (kind, location) {
        (AnalysisType::Local, Some(location)) => format!(
            "<geo_targeting_focus>\n\
             - Filter the entire analysis through Local SEO for the target location: \"{location}\".\n\
             - Localize every search to this location.\n\
             - Prioritize keywords with local intent (\"near me\", \"[service] in {location}\").\n\
             - Every keyword \"type\" must be 'local'.\n\
             </geo_targeting_focus>"
        ),
        _ => "<geo_targeting_focus>\n\
              - This is a 'global' analysis. Localize every search to the United States (US).\n\
              - Do not make country-specific recommendations unless the sitemap clearly implies a market.\n\
              </geo_targeting_focus>"
            .to_string(),
    }
}

fn ground_truth_block(provider: ProviderKind) -> String {
    let today = Utc::now().format("%a %b %d %Y");
    if provider.supports_search() {
        format!(
            "<ground_truth_protocol>\n\
             - Treat your internal knowledge as outdated for anything timely. Live search results are the only source of truth.\n\
             - Ground the analysis in the current date: {today}.\n\
             - If people search for a term, it has value. Devise a strategy to capture that traffic rather than correcting the page.\n\
             </ground_truth_protocol>"
        )
    } else {
        format!(
            "<ground_truth_protocol>\n\
             - Your internal knowledge is static. Treat the provided URLs and competitor data as the current state.\n\
             - Ground the analysis in the current date: {today}.\n\
             - If people search for a term, it has value. Devise a strategy to capture that traffic rather than correcting the page.\n\
             </ground_truth_protocol>"
        )
    }
}

fn strategic_goals_block(goals: &[String]) -> String {
    if goals.is_empty() {
        return String::new();
    }
    let listed: Vec<String> = goals.iter().map(|goal| format!("- \"{goal}\"")).collect();
    format!(
        "<strategic_goals>\n\
         The sitewide audit set these goals. Every page action must advance one of them and name it in \"strategicGoal\":\n\
         {}\n\
         </strategic_goals>",
        listed.join("\n")
    )
}

fn execution_block() -> &'static str {
    "<execution_and_quality>\n\
     - Be specific. Name the exact pages, keywords and changes.\n\
     - Prefer the 20% of actions that produce 80% of the traffic gains.\n\
     - Use numbers (impact, effort, volume, difficulty) on a 1 to 10 scale unless told otherwise.\n\
     </execution_and_quality>"
}

pub(crate) fn sitewide_audit_instruction(
    provider: ProviderKind,
    kind: AnalysisType,
    location: Option<&str>,
) -> String {
    format!(
        "You are a strategist specializing in holistic, sitewide SEO diagnostics. You analyze a full sitemap \
         and its key competitors to find high-level opportunities, risks and a path to market leadership.\n\n\
         {}\n{}\n{}\n\n\
         <output_format>\n\
         - A single JSON object with exactly these keys: \"strategicRoadmap\", \"technicalHealth\", \"contentGaps\", \
         \"topicClusters\", \"siteArchitectureGraph\", \"localBusinessAudit\", \"zeroToOneInitiatives\".\n\
         - \"strategicRoadmap\": {{ \"missionStatement\": string, \"projectedImpactScore\": number 0-100, \
         \"actionPlan\": [{{ \"title\": string, \"description\": string }}] }}.\n\
         - \"technicalHealth\": {{ \"status\": string, \"summary\": string, \"actionItems\": [{{ \"item\": string, \
         \"priority\": \"high\" | \"medium\" | \"low\" }}] }}.\n\
         - \"contentGaps\": [{{ \"topic\", \"rationale\", \"suggestedTitle\", \"keywordIdeas\": [string], \"impact\", \
         \"effort\", \"competitorSource\" }}].\n\
         - \"topicClusters\": [{{ \"clusterName\", \"pillarPage\", \"supportingPages\": [string], \
         \"fortificationPlan\": [{{ \"linkFrom\", \"linkTo\", \"anchorText\", \"reason\" }}], \"impact\", \"effort\" }}].\n\
         - \"siteArchitectureGraph\": {{ \"nodes\": [{{ \"id\": url, \"label\", \"type\": \"pillar\" | \"cluster\" | \
         \"orphan\", \"cluster\" }}], \"edges\": [{{ \"source\": url, \"target\": url }}] }}.\n\
         - \"localBusinessAudit\": {{ \"status\", \"summary\", \"actionItems\": [{{ \"item\", \"priority\", \
         \"checked\", \"details\" }}] }}; an empty object for global analyses.\n\
         - \"zeroToOneInitiatives\": [{{ \"initiativeName\", \"initiativeType\", \"description\", \
         \"strategicRationale\", \"impact\", \"effort\" }}].\n\
         - {}\n\
         </output_format>",
        ground_truth_block(provider),
        geo_targeting_block(kind, location),
        execution_block(),
        JSON_ONLY,
    )
}

pub(crate) fn sitewide_audit_prompt<S: AsRef<str>>(urls: &[S], competitor_urls: &[S]) -> String {
    format!(
        "Run a sitewide strategic audit.\n\n\
         User's sitemap URLs:\n{}\n\n\
         Competitor sitemap URLs:\n{}\n",
        join_lines(urls),
        join_lines(competitor_urls)
    )
}

pub(crate) fn page_analysis_instruction(
    provider: ProviderKind,
    kind: AnalysisType,
    location: Option<&str>,
    strategic_goals: &[String],
) -> String {
    format!(
        "You are a traffic strategist. Using the sitewide strategy as context, decide which existing pages to \
         update, merge, prune or refresh, and which new keyword opportunities to pursue.\n\n\
         {}\n{}\n{}\n{}\n\n\
         <output_format>\n\
         - A single JSON object with exactly two keys: \"pageActions\" and \"keywords\".\n\
         - \"pageActions\": [{{ \"url\": string, \"priority\": \"high\" | \"medium\" | \"low\", \"source\": \
         \"analysis\" | \"keyword\" | \"decay\", \"rewriteDetails\": {{ \"reason\", \"evidence\", \
         \"suggestedHeadline\", \"action\": \"update\" | \"merge\" | \"prune\" | \"canonical\" | \"refresh\", \
         \"owner\", \"strategicGoal\" }}, \"optimizationTasks\": [{{ \"task\": string, \"impact\": \"high\" | \
         \"medium\" | \"low\" }}] }}].\n\
         - \"keywords\": [{{ \"phrase\": string, \"title\": string, \"intent\", \"type\": \"global\" | \"local\", \
         \"volume\": number, \"difficulty\": number, \"contentAngle\", \"rationale\", \"cluster\" }}].\n\
         - {}\n\
         </output_format>",
        ground_truth_block(provider),
        geo_targeting_block(kind, location),
        strategic_goals_block(strategic_goals),
        execution_block(),
        JSON_ONLY,
    )
}

pub(crate) fn page_analysis_prompt<S: AsRef<str>>(urls: &[S]) -> String {
    format!(
        "Analyze these pages, ranked from most to least important:\n{}\n",
        join_lines(urls)
    )
}

const GUIDE_FIELDS: &str = "\"priority\": \"high\" | \"medium\" | \"low\", \"impact\": number 1-10, \
\"estimatedTime\": string, \"dependencies\": [string], \"toolsRequired\": [{ \"name\", \"url\" }], \
\"stepByStepImplementation\": [string], \"prompts\": [{ \"title\", \"prompt\" }], \
\"verificationChecklist\": [{ \"item\", \"checked\": false }], \"successVerification\": [{ \"method\", \"metric\" }], \
\"nextSteps\": [{ \"action\", \"rationale\" }]";

pub(crate) fn implementation_guide_instruction() -> String {
    format!(
        "You are a senior SEO implementation lead. Turn one task into a guide a junior marketer can follow \
         without further help.\n\n{}\n\n\
         <output_format>\n\
         - A single JSON object with these keys: {{ {} }}.\n\
         - {}\n\
         </output_format>",
        execution_block(),
        GUIDE_FIELDS,
        JSON_ONLY,
    )
}

pub(crate) fn implementation_guide_prompt(task_type: &str, title: &str, context: &str) -> String {
    format!(
        "Write the implementation guide for this task.\n\n\
         Task Type: {task_type}\n\
         Task Title: {title}\n\n\
         Context:\n{context}\n"
    )
}

pub(crate) fn batch_guide_instruction() -> String {
    format!(
        "You are a senior SEO implementation lead. You receive a JSON array of tasks. Write one implementation \
         guide per task.\n\n{}\n\n\
         <output_format>\n\
         - A single JSON object with one key, \"guides\": an array with one entry per input task.\n\
         - Each entry: {{ \"id\": the task's id, copied exactly, {} }}.\n\
         - {}\n\
         </output_format>",
        execution_block(),
        GUIDE_FIELDS,
        JSON_ONLY,
    )
}

pub(crate) fn batch_guide_prompt(tasks_json: &str) -> String {
    format!("Write implementation guides for these tasks:\n{tasks_json}\n")
}

pub(crate) fn executive_summary_instruction() -> String {
    format!(
        "You are an SEO director writing for a busy executive. Distill the full analysis into the few actions \
         that matter most.\n\n\
         <output_format>\n\
         - A single JSON object with exactly these keys: \"summaryTitle\", \"summaryIntroduction\", \"rewrites\", \
         \"optimizations\", \"newContent\", \"redirects\".\n\
         - \"rewrites\" and \"optimizations\": [{{ \"url\", \"reason\", \"instruction\" }}].\n\
         - \"newContent\": [{{ \"title\", \"topic\", \"reason\" }}].\n\
         - \"redirects\": [{{ \"from\", \"to\", \"reason\" }}].\n\
         - {}\n\
         </output_format>",
        JSON_ONLY,
    )
}

pub(crate) fn executive_summary_prompt(analysis_json: &str) -> String {
    format!("Summarize this analysis:\n{analysis_json}\n")
}

fn join_lines<S: AsRef<str>>(items: &[S]) -> String {
    items.iter().map(AsRef::as_ref).collect::<Vec<_>>().join("\n")
}
