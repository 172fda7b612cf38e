use anyhow::{anyhow, Context, Result};
use rand::Rng;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::debug;

use crate::models::{
    Bid, DimensionScore, GoalCategory, JobOpportunity, OpportunityType, Persona, StrategicGoal,
};

// --- Provider trait ---

pub trait AIProvider {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String>;
    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone)]
pub enum ProviderKind {
    Anthropic,
    OpenAI,
    ClaudeCode,
}

#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub provider: ProviderKind,
    pub model_id: String,
    pub short_name: String,
}

pub fn resolve_model(name: &str) -> Result<ModelSpec> {
    let (provider, model_id, short_name) = match name {
        // Claude Code provider (uses `claude` CLI, no API key needed)
        "claude-sonnet" | "sonnet" => (ProviderKind::ClaudeCode, "claude-sonnet-4-5-20250929", "claude-sonnet"),
        "claude-haiku" | "haiku" => (ProviderKind::ClaudeCode, "claude-haiku-4-5-20251001", "claude-haiku"),
        // Direct Anthropic API (requires ANTHROPIC_API_KEY)
        "api-sonnet" => (ProviderKind::Anthropic, "claude-sonnet-4-5-20250929", "api-sonnet"),
        "api-haiku" => (ProviderKind::Anthropic, "claude-haiku-4-5-20251001", "api-haiku"),
        // OpenAI (requires OPENAI_API_KEY)
        "gpt-4o" => (ProviderKind::OpenAI, "gpt-4o", "gpt-4o"),
        "gpt-4o-mini" => (ProviderKind::OpenAI, "gpt-4o-mini", "gpt-4o-mini"),
        _ => {
            return Err(anyhow!(
                "Unknown model '{}'. Available: claude-sonnet (default), claude-haiku, \
                 api-sonnet, api-haiku, gpt-4o, gpt-4o-mini",
                name
            ));
        }
    };
    Ok(ModelSpec {
        provider,
        model_id: model_id.to_string(),
        short_name: short_name.to_string(),
    })
}

pub fn create_provider(spec: &ModelSpec, timeout: Duration) -> Result<Box<dyn AIProvider>> {
    match spec.provider {
        ProviderKind::ClaudeCode => Ok(Box::new(ClaudeCodeProvider::new(spec.model_id.clone())?)),
        ProviderKind::Anthropic => Ok(Box::new(AnthropicProvider::new(spec.model_id.clone(), timeout)?)),
        ProviderKind::OpenAI => Ok(Box::new(OpenAIProvider::new(spec.model_id.clone(), timeout)?)),
    }
}

fn http_client(timeout: Duration) -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

// --- Anthropic provider ---

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug)]
pub struct AnthropicProvider {
    api_key: String,
    model_id: String,
    client: reqwest::blocking::Client,
}

impl AnthropicProvider {
    pub fn new(model_id: String, timeout: Duration) -> Result<Self> {
        let api_key = env::var("ANTHROPIC_API_KEY")
            .context("ANTHROPIC_API_KEY environment variable not set. Set it with: export ANTHROPIC_API_KEY=your-key-here")?;
        Ok(Self {
            api_key,
            model_id,
            client: http_client(timeout)?,
        })
    }
}

impl AIProvider for AnthropicProvider {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = ChatRequest {
            model: &self.model_id,
            max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .context("Failed to send request to Anthropic API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!(
                "Anthropic API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let api_response: AnthropicResponse = response
            .json()
            .context("Failed to parse Anthropic API response")?;

        api_response
            .content
            .first()
            .map(|block| block.text.clone())
            .ok_or_else(|| anyhow!("No content in Anthropic API response"))
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- Claude Code provider (shells out to `claude` CLI) ---

#[derive(Debug)]
pub struct ClaudeCodeProvider {
    model_id: String,
}

impl ClaudeCodeProvider {
    pub fn new(model_id: String) -> Result<Self> {
        std::process::Command::new("claude")
            .arg("--version")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .context("'claude' CLI not found. Install it or set CAREEROS_MODEL=api-sonnet / gpt-4o.")?;
        Ok(Self { model_id })
    }
}

impl AIProvider for ClaudeCodeProvider {
    fn complete(&self, prompt: &str, _max_tokens: u32) -> Result<String> {
        let output = std::process::Command::new("claude")
            .arg("-p")
            .arg(prompt)
            .arg("--model")
            .arg(&self.model_id)
            .output()
            .context("Failed to run 'claude' CLI")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("claude CLI failed: {}", stderr));
        }

        let response = String::from_utf8(output.stdout)
            .context("Invalid UTF-8 in claude CLI output")?;

        if response.trim().is_empty() {
            return Err(anyhow!("Empty response from claude CLI"));
        }

        Ok(response)
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- OpenAI provider ---

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug)]
pub struct OpenAIProvider {
    api_key: String,
    model_id: String,
    client: reqwest::blocking::Client,
}

impl OpenAIProvider {
    pub fn new(model_id: String, timeout: Duration) -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY environment variable not set. Set it with: export OPENAI_API_KEY=your-key-here")?;
        Ok(Self {
            api_key,
            model_id,
            client: http_client(timeout)?,
        })
    }
}

impl AIProvider for OpenAIProvider {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = ChatRequest {
            model: &self.model_id,
            max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(OPENAI_API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .context("Failed to send request to OpenAI API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!(
                "OpenAI API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let api_response: OpenAIResponse = response
            .json()
            .context("Failed to parse OpenAI API response")?;

        api_response
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .ok_or_else(|| anyhow!("No choices in OpenAI API response"))
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- Generation service ---

/// Fields the profile parser may recover from free text. Empty means unknown.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParsedProfile {
    pub name: Option<String>,
    pub email: Option<String>,
    pub industry: Option<String>,
    pub role: Option<String>,
    pub location: Option<String>,
    pub skills: Vec<String>,
    pub market_value: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoveryResult {
    pub ai_question: String,
    pub extracted_skills: Vec<String>,
    pub new_context_param: Option<String>,
}

/// Everything the screens ask of the external generation service. Every call
/// may fail; callers keep a local fallback.
pub trait Generator {
    fn parse_profile_from_text(&self, text: &str, persona: Persona) -> Result<ParsedProfile>;

    fn generate_marketplace_opportunities(
        &self,
        industry: &str,
        location: &str,
        keywords: &str,
        filter: Option<OpportunityType>,
        persona: Option<Persona>,
    ) -> Result<Vec<JobOpportunity>>;

    fn generate_opportunities(&self, industry: &str, location: &str) -> Result<Vec<Bid>>;

    fn generate_cover_letter(&self, job: &JobOpportunity, resume_text: &str) -> Result<String>;

    fn tailor_resume_to_job(&self, resume_text: &str, title: &str, description: &str) -> Result<String>;

    fn generate_career_roadmap(&self, scores: &[DimensionScore], role_label: &str) -> Result<Vec<StrategicGoal>>;

    fn run_profile_discovery(
        &self,
        resume_text: &str,
        history: &[String],
        new_message: &str,
    ) -> Result<DiscoveryResult>;
}

pub struct AiGenerator {
    provider: Box<dyn AIProvider>,
}

impl AiGenerator {
    pub fn new(provider: Box<dyn AIProvider>) -> Self {
        Self { provider }
    }

    fn complete_json<T: DeserializeOwned>(&self, prompt: &str, max_tokens: u32) -> Result<T> {
        debug!(model = self.provider.model_name(), "generation request");
        let response = self.provider.complete(prompt, max_tokens)?;
        let body = extract_json(&response)
            .ok_or_else(|| anyhow!("No JSON found in model response"))?;
        serde_json::from_str(body).context("Model returned malformed JSON")
    }
}

/// Stand-in used when no provider can be created. Every call fails so callers
/// take their local fallback.
pub struct OfflineGenerator;

impl Generator for OfflineGenerator {
    fn parse_profile_from_text(&self, _text: &str, _persona: Persona) -> Result<ParsedProfile> {
        Err(anyhow!("generation service unavailable"))
    }

    fn generate_marketplace_opportunities(
        &self,
        _industry: &str,
        _location: &str,
        _keywords: &str,
        _filter: Option<OpportunityType>,
        _persona: Option<Persona>,
    ) -> Result<Vec<JobOpportunity>> {
        Err(anyhow!("generation service unavailable"))
    }

    fn generate_opportunities(&self, _industry: &str, _location: &str) -> Result<Vec<Bid>> {
        Err(anyhow!("generation service unavailable"))
    }

    fn generate_cover_letter(&self, _job: &JobOpportunity, _resume_text: &str) -> Result<String> {
        Err(anyhow!("generation service unavailable"))
    }

    fn tailor_resume_to_job(&self, _resume_text: &str, _title: &str, _description: &str) -> Result<String> {
        Err(anyhow!("generation service unavailable"))
    }

    fn generate_career_roadmap(&self, _scores: &[DimensionScore], _role_label: &str) -> Result<Vec<StrategicGoal>> {
        Err(anyhow!("generation service unavailable"))
    }

    fn run_profile_discovery(&self, _resume_text: &str, _history: &[String], _new_message: &str) -> Result<DiscoveryResult> {
        Err(anyhow!("generation service unavailable"))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOpportunity {
    id: Option<String>,
    title: String,
    company: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    budget: String,
    #[serde(default)]
    skills: Vec<String>,
    #[serde(default)]
    location: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    match_score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBid {
    id: Option<String>,
    title: String,
    agency: String,
    #[serde(default)]
    value: String,
    #[serde(default)]
    deadline: String,
    #[serde(default)]
    requirements: Vec<String>,
    #[serde(default)]
    win_probability: f64,
}

#[derive(Debug, Deserialize)]
struct RawGoal {
    title: String,
    category: Option<String>,
    #[serde(default)]
    deadline: String,
    #[serde(default)]
    steps: Vec<String>,
}

impl Generator for AiGenerator {
    fn parse_profile_from_text(&self, text: &str, persona: Persona) -> Result<ParsedProfile> {
        let prompt = format!(
            "Extract a structured profile from the text below, written by a {persona_label}.\n\
            Return ONLY a JSON object with these optional keys:\n\
            name, email, industry, role, location (strings), skills (array of strings), \
            marketValue (integer estimate of annual market value in USD).\n\
            Omit keys you cannot determine.\n\n\
            Text:\n{text}",
            persona_label = persona.config().label,
        );
        self.complete_json(&prompt, 2048)
    }

    fn generate_marketplace_opportunities(
        &self,
        industry: &str,
        location: &str,
        keywords: &str,
        filter: Option<OpportunityType>,
        persona: Option<Persona>,
    ) -> Result<Vec<JobOpportunity>> {
        let audience = persona.map(|p| p.config().marketplace_label).unwrap_or("Jobs");
        let type_rule = filter
            .map(|f| format!("Only return opportunities of type \"{}\".", f.as_str()))
            .unwrap_or_default();
        let prompt = format!(
            "Generate 5 realistic {audience} listings for the {industry} industry near {location}.\n\
            Keywords: {keywords}\n{type_rule}\n\n\
            Return ONLY a JSON array of objects with keys: id, title, company, \
            type (one of Full-time, Contract, Tender, Freelance, Executive), budget, \
            skills (array), location, description, matchScore (0-100)."
        );
        let raw: Vec<RawOpportunity> = self.complete_json(&prompt, 4096)?;
        Ok(raw.into_iter().map(opportunity_from_raw).collect())
    }

    fn generate_opportunities(&self, industry: &str, location: &str) -> Result<Vec<Bid>> {
        let prompt = format!(
            "Generate 4 realistic open government or enterprise tenders suitable for a \
            {industry} contractor based in {location}.\n\n\
            Return ONLY a JSON array of objects with keys: id, title, agency, value, \
            deadline, requirements (array), winProbability (0-100)."
        );
        let raw: Vec<RawBid> = self.complete_json(&prompt, 4096)?;
        Ok(raw
            .into_iter()
            .map(|b| Bid {
                id: b.id.unwrap_or_else(|| new_id("bid")),
                title: b.title,
                agency: b.agency,
                value: b.value,
                deadline: b.deadline,
                requirements: b.requirements,
                win_probability: clamp_percent(b.win_probability),
            })
            .collect())
    }

    fn generate_cover_letter(&self, job: &JobOpportunity, resume_text: &str) -> Result<String> {
        let prompt = format!(
            "Write a concise, specific cover letter (under 300 words) for the role below, \
            using only facts from the resume.\n\n\
            Role: {} at {}\nDescription: {}\n\nResume:\n{}",
            job.title, job.company, job.description, resume_text
        );
        let letter = self.provider.complete(&prompt, 2048)?;
        Ok(letter.trim().to_string())
    }

    fn tailor_resume_to_job(&self, resume_text: &str, title: &str, description: &str) -> Result<String> {
        let prompt = format!(
            "You are an expert resume writer. Rewrite the resume below for the target role.\n\
            Stay 100% truthful; reorder and rephrase only. Return markdown.\n\n\
            Target role: {title}\nDescription: {description}\n\nResume:\n{resume_text}"
        );
        let tailored = self.provider.complete(&prompt, 8192)?;
        Ok(tailored.trim().to_string())
    }

    fn generate_career_roadmap(&self, scores: &[DimensionScore], role_label: &str) -> Result<Vec<StrategicGoal>> {
        let score_lines: Vec<String> = scores
            .iter()
            .map(|s| format!("- {}: {:.0}/100", s.dimension, s.score))
            .collect();
        let prompt = format!(
            "A {role_label} scored themselves as follows:\n{}\n\n\
            Produce a 3-goal strategic roadmap focused on the weakest areas.\n\
            Return ONLY a JSON array of objects with keys: title, \
            category (Skill, Network, Visibility, Financial or Leadership), \
            deadline (e.g. \"30 days\"), steps (array of strings).",
            score_lines.join("\n")
        );
        let raw: Vec<RawGoal> = self.complete_json(&prompt, 4096)?;
        Ok(raw
            .into_iter()
            .map(|g| StrategicGoal {
                id: new_id("goal"),
                title: g.title,
                category: g
                    .category
                    .as_deref()
                    .and_then(parse_goal_category)
                    .unwrap_or(GoalCategory::Skill),
                deadline: g.deadline,
                steps: g.steps,
            })
            .collect())
    }

    fn run_profile_discovery(
        &self,
        resume_text: &str,
        history: &[String],
        new_message: &str,
    ) -> Result<DiscoveryResult> {
        let prompt = format!(
            "You are a career coach uncovering hidden skills.\n\
            Resume:\n{resume_text}\n\nWhat we know so far:\n{}\n\n\
            The user just said: \"{new_message}\"\n\n\
            Return ONLY a JSON object with keys: aiQuestion (your next probing question), \
            extractedSkills (array of skills evidenced by the user's message), \
            newContextParam (one short fact to remember, or null).",
            history.join("\n")
        );
        self.complete_json(&prompt, 2048)
    }
}

fn opportunity_from_raw(raw: RawOpportunity) -> JobOpportunity {
    JobOpportunity {
        id: raw.id.filter(|id| !id.trim().is_empty()).unwrap_or_else(|| new_id("job")),
        title: raw.title,
        company: raw.company,
        kind: raw
            .kind
            .as_deref()
            .and_then(parse_opportunity_type)
            .unwrap_or(OpportunityType::FullTime),
        budget: raw.budget,
        skills: raw.skills,
        location: raw.location,
        description: raw.description,
        match_score: clamp_percent(raw.match_score),
    }
}

pub fn parse_opportunity_type(s: &str) -> Option<OpportunityType> {
    match s.trim().to_lowercase().replace(['-', '_', ' '], "").as_str() {
        "fulltime" | "permanent" => Some(OpportunityType::FullTime),
        "contract" => Some(OpportunityType::Contract),
        "tender" | "bid" => Some(OpportunityType::Tender),
        "freelance" | "gig" => Some(OpportunityType::Freelance),
        "executive" => Some(OpportunityType::Executive),
        _ => None,
    }
}

fn parse_goal_category(s: &str) -> Option<GoalCategory> {
    match s.trim().to_lowercase().as_str() {
        "skill" | "skills" => Some(GoalCategory::Skill),
        "network" | "networking" => Some(GoalCategory::Network),
        "visibility" | "brand" => Some(GoalCategory::Visibility),
        "financial" | "finance" => Some(GoalCategory::Financial),
        "leadership" => Some(GoalCategory::Leadership),
        _ => None,
    }
}

fn clamp_percent(value: f64) -> u8 {
    if value.is_nan() {
        0
    } else {
        value.round().clamp(0.0, 100.0) as u8
    }
}

pub fn new_id(prefix: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..0x00ff_ffff);
    format!("{}-{:06x}", prefix, suffix)
}

/// Finds the outermost JSON object or array in a model reply, skipping code
/// fences and chatter around it.
fn extract_json(response: &str) -> Option<&str> {
    let start = response.find(['{', '['])?;
    let close = if response[start..].starts_with('{') { '}' } else { ']' };
    let end = response.rfind(close)?;
    (end > start).then(|| &response[start..=end])
}
