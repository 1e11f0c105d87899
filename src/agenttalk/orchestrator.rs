//! The orchestration session.
//!
//! An [`Orchestrator`] owns one [`AgentRegistry`] and one [`ConversationLog`] and drives the
//! collaboration protocols over them:
//!
//! - **Single call** ([`call_agent`](Orchestrator::call_agent)): read the log, ask one agent,
//!   append its reply. Every protocol is built from this step.
//! - **Sequential pipeline** ([`run_sequential_pipeline`](Orchestrator::run_sequential_pipeline)):
//!   Product Manager → Developer → QA. Roles whose agent is not configured are skipped.
//! - **Round-robin discussion**
//!   ([`run_round_robin_discussion`](Orchestrator::run_round_robin_discussion)): every agent
//!   speaks once per round, in registry order.
//!
//! Steps run strictly one after another. Step N's reply is in the log before step N+1 starts,
//! which the later pipeline prompts ("the specification above") depend on.
//!
//! # Failure tiers
//!
//! A provider failure is absorbed by the agent and recorded as an ordinary turn flagged
//! `is_error`; the run continues. Bad input (blank fields, unknown agent) comes back as an
//! [`OrchestratorError`] and appends nothing.
//!
//! # Sharing a session
//!
//! Every mutating operation takes `&mut self`, so a run cannot interleave with another on the
//! same session. Serving layers hold the session as a [`SharedOrchestrator`] and lock it for
//! the whole run (the streaming helpers in [`event`](crate::event) do exactly that).
//!
//! # Example
//!
//! ```rust,no_run
//! use agenttalk::{AgentTalkConfig, Orchestrator};
//!
//! # async {
//! let mut orchestrator = Orchestrator::from_config(&AgentTalkConfig::from_env());
//!
//! let steps = orchestrator
//!     .run_round_robin_discussion("Monolith or microservices?", 2)
//!     .await?;
//! println!("{} replies, log holds {} turns", steps.len(), orchestrator.conversation().len());
//!
//! orchestrator.reset();
//! assert_eq!(orchestrator.status().conversation_length, 0);
//! # Ok::<(), agenttalk::OrchestratorError>(())
//! # };
//! ```

use crate::config::AgentTalkConfig;
use crate::conversation::{ConversationLog, Turn, USER_SPEAKER};
use crate::event::{EventHandler, StreamEvent};
use crate::registry::{AgentInfo, AgentRegistry, CHATGPT, GEMINI, GROQ};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A session shared with a serving layer. The mutex is held for the duration of a run.
pub type SharedOrchestrator = Arc<Mutex<Orchestrator>>;

/// Outcome of one scheduled step.
pub type StepResult = Result<AgentCall, OrchestratorError>;

/// Speaker used for the completion summary that closes a streamed run.
pub const SYSTEM_SPEAKER: &str = "System";
const SYSTEM_ROLE: &str = "Orchestrator";

const MAX_PREALLOCATED_STEPS: usize = 64;

/// Pipeline roles in their fixed order: registry name and the task handed to that agent.
const PIPELINE: [(&str, PipelineTask); 3] = [
    (CHATGPT, PipelineTask::Specification),
    (GEMINI, PipelineTask::Implementation),
    (GROQ, PipelineTask::Review),
];

#[derive(Clone, Copy)]
enum PipelineTask {
    Specification,
    Implementation,
    Review,
}

impl PipelineTask {
    fn prompt(self, request: &str) -> String {
        match self {
            PipelineTask::Specification => format!(
                "As a Product Manager, analyze this request and create a detailed technical specification with key features and tech stack recommendations: {}",
                request
            ),
            PipelineTask::Implementation => "As a Full-Stack Developer, based on the specification above, write actual code snippets for the key components. Include both frontend (HTML/JS) and backend (Python/Node.js) code. Keep each code block concise but functional.".to_string(),
            PipelineTask::Review => "As a QA Engineer, review the specification and code above. Suggest test cases, potential bugs to watch for, and quality improvements. Provide examples of unit tests if applicable.".to_string(),
        }
    }
}

/// A successful agent invocation.
#[derive(Debug, Clone, Serialize)]
pub struct AgentCall {
    /// Registry name of the agent that replied.
    pub agent: String,
    pub role: String,
    pub response: String,
    /// The provider call failed and `response` holds the `Error calling ...` text.
    pub is_error: bool,
    /// The full conversation right after the reply was appended.
    pub conversation: Vec<Turn>,
}

/// Input errors reported to the immediate caller. None of them touch the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    /// No agent is registered under `name`.
    AgentNotFound {
        name: String,
        available: Vec<String>,
    },

    /// A required field was blank.
    MissingField(&'static str),
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrchestratorError::AgentNotFound { name, available } => write!(
                f,
                "Agent '{}' not available. Available agents: {:?}",
                name, available
            ),
            OrchestratorError::MissingField(field) => write!(f, "Missing '{}' in request", field),
        }
    }
}

impl Error for OrchestratorError {}

/// JSON shape of a single call result for the front end:
/// `{success: true, agent, role, response, is_error, conversation}` or
/// `{success: false, error}`.
#[derive(Debug, Clone, Serialize)]
pub struct CallResponse {
    pub success: bool,
    #[serde(flatten)]
    pub call: Option<AgentCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&StepResult> for CallResponse {
    fn from(result: &StepResult) -> Self {
        match result {
            Ok(call) => CallResponse {
                success: true,
                call: Some(call.clone()),
                error: None,
            },
            Err(e) => CallResponse {
                success: false,
                call: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// The protocol a session is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    SingleCall,
    SequentialPipeline,
    RoundRobinDiscussion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running(Protocol),
}

/// Project phase. Tracked and reset with the log; no protocol reads it yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectPhase {
    Planning,
    Implementation,
    Review,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectState {
    pub phase: ProjectPhase,
    pub artifacts: BTreeMap<String, String>,
}

impl Default for ProjectState {
    fn default() -> Self {
        ProjectState {
            phase: ProjectPhase::Planning,
            artifacts: BTreeMap::new(),
        }
    }
}

/// Snapshot returned by [`Orchestrator::status`].
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub available_agents: Vec<AgentInfo>,
    pub conversation_length: usize,
    pub project_phase: ProjectPhase,
}

struct ScheduledStep {
    agent: String,
    prompt: String,
}

/// The steps of a run. Discussion steps are produced one at a time, so the round count
/// never has to fit in memory.
enum Schedule {
    Fixed(Vec<ScheduledStep>),
    Rounds {
        topic: String,
        rounds: usize,
        agents: Vec<String>,
    },
}

impl Schedule {
    /// Number of steps, or `None` when it does not fit in a `usize`.
    fn len(&self) -> Option<usize> {
        match self {
            Schedule::Fixed(steps) => Some(steps.len()),
            Schedule::Rounds { rounds, agents, .. } => rounds.checked_mul(agents.len()),
        }
    }

    fn into_steps(self) -> Box<dyn Iterator<Item = ScheduledStep> + Send> {
        match self {
            Schedule::Fixed(steps) => Box::new(steps.into_iter()),
            // No agents means no steps, whatever the round count.
            Schedule::Rounds { agents, .. } if agents.is_empty() => {
                Box::new(std::iter::empty())
            }
            Schedule::Rounds {
                topic,
                rounds,
                agents,
            } => Box::new((0..rounds).flat_map(move |round| {
                let prompt = if round == 0 {
                    format!("Share your perspective on: {}", topic)
                } else {
                    "Respond to the previous comments and add your thoughts.".to_string()
                };
                agents
                    .clone()
                    .into_iter()
                    .map(move |agent| ScheduledStep {
                        agent,
                        prompt: prompt.clone(),
                    })
            })),
        }
    }
}

/// Everything a protocol run needs, decided before the first turn is appended.
struct RunPlan {
    protocol: Protocol,
    start_message: &'static str,
    opening_turn: String,
    schedule: Schedule,
    summary: String,
}

pub struct Orchestrator {
    session_id: String,
    registry: AgentRegistry,
    log: ConversationLog,
    project: ProjectState,
    run_state: RunState,
}

impl Orchestrator {
    pub fn new(registry: AgentRegistry) -> Self {
        let session_id = uuid::Uuid::new_v4().to_string();
        info!(
            "Orchestrator[{}]: session created with agents {:?}",
            session_id,
            registry.names()
        );
        Orchestrator {
            session_id,
            registry,
            log: ConversationLog::new(),
            project: ProjectState::default(),
            run_state: RunState::Idle,
        }
    }

    /// Build the registry from `config` and start an empty session on it.
    pub fn from_config(config: &AgentTalkConfig) -> Self {
        Self::new(AgentRegistry::from_config(config))
    }

    pub fn into_shared(self) -> SharedOrchestrator {
        Arc::new(Mutex::new(self))
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Registry names in configuration order.
    pub fn available_agents(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn conversation(&self) -> &[Turn] {
        self.log.all()
    }

    pub fn project_state(&self) -> &ProjectState {
        &self.project
    }

    pub fn set_phase(&mut self, phase: ProjectPhase) {
        self.project.phase = phase;
    }

    pub fn record_artifact(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.project.artifacts.insert(key.into(), value.into());
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            available_agents: self.registry.describe(),
            conversation_length: self.log.len(),
            project_phase: self.project.phase,
        }
    }

    /// Clear the conversation and project state. Safe to call at any time, any number of times.
    pub fn reset(&mut self) {
        info!(
            "Orchestrator[{}]: reset, dropping {} turns",
            self.session_id,
            self.log.len()
        );
        self.log.clear();
        self.project = ProjectState::default();
        self.run_state = RunState::Idle;
    }

    /// Ask agent `name` to respond to `prompt` in the context of the whole conversation, and
    /// append the reply.
    ///
    /// Returns [`OrchestratorError::MissingField`] for a blank name or prompt and
    /// [`OrchestratorError::AgentNotFound`] for an unregistered name; the log is untouched in
    /// both cases. A failing provider still yields `Ok`, with `is_error` set.
    pub async fn call_agent(&mut self, name: &str, prompt: &str) -> StepResult {
        if name.trim().is_empty() {
            return Err(OrchestratorError::MissingField("agent"));
        }
        if prompt.trim().is_empty() {
            return Err(OrchestratorError::MissingField("prompt"));
        }

        self.run_state = RunState::Running(Protocol::SingleCall);
        let result = self.invoke(name, prompt).await;
        self.run_state = RunState::Idle;
        result
    }

    /// Run the Product Manager → Developer → QA pipeline on `request`.
    ///
    /// The request is appended as a user turn first, even when no pipeline agent is
    /// configured. Returns one result per configured pipeline role, in pipeline order.
    pub async fn run_sequential_pipeline(
        &mut self,
        request: &str,
    ) -> Result<Vec<StepResult>, OrchestratorError> {
        let plan = self.plan_sequential_pipeline(request)?;
        Ok(self.execute(plan, None).await)
    }

    /// [`run_sequential_pipeline`](Orchestrator::run_sequential_pipeline), reporting every
    /// transition to `handler`.
    ///
    /// Rejected input still produces `start`, one `error` from `System`, and `complete`.
    pub async fn run_sequential_pipeline_with_events(
        &mut self,
        request: &str,
        handler: &dyn EventHandler,
    ) -> Result<Vec<StepResult>, OrchestratorError> {
        match self.plan_sequential_pipeline(request) {
            Ok(plan) => Ok(self.execute(plan, Some(handler)).await),
            Err(e) => {
                reject(handler, "Starting workflow...", &e).await;
                Err(e)
            }
        }
    }

    /// Let every agent speak once per round on `topic`, for `rounds` rounds.
    ///
    /// A topic announcement is appended first. Results come back round-major, agent-minor:
    /// `rounds * agents` of them. Zero rounds yields only the announcement.
    pub async fn run_round_robin_discussion(
        &mut self,
        topic: &str,
        rounds: usize,
    ) -> Result<Vec<StepResult>, OrchestratorError> {
        let plan = self.plan_round_robin_discussion(topic, rounds)?;
        Ok(self.execute(plan, None).await)
    }

    /// [`run_round_robin_discussion`](Orchestrator::run_round_robin_discussion), reporting
    /// every transition to `handler`.
    pub async fn run_round_robin_discussion_with_events(
        &mut self,
        topic: &str,
        rounds: usize,
        handler: &dyn EventHandler,
    ) -> Result<Vec<StepResult>, OrchestratorError> {
        match self.plan_round_robin_discussion(topic, rounds) {
            Ok(plan) => Ok(self.execute(plan, Some(handler)).await),
            Err(e) => {
                reject(handler, "Starting discussion...", &e).await;
                Err(e)
            }
        }
    }

    fn plan_sequential_pipeline(&self, request: &str) -> Result<RunPlan, OrchestratorError> {
        if request.trim().is_empty() {
            return Err(OrchestratorError::MissingField("request"));
        }

        let mut steps = Vec::with_capacity(PIPELINE.len());
        for (name, task) in PIPELINE.iter() {
            if self.registry.contains(name) {
                steps.push(ScheduledStep {
                    agent: name.to_string(),
                    prompt: task.prompt(request),
                });
            } else {
                warn!(
                    "Orchestrator[{}]: pipeline role '{}' not configured, skipping",
                    self.session_id, name
                );
            }
        }

        let summary = format!(
            "✅ Build complete! All {} agents have finished their work on: '{}'",
            steps.len(),
            request
        );

        Ok(RunPlan {
            protocol: Protocol::SequentialPipeline,
            start_message: "Starting workflow...",
            opening_turn: request.to_string(),
            schedule: Schedule::Fixed(steps),
            summary,
        })
    }

    fn plan_round_robin_discussion(
        &self,
        topic: &str,
        rounds: usize,
    ) -> Result<RunPlan, OrchestratorError> {
        if topic.trim().is_empty() {
            return Err(OrchestratorError::MissingField("topic"));
        }

        let agents = self.registry.names();
        let summary = format!(
            "✅ Discussion complete! {} agents discussed '{}' over {} rounds.",
            agents.len(),
            topic,
            rounds
        );

        Ok(RunPlan {
            protocol: Protocol::RoundRobinDiscussion,
            start_message: "Starting discussion...",
            opening_turn: format!("Discussion topic: {}", topic),
            schedule: Schedule::Rounds {
                topic: topic.to_string(),
                rounds,
                agents,
            },
            summary,
        })
    }

    /// Drive a plan step by step. Batch runs pass no handler; streamed runs get
    /// `start`, `thinking` + `message`/`error` per step, the summary, and `complete`.
    async fn execute(
        &mut self,
        plan: RunPlan,
        handler: Option<&dyn EventHandler>,
    ) -> Vec<StepResult> {
        match plan.schedule.len() {
            Some(steps) => info!(
                "Orchestrator[{}]: {:?} starting with {} steps",
                self.session_id, plan.protocol, steps
            ),
            None => info!(
                "Orchestrator[{}]: {:?} starting with more than {} steps",
                self.session_id,
                plan.protocol,
                usize::MAX
            ),
        }
        self.run_state = RunState::Running(plan.protocol);

        emit(
            handler,
            StreamEvent::Start {
                message: plan.start_message.to_string(),
            },
        )
        .await;

        self.log.append(USER_SPEAKER, USER_SPEAKER, plan.opening_turn);

        let mut results = Vec::with_capacity(
            plan.schedule
                .len()
                .unwrap_or(MAX_PREALLOCATED_STEPS)
                .min(MAX_PREALLOCATED_STEPS),
        );
        for step in plan.schedule.into_steps() {
            let role = self
                .registry
                .resolve(&step.agent)
                .map(|agent| agent.role().to_string())
                .unwrap_or_default();

            emit(
                handler,
                StreamEvent::Thinking {
                    agent: step.agent.clone(),
                    role,
                },
            )
            .await;

            let result = self.invoke(&step.agent, &step.prompt).await;

            let event = match &result {
                Ok(call) => StreamEvent::Message {
                    agent: call.agent.clone(),
                    role: call.role.clone(),
                    message: call.response.clone(),
                },
                Err(e) => StreamEvent::Error {
                    agent: step.agent.clone(),
                    error: e.to_string(),
                },
            };
            emit(handler, event).await;
            results.push(result);
        }

        emit(
            handler,
            StreamEvent::Message {
                agent: SYSTEM_SPEAKER.to_string(),
                role: SYSTEM_ROLE.to_string(),
                message: plan.summary,
            },
        )
        .await;
        emit(handler, StreamEvent::Complete).await;

        self.run_state = RunState::Idle;
        info!(
            "Orchestrator[{}]: {:?} finished, log holds {} turns",
            self.session_id,
            plan.protocol,
            self.log.len()
        );
        results
    }

    /// Resolve, respond, append. The single place an agent's reply enters the log.
    async fn invoke(&mut self, name: &str, prompt: &str) -> StepResult {
        let agent = match self.registry.resolve(name) {
            Some(agent) => agent,
            None => {
                warn!(
                    "Orchestrator[{}]: agent '{}' not available",
                    self.session_id, name
                );
                return Err(OrchestratorError::AgentNotFound {
                    name: name.to_string(),
                    available: self.registry.names(),
                });
            }
        };

        debug!(
            "Orchestrator[{}]: calling '{}' ({}) with {} turns of context",
            self.session_id,
            name,
            agent.role(),
            self.log.len()
        );
        let reply = agent.respond(prompt, self.log.all()).await;

        if reply.is_error {
            warn!(
                "Orchestrator[{}]: '{}' failed, recording error turn",
                self.session_id, name
            );
            self.log.append_error(name, agent.role(), reply.text.as_str());
        } else {
            self.log.append(name, agent.role(), reply.text.as_str());
        }

        Ok(AgentCall {
            agent: name.to_string(),
            role: agent.role().to_string(),
            response: reply.text,
            is_error: reply.is_error,
            conversation: self.log.all().to_vec(),
        })
    }
}

async fn emit(handler: Option<&dyn EventHandler>, event: StreamEvent) {
    if let Some(handler) = handler {
        handler.on_stream_event(&event).await;
    }
}

async fn reject(handler: &dyn EventHandler, start_message: &str, error: &OrchestratorError) {
    handler
        .on_stream_event(&StreamEvent::Start {
            message: start_message.to_string(),
        })
        .await;
    handler
        .on_stream_event(&StreamEvent::Error {
            agent: SYSTEM_SPEAKER.to_string(),
            error: error.to_string(),
        })
        .await;
    handler.on_stream_event(&StreamEvent::Complete).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Agent, AgentReply};
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    #[test]
    fn test_error_messages() {
        let err = OrchestratorError::AgentNotFound {
            name: "claude".into(),
            available: vec!["chatgpt".into(), "groq".into()],
        };
        assert_eq!(
            err.to_string(),
            "Agent 'claude' not available. Available agents: [\"chatgpt\", \"groq\"]"
        );
        assert_eq!(
            OrchestratorError::MissingField("topic").to_string(),
            "Missing 'topic' in request"
        );
    }

    #[test]
    fn test_failed_call_response_shape() {
        let result: StepResult = Err(OrchestratorError::MissingField("agent"));
        let json = serde_json::to_value(CallResponse::from(&result)).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Missing 'agent' in request");
        assert!(json.get("response").is_none());
    }

    #[test]
    fn test_empty_registry_plans() {
        let orchestrator = Orchestrator::new(AgentRegistry::builder().build());
        let plan = orchestrator.plan_sequential_pipeline("a blog").unwrap();
        assert_eq!(plan.schedule.len(), Some(0));
        assert!(plan.summary.contains("All 0 agents"));

        let plan = orchestrator.plan_round_robin_discussion("naming", 3).unwrap();
        assert_eq!(plan.opening_turn, "Discussion topic: naming");
        assert_eq!(plan.schedule.into_steps().count(), 0);
    }

    struct Canned;

    #[async_trait]
    impl Agent for Canned {
        fn name(&self) -> &str {
            "Canned"
        }

        fn role(&self) -> &str {
            "Reviewer"
        }

        fn model(&self) -> &str {
            "canned-1"
        }

        async fn respond(&self, _prompt: &str, _context: &[Turn]) -> AgentReply {
            AgentReply::success("noted")
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: StdMutex<Vec<StreamEvent>>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn on_stream_event(&self, event: &StreamEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    fn two_agents() -> Orchestrator {
        let registry = AgentRegistry::builder()
            .register("left", Arc::new(Canned))
            .register("right", Arc::new(Canned))
            .build();
        Orchestrator::new(registry)
    }

    #[test]
    fn test_huge_round_count_is_scheduled_lazily() {
        let orchestrator = two_agents();
        let plan = orchestrator
            .plan_round_robin_discussion("scaling", usize::MAX)
            .unwrap();
        assert_eq!(plan.schedule.len(), None);

        let first: Vec<(String, String)> = plan
            .schedule
            .into_steps()
            .take(3)
            .map(|step| (step.agent, step.prompt))
            .collect();
        assert_eq!(
            first,
            vec![
                ("left".to_string(), "Share your perspective on: scaling".to_string()),
                ("right".to_string(), "Share your perspective on: scaling".to_string()),
                (
                    "left".to_string(),
                    "Respond to the previous comments and add your thoughts.".to_string()
                ),
            ]
        );
    }

    #[tokio::test]
    async fn test_unresolvable_step_is_reported_and_run_continues() {
        let mut orchestrator = two_agents();
        let plan = RunPlan {
            protocol: Protocol::SequentialPipeline,
            start_message: "Starting workflow...",
            opening_turn: "a blog".to_string(),
            schedule: Schedule::Fixed(vec![
                ScheduledStep {
                    agent: "ghost".to_string(),
                    prompt: "anything".to_string(),
                },
                ScheduledStep {
                    agent: "left".to_string(),
                    prompt: "anything".to_string(),
                },
            ]),
            summary: "done".to_string(),
        };
        let recorder = Recorder::default();

        let results = orchestrator.execute(plan, Some(&recorder)).await;

        assert!(matches!(
            results[0],
            Err(OrchestratorError::AgentNotFound { .. })
        ));
        assert!(results[1].is_ok());
        assert_eq!(orchestrator.conversation().len(), 2);

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(events.len(), 7);
        assert_eq!(
            events[2],
            StreamEvent::Error {
                agent: "ghost".to_string(),
                error: "Agent 'ghost' not available. Available agents: [\"left\", \"right\"]"
                    .to_string(),
            }
        );
        assert!(events[6].is_terminal());
    }
}
