//! Conversation driver: the tool-calling loop.

use super::budget::{estimate_tokens, TokenBudget, DEFAULT_TOKEN_BUDGET};
use super::message::Message;
use super::provider::CompletionProvider;
use super::registry::{AnalysisContext, Handler, PendingToolCall, ToolRegistry};
use super::schema::ToolDescriptor;
use super::serialize::{overflow_notice, serialize_output, SerializedResult};
use super::table::{Table, ToolOutput};
use crate::charts::{list_charts, ChartStore};
use crate::error::{F1Error, Result};
use serde_json::Value;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Tunables for one driver.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Output cap passed with every completion request.
    pub max_output_tokens: u32,
    /// Ceiling above which a tool result is not sent verbatim.
    pub token_budget: usize,
    /// Tool calls allowed per question.
    pub max_tool_rounds: usize,
    pub completion_timeout: Duration,
    pub tool_timeout: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: 150,
            token_budget: DEFAULT_TOKEN_BUDGET,
            max_tool_rounds: 10,
            completion_timeout: Duration::from_secs(60),
            tool_timeout: Duration::from_secs(60),
        }
    }
}

/// Where the loop is within one question.
enum TurnState {
    AwaitingCompletion,
    HandlingToolCall {
        call: PendingToolCall,
        output: ToolOutput,
    },
    Done(String),
}

/// Drives a conversation between the model and the registered tools.
///
/// One driver serves one conversation at a time; `ask` takes `&mut self`.
/// The most recently fetched table is kept between questions so an analysis
/// tool can work on it without fetching again.
pub struct Driver {
    provider: Arc<dyn CompletionProvider>,
    registry: ToolRegistry,
    system_prompt: String,
    config: DriverConfig,
    budget: TokenBudget,
    messages: Vec<Message>,
    dataset: Option<Table>,
    charts: Option<ChartStore>,
    chart_dir: Option<PathBuf>,
    tool_calls: usize,
}

impl Driver {
    /// Create a driver. Every tool's descriptor is derived here, so an
    /// unsupported parameter type fails construction.
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        tools: Vec<Handler>,
        system_prompt: &str,
    ) -> Result<Self> {
        let registry = ToolRegistry::new(tools)?;
        let config = DriverConfig::default();

        Ok(Self {
            provider,
            registry,
            system_prompt: system_prompt.to_string(),
            budget: TokenBudget::new(config.token_budget),
            config,
            messages: vec![Message::system(system_prompt)],
            dataset: None,
            charts: None,
            chart_dir: None,
            tool_calls: 0,
        })
    }

    /// Replace the default configuration.
    pub fn with_config(mut self, config: DriverConfig) -> Self {
        self.budget = TokenBudget::new(config.token_budget);
        self.config = config;
        self
    }

    /// Enable chart artifacts. Charts left by earlier runs are removed.
    pub fn with_charts(mut self, store: ChartStore) -> Result<Self> {
        store.clear()?;
        self.charts = Some(store);
        Ok(self)
    }

    /// Answer one question, calling tools as the model requests them.
    #[instrument(skip(self, prompt), fields(prompt = %prompt))]
    pub async fn ask(&mut self, prompt: &str) -> Result<String> {
        info!("Processing question: {}", prompt);

        self.reset_charts()?;
        self.messages = vec![Message::system(&self.system_prompt), Message::user(prompt)];
        self.tool_calls = 0;

        let mut state = TurnState::AwaitingCompletion;
        loop {
            state = match state {
                TurnState::AwaitingCompletion => self.next_completion().await?,
                TurnState::HandlingToolCall { call, output } => {
                    self.record_result(&call, output)?;
                    TurnState::AwaitingCompletion
                }
                TurnState::Done(answer) => {
                    info!(tool_calls = self.tool_calls, "Answer ready");
                    return Ok(answer);
                }
            };
        }
    }

    async fn next_completion(&mut self) -> Result<TurnState> {
        let tools = self.registry.descriptors();
        debug!(messages = self.messages.len(), tools = tools.len(), "Requesting completion");

        let completion = with_deadline(
            "completion request",
            self.config.completion_timeout,
            self.provider
                .complete(&self.messages, &tools, self.config.max_output_tokens),
        )
        .await?;

        let content = completion.content.unwrap_or_default();
        self.messages
            .push(Message::assistant(&content, completion.tool_call.clone()));

        let Some(request) = completion.tool_call else {
            return Ok(TurnState::Done(content));
        };

        if self.tool_calls >= self.config.max_tool_rounds {
            warn!(max = self.config.max_tool_rounds, "Tool-call limit reached");
            return Err(F1Error::LoopBudgetExceeded(self.config.max_tool_rounds));
        }

        let call = self.registry.resolve(&request.name, &request.arguments)?;
        info!("Calling tool: {} with args: {}", call.name, serde_json::Value::Object(call.arguments.clone()));

        let output = self.dispatch(&call).await;
        self.tool_calls += 1;

        Ok(TurnState::HandlingToolCall { call, output: output? })
    }

    async fn dispatch(&self, call: &PendingToolCall) -> Result<ToolOutput> {
        let handler = self
            .registry
            .handler(&call.name)
            .cloned()
            .ok_or_else(|| F1Error::UnknownTool(call.name.clone()))?;

        let limit = self.config.tool_timeout;
        let result = match handler {
            Handler::Fetch(tool) => {
                with_deadline(&call.name, limit, tool.fetch(call.arguments.clone())).await
            }
            Handler::Analysis(tool) => {
                let ctx = AnalysisContext {
                    data: self.require_dataset(&call.name)?,
                    chart_dir: self.chart_dir.as_deref(),
                };
                with_deadline(&call.name, limit, tool.analyze(call.arguments.clone(), ctx)).await
            }
        };

        result.map_err(|e| match e {
            timeout @ F1Error::Timeout { .. } => timeout,
            source => F1Error::ToolExecution {
                tool: call.name.clone(),
                source: Box::new(source),
            },
        })
    }

    fn record_result(&mut self, call: &PendingToolCall, output: ToolOutput) -> Result<()> {
        let serialized = self.serialize_result(&call.name, &output)?;

        if serialized.deferred {
            self.messages.push(Message::user(&serialized.text));
        } else {
            self.messages.push(Message::tool_result(&call.name, &serialized.text));
        }

        if let ToolOutput::Table(table) = output {
            let (rows, columns) = table.shape();
            debug!(rows, columns, "Holding dataset from {}", call.name);
            self.dataset = Some(table);
        }

        Ok(())
    }

    /// Serialize a result, replacing oversized tables by an overflow notice.
    fn serialize_result(&self, tool: &str, output: &ToolOutput) -> Result<SerializedResult> {
        let text = serialize_output(output)?;
        let tokens = estimate_tokens(&text);
        debug!(tokens, budget = self.budget.ceiling(), "Serialized result of {}", tool);

        if !self.budget.exceeds(&text) {
            return Ok(SerializedResult { text, deferred: false });
        }

        match output.as_table() {
            Some(table) => {
                warn!(tokens, "Result of {} exceeds the token budget, sending notice", tool);
                let analysis_tools = self.registry.analysis_tools();
                Ok(SerializedResult {
                    text: overflow_notice(tool, table, tokens, &self.budget, &analysis_tools),
                    deferred: true,
                })
            }
            None => Err(F1Error::OversizeResult {
                tool: tool.to_string(),
                tokens,
                budget: self.budget.ceiling(),
            }),
        }
    }

    fn reset_charts(&mut self) -> Result<()> {
        self.chart_dir = match &self.charts {
            Some(store) => {
                store.clear()?;
                Some(store.start_invocation()?)
            }
            None => None,
        };
        Ok(())
    }

    /// The current dataset, or `NoDataAvailable` naming the tool that needed it.
    pub fn require_dataset(&self, tool: &str) -> Result<&Table> {
        self.dataset.as_ref().ok_or_else(|| F1Error::NoDataAvailable {
            tool: tool.to_string(),
        })
    }

    /// The most recently fetched table, if any.
    pub fn dataset(&self) -> Option<&Table> {
        self.dataset.as_ref()
    }

    /// Conversation history of the latest question.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Tool calls dispatched while answering the latest question.
    pub fn tool_calls(&self) -> usize {
        self.tool_calls
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.registry.descriptors()
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Chart directory of the latest question.
    pub fn chart_dir(&self) -> Option<&Path> {
        self.chart_dir.as_deref()
    }

    /// Chart files produced while answering the latest question.
    pub fn charts(&self) -> Result<Vec<PathBuf>> {
        match &self.chart_dir {
            Some(dir) => list_charts(dir),
            None => Ok(Vec::new()),
        }
    }
}

async fn with_deadline<T>(
    what: &str,
    limit: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| F1Error::Timeout {
            what: what.to_string(),
            secs: limit.as_secs(),
        })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::Role;
    use crate::agent::provider::Completion;
    use crate::agent::registry::{AnalysisTool, DataTool};
    use crate::agent::schema::{ToolSpec, TypeHint};
    use async_trait::async_trait;
    use serde_json::{json, Map};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays canned replies and records the history of every request.
    struct ScriptedProvider {
        replies: Mutex<VecDeque<Completion>>,
        requests: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<Completion>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<Vec<Message>> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        async fn complete(
            &self,
            messages: &[Message],
            tools: &[ToolDescriptor],
            max_output_tokens: u32,
        ) -> Result<Completion> {
            assert!(!tools.is_empty());
            assert_eq!(max_output_tokens, 150);
            self.requests.lock().unwrap().push(messages.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| F1Error::Completion("script exhausted".to_string()))
        }
    }

    /// Always requests the same tool.
    struct LoopingProvider;

    #[async_trait]
    impl CompletionProvider for LoopingProvider {
        async fn complete(
            &self,
            _: &[Message],
            _: &[ToolDescriptor],
            _: u32,
        ) -> Result<Completion> {
            Ok(Completion::call("get_race_result", r#"{"season": 2022, "round": 1}"#))
        }
    }

    /// A fetch tool returning a fixed output and counting calls.
    struct FixedTool {
        name: &'static str,
        output: ToolOutput,
        calls: AtomicUsize,
        last_args: Mutex<Option<Map<String, Value>>>,
    }

    impl FixedTool {
        fn new(name: &'static str, output: impl Into<ToolOutput>) -> Arc<Self> {
            Arc::new(Self {
                name,
                output: output.into(),
                calls: AtomicUsize::new(0),
                last_args: Mutex::new(None),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DataTool for FixedTool {
        fn spec(&self) -> ToolSpec {
            ToolSpec::new(self.name)
                .doc("Fixed test tool.")
                .param::<i64>("season", "")
                .optional("round", "", 0_i64)
        }

        async fn fetch(&self, args: Map<String, Value>) -> Result<ToolOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_args.lock().unwrap() = Some(args);
            Ok(self.output.clone())
        }
    }

    struct FailingTool;

    #[async_trait]
    impl DataTool for FailingTool {
        fn spec(&self) -> ToolSpec {
            ToolSpec::new("get_driver_standings").param::<i64>("season", "")
        }

        async fn fetch(&self, _args: Map<String, Value>) -> Result<ToolOutput> {
            Err(F1Error::DataSource("upstream unavailable".to_string()))
        }
    }

    struct SlowTool;

    #[async_trait]
    impl DataTool for SlowTool {
        fn spec(&self) -> ToolSpec {
            ToolSpec::new("slow")
        }

        async fn fetch(&self, _args: Map<String, Value>) -> Result<ToolOutput> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(ToolOutput::Text("late".to_string()))
        }
    }

    /// Reports the shape of the dataset it was given.
    struct ShapeAnalysis;

    #[async_trait]
    impl AnalysisTool for ShapeAnalysis {
        fn spec(&self) -> ToolSpec {
            ToolSpec::new("analyze_data").param::<String>("instruction", "")
        }

        async fn analyze(
            &self,
            _args: Map<String, Value>,
            ctx: AnalysisContext<'_>,
        ) -> Result<ToolOutput> {
            let (rows, cols) = ctx.data.shape();
            Ok(ToolOutput::Text(format!("{}x{}", rows, cols)))
        }
    }

    /// Returns a large table and records the shape of each dataset it was given.
    struct ExpandingAnalysis {
        seen: Mutex<Vec<(usize, usize)>>,
    }

    #[async_trait]
    impl AnalysisTool for ExpandingAnalysis {
        fn spec(&self) -> ToolSpec {
            ToolSpec::new("analyze_data").param::<String>("instruction", "")
        }

        async fn analyze(
            &self,
            _args: Map<String, Value>,
            ctx: AnalysisContext<'_>,
        ) -> Result<ToolOutput> {
            self.seen.lock().unwrap().push(ctx.data.shape());
            Ok(big_table(50).into())
        }
    }

    struct BrokenSpec;

    #[async_trait]
    impl DataTool for BrokenSpec {
        fn spec(&self) -> ToolSpec {
            ToolSpec::new("broken").param_hint("anything", TypeHint::Any, None)
        }

        async fn fetch(&self, _args: Map<String, Value>) -> Result<ToolOutput> {
            unreachable!("never registered")
        }
    }

    fn race_table() -> Table {
        Table::from_columns(vec![
            ("position", vec![json!(1), json!(2)]),
            ("last_name", vec![json!("Leclerc"), json!("Verstappen")]),
        ])
        .unwrap()
    }

    fn big_table(rows: usize) -> Table {
        let mut table = Table::new(["driver_id", "first_name", "last_name"]);
        for i in 0..rows {
            table
                .push_row(vec![json!(format!("driver_{}", i)), json!("First"), json!("Last")])
                .unwrap();
        }
        table
    }

    fn driver(provider: Arc<dyn CompletionProvider>, tools: Vec<Handler>) -> Driver {
        Driver::new(provider, tools, "You answer Formula 1 questions.").unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_race_question() {
        let provider = ScriptedProvider::new(vec![
            Completion::call("get_race_result", r#"{"season": 2022, "round": 3}"#),
            Completion::text("Driver X finished second."),
        ]);
        let tool = FixedTool::new("get_race_result", race_table());
        let mut driver = driver(provider.clone(), vec![Handler::Fetch(tool.clone())]);

        let answer = driver
            .ask("Who finished second in round 3 of season 2022?")
            .await
            .unwrap();

        assert_eq!(answer, "Driver X finished second.");
        assert_eq!(tool.calls(), 1);
        let args = tool.last_args.lock().unwrap().clone().unwrap();
        assert_eq!(args["season"], json!(2022));
        assert_eq!(args["round"], json!(3));

        let roles: Vec<Role> = driver.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::ToolResult, Role::Assistant]
        );
        let result = &driver.messages()[3];
        assert_eq!(result.tool_name.as_deref(), Some("get_race_result"));
        assert_eq!(result.content, serialize_output(&race_table().into()).unwrap());

        // the second request carried the tool result
        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].len(), 4);
        assert_eq!(requests[1][3].role, Role::ToolResult);
    }

    #[tokio::test]
    async fn test_loop_stops_at_first_plain_answer() {
        let provider = ScriptedProvider::new(vec![
            Completion::call("get_driver_standings", r#"{"season": 2021}"#),
            Completion::call("get_race_result", r#"{"season": 2021, "round": 22}"#),
            Completion::text("Verstappen won the title."),
            Completion::text("never requested"),
        ]);
        let standings = FixedTool::new("get_driver_standings", race_table());
        let results = FixedTool::new("get_race_result", race_table());
        let mut driver = driver(
            provider.clone(),
            vec![Handler::Fetch(standings.clone()), Handler::Fetch(results.clone())],
        );

        let answer = driver.ask("Who won 2021?").await.unwrap();

        assert_eq!(answer, "Verstappen won the title.");
        assert_eq!(standings.calls() + results.calls(), 2);
        assert_eq!(driver.tool_calls(), 2);
        assert_eq!(provider.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_fatal() {
        let provider = ScriptedProvider::new(vec![
            Completion::call("get_weather", r#"{"city": "Monaco"}"#),
            Completion::text("unreachable"),
        ]);
        let tool = FixedTool::new("get_race_result", race_table());
        let mut driver = driver(provider, vec![Handler::Fetch(tool.clone())]);

        let err = driver.ask("Will it rain?").await.unwrap_err();

        assert!(matches!(err, F1Error::UnknownTool(ref name) if name == "get_weather"));
        assert_eq!(tool.calls(), 0);
        assert_eq!(driver.tool_calls(), 0);
    }

    #[tokio::test]
    async fn test_result_at_budget_sent_verbatim() {
        let table = race_table();
        let text = serialize_output(&table.clone().into()).unwrap();
        let provider = ScriptedProvider::new(vec![
            Completion::call("get_race_result", r#"{"season": 2022}"#),
            Completion::text("done"),
        ]);
        let tool = FixedTool::new("get_race_result", table);
        let mut driver = driver(provider, vec![Handler::Fetch(tool)]).with_config(DriverConfig {
            token_budget: estimate_tokens(&text),
            ..DriverConfig::default()
        });

        driver.ask("q").await.unwrap();

        let result = &driver.messages()[3];
        assert_eq!(result.role, Role::ToolResult);
        assert_eq!(result.content, text);
    }

    #[tokio::test]
    async fn test_oversized_table_deferred_to_user_notice() {
        let table = race_table();
        let text = serialize_output(&table.clone().into()).unwrap();
        let provider = ScriptedProvider::new(vec![
            Completion::call("get_race_result", r#"{"season": 2022}"#),
            Completion::text("Use the analysis tool next time."),
        ]);
        let tool = FixedTool::new("get_race_result", table.clone());
        let mut driver = driver(
            provider.clone(),
            vec![Handler::Fetch(tool), Handler::Analysis(Arc::new(ShapeAnalysis))],
        )
        .with_config(DriverConfig {
            token_budget: estimate_tokens(&text) - 1,
            ..DriverConfig::default()
        });

        driver.ask("q").await.unwrap();

        let notice = &driver.messages()[3];
        assert_eq!(notice.role, Role::User);
        assert!(notice.tool_name.is_none());
        assert!(notice.content.contains("`get_race_result`"));
        assert!(notice.content.contains("`analyze_data`"));
        assert_ne!(notice.content, text);

        // the full payload never went to the model
        for request in provider.requests() {
            assert!(request.iter().all(|m| !m.content.contains(&text)));
        }

        // but the dataset is held for analysis
        assert_eq!(driver.dataset(), Some(&table));
    }

    #[tokio::test]
    async fn test_oversized_non_table_fails() {
        let provider = ScriptedProvider::new(vec![
            Completion::call("get_race_result", r#"{"season": 2022}"#),
            Completion::text("unreachable"),
        ]);
        let tool = FixedTool::new("get_race_result", ToolOutput::Text("x".repeat(400)));
        let mut driver = driver(provider, vec![Handler::Fetch(tool)]).with_config(DriverConfig {
            token_budget: 10,
            ..DriverConfig::default()
        });

        let err = driver.ask("q").await.unwrap_err();
        assert!(matches!(err, F1Error::OversizeResult { tokens: 100, budget: 10, .. }));
    }

    #[tokio::test]
    async fn test_analysis_without_dataset() {
        let provider = ScriptedProvider::new(vec![
            Completion::call("analyze_data", r#"{"instruction": "who has most points"}"#),
            Completion::text("unreachable"),
        ]);
        let tool = FixedTool::new("get_race_result", race_table());
        let mut driver = driver(
            provider,
            vec![Handler::Fetch(tool.clone()), Handler::Analysis(Arc::new(ShapeAnalysis))],
        );

        assert!(matches!(
            driver.require_dataset("analyze_data"),
            Err(F1Error::NoDataAvailable { .. })
        ));

        let err = driver.ask("Analyze something").await.unwrap_err();
        assert!(matches!(err, F1Error::NoDataAvailable { ref tool } if tool == "analyze_data"));
        assert_eq!(tool.calls(), 0);
    }

    #[tokio::test]
    async fn test_analysis_uses_latest_dataset() {
        let provider = ScriptedProvider::new(vec![
            Completion::call("get_driver_information", r#"{"season": 2022}"#),
            Completion::call("get_race_result", r#"{"season": 2022, "round": 3}"#),
            Completion::call("analyze_data", r#"{"instruction": "count rows"}"#),
            Completion::text("There are two rows."),
        ]);
        let drivers = FixedTool::new("get_driver_information", big_table(7));
        let results = FixedTool::new("get_race_result", race_table());
        let mut driver = driver(
            provider,
            vec![
                Handler::Fetch(drivers),
                Handler::Fetch(results),
                Handler::Analysis(Arc::new(ShapeAnalysis)),
            ],
        );

        let answer = driver.ask("How many?").await.unwrap();
        assert_eq!(answer, "There are two rows.");

        // the analysis saw the most recent table, not the first one
        let analysis = driver
            .messages()
            .iter()
            .find(|m| m.tool_name.as_deref() == Some("analyze_data"))
            .unwrap();
        assert_eq!(analysis.content, "2x2");
        assert_eq!(driver.dataset(), Some(&race_table()));
    }

    #[tokio::test]
    async fn test_oversized_analysis_result_becomes_dataset() {
        let provider = ScriptedProvider::new(vec![
            Completion::call("get_race_result", r#"{"season": 2022, "round": 3}"#),
            Completion::call("analyze_data", r#"{"instruction": "expand"}"#),
            Completion::call("analyze_data", r#"{"instruction": "narrow it down"}"#),
            Completion::text("Done."),
        ]);
        let analysis = Arc::new(ExpandingAnalysis {
            seen: Mutex::new(Vec::new()),
        });
        let mut driver = driver(
            provider,
            vec![
                Handler::Fetch(FixedTool::new("get_race_result", race_table())),
                Handler::Analysis(analysis.clone()),
            ],
        )
        .with_config(DriverConfig {
            token_budget: 100,
            ..DriverConfig::default()
        });

        assert_eq!(driver.ask("Expand the results").await.unwrap(), "Done.");

        let notice = driver
            .messages()
            .iter()
            .find(|m| m.role == Role::User && m.content.contains("50 rows and 3 columns"))
            .unwrap();
        assert!(notice.content.contains("current dataset"));

        // the notice is true: the next analysis sees the oversized table
        assert_eq!(*analysis.seen.lock().unwrap(), vec![(2, 2), (50, 3)]);
        assert_eq!(driver.dataset().map(Table::shape), Some((50, 3)));
    }

    #[tokio::test]
    async fn test_tool_failure_propagates() {
        let provider = ScriptedProvider::new(vec![
            Completion::call("get_driver_standings", r#"{"season": 2022}"#),
            Completion::text("unreachable"),
        ]);
        let mut driver = driver(provider, vec![Handler::Fetch(Arc::new(FailingTool))]);

        match driver.ask("Standings?").await {
            Err(F1Error::ToolExecution { tool, source }) => {
                assert_eq!(tool, "get_driver_standings");
                assert!(matches!(*source, F1Error::DataSource(_)));
            }
            other => panic!("Expected ToolExecution, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_tool_call_limit() {
        let tool = FixedTool::new("get_race_result", race_table());
        let mut driver = driver(Arc::new(LoopingProvider), vec![Handler::Fetch(tool.clone())])
            .with_config(DriverConfig {
                max_tool_rounds: 3,
                ..DriverConfig::default()
            });

        let err = driver.ask("Loop forever").await.unwrap_err();
        assert!(matches!(err, F1Error::LoopBudgetExceeded(3)));
        assert_eq!(tool.calls(), 3);
    }

    #[tokio::test]
    async fn test_tool_timeout() {
        let provider = ScriptedProvider::new(vec![Completion::call("slow", "")]);
        let mut driver = driver(provider, vec![Handler::Fetch(Arc::new(SlowTool))])
            .with_config(DriverConfig {
                tool_timeout: Duration::from_millis(20),
                ..DriverConfig::default()
            });

        let err = driver.ask("q").await.unwrap_err();
        assert!(matches!(err, F1Error::Timeout { ref what, .. } if what == "slow"));
    }

    #[tokio::test]
    async fn test_history_resets_but_dataset_persists() {
        let provider = ScriptedProvider::new(vec![
            Completion::call("get_race_result", r#"{"season": 2022, "round": 3}"#),
            Completion::text("first"),
            Completion::text("second"),
        ]);
        let tool = FixedTool::new("get_race_result", race_table());
        let mut driver = driver(provider.clone(), vec![Handler::Fetch(tool)]);

        assert_eq!(driver.ask("one").await.unwrap(), "first");
        assert_eq!(driver.ask("two").await.unwrap(), "second");

        assert_eq!(driver.messages().len(), 3);
        assert_eq!(driver.messages()[1].content, "two");
        assert_eq!(provider.requests()[2].len(), 2);
        assert!(driver.dataset().is_some());
    }

    #[test]
    fn test_unsupported_tool_fails_construction() {
        let provider = ScriptedProvider::new(vec![]);
        let result = Driver::new(
            provider.clone(),
            vec![
                Handler::Fetch(FixedTool::new("get_race_result", race_table())),
                Handler::Fetch(Arc::new(BrokenSpec)),
            ],
            "system",
        );

        match result {
            Err(err) => assert!(err.is_configuration()),
            Ok(_) => panic!("Expected configuration error"),
        }
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn test_charts_cleared_per_question() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ChartStore::new(tmp.path());
        let stale = tmp.path().join("stale");
        std::fs::create_dir_all(&stale).unwrap();

        let provider = ScriptedProvider::new(vec![Completion::text("a"), Completion::text("b")]);
        let tool = FixedTool::new("get_race_result", race_table());
        let mut driver = driver(provider, vec![Handler::Fetch(tool)])
            .with_charts(store)
            .unwrap();
        assert!(!stale.exists());

        driver.ask("one").await.unwrap();
        let first = driver.chart_dir().unwrap().to_path_buf();
        assert!(first.exists());

        driver.ask("two").await.unwrap();
        assert!(!first.exists());
        assert!(driver.chart_dir().unwrap().exists());
        assert!(driver.charts().unwrap().is_empty());
    }
}
